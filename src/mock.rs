//! In-process HTTP server with canned responses, for tests of code that
//! talks to remote APIs.
//!
//! Enabled with the `mock` feature.

use std::{
    collections::{HashMap, VecDeque},
    fs, io,
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};

/// One canned response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MockResponse {
    pub status: StatusCode,
    pub body: String,
    pub delay: Duration,
}

impl MockResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    /// Reads the body from a fixture file.
    pub fn from_file(status: StatusCode, path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::new(status, fs::read_to_string(path)?))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Default)]
struct Route {
    queue: VecDeque<MockResponse>,
    /// Keep answering with the last response instead of running dry.
    repeat_last: bool,
}

type Routes = HashMap<(Method, String), Route>;

#[derive(Clone, Default)]
struct MockState {
    routes: Arc<Mutex<Routes>>,
    hits: Arc<AtomicUsize>,
}

/// Local HTTP server answering registered `(method, path)` pairs.
///
/// Requests without a pending response get `404 {"error": "mock response not found"}`.
/// The server stops when dropped.
pub struct MockServer {
    base_url: String,
    state: MockState,
    task: tokio::task::JoinHandle<()>,
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl MockServer {
    /// Binds `127.0.0.1` on a free port and starts serving.
    pub async fn start() -> io::Result<Self> {
        let state = MockState::default();
        let app = Router::new()
            .fallback(mock_handler)
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let address = listener.local_addr()?;
        let task = tokio::spawn(async move {
            if let Err(_err) = axum::serve(listener, app).await {
                #[cfg(feature = "tracing")]
                tracing::error!(error = %_err, "mock server stopped");
            }
        });

        Ok(Self {
            base_url: format!("http://{address}"),
            state,
            task,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for `path` on this server.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Number of requests received so far, matched or not.
    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }

    /// Answers every `method path` request with `response`.
    pub fn add_response(&self, method: Method, path: &str, response: MockResponse) {
        self.register(method, path, vec![response], true);
    }

    /// Answers every `method path` request with the contents of `file`.
    pub fn add_response_from_file(
        &self,
        method: Method,
        path: &str,
        status: StatusCode,
        file: impl AsRef<Path>,
    ) -> io::Result<()> {
        let response = MockResponse::from_file(status, file)?;
        self.add_response(method, path, response);
        Ok(())
    }

    /// Answers successive requests with each file in turn, then 404.
    pub fn add_responses_from_files<P: AsRef<Path>>(
        &self,
        method: Method,
        path: &str,
        status: StatusCode,
        files: &[P],
    ) -> io::Result<()> {
        let responses = files
            .iter()
            .map(|file| MockResponse::from_file(status, file))
            .collect::<io::Result<Vec<_>>>()?;
        self.register(method, path, responses, false);
        Ok(())
    }

    /// Answers successive requests with each `(status, body)` pair in turn,
    /// then 404.
    pub fn add_plain_responses<I, S>(&self, method: Method, path: &str, responses: I)
    where
        I: IntoIterator<Item = (StatusCode, S)>,
        S: Into<String>,
    {
        let responses = responses
            .into_iter()
            .map(|(status, body)| MockResponse::new(status, body))
            .collect();
        self.register(method, path, responses, false);
    }

    /// Queues responses that are consumed once each, then 404.
    pub fn add_sequence(&self, method: Method, path: &str, responses: Vec<MockResponse>) {
        self.register(method, path, responses, false);
    }

    fn register(&self, method: Method, path: &str, responses: Vec<MockResponse>, repeat_last: bool) {
        let path = format!("/{}", path.trim_start_matches('/'));
        let mut routes = lock(&self.state.routes);
        let route = routes.entry((method, path)).or_default();
        route.queue.extend(responses);
        route.repeat_last = repeat_last;
    }
}

fn lock(routes: &Mutex<Routes>) -> std::sync::MutexGuard<'_, Routes> {
    routes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn mock_handler(State(state): State<MockState>, method: Method, uri: Uri) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);

    let response = {
        let mut routes = lock(&state.routes);
        routes
            .get_mut(&(method, uri.path().to_owned()))
            .and_then(|route| {
                if route.repeat_last && route.queue.len() == 1 {
                    route.queue.front().cloned()
                } else {
                    route.queue.pop_front()
                }
            })
    };

    let Some(response) = response else {
        return (
            StatusCode::NOT_FOUND,
            [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
            r#"{"error":"mock response not found"}"#,
        )
            .into_response();
    };

    if !response.delay.is_zero() {
        tokio::time::sleep(response.delay).await;
    }

    (response.status, response.body).into_response()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use axum::http::{Method, StatusCode};

    use super::{MockResponse, MockServer};

    #[tokio::test]
    async fn single_response_repeats() {
        let server = MockServer::start().await.expect("must bind");
        server.add_response(Method::GET, "/ok", MockResponse::new(StatusCode::CREATED, "{}"));

        for _ in 0..3 {
            let response = reqwest::get(server.url("/ok")).await.expect("must connect");
            assert_eq!(response.status().as_u16(), 201);
        }
        assert_eq!(server.hits(), 3);
    }

    #[tokio::test]
    async fn plain_sequence_runs_dry() {
        let server = MockServer::start().await.expect("must bind");
        server.add_plain_responses(
            Method::GET,
            "seq",
            [(StatusCode::OK, r#"{"ok": 1}"#), (StatusCode::NOT_FOUND, r#"{"not_ok": 2}"#)],
        );

        let statuses = [200, 404, 404];
        for expected in statuses {
            let response = reqwest::get(server.url("seq")).await.expect("must connect");
            assert_eq!(response.status().as_u16(), expected);
        }
    }

    #[tokio::test]
    async fn responses_from_files() {
        let mut fixture = tempfile::NamedTempFile::new().expect("temp file");
        write!(fixture, r#"{{"name": "dummy"}}"#).expect("write fixture");

        let server = MockServer::start().await.expect("must bind");
        server
            .add_responses_from_files(Method::GET, "/d", StatusCode::OK, &[fixture.path(), fixture.path()])
            .expect("fixtures exist");

        for _ in 0..2 {
            let body = reqwest::get(server.url("/d"))
                .await
                .expect("must connect")
                .text()
                .await
                .expect("must read body");
            assert_eq!(body, r#"{"name": "dummy"}"#);
        }

        let missing = server.add_response_from_file(
            Method::GET,
            "/d",
            StatusCode::OK,
            "does/not/exist.json",
        );
        assert!(missing.is_err());
    }
}
