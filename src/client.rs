use std::borrow::Borrow;
use std::time::Instant;

use reqwest::{
    header::{self, HeaderMap, HeaderValue},
    Method, Response, StatusCode,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use url::form_urlencoded;

use crate::{
    env::{Env, EnvProvider},
    request::parse_url,
    Body, ClientError, ClientOptions, HttpRequest, Result,
};

/// JSON keys searched, in order, for a human-readable error message.
const ERROR_MESSAGE_KEYS: [&str; 5] = ["error", "message", "error_message", "errorMessage", "detail"];

/// HTTP client with per-attempt timeout and bounded retry on 5xx.
///
/// Cloning is cheap and clones share the connection pool. The client holds no
/// mutable state, so one instance can serve any number of concurrent calls.
#[derive(Clone, Debug, Default)]
pub struct HttpClient {
    http: reqwest::Client,
    options: ClientOptions,
}

impl HttpClient {
    /// Creates a client with default options: 5 s timeout, no retries.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a client whose options are read from the environment.
    ///
    /// See [`ClientOptions::from_env`].
    pub fn from_env<P: EnvProvider>(env: &Env<P>) -> Self {
        Self::new().with_options(ClientOptions::from_env(env))
    }

    /// Applies client options such as timeout and retry behavior.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.options = opts;
        self
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Sends `request`, retrying while the server answers 5xx.
    ///
    /// At most `max_retries + 1` attempts are made. The last response is
    /// returned even when it is still 5xx, so callers must inspect the
    /// status. Transport errors are returned immediately without retry.
    pub async fn execute(&self, request: HttpRequest) -> Result<Response> {
        let attempts = self.options.max_retries.saturating_add(1);
        let mut attempt = 0usize;
        loop {
            let response = self
                .send_once(&request)
                .await
                .map_err(ClientError::Transport)?;
            let status = response.status();

            if status.is_server_error() && attempt + 1 < attempts {
                self.wait_before_retry(attempt, status).await;
                attempt += 1;
                continue;
            }

            return Ok(response);
        }
    }

    /// Like [`execute`](Self::execute), but stops as soon as `token` is
    /// cancelled, whether an attempt or a backoff wait is in flight.
    pub async fn execute_with_cancel(
        &self,
        request: HttpRequest,
        token: &CancellationToken,
    ) -> Result<Response> {
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(ClientError::Cancelled),
            result = self.execute(request) => result,
        }
    }

    /// Like [`execute`](Self::execute), but gives up once `deadline` passes.
    pub async fn execute_with_deadline(
        &self,
        request: HttpRequest,
        deadline: Instant,
    ) -> Result<Response> {
        let deadline = tokio::time::Instant::from_std(deadline);
        tokio::time::timeout_at(deadline, self.execute(request))
            .await
            .map_err(|_| ClientError::DeadlineExceeded)?
    }

    /// POSTs `body` as JSON.
    ///
    /// `Content-Type: application/json` and `Connection: close` override
    /// whatever the caller put in `headers`.
    pub async fn post_json<B>(&self, url: &str, body: &B, headers: HeaderMap) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        self.send_json(Method::POST, url, body, headers).await
    }

    /// PUTs `body` as JSON. Headers are forced as in [`post_json`](Self::post_json).
    pub async fn put_json<B>(&self, url: &str, body: &B, headers: HeaderMap) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        self.send_json(Method::PUT, url, body, headers).await
    }

    /// POSTs `form` URL-encoded.
    pub async fn post_form<I, K, V>(&self, url: &str, form: I, headers: HeaderMap) -> Result<Response>
    where
        I: IntoIterator,
        I::Item: Borrow<(K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut headers = headers;
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        let request = HttpRequest::parse(Method::POST, url)?
            .with_headers(headers)
            .with_body(encode_pairs(form));
        self.execute(request).await
    }

    /// GETs `url` with its query string replaced by `params`.
    pub async fn get_with_params<I, K, V>(
        &self,
        url: &str,
        params: I,
        headers: HeaderMap,
    ) -> Result<Response>
    where
        I: IntoIterator,
        I::Item: Borrow<(K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut parsed = parse_url(url)?;
        let query = encode_pairs(params);
        parsed.set_query((!query.is_empty()).then_some(query.as_str()));
        self.execute(HttpRequest::new(Method::GET, parsed).with_headers(headers))
            .await
    }

    /// GETs `url` and decodes a JSON `T` from a 2xx response.
    pub async fn get<T: DeserializeOwned>(&self, url: &str, headers: HeaderMap) -> Result<T> {
        self.request_json(Method::GET, url, Body::Empty, headers).await
    }

    /// POSTs `body` and decodes a JSON `T` from a 2xx response.
    pub async fn post<T: DeserializeOwned>(
        &self,
        url: &str,
        body: impl Into<Body>,
        headers: HeaderMap,
    ) -> Result<T> {
        self.request_json(Method::POST, url, body.into(), headers)
            .await
    }

    /// PUTs `body` and decodes a JSON `T` from a 2xx response.
    pub async fn put<T: DeserializeOwned>(
        &self,
        url: &str,
        body: impl Into<Body>,
        headers: HeaderMap,
    ) -> Result<T> {
        self.request_json(Method::PUT, url, body.into(), headers)
            .await
    }

    /// PATCHes `body` and decodes a JSON `T` from a 2xx response.
    pub async fn patch<T: DeserializeOwned>(
        &self,
        url: &str,
        body: impl Into<Body>,
        headers: HeaderMap,
    ) -> Result<T> {
        self.request_json(Method::PATCH, url, body.into(), headers)
            .await
    }

    /// DELETEs `url` and decodes a JSON `T` from a 2xx response.
    ///
    /// Use `T = ()` or `Option<_>` when the server answers with an empty body.
    pub async fn delete<T: DeserializeOwned>(&self, url: &str, headers: HeaderMap) -> Result<T> {
        self.request_json(Method::DELETE, url, Body::Empty, headers)
            .await
    }

    async fn send_json<B>(
        &self,
        method: Method,
        url: &str,
        body: &B,
        headers: HeaderMap,
    ) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        let payload =
            serde_json::to_vec(body).map_err(|err| ClientError::Encode(err.to_string()))?;
        let mut headers = headers;
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::CONNECTION, HeaderValue::from_static("close"));

        let request = HttpRequest::parse(method, url)?
            .with_headers(headers)
            .with_body(payload);
        self.execute(request).await
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: Body,
        headers: HeaderMap,
    ) -> Result<T> {
        let mut request = HttpRequest::parse(method, url)?.with_headers(headers);
        if let Some(bytes) = body.into_bytes()? {
            request.headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
            request.body = Some(bytes);
        }

        let response = self.execute(request).await?;
        let status = response.status();
        let text = response.text().await.map_err(ClientError::Transport)?;

        if !status.is_success() {
            return Err(parse_error_response(status, &text));
        }

        let text = if text.trim().is_empty() { "null" } else { text.as_str() };
        serde_json::from_str(text).map_err(|err| {
            ClientError::Decode(format!("invalid response JSON: {err}; body: {text}"))
        })
    }

    async fn send_once(&self, request: &HttpRequest) -> reqwest::Result<Response> {
        let mut builder = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone())
            .timeout(self.options.timeout());
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        builder.send().await
    }

    /// Waits before the next retry attempt according to the backoff strategy.
    async fn wait_before_retry(&self, attempt: usize, status: StatusCode) {
        let delay = self.options.backoff.delay(attempt);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            attempt,
            status = status.as_u16(),
            delay_ms = delay.as_millis() as u64,
            "retrying request after server error"
        );
        #[cfg(not(feature = "tracing"))]
        let _ = status;

        if !delay.is_zero() {
            sleep(delay).await;
        }
    }
}

/// Builds the error for a non-2xx response, pulling a message out of common
/// JSON error-body shapes when there is one.
pub(crate) fn parse_error_response(status: StatusCode, body: &str) -> ClientError {
    ClientError::NotOk {
        status,
        message: extract_error_message(body),
    }
}

fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let object = value.as_object()?;

    ERROR_MESSAGE_KEYS.iter().find_map(|key| match object.get(*key)? {
        serde_json::Value::String(message) if !message.is_empty() => Some(message.clone()),
        serde_json::Value::Object(nested) => nested
            .get("message")
            .and_then(|message| message.as_str())
            .filter(|message| !message.is_empty())
            .map(str::to_owned),
        _ => None,
    })
}

fn encode_pairs<I, K, V>(pairs: I) -> String
where
    I: IntoIterator,
    I::Item: Borrow<(K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}
