use reqwest::{header::HeaderMap, Method};
use url::Url;

use crate::ClientError;

/// Fully formed outbound request.
///
/// The body is held in memory so every retry attempt sends the same bytes.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Parses `url` and builds a request without headers or body.
    pub fn parse(method: Method, url: &str) -> Result<Self, ClientError> {
        Ok(Self::new(method, parse_url(url)?))
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }
}

pub(crate) fn parse_url(raw: &str) -> Result<Url, ClientError> {
    Url::parse(raw).map_err(|err| ClientError::InvalidUrl {
        url: raw.to_owned(),
        reason: err.to_string(),
    })
}
