/// Error returned by [`HttpClient`](crate::HttpClient) calls.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Network or request execution error from `reqwest`. Never retried.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// The input URL could not be parsed.
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    /// Request body could not be serialized.
    #[error("encode error: {0}")]
    Encode(String),
    /// Non-success HTTP status returned to a typed helper.
    #[error("response not OK. {status}{}", message_suffix(.message))]
    NotOk {
        status: reqwest::StatusCode,
        /// Human-readable message extracted from the error body, if any.
        message: Option<String>,
    },
    /// Response body did not match the expected JSON shape.
    #[error("decode error: {0}")]
    Decode(String),
    /// The caller's cancellation token fired.
    #[error("request cancelled")]
    Cancelled,
    /// The caller's deadline elapsed before the call completed.
    #[error("request deadline exceeded")]
    DeadlineExceeded,
}

fn message_suffix(message: &Option<String>) -> String {
    match message {
        Some(message) => format!(": {message}"),
        None => String::new(),
    }
}

/// Error returned by the AES helpers.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid secret key length {0}: must be 16, 24, or 32 bytes")]
    InvalidKeyLength(usize),
    #[error("encryption failed")]
    Encrypt,
    #[error("decryption failed")]
    Decrypt,
    #[error("invalid encoding: {0}")]
    Encoding(String),
    #[error("encrypted data too short")]
    TooShort,
    #[error("decrypted data has an invalid format")]
    InvalidFormat,
    #[error("random source failure: {0}")]
    Random(String),
}

/// Error returned by [`extract_domain`](crate::domain::extract_domain).
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid URL")]
    InvalidUrl,
}

/// Error returned by the required environment getters.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EnvError {
    #[error("environment error ({kind}): required env var {name} not found")]
    Missing { kind: &'static str, name: String },
    #[error("environment error ({kind}): unable to parse value {value} to required env var {name}")]
    Invalid {
        kind: &'static str,
        name: String,
        value: String,
    },
    #[error("failed to load .env file: {0}")]
    Dotenv(String),
}

/// Error returned by the JSON field parsers in [`parse`](crate::parse).
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("error decoding payload: {0}")]
    Payload(String),
    #[error("no keys given to find on map")]
    EmptyKey,
    #[error("key {0} not found")]
    KeyNotFound(String),
    #[error("nested key is not of type map")]
    NotAMap,
    #[error("error parsing field {field}: {reason}")]
    Field { field: String, reason: String },
}

/// Error returned when building a [`Logger`](crate::logger::Logger).
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LoggerError {
    #[error("service name cannot be empty")]
    EmptyService,
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(String),
}
