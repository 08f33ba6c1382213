//! `backend-utils` is a set of small, independent helpers for backend services.
//!
//! - [`HttpClient`]: HTTP client with per-attempt timeout and bounded retry on
//!   5xx, plus JSON/form convenience calls and typed request helpers.
//! - [`crypto`]: AES-GCM string encryption and an AES-CTR API-key codec.
//! - [`domain`]: registrable-domain extraction.
//! - [`env`]: typed environment getters behind an injectable provider.
//! - [`id`] / [`random`]: random hex identifiers.
//! - [`logger`]: leveled structured logger with text and JSON output.
//! - [`json_response`]: JSON responses for `axum` handlers.
//! - [`parse`]: integer extraction from JSON by dotted key path.
//! - [`numbers`], [`strings`], [`time`]: rounding, containment, month math.

mod body;
mod client;
mod error;
mod options;
mod request;

pub mod crypto;
pub mod domain;
pub mod env;
pub mod id;
pub mod json_response;
pub mod log_value;
pub mod logger;
pub mod numbers;
pub mod parse;
pub mod random;
pub mod strings;
pub mod time;

#[cfg(feature = "mock")]
pub mod mock;

pub use body::Body;
pub use client::HttpClient;
pub use error::{ClientError, CryptoError, DomainError, EnvError, LoggerError, ParseError};
pub use options::{BackoffStrategy, ClientOptions};
pub use request::HttpRequest;

pub use reqwest::{header, Method, Response, StatusCode};
pub use tokio_util::sync::CancellationToken;

pub type Result<T, E = ClientError> = std::result::Result<T, E>;
