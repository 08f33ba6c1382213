use serde::Serialize;

use crate::ClientError;

/// Request body for the typed helpers on [`HttpClient`](crate::HttpClient).
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Body {
    /// No body is sent.
    #[default]
    Empty,
    /// JSON document, serialized on send.
    Json(serde_json::Value),
    /// Text sent verbatim, typically a JSON document that is already encoded.
    Raw(String),
}

impl Body {
    /// Serializes any value into a JSON body.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, ClientError> {
        serde_json::to_value(value)
            .map(Self::Json)
            .map_err(|err| ClientError::Encode(err.to_string()))
    }

    pub fn raw(value: impl Into<String>) -> Self {
        Self::Raw(value.into())
    }

    pub(crate) fn into_bytes(self) -> Result<Option<Vec<u8>>, ClientError> {
        match self {
            Self::Empty => Ok(None),
            Self::Json(value) => serde_json::to_vec(&value)
                .map(Some)
                .map_err(|err| ClientError::Encode(err.to_string())),
            Self::Raw(text) => Ok(Some(text.into_bytes())),
        }
    }
}

impl From<()> for Body {
    fn from(_: ()) -> Self {
        Self::Empty
    }
}

impl From<serde_json::Value> for Body {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

impl From<String> for Body {
    fn from(value: String) -> Self {
        Self::Raw(value)
    }
}

impl From<&str> for Body {
    fn from(value: &str) -> Self {
        Self::Raw(value.to_owned())
    }
}
