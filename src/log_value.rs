//! Typed values and loggable objects for [`Logger`](crate::logger::Logger).

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, SecondsFormat, Utc};

/// A value attached to a log line.
///
/// Strings, numbers, bytes and durations equal to their zero value are
/// dropped from the output. Bools and times are always written.
#[derive(Clone, Debug, PartialEq)]
pub enum LogValue {
    Str(String),
    Int(i64),
    Uint(u64),
    Float(f64),
    Bool(bool),
    Time(DateTime<Utc>),
    Duration(Duration),
    Bytes(Vec<u8>),
}

impl LogValue {
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Str(value) => value.is_empty(),
            Self::Int(value) => *value == 0,
            Self::Uint(value) => *value == 0,
            Self::Float(value) => *value == 0.0,
            Self::Bool(_) | Self::Time(_) => false,
            Self::Duration(value) => value.is_zero(),
            Self::Bytes(value) => value.is_empty(),
        }
    }

    pub(crate) fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Str(value) => value.clone().into(),
            Self::Int(value) => (*value).into(),
            Self::Uint(value) => (*value).into(),
            Self::Float(value) => serde_json::Number::from_f64(*value)
                .map(serde_json::Value::Number)
                .unwrap_or_else(|| value.to_string().into()),
            Self::Bool(value) => (*value).into(),
            Self::Time(value) => format_time(value).into(),
            Self::Duration(value) => serde_json::Number::from_f64(value.as_secs_f64())
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::Bytes(value) => STANDARD.encode(value).into(),
        }
    }
}

impl fmt::Display for LogValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Uint(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Time(value) => f.write_str(&format_time(value)),
            Self::Duration(value) => write!(f, "{value:?}"),
            Self::Bytes(value) => f.write_str(&STANDARD.encode(value)),
        }
    }
}

pub(crate) fn format_time(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

macro_rules! log_value_from {
    ($variant:ident: $($ty:ty => $conv:expr),+ $(,)?) => {
        $(
            impl From<$ty> for LogValue {
                fn from(value: $ty) -> Self {
                    Self::$variant($conv(value))
                }
            }
        )+
    };
}

log_value_from!(Str: String => std::convert::identity, &str => str::to_owned);
log_value_from!(Int: i64 => std::convert::identity, i32 => i64::from, i16 => i64::from, i8 => i64::from);
log_value_from!(Uint: u64 => std::convert::identity, u32 => u64::from, u16 => u64::from, u8 => u64::from);
log_value_from!(Float: f64 => std::convert::identity, f32 => f64::from);
log_value_from!(Bool: bool => std::convert::identity);
log_value_from!(Time: DateTime<Utc> => std::convert::identity);
log_value_from!(Duration: Duration => std::convert::identity);
log_value_from!(Bytes: Vec<u8> => std::convert::identity, &[u8] => <[u8]>::to_vec);

impl From<usize> for LogValue {
    fn from(value: usize) -> Self {
        Self::Uint(value as u64)
    }
}

/// Named properties, written in key order.
pub type Properties = BTreeMap<String, LogValue>;

/// Something that can be attached to a log line as a named group of
/// properties.
pub trait LogObject {
    /// Name of the group in the output.
    fn log_name(&self) -> &str;
    /// Properties of the group.
    fn log_properties(&self) -> Properties;
}

/// Ad-hoc [`LogObject`] built from key/value pairs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MapObject {
    name: String,
    fields: Properties,
}

impl MapObject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Properties::new(),
        }
    }

    /// Adds a property, replacing any previous value under `key`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<LogValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

impl LogObject for MapObject {
    fn log_name(&self) -> &str {
        &self.name
    }

    fn log_properties(&self) -> Properties {
        self.fields.clone()
    }
}

/// `errorMsg` group carrying the error text.
pub fn err_object(err: &dyn fmt::Display) -> MapObject {
    MapObject::new("errorMsg").with("error", error_text(err))
}

/// `warnMsg` group carrying the error text.
pub fn warn_object(err: &dyn fmt::Display) -> MapObject {
    MapObject::new("warnMsg").with("error", error_text(err))
}

/// `infoMsg` group carrying a message.
pub fn info_object(msg: impl Into<String>) -> MapObject {
    MapObject::new("infoMsg").with("msg", msg.into())
}

fn error_text(err: &dyn fmt::Display) -> String {
    let text = err.to_string();
    if text.is_empty() {
        "empty error".to_owned()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::{err_object, info_object, LogObject, LogValue, MapObject};

    #[test]
    fn zero_values() {
        assert!(LogValue::from("").is_zero());
        assert!(LogValue::from(0i64).is_zero());
        assert!(LogValue::from(0.0f64).is_zero());
        assert!(LogValue::from(Duration::ZERO).is_zero());
        assert!(LogValue::from(Vec::<u8>::new()).is_zero());
        assert!(!LogValue::from(false).is_zero());
        assert!(!LogValue::from(7u32).is_zero());
    }

    #[test]
    fn json_encoding() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single().expect("valid time");
        assert_eq!(LogValue::from(at).to_json(), json!("2024-05-01T12:00:00.000Z"));
        assert_eq!(LogValue::from(Duration::from_millis(1500)).to_json(), json!(1.5));
        assert_eq!(LogValue::from(&b"\x01\x02\x03"[..]).to_json(), json!("AQID"));
        assert_eq!(LogValue::from(-3i32).to_json(), json!(-3));
    }

    #[test]
    fn builders_name_their_groups() {
        let err = err_object(&"boom");
        assert_eq!(err.log_name(), "errorMsg");
        assert_eq!(err.log_properties()["error"], LogValue::from("boom"));

        let empty = err_object(&"");
        assert_eq!(empty.log_properties()["error"], LogValue::from("empty error"));

        let info = info_object("started");
        assert_eq!(info.log_name(), "infoMsg");

        let map = MapObject::new("relay").with("chain", "0021").with("count", 3i64);
        assert_eq!(map.log_properties().len(), 2);
    }
}
