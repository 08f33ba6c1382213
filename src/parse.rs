//! Integer extraction from JSON payloads by dotted key path.
//!
//! The field may hold a JSON number (floats are truncated toward zero and
//! must fit in `i64`) or a string. Strings accept an optional sign, the
//! `0x`, `0o`, `0b` and leading-`0` (octal) prefixes, and `_` separators
//! between digits or right after a prefix.

use std::io::Read;

use serde_json::{Map, Value};

use crate::ParseError;

/// Reads a JSON object from `reader` and returns the integer at `key`
/// (`"outer.inner.field"`).
pub fn integer_from_json_reader<R: Read>(reader: R, key: &str) -> Result<i64, ParseError> {
    let payload: Map<String, Value> =
        serde_json::from_reader(reader).map_err(|err| ParseError::Payload(err.to_string()))?;
    integer_at(&payload, key)
}

/// Parses `json` as an object and returns the integer at `key`.
pub fn integer_from_json_str(json: &str, key: &str) -> Result<i64, ParseError> {
    let payload: Map<String, Value> =
        serde_json::from_str(json).map_err(|err| ParseError::Payload(err.to_string()))?;
    integer_at(&payload, key)
}

fn integer_at(payload: &Map<String, Value>, key: &str) -> Result<i64, ParseError> {
    let value = nested_lookup(payload, key)?;
    value_to_i64(value).map_err(|reason| ParseError::Field {
        field: key.to_owned(),
        reason,
    })
}

fn nested_lookup<'a>(payload: &'a Map<String, Value>, key: &str) -> Result<&'a Value, ParseError> {
    if key.is_empty() {
        return Err(ParseError::EmptyKey);
    }

    let mut segments = key.split('.');
    let mut current = payload;
    loop {
        let Some(segment) = segments.next() else {
            return Err(ParseError::EmptyKey);
        };
        let value = current
            .get(segment)
            .ok_or_else(|| ParseError::KeyNotFound(segment.to_owned()))?;

        if segments.clone().next().is_none() {
            return Ok(value);
        }
        current = value.as_object().ok_or(ParseError::NotAMap)?;
    }
}

fn value_to_i64(value: &Value) -> Result<i64, String> {
    match value {
        Value::String(raw) => parse_prefixed_int(raw),
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                Ok(int)
            } else if number.as_u64().is_some() {
                Err(format!("value {number} out of range"))
            } else {
                let float = number
                    .as_f64()
                    .ok_or_else(|| format!("invalid number {number}"))?
                    .trunc();
                // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive.
                if float >= i64::MIN as f64 && float < i64::MAX as f64 {
                    Ok(float as i64)
                } else {
                    Err(format!("value {number} out of range"))
                }
            }
        }
        other => Err(format!("invalid type for payload: {}", type_name(other))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn parse_prefixed_int(raw: &str) -> Result<i64, String> {
    let invalid = || format!("invalid integer \"{raw}\"");

    let (negative, unsigned) = match raw.as_bytes().first() {
        Some(b'-') => (true, &raw[1..]),
        Some(b'+') => (false, &raw[1..]),
        _ => (false, raw),
    };

    let (radix, digits) = match unsigned.get(..2) {
        Some("0x") | Some("0X") => (16, &unsigned[2..]),
        Some("0o") | Some("0O") => (8, &unsigned[2..]),
        Some("0b") | Some("0B") => (2, &unsigned[2..]),
        _ if unsigned.len() > 1 && unsigned.starts_with('0') => (8, &unsigned[1..]),
        _ => (10, unsigned),
    };

    if digits.contains('_') && !underscores_ok(unsigned) {
        return Err(invalid());
    }
    let digits = digits.replace('_', "");
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return Err(invalid());
    }

    let magnitude = u64::from_str_radix(&digits, radix).map_err(|_| invalid())?;
    let out_of_range = || format!("value \"{raw}\" out of range");
    if negative {
        0i64.checked_sub_unsigned(magnitude).ok_or_else(out_of_range)
    } else {
        i64::try_from(magnitude).map_err(|_| out_of_range())
    }
}

/// Underscores may only sit between two digits, or between a base prefix
/// and a digit. `unsigned` is the literal without its sign.
fn underscores_ok(unsigned: &str) -> bool {
    #[derive(PartialEq)]
    enum Last {
        Start,
        Digit,
        Underscore,
        Other,
    }

    let bytes = unsigned.as_bytes();
    let (rest, hex, mut last) = match bytes {
        [b'0', prefix, rest @ ..] if matches!(prefix.to_ascii_lowercase(), b'b' | b'o' | b'x') => {
            (rest, prefix.to_ascii_lowercase() == b'x', Last::Digit)
        }
        _ => (bytes, false, Last::Start),
    };

    for &c in rest {
        if c.is_ascii_digit() || (hex && c.is_ascii_hexdigit()) {
            last = Last::Digit;
        } else if c == b'_' {
            if last != Last::Digit {
                return false;
            }
            last = Last::Underscore;
        } else {
            if last == Last::Underscore {
                return false;
            }
            last = Last::Other;
        }
    }
    last != Last::Underscore
}
