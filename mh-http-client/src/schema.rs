//! Shape validation and coercion for extracted values
//!
//! Records are plain serde structs. Validation deserializes an extracted
//! [`Value`] into the record and reports a [`SchemaError`] naming the record
//! when the value does not fit. Fields that arrive as stringly-typed numbers,
//! flags or dates opt into the lenient readers in [`coerce`].

use crate::error::SchemaError;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::type_name;
use std::sync::OnceLock;

/// A record fetched from the per-user `/api/get/user` endpoint
///
/// The endpoint only returns the fields named in the request, so each record
/// declares the fields it needs.
pub trait FieldSet: DeserializeOwned {
    /// Upstream field names requested for this record
    const FIELDS: &'static [&'static str];
}

/// Validate a single value against the shape `T`
pub fn validate<T: DeserializeOwned>(value: &Value) -> Result<T, SchemaError> {
    T::deserialize(value).map_err(|e| SchemaError::new(shape_name::<T>(), e.to_string()))
}

/// Validate every row against the shape `T`, failing on the first mismatch
pub fn validate_rows<T: DeserializeOwned>(rows: &[Value]) -> Result<Vec<T>, SchemaError> {
    rows.iter()
        .enumerate()
        .map(|(row, value)| {
            T::deserialize(value)
                .map_err(|e| SchemaError::new(shape_name::<T>(), format!("row {row}: {e}")))
        })
        .collect()
}

/// Type name of `T` with module paths stripped (`Vec<Profile>` rather than
/// `alloc::vec::Vec<mh_http_client::records::Profile>`)
fn shape_name<T>() -> String {
    static MODULE_PATH: OnceLock<Regex> = OnceLock::new();
    let regex = MODULE_PATH.get_or_init(|| Regex::new(r"[a-z_][a-z0-9_]*::").unwrap());
    regex.replace_all(type_name::<T>(), "").into_owned()
}

/// Lenient field readers for use with `#[serde(deserialize_with = ...)]`
///
/// Each reader accepts a closed set of encodings and rejects everything else.
/// None of them substitutes a default for a value it does not understand.
pub mod coerce {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::de::{self, Deserialize, Deserializer};
    use serde_json::Value;
    use std::fmt::Display;
    use std::str::FromStr;

    const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%m/%d/%Y %H:%M:%S"];

    /// Integer or numeric string
    pub fn number<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: FromStr,
        T::Err: Display,
    {
        let text = match Value::deserialize(deserializer)? {
            Value::Number(number) => number.to_string(),
            Value::String(text) => text.trim().to_string(),
            other => {
                return Err(de::Error::custom(format!(
                    "expected a number or numeric string, found {other}"
                )));
            }
        };
        text.parse::<T>()
            .map_err(|e| de::Error::custom(format!("invalid number `{text}`: {e}")))
    }

    /// Boolean, `0`/`1`, or one of the strings `"0"`, `"1"`, `"true"`, `"false"`
    pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        parse_flag(&value).map_err(de::Error::custom)
    }

    /// Like [`flag`], with `null` read as `false`
    ///
    /// The category listings send `null` for categories that were never
    /// started.
    pub fn nullable_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(false),
            value => parse_flag(&value).map_err(de::Error::custom),
        }
    }

    fn parse_flag(value: &Value) -> Result<bool, String> {
        match value {
            Value::Bool(flag) => Ok(*flag),
            Value::Number(number) => match number.as_i64() {
                Some(0) => Ok(false),
                Some(1) => Ok(true),
                _ => Err(format!("expected 0 or 1, found {number}")),
            },
            Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
                "0" | "false" => Ok(false),
                "1" | "true" => Ok(true),
                _ => Err(format!("expected a boolean string, found `{text}`")),
            },
            other => Err(format!("expected a boolean, found {other}")),
        }
    }

    /// RFC 3339, one of the upstream naive date-time layouts (read as UTC),
    /// or unix seconds as a number or digit string
    pub fn timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Number(number) => number
                .as_i64()
                .and_then(|seconds| DateTime::from_timestamp(seconds, 0))
                .ok_or_else(|| de::Error::custom(format!("invalid unix timestamp {number}"))),
            Value::String(text) => parse_timestamp(text.trim())
                .ok_or_else(|| de::Error::custom(format!("unrecognized timestamp `{text}`"))),
            other => Err(de::Error::custom(format!(
                "expected a timestamp, found {other}"
            ))),
        }
    }

    fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
            return Some(parsed.with_timezone(&Utc));
        }
        if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
            return text
                .parse::<i64>()
                .ok()
                .and_then(|seconds| DateTime::from_timestamp(seconds, 0));
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
            .map(|naive| naive.and_utc())
    }
}
