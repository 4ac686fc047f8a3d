//! Lenient decoding of client-supplied body fields.
//!
//! Identifier and type fields are accepted as either JSON strings or JSON
//! numbers and handed to the core as text, so malformed values surface as
//! domain faults (`invalid_identifier`, `invalid_amount`) alongside any other
//! fault in the same request instead of as a body rejection.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// `"12"`, `12` and `12.0` all decode to `Some("12...")`; `null` and a
/// missing field decode to `None`. Any other JSON value is kept as its text
/// form and rejected later by the identifier parser.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// Numbers and numeric strings decode to their value. Anything else that
/// is present decodes to NaN, which the amount check rejects.
pub fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => Some(n.as_f64().unwrap_or(f64::NAN)),
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(s.trim().parse().unwrap_or(f64::NAN)),
        Some(_) => Some(f64::NAN),
    })
}

/// A list of lenient strings; `null` or absent is `None`.
pub fn lenient_string_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect(),
        ),
        Some(Value::String(s)) => Some(vec![s]),
        Some(other) => Some(vec![other.to_string()]),
    })
}
