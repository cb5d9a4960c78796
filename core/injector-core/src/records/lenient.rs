//! Lenient decoding of line-count fields.
//!
//! The extensions sometimes write `null` or an integral float (`12.0`) where
//! a count is expected. Both decode as a count; `null` means "no value".

use serde::de::Error;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

fn to_count<E: Error>(value: Value) -> Result<Option<u64>, E> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => {
            if let Some(count) = n.as_u64() {
                return Ok(Some(count));
            }
            match n.as_f64() {
                Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => {
                    Ok(Some(f as u64))
                }
                _ => Err(E::custom(format!("expected a line count, got {}", n))),
            }
        }
        other => Err(E::custom(format!("expected a line count, got {}", other))),
    }
}

/// A count where `null` reads as 0.
pub(crate) fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    to_count(Value::deserialize(deserializer)?).map(|count| count.unwrap_or(0))
}

/// An optional count where `null` reads as absent.
pub(crate) fn optional_count<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<u64>, D::Error> {
    to_count(Value::deserialize(deserializer)?)
}
