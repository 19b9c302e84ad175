//! Serde helpers for stored timestamps.
//!
//! Timestamps are written as epoch milliseconds. Reads also accept RFC 3339
//! strings, which older exports used.

use chrono::{DateTime, Utc};
use serde::de::Error;
use serde_json::Value;

fn from_value<E: Error>(value: Value) -> Result<DateTime<Utc>, E> {
  match value {
    Value::Number(n) => {
      let millis = n
        .as_i64()
        .or_else(|| n.as_f64().map(|f| f as i64))
        .ok_or_else(|| E::custom("timestamp out of range"))?;
      DateTime::from_timestamp_millis(millis).ok_or_else(|| E::custom("timestamp out of range"))
    }
    Value::String(s) => DateTime::parse_from_rfc3339(&s)
      .map(|dt| dt.with_timezone(&Utc))
      .map_err(E::custom),
    other => Err(E::custom(format!("invalid timestamp: {}", other))),
  }
}

/// Required timestamp.
pub mod epoch_millis {
  use chrono::{DateTime, Utc};
  use serde::{Deserialize, Deserializer, Serializer};
  use serde_json::Value;

  pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    serializer.serialize_i64(value.timestamp_millis())
  }

  pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
  where
    D: Deserializer<'de>,
  {
    super::from_value(Value::deserialize(deserializer)?)
  }
}

/// Optional timestamp; `null` and a missing field both read as `None`.
pub mod option_epoch_millis {
  use chrono::{DateTime, Utc};
  use serde::{Deserialize, Deserializer, Serializer};
  use serde_json::Value;

  pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    match value {
      Some(dt) => serializer.serialize_i64(dt.timestamp_millis()),
      None => serializer.serialize_none(),
    }
  }

  pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
  where
    D: Deserializer<'de>,
  {
    match Option::<Value>::deserialize(deserializer)? {
      None | Some(Value::Null) => Ok(None),
      Some(value) => super::from_value(value).map(Some),
    }
  }
}
