//! Borrow intent <-> QR text codec
//!
//! Wire format is a compact JSON object:
//!
//! ```text
//! {"user_id":12,"item_id":3,"timestamp":1760000000000}
//! ```
//!
//! `timestamp` is milliseconds since the Unix epoch. Unknown keys are ignored.

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{error::AppError, models::BorrowIntent};

/// Why a scanned text could not be turned into a borrow intent
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("QR content is not a borrow request: {0}")]
    Malformed(String),

    #[error("QR content lacks {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
}

impl From<PayloadError> for AppError {
    fn from(err: PayloadError) -> Self {
        match err {
            PayloadError::Malformed(_) => AppError::MalformedPayload(err.to_string()),
            PayloadError::MissingFields(_) => AppError::MissingFields(err.to_string()),
        }
    }
}

#[derive(Serialize)]
struct WirePayload {
    user_id: i64,
    item_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<i64>,
}

/// Encode a fresh intent for `user_id` borrowing `item_id`
pub fn encode(user_id: i64, item_id: i64) -> String {
    encode_intent(&BorrowIntent::new(user_id, item_id))
}

/// Encode an intent. Output is deterministic for a given intent.
pub fn encode_intent(intent: &BorrowIntent) -> String {
    let wire = WirePayload {
        user_id: intent.user_id,
        item_id: intent.item_id,
        timestamp: intent.issued_at.map(|t| t.timestamp_millis()),
    };
    // Serializing a struct of integers cannot fail
    serde_json::to_string(&wire).unwrap_or_default()
}

/// Decode scanned text into an intent
pub fn decode(text: &str) -> Result<BorrowIntent, PayloadError> {
    let value: Value = serde_json::from_str(text.trim())
        .map_err(|e| PayloadError::Malformed(e.to_string()))?;

    let Value::Object(fields) = value else {
        return Err(PayloadError::Malformed("expected a JSON object".to_string()));
    };

    let user_id = id_field(&fields, "user_id")?;
    let item_id = id_field(&fields, "item_id")?;

    let (user_id, item_id) = match (user_id, item_id) {
        (Some(u), Some(i)) => (u, i),
        (u, i) => {
            let mut missing = Vec::new();
            if u.is_none() {
                missing.push("user_id");
            }
            if i.is_none() {
                missing.push("item_id");
            }
            return Err(PayloadError::MissingFields(missing));
        }
    };

    Ok(BorrowIntent {
        user_id,
        item_id,
        issued_at: fields.get("timestamp").and_then(timestamp_value),
    })
}

/// Reads a positive integer id. Absent or null fields yield `None`.
fn id_field(fields: &Map<String, Value>, name: &'static str) -> Result<Option<i64>, PayloadError> {
    let id = match fields.get(name) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    };

    match id {
        Some(id) if id > 0 => Ok(Some(id)),
        _ => Err(PayloadError::Malformed(format!("{} must be a positive integer", name))),
    }
}

fn timestamp_value(value: &Value) -> Option<DateTime<Utc>> {
    value
        .as_i64()
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let text = encode(12, 3);
        let intent = decode(&text).unwrap();
        assert_eq!(intent.user_id, 12);
        assert_eq!(intent.item_id, 3);
        assert!(intent.issued_at.is_some());
    }

    #[test]
    fn test_encode_is_deterministic() {
        let intent = BorrowIntent {
            user_id: 7,
            item_id: 9,
            issued_at: Utc.timestamp_millis_opt(1_700_000_000_123).single(),
        };
        assert_eq!(
            encode_intent(&intent),
            r#"{"user_id":7,"item_id":9,"timestamp":1700000000123}"#
        );
        assert_eq!(encode_intent(&intent), encode_intent(&intent));
    }

    #[test]
    fn test_decode_tolerates_extra_and_optional_fields() {
        let intent = decode(r#"{"item_id":4,"user_id":"5","note":"hi"}"#).unwrap();
        assert_eq!((intent.user_id, intent.item_id), (5, 4));
        assert_eq!(intent.issued_at, None);

        let intent = decode(r#"{"user_id":1,"item_id":2,"timestamp":"yesterday"}"#).unwrap();
        assert_eq!(intent.issued_at, None);
    }

    #[test]
    fn test_decode_malformed() {
        assert!(matches!(decode("not json"), Err(PayloadError::Malformed(_))));
        assert!(matches!(decode("[1,2]"), Err(PayloadError::Malformed(_))));
        assert!(matches!(decode(""), Err(PayloadError::Malformed(_))));
        assert!(matches!(
            decode(r#"{"user_id":true,"item_id":2}"#),
            Err(PayloadError::Malformed(_))
        ));
        assert!(matches!(
            decode(r#"{"user_id":-1,"item_id":2}"#),
            Err(PayloadError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_missing_fields() {
        assert_eq!(
            decode(r#"{"user_id":1}"#),
            Err(PayloadError::MissingFields(vec!["item_id"]))
        );
        assert_eq!(
            decode(r#"{"timestamp":1}"#),
            Err(PayloadError::MissingFields(vec!["user_id", "item_id"]))
        );
        assert_eq!(
            decode(r#"{"user_id":null,"item_id":3}"#),
            Err(PayloadError::MissingFields(vec!["user_id"]))
        );
    }

    #[test]
    fn test_errors_map_to_app_errors() {
        let err: AppError = PayloadError::MissingFields(vec!["user_id"]).into();
        assert!(matches!(err, AppError::MissingFields(_)));
        let err: AppError = PayloadError::Malformed("x".to_string()).into();
        assert!(matches!(err, AppError::MalformedPayload(_)));
    }
}
