//! The JSON wrapper persisted for every value: `{"value": <any>, "expire": <millis> | null}`.

use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub value: Value,
    /// Absolute deadline in epoch milliseconds; `None` never expires. Must be present, even
    /// as `null`.
    #[serde(deserialize_with = "Option::deserialize")]
    pub expire: Option<i64>,
}

impl Envelope {
    /// Wraps `value`, turning a relative lifetime in seconds into an absolute deadline.
    pub fn new(value: Value, expire_secs: Option<i64>, now_millis: i64) -> Self {
        Self {
            value,
            expire: expire_secs.map(|secs| now_millis.saturating_add(secs.saturating_mul(1000))),
        }
    }

    /// An entry is live up to and including its deadline.
    pub fn is_expired(&self, now_millis: i64) -> bool {
        self.expire.is_some_and(|deadline| deadline < now_millis)
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Only a JSON object carrying both `value` and `expire` is an envelope. Arrays and other
    /// objects are rejected, even where serde could map them onto the struct.
    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        match serde_json::from_str::<Value>(raw)? {
            Value::Object(map) if map.contains_key("value") && map.contains_key("expire") => {
                serde_json::from_value(Value::Object(map))
            }
            _ => Err(serde_json::Error::custom("expected an object with \"value\" and \"expire\"")),
        }
    }
}

/// Decodes a raw value carried by a storage event: the envelope's value when `raw` is an
/// envelope, otherwise the raw text as a JSON string.
pub fn decode_event_value(raw: Option<&str>) -> Option<Value> {
    let raw = raw?;
    match Envelope::decode(raw) {
        Ok(env) => Some(env.value),
        Err(e) => {
            log::debug!("storage event value is not an envelope ({e}), passing it through");
            Some(Value::String(raw.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_format_is_stable() {
        let env = Envelope::new(json!({"a": [1, 2]}), None, 0);
        assert_eq!(env.encode().unwrap(), r#"{"value":{"a":[1,2]},"expire":null}"#);

        let env = Envelope::new(json!("x"), Some(5), 1_000);
        assert_eq!(env.encode().unwrap(), r#"{"value":"x","expire":6000}"#);
    }

    #[test]
    fn deadline_is_inclusive() {
        let env = Envelope::new(json!(1), Some(1), 0);
        assert!(!env.is_expired(999));
        assert!(!env.is_expired(1_000));
        assert!(env.is_expired(1_001));
        assert!(!Envelope::new(json!(1), None, 0).is_expired(i64::MAX));
    }

    #[test]
    fn negative_lifetime_is_already_expired() {
        let env = Envelope::new(json!(1), Some(-1), 5_000);
        assert!(env.is_expired(5_000));
    }

    #[test]
    fn decodes_written_by_older_generations() {
        let env = Envelope::decode(r#"{"expire":null,"value":[true,null]}"#).unwrap();
        assert_eq!(env.value, json!([true, null]));
        assert_eq!(env.expire, None);
    }

    #[test]
    fn event_values_fall_back_to_raw_text() {
        assert_eq!(decode_event_value(None), None);
        assert_eq!(decode_event_value(Some(r#"{"value":5,"expire":null}"#)), Some(json!(5)));
        assert_eq!(decode_event_value(Some("plain")), Some(json!("plain")));
        assert_eq!(decode_event_value(Some("42")), Some(json!("42")));
    }

    #[test]
    fn foreign_json_is_not_an_envelope() {
        for raw in [r#"{"foo":1}"#, r#"{"value":1}"#, r#"{"expire":null}"#, r#"["x",5]"#, r#"["x",null]"#] {
            assert!(Envelope::decode(raw).is_err(), "{raw}");
            assert_eq!(decode_event_value(Some(raw)), Some(Value::String(raw.to_string())), "{raw}");
        }
        assert!(Envelope::decode(r#"{"value":1,"expire":"soon"}"#).is_err());
    }
}
