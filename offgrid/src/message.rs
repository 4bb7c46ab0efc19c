//! Control messages posted from pages to the interceptor.

use serde::{Deserialize, Serialize};

/// A message identified by its `type` field.
///
/// ```
/// use offgrid::ControlMessage;
///
/// let message: ControlMessage = serde_json::from_str(r#"{"type":"CLEAN_CACHE"}"#).unwrap();
/// assert_eq!(message, ControlMessage::CleanCache);
///
/// let other: ControlMessage = serde_json::from_str(r#"{"type":"PING"}"#).unwrap();
/// assert_eq!(other, ControlMessage::Unknown);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
    /// Trim every cache down to its keep threshold.
    #[serde(rename = "CLEAN_CACHE")]
    CleanCache,
    /// Any other message type. Ignored.
    #[serde(other)]
    Unknown,
}

impl ControlMessage {
    /// Reads a message from arbitrary posted data.
    ///
    /// Data without a recognised `type` is [`ControlMessage::Unknown`].
    pub fn from_value(value: serde_json::Value) -> Self {
        serde_json::from_value(value).unwrap_or(ControlMessage::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn non_objects_are_unknown() {
        assert_eq!(ControlMessage::from_value(json!("CLEAN_CACHE")), ControlMessage::Unknown);
        assert_eq!(ControlMessage::from_value(json!({})), ControlMessage::Unknown);
        assert_eq!(
            ControlMessage::from_value(json!({"type": "CLEAN_CACHE", "extra": 1})),
            ControlMessage::CleanCache
        );
    }
}
