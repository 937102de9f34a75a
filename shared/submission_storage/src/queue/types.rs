use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::queue::error::{QueueError, QueueResult};

/// A case application accepted for asynchronous delivery
///
/// Serialized on the wire as `{"applicationPayload": .., "reference": ..}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueuedSubmission {
    /// Submitted application, opaque to the queue
    pub application_payload: serde_json::Value,
    /// Submission reference minted when the application was accepted
    pub reference: String,
}

/// A message as returned by the transport, before its body is parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    /// Message ID
    pub message_id: String,
    /// Receipt handle for this delivery attempt
    pub receipt_handle: String,
    /// Raw message body, if any
    pub body: Option<String>,
}

impl ReceivedMessage {
    /// Parses the body into `T`
    ///
    /// Returns `Ok(None)` for a message without a body or with a blank one.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::Deserialization` if the body is not a valid `T`
    pub fn parse<T: DeserializeOwned>(
        &self,
        visibility_timeout_seconds: i32,
    ) -> QueueResult<Option<QueueMessage<T>>> {
        let Some(body) = self.body.as_deref().filter(|b| !b.trim().is_empty()) else {
            return Ok(None);
        };

        let parsed = serde_json::from_str::<T>(body)
            .map_err(|e| QueueError::Deserialization(e.to_string()))?;

        Ok(Some(QueueMessage {
            body: parsed,
            receipt_handle: self.receipt_handle.clone(),
            message_id: self.message_id.clone(),
            visibility_timeout_seconds,
        }))
    }
}

/// Wrapper for queue messages with metadata
#[derive(Debug, Clone, PartialEq)]
pub struct QueueMessage<T> {
    /// The message body
    pub body: T,
    /// Receipt handle for acknowledging the message
    pub receipt_handle: String,
    /// Message ID
    pub message_id: String,
    /// Visibility timeout the message was received with
    pub visibility_timeout_seconds: i32,
}

/// Parameters of a single receive call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveRequest {
    /// Maximum number of messages to return
    pub max_messages: i32,
    /// Long polling wait time
    pub wait_time_seconds: i32,
    /// How long received messages stay hidden from other consumers
    pub visibility_timeout_seconds: i32,
}

/// Configuration for queue operations
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Queue URL
    pub queue_url: String,
    /// Default maximum number of messages to retrieve
    pub default_max_messages: i32,
    /// Default wait time for long polling
    pub default_wait_time_seconds: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn received(body: Option<&str>) -> ReceivedMessage {
        ReceivedMessage {
            message_id: "msg-1".to_string(),
            receipt_handle: "receipt-1".to_string(),
            body: body.map(str::to_string),
        }
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let submission = QueuedSubmission {
            application_payload: json!({"journeyId": "apply"}),
            reference: "ABC-123".to_string(),
        };

        let value = serde_json::to_value(&submission).unwrap();
        assert_eq!(
            value,
            json!({"applicationPayload": {"journeyId": "apply"}, "reference": "ABC-123"})
        );
    }

    #[test]
    fn test_parse_body() {
        let message = received(Some(r#"{"applicationPayload":{"a":1},"reference":"R1"}"#))
            .parse::<QueuedSubmission>(150)
            .unwrap()
            .unwrap();

        assert_eq!(message.body.reference, "R1");
        assert_eq!(message.receipt_handle, "receipt-1");
        assert_eq!(message.visibility_timeout_seconds, 150);
    }

    #[test]
    fn test_parse_without_body_is_none() {
        let parsed = received(None).parse::<QueuedSubmission>(120).unwrap();
        assert!(parsed.is_none());
    }

    #[test]
    fn test_parse_blank_body_is_none() {
        for body in ["", "  ", "\n"] {
            let parsed = received(Some(body)).parse::<QueuedSubmission>(120).unwrap();
            assert!(parsed.is_none(), "{body:?}");
        }
    }

    #[test]
    fn test_parse_invalid_body_is_error() {
        let result = received(Some("not json")).parse::<QueuedSubmission>(120);
        assert!(matches!(result, Err(QueueError::Deserialization(_))));

        let result = received(Some(r#"{"reference":"R1"}"#)).parse::<QueuedSubmission>(120);
        assert!(matches!(result, Err(QueueError::Deserialization(_))));
    }
}
