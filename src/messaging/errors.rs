//! # Messaging Error Types
//!
//! Structured error types for the request/result queues, used instead of
//! `Box<dyn Error>` so callers can tell a dead broker from a bad payload.

use thiserror::Error;

/// Queue transport and wire-format errors
#[derive(Error, Debug)]
pub enum MessagingError {
    #[error("Broker connection error: {message}")]
    Connection { message: String },

    #[error("Queue operation failed: {queue_name}: {operation}: {message}")]
    QueueOperation {
        queue_name: String,
        operation: String,
        message: String,
    },

    #[error("Queue closed: {queue_name}")]
    QueueClosed { queue_name: String },

    #[error("Message serialization error: {message}")]
    MessageSerialization { message: String },

    #[error("Message deserialization error: {message}")]
    MessageDeserialization { message: String },
}

impl MessagingError {
    /// Create a broker connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a queue operation error
    pub fn queue_operation(
        queue_name: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::QueueOperation {
            queue_name: queue_name.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a queue closed error
    pub fn queue_closed(queue_name: impl Into<String>) -> Self {
        Self::QueueClosed {
            queue_name: queue_name.into(),
        }
    }

    /// Create a message serialization error
    pub fn message_serialization(message: impl Into<String>) -> Self {
        Self::MessageSerialization {
            message: message.into(),
        }
    }

    /// Create a message deserialization error
    pub fn message_deserialization(message: impl Into<String>) -> Self {
        Self::MessageDeserialization {
            message: message.into(),
        }
    }

    /// Classify a Redis failure: lost or refused connections are broker
    /// connection errors, everything else is an error of the operation
    pub fn redis(
        queue_name: impl Into<String>,
        operation: impl Into<String>,
        err: redis::RedisError,
    ) -> Self {
        if err.is_connection_dropped() || err.is_connection_refusal() || err.is_io_error() {
            Self::connection(err.to_string())
        } else {
            Self::queue_operation(queue_name, operation, err.to_string())
        }
    }
}

/// Conversion from serde_json::Error to MessagingError
impl From<serde_json::Error> for MessagingError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_syntax() || err.is_data() || err.is_eof() {
            MessagingError::message_deserialization(err.to_string())
        } else {
            MessagingError::message_serialization(err.to_string())
        }
    }
}

/// Result type alias for messaging operations
pub type MessagingResult<T> = Result<T, MessagingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messaging_error_creation() {
        let conn_err = MessagingError::connection("Connection refused");
        assert!(matches!(conn_err, MessagingError::Connection { .. }));

        let queue_err = MessagingError::queue_operation("inputs", "pop", "Failed to pop");
        assert!(matches!(queue_err, MessagingError::QueueOperation { .. }));
    }

    #[test]
    fn test_error_conversions() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid json").unwrap_err();
        let messaging_err: MessagingError = json_err.into();
        assert!(matches!(
            messaging_err,
            MessagingError::MessageDeserialization { .. }
        ));
    }

    #[test]
    fn test_redis_errors_are_classified() {
        let refused = redis::RedisError::from(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        ));
        assert!(matches!(
            MessagingError::redis("method_server_inputs", "BLPOP", refused),
            MessagingError::Connection { .. }
        ));

        let wrong_type = redis::RedisError::from((redis::ErrorKind::TypeError, "not a list"));
        match MessagingError::redis("method_server_inputs", "BLPOP", wrong_type) {
            MessagingError::QueueOperation {
                queue_name,
                operation,
                ..
            } => {
                assert_eq!(queue_name, "method_server_inputs");
                assert_eq!(operation, "BLPOP");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_error_display() {
        let queue_err = MessagingError::queue_operation("method_server_inputs", "push", "Push failed");
        let display_str = format!("{queue_err}");
        assert!(display_str.contains("Queue operation failed"));
        assert!(display_str.contains("method_server_inputs"));
        assert!(display_str.contains("push"));
        assert!(display_str.contains("Push failed"));
    }
}
