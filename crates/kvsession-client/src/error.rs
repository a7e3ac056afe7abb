//! Error types for key-value client operations.

use std::time::Duration;

use crate::lifecycle::ClientState;

/// Boxed underlying cause of a transport or backend failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error type for key-value client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A data operation was attempted outside the `Established` state.
    ///
    /// Raised locally; the backend is never contacted.
    #[error("client not established (state: {state})")]
    NotEstablished { state: ClientState },

    /// Transport or backend failure.
    #[error("connection error: {source}")]
    Connection {
        #[source]
        source: BoxError,
    },

    /// The call exceeded its configured deadline.
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },
}

impl ClientError {
    /// Wrap an underlying cause as a connection error.
    pub fn connection(source: impl Into<BoxError>) -> Self {
        Self::Connection {
            source: source.into(),
        }
    }

    /// Returns true if this error was raised because the client is not established.
    pub fn is_not_established(&self) -> bool {
        matches!(self, Self::NotEstablished { .. })
    }

    /// Returns true if this error is a deadline expiry.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Result type for key-value client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_wraps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = ClientError::connection(io);

        assert!(err.to_string().contains("refused"));
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.downcast_ref::<std::io::Error>().is_some());
    }

    #[test]
    fn test_predicates() {
        let err = ClientError::NotEstablished {
            state: ClientState::ShutDown,
        };
        assert!(err.is_not_established());
        assert!(!err.is_timeout());
        assert_eq!(err.to_string(), "client not established (state: shut down)");

        let err = ClientError::Timeout {
            operation: "get",
            timeout: Duration::from_millis(5),
        };
        assert!(err.is_timeout());
    }
}
