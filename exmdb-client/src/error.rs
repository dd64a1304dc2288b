//! Client error types.

use exmdb_protocol::{ProtocolError, ResponseCode};
use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not resolve address {addr}")]
    Resolve { addr: String },

    #[error("could not connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("not connected")]
    NotConnected,

    #[error("connection closed unexpectedly")]
    ConnectionClosed,

    #[error("response of {size} bytes exceeds the {max} byte limit")]
    ResponseTooLarge { size: u64, max: u64 },

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("call failed with response code {status}{}", describe_status(.status))]
    Server { status: u8 },
}

fn describe_status(status: &u8) -> String {
    ResponseCode::from_u8(*status)
        .map(|code| format!(" ({})", code))
        .unwrap_or_default()
}

impl ClientError {
    /// Known response code of a server-reported failure.
    pub fn code(&self) -> Option<ResponseCode> {
        self.status().and_then(ResponseCode::from_u8)
    }

    /// Raw status byte of a server-reported failure.
    pub fn status(&self) -> Option<u8> {
        match self {
            ClientError::Server { status } => Some(*status),
            _ => None,
        }
    }

    /// Returns whether this error invalidated the connection. These are the
    /// failures on which [`Connection::send`](crate::Connection::send) closes
    /// the stream.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ClientError::Io(_)
                | ClientError::Resolve { .. }
                | ClientError::Connect { .. }
                | ClientError::ConnectionClosed
                | ClientError::ResponseTooLarge { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_display() {
        let err = ClientError::Server { status: 5 };
        assert_eq!(
            err.to_string(),
            "call failed with response code 5 (MISCONFIG_MODE)"
        );
        assert_eq!(err.code(), Some(ResponseCode::MisconfigMode));

        let err = ClientError::Server { status: 42 };
        assert_eq!(err.to_string(), "call failed with response code 42");
        assert_eq!(err.status(), Some(42));
        assert_eq!(err.code(), None);
    }

    #[test]
    fn test_classification() {
        assert!(ClientError::ConnectionClosed.is_transport());
        assert!(ClientError::ResponseTooLarge { size: 1 << 24, max: 1024 }.is_transport());
        assert!(ClientError::Io(std::io::ErrorKind::BrokenPipe.into()).is_transport());
        assert!(!ClientError::Server { status: 1 }.is_transport());
        assert!(!ClientError::Protocol(ProtocolError::InvalidUtf8).is_transport());
        assert!(!ClientError::NotConnected.is_transport());
        assert_eq!(ClientError::NotConnected.status(), None);
    }
}
