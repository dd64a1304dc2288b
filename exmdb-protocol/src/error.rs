//! Protocol error types and server response codes.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Errors raised while encoding or decoding exmdb wire data.
///
/// None of these touch the transport; a failed encode or decode only
/// affects the call that produced it.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("read past the end of buffer: {requested} bytes requested, {available} bytes available")]
    BufferUnderrun { requested: usize, available: usize },

    #[error("unterminated string starting at offset {offset}")]
    UnterminatedString { offset: usize },

    #[error("deserialization of property type {0:#06x} is not supported")]
    UnsupportedPropType(u16),

    #[error("value of tag {tag:#010x} does not match property type {prop_type:#06x}")]
    ValueTypeMismatch { tag: u32, prop_type: u16 },

    #[error("too many elements: {count} (max {max})")]
    TooManyElements { count: usize, max: usize },

    #[error("comment restriction needs 1 to 255 values, got {0}")]
    InvalidCommentCount(usize),

    #[error("empty restriction cannot be nested inside another restriction")]
    NestedNullRestriction,

    #[error("string contains a zero byte at position {position}")]
    InteriorNul { position: usize },

    #[error("embedded messages nested deeper than {max} levels")]
    NestingTooDeep { max: usize },

    #[error("invalid UTF-8 in string value")]
    InvalidUtf8,

    #[error("binary buffer does not start with a matching length prefix")]
    MalformedBinary,

    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: u64, max: u64 },
}

/// Status byte sent by the server in front of every response.
///
/// Only [`ResponseCode::Success`] is followed by a length and payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum ResponseCode {
    Success = 0x00,
    AccessDeny = 0x01,
    MaxReached = 0x02,
    LackMemory = 0x03,
    MisconfigPrefix = 0x04,
    MisconfigMode = 0x05,
    ConnectUncomplete = 0x06,
    PullError = 0x07,
    DispatchError = 0x08,
    PushError = 0x09,
}

impl ResponseCode {
    /// Maps a raw status byte to a known code.
    pub fn from_u8(status: u8) -> Option<Self> {
        Some(match status {
            0x00 => ResponseCode::Success,
            0x01 => ResponseCode::AccessDeny,
            0x02 => ResponseCode::MaxReached,
            0x03 => ResponseCode::LackMemory,
            0x04 => ResponseCode::MisconfigPrefix,
            0x05 => ResponseCode::MisconfigMode,
            0x06 => ResponseCode::ConnectUncomplete,
            0x07 => ResponseCode::PullError,
            0x08 => ResponseCode::DispatchError,
            0x09 => ResponseCode::PushError,
            _ => return None,
        })
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseCode::Success => write!(f, "SUCCESS"),
            ResponseCode::AccessDeny => write!(f, "ACCESS_DENY"),
            ResponseCode::MaxReached => write!(f, "MAX_REACHED"),
            ResponseCode::LackMemory => write!(f, "LACK_MEMORY"),
            ResponseCode::MisconfigPrefix => write!(f, "MISCONFIG_PREFIX"),
            ResponseCode::MisconfigMode => write!(f, "MISCONFIG_MODE"),
            ResponseCode::ConnectUncomplete => write!(f, "CONNECT_UNCOMPLETE"),
            ResponseCode::PullError => write!(f, "PULL_ERROR"),
            ResponseCode::DispatchError => write!(f, "DISPATCH_ERROR"),
            ResponseCode::PushError => write!(f, "PUSH_ERROR"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_code_from_u8() {
        assert_eq!(ResponseCode::from_u8(0), Some(ResponseCode::Success));
        assert_eq!(ResponseCode::from_u8(5), Some(ResponseCode::MisconfigMode));
        assert_eq!(ResponseCode::from_u8(9), Some(ResponseCode::PushError));
        assert_eq!(ResponseCode::from_u8(10), None);
        assert_eq!(ResponseCode::from_u8(0xff), None);

        for status in 0u8..=9 {
            assert_eq!(ResponseCode::from_u8(status).unwrap().as_u8(), status);
        }
    }

    #[test]
    fn test_response_code_display() {
        assert_eq!(format!("{}", ResponseCode::Success), "SUCCESS");
        assert_eq!(format!("{}", ResponseCode::AccessDeny), "ACCESS_DENY");
        assert_eq!(
            format!("{}", ResponseCode::MisconfigPrefix),
            "MISCONFIG_PREFIX"
        );
        assert_eq!(
            format!("{}", ResponseCode::ConnectUncomplete),
            "CONNECT_UNCOMPLETE"
        );
        assert_eq!(format!("{}", ResponseCode::DispatchError), "DISPATCH_ERROR");
    }

    #[test]
    fn test_response_code_serialization() {
        let json = serde_json::to_string(&ResponseCode::LackMemory).unwrap();
        assert_eq!(json, "\"LACK_MEMORY\"");
    }

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::BufferUnderrun {
            requested: 8,
            available: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains('8') && msg.contains('3'));

        let err = ProtocolError::UnsupportedPropType(0x0048);
        assert!(err.to_string().contains("0x0048"));

        let err = ProtocolError::InvalidCommentCount(256);
        assert!(err.to_string().contains("256"));

        let err = ProtocolError::TooManyElements {
            count: 70000,
            max: 65535,
        };
        assert!(err.to_string().contains("70000"));

        let err = ProtocolError::InvalidUtf8;
        assert!(err.to_string().contains("UTF-8"));
    }
}
