//! Request and response framing.
//!
//! Request frame:
//!
//! ```text
//! +-------------+---------+------------------------+
//! | length      | call_id | arguments              |
//! | u32 LE      | u8      | length - 1 bytes       |
//! +-------------+---------+------------------------+
//! ```
//!
//! Response frame:
//!
//! ```text
//! +--------+-------------+---------------------------+
//! | status | length      | payload                   |
//! | u8     | u32 LE      | length bytes              |
//! +--------+-------------+---------------------------+
//! ```
//!
//! Length and payload follow only when `status` is 0; an error response is
//! the status byte alone.

use crate::buffer::LENGTH_PREFIX_SIZE;
use crate::error::{ProtocolError, ResponseCode};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Size of the response status field.
pub const STATUS_SIZE: usize = 1;

/// Validates a response length field against `max`.
pub fn payload_length(header: [u8; LENGTH_PREFIX_SIZE], max: u32) -> Result<usize, ProtocolError> {
    let length = u32::from_le_bytes(header);
    if length > max {
        return Err(ProtocolError::FrameTooLarge {
            size: length as u64,
            max: max as u64,
        });
    }
    Ok(length as usize)
}

/// Builds a response frame as a server would send it. Payload is ignored for
/// error statuses.
pub fn encode_response(status: u8, payload: &[u8]) -> Result<BytesMut, ProtocolError> {
    if status != ResponseCode::Success.as_u8() {
        let mut buf = BytesMut::with_capacity(STATUS_SIZE);
        buf.put_u8(status);
        return Ok(buf);
    }
    let length = u32::try_from(payload.len()).map_err(|_| ProtocolError::FrameTooLarge {
        size: payload.len() as u64,
        max: u32::MAX as u64,
    })?;
    let mut buf = BytesMut::with_capacity(STATUS_SIZE + LENGTH_PREFIX_SIZE + payload.len());
    buf.put_u8(status);
    buf.put_u32_le(length);
    buf.put_slice(payload);
    Ok(buf)
}

/// A request frame as seen by the receiving side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFrame {
    pub call_id: u8,
    pub args: Bytes,
}

impl RequestFrame {
    /// Decodes one request frame from the front of `buf`.
    ///
    /// Returns `Ok(None)` if more data is needed.
    pub fn decode(buf: &mut BytesMut, max: u32) -> Result<Option<Self>, ProtocolError> {
        if buf.len() < LENGTH_PREFIX_SIZE {
            return Ok(None);
        }
        let mut header = [0u8; LENGTH_PREFIX_SIZE];
        header.copy_from_slice(&buf[..LENGTH_PREFIX_SIZE]);
        let length = payload_length(header, max)?;
        if length == 0 {
            return Err(ProtocolError::BufferUnderrun {
                requested: 1,
                available: 0,
            });
        }
        if buf.len() < LENGTH_PREFIX_SIZE + length {
            return Ok(None);
        }

        buf.advance(LENGTH_PREFIX_SIZE);
        let mut body = buf.split_to(length).freeze();
        let call_id = body.get_u8();
        Ok(Some(Self {
            call_id,
            args: body,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::ByteBuffer;
    use crate::requests::{PingStoreRequest, Request, UnloadTableRequest};
    use crate::MAX_PAYLOAD_SIZE;

    #[test]
    fn test_payload_length() {
        assert_eq!(payload_length([10, 0, 0, 0], MAX_PAYLOAD_SIZE).unwrap(), 10);
        assert!(matches!(
            payload_length([0xff, 0xff, 0xff, 0xff], MAX_PAYLOAD_SIZE),
            Err(ProtocolError::FrameTooLarge { .. })
        ));
    }

    #[test]
    fn test_encode_success_response() {
        let frame = encode_response(0, &[7, 0, 0, 0, 2, 0, 0, 0]).unwrap();
        assert_eq!(frame[0], 0);
        assert_eq!(&frame[1..5], &[8, 0, 0, 0]);
        assert_eq!(frame.len(), 13);
    }

    #[test]
    fn test_encode_error_response() {
        let frame = encode_response(5, b"ignored").unwrap();
        assert_eq!(&frame[..], &[5]);
    }

    #[test]
    fn test_request_frame_roundtrip() {
        let mut out = ByteBuffer::new();
        UnloadTableRequest {
            homedir: "/d",
            table_id: 7,
        }
        .serialize(&mut out)
        .unwrap();

        let mut buf = BytesMut::from(out.as_slice());
        let frame = RequestFrame::decode(&mut buf, MAX_PAYLOAD_SIZE)
            .unwrap()
            .unwrap();
        assert_eq!(frame.call_id, 0x2b);
        assert_eq!(&frame.args[..], b"/d\0\x07\x00\x00\x00");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_incomplete_request_frame() {
        let mut out = ByteBuffer::new();
        PingStoreRequest { homedir: "/d" }.serialize(&mut out).unwrap();

        let mut buf = BytesMut::from(&out.as_slice()[..5]);
        assert!(RequestFrame::decode(&mut buf, MAX_PAYLOAD_SIZE)
            .unwrap()
            .is_none());
        assert_eq!(buf.len(), 5);

        let mut buf = BytesMut::from(&out.as_slice()[..3]);
        assert!(RequestFrame::decode(&mut buf, MAX_PAYLOAD_SIZE)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_multiple_request_frames() {
        let mut buf = BytesMut::new();
        for homedir in ["/a", "/b"] {
            let mut out = ByteBuffer::new();
            PingStoreRequest { homedir }.serialize(&mut out).unwrap();
            buf.extend_from_slice(out.as_slice());
        }

        let first = RequestFrame::decode(&mut buf, MAX_PAYLOAD_SIZE).unwrap().unwrap();
        let second = RequestFrame::decode(&mut buf, MAX_PAYLOAD_SIZE).unwrap().unwrap();
        assert_eq!(&first.args[..], b"/a\0");
        assert_eq!(&second.args[..], b"/b\0");
    }

    #[test]
    fn test_empty_request_frame() {
        let mut buf = BytesMut::from(&[0u8, 0, 0, 0][..]);
        assert!(RequestFrame::decode(&mut buf, MAX_PAYLOAD_SIZE).is_err());
    }
}
