//! Decoded response payloads.
//!
//! Each type implements [`Response`] for exactly one [`ResponseShape`]; the
//! request side picks its response type through
//! [`Request::Response`](crate::requests::Request::Response), so the decoder
//! used for a call is fixed at compile time.

use crate::buffer::ByteBuffer;
use crate::call::ResponseShape;
use crate::error::ProtocolError;
use crate::structures::{MessageContent, PropertyProblem, PropvalList};
use serde::Serialize;

/// Decoder for one response shape.
pub trait Response: Sized {
    const SHAPE: ResponseShape;

    fn decode(buf: &mut ByteBuffer) -> Result<Self, ProtocolError>;
}

/// Status-only response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NullResponse;

impl Response for NullResponse {
    const SHAPE: ResponseShape = ResponseShape::Empty;

    fn decode(_buf: &mut ByteBuffer) -> Result<Self, ProtocolError> {
        Ok(NullResponse)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl Response for SuccessResponse {
    const SHAPE: ResponseShape = ResponseShape::Success;

    fn decode(buf: &mut ByteBuffer) -> Result<Self, ProtocolError> {
        Ok(Self {
            success: buf.pop_bool()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProblemsResponse {
    pub problems: Vec<PropertyProblem>,
}

impl Response for ProblemsResponse {
    const SHAPE: ResponseShape = ResponseShape::Problems;

    fn decode(buf: &mut ByteBuffer) -> Result<Self, ProtocolError> {
        Ok(Self {
            problems: buf.pop_list_u16()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProptagResponse {
    pub proptags: Vec<u32>,
}

impl Response for ProptagResponse {
    const SHAPE: ResponseShape = ResponseShape::Tags;

    fn decode(buf: &mut ByteBuffer) -> Result<Self, ProtocolError> {
        Ok(Self {
            proptags: buf.pop_list_u16()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropvalResponse {
    pub propvals: PropvalList,
}

impl Response for PropvalResponse {
    const SHAPE: ResponseShape = ResponseShape::Propvals;

    fn decode(buf: &mut ByteBuffer) -> Result<Self, ProtocolError> {
        Ok(Self {
            propvals: buf.pop_list_u16()?,
        })
    }
}

/// Rows returned by QUERY_TABLE.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableResponse {
    pub rows: Vec<PropvalList>,
}

impl Response for TableResponse {
    const SHAPE: ResponseShape = ResponseShape::Table;

    fn decode(buf: &mut ByteBuffer) -> Result<Self, ProtocolError> {
        let count = buf.pop_u32()?;
        let mut rows = Vec::with_capacity(buf.initial_capacity(count as usize));
        for _ in 0..count {
            rows.push(buf.pop_list_u16()?);
        }
        Ok(Self { rows })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FolderResponse {
    pub folder_id: u64,
}

impl Response for FolderResponse {
    const SHAPE: ResponseShape = ResponseShape::FolderId;

    fn decode(buf: &mut ByteBuffer) -> Result<Self, ProtocolError> {
        Ok(Self {
            folder_id: buf.pop_u64()?,
        })
    }
}

/// Handle and size of a freshly loaded table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoadTableResponse {
    pub table_id: u32,
    pub row_count: u32,
}

impl Response for LoadTableResponse {
    const SHAPE: ResponseShape = ResponseShape::TableInfo;

    fn decode(buf: &mut ByteBuffer) -> Result<Self, ProtocolError> {
        Ok(Self {
            table_id: buf.pop_u32()?,
            row_count: buf.pop_u32()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InstanceResponse {
    pub instance_id: u32,
}

impl Response for InstanceResponse {
    const SHAPE: ResponseShape = ResponseShape::InstanceId;

    fn decode(buf: &mut ByteBuffer) -> Result<Self, ProtocolError> {
        Ok(Self {
            instance_id: buf.pop_u32()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChangeNumResponse {
    pub change_num: u64,
}

impl Response for ChangeNumResponse {
    const SHAPE: ResponseShape = ResponseShape::ChangeNumber;

    fn decode(buf: &mut ByteBuffer) -> Result<Self, ProtocolError> {
        Ok(Self {
            change_num: buf.pop_u64()?,
        })
    }
}

/// READ_MESSAGE result; `None` when the message does not exist.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageContentResponse {
    pub content: Option<MessageContent>,
}

impl Response for MessageContentResponse {
    const SHAPE: ResponseShape = ResponseShape::MessageContent;

    fn decode(buf: &mut ByteBuffer) -> Result<Self, ProtocolError> {
        let content = if buf.pop_bool()? {
            Some(buf.pop()?)
        } else {
            None
        };
        Ok(Self { content })
    }
}
