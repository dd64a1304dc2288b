//! Composite wire structures shared by several calls.

use crate::buffer::{ByteBuffer, Decode, Encode};
use crate::error::ProtocolError;
use crate::propval::TaggedPropval;
use serde::Serialize;
use std::fmt;

/// Decoded property list, as returned in rows and property responses.
pub type PropvalList = Vec<TaggedPropval<'static>>;

/// Per-property failure reported by the SET_*_PROPERTIES calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PropertyProblem {
    pub index: u16,
    pub proptag: u32,
    pub err: u32,
}

impl Decode for PropertyProblem {
    fn decode(buf: &mut ByteBuffer) -> Result<Self, ProtocolError> {
        Ok(Self {
            index: buf.pop_u16()?,
            proptag: buf.pop_u32()?,
            err: buf.pop_u32()?,
        })
    }
}

impl Encode for PropertyProblem {
    fn encode(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        buf.push_u16(self.index);
        buf.push_u32(self.proptag);
        buf.push_u32(self.err);
        Ok(())
    }
}

/// Row operation flags for [`PermissionData`].
pub mod permission_flags {
    pub const ADD_ROW: u8 = 0x01;
    pub const MODIFY_ROW: u8 = 0x02;
    pub const REMOVE_ROW: u8 = 0x04;
}

/// One row of a permission table update.
#[derive(Debug, Clone, PartialEq)]
pub struct PermissionData<'a> {
    pub flags: u8,
    pub propvals: Vec<TaggedPropval<'a>>,
}

impl<'a> PermissionData<'a> {
    pub fn new(flags: u8, propvals: Vec<TaggedPropval<'a>>) -> Self {
        Self { flags, propvals }
    }
}

impl Encode for PermissionData<'_> {
    fn encode(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        buf.push_u8(self.flags);
        buf.push_list_u16(&self.propvals)
    }
}

/// Sort direction codes.
pub mod table_sort {
    pub const ASCEND: u8 = 0x00;
    pub const DESCEND: u8 = 0x01;
    pub const MAXIMUM_CATEGORY: u8 = 0x04;
    pub const MINIMUM_CATEGORY: u8 = 0x08;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder {
    pub prop_type: u16,
    pub prop_id: u16,
    pub table_sort: u8,
}

impl SortOrder {
    pub fn new(proptag: u32, table_sort: u8) -> Self {
        Self {
            prop_type: crate::propval::tag_type(proptag),
            prop_id: crate::propval::tag_id(proptag),
            table_sort,
        }
    }
}

impl Encode for SortOrder {
    fn encode(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        buf.push_u16(self.prop_type);
        buf.push_u16(self.prop_id);
        buf.push_u8(self.table_sort);
        Ok(())
    }
}

/// Sort order for content tables. The first `categories` sorts are
/// category columns, `expanded` of which start expanded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortOrderSet {
    pub categories: u16,
    pub expanded: u16,
    pub sorts: Vec<SortOrder>,
}

impl SortOrderSet {
    pub fn new(sorts: Vec<SortOrder>) -> Self {
        Self {
            categories: 0,
            expanded: 0,
            sorts,
        }
    }
}

impl Encode for SortOrderSet {
    fn encode(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        let count = u16::try_from(self.sorts.len()).map_err(|_| ProtocolError::TooManyElements {
            count: self.sorts.len(),
            max: u16::MAX as usize,
        })?;
        buf.push_u16(count);
        buf.push_u16(self.categories);
        buf.push_u16(self.expanded);
        self.sorts.iter().try_for_each(|sort| sort.encode(buf))
    }
}

/// Attachment of a message, optionally embedding another message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttachmentContent {
    pub propvals: PropvalList,
    pub embedded: Option<Box<MessageContent>>,
}

/// Full message: properties, recipient rows and attachments.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MessageContent {
    pub propvals: PropvalList,
    pub recipients: Option<Vec<PropvalList>>,
    pub attachments: Option<Vec<AttachmentContent>>,
}

/// Deepest chain of attachment-embedded messages accepted when decoding.
pub const MAX_EMBEDDING_DEPTH: usize = 32;

impl AttachmentContent {
    fn decode_at(buf: &mut ByteBuffer, depth: usize) -> Result<Self, ProtocolError> {
        let propvals = buf.pop_list_u16()?;
        let embedded = if buf.pop_bool()? {
            Some(Box::new(MessageContent::decode_at(buf, depth + 1)?))
        } else {
            None
        };
        Ok(Self { propvals, embedded })
    }
}

impl MessageContent {
    fn decode_at(buf: &mut ByteBuffer, depth: usize) -> Result<Self, ProtocolError> {
        if depth > MAX_EMBEDDING_DEPTH {
            return Err(ProtocolError::NestingTooDeep {
                max: MAX_EMBEDDING_DEPTH,
            });
        }
        let propvals = buf.pop_list_u16()?;
        let recipients = if buf.pop_bool()? {
            let count = buf.pop_u32()? as usize;
            let mut rows = Vec::with_capacity(buf.initial_capacity(count));
            for _ in 0..count {
                rows.push(buf.pop_list_u16()?);
            }
            Some(rows)
        } else {
            None
        };
        let attachments = if buf.pop_bool()? {
            let count = buf.pop_u16()? as usize;
            let mut items = Vec::with_capacity(buf.initial_capacity(count));
            for _ in 0..count {
                items.push(AttachmentContent::decode_at(buf, depth)?);
            }
            Some(items)
        } else {
            None
        };
        Ok(Self {
            propvals,
            recipients,
            attachments,
        })
    }
}

impl Decode for AttachmentContent {
    fn decode(buf: &mut ByteBuffer) -> Result<Self, ProtocolError> {
        Self::decode_at(buf, 0)
    }
}

impl Decode for MessageContent {
    fn decode(buf: &mut ByteBuffer) -> Result<Self, ProtocolError> {
        Self::decode_at(buf, 0)
    }
}

impl Encode for AttachmentContent {
    fn encode(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        buf.push_list_u16(&self.propvals)?;
        match &self.embedded {
            Some(message) => {
                buf.push_bool(true);
                message.encode(buf)
            }
            None => {
                buf.push_bool(false);
                Ok(())
            }
        }
    }
}

impl Encode for MessageContent {
    fn encode(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        buf.push_list_u16(&self.propvals)?;
        match &self.recipients {
            Some(rows) => {
                buf.push_bool(true);
                let count = u32::try_from(rows.len()).map_err(|_| ProtocolError::TooManyElements {
                    count: rows.len(),
                    max: u32::MAX as usize,
                })?;
                buf.push_u32(count);
                for row in rows {
                    buf.push_list_u16(row)?;
                }
            }
            None => buf.push_bool(false),
        }
        match &self.attachments {
            Some(attachments) => {
                buf.push_bool(true);
                buf.push_list_u16(attachments)
            }
            None => {
                buf.push_bool(false);
                Ok(())
            }
        }
    }
}

/// 16 byte GUID with little-endian integer fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Guid {
    pub time_low: u32,
    pub time_mid: u16,
    pub time_hi_and_version: u16,
    pub clock_seq: [u8; 2],
    pub node: [u8; 6],
}

impl Guid {
    /// Store GUID of the public store belonging to `domain_id`.
    pub fn from_domain_id(domain_id: u32) -> Self {
        Self {
            time_low: domain_id,
            time_mid: 0x0afb,
            time_hi_and_version: 0x7df6,
            clock_seq: [0x91, 0x92],
            node: [0x49, 0x88, 0x6a, 0xa7, 0x38, 0xce],
        }
    }
}

impl Encode for Guid {
    fn encode(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        buf.push_u32(self.time_low);
        buf.push_u16(self.time_mid);
        buf.push_u16(self.time_hi_and_version);
        buf.push_raw(&self.clock_seq);
        buf.push_raw(&self.node);
        Ok(())
    }
}

impl Decode for Guid {
    fn decode(buf: &mut ByteBuffer) -> Result<Self, ProtocolError> {
        let time_low = buf.pop_u32()?;
        let time_mid = buf.pop_u16()?;
        let time_hi_and_version = buf.pop_u16()?;
        let mut clock_seq = [0u8; 2];
        clock_seq.copy_from_slice(buf.pop_raw(2)?);
        let mut node = [0u8; 6];
        node.copy_from_slice(buf.pop_raw(6)?);
        Ok(Self {
            time_low,
            time_mid,
            time_hi_and_version,
            clock_seq,
            node,
        })
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{}-{}",
            self.time_low,
            self.time_mid,
            self.time_hi_and_version,
            hex::encode(self.clock_seq),
            hex::encode(self.node)
        )
    }
}

/// GUID plus 48-bit local id, the building block of change keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Xid {
    pub guid: Guid,
    pub local_id: u64,
}

impl Xid {
    /// Serialized size: 16 byte GUID and 6 byte local id.
    pub const SIZE: usize = 22;

    pub fn new(guid: Guid, local_id: u64) -> Self {
        Self { guid, local_id }
    }

    /// Serializes the XID into a framed buffer suitable for
    /// [`TaggedPropval::binary_from_buffer`].
    pub fn to_framed_buffer(&self) -> Result<ByteBuffer, ProtocolError> {
        let mut buf = ByteBuffer::with_capacity(4 + Self::SIZE);
        buf.start();
        self.encode(&mut buf)?;
        buf.finalize()?;
        Ok(buf)
    }
}

impl Encode for Xid {
    fn encode(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        self.guid.encode(buf)?;
        // Low 48 bits, most significant byte first
        buf.push_raw(&self.local_id.to_be_bytes()[2..]);
        Ok(())
    }
}

impl Decode for Xid {
    fn decode(buf: &mut ByteBuffer) -> Result<Self, ProtocolError> {
        let guid = Guid::decode(buf)?;
        let mut local = [0u8; 8];
        local[2..].copy_from_slice(buf.pop_raw(6)?);
        Ok(Self {
            guid,
            local_id: u64::from_be_bytes(local),
        })
    }
}
