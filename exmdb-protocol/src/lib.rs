//! # exmdb-protocol
//!
//! Wire protocol implementation for the exmdb store RPC.
//!
//! This crate provides:
//! - `ByteBuffer`, a little-endian cursor buffer with length-prefix framing
//! - Tagged property values with owned or borrowed text and binary storage
//! - Restriction trees for filtering table loads
//! - The call table: request types bound to their response decoders
//! - Response status codes and protocol errors
//!
//! It performs no I/O; see `exmdb-client` for the connection.

pub mod buffer;
pub mod call;
pub mod error;
pub mod frame;
pub mod propval;
pub mod requests;
pub mod response;
pub mod restriction;
pub mod structures;
pub mod tags;
pub mod util;

pub use buffer::{ByteBuffer, Decode, Encode, LENGTH_PREFIX_SIZE};
pub use call::{CallId, ResponseShape};
pub use error::{ProtocolError, ResponseCode};
pub use frame::{encode_response, payload_length, RequestFrame, STATUS_SIZE};
pub use propval::{prop_type, PropvalValue, TaggedPropval};
pub use requests::Request;
pub use response::Response;
pub use restriction::{fuzzy_level, relop, Restriction};
pub use structures::{
    AttachmentContent, Guid, MessageContent, PermissionData, PropertyProblem, PropvalList,
    SortOrder, SortOrderSet, Xid, MAX_EMBEDDING_DEPTH,
};

/// Default port of the exmdb service.
pub const DEFAULT_PORT: u16 = 5000;

/// Default limit for a single response payload (64 MiB).
pub const MAX_PAYLOAD_SIZE: u32 = 64 * 1024 * 1024;
