//! Request types, one per call.
//!
//! Every call except CONNECT takes the store's home directory as its first
//! argument. Requests borrow their arguments; build them right before sending.

use crate::buffer::ByteBuffer;
use crate::call::CallId;
use crate::error::ProtocolError;
use crate::propval::TaggedPropval;
use crate::response::{
    ChangeNumResponse, FolderResponse, InstanceResponse, LoadTableResponse,
    MessageContentResponse, NullResponse, ProblemsResponse, PropvalResponse, ProptagResponse,
    Response, SuccessResponse, TableResponse,
};
use crate::restriction::Restriction;
use crate::structures::{PermissionData, SortOrderSet};

/// A call with its arguments.
pub trait Request {
    const CALL_ID: CallId;

    /// Decoder for the response payload.
    type Response: Response;

    /// Writes the arguments, in wire order, without call id or framing.
    fn serialize_args(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError>;

    /// Writes the complete frame: length prefix, call id and arguments.
    fn serialize(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        buf.start();
        buf.push_u8(Self::CALL_ID.as_u8());
        self.serialize_args(buf)?;
        buf.finalize()
    }
}

/// Optional user name: presence byte, then the text if non-empty.
fn push_username(buf: &mut ByteBuffer, username: &str) -> Result<(), ProtocolError> {
    buf.push_bool(!username.is_empty());
    if username.is_empty() {
        return Ok(());
    }
    buf.push_str(username)
}

/// Optional restriction: presence byte, then the tree if truthy.
fn push_restriction(buf: &mut ByteBuffer, restriction: &Restriction<'_>) -> Result<(), ProtocolError> {
    buf.push_bool(restriction.is_truthy());
    buf.push(restriction)
}

/// Opens a session on the connection. Must be the first call.
#[derive(Debug, Clone)]
pub struct ConnectRequest<'a> {
    pub prefix: &'a str,
    pub session_id: &'a str,
    pub is_private: bool,
}

impl Request for ConnectRequest<'_> {
    const CALL_ID: CallId = CallId::Connect;
    type Response = NullResponse;

    fn serialize_args(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.prefix)?;
        buf.push_str(self.session_id)?;
        buf.push_bool(self.is_private);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PingStoreRequest<'a> {
    pub homedir: &'a str,
}

impl Request for PingStoreRequest<'_> {
    const CALL_ID: CallId = CallId::PingStore;
    type Response = NullResponse;

    fn serialize_args(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir)?;
        Ok(())
    }
}

// ----------------------------------------------------------------------
// Store properties
// ----------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GetStoreAllProptagsRequest<'a> {
    pub homedir: &'a str,
}

impl Request for GetStoreAllProptagsRequest<'_> {
    const CALL_ID: CallId = CallId::GetStoreAllProptags;
    type Response = ProptagResponse;

    fn serialize_args(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct GetStorePropertiesRequest<'a> {
    pub homedir: &'a str,
    pub cpid: u32,
    pub proptags: &'a [u32],
}

impl Request for GetStorePropertiesRequest<'_> {
    const CALL_ID: CallId = CallId::GetStoreProperties;
    type Response = PropvalResponse;

    fn serialize_args(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir)?;
        buf.push_u32(self.cpid);
        buf.push_list_u16(self.proptags)
    }
}

#[derive(Debug, Clone)]
pub struct SetStorePropertiesRequest<'a> {
    pub homedir: &'a str,
    pub cpid: u32,
    pub propvals: &'a [TaggedPropval<'a>],
}

impl Request for SetStorePropertiesRequest<'_> {
    const CALL_ID: CallId = CallId::SetStoreProperties;
    type Response = ProblemsResponse;

    fn serialize_args(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir)?;
        buf.push_u32(self.cpid);
        buf.push_list_u16(self.propvals)
    }
}

#[derive(Debug, Clone)]
pub struct RemoveStorePropertiesRequest<'a> {
    pub homedir: &'a str,
    pub proptags: &'a [u32],
}

impl Request for RemoveStorePropertiesRequest<'_> {
    const CALL_ID: CallId = CallId::RemoveStoreProperties;
    type Response = NullResponse;

    fn serialize_args(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir)?;
        buf.push_list_u16(self.proptags)
    }
}

// ----------------------------------------------------------------------
// Folders
// ----------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GetFolderByNameRequest<'a> {
    pub homedir: &'a str,
    pub parent_id: u64,
    pub name: &'a str,
}

impl Request for GetFolderByNameRequest<'_> {
    const CALL_ID: CallId = CallId::GetFolderByName;
    type Response = FolderResponse;

    fn serialize_args(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir)?;
        buf.push_u64(self.parent_id);
        buf.push_str(self.name)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CreateFolderByPropertiesRequest<'a> {
    pub homedir: &'a str,
    pub cpid: u32,
    pub propvals: &'a [TaggedPropval<'a>],
}

impl Request for CreateFolderByPropertiesRequest<'_> {
    const CALL_ID: CallId = CallId::CreateFolderByProperties;
    type Response = FolderResponse;

    fn serialize_args(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir)?;
        buf.push_u32(self.cpid);
        buf.push_list_u16(self.propvals)
    }
}

#[derive(Debug, Clone)]
pub struct GetFolderPropertiesRequest<'a> {
    pub homedir: &'a str,
    pub cpid: u32,
    pub folder_id: u64,
    pub proptags: &'a [u32],
}

impl Request for GetFolderPropertiesRequest<'_> {
    const CALL_ID: CallId = CallId::GetFolderProperties;
    type Response = PropvalResponse;

    fn serialize_args(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir)?;
        buf.push_u32(self.cpid);
        buf.push_u64(self.folder_id);
        buf.push_list_u16(self.proptags)
    }
}

#[derive(Debug, Clone)]
pub struct SetFolderPropertiesRequest<'a> {
    pub homedir: &'a str,
    pub cpid: u32,
    pub folder_id: u64,
    pub propvals: &'a [TaggedPropval<'a>],
}

impl Request for SetFolderPropertiesRequest<'_> {
    const CALL_ID: CallId = CallId::SetFolderProperties;
    type Response = ProblemsResponse;

    fn serialize_args(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir)?;
        buf.push_u32(self.cpid);
        buf.push_u64(self.folder_id);
        buf.push_list_u16(self.propvals)
    }
}

#[derive(Debug, Clone)]
pub struct RemoveFolderPropertiesRequest<'a> {
    pub homedir: &'a str,
    pub folder_id: u64,
    pub proptags: &'a [u32],
}

impl Request for RemoveFolderPropertiesRequest<'_> {
    const CALL_ID: CallId = CallId::RemoveFolderProperties;
    type Response = NullResponse;

    fn serialize_args(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir)?;
        buf.push_u64(self.folder_id);
        buf.push_list_u16(self.proptags)
    }
}

#[derive(Debug, Clone)]
pub struct DeleteFolderRequest<'a> {
    pub homedir: &'a str,
    pub cpid: u32,
    pub folder_id: u64,
    pub hard: bool,
}

impl Request for DeleteFolderRequest<'_> {
    const CALL_ID: CallId = CallId::DeleteFolder;
    type Response = SuccessResponse;

    fn serialize_args(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir)?;
        buf.push_u32(self.cpid);
        buf.push_u64(self.folder_id);
        buf.push_bool(self.hard);
        Ok(())
    }
}

/// Deletes folder content. The flags select hard deletion and which kinds
/// of items go: normal messages, associated (FAI) messages, subfolders.
#[derive(Debug, Clone)]
pub struct EmptyFolderRequest<'a> {
    pub homedir: &'a str,
    pub cpid: u32,
    pub username: &'a str,
    pub folder_id: u64,
    pub hard: bool,
    pub normal: bool,
    pub fai: bool,
    pub sub: bool,
}

impl Request for EmptyFolderRequest<'_> {
    const CALL_ID: CallId = CallId::EmptyFolder;
    type Response = SuccessResponse;

    fn serialize_args(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir)?;
        buf.push_u32(self.cpid);
        push_username(buf, self.username)?;
        buf.push_u64(self.folder_id);
        buf.push_bool(self.hard);
        buf.push_bool(self.normal);
        buf.push_bool(self.fai);
        buf.push_bool(self.sub);
        Ok(())
    }
}

// ----------------------------------------------------------------------
// Tables
// ----------------------------------------------------------------------

/// Loads the subfolder table of `folder_id`.
///
/// `username` and `table_flags` are passed through unchanged.
#[derive(Debug, Clone)]
pub struct LoadHierarchyTableRequest<'a> {
    pub homedir: &'a str,
    pub folder_id: u64,
    pub username: &'a str,
    pub table_flags: u8,
    pub restriction: Restriction<'a>,
}

impl<'a> LoadHierarchyTableRequest<'a> {
    pub fn new(homedir: &'a str, folder_id: u64, username: &'a str, table_flags: u8) -> Self {
        Self {
            homedir,
            folder_id,
            username,
            table_flags,
            restriction: Restriction::Null,
        }
    }

    pub fn with_restriction(mut self, restriction: Restriction<'a>) -> Self {
        self.restriction = restriction;
        self
    }
}

impl Request for LoadHierarchyTableRequest<'_> {
    const CALL_ID: CallId = CallId::LoadHierarchyTable;
    type Response = LoadTableResponse;

    fn serialize_args(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir)?;
        buf.push_u64(self.folder_id);
        push_username(buf, self.username)?;
        buf.push_u8(self.table_flags);
        push_restriction(buf, &self.restriction)
    }
}

/// Loads the message table of `folder_id`.
#[derive(Debug, Clone)]
pub struct LoadContentTableRequest<'a> {
    pub homedir: &'a str,
    pub cpid: u32,
    pub folder_id: u64,
    pub username: &'a str,
    pub table_flags: u8,
    pub restriction: Restriction<'a>,
    pub sorts: Option<SortOrderSet>,
}

impl<'a> LoadContentTableRequest<'a> {
    pub fn new(
        homedir: &'a str,
        cpid: u32,
        folder_id: u64,
        username: &'a str,
        table_flags: u8,
    ) -> Self {
        Self {
            homedir,
            cpid,
            folder_id,
            username,
            table_flags,
            restriction: Restriction::Null,
            sorts: None,
        }
    }

    pub fn with_restriction(mut self, restriction: Restriction<'a>) -> Self {
        self.restriction = restriction;
        self
    }

    pub fn with_sorts(mut self, sorts: SortOrderSet) -> Self {
        self.sorts = Some(sorts);
        self
    }
}

impl Request for LoadContentTableRequest<'_> {
    const CALL_ID: CallId = CallId::LoadContentTable;
    type Response = LoadTableResponse;

    fn serialize_args(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir)?;
        buf.push_u32(self.cpid);
        buf.push_u64(self.folder_id);
        push_username(buf, self.username)?;
        buf.push_u8(self.table_flags);
        push_restriction(buf, &self.restriction)?;
        match &self.sorts {
            Some(sorts) => {
                buf.push_bool(true);
                buf.push(sorts)
            }
            None => {
                buf.push_bool(false);
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadPermissionTableRequest<'a> {
    pub homedir: &'a str,
    pub folder_id: u64,
    pub table_flags: u8,
}

impl Request for LoadPermissionTableRequest<'_> {
    const CALL_ID: CallId = CallId::LoadPermissionTable;
    type Response = LoadTableResponse;

    fn serialize_args(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir)?;
        buf.push_u64(self.folder_id);
        buf.push_u8(self.table_flags);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct UnloadTableRequest<'a> {
    pub homedir: &'a str,
    pub table_id: u32,
}

impl Request for UnloadTableRequest<'_> {
    const CALL_ID: CallId = CallId::UnloadTable;
    type Response = NullResponse;

    fn serialize_args(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir)?;
        buf.push_u32(self.table_id);
        Ok(())
    }
}

/// Reads `row_needed` rows starting at `start_pos` from a loaded table.
#[derive(Debug, Clone)]
pub struct QueryTableRequest<'a> {
    pub homedir: &'a str,
    pub username: &'a str,
    pub cpid: u32,
    pub table_id: u32,
    pub proptags: &'a [u32],
    pub start_pos: u32,
    pub row_needed: u32,
}

impl Request for QueryTableRequest<'_> {
    const CALL_ID: CallId = CallId::QueryTable;
    type Response = TableResponse;

    fn serialize_args(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir)?;
        push_username(buf, self.username)?;
        buf.push_u32(self.cpid);
        buf.push_u32(self.table_id);
        buf.push_list_u16(self.proptags)?;
        buf.push_u32(self.start_pos);
        buf.push_u32(self.row_needed);
        Ok(())
    }
}

// ----------------------------------------------------------------------
// Instances
// ----------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LoadMessageInstanceRequest<'a> {
    pub homedir: &'a str,
    pub username: &'a str,
    pub cpid: u32,
    pub new: bool,
    pub folder_id: u64,
    pub message_id: u64,
}

impl Request for LoadMessageInstanceRequest<'_> {
    const CALL_ID: CallId = CallId::LoadMessageInstance;
    type Response = InstanceResponse;

    fn serialize_args(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir)?;
        push_username(buf, self.username)?;
        buf.push_u32(self.cpid);
        buf.push_bool(self.new);
        buf.push_u64(self.folder_id);
        buf.push_u64(self.message_id);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct UnloadInstanceRequest<'a> {
    pub homedir: &'a str,
    pub instance_id: u32,
}

impl Request for UnloadInstanceRequest<'_> {
    const CALL_ID: CallId = CallId::UnloadInstance;
    type Response = NullResponse;

    fn serialize_args(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir)?;
        buf.push_u32(self.instance_id);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct GetInstancePropertiesRequest<'a> {
    pub homedir: &'a str,
    pub size_limit: u32,
    pub instance_id: u32,
    pub proptags: &'a [u32],
}

impl Request for GetInstancePropertiesRequest<'_> {
    const CALL_ID: CallId = CallId::GetInstanceProperties;
    type Response = PropvalResponse;

    fn serialize_args(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir)?;
        buf.push_u32(self.size_limit);
        buf.push_u32(self.instance_id);
        buf.push_list_u16(self.proptags)
    }
}

#[derive(Debug, Clone)]
pub struct SetInstancePropertiesRequest<'a> {
    pub homedir: &'a str,
    pub instance_id: u32,
    pub propvals: &'a [TaggedPropval<'a>],
}

impl Request for SetInstancePropertiesRequest<'_> {
    const CALL_ID: CallId = CallId::SetInstanceProperties;
    type Response = ProblemsResponse;

    fn serialize_args(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir)?;
        buf.push_u32(self.instance_id);
        buf.push_list_u16(self.propvals)
    }
}

// ----------------------------------------------------------------------
// Messages and miscellaneous
// ----------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GetMessagePropertiesRequest<'a> {
    pub homedir: &'a str,
    pub username: &'a str,
    pub cpid: u32,
    pub message_id: u64,
    pub proptags: &'a [u32],
}

impl Request for GetMessagePropertiesRequest<'_> {
    const CALL_ID: CallId = CallId::GetMessageProperties;
    type Response = PropvalResponse;

    fn serialize_args(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir)?;
        push_username(buf, self.username)?;
        buf.push_u32(self.cpid);
        buf.push_u64(self.message_id);
        buf.push_list_u16(self.proptags)
    }
}

#[derive(Debug, Clone)]
pub struct SetMessagePropertiesRequest<'a> {
    pub homedir: &'a str,
    pub username: &'a str,
    pub cpid: u32,
    pub message_id: u64,
    pub propvals: &'a [TaggedPropval<'a>],
}

impl Request for SetMessagePropertiesRequest<'_> {
    const CALL_ID: CallId = CallId::SetMessageProperties;
    type Response = ProblemsResponse;

    fn serialize_args(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir)?;
        push_username(buf, self.username)?;
        buf.push_u32(self.cpid);
        buf.push_u64(self.message_id);
        buf.push_list_u16(self.propvals)
    }
}

#[derive(Debug, Clone)]
pub struct AllocateCnRequest<'a> {
    pub homedir: &'a str,
}

impl Request for AllocateCnRequest<'_> {
    const CALL_ID: CallId = CallId::AllocateCn;
    type Response = ChangeNumResponse;

    fn serialize_args(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir)?;
        Ok(())
    }
}

/// Adds, modifies or removes permission table rows of `folder_id`.
#[derive(Debug, Clone)]
pub struct UpdateFolderPermissionRequest<'a> {
    pub homedir: &'a str,
    pub folder_id: u64,
    pub freebusy: bool,
    pub rows: &'a [PermissionData<'a>],
}

impl Request for UpdateFolderPermissionRequest<'_> {
    const CALL_ID: CallId = CallId::UpdateFolderPermission;
    type Response = NullResponse;

    fn serialize_args(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir)?;
        buf.push_u64(self.folder_id);
        buf.push_bool(self.freebusy);
        buf.push_list_u16(self.rows)
    }
}

#[derive(Debug, Clone)]
pub struct ReadMessageRequest<'a> {
    pub homedir: &'a str,
    pub username: &'a str,
    pub cpid: u32,
    pub message_id: u64,
}

impl Request for ReadMessageRequest<'_> {
    const CALL_ID: CallId = CallId::ReadMessage;
    type Response = MessageContentResponse;

    fn serialize_args(&self, buf: &mut ByteBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir)?;
        push_username(buf, self.username)?;
        buf.push_u32(self.cpid);
        buf.push_u64(self.message_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::restriction::relop;
    use crate::tags;

    fn frame<R: Request>(request: &R) -> Vec<u8> {
        let mut buf = ByteBuffer::new();
        request.serialize(&mut buf).unwrap();
        buf.as_slice().to_vec()
    }

    fn assert_shape<R: Request>() {
        assert_eq!(
            <R::Response as Response>::SHAPE,
            R::CALL_ID.response_shape(),
            "{} decodes with the wrong shape",
            R::CALL_ID
        );
    }

    #[test]
    fn test_response_types_match_call_table() {
        assert_shape::<ConnectRequest>();
        assert_shape::<PingStoreRequest>();
        assert_shape::<GetStoreAllProptagsRequest>();
        assert_shape::<GetStorePropertiesRequest>();
        assert_shape::<SetStorePropertiesRequest>();
        assert_shape::<RemoveStorePropertiesRequest>();
        assert_shape::<GetFolderByNameRequest>();
        assert_shape::<CreateFolderByPropertiesRequest>();
        assert_shape::<GetFolderPropertiesRequest>();
        assert_shape::<SetFolderPropertiesRequest>();
        assert_shape::<RemoveFolderPropertiesRequest>();
        assert_shape::<DeleteFolderRequest>();
        assert_shape::<EmptyFolderRequest>();
        assert_shape::<LoadHierarchyTableRequest>();
        assert_shape::<LoadContentTableRequest>();
        assert_shape::<LoadPermissionTableRequest>();
        assert_shape::<UnloadTableRequest>();
        assert_shape::<QueryTableRequest>();
        assert_shape::<LoadMessageInstanceRequest>();
        assert_shape::<UnloadInstanceRequest>();
        assert_shape::<GetInstancePropertiesRequest>();
        assert_shape::<SetInstancePropertiesRequest>();
        assert_shape::<GetMessagePropertiesRequest>();
        assert_shape::<SetMessagePropertiesRequest>();
        assert_shape::<AllocateCnRequest>();
        assert_shape::<UpdateFolderPermissionRequest>();
        assert_shape::<ReadMessageRequest>();
    }

    #[test]
    fn test_connect_frame() {
        let bytes = frame(&ConnectRequest {
            prefix: "/exmdb",
            session_id: "abc",
            is_private: false,
        });
        let mut expected = vec![13, 0, 0, 0, 0x00];
        expected.extend_from_slice(b"/exmdb\0abc\0");
        expected.push(0);
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_unload_table_frame() {
        let bytes = frame(&UnloadTableRequest {
            homedir: "/d",
            table_id: 7,
        });
        assert_eq!(bytes, vec![8, 0, 0, 0, 0x2b, b'/', b'd', 0, 7, 0, 0, 0]);
    }

    #[test]
    fn test_load_hierarchy_table_without_restriction() {
        let bytes = frame(&LoadHierarchyTableRequest::new("/d", 42, "", 0));
        assert_eq!(
            &bytes[4..],
            &[0x26, b'/', b'd', 0, 42, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_load_hierarchy_table_with_username_and_restriction() {
        let request = LoadHierarchyTableRequest::new("/d", 1, "user", 3)
            .with_restriction(Restriction::exist(tags::DISPLAYNAME));
        let bytes = frame(&request);
        let args = &bytes[5..];
        assert_eq!(&args[..3], b"/d\0");
        assert_eq!(&args[11..], b"\x01user\0\x03\x01\x08\x1f\x00\x01\x30");
    }

    #[test]
    fn test_query_table_frame() {
        let proptags = [tags::FOLDERID, tags::DISPLAYNAME];
        let bytes = frame(&QueryTableRequest {
            homedir: "/d",
            username: "",
            cpid: 0,
            table_id: 7,
            proptags: &proptags,
            start_pos: 0,
            row_needed: 2,
        });
        let mut expected = vec![0x2d, b'/', b'd', 0, 0];
        expected.extend_from_slice(&0u32.to_le_bytes());
        expected.extend_from_slice(&7u32.to_le_bytes());
        expected.extend_from_slice(&2u16.to_le_bytes());
        expected.extend_from_slice(&tags::FOLDERID.to_le_bytes());
        expected.extend_from_slice(&tags::DISPLAYNAME.to_le_bytes());
        expected.extend_from_slice(&0u32.to_le_bytes());
        expected.extend_from_slice(&2u32.to_le_bytes());
        assert_eq!(&bytes[4..], &expected[..]);
        assert_eq!(bytes.len() - 4, expected.len());
    }

    #[test]
    fn test_content_table_with_sorts() {
        use crate::structures::{table_sort, SortOrder};

        let request = LoadContentTableRequest::new("/d", 0, 9, "", 0)
            .with_restriction(Restriction::property(
                relop::GT,
                0,
                TaggedPropval::u32(tags::CONTENTCOUNT, 0),
            ))
            .with_sorts(SortOrderSet::new(vec![SortOrder::new(
                tags::CREATIONTIME,
                table_sort::ASCEND,
            )]));
        let bytes = frame(&request);
        // ... sort flag, count 1, categories 0, expanded 0, type, id, order
        assert_eq!(
            &bytes[bytes.len() - 12..],
            &[1, 1, 0, 0, 0, 0, 0, 0x40, 0x00, 0x07, 0x30, 0x00]
        );
    }

    #[test]
    fn test_invalid_propval_fails_serialization() {
        let propvals = [TaggedPropval::with_type(
            tags::DISPLAYNAME,
            crate::propval::prop_type::WSTRING,
            crate::propval::PropvalValue::U8(1),
        )];
        let mut buf = ByteBuffer::new();
        let result = SetStorePropertiesRequest {
            homedir: "/d",
            cpid: 0,
            propvals: &propvals,
        }
        .serialize(&mut buf);
        assert!(matches!(result, Err(ProtocolError::ValueTypeMismatch { .. })));
    }

    #[test]
    fn test_zero_byte_in_argument_fails_serialization() {
        let mut buf = ByteBuffer::new();
        let result = UnloadTableRequest {
            homedir: "/d\0c\0\0\0",
            table_id: 7,
        }
        .serialize(&mut buf);
        assert!(matches!(
            result,
            Err(ProtocolError::InteriorNul { position: 2 })
        ));

        let mut buf = ByteBuffer::new();
        let result = LoadHierarchyTableRequest::new("/d", 1, "user\0admin", 0).serialize(&mut buf);
        assert!(matches!(
            result,
            Err(ProtocolError::InteriorNul { position: 4 })
        ));
    }
}
