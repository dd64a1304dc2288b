//! Call identifiers and their response shapes.

use serde::Serialize;
use std::fmt;

/// Single-byte selector at the start of every request frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum CallId {
    // Session
    Connect = 0x00,
    PingStore = 0x02,

    // Store properties
    GetStoreAllProptags = 0x08,
    GetStoreProperties = 0x09,
    SetStoreProperties = 0x0a,
    RemoveStoreProperties = 0x0b,

    // Folders
    GetFolderByName = 0x13,
    CreateFolderByProperties = 0x15,
    GetFolderProperties = 0x17,
    SetFolderProperties = 0x18,
    RemoveFolderProperties = 0x19,
    DeleteFolder = 0x1a,
    EmptyFolder = 0x1b,

    // Tables
    LoadHierarchyTable = 0x26,
    LoadContentTable = 0x28,
    LoadPermissionTable = 0x29,
    UnloadTable = 0x2b,
    QueryTable = 0x2d,

    // Instances
    LoadMessageInstance = 0x39,
    UnloadInstance = 0x46,
    GetInstanceProperties = 0x48,
    SetInstanceProperties = 0x49,

    // Messages
    GetMessageProperties = 0x57,
    SetMessageProperties = 0x58,
    AllocateCn = 0x5c,
    UpdateFolderPermission = 0x6a,
    ReadMessage = 0x6f,
}

/// Layout of a successful response payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseShape {
    /// No payload.
    Empty,
    /// One boolean byte.
    Success,
    /// u16-counted list of property problems.
    Problems,
    /// u16-counted list of property tags.
    Tags,
    /// u16-counted list of tagged values.
    Propvals,
    /// u32-counted list of u16-counted rows.
    Table,
    FolderId,
    /// Table id and row count.
    TableInfo,
    InstanceId,
    ChangeNumber,
    /// Presence byte and optional message content.
    MessageContent,
}

impl CallId {
    pub const ALL: [CallId; 27] = [
        CallId::Connect,
        CallId::PingStore,
        CallId::GetStoreAllProptags,
        CallId::GetStoreProperties,
        CallId::SetStoreProperties,
        CallId::RemoveStoreProperties,
        CallId::GetFolderByName,
        CallId::CreateFolderByProperties,
        CallId::GetFolderProperties,
        CallId::SetFolderProperties,
        CallId::RemoveFolderProperties,
        CallId::DeleteFolder,
        CallId::EmptyFolder,
        CallId::LoadHierarchyTable,
        CallId::LoadContentTable,
        CallId::LoadPermissionTable,
        CallId::UnloadTable,
        CallId::QueryTable,
        CallId::LoadMessageInstance,
        CallId::UnloadInstance,
        CallId::GetInstanceProperties,
        CallId::SetInstanceProperties,
        CallId::GetMessageProperties,
        CallId::SetMessageProperties,
        CallId::AllocateCn,
        CallId::UpdateFolderPermission,
        CallId::ReadMessage,
    ];

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(id: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|call| call.as_u8() == id)
    }

    /// Response layout of this call. Every call is listed; calls that share
    /// a layout are grouped explicitly.
    pub const fn response_shape(self) -> ResponseShape {
        match self {
            CallId::Connect
            | CallId::PingStore
            | CallId::RemoveStoreProperties
            | CallId::RemoveFolderProperties
            | CallId::UnloadTable
            | CallId::UnloadInstance
            | CallId::UpdateFolderPermission => ResponseShape::Empty,

            CallId::DeleteFolder | CallId::EmptyFolder => ResponseShape::Success,

            CallId::SetStoreProperties
            | CallId::SetFolderProperties
            | CallId::SetInstanceProperties
            | CallId::SetMessageProperties => ResponseShape::Problems,

            CallId::GetStoreAllProptags => ResponseShape::Tags,

            CallId::GetStoreProperties
            | CallId::GetFolderProperties
            | CallId::GetInstanceProperties
            | CallId::GetMessageProperties => ResponseShape::Propvals,

            CallId::QueryTable => ResponseShape::Table,

            CallId::GetFolderByName | CallId::CreateFolderByProperties => ResponseShape::FolderId,

            CallId::LoadHierarchyTable | CallId::LoadContentTable | CallId::LoadPermissionTable => {
                ResponseShape::TableInfo
            }

            CallId::LoadMessageInstance => ResponseShape::InstanceId,
            CallId::AllocateCn => ResponseShape::ChangeNumber,
            CallId::ReadMessage => ResponseShape::MessageContent,
        }
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallId::Connect => "CONNECT",
            CallId::PingStore => "PING_STORE",
            CallId::GetStoreAllProptags => "GET_STORE_ALL_PROPTAGS",
            CallId::GetStoreProperties => "GET_STORE_PROPERTIES",
            CallId::SetStoreProperties => "SET_STORE_PROPERTIES",
            CallId::RemoveStoreProperties => "REMOVE_STORE_PROPERTIES",
            CallId::GetFolderByName => "GET_FOLDER_BY_NAME",
            CallId::CreateFolderByProperties => "CREATE_FOLDER_BY_PROPERTIES",
            CallId::GetFolderProperties => "GET_FOLDER_PROPERTIES",
            CallId::SetFolderProperties => "SET_FOLDER_PROPERTIES",
            CallId::RemoveFolderProperties => "REMOVE_FOLDER_PROPERTIES",
            CallId::DeleteFolder => "DELETE_FOLDER",
            CallId::EmptyFolder => "EMPTY_FOLDER",
            CallId::LoadHierarchyTable => "LOAD_HIERARCHY_TABLE",
            CallId::LoadContentTable => "LOAD_CONTENT_TABLE",
            CallId::LoadPermissionTable => "LOAD_PERMISSION_TABLE",
            CallId::UnloadTable => "UNLOAD_TABLE",
            CallId::QueryTable => "QUERY_TABLE",
            CallId::LoadMessageInstance => "LOAD_MESSAGE_INSTANCE",
            CallId::UnloadInstance => "UNLOAD_INSTANCE",
            CallId::GetInstanceProperties => "GET_INSTANCE_PROPERTIES",
            CallId::SetInstanceProperties => "SET_INSTANCE_PROPERTIES",
            CallId::GetMessageProperties => "GET_MESSAGE_PROPERTIES",
            CallId::SetMessageProperties => "SET_MESSAGE_PROPERTIES",
            CallId::AllocateCn => "ALLOCATE_CN",
            CallId::UpdateFolderPermission => "UPDATE_FOLDER_PERMISSION",
            CallId::ReadMessage => "READ_MESSAGE",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_id_roundtrip() {
        for call in CallId::ALL {
            assert_eq!(CallId::from_u8(call.as_u8()), Some(call));
        }
        assert_eq!(CallId::from_u8(0x01), None);
        assert_eq!(CallId::from_u8(0xff), None);
    }

    #[test]
    fn test_call_ids_unique() {
        let mut ids: Vec<u8> = CallId::ALL.iter().map(|c| c.as_u8()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), CallId::ALL.len());
    }

    #[test]
    fn test_known_values() {
        assert_eq!(CallId::Connect.as_u8(), 0x00);
        assert_eq!(CallId::LoadHierarchyTable.as_u8(), 0x26);
        assert_eq!(CallId::QueryTable.as_u8(), 0x2d);
        assert_eq!(CallId::UnloadTable.as_u8(), 0x2b);
        assert_eq!(CallId::AllocateCn.as_u8(), 0x5c);
    }

    #[test]
    fn test_shared_shapes() {
        assert_eq!(CallId::SetStoreProperties.response_shape(), ResponseShape::Problems);
        assert_eq!(CallId::SetMessageProperties.response_shape(), ResponseShape::Problems);
        assert_eq!(CallId::LoadContentTable.response_shape(), ResponseShape::TableInfo);
        assert_eq!(CallId::UnloadTable.response_shape(), ResponseShape::Empty);
    }

    #[test]
    fn test_display_and_serialize() {
        assert_eq!(CallId::LoadHierarchyTable.to_string(), "LOAD_HIERARCHY_TABLE");
        for call in CallId::ALL {
            let json = serde_json::to_string(&call).unwrap();
            assert_eq!(json, format!("\"{}\"", call));
        }
    }
}
