//! High-level client API.

use crate::connection::{Connection, ConnectionConfig, ConnectionState};
use crate::error::ClientError;
use crate::session::SessionIdGenerator;
use exmdb_protocol::requests::*;
use exmdb_protocol::{
    MessageContent, PermissionData, PropertyProblem, PropvalList, Request, TaggedPropval,
};

/// High-level client for an exmdb server.
///
/// Owns one [`Connection`]; every method is one round trip. Table and
/// instance ids returned by the server must be passed back by the caller.
#[derive(Debug)]
pub struct ExmdbClient {
    conn: Connection,
    session_ids: SessionIdGenerator,
}

impl ExmdbClient {
    /// Creates a new client with the given configuration.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            conn: Connection::new(config),
            session_ids: SessionIdGenerator::new(),
        }
    }

    /// Replaces the session id source.
    pub fn with_session_ids(mut self, session_ids: SessionIdGenerator) -> Self {
        self.session_ids = session_ids;
        self
    }

    /// Connects to the server and performs the handshake.
    pub fn connect(&mut self, prefix: &str, is_private: bool) -> Result<(), ClientError> {
        self.conn.connect()?;
        self.perform_handshake(prefix, is_private)
    }

    /// Sends the CONNECT call with a fresh session id. Any failure closes
    /// the connection.
    pub fn perform_handshake(&mut self, prefix: &str, is_private: bool) -> Result<(), ClientError> {
        let session_id = self.session_ids.generate();
        let request = ConnectRequest {
            prefix,
            session_id: &session_id,
            is_private,
        };
        match self.conn.send(&request) {
            Ok(_) => {
                tracing::info!(
                    "Handshake complete (prefix={}, private={})",
                    prefix,
                    is_private
                );
                Ok(())
            }
            Err(e) => {
                tracing::debug!("Handshake failed: {}", e);
                self.conn.close();
                Err(e)
            }
        }
    }

    /// Returns whether the client is connected.
    pub fn is_connected(&self) -> bool {
        self.conn.is_connected()
    }

    pub fn state(&self) -> ConnectionState {
        self.conn.state()
    }

    /// Closes the connection.
    pub fn close(&mut self) {
        self.conn.close();
    }

    /// Returns the underlying connection.
    pub fn connection(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Sends any call from the call table.
    pub fn send<R: Request>(&mut self, request: &R) -> Result<R::Response, ClientError> {
        self.conn.send(request)
    }

    // =========================================================================
    // Store operations
    // =========================================================================

    pub fn ping_store(&mut self, homedir: &str) -> Result<(), ClientError> {
        self.send(&PingStoreRequest { homedir })?;
        Ok(())
    }

    /// Lists every tag set on the store object.
    pub fn get_store_all_proptags(&mut self, homedir: &str) -> Result<Vec<u32>, ClientError> {
        Ok(self.send(&GetStoreAllProptagsRequest { homedir })?.proptags)
    }

    pub fn get_store_properties(
        &mut self,
        homedir: &str,
        cpid: u32,
        proptags: &[u32],
    ) -> Result<PropvalList, ClientError> {
        let request = GetStorePropertiesRequest {
            homedir,
            cpid,
            proptags,
        };
        Ok(self.send(&request)?.propvals)
    }

    pub fn set_store_properties(
        &mut self,
        homedir: &str,
        cpid: u32,
        propvals: &[TaggedPropval<'_>],
    ) -> Result<Vec<PropertyProblem>, ClientError> {
        let request = SetStorePropertiesRequest {
            homedir,
            cpid,
            propvals,
        };
        Ok(self.send(&request)?.problems)
    }

    pub fn remove_store_properties(
        &mut self,
        homedir: &str,
        proptags: &[u32],
    ) -> Result<(), ClientError> {
        self.send(&RemoveStorePropertiesRequest { homedir, proptags })?;
        Ok(())
    }

    /// Reserves a change number in the store.
    pub fn allocate_cn(&mut self, homedir: &str) -> Result<u64, ClientError> {
        Ok(self.send(&AllocateCnRequest { homedir })?.change_num)
    }

    // =========================================================================
    // Folder operations
    // =========================================================================

    /// Looks up a child folder by display name. Returns 0 if not found.
    pub fn get_folder_by_name(
        &mut self,
        homedir: &str,
        parent_id: u64,
        name: &str,
    ) -> Result<u64, ClientError> {
        let request = GetFolderByNameRequest {
            homedir,
            parent_id,
            name,
        };
        Ok(self.send(&request)?.folder_id)
    }

    pub fn create_folder_by_properties(
        &mut self,
        homedir: &str,
        cpid: u32,
        propvals: &[TaggedPropval<'_>],
    ) -> Result<u64, ClientError> {
        let request = CreateFolderByPropertiesRequest {
            homedir,
            cpid,
            propvals,
        };
        Ok(self.send(&request)?.folder_id)
    }

    pub fn get_folder_properties(
        &mut self,
        homedir: &str,
        cpid: u32,
        folder_id: u64,
        proptags: &[u32],
    ) -> Result<PropvalList, ClientError> {
        let request = GetFolderPropertiesRequest {
            homedir,
            cpid,
            folder_id,
            proptags,
        };
        Ok(self.send(&request)?.propvals)
    }

    pub fn set_folder_properties(
        &mut self,
        homedir: &str,
        cpid: u32,
        folder_id: u64,
        propvals: &[TaggedPropval<'_>],
    ) -> Result<Vec<PropertyProblem>, ClientError> {
        let request = SetFolderPropertiesRequest {
            homedir,
            cpid,
            folder_id,
            propvals,
        };
        Ok(self.send(&request)?.problems)
    }

    pub fn remove_folder_properties(
        &mut self,
        homedir: &str,
        folder_id: u64,
        proptags: &[u32],
    ) -> Result<(), ClientError> {
        let request = RemoveFolderPropertiesRequest {
            homedir,
            folder_id,
            proptags,
        };
        self.send(&request)?;
        Ok(())
    }

    /// Deletes a folder. Returns the server's success flag.
    pub fn delete_folder(
        &mut self,
        homedir: &str,
        cpid: u32,
        folder_id: u64,
        hard: bool,
    ) -> Result<bool, ClientError> {
        let request = DeleteFolderRequest {
            homedir,
            cpid,
            folder_id,
            hard,
        };
        Ok(self.send(&request)?.success)
    }

    /// Empties a folder; the request selects which contents go.
    pub fn empty_folder(&mut self, request: &EmptyFolderRequest<'_>) -> Result<bool, ClientError> {
        Ok(self.send(request)?.success)
    }

    pub fn update_folder_permission(
        &mut self,
        homedir: &str,
        folder_id: u64,
        freebusy: bool,
        rows: &[PermissionData<'_>],
    ) -> Result<(), ClientError> {
        let request = UpdateFolderPermissionRequest {
            homedir,
            folder_id,
            freebusy,
            rows,
        };
        self.send(&request)?;
        Ok(())
    }

    // =========================================================================
    // Table operations
    // =========================================================================

    /// Loads a hierarchy table. Returns `(table_id, row_count)`.
    pub fn load_hierarchy_table(
        &mut self,
        request: &LoadHierarchyTableRequest<'_>,
    ) -> Result<(u32, u32), ClientError> {
        let response = self.send(request)?;
        Ok((response.table_id, response.row_count))
    }

    /// Loads a content table. Returns `(table_id, row_count)`.
    pub fn load_content_table(
        &mut self,
        request: &LoadContentTableRequest<'_>,
    ) -> Result<(u32, u32), ClientError> {
        let response = self.send(request)?;
        Ok((response.table_id, response.row_count))
    }

    /// Loads a folder's permission table. Returns `(table_id, row_count)`.
    pub fn load_permission_table(
        &mut self,
        homedir: &str,
        folder_id: u64,
        table_flags: u8,
    ) -> Result<(u32, u32), ClientError> {
        let request = LoadPermissionTableRequest {
            homedir,
            folder_id,
            table_flags,
        };
        let response = self.send(&request)?;
        Ok((response.table_id, response.row_count))
    }

    pub fn query_table(
        &mut self,
        request: &QueryTableRequest<'_>,
    ) -> Result<Vec<PropvalList>, ClientError> {
        Ok(self.send(request)?.rows)
    }

    pub fn unload_table(&mut self, homedir: &str, table_id: u32) -> Result<(), ClientError> {
        self.send(&UnloadTableRequest { homedir, table_id })?;
        Ok(())
    }

    // =========================================================================
    // Message operations
    // =========================================================================

    pub fn load_message_instance(
        &mut self,
        request: &LoadMessageInstanceRequest<'_>,
    ) -> Result<u32, ClientError> {
        Ok(self.send(request)?.instance_id)
    }

    pub fn unload_instance(&mut self, homedir: &str, instance_id: u32) -> Result<(), ClientError> {
        self.send(&UnloadInstanceRequest {
            homedir,
            instance_id,
        })?;
        Ok(())
    }

    pub fn get_instance_properties(
        &mut self,
        homedir: &str,
        size_limit: u32,
        instance_id: u32,
        proptags: &[u32],
    ) -> Result<PropvalList, ClientError> {
        let request = GetInstancePropertiesRequest {
            homedir,
            size_limit,
            instance_id,
            proptags,
        };
        Ok(self.send(&request)?.propvals)
    }

    pub fn set_instance_properties(
        &mut self,
        homedir: &str,
        instance_id: u32,
        propvals: &[TaggedPropval<'_>],
    ) -> Result<Vec<PropertyProblem>, ClientError> {
        let request = SetInstancePropertiesRequest {
            homedir,
            instance_id,
            propvals,
        };
        Ok(self.send(&request)?.problems)
    }

    pub fn get_message_properties(
        &mut self,
        request: &GetMessagePropertiesRequest<'_>,
    ) -> Result<PropvalList, ClientError> {
        Ok(self.send(request)?.propvals)
    }

    pub fn set_message_properties(
        &mut self,
        request: &SetMessagePropertiesRequest<'_>,
    ) -> Result<Vec<PropertyProblem>, ClientError> {
        Ok(self.send(request)?.problems)
    }

    /// Reads a complete message. `None` if the message does not exist.
    pub fn read_message(
        &mut self,
        homedir: &str,
        username: &str,
        cpid: u32,
        message_id: u64,
    ) -> Result<Option<MessageContent>, ClientError> {
        let request = ReadMessageRequest {
            homedir,
            username,
            cpid,
            message_id,
        };
        Ok(self.send(&request)?.content)
    }
}
