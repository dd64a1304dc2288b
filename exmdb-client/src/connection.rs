//! Connection management.
//!
//! A [`Connection`] owns one blocking TCP stream and carries exactly one call
//! at a time. The scratch buffer is reused for every request and response.

use crate::error::ClientError;
use exmdb_protocol::{
    payload_length, ByteBuffer, ProtocolError, Request, Response, ResponseCode, DEFAULT_PORT,
    LENGTH_PREFIX_SIZE, MAX_PAYLOAD_SIZE, STATUS_SIZE,
};
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Default capacity of the scratch buffer (8 KiB).
pub const DEFAULT_BUFFER_CAPACITY: usize = 8 * 1024;

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Host name or address literal.
    pub host: String,
    pub port: u16,
    /// Per-candidate connect timeout. `None` blocks until the OS gives up.
    pub connect_timeout: Option<Duration>,
    /// Socket read deadline.
    pub read_timeout: Option<Duration>,
    /// Socket write deadline.
    pub write_timeout: Option<Duration>,
    /// Largest accepted response payload.
    pub max_response_size: u32,
    /// Initial capacity of the scratch buffer.
    pub buffer_capacity: usize,
}

impl ConnectionConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout: None,
            read_timeout: None,
            write_timeout: None,
            max_response_size: MAX_PAYLOAD_SIZE,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = Some(timeout);
        self
    }

    pub fn with_max_response_size(mut self, size: u32) -> Self {
        self.max_response_size = size;
        self
    }

    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// `host:port`, with IPv6 literals bracketed.
    pub fn address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::new("::1", DEFAULT_PORT)
    }
}

/// Lifecycle of a [`Connection`]. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unconnected,
    Connected,
    Closed,
}

/// A connection to an exmdb server.
#[derive(Debug)]
pub struct Connection {
    config: ConnectionConfig,
    stream: Option<TcpStream>,
    state: ConnectionState,
    buffer: ByteBuffer,
}

impl Connection {
    /// Creates a new connection (not yet connected).
    pub fn new(config: ConnectionConfig) -> Self {
        let buffer = ByteBuffer::with_capacity(config.buffer_capacity);
        Self {
            config,
            stream: None,
            state: ConnectionState::Unconnected,
            buffer,
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Returns whether the connection is established.
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Resolves the configured address and connects to the first candidate
    /// that accepts. On failure the connection stays unconnected.
    pub fn connect(&mut self) -> Result<(), ClientError> {
        match self.state {
            ConnectionState::Connected => return Ok(()),
            ConnectionState::Closed => return Err(ClientError::NotConnected),
            ConnectionState::Unconnected => {}
        }

        let addr = self.config.address();
        tracing::debug!("Resolving {}...", addr);
        let candidates: Vec<_> = (self.config.host.as_str(), self.config.port)
            .to_socket_addrs()
            .map_err(|e| {
                tracing::debug!("Resolution failed: {}", e);
                ClientError::Resolve { addr: addr.clone() }
            })?
            .collect();
        if candidates.is_empty() {
            return Err(ClientError::Resolve { addr });
        }

        let mut last_error = None;
        for candidate in candidates {
            tracing::debug!("Connecting to {}...", candidate);
            let result = match self.config.connect_timeout {
                Some(timeout) => TcpStream::connect_timeout(&candidate, timeout),
                None => TcpStream::connect(candidate),
            };
            match result {
                Ok(stream) => {
                    self.configure(&stream)?;
                    tracing::info!("Connected to {}", candidate);
                    self.stream = Some(stream);
                    self.state = ConnectionState::Connected;
                    return Ok(());
                }
                Err(e) => {
                    tracing::debug!("Connection to {} failed: {}", candidate, e);
                    last_error = Some(e);
                }
            }
        }

        Err(ClientError::Connect {
            addr,
            source: last_error
                .unwrap_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no candidates")),
        })
    }

    fn configure(&self, stream: &TcpStream) -> Result<(), ClientError> {
        stream.set_nodelay(true).ok();
        stream.set_read_timeout(self.config.read_timeout)?;
        stream.set_write_timeout(self.config.write_timeout)?;
        Ok(())
    }

    /// Sends one call and decodes its response.
    ///
    /// A nonzero status yields [`ClientError::Server`] and leaves the
    /// connection usable. Failures for which [`ClientError::is_transport`]
    /// holds close the connection. Encode and decode failures affect only
    /// this call.
    pub fn send<R: Request>(&mut self, request: &R) -> Result<R::Response, ClientError> {
        if self.state != ConnectionState::Connected {
            tracing::debug!("send() called but not connected");
            return Err(ClientError::NotConnected);
        }
        let stream = self.stream.as_mut().ok_or(ClientError::NotConnected)?;

        self.buffer.clear();
        request.serialize(&mut self.buffer)?;
        tracing::debug!(
            "Sending {} ({} bytes)",
            R::CALL_ID,
            self.buffer.len()
        );

        if let Err(err) = exchange(stream, &mut self.buffer, self.config.max_response_size) {
            match &err {
                ClientError::Server { status } => {
                    tracing::debug!("{} failed with status {}", R::CALL_ID, status);
                }
                _ => {
                    tracing::debug!("{} failed: {}, closing connection", R::CALL_ID, err);
                    self.close();
                }
            }
            return Err(err);
        }
        tracing::debug!(
            "{} response received ({} bytes)",
            R::CALL_ID,
            self.buffer.len()
        );

        let response = R::Response::decode(&mut self.buffer)?;
        if self.buffer.remaining() > 0 {
            tracing::warn!(
                "{} response has {} trailing bytes",
                R::CALL_ID,
                self.buffer.remaining()
            );
        }
        Ok(response)
    }

    /// Closes the connection. Safe to call more than once.
    pub fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            tracing::debug!("Closing connection...");
            let _ = stream.shutdown(Shutdown::Both);
        }
        self.state = ConnectionState::Closed;
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

/// Writes the request held in `buf` and reads the response payload back
/// into it.
fn exchange<S: Read + Write>(
    stream: &mut S,
    buf: &mut ByteBuffer,
    max_response_size: u32,
) -> Result<(), ClientError> {
    stream.write_all(buf.as_slice())?;

    let mut status = [0u8; STATUS_SIZE];
    read_full(stream, &mut status)?;
    if status[0] != ResponseCode::Success.as_u8() {
        return Err(ClientError::Server { status: status[0] });
    }

    let mut header = [0u8; LENGTH_PREFIX_SIZE];
    read_full(stream, &mut header)?;
    // Past this point the stream cannot be resynchronised, so an oversized
    // length is a transport failure rather than a decode failure.
    let length = payload_length(header, max_response_size).map_err(|err| match err {
        ProtocolError::FrameTooLarge { size, max } => ClientError::ResponseTooLarge { size, max },
        other => ClientError::Protocol(other),
    })?;
    read_full(stream, buf.receive_window(length))
}

/// Fills `out` completely; a zero-byte read first means the peer closed.
fn read_full<S: Read>(stream: &mut S, out: &mut [u8]) -> Result<(), ClientError> {
    let mut offset = 0;
    while offset < out.len() {
        match stream.read(&mut out[offset..]) {
            Ok(0) => return Err(ClientError::ConnectionClosed),
            Ok(n) => offset += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ClientError::Io(e)),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use exmdb_protocol::requests::{AllocateCnRequest, Request as _};
    use std::io::Cursor;

    /// In-memory stream: reads come from a script, writes are recorded.
    struct ScriptedStream {
        input: Cursor<Vec<u8>>,
        chunk: usize,
        written: Vec<u8>,
    }

    impl ScriptedStream {
        fn new(input: Vec<u8>, chunk: usize) -> Self {
            Self {
                input: Cursor::new(input),
                chunk,
                written: Vec::new(),
            }
        }
    }

    impl Read for ScriptedStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let limit = buf.len().min(self.chunk);
            self.input.read(&mut buf[..limit])
        }
    }

    impl Write for ScriptedStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn request_buffer() -> ByteBuffer {
        let mut buf = ByteBuffer::new();
        AllocateCnRequest { homedir: "/d" }
            .serialize(&mut buf)
            .unwrap();
        buf
    }

    #[test]
    fn test_config_defaults() {
        let config = ConnectionConfig::default();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.max_response_size, MAX_PAYLOAD_SIZE);
        assert_eq!(config.buffer_capacity, DEFAULT_BUFFER_CAPACITY);
        assert!(config.connect_timeout.is_none());
        assert_eq!(config.address(), "[::1]:5000");
    }

    #[test]
    fn test_config_builder() {
        let config = ConnectionConfig::new("localhost", 5001)
            .with_connect_timeout(Duration::from_secs(3))
            .with_read_timeout(Duration::from_secs(10))
            .with_max_response_size(1024);
        assert_eq!(config.address(), "localhost:5001");
        assert_eq!(config.connect_timeout, Some(Duration::from_secs(3)));
        assert_eq!(config.read_timeout, Some(Duration::from_secs(10)));
        assert_eq!(config.max_response_size, 1024);
    }

    #[test]
    fn test_exchange_partial_reads() {
        let mut script = vec![0u8, 8, 0, 0, 0];
        script.extend_from_slice(&0x1122_3344_5566_7788u64.to_le_bytes());
        let mut stream = ScriptedStream::new(script, 3);
        let mut buf = request_buffer();
        let sent = buf.as_slice().to_vec();

        exchange(&mut stream, &mut buf, MAX_PAYLOAD_SIZE).unwrap();
        assert_eq!(stream.written, sent);
        assert_eq!(buf.pop_u64().unwrap(), 0x1122_3344_5566_7788);
    }

    #[test]
    fn test_exchange_error_status_reads_one_byte() {
        let mut stream = ScriptedStream::new(vec![5, 0xaa, 0xbb], 16);
        let mut buf = request_buffer();
        let err = exchange(&mut stream, &mut buf, MAX_PAYLOAD_SIZE).unwrap_err();
        assert!(matches!(err, ClientError::Server { status: 5 }));
        assert_eq!(stream.input.position(), 1);
    }

    #[test]
    fn test_exchange_truncated_payload() {
        let mut stream = ScriptedStream::new(vec![0, 8, 0, 0, 0, 1, 2], 16);
        let mut buf = request_buffer();
        let err = exchange(&mut stream, &mut buf, MAX_PAYLOAD_SIZE).unwrap_err();
        assert!(matches!(err, ClientError::ConnectionClosed));
    }

    #[test]
    fn test_exchange_oversized_payload() {
        let mut stream = ScriptedStream::new(vec![0, 0, 0, 1, 0], 16);
        let mut buf = request_buffer();
        let err = exchange(&mut stream, &mut buf, 1024).unwrap_err();
        assert!(matches!(
            err,
            ClientError::ResponseTooLarge {
                size: 0x0100_0000,
                max: 1024
            }
        ));
        assert!(err.is_transport());
    }

    #[test]
    fn test_send_requires_connection() {
        let mut conn = Connection::new(ConnectionConfig::default());
        assert_eq!(conn.state(), ConnectionState::Unconnected);
        let result = conn.send(&AllocateCnRequest { homedir: "/d" });
        assert!(matches!(result, Err(ClientError::NotConnected)));
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut conn = Connection::new(ConnectionConfig::default());
        conn.close();
        conn.close();
        assert_eq!(conn.state(), ConnectionState::Closed);
        assert!(matches!(conn.connect(), Err(ClientError::NotConnected)));
    }
}
