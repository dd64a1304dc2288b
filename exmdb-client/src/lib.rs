//! # exmdb-client
//!
//! Client library for exmdb.
//!
//! This crate provides:
//! - Blocking TCP connection with request/response framing
//! - The CONNECT handshake with per-client session ids
//! - Typed methods for every call in the call table

pub mod client;
pub mod connection;
pub mod error;
pub mod session;

pub use client::ExmdbClient;
pub use connection::{Connection, ConnectionConfig, ConnectionState};
pub use error::ClientError;
pub use session::SessionIdGenerator;
