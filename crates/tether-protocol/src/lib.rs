//! Tether Protocol - the contract between a host and its components.
//!
//! A component subprocess dials back to the host over a loopback-only
//! JSON-RPC `WebSocket`. This crate owns everything both sides must agree
//! on:
//!
//! - [`rpc`]: wire types and the [`CoreRpc`](rpc::CoreRpcServer) interface
//!   (`ping`, `readCache`, `writeCache`, `emit`)
//! - [`target`]: parsing and loopback validation of the host address
//!
//! The endpoint is unauthenticated and unencrypted. Both peers run on the
//! same machine under the same user, and [`HostTarget`] refuses anything
//! that is not a loopback address.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod rpc;
pub mod target;

pub use error::{ProtocolError, ProtocolResult};
pub use rpc::{
    CoreRpcClient, CoreRpcServer, EmitAck, EmitRequest, PingResponse, ReadCacheResponse,
    WriteCacheResponse, decode_payload, encode_payload, error_codes,
};
pub use target::HostTarget;
