//! Tether Storage - persistence for the host cache service.
//!
//! Two layers:
//!
//! - [`KvStore`]: namespaced byte-level `get`/`set`/`delete`. Backed by an
//!   in-memory map (always available) or by **`SurrealKV`** (behind the
//!   **`kv`** feature), an embedded ACID LSM-tree store.
//! - [`ExpiringCache`]: a namespace-scoped view that wraps every value in a
//!   small envelope carrying its absolute expiry, and treats expired or
//!   unreadable entries as absent.
//!
//! # Feature Flags
//!
//! - **`kv`** - `SurrealKV` persistent store

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod cache;
pub mod error;
pub mod kv;

pub use cache::{CacheEnvelope, CacheLookup, ExpiringCache, MissReason, PutOutcome};
pub use error::{StorageError, StorageResult};
pub use kv::{KvStore, MemoryKvStore, ScopedKvStore};

#[cfg(feature = "kv")]
pub use kv::SurrealKvStore;
