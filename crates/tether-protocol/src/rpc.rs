//! JSON-RPC API definition for host ↔ component communication.
//!
//! Uses jsonrpsee proc macros to define the RPC interface.
//! The host implements the server side; components use the generated client.

use std::collections::BTreeMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::types::ErrorObjectOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, ProtocolResult};

// ---------- Wire types ----------

/// Reply to the connection handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingResponse {
    /// `"Pong {component}"`.
    pub message: String,
    /// Version of the host that answered.
    pub host_version: String,
}

/// Result of a cache read.
///
/// A miss carries no payload. Absent and expired keys both produce a miss.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadCacheResponse {
    /// Whether a live entry was found.
    pub hit: bool,
    /// Base64-encoded payload, present only on a hit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl ReadCacheResponse {
    /// A miss.
    #[must_use]
    pub fn miss() -> Self {
        Self {
            hit: false,
            data: None,
        }
    }

    /// A hit carrying `payload`.
    #[must_use]
    pub fn hit(payload: &[u8]) -> Self {
        Self {
            hit: true,
            data: Some(encode_payload(payload)),
        }
    }

    /// Decode the payload of a hit.
    ///
    /// Returns `Ok(None)` for a miss.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Payload`] if the payload is not valid base64.
    pub fn into_payload(self) -> ProtocolResult<Option<Vec<u8>>> {
        match (self.hit, self.data) {
            (true, Some(data)) => decode_payload(&data).map(Some),
            (true, None) => Ok(Some(Vec::new())),
            (false, _) => Ok(None),
        }
    }
}

/// Result of a cache write.
///
/// `ok = false` means the host could not persist the entry. Components
/// treat this as advisory; a cache write never fails the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteCacheResponse {
    /// Whether the entry was persisted (or deliberately skipped).
    pub ok: bool,
    /// Human-readable detail, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl WriteCacheResponse {
    /// A successful write.
    #[must_use]
    pub fn stored() -> Self {
        Self {
            ok: true,
            message: None,
        }
    }

    /// A write that was accepted but intentionally not stored.
    #[must_use]
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: Some(reason.into()),
        }
    }

    /// A write the host failed to persist.
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: Some(reason.into()),
        }
    }
}

/// A telemetry event sent by a component.
///
/// Either `feature` or `error` should be set. The host acknowledges an
/// empty request without recording it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmitRequest {
    /// Name of the emitting component.
    pub component: String,
    /// Declared version of the emitting component.
    pub version: String,
    /// Feature being reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature: Option<String>,
    /// Free-form attributes for the feature.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    /// Duration of the reported operation in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Error message, for error events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Acknowledgement of a telemetry event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmitAck {
    /// Whether the event was handed to a sink.
    pub accepted: bool,
}

/// Encode a cache payload for the wire.
#[must_use]
pub fn encode_payload(payload: &[u8]) -> String {
    STANDARD.encode(payload)
}

/// Decode a cache payload from the wire.
///
/// # Errors
///
/// Returns [`ProtocolError::Payload`] if `data` is not valid base64.
pub fn decode_payload(data: &str) -> ProtocolResult<Vec<u8>> {
    STANDARD
        .decode(data)
        .map_err(|e| ProtocolError::Payload(e.to_string()))
}

// ---------- RPC trait ----------

/// The Tether core RPC interface.
///
/// Every component invocation talks to exactly one host endpoint through
/// these four methods.
#[rpc(server, client, namespace = "tether")]
pub trait CoreRpc {
    /// Liveness and identity check, sent once right after connecting.
    #[method(name = "ping")]
    async fn ping(&self, component: String, version: String)
    -> Result<PingResponse, ErrorObjectOwned>;

    /// Read a cache entry.
    #[method(name = "readCache")]
    async fn read_cache(&self, key: String) -> Result<ReadCacheResponse, ErrorObjectOwned>;

    /// Write a cache entry that expires at `expires_at`.
    #[method(name = "writeCache")]
    async fn write_cache(
        &self,
        key: String,
        expires_at: DateTime<Utc>,
        data: String,
    ) -> Result<WriteCacheResponse, ErrorObjectOwned>;

    /// Record a telemetry event.
    #[method(name = "emit")]
    async fn emit(&self, event: EmitRequest) -> Result<EmitAck, ErrorObjectOwned>;
}

/// Error codes for the RPC API.
pub mod error_codes {
    /// Invalid request (bad parameters, etc.).
    pub const INVALID_REQUEST: i32 = -32001;
    /// The cache store could not be reached.
    pub const CACHE_UNAVAILABLE: i32 = -32002;
    /// Internal host error.
    pub const INTERNAL_ERROR: i32 = -32003;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_cache_miss_omits_data() {
        let json = serde_json::to_string(&ReadCacheResponse::miss()).unwrap();
        assert_eq!(json, r#"{"hit":false}"#);
    }

    #[test]
    fn read_cache_hit_payload_roundtrip() {
        let payload = br#"["a","b"]"#;
        let resp = ReadCacheResponse::hit(payload);
        let json = serde_json::to_string(&resp).unwrap();
        let decoded: ReadCacheResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.into_payload().unwrap(), Some(payload.to_vec()));
    }

    #[test]
    fn read_cache_miss_has_no_payload() {
        let resp = ReadCacheResponse {
            hit: false,
            data: Some(encode_payload(b"stale")),
        };
        assert_eq!(resp.into_payload().unwrap(), None);
    }

    #[test]
    fn read_cache_rejects_bad_base64() {
        let resp = ReadCacheResponse {
            hit: true,
            data: Some("not base64!!".into()),
        };
        assert!(matches!(
            resp.into_payload(),
            Err(ProtocolError::Payload(_))
        ));
    }

    #[test]
    fn emit_request_minimal_json() {
        let json = r#"{"component":"iac","version":"1.2.0","feature":"scan"}"#;
        let req: EmitRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.feature.as_deref(), Some("scan"));
        assert!(req.attributes.is_empty());
        assert!(req.duration_ms.is_none());
        assert!(req.error.is_none());
    }

    #[test]
    fn write_cache_response_constructors() {
        assert!(WriteCacheResponse::stored().ok);
        assert!(WriteCacheResponse::skipped("expired").ok);
        let failed = WriteCacheResponse::failed("disk full");
        assert!(!failed.ok);
        assert_eq!(failed.message.as_deref(), Some("disk full"));
    }
}
