//! Cache RPC method implementations.

use chrono::{DateTime, Utc};
use jsonrpsee::types::ErrorObjectOwned;
use tether_protocol::{ReadCacheResponse, WriteCacheResponse, decode_payload, error_codes};
use tether_storage::StorageError;
use tracing::warn;

use super::RpcImpl;

impl RpcImpl {
    pub(super) async fn read_cache_impl(
        &self,
        key: &str,
    ) -> Result<ReadCacheResponse, ErrorObjectOwned> {
        match self.services.cache.read(key).await {
            Ok(Some(data)) => Ok(ReadCacheResponse::hit(&data)),
            Ok(None) => Ok(ReadCacheResponse::miss()),
            Err(StorageError::InvalidKey(msg)) => Err(ErrorObjectOwned::owned(
                error_codes::INVALID_REQUEST,
                msg,
                None::<()>,
            )),
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed");
                Err(ErrorObjectOwned::owned(
                    error_codes::CACHE_UNAVAILABLE,
                    format!("cache unavailable: {e}"),
                    None::<()>,
                ))
            },
        }
    }

    pub(super) async fn write_cache_impl(
        &self,
        key: &str,
        expires_at: DateTime<Utc>,
        data: &str,
    ) -> Result<WriteCacheResponse, ErrorObjectOwned> {
        let payload = decode_payload(data).map_err(|e| {
            ErrorObjectOwned::owned(error_codes::INVALID_REQUEST, e.to_string(), None::<()>)
        })?;
        Ok(self.services.cache.write(key, expires_at, payload).await)
    }
}
