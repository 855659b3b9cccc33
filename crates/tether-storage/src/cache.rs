//! Expiring cache entries on top of a [`ScopedKvStore`].
//!
//! Each stored value is a [`CacheEnvelope`]:
//!
//! ```text
//! +--------+--------------------------+-----------------+
//! | 0x01   | expiry, i64 BE, unix ms  | payload bytes   |
//! +--------+--------------------------+-----------------+
//! ```
//!
//! Expiry is enforced here, on read. A lookup never distinguishes "never
//! written" from "expired" from "unreadable" to its caller beyond the
//! [`MissReason`] used for logging. All three are misses.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::{StorageError, StorageResult};
use crate::kv::ScopedKvStore;

/// Envelope format byte.
const FORMAT_V1: u8 = 1;

/// Header length: format byte plus an `i64` timestamp.
const HEADER_LEN: usize = 9;

/// A payload with its absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEnvelope {
    /// When the entry stops being served.
    pub expires_at: DateTime<Utc>,
    /// Opaque payload.
    pub data: Vec<u8>,
}

impl CacheEnvelope {
    /// Create an envelope.
    #[must_use]
    pub fn new(expires_at: DateTime<Utc>, data: Vec<u8>) -> Self {
        Self { expires_at, data }
    }

    /// Whether the entry is expired at `now`. An entry expiring exactly at
    /// `now` is expired.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Serialize to the on-disk format.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN.saturating_add(self.data.len()));
        buf.push(FORMAT_V1);
        buf.extend_from_slice(&self.expires_at.timestamp_millis().to_be_bytes());
        buf.extend_from_slice(&self.data);
        buf
    }

    /// Parse the on-disk format.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Corrupt`] for truncated input, an unknown
    /// format byte or an out-of-range timestamp.
    pub fn decode(bytes: &[u8]) -> StorageResult<Self> {
        let (header, data) = bytes
            .split_at_checked(HEADER_LEN)
            .ok_or_else(|| StorageError::Corrupt(format!("envelope too short ({} bytes)", bytes.len())))?;
        let (format, millis) = header
            .split_first()
            .ok_or_else(|| StorageError::Corrupt("empty envelope".into()))?;
        if *format != FORMAT_V1 {
            return Err(StorageError::Corrupt(format!(
                "unknown envelope format {format}"
            )));
        }
        let millis: [u8; 8] = millis
            .try_into()
            .map_err(|_| StorageError::Corrupt("bad timestamp width".into()))?;
        let expires_at = DateTime::from_timestamp_millis(i64::from_be_bytes(millis))
            .ok_or_else(|| StorageError::Corrupt("timestamp out of range".into()))?;
        Ok(Self {
            expires_at,
            data: data.to_vec(),
        })
    }
}

/// Why a lookup missed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissReason {
    /// No entry under the key.
    Absent,
    /// The entry had expired; it was erased.
    Expired,
    /// The entry could not be decoded; it was erased.
    Corrupt,
}

/// Outcome of [`ExpiringCache::get`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    /// A live entry.
    Hit(Vec<u8>),
    /// No live entry.
    Miss(MissReason),
}

impl CacheLookup {
    /// Whether this is a hit.
    #[must_use]
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit(_))
    }
}

/// Outcome of [`ExpiringCache::put`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// The entry was written.
    Stored,
    /// The expiry was already in the past; nothing was written.
    AlreadyExpired,
}

/// A namespace of expiring entries.
#[derive(Debug, Clone)]
pub struct ExpiringCache {
    store: ScopedKvStore,
}

impl ExpiringCache {
    /// Wrap a scoped store.
    #[must_use]
    pub fn new(store: ScopedKvStore) -> Self {
        Self { store }
    }

    /// The namespace entries live in.
    #[must_use]
    pub fn namespace(&self) -> &str {
        self.store.namespace()
    }

    /// Look up `key` as of `now`.
    ///
    /// Expired and undecodable entries are erased best-effort; a failure to
    /// erase is logged and does not turn the miss into an error.
    ///
    /// # Errors
    ///
    /// Returns an error only if the key is invalid or the backend read
    /// fails.
    pub async fn get(&self, key: &str, now: DateTime<Utc>) -> StorageResult<CacheLookup> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(CacheLookup::Miss(MissReason::Absent));
        };

        let reason = match CacheEnvelope::decode(&raw) {
            Ok(envelope) if !envelope.is_expired_at(now) => {
                return Ok(CacheLookup::Hit(envelope.data));
            },
            Ok(envelope) => {
                debug!(
                    namespace = %self.namespace(),
                    key = %key,
                    expired_at = %envelope.expires_at,
                    "Cache entry expired"
                );
                MissReason::Expired
            },
            Err(e) => {
                warn!(namespace = %self.namespace(), key = %key, error = %e, "Discarding corrupt cache entry");
                MissReason::Corrupt
            },
        };

        if let Err(e) = self.store.delete(key).await {
            warn!(namespace = %self.namespace(), key = %key, error = %e, "Failed to erase stale cache entry");
        }
        Ok(CacheLookup::Miss(reason))
    }

    /// Store `data` under `key` until `expires_at`.
    ///
    /// An entry that would already be expired at `now` is not written.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the backend write fails.
    pub async fn put(
        &self,
        key: &str,
        expires_at: DateTime<Utc>,
        data: Vec<u8>,
        now: DateTime<Utc>,
    ) -> StorageResult<PutOutcome> {
        crate::kv::validate_key(key)?;
        let envelope = CacheEnvelope::new(expires_at, data);
        if envelope.is_expired_at(now) {
            debug!(namespace = %self.namespace(), key = %key, "Skipping already-expired cache write");
            return Ok(PutOutcome::AlreadyExpired);
        }
        self.store.set(key, envelope.encode()).await?;
        Ok(PutOutcome::Stored)
    }

    /// Erase every expired or corrupt entry, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> StorageResult<u64> {
        let mut removed = 0u64;
        for key in self.store.list_keys().await? {
            let Some(raw) = self.store.get(&key).await? else {
                continue;
            };
            let stale = CacheEnvelope::decode(&raw).map_or(true, |env| env.is_expired_at(now));
            if stale && self.store.delete(&key).await? {
                removed = removed.saturating_add(1);
            }
        }
        Ok(removed)
    }

    /// Erase every entry in the namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub async fn clear(&self) -> StorageResult<u64> {
        self.store.clear().await
    }

    /// Keys currently stored, live or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub async fn keys(&self) -> StorageResult<Vec<String>> {
        self.store.list_keys().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;

    use super::*;
    use crate::kv::{KvStore, MemoryKvStore};

    fn cache() -> (Arc<MemoryKvStore>, ExpiringCache) {
        let mem = Arc::new(MemoryKvStore::new());
        let store: Arc<dyn KvStore> = Arc::clone(&mem) as Arc<dyn KvStore>;
        let scoped = ScopedKvStore::new(store, "cache:test").unwrap();
        (mem, ExpiringCache::new(scoped))
    }

    #[test]
    fn envelope_encode_decode() {
        let at = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        let env = CacheEnvelope::new(at, b"payload".to_vec());
        let bytes = env.encode();
        assert_eq!(bytes[0], FORMAT_V1);
        assert_eq!(CacheEnvelope::decode(&bytes).unwrap(), env);
    }

    #[test]
    fn envelope_decode_rejects_garbage() {
        assert!(matches!(
            CacheEnvelope::decode(b"short"),
            Err(StorageError::Corrupt(_))
        ));
        let mut bytes = CacheEnvelope::new(Utc::now(), vec![]).encode();
        bytes[0] = 9;
        assert!(matches!(
            CacheEnvelope::decode(&bytes),
            Err(StorageError::Corrupt(_))
        ));
    }

    #[test]
    fn envelope_expiry_boundary() {
        let now = Utc::now();
        assert!(CacheEnvelope::new(now, vec![]).is_expired_at(now));
        assert!(!CacheEnvelope::new(now + Duration::seconds(1), vec![]).is_expired_at(now));
    }

    #[tokio::test]
    async fn get_absent_is_miss() {
        let (_, cache) = cache();
        assert_eq!(
            cache.get("nope", Utc::now()).await.unwrap(),
            CacheLookup::Miss(MissReason::Absent)
        );
    }

    #[tokio::test]
    async fn put_then_get_hits() {
        let (_, cache) = cache();
        let now = Utc::now();
        let outcome = cache
            .put("k", now + Duration::hours(1), br#"["a","b"]"#.to_vec(), now)
            .await
            .unwrap();
        assert_eq!(outcome, PutOutcome::Stored);
        assert_eq!(
            cache.get("k", now).await.unwrap(),
            CacheLookup::Hit(br#"["a","b"]"#.to_vec())
        );
    }

    #[tokio::test]
    async fn expired_entry_is_miss_and_erased() {
        let (mem, cache) = cache();
        let now = Utc::now();
        cache
            .put("k", now + Duration::seconds(5), b"v".to_vec(), now)
            .await
            .unwrap();

        let later = now + Duration::seconds(10);
        assert_eq!(
            cache.get("k", later).await.unwrap(),
            CacheLookup::Miss(MissReason::Expired)
        );
        assert!(mem.get("cache:test", "k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn already_expired_put_is_skipped() {
        let (mem, cache) = cache();
        let now = Utc::now();
        let outcome = cache
            .put("k", now - Duration::hours(1), b"v".to_vec(), now)
            .await
            .unwrap();
        assert_eq!(outcome, PutOutcome::AlreadyExpired);
        assert!(mem.get("cache:test", "k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_entry_is_miss() {
        let (mem, cache) = cache();
        mem.set("cache:test", "k", b"junk".to_vec()).await.unwrap();
        assert_eq!(
            cache.get("k", Utc::now()).await.unwrap(),
            CacheLookup::Miss(MissReason::Corrupt)
        );
        assert!(mem.get("cache:test", "k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn purge_removes_only_stale_entries() {
        let (mem, cache) = cache();
        let now = Utc::now();
        cache
            .put("live", now + Duration::hours(1), vec![1], now)
            .await
            .unwrap();
        cache
            .put("old", now + Duration::seconds(1), vec![2], now)
            .await
            .unwrap();
        mem.set("cache:test", "bad", vec![0]).await.unwrap();

        let removed = cache.purge_expired(now + Duration::minutes(1)).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(cache.keys().await.unwrap(), vec!["live"]);
    }

    #[tokio::test]
    async fn invalid_key_is_an_error() {
        let (_, cache) = cache();
        let now = Utc::now();
        assert!(matches!(
            cache.put("", now + Duration::hours(1), vec![], now).await,
            Err(StorageError::InvalidKey(_))
        ));
    }
}
