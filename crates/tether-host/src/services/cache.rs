//! Cache service.
//!
//! A miss is not an error: absent, expired and unreadable entries all read
//! as a miss. Only a store fault surfaces, and only on reads. Writes
//! always produce a response; failures are reported as `ok = false`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tether_core::ComponentName;
use tether_protocol::WriteCacheResponse;
use tether_storage::{
    CacheLookup, ExpiringCache, KvStore, PutOutcome, ScopedKvStore, StorageError, StorageResult,
};
use tracing::{debug, warn};

/// Namespace used when the component is unknown.
pub const SHARED_NAMESPACE: &str = "cache:shared";

/// Namespace holding `component`'s entries.
#[must_use]
pub fn namespace_for(component: Option<&ComponentName>) -> String {
    component.map_or_else(|| SHARED_NAMESPACE.to_string(), |c| format!("cache:{c}"))
}

/// Cache operations for one component.
#[derive(Debug, Clone)]
pub struct CacheService {
    cache: Option<ExpiringCache>,
}

impl CacheService {
    /// Cache scoped to `component` (or the shared namespace).
    ///
    /// # Errors
    ///
    /// Returns an error if the namespace is invalid.
    pub fn new(store: Arc<dyn KvStore>, component: Option<&ComponentName>) -> StorageResult<Self> {
        let scoped = ScopedKvStore::new(store, namespace_for(component))?;
        Ok(Self {
            cache: Some(ExpiringCache::new(scoped)),
        })
    }

    /// A cache that never stores anything.
    #[must_use]
    pub fn disabled() -> Self {
        Self { cache: None }
    }

    /// Whether reads and writes reach a store.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.cache.is_some()
    }

    /// Read `key`. `Ok(None)` is a miss.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKey`] for a malformed key and another
    /// [`StorageError`] if the store cannot be read.
    pub async fn read(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let Some(cache) = &self.cache else {
            return Ok(None);
        };
        match cache.get(key, Utc::now()).await? {
            CacheLookup::Hit(data) => Ok(Some(data)),
            CacheLookup::Miss(reason) => {
                debug!(namespace = %cache.namespace(), key = %key, reason = ?reason, "Cache miss");
                Ok(None)
            },
        }
    }

    /// Store `data` under `key` until `expires_at`.
    pub async fn write(
        &self,
        key: &str,
        expires_at: DateTime<Utc>,
        data: Vec<u8>,
    ) -> WriteCacheResponse {
        let Some(cache) = &self.cache else {
            return WriteCacheResponse::skipped("cache disabled");
        };
        match cache.put(key, expires_at, data, Utc::now()).await {
            Ok(PutOutcome::Stored) => WriteCacheResponse::stored(),
            Ok(PutOutcome::AlreadyExpired) => {
                WriteCacheResponse::skipped("expiry is in the past, entry not stored")
            },
            Err(StorageError::InvalidKey(msg)) => WriteCacheResponse::failed(msg),
            Err(e) => {
                warn!(namespace = %cache.namespace(), key = %key, error = %e, "Cache write failed");
                WriteCacheResponse::failed(e.to_string())
            },
        }
    }
}

/// Erase the shared namespace and those of `components`. Returns the number
/// of entries removed.
///
/// # Errors
///
/// Returns an error if the store fails.
pub async fn clear_all(
    store: &Arc<dyn KvStore>,
    components: &[ComponentName],
) -> StorageResult<u64> {
    let mut removed = store.clear_namespace(SHARED_NAMESPACE).await?;
    for component in components {
        let n = store.clear_namespace(&namespace_for(Some(component))).await?;
        removed = removed.saturating_add(n);
    }
    Ok(removed)
}

/// Erase expired and unreadable entries in the shared namespace and those
/// of `components`.
///
/// # Errors
///
/// Returns an error if the store fails.
pub async fn prune_all(
    store: &Arc<dyn KvStore>,
    components: &[ComponentName],
) -> StorageResult<u64> {
    let now = Utc::now();
    let mut removed = 0u64;
    let namespaces = std::iter::once(None).chain(components.iter().map(Some));
    for component in namespaces {
        let scoped = ScopedKvStore::new(Arc::clone(store), namespace_for(component))?;
        let n = ExpiringCache::new(scoped).purge_expired(now).await?;
        removed = removed.saturating_add(n);
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tether_storage::MemoryKvStore;

    fn store() -> Arc<dyn KvStore> {
        Arc::new(MemoryKvStore::new())
    }

    fn name(s: &str) -> ComponentName {
        ComponentName::new(s).unwrap()
    }

    #[test]
    fn namespaces() {
        assert_eq!(namespace_for(None), "cache:shared");
        assert_eq!(namespace_for(Some(&name("iac"))), "cache:iac");
    }

    #[tokio::test]
    async fn never_written_is_a_miss() {
        let service = CacheService::new(store(), Some(&name("iac"))).unwrap();
        assert_eq!(service.read("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn past_expiry_is_not_stored() {
        let service = CacheService::new(store(), None).unwrap();
        let response = service
            .write("k", Utc::now() - Duration::seconds(1), b"v".to_vec())
            .await;
        assert!(response.ok);
        assert!(response.message.is_some());
        assert_eq!(service.read("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn round_trip() {
        let service = CacheService::new(store(), None).unwrap();
        let response = service
            .write("k", Utc::now() + Duration::hours(1), b"[\"a\",\"b\"]".to_vec())
            .await;
        assert_eq!(response, WriteCacheResponse::stored());
        assert_eq!(
            service.read("k").await.unwrap().as_deref(),
            Some(&b"[\"a\",\"b\"]"[..])
        );
    }

    #[tokio::test]
    async fn components_do_not_share_entries() {
        let shared = store();
        let iac = CacheService::new(Arc::clone(&shared), Some(&name("iac"))).unwrap();
        let vuln = CacheService::new(Arc::clone(&shared), Some(&name("vuln"))).unwrap();
        iac.write("k", Utc::now() + Duration::hours(1), b"1".to_vec())
            .await;
        assert_eq!(vuln.read("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn invalid_key_write_is_not_ok() {
        let service = CacheService::new(store(), None).unwrap();
        let response = service
            .write("", Utc::now() + Duration::hours(1), b"v".to_vec())
            .await;
        assert!(!response.ok);
    }

    #[tokio::test]
    async fn disabled_cache_always_misses() {
        let service = CacheService::disabled();
        assert!(!service.is_enabled());
        let response = service
            .write("k", Utc::now() + Duration::hours(1), b"v".to_vec())
            .await;
        assert!(response.ok);
        assert_eq!(service.read("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn clear_and_prune_cover_all_namespaces() {
        let shared = store();
        let future = Utc::now() + Duration::hours(1);
        let components = [name("iac")];

        let iac = CacheService::new(Arc::clone(&shared), Some(&components[0])).unwrap();
        let common = CacheService::new(Arc::clone(&shared), None).unwrap();
        iac.write("a", future, b"1".to_vec()).await;
        common.write("b", future, b"2".to_vec()).await;
        shared
            .set("cache:iac", "stale", vec![0xff])
            .await
            .unwrap();

        assert_eq!(prune_all(&shared, &components).await.unwrap(), 1);
        assert_eq!(clear_all(&shared, &components).await.unwrap(), 2);
        assert_eq!(iac.read("a").await.unwrap(), None);
    }
}
