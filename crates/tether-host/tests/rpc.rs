//! End-to-end tests of the host endpoint over a real loopback socket.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonrpsee::core::client::Error as ClientError;
use jsonrpsee::ws_client::{WsClient, WsClientBuilder};
use tether_core::ComponentName;
use tether_host::{CacheService, HostServer, HostServices, ServerConfig};
use tether_protocol::{CoreRpcClient, EmitRequest, encode_payload, error_codes};
use tether_storage::{KvStore, MemoryKvStore, StorageError, StorageResult};
use tether_telemetry::{EventKind, MemorySink};

/// A store whose every operation fails.
struct UnreachableStore;

#[async_trait]
impl KvStore for UnreachableStore {
    async fn get(&self, _namespace: &str, _key: &str) -> StorageResult<Option<Vec<u8>>> {
        Err(StorageError::Connection("store offline".into()))
    }

    async fn set(&self, _namespace: &str, _key: &str, _value: Vec<u8>) -> StorageResult<()> {
        Err(StorageError::Connection("store offline".into()))
    }

    async fn delete(&self, _namespace: &str, _key: &str) -> StorageResult<bool> {
        Err(StorageError::Connection("store offline".into()))
    }

    async fn list_keys(&self, _namespace: &str) -> StorageResult<Vec<String>> {
        Err(StorageError::Connection("store offline".into()))
    }

    async fn clear_namespace(&self, _namespace: &str) -> StorageResult<u64> {
        Err(StorageError::Connection("store offline".into()))
    }
}

struct Harness {
    server: HostServer,
    client: WsClient,
    sink: Arc<MemorySink>,
}

impl Harness {
    async fn start(store: Arc<dyn KvStore>, component: Option<&str>) -> Self {
        let sink = Arc::new(MemorySink::new());
        let name = component.map(|c| ComponentName::new(c).unwrap());
        let services = HostServices::for_component(store, sink.clone(), name.as_ref()).unwrap();
        Self::with_services(services, sink).await
    }

    async fn with_services(services: HostServices, sink: Arc<MemorySink>) -> Self {
        let server = HostServer::start(&ServerConfig::ephemeral(), services)
            .await
            .unwrap();
        let client = WsClientBuilder::default()
            .build(server.target().ws_url())
            .await
            .unwrap();
        Self {
            server,
            client,
            sink,
        }
    }

    async fn stop(self) {
        drop(self.client);
        self.server.stop().await;
    }
}

fn call_code(err: ClientError) -> i32 {
    match err {
        ClientError::Call(obj) => obj.code(),
        other => panic!("expected call error, got {other:?}"),
    }
}

#[tokio::test]
async fn ping_answers_with_component_name() {
    let h = Harness::start(Arc::new(MemoryKvStore::new()), Some("iac")).await;
    let pong = h
        .client
        .ping("iac".into(), "1.0.0".into())
        .await
        .unwrap();
    assert_eq!(pong.message, "Pong iac");
    assert_eq!(pong.host_version, tether_host::HOST_VERSION);
    h.stop().await;
}

#[tokio::test]
async fn unknown_key_is_a_miss() {
    let h = Harness::start(Arc::new(MemoryKvStore::new()), Some("iac")).await;
    let response = h.client.read_cache("nothing-here".into()).await.unwrap();
    assert!(!response.hit);
    assert_eq!(response.into_payload().unwrap(), None);
    h.stop().await;
}

#[tokio::test]
async fn write_then_read_round_trips() {
    let h = Harness::start(Arc::new(MemoryKvStore::new()), Some("iac")).await;
    let payload = br#"["a","b"]"#;
    let ack = h
        .client
        .write_cache(
            "projects".into(),
            Utc::now() + Duration::hours(1),
            encode_payload(payload),
        )
        .await
        .unwrap();
    assert!(ack.ok);

    let response = h.client.read_cache("projects".into()).await.unwrap();
    assert_eq!(response.into_payload().unwrap(), Some(payload.to_vec()));
    h.stop().await;
}

#[tokio::test]
async fn past_expiry_write_reads_as_miss() {
    let h = Harness::start(Arc::new(MemoryKvStore::new()), None).await;
    let ack = h
        .client
        .write_cache(
            "k".into(),
            Utc::now() - Duration::minutes(5),
            encode_payload(b"old"),
        )
        .await
        .unwrap();
    assert!(ack.ok);
    assert!(!h.client.read_cache("k".into()).await.unwrap().hit);
    h.stop().await;
}

#[tokio::test]
async fn empty_key_read_is_invalid_request() {
    let h = Harness::start(Arc::new(MemoryKvStore::new()), None).await;
    let err = h.client.read_cache(String::new()).await.unwrap_err();
    assert_eq!(call_code(err), error_codes::INVALID_REQUEST);
    h.stop().await;
}

#[tokio::test]
async fn bad_base64_is_invalid_request() {
    let h = Harness::start(Arc::new(MemoryKvStore::new()), None).await;
    let err = h
        .client
        .write_cache("k".into(), Utc::now() + Duration::hours(1), "%%%".into())
        .await
        .unwrap_err();
    assert_eq!(call_code(err), error_codes::INVALID_REQUEST);
    h.stop().await;
}

#[tokio::test]
async fn unreachable_store_fails_reads_but_not_writes() {
    let h = Harness::start(Arc::new(UnreachableStore), Some("iac")).await;

    let err = h.client.read_cache("k".into()).await.unwrap_err();
    assert_eq!(call_code(err), error_codes::CACHE_UNAVAILABLE);

    let ack = h
        .client
        .write_cache("k".into(), Utc::now() + Duration::hours(1), encode_payload(b"v"))
        .await
        .unwrap();
    assert!(!ack.ok);
    assert!(ack.message.is_some());
    h.stop().await;
}

#[tokio::test]
async fn disabled_cache_never_hits() {
    let sink = Arc::new(MemorySink::new());
    let services =
        HostServices::for_component(Arc::new(MemoryKvStore::new()), sink.clone(), None)
            .unwrap()
            .with_cache(CacheService::disabled());
    let h = Harness::with_services(services, sink).await;

    h.client
        .write_cache("k".into(), Utc::now() + Duration::hours(1), encode_payload(b"v"))
        .await
        .unwrap();
    assert!(!h.client.read_cache("k".into()).await.unwrap().hit);
    h.stop().await;
}

#[tokio::test]
async fn endpoints_for_different_components_are_isolated() {
    let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
    let iac = Harness::start(Arc::clone(&store), Some("iac")).await;
    let vuln = Harness::start(Arc::clone(&store), Some("vuln")).await;

    iac.client
        .write_cache("k".into(), Utc::now() + Duration::hours(1), encode_payload(b"v"))
        .await
        .unwrap();
    assert!(iac.client.read_cache("k".into()).await.unwrap().hit);
    assert!(!vuln.client.read_cache("k".into()).await.unwrap().hit);

    iac.stop().await;
    vuln.stop().await;
}

#[tokio::test]
async fn emit_reaches_the_sink() {
    let h = Harness::start(Arc::new(MemoryKvStore::new()), Some("iac")).await;
    let ack = h
        .client
        .emit(EmitRequest {
            component: "iac".into(),
            version: "1.0.0".into(),
            feature: Some("scan".into()),
            duration_ms: Some(12),
            ..EmitRequest::default()
        })
        .await
        .unwrap();
    assert!(ack.accepted);

    let events = h.sink.events();
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0].kind, EventKind::Feature { name, .. } if name == "scan"));
    h.stop().await;
}

#[tokio::test]
async fn empty_emit_is_acknowledged_but_not_recorded() {
    let h = Harness::start(Arc::new(MemoryKvStore::new()), Some("iac")).await;
    let ack = h
        .client
        .emit(EmitRequest {
            component: "iac".into(),
            version: "1.0.0".into(),
            ..EmitRequest::default()
        })
        .await
        .unwrap();
    assert!(!ack.accepted);
    assert!(h.sink.is_empty());
    h.stop().await;
}
