//! The component side of a host connection.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::FutureExt as _;
use futures::future::BoxFuture;
use jsonrpsee::ws_client::{WsClient, WsClientBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tether_protocol::{CoreRpcClient, EmitRequest, HostTarget, encode_payload};

use crate::error::{ClientError, ClientResult};
use crate::logger::ClientLogger;
use crate::options::ClientOptions;
use crate::telemetry::{MetricBuilder, TelemetryQueue};

/// One component invocation's connection to its host.
///
/// Cache reads are awaited round trips. Cache writes and telemetry never
/// fail the caller. Call [`close`](Self::close) (or use
/// [`scope`](Self::scope)) to flush queued telemetry; dropping the client
/// discards it.
#[derive(Debug)]
pub struct ComponentClient {
    rpc: Option<Arc<WsClient>>,
    options: ClientOptions,
    host_version: Option<String>,
    telemetry: TelemetryQueue,
}

impl ComponentClient {
    /// Connect to the host and perform the handshake.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Connection`] if the target is unset, invalid
    /// or not loopback, the host is unreachable, or the handshake fails.
    pub async fn connect(options: ClientOptions) -> ClientResult<Self> {
        let raw = options.target.as_deref().ok_or_else(|| {
            ClientError::Connection(format!(
                "{} is not set; is this running under a host?",
                tether_core::env::HOST_TARGET
            ))
        })?;
        let target = HostTarget::parse(raw).map_err(|e| ClientError::Connection(e.to_string()))?;

        let rpc = WsClientBuilder::default()
            .connection_timeout(options.connect_timeout)
            .build(target.ws_url())
            .await
            .map_err(|e| {
                ClientError::Connection(format!("failed to connect to host at {target}: {e}"))
            })?;

        let pong = rpc
            .ping(options.component.clone(), options.version.clone())
            .await
            .map_err(|e| ClientError::Connection(format!("handshake with {target} failed: {e}")))?;
        options.logger.debug(&format!(
            "connected to host {} at {target}: {}",
            pong.host_version, pong.message
        ));

        let rpc = Arc::new(rpc);
        let telemetry = TelemetryQueue::spawn(
            Arc::clone(&rpc),
            options.queue_capacity,
            options.call_timeout,
            Arc::clone(&options.logger),
        );
        Ok(Self {
            rpc: Some(rpc),
            options,
            host_version: Some(pong.host_version),
            telemetry,
        })
    }

    /// Connect, or fall back to a client with no host.
    ///
    /// The fallback fails reads with [`ClientError::Connection`] and turns
    /// writes and telemetry into logged no-ops.
    pub async fn connect_lenient(options: ClientOptions) -> Self {
        match Self::connect(options.clone()).await {
            Ok(client) => client,
            Err(e) => {
                options
                    .logger
                    .warn(&format!("continuing without host services: {e}"));
                Self::disconnected(options)
            },
        }
    }

    /// A client with no host.
    #[must_use]
    pub fn disconnected(options: ClientOptions) -> Self {
        let telemetry = TelemetryQueue::disconnected(Arc::clone(&options.logger));
        Self {
            rpc: None,
            options,
            host_version: None,
            telemetry,
        }
    }

    /// Connect, run `f`, then close on every exit path.
    ///
    /// A panic inside `f` is resumed after the client is closed.
    ///
    /// ```rust,ignore
    /// let n = ComponentClient::scope(options, |client| {
    ///     async move { Ok::<_, anyhow::Error>(client.read_cache_as::<u32>("n").await?) }.boxed()
    /// })
    /// .await?;
    /// ```
    ///
    /// # Errors
    ///
    /// Returns the connection error, or whatever `f` returned.
    pub async fn scope<T, E, F>(options: ClientOptions, f: F) -> Result<T, E>
    where
        E: From<ClientError>,
        F: for<'c> FnOnce(&'c ComponentClient) -> BoxFuture<'c, Result<T, E>>,
    {
        let client = Self::connect(options).await?;
        client.run_scoped(f).await
    }

    /// Like [`scope`](Self::scope), but falls back to a client with no host
    /// as [`connect_lenient`](Self::connect_lenient) does.
    ///
    /// # Errors
    ///
    /// Returns whatever `f` returned.
    pub async fn scope_lenient<T, E, F>(options: ClientOptions, f: F) -> Result<T, E>
    where
        F: for<'c> FnOnce(&'c ComponentClient) -> BoxFuture<'c, Result<T, E>>,
    {
        Self::connect_lenient(options).await.run_scoped(f).await
    }

    async fn run_scoped<T, E, F>(self, f: F) -> Result<T, E>
    where
        F: for<'c> FnOnce(&'c ComponentClient) -> BoxFuture<'c, Result<T, E>>,
    {
        let outcome = AssertUnwindSafe(f(&self)).catch_unwind().await;
        self.close().await;
        match outcome {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    /// Flush queued telemetry and close the connection.
    pub async fn close(mut self) {
        self.telemetry.close(self.options.flush_timeout).await;
        self.rpc = None;
        self.options.logger.debug("connection to host closed");
    }

    // -----------------------------------------------------------------------
    // Identity
    // -----------------------------------------------------------------------

    /// Whether a host answered the handshake.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.rpc.is_some()
    }

    /// Component name sent in the handshake.
    #[must_use]
    pub fn component(&self) -> &str {
        &self.options.component
    }

    /// Component version sent in the handshake.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.options.version
    }

    /// Version reported by the host.
    #[must_use]
    pub fn host_version(&self) -> Option<&str> {
        self.host_version.as_deref()
    }

    /// The injected logger.
    #[must_use]
    pub fn logger(&self) -> &dyn ClientLogger {
        self.options.logger.as_ref()
    }

    // -----------------------------------------------------------------------
    // Cache
    // -----------------------------------------------------------------------

    /// Read the raw bytes stored under `key`.
    ///
    /// # Errors
    ///
    /// - [`ClientError::CacheMiss`] if no live entry exists.
    /// - [`ClientError::Connection`] if there is no host.
    /// - [`ClientError::Transport`] if the call or the host store failed.
    pub async fn read_cache(&self, key: &str) -> ClientResult<Vec<u8>> {
        if self.options.no_cache {
            return Err(ClientError::CacheMiss { key: key.to_string() });
        }
        let rpc = self.rpc()?;
        let response = rpc
            .read_cache(key.to_string())
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        response
            .into_payload()
            .map_err(|e| ClientError::Transport(e.to_string()))?
            .ok_or_else(|| ClientError::CacheMiss { key: key.to_string() })
    }

    /// Read and deserialize the JSON value stored under `key`.
    ///
    /// # Errors
    ///
    /// As [`read_cache`](Self::read_cache), plus
    /// [`ClientError::Serialization`] if the entry is not a `T`.
    pub async fn read_cache_as<T: DeserializeOwned>(&self, key: &str) -> ClientResult<T> {
        let bytes = self.read_cache(key).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Store `value` as JSON under `key` until `expires_at`.
    ///
    /// Host and transport failures are logged and swallowed.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Serialization`] if `value` cannot be encoded.
    pub async fn write_cache<T>(
        &self,
        key: &str,
        expires_at: DateTime<Utc>,
        value: &T,
    ) -> ClientResult<()>
    where
        T: Serialize + ?Sized,
    {
        let bytes = serde_json::to_vec(value)?;
        if self.options.no_cache {
            return Ok(());
        }
        let Some(rpc) = &self.rpc else {
            self.logger()
                .debug(&format!("not connected to host, skipping cache write of {key}"));
            return Ok(());
        };
        match rpc
            .write_cache(key.to_string(), expires_at, encode_payload(&bytes))
            .await
        {
            Ok(response) if !response.ok => self.logger().warn(&format!(
                "host did not store cache entry {key}: {}",
                response.message.as_deref().unwrap_or("no reason given")
            )),
            Ok(_) => {},
            Err(e) => self
                .logger()
                .warn(&format!("failed to write cache entry {key}: {e}")),
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Telemetry
    // -----------------------------------------------------------------------

    /// Start a feature event.
    pub fn metric(&self, feature: impl Into<String>) -> MetricBuilder<'_> {
        MetricBuilder::new(self, feature.into())
    }

    /// Report an error.
    pub fn metric_error(&self, error: &dyn fmt::Display) {
        let event = EmitRequest {
            error: Some(error.to_string()),
            ..self.identity_request()
        };
        self.enqueue(event);
    }

    pub(crate) fn identity_request(&self) -> EmitRequest {
        EmitRequest {
            component: self.options.component.clone(),
            version: self.options.version.clone(),
            ..EmitRequest::default()
        }
    }

    pub(crate) fn enqueue(&self, event: EmitRequest) {
        self.telemetry.send(event);
    }

    fn rpc(&self) -> ClientResult<&WsClient> {
        self.rpc
            .as_deref()
            .ok_or_else(|| ClientError::Connection("not connected to host".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use futures::FutureExt;

    use super::*;
    use crate::logger::test_support::RecordingLogger;

    fn offline(logger: Arc<RecordingLogger>) -> ComponentClient {
        ComponentClient::disconnected(
            ClientOptions::new("1.0.0")
                .with_component("iac")
                .with_logger(logger),
        )
    }

    #[tokio::test]
    async fn missing_target_is_a_connection_error() {
        let err = ComponentClient::connect(ClientOptions::new("1.0.0"))
            .await
            .unwrap_err();
        assert!(err.is_connection());
    }

    #[tokio::test]
    async fn non_loopback_target_is_a_connection_error() {
        let err = ComponentClient::connect(ClientOptions::new("1.0.0").with_target("10.0.0.1:80"))
            .await
            .unwrap_err();
        assert!(err.is_connection());
    }

    #[tokio::test]
    async fn disconnected_reads_fail_with_connection() {
        let client = offline(Arc::new(RecordingLogger::default()));
        assert!(!client.is_connected());
        let err = client.read_cache("k").await.unwrap_err();
        assert!(err.is_connection());
    }

    #[tokio::test]
    async fn disconnected_writes_and_metrics_are_logged_noops() {
        let logger = Arc::new(RecordingLogger::default());
        let client = offline(Arc::clone(&logger));

        client
            .write_cache("k", Utc::now(), &vec!["a", "b"])
            .await
            .unwrap();
        client.metric("scan").with_attribute("files", "3").send();
        client.metric_error(&"boom");
        client.close().await;

        let lines = logger.lines();
        assert!(lines.iter().any(|l| l.contains("skipping cache write of k")));
        assert_eq!(
            lines
                .iter()
                .filter(|l| l.contains("dropping telemetry event"))
                .count(),
            2
        );
    }

    #[tokio::test]
    async fn unserializable_value_is_returned() {
        use std::collections::HashMap;

        let client = offline(Arc::new(RecordingLogger::default()));
        // JSON object keys must be strings.
        let value: HashMap<(u8, u8), u8> = HashMap::from([((1, 2), 3)]);
        let err = client.write_cache("k", Utc::now(), &value).await.unwrap_err();
        assert!(matches!(err, ClientError::Serialization(_)));
    }

    #[tokio::test]
    async fn lenient_scope_closes_on_error() {
        let logger = Arc::new(RecordingLogger::default());
        let options = ClientOptions::new("1.0.0").with_logger(Arc::<RecordingLogger>::clone(&logger));

        let result: Result<(), ClientError> = ComponentClient::scope_lenient(options, |client| {
            async move {
                client.metric("greet").send();
                Err(ClientError::Transport("boom".into()))
            }
            .boxed()
        })
        .await;

        assert!(matches!(result, Err(ClientError::Transport(_))));
        let lines = logger.lines();
        assert!(lines.iter().any(|l| l.contains("continuing without host services")));
        assert!(lines.iter().any(|l| l.contains("connection to host closed")));
    }

    #[tokio::test]
    async fn no_cache_reads_miss_without_a_host() {
        let client = ComponentClient::disconnected(ClientOptions::new("1.0.0").with_no_cache(true));
        assert!(client.read_cache("k").await.unwrap_err().is_cache_miss());
    }

    #[test]
    fn identity_is_stamped_on_events() {
        let client = offline(Arc::new(RecordingLogger::default()));
        let event = client.identity_request();
        assert_eq!(event.component, "iac");
        assert_eq!(event.version, "1.0.0");
    }
}
