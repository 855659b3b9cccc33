//! Fire-and-forget telemetry.
//!
//! Events go onto a bounded queue drained by one background task. Callers
//! never wait on the host and never see a telemetry failure.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use jsonrpsee::ws_client::WsClient;
use tether_protocol::{CoreRpcClient, EmitRequest};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

use crate::client::ComponentClient;
use crate::logger::ClientLogger;

// ---------------------------------------------------------------------------
// Queue
// ---------------------------------------------------------------------------

/// Bounded queue plus the worker that drains it.
#[derive(Debug)]
pub(crate) struct TelemetryQueue {
    tx: Option<mpsc::Sender<EmitRequest>>,
    worker: Option<JoinHandle<()>>,
    logger: Arc<dyn ClientLogger>,
}

impl TelemetryQueue {
    /// Start a worker sending through `client`.
    pub(crate) fn spawn(
        client: Arc<WsClient>,
        capacity: usize,
        call_timeout: Duration,
        logger: Arc<dyn ClientLogger>,
    ) -> Self {
        let (tx, mut rx) = mpsc::channel::<EmitRequest>(capacity.max(1));
        let worker_logger = Arc::clone(&logger);

        let worker = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match tokio::time::timeout(call_timeout, client.emit(event)).await {
                    Ok(Ok(ack)) if !ack.accepted => {
                        worker_logger.debug("telemetry event was not recorded by the host");
                    },
                    Ok(Ok(_)) => {},
                    Ok(Err(e)) => worker_logger.warn(&format!("failed to send telemetry: {e}")),
                    Err(_) => worker_logger.warn(&format!(
                        "telemetry call timed out after {}ms",
                        call_timeout.as_millis()
                    )),
                }
            }
        });

        Self {
            tx: Some(tx),
            worker: Some(worker),
            logger,
        }
    }

    /// A queue that drops everything, for a client that never connected.
    pub(crate) fn disconnected(logger: Arc<dyn ClientLogger>) -> Self {
        Self {
            tx: None,
            worker: None,
            logger,
        }
    }

    /// Enqueue without waiting.
    pub(crate) fn send(&self, event: EmitRequest) {
        let Some(tx) = &self.tx else {
            self.logger
                .debug("not connected to host, dropping telemetry event");
            return;
        };
        match tx.try_send(event) {
            Ok(()) => {},
            Err(TrySendError::Full(_)) => {
                self.logger.debug("telemetry queue full, dropping event");
            },
            Err(TrySendError::Closed(_)) => {
                self.logger.debug("telemetry queue closed, dropping event");
            },
        }
    }

    /// Stop accepting events and drain what is queued, for at most
    /// `flush_timeout`.
    pub(crate) async fn close(&mut self, flush_timeout: Duration) {
        self.tx = None;
        let Some(mut worker) = self.worker.take() else {
            return;
        };
        if tokio::time::timeout(flush_timeout, &mut worker).await.is_err() {
            self.logger.warn(&format!(
                "telemetry flush did not finish within {}ms, discarding the rest",
                flush_timeout.as_millis()
            ));
            worker.abort();
        }
    }
}

impl Drop for TelemetryQueue {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// A feature event under construction. Nothing is sent until
/// [`send`](Self::send).
#[must_use = "a metric is only sent by calling `send`"]
#[derive(Debug)]
pub struct MetricBuilder<'a> {
    client: &'a ComponentClient,
    feature: String,
    attributes: BTreeMap<String, String>,
    duration: Option<Duration>,
}

impl<'a> MetricBuilder<'a> {
    pub(crate) fn new(client: &'a ComponentClient, feature: String) -> Self {
        Self {
            client,
            feature,
            attributes: BTreeMap::new(),
            duration: None,
        }
    }

    /// Add one attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Add several attributes.
    pub fn with_attributes<I, K, V>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.attributes
            .extend(attributes.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// How long the reported operation took.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Queue the event.
    pub fn send(self) {
        let duration_ms = self
            .duration
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));
        let event = EmitRequest {
            feature: Some(self.feature),
            attributes: self.attributes,
            duration_ms,
            ..self.client.identity_request()
        };
        self.client.enqueue(event);
    }
}
