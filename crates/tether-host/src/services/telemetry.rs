//! Telemetry service.
//!
//! Converts wire requests into [`TelemetryEvent`]s and hands them to a
//! sink. Nothing here ever fails the caller.

use std::sync::Arc;

use tether_protocol::{EmitAck, EmitRequest};
use tether_telemetry::{EventSink, TelemetryEvent};
use tracing::{debug, warn};

/// Telemetry operations shared by every connection.
#[derive(Debug, Clone)]
pub struct TelemetryService {
    sink: Arc<dyn EventSink>,
    enabled: bool,
}

impl TelemetryService {
    /// Service recording into `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            sink,
            enabled: true,
        }
    }

    /// Turn recording on or off.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Whether events reach the sink.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record one event. `accepted` is true only if the sink took it.
    pub fn record(&self, request: EmitRequest) -> EmitAck {
        let Some(event) = event_from_request(request) else {
            debug!("Ignoring telemetry request with neither feature nor error");
            return EmitAck { accepted: false };
        };
        if !self.enabled {
            return EmitAck { accepted: false };
        }
        match self.sink.record(&event) {
            Ok(()) => EmitAck { accepted: true },
            Err(e) => {
                warn!(component = %event.component, error = %e, "Failed to record telemetry event");
                EmitAck { accepted: false }
            },
        }
    }
}

/// Build an event from a wire request.
///
/// An `error` takes precedence over a `feature`. Returns `None` if neither
/// is set.
#[must_use]
pub fn event_from_request(request: EmitRequest) -> Option<TelemetryEvent> {
    let EmitRequest {
        component,
        version,
        feature,
        attributes,
        duration_ms,
        error,
    } = request;

    if let Some(message) = error {
        return Some(TelemetryEvent::error(component, version, message));
    }
    let name = feature?;
    let mut event = TelemetryEvent::feature(component, version, name).with_attributes(attributes);
    if let Some(ms) = duration_ms {
        event = event.with_duration_ms(ms);
    }
    Some(event)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use tether_telemetry::{EventKind, MemorySink, TelemetryError, TelemetryResult};

    #[derive(Debug)]
    struct BrokenSink;

    impl EventSink for BrokenSink {
        fn record(&self, _event: &TelemetryEvent) -> TelemetryResult<()> {
            Err(TelemetryError::SinkError("disk full".into()))
        }
    }

    fn feature_request() -> EmitRequest {
        EmitRequest {
            component: "iac".into(),
            version: "1.2.0".into(),
            feature: Some("scan".into()),
            attributes: BTreeMap::from([("files".to_string(), "3".to_string())]),
            duration_ms: Some(40),
            error: None,
        }
    }

    #[test]
    fn feature_request_becomes_feature_event() {
        let event = event_from_request(feature_request()).unwrap();
        assert_eq!(event.component, "iac");
        assert_eq!(event.version, "1.2.0");
        match event.kind {
            EventKind::Feature {
                name,
                attributes,
                duration_ms,
            } => {
                assert_eq!(name, "scan");
                assert_eq!(attributes.get("files").map(String::as_str), Some("3"));
                assert_eq!(duration_ms, Some(40));
            },
            EventKind::Error { .. } => panic!("expected feature event"),
        }
    }

    #[test]
    fn error_takes_precedence() {
        let request = EmitRequest {
            error: Some("boom".into()),
            ..feature_request()
        };
        assert!(event_from_request(request).unwrap().is_error());
    }

    #[test]
    fn empty_request_is_not_accepted() {
        let sink = Arc::new(MemorySink::new());
        let service = TelemetryService::new(sink.clone());
        let ack = service.record(EmitRequest {
            component: "iac".into(),
            version: "1.0.0".into(),
            ..EmitRequest::default()
        });
        assert!(!ack.accepted);
        assert!(sink.is_empty());
    }

    #[test]
    fn accepted_events_reach_the_sink() {
        let sink = Arc::new(MemorySink::new());
        let service = TelemetryService::new(sink.clone());
        assert!(service.record(feature_request()).accepted);
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn disabled_service_drops_events() {
        let sink = Arc::new(MemorySink::new());
        let service = TelemetryService::new(sink.clone()).with_enabled(false);
        assert!(!service.record(feature_request()).accepted);
        assert!(sink.is_empty());
    }

    #[test]
    fn sink_failure_is_absorbed() {
        let service = TelemetryService::new(Arc::new(BrokenSink));
        assert!(!service.record(feature_request()).accepted);
    }
}
