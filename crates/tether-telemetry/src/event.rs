//! Telemetry events reported by components.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a telemetry event reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    /// Usage of a named feature.
    Feature {
        /// Feature name.
        name: String,
        /// Free-form attributes.
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        attributes: BTreeMap<String, String>,
        /// How long the feature ran, in milliseconds.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_ms: Option<u64>,
    },
    /// An error the component chose to report.
    Error {
        /// Error message.
        message: String,
    },
}

/// A single usage or error record, tagged with its emitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    /// Emitting component.
    pub component: String,
    /// Declared version of the emitting component.
    pub version: String,
    /// When the host received the event.
    pub received_at: DateTime<Utc>,
    /// Payload.
    #[serde(flatten)]
    pub kind: EventKind,
}

impl TelemetryEvent {
    /// A feature event with no attributes or duration.
    #[must_use]
    pub fn feature(
        component: impl Into<String>,
        version: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            component: component.into(),
            version: version.into(),
            received_at: Utc::now(),
            kind: EventKind::Feature {
                name: name.into(),
                attributes: BTreeMap::new(),
                duration_ms: None,
            },
        }
    }

    /// An error event.
    #[must_use]
    pub fn error(
        component: impl Into<String>,
        version: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            component: component.into(),
            version: version.into(),
            received_at: Utc::now(),
            kind: EventKind::Error {
                message: message.into(),
            },
        }
    }

    /// Add attributes. No effect on error events.
    #[must_use]
    pub fn with_attributes(mut self, extra: BTreeMap<String, String>) -> Self {
        if let EventKind::Feature { attributes, .. } = &mut self.kind {
            attributes.extend(extra);
        }
        self
    }

    /// Set the duration. No effect on error events.
    #[must_use]
    pub fn with_duration_ms(mut self, ms: u64) -> Self {
        if let EventKind::Feature { duration_ms, .. } = &mut self.kind {
            *duration_ms = Some(ms);
        }
        self
    }

    /// Whether this is an error event.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self.kind, EventKind::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_builder_sets_fields() {
        let attrs = BTreeMap::from([("files".to_string(), "12".to_string())]);
        let event = TelemetryEvent::feature("iac", "1.0.0", "scan")
            .with_attributes(attrs.clone())
            .with_duration_ms(250);

        assert!(!event.is_error());
        assert_eq!(
            event.kind,
            EventKind::Feature {
                name: "scan".into(),
                attributes: attrs,
                duration_ms: Some(250),
            }
        );
    }

    #[test]
    fn error_event_ignores_feature_builders() {
        let event = TelemetryEvent::error("iac", "1.0.0", "boom").with_duration_ms(5);
        assert!(event.is_error());
        assert_eq!(
            event.kind,
            EventKind::Error {
                message: "boom".into()
            }
        );
    }

    #[test]
    fn serializes_flat_with_kind_tag() {
        let event = TelemetryEvent::feature("iac", "2.0.0", "scan");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "feature");
        assert_eq!(json["name"], "scan");
        assert_eq!(json["component"], "iac");
        assert!(json.get("attributes").is_none());
    }
}
