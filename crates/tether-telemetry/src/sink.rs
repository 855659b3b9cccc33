//! Destinations for telemetry events.
//!
//! A sink consumes each event once. Forwarding to an external analytics
//! backend is out of scope here; the host ships with sinks that write to
//! the log, to a JSON-lines file, or to memory for tests.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::info;

use crate::error::{TelemetryError, TelemetryResult};
use crate::event::{EventKind, TelemetryEvent};

/// Consumer of telemetry events.
pub trait EventSink: Send + Sync + fmt::Debug {
    /// Record one event.
    ///
    /// # Errors
    ///
    /// Returns an error if the event could not be recorded. Callers log
    /// and drop such errors.
    fn record(&self, event: &TelemetryEvent) -> TelemetryResult<()>;
}

/// Records events as structured `tracing` events on `tether::telemetry`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: &TelemetryEvent) -> TelemetryResult<()> {
        match &event.kind {
            EventKind::Feature {
                name,
                attributes,
                duration_ms,
            } => info!(
                target: "tether::telemetry",
                component = %event.component,
                version = %event.version,
                feature = %name,
                attributes = ?attributes,
                duration_ms = ?duration_ms,
                "Feature event"
            ),
            EventKind::Error { message } => info!(
                target: "tether::telemetry",
                component = %event.component,
                version = %event.version,
                error = %message,
                "Error event"
            ),
        }
        Ok(())
    }
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<TelemetryEvent>>,
}

impl MemorySink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Number of events recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().map_or(0, |events| events.len())
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: &TelemetryEvent) -> TelemetryResult<()> {
        self.events
            .lock()
            .map_err(|e| TelemetryError::SinkError(e.to_string()))?
            .push(event.clone());
        Ok(())
    }
}

/// Appends events as JSON lines to a file.
pub struct JsonLinesSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl fmt::Debug for JsonLinesSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonLinesSink")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl JsonLinesSink {
    /// Open `path` for appending, creating it and its parent if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> TelemetryResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// The file being written.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSink for JsonLinesSink {
    fn record(&self, event: &TelemetryEvent) -> TelemetryResult<()> {
        let mut line =
            serde_json::to_vec(event).map_err(|e| TelemetryError::SinkError(e.to_string()))?;
        line.push(b'\n');
        let mut file = self
            .file
            .lock()
            .map_err(|e| TelemetryError::SinkError(e.to_string()))?;
        file.write_all(&line)?;
        Ok(())
    }
}
