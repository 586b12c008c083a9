//! Lifecycle and progress events emitted by the install pipeline
//!
//! The host subscribes through an [`EventSink`] channel. Emission never
//! blocks and never fails the pipeline: a host that stops listening simply
//! stops receiving.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::trace;

/// Stages of an install attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateStage {
    Idle,
    Checking,
    Preparing,
    Downloading,
    Extracting,
    Finalizing,
    Installed,
    Failed,
}

impl UpdateStage {
    /// Whether the attempt has ended
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Installed | Self::Failed)
    }
}

impl fmt::Display for UpdateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Checking => "checking",
            Self::Preparing => "preparing",
            Self::Downloading => "downloading",
            Self::Extracting => "extracting",
            Self::Finalizing => "finalizing",
            Self::Installed => "installed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Stage a failure is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Cleaning,
    Download,
    Extraction,
    Config,
    Finalize,
}

/// Events consumed by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UpdateEvent {
    /// The orchestrator moved to a new stage
    StageChanged { from: UpdateStage, to: UpdateStage },

    /// The bundle was already installed at the expected version
    AlreadyInstalled { version: String },

    /// A fresh install is about to start
    WillDownload { version: String, url: String },

    /// Response headers arrived; `total_bytes` is 0 when unknown
    DownloadStarted { total_bytes: u64 },

    /// At least 1% of the declared length arrived since the last report
    DownloadProgressed { delta_bytes: u64 },

    /// A fresh install completed and validated
    Installed { version: String },

    /// The attempt failed
    InstallFailed { stage: FailureStage, message: String },
}

/// Event with delivery metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Position of the event within its sink, starting at 0
    pub sequence: u64,

    /// Emission time (UTC)
    pub timestamp: DateTime<Utc>,

    #[serde(flatten)]
    pub event: UpdateEvent,
}

/// Fire-and-forget event publisher
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<EventEnvelope>>,
    sequence: Arc<AtomicU64>,
}

impl EventSink {
    /// Create a sink and the receiver the host listens on
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<EventEnvelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = Self {
            tx: Some(tx),
            sequence: Arc::new(AtomicU64::new(0)),
        };
        (sink, rx)
    }

    /// A sink that discards every event
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Publish an event
    pub fn emit(&self, event: UpdateEvent) {
        let Some(tx) = &self.tx else {
            return;
        };

        trace!(?event, "emitting update event");
        let envelope = EventEnvelope {
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
            timestamp: Utc::now(),
            event,
        };
        // A closed receiver means the host stopped listening.
        let _ = tx.send(envelope);
    }
}
