//! Recording state management
//!
//! Defines the recorder state machine, session tracking and lifecycle events.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Current state of a stream recorder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecorderState {
    /// No encoder exists; one is created on the next start
    #[default]
    NoEncoder,
    /// Encoder exists but is inactive
    Idle,
    /// Encoder is capturing
    Recording,
}

/// One start-to-stop interval of an encoder
///
/// A new session is created each time recording is started or resumed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingSession {
    /// Session index (0, 1, 2, ...) over the recorder's lifetime
    pub index: usize,

    /// Encoder generation the session was recorded with
    pub generation: u64,

    /// Unix timestamp when the session started
    pub unix_start_ms: u64,

    /// Unix timestamp when the session ended, if it has
    pub unix_end_ms: Option<u64>,
}

impl RecordingSession {
    /// Create a new session starting now
    pub fn new(index: usize, generation: u64) -> Self {
        Self {
            index,
            generation,
            unix_start_ms: now_ms(),
            unix_end_ms: None,
        }
    }

    /// End the session
    pub fn end(&mut self) {
        self.unix_end_ms = Some(now_ms());
    }

    pub fn is_open(&self) -> bool {
        self.unix_end_ms.is_none()
    }

    /// Duration in milliseconds, up to now for an open session
    pub fn duration_ms(&self) -> u64 {
        self.unix_end_ms
            .unwrap_or_else(now_ms)
            .saturating_sub(self.unix_start_ms)
    }
}

fn now_ms() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

/// Events emitted by a recorder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderEvent {
    /// Input streams were replaced
    StreamsReplaced { count: usize },
    /// Encoder started capturing
    Started { generation: u64 },
    /// Encoder stopped capturing
    Stopped { generation: u64 },
    /// Encoder delivered a chunk of the given size in bytes
    ChunkRecorded { size: usize },
}
