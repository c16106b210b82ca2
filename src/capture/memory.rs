//! In-process audio platform
//!
//! A deterministic backend for the capture traits. Streams are labelled
//! handles, the destination tracks which labels are connected, and the
//! encoder emits one textual frame per flush describing what it would have
//! encoded. Time is driven explicitly through [`MemoryPlatform::tick`].

use super::traits::{AudioPlatform, ChunkHandler, EncoderState, MediaEncoder, SourceNode};
use crate::recorder::config::EncoderOptions;
use crate::utils::error::{RecorderError, RecorderResult};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use uuid::Uuid;

/// Input stream handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryStream {
    label: String,
    active: bool,
}

impl MemoryStream {
    /// A live stream
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            active: true,
        }
    }

    /// A stream whose tracks have ended. Rejected by the platform.
    pub fn ended(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            active: false,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

/// Mixing destination shared by all source nodes
#[derive(Debug, Clone, Default)]
pub struct MemoryDestination {
    connections: Arc<Mutex<Vec<(Uuid, String)>>>,
}

impl MemoryDestination {
    /// Labels of the streams currently feeding the mix, in connection order
    pub fn connected_labels(&self) -> Vec<String> {
        self.connections
            .lock()
            .iter()
            .map(|(_, label)| label.clone())
            .collect()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }
}

/// Source node wrapping one stream
#[derive(Debug)]
pub struct MemorySource {
    id: Uuid,
    label: String,
    destination: Option<MemoryDestination>,
}

impl MemorySource {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_connected(&self) -> bool {
        self.destination.is_some()
    }
}

impl SourceNode<MemoryDestination> for MemorySource {
    fn connect(&mut self, destination: &MemoryDestination) -> RecorderResult<()> {
        self.disconnect();
        destination
            .connections
            .lock()
            .push((self.id, self.label.clone()));
        self.destination = Some(destination.clone());
        Ok(())
    }

    fn disconnect(&mut self) {
        if let Some(destination) = self.destination.take() {
            destination.connections.lock().retain(|(id, _)| *id != self.id);
        }
    }
}

impl Drop for MemorySource {
    fn drop(&mut self) {
        self.disconnect();
    }
}

struct EncoderCore {
    destination: MemoryDestination,
    options: EncoderOptions,
    on_data: ChunkHandler,
    state: EncoderState,
    frames: u64,
}

impl EncoderCore {
    /// Emit one frame if recording. Returns whether a frame was emitted.
    fn flush(&mut self) -> bool {
        if self.state != EncoderState::Recording {
            return false;
        }

        let labels = self.destination.connected_labels();
        let mix = if labels.is_empty() {
            "silence".to_string()
        } else {
            labels.join("+")
        };
        let frame = format!(
            "{} {}bps #{}: {}\n",
            self.options.mime_type, self.options.audio_bits_per_second, self.frames, mix
        );
        self.frames += 1;
        (self.on_data)(frame.into_bytes());
        true
    }
}

/// Encoder bound to a [`MemoryDestination`]
pub struct MemoryEncoder {
    core: Arc<Mutex<EncoderCore>>,
    fail_start: bool,
}

impl MemoryEncoder {
    /// Emit a frame now, as a platform encoder would on its own timeslice
    pub fn flush(&self) -> bool {
        self.core.lock().flush()
    }

    /// Number of frames emitted so far
    pub fn frames(&self) -> u64 {
        self.core.lock().frames
    }
}

impl MediaEncoder for MemoryEncoder {
    fn start(&mut self) -> RecorderResult<()> {
        if self.fail_start {
            return Err(RecorderError::Platform("encoder failed to start".to_string()));
        }
        let mut core = self.core.lock();
        if core.state == EncoderState::Recording {
            return Err(RecorderError::Platform("encoder is already recording".to_string()));
        }
        core.state = EncoderState::Recording;
        Ok(())
    }

    fn stop(&mut self) -> RecorderResult<()> {
        let mut core = self.core.lock();
        if core.state == EncoderState::Inactive {
            return Err(RecorderError::Platform("encoder is inactive".to_string()));
        }
        // Final buffered data is delivered on stop
        core.flush();
        core.state = EncoderState::Inactive;
        Ok(())
    }

    fn state(&self) -> EncoderState {
        self.core.lock().state
    }
}

/// Deterministic [`AudioPlatform`]
///
/// Cloning shares the registry of live encoders, so a test can keep a clone
/// and drive encoders owned by a recorder.
#[derive(Clone, Default)]
pub struct MemoryPlatform {
    encoders: Arc<Mutex<Vec<Weak<Mutex<EncoderCore>>>>>,
    fail_encoder_creation: bool,
    fail_encoder_start: bool,
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the platform to refuse creating encoders
    pub fn with_encoder_creation_failure(mut self) -> Self {
        self.fail_encoder_creation = true;
        self
    }

    /// Configure created encoders to fail on start
    pub fn with_encoder_start_failure(mut self) -> Self {
        self.fail_encoder_start = true;
        self
    }

    /// Let time pass: every recording encoder emits one frame.
    ///
    /// Returns the number of frames emitted.
    pub fn tick(&self) -> usize {
        self.live_cores()
            .iter()
            .filter(|core| core.lock().flush())
            .count()
    }

    /// Number of encoders that have not been dropped
    pub fn live_encoders(&self) -> usize {
        self.live_cores().len()
    }

    fn live_cores(&self) -> Vec<Arc<Mutex<EncoderCore>>> {
        let mut encoders = self.encoders.lock();
        encoders.retain(|weak| weak.strong_count() > 0);
        encoders.iter().filter_map(Weak::upgrade).collect()
    }
}

impl AudioPlatform for MemoryPlatform {
    type Stream = MemoryStream;
    type Destination = MemoryDestination;
    type Source = MemorySource;
    type Encoder = MemoryEncoder;

    fn create_destination(&self) -> MemoryDestination {
        MemoryDestination::default()
    }

    fn is_stream(&self, stream: &MemoryStream) -> bool {
        stream.active
    }

    fn create_source(&self, stream: &MemoryStream) -> RecorderResult<MemorySource> {
        Ok(MemorySource {
            id: Uuid::new_v4(),
            label: stream.label.clone(),
            destination: None,
        })
    }

    fn create_encoder(
        &self,
        destination: &MemoryDestination,
        options: &EncoderOptions,
        on_data: ChunkHandler,
    ) -> RecorderResult<MemoryEncoder> {
        if self.fail_encoder_creation {
            return Err(RecorderError::Platform(format!(
                "unsupported encoder configuration: {}",
                options.mime_type
            )));
        }

        let core = Arc::new(Mutex::new(EncoderCore {
            destination: destination.clone(),
            options: options.clone(),
            on_data,
            state: EncoderState::Inactive,
            frames: 0,
        }));
        self.encoders.lock().push(Arc::downgrade(&core));

        Ok(MemoryEncoder {
            core,
            fail_start: self.fail_encoder_start,
        })
    }
}
