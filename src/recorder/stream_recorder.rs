//! Stream recorder
//!
//! Mixes the audio streams of a call through the platform's mixing graph and
//! records the mix with a lazily created platform encoder.

use super::blob::Blob;
use super::config::RecorderConfig;
use super::state::{RecorderEvent, RecorderState, RecordingSession};
use crate::capture::traits::{AudioPlatform, ChunkHandler, EncoderState, MediaEncoder, SourceNode};
use crate::utils::error::{RecorderError, RecorderResult};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Records one or more input streams into a single encoded output
///
/// The mixing destination lives as long as the recorder. The encoder is
/// created on the first [`start`](Self::start) and dropped whenever the
/// streams are replaced. Recorded chunks are kept for the recorder's whole
/// lifetime, across stop/start cycles and stream swaps.
pub struct StreamRecorder<P: AudioPlatform> {
    /// Mixing and encoding capabilities
    platform: P,

    /// Normalized configuration
    config: RecorderConfig,

    /// Shared mixing destination
    destination: P::Destination,

    /// One source node per registered stream
    sources: Vec<P::Source>,

    /// Encoder bound to the destination, if created
    encoder: Option<P::Encoder>,

    /// Number of encoders created so far
    generation: u64,

    /// Chunks emitted by every encoder, in emission order
    chunks: Arc<Mutex<Vec<Vec<u8>>>>,

    /// Recording sessions (one per start/stop cycle)
    sessions: Vec<RecordingSession>,

    /// Event broadcaster
    event_tx: broadcast::Sender<RecorderEvent>,
}

impl<P: AudioPlatform> StreamRecorder<P> {
    /// Create a recorder with no streams
    pub fn new(platform: P, config: RecorderConfig) -> Self {
        let config = config.normalized();
        let destination = platform.create_destination();
        let (event_tx, _) = broadcast::channel(100);

        tracing::debug!(
            "Created recorder ({} @ {}bps)",
            config.mime_type,
            config.audio_bits_per_second
        );

        Self {
            platform,
            config,
            destination,
            sources: Vec::new(),
            encoder: None,
            generation: 0,
            chunks: Arc::new(Mutex::new(Vec::new())),
            sessions: Vec::new(),
            event_tx,
        }
    }

    /// Create a recorder and start recording the given streams right away
    pub fn with_streams(
        platform: P,
        config: RecorderConfig,
        streams: &[P::Stream],
    ) -> RecorderResult<Self> {
        let mut recorder = Self::new(platform, config);
        if !streams.is_empty() {
            recorder.set_streams(streams)?;
        }
        Ok(recorder)
    }

    /// Replace the current streams with new ones
    ///
    /// An active recording is stopped and its encoder dropped. If any streams
    /// are given, recording starts again immediately with a fresh encoder.
    /// Streams are wired in order; the first invalid one aborts the call and
    /// leaves the streams before it connected.
    pub fn set_streams(&mut self, streams: &[P::Stream]) -> RecorderResult<()> {
        self.clear_streams()?;

        for stream in streams {
            if !self.platform.is_stream(stream) {
                tracing::warn!("Rejected stream: {:?}", stream);
                return Err(RecorderError::InvalidStream(format!("{:?}", stream)));
            }

            let mut source = self.platform.create_source(stream)?;
            source.connect(&self.destination)?;
            self.sources.push(source);
            tracing::debug!("Connected stream {:?}", stream);
        }

        let _ = self.event_tx.send(RecorderEvent::StreamsReplaced {
            count: self.sources.len(),
        });

        if !streams.is_empty() {
            self.start()?;
        }

        Ok(())
    }

    /// Start or resume recording
    pub fn start(&mut self) -> RecorderResult<()> {
        if self.sources.is_empty() {
            tracing::warn!("Cannot start recording without streams");
            return Err(RecorderError::NoStreams);
        }

        let encoder = match self.encoder.take() {
            Some(encoder) => encoder,
            None => self.create_encoder()?,
        };
        let encoder = self.encoder.insert(encoder);

        if encoder.state() == EncoderState::Recording {
            tracing::warn!("Start requested while already recording");
            return Err(RecorderError::AlreadyRecording);
        }

        encoder.start()?;

        self.sessions
            .push(RecordingSession::new(self.sessions.len(), self.generation));
        let _ = self.event_tx.send(RecorderEvent::Started {
            generation: self.generation,
        });

        tracing::info!(
            "Recording started ({} streams, encoder #{})",
            self.sources.len(),
            self.generation
        );
        Ok(())
    }

    /// Stop recording
    ///
    /// With `return_output` set, also returns the output recorded so far.
    /// The encoder may deliver its last chunk after this returns.
    pub fn stop(&mut self, return_output: bool) -> RecorderResult<Option<Blob>> {
        self.stop_encoder()?;
        Ok(return_output.then(|| self.output()))
    }

    /// Everything recorded so far as a single blob
    ///
    /// Available at any time. While recording, this is a best-effort snapshot
    /// of the chunks the encoder has flushed; flush timing is up to the
    /// platform.
    pub fn output(&self) -> Blob {
        let chunks = self.chunks.lock();
        Blob::from_chunks(chunks.as_slice(), self.config.output_type())
    }

    /// Whether the encoder exists and is capturing
    pub fn is_recording(&self) -> bool {
        self.encoder
            .as_ref()
            .is_some_and(|encoder| encoder.state() == EncoderState::Recording)
    }

    /// Current state of the recorder
    pub fn state(&self) -> RecorderState {
        match &self.encoder {
            None => RecorderState::NoEncoder,
            Some(encoder) if encoder.state() == EncoderState::Recording => {
                RecorderState::Recording
            }
            Some(_) => RecorderState::Idle,
        }
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn destination(&self) -> &P::Destination {
        &self.destination
    }

    /// Number of streams currently wired into the mix
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Number of chunks recorded over the recorder's lifetime
    pub fn chunk_count(&self) -> usize {
        self.chunks.lock().len()
    }

    /// Number of encoders created so far
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Recording sessions, oldest first
    pub fn sessions(&self) -> &[RecordingSession] {
        &self.sessions
    }

    /// Subscribe to recorder events
    pub fn subscribe(&self) -> broadcast::Receiver<RecorderEvent> {
        self.event_tx.subscribe()
    }

    fn create_encoder(&mut self) -> RecorderResult<P::Encoder> {
        let chunks = Arc::clone(&self.chunks);
        let events = self.event_tx.clone();
        let on_data: ChunkHandler = Box::new(move |data: Vec<u8>| {
            let size = data.len();
            chunks.lock().push(data);
            tracing::debug!("Recorded chunk of {} bytes", size);
            let _ = events.send(RecorderEvent::ChunkRecorded { size });
        });

        let encoder = self.platform.create_encoder(
            &self.destination,
            &self.config.encoder_options(),
            on_data,
        )?;
        self.generation += 1;

        tracing::debug!("Created encoder #{}", self.generation);
        Ok(encoder)
    }

    fn stop_encoder(&mut self) -> RecorderResult<()> {
        let encoder = match self.encoder.as_mut() {
            Some(encoder) if encoder.state() != EncoderState::Inactive => encoder,
            _ => {
                tracing::warn!("Stop requested while not recording");
                return Err(RecorderError::NotRecording);
            }
        };

        encoder.stop()?;

        if let Some(session) = self.sessions.last_mut() {
            session.end();
        }
        let _ = self.event_tx.send(RecorderEvent::Stopped {
            generation: self.generation,
        });

        tracing::info!("Recording stopped (encoder #{})", self.generation);
        Ok(())
    }

    /// Stop and drop the encoder, then disconnect every source
    fn clear_streams(&mut self) -> RecorderResult<()> {
        if self.encoder.is_some() {
            if self.is_recording() {
                self.stop_encoder()?;
            }
            self.encoder = None;
            tracing::debug!("Dropped encoder #{}", self.generation);
        }

        for mut source in self.sources.drain(..) {
            source.disconnect();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::memory::{MemoryPlatform, MemoryStream};

    fn recorder() -> StreamRecorder<MemoryPlatform> {
        StreamRecorder::new(MemoryPlatform::new(), RecorderConfig::default())
    }

    #[test]
    fn test_output_before_any_stream_is_empty() {
        let recorder = recorder();
        let output = recorder.output();
        assert_eq!(output.size(), 0);
        assert_eq!(output.mime_type(), "audio/webm");
        assert_eq!(recorder.state(), RecorderState::NoEncoder);
    }

    #[test]
    fn test_misuse_is_rejected() {
        let mut recorder = recorder();

        assert!(matches!(recorder.stop(false), Err(RecorderError::NotRecording)));
        assert!(matches!(recorder.start(), Err(RecorderError::NoStreams)));
        assert!(matches!(
            recorder.set_streams(&[MemoryStream::ended("test")]),
            Err(RecorderError::InvalidStream(_))
        ));
        assert!(!recorder.is_recording());
        assert_eq!(recorder.output().size(), 0);
    }

    #[test]
    fn test_set_streams_starts_recording() {
        let mut recorder = recorder();
        recorder.set_streams(&[MemoryStream::new("mic")]).unwrap();

        assert!(recorder.is_recording());
        assert_eq!(recorder.state(), RecorderState::Recording);
        assert_eq!(recorder.source_count(), 1);
        assert_eq!(recorder.generation(), 1);
    }

    #[test]
    fn test_second_start_fails_without_state_change() {
        let mut recorder = recorder();
        recorder.set_streams(&[MemoryStream::new("mic")]).unwrap();

        assert!(matches!(recorder.start(), Err(RecorderError::AlreadyRecording)));
        assert!(recorder.is_recording());
        assert_eq!(recorder.sessions().len(), 1);
        assert_eq!(recorder.generation(), 1);
    }

    #[test]
    fn test_stop_and_resume_reuses_encoder() {
        let mut recorder = recorder();
        recorder.set_streams(&[MemoryStream::new("mic")]).unwrap();

        assert!(recorder.stop(false).unwrap().is_none());
        assert_eq!(recorder.state(), RecorderState::Idle);
        assert!(matches!(recorder.stop(false), Err(RecorderError::NotRecording)));

        recorder.start().unwrap();
        assert!(recorder.is_recording());
        assert_eq!(recorder.generation(), 1);
        assert_eq!(recorder.sessions().len(), 2);
        assert!(!recorder.sessions()[0].is_open());
        assert!(recorder.sessions()[1].is_open());
    }

    #[test]
    fn test_stop_with_output_returns_blob() {
        let mut recorder = recorder();
        recorder.set_streams(&[MemoryStream::new("mic")]).unwrap();

        let output = recorder.stop(true).unwrap().unwrap();
        assert_eq!(output.mime_type(), "audio/webm");
        assert!(output.size() > 0);
    }

    #[test]
    fn test_set_streams_replaces_sources_and_encoder() {
        let platform = MemoryPlatform::new();
        let mut recorder = StreamRecorder::new(platform.clone(), RecorderConfig::default());

        recorder
            .set_streams(&[MemoryStream::new("a"), MemoryStream::new("b")])
            .unwrap();
        assert_eq!(recorder.destination().connected_labels(), vec!["a", "b"]);

        recorder.set_streams(&[MemoryStream::new("c")]).unwrap();
        assert_eq!(recorder.destination().connected_labels(), vec!["c"]);
        assert_eq!(recorder.source_count(), 1);
        assert_eq!(recorder.generation(), 2);
        assert_eq!(platform.live_encoders(), 1);
        assert!(recorder.is_recording());
    }

    #[test]
    fn test_set_streams_with_no_streams_clears() {
        let mut recorder = recorder();
        recorder.set_streams(&[MemoryStream::new("mic")]).unwrap();

        recorder.set_streams(&[]).unwrap();
        assert_eq!(recorder.state(), RecorderState::NoEncoder);
        assert_eq!(recorder.source_count(), 0);
        assert_eq!(recorder.destination().connection_count(), 0);
        assert!(matches!(recorder.start(), Err(RecorderError::NoStreams)));
    }

    #[test]
    fn test_invalid_stream_keeps_earlier_streams_wired() {
        let mut recorder = recorder();
        let result = recorder.set_streams(&[
            MemoryStream::new("first"),
            MemoryStream::ended("second"),
            MemoryStream::new("third"),
        ]);

        match result {
            Err(RecorderError::InvalidStream(name)) => assert!(name.contains("second")),
            other => panic!("Expected InvalidStream, got {:?}", other.map(|_| ())),
        }
        assert_eq!(recorder.source_count(), 1);
        assert_eq!(recorder.destination().connected_labels(), vec!["first"]);
        assert!(!recorder.is_recording());

        // The wired stream can still be recorded explicitly
        recorder.start().unwrap();
        assert!(recorder.is_recording());
    }

    #[test]
    fn test_encoder_creation_failure_leaves_no_encoder() {
        let mut recorder = StreamRecorder::new(
            MemoryPlatform::new().with_encoder_creation_failure(),
            RecorderConfig::default(),
        );

        let result = recorder.set_streams(&[MemoryStream::new("mic")]);
        assert!(matches!(result, Err(RecorderError::Platform(_))));
        assert_eq!(recorder.state(), RecorderState::NoEncoder);
        assert_eq!(recorder.generation(), 0);
    }

    #[test]
    fn test_encoder_start_failure_keeps_idle_encoder() {
        let mut recorder = StreamRecorder::new(
            MemoryPlatform::new().with_encoder_start_failure(),
            RecorderConfig::default(),
        );

        let result = recorder.set_streams(&[MemoryStream::new("mic")]);
        assert!(matches!(result, Err(RecorderError::Platform(_))));
        assert_eq!(recorder.state(), RecorderState::Idle);
        assert!(recorder.sessions().is_empty());
    }

    #[test]
    fn test_events_follow_lifecycle() {
        let mut recorder = recorder();
        let mut events = recorder.subscribe();

        recorder.set_streams(&[MemoryStream::new("mic")]).unwrap();
        recorder.stop(false).unwrap();

        assert_eq!(
            events.try_recv().unwrap(),
            RecorderEvent::StreamsReplaced { count: 1 }
        );
        assert_eq!(events.try_recv().unwrap(), RecorderEvent::Started { generation: 1 });
        assert!(matches!(
            events.try_recv().unwrap(),
            RecorderEvent::ChunkRecorded { size } if size > 0
        ));
        assert_eq!(events.try_recv().unwrap(), RecorderEvent::Stopped { generation: 1 });
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_output_uses_configured_output_type() {
        let mut recorder = StreamRecorder::new(
            MemoryPlatform::new(),
            RecorderConfig::with_mime_type("audio/ogg;codecs=opus"),
        );
        recorder.set_streams(&[MemoryStream::new("mic")]).unwrap();

        let output = recorder.stop(true).unwrap().unwrap();
        assert_eq!(output.mime_type(), "audio/ogg");
        assert!(String::from_utf8_lossy(output.as_bytes()).starts_with("audio/ogg;codecs=opus"));
    }
}
