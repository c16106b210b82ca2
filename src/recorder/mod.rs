//! Recording system module
//!
//! This module implements call recording on top of the capture traits:
//! - RecorderConfig for output format and bitrate
//! - StreamRecorder to mix streams and drive the encoder
//! - Blob for the recorded output

pub mod blob;
pub mod config;
pub mod state;
pub mod stream_recorder;

pub use blob::Blob;
pub use config::{EncoderOptions, RecorderConfig};
pub use state::{RecorderEvent, RecorderState, RecordingSession};
pub use stream_recorder::StreamRecorder;
