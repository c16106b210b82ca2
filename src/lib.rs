//! Call Recorder - record the audio of a live call.
//!
//! Mixes any number of input streams through a platform mixing graph and
//! records the mix with a platform encoder into a single blob.

pub mod capture;
pub mod recorder;
pub mod utils;

pub use capture::{AudioPlatform, MemoryPlatform, MemoryStream};
pub use recorder::{Blob, RecorderConfig, RecorderEvent, RecorderState, StreamRecorder};
pub use utils::error::{RecorderError, RecorderResult};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging
///
/// Honors `RUST_LOG`, defaulting to debug output for this crate. Does nothing
/// if a global subscriber is already installed.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "call_recorder=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
