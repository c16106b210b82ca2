//! Recorder configuration
//!
//! Output format and bitrate settings, fixed once a recorder is constructed.

use crate::utils::error::RecorderResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default container/codec identifier handed to the encoder
pub const DEFAULT_MIME_TYPE: &str = "audio/webm";

/// Default encoder bitrate in bits per second
pub const DEFAULT_AUDIO_BITS_PER_SECOND: u32 = 128_000;

/// Configuration for a stream recorder
///
/// Missing, empty or zero values fall back to the defaults when the config is
/// normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecorderConfig {
    /// Container/codec identifier, e.g. `audio/webm;codecs=opus`
    pub mime_type: String,

    /// MIME type of the produced blob. Derived from `mime_type` when absent.
    pub output_type: Option<String>,

    /// Desired encoder bitrate
    pub audio_bits_per_second: u32,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            mime_type: DEFAULT_MIME_TYPE.to_string(),
            output_type: None,
            audio_bits_per_second: DEFAULT_AUDIO_BITS_PER_SECOND,
        }
    }
}

impl RecorderConfig {
    /// Create a config for the given container/codec identifier
    pub fn with_mime_type(mime_type: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            ..Self::default()
        }
    }

    /// Parse a config from JSON
    pub fn from_json_str(json: &str) -> RecorderResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.normalized())
    }

    /// Load a config from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> RecorderResult<Self> {
        let path = path.as_ref();
        tracing::debug!("Loading recorder config from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Fill in defaults and derive the output type
    pub fn normalized(mut self) -> Self {
        if self.mime_type.trim().is_empty() {
            self.mime_type = DEFAULT_MIME_TYPE.to_string();
        }
        if self.audio_bits_per_second == 0 {
            self.audio_bits_per_second = DEFAULT_AUDIO_BITS_PER_SECOND;
        }
        let output_type = match self.output_type.take() {
            Some(output_type) if !output_type.trim().is_empty() => output_type,
            _ => strip_parameters(&self.mime_type).to_string(),
        };
        self.output_type = Some(output_type);
        self
    }

    /// MIME type tagged on recorded output
    pub fn output_type(&self) -> &str {
        match self.output_type.as_deref() {
            Some(output_type) if !output_type.trim().is_empty() => output_type,
            _ => strip_parameters(&self.mime_type),
        }
    }

    /// Settings handed to the platform encoder
    pub fn encoder_options(&self) -> EncoderOptions {
        EncoderOptions {
            mime_type: self.mime_type.clone(),
            audio_bits_per_second: self.audio_bits_per_second,
        }
    }
}

/// Encoder settings derived from a [`RecorderConfig`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncoderOptions {
    pub mime_type: String,
    pub audio_bits_per_second: u32,
}

/// `audio/webm;codecs=opus` -> `audio/webm`
fn strip_parameters(mime_type: &str) -> &str {
    mime_type
        .split_once(';')
        .map_or(mime_type, |(base, _)| base)
        .trim()
}
