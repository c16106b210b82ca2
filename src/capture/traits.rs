//! Capture trait definitions
//!
//! Platform-agnostic capabilities the recorder is built on: a mixing graph
//! that combines input streams into one destination, and a streaming encoder
//! bound to that destination.

use crate::recorder::config::EncoderOptions;
use crate::utils::error::RecorderResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Callback invoked by an encoder for every data fragment it emits.
///
/// Registered once when the encoder is created and kept for the encoder's
/// whole lifetime. Fragments must be delivered in emission order.
pub type ChunkHandler = Box<dyn FnMut(Vec<u8>) + Send>;

/// State reported by a platform encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncoderState {
    /// Not capturing
    Inactive,
    /// Capturing and emitting data
    Recording,
}

/// A node feeding one input stream into a mixing destination
pub trait SourceNode<D>: Send {
    /// Connect this node's output into the destination
    fn connect(&mut self, destination: &D) -> RecorderResult<()>;

    /// Disconnect this node from wherever it is connected
    fn disconnect(&mut self);
}

/// A streaming media encoder
pub trait MediaEncoder: Send {
    /// Begin capturing
    fn start(&mut self) -> RecorderResult<()>;

    /// Stop capturing. Any buffered data is delivered to the chunk handler,
    /// possibly after this call returns.
    fn stop(&mut self) -> RecorderResult<()>;

    /// Current encoder state
    fn state(&self) -> EncoderState;
}

/// Capability provider for audio mixing and encoding.
///
/// Passed to the recorder at construction so backends can be swapped, e.g.
/// for the in-memory platform in tests.
pub trait AudioPlatform {
    /// Input stream handle supplied by callers
    type Stream: fmt::Debug;

    /// Shared mixing destination
    type Destination: Send;

    /// Per-stream source node
    type Source: SourceNode<Self::Destination>;

    /// Encoder bound to a destination's mixed output
    type Encoder: MediaEncoder;

    /// Create the mixing destination
    fn create_destination(&self) -> Self::Destination;

    /// Whether the handle is a usable input stream
    fn is_stream(&self, stream: &Self::Stream) -> bool;

    /// Create an unconnected source node for a stream
    fn create_source(&self, stream: &Self::Stream) -> RecorderResult<Self::Source>;

    /// Create an encoder over the destination's output
    fn create_encoder(
        &self,
        destination: &Self::Destination,
        options: &EncoderOptions,
        on_data: ChunkHandler,
    ) -> RecorderResult<Self::Encoder>;
}
