//! Audio capture backends
//!
//! Capability traits for mixing and encoding, plus an in-process backend.

pub mod memory;
pub mod traits;

// Re-export traits
pub use traits::{AudioPlatform, ChunkHandler, EncoderState, MediaEncoder, SourceNode};

pub use memory::{MemoryDestination, MemoryEncoder, MemoryPlatform, MemorySource, MemoryStream};
