pub mod text;

// Re-export the main chunking entry points for external use
pub use text::{ChunkError, Chunker, ChunkerConfig, TextChunk, chunk};
