// Embeddings module
// Content chunking and the Ollama embedding client

pub mod chunking;
pub mod ollama;

pub use chunking::{Chunk, ChunkingConfig, make_chunks};
pub use ollama::{DEFAULT_EMBEDDING_DIMENSION, EmbeddedChunk, OllamaEmbedder};
