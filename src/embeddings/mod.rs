//! Embeddings adapter.
//!
//! Forwards `embed` requests to the OpenAI embeddings endpoint with a fixed
//! model and re-wraps the vectors as `{"embeddings": [...]}`.

mod client;
mod types;

pub use client::{EmbeddingClient, EMBEDDING_MODEL};
pub use types::{Embedding, EmbeddingInput, EmbeddingRequest, EmbeddingResponse, EmbeddingUsage};
