//! Embedding types and data structures.

use serde::{Deserialize, Serialize};

/// A single embedding vector with its position in the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub index: usize,
    #[serde(rename = "embedding")]
    pub vector: Vec<f64>,
}

impl Embedding {
    pub fn new(index: usize, vector: Vec<f64>) -> Self {
        Self { index, vector }
    }

    pub fn dimensions(&self) -> usize {
        self.vector.len()
    }
}

/// Text to embed: one string or a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmbeddingInput {
    Single(String),
    Batch(Vec<String>),
}

impl EmbeddingInput {
    pub fn len(&self) -> usize {
        match self {
            EmbeddingInput::Single(_) => 1,
            EmbeddingInput::Batch(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Body sent to the embeddings endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    pub input: EmbeddingInput,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// Embeddings endpoint response (the `data` list, model and usage).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    #[serde(rename = "data")]
    pub embeddings: Vec<Embedding>,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub usage: EmbeddingUsage,
}

impl EmbeddingResponse {
    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }

    /// Vectors in input order.
    pub fn vectors(&self) -> Vec<Vec<f64>> {
        let mut sorted: Vec<&Embedding> = self.embeddings.iter().collect();
        sorted.sort_by_key(|e| e.index);
        sorted.into_iter().map(|e| e.vector.clone()).collect()
    }

    /// The relay's response shape: `{"embeddings": [[...], ...]}`.
    pub fn into_envelope(self) -> serde_json::Value {
        serde_json::json!({ "embeddings": self.vectors() })
    }
}
