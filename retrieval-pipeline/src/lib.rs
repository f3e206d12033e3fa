pub mod answer_retrieval;
pub mod scoring;

use common::storage::types::vector_index::IndexedChunk;

pub use answer_retrieval::{OpenAiQueryEngine, QueryEngine};
pub use scoring::search_index;

// Captures a transcript chunk plus its similarity to the question.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub chunk: IndexedChunk,
    pub score: f32,
}
