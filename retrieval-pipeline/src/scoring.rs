use std::cmp::Ordering;

use common::storage::types::vector_index::{IndexedChunk, VectorIndex};

use crate::RetrievedChunk;

pub const fn clamp_unit(value: f32) -> f32 {
    value.clamp(-1.0, 1.0)
}

/// Cosine similarity in `[-1, 1]`.
///
/// Vectors of different lengths, zero vectors and non-finite inputs score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot = x.mul_add(*y, dot);
        norm_a = x.mul_add(*x, norm_a);
        norm_b = y.mul_add(*y, norm_b);
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom <= f32::EPSILON || !denom.is_finite() || !dot.is_finite() {
        return 0.0;
    }

    clamp_unit(dot / denom)
}

fn by_score_desc(a: &RetrievedChunk, b: &RetrievedChunk) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.chunk.position.cmp(&b.chunk.position))
}

/// Rank every chunk of `index` against `query` and keep the best `top_k`.
///
/// Ties keep transcript order.
pub fn search_index(index: &VectorIndex, query: &[f32], top_k: usize) -> Vec<RetrievedChunk> {
    if top_k == 0 {
        return Vec::new();
    }

    if query.len() != index.dimension {
        tracing::warn!(
            video_id = %index.video_id,
            query_dimension = query.len(),
            index_dimension = index.dimension,
            "query embedding dimension does not match index"
        );
    }

    let mut ranked: Vec<RetrievedChunk> = index
        .chunks
        .iter()
        .map(|chunk: &IndexedChunk| RetrievedChunk {
            chunk: chunk.clone(),
            score: cosine_similarity(&chunk.embedding, query),
        })
        .collect();

    ranked.sort_by(by_score_desc);
    ranked.truncate(top_k);
    ranked
}
