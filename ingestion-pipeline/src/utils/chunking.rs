use common::error::AppError;
use text_splitter::{ChunkConfig, TextSplitter};

/// Split a transcript into overlapping chunks of at most `chunk_size` characters.
///
/// Whitespace-only input produces no chunks.
pub fn chunk_text(
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<String>, AppError> {
    if chunk_size == 0 {
        return Err(AppError::Validation(
            "chunk size must be greater than zero".into(),
        ));
    }

    if overlap >= chunk_size {
        return Err(AppError::Validation(format!(
            "chunk overlap {overlap} must be smaller than the chunk size {chunk_size}"
        )));
    }

    let chunk_config = ChunkConfig::new(chunk_size)
        .with_overlap(overlap)
        .map_err(|e| AppError::Validation(format!("invalid chunk overlap: {e}")))?;
    let splitter = TextSplitter::new(chunk_config);

    Ok(splitter.chunks(text).map(str::to_owned).collect())
}
