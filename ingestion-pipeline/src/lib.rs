#![allow(clippy::missing_docs_in_private_items, clippy::result_large_err)]

pub mod coordinator;
pub mod lock_registry;
pub mod memory_cache;
pub mod pipeline;
pub mod utils;

pub use coordinator::{IngestionCoordinator, IngestionSource};
pub use pipeline::{IndexBuilder, IngestionTuning};
pub use utils::transcript::{TranscriptSource, YoutubeTranscriptSource};
