pub mod chunking;
pub mod transcript;
