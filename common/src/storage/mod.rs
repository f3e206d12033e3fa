pub mod index_store;
pub mod store;
pub mod types;
