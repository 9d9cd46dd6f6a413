// Database module
// Read-only similarity lookups against the LanceDB document collection

pub mod lancedb;

pub use self::lancedb::vector_store::VectorStore;
