// LanceDB vector database module
// Holds the document collection and answers similarity queries against it

pub mod vector_store;

/// Column holding the embedding of each document
pub const VECTOR_COLUMN: &str = "vector";
/// Column holding the document text
pub const DOCUMENT_COLUMN: &str = "document";
/// Column holding the caller-assigned document id
pub const ID_COLUMN: &str = "id";
/// Column LanceDB appends to vector search results
pub const DISTANCE_COLUMN: &str = "_distance";
