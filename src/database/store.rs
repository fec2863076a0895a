use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

/// A stored document. Identifiers live under [`ID_FIELD`] as UUID strings.
pub type Document = Map<String, Value>;

/// Equality filter: every entry must match the document's field exactly.
pub type Filter = Map<String, Value>;

/// Field holding the store-generated identifier
pub const ID_FIELD: &str = "_id";

/// Errors from document store implementations
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Duplicate value for unique field: {0}")]
    Duplicate(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateResult {
    pub matched_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeleteResult {
    pub deleted_count: u64,
}

/// Collection-oriented persistence. Each operation is atomic for a single document.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>, DatabaseError>;

    /// Matching documents in store iteration order.
    async fn find_many(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, DatabaseError>;

    /// Insert a document and return its generated id. Any caller supplied `_id` is replaced.
    async fn insert_one(&self, collection: &str, document: Document) -> Result<Uuid, DatabaseError>;

    /// Merge `changes` into the first matching document.
    async fn update_one(&self, collection: &str, filter: &Filter, changes: Document) -> Result<UpdateResult, DatabaseError>;

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<DeleteResult, DatabaseError>;

    async fn ping(&self) -> Result<(), DatabaseError>;

    async fn close(&self) {}
}

/// Build a filter from field/value pairs
pub fn filter<const N: usize>(pairs: [(&str, Value); N]) -> Filter {
    pairs
        .into_iter()
        .map(|(field, value)| (field.to_string(), value))
        .collect()
}

/// True when every filter entry equals the document's value for that field
pub fn matches(document: &Document, filter: &Filter) -> bool {
    filter
        .iter()
        .all(|(field, expected)| document.get(field) == Some(expected))
}
