pub mod memory;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod store;

pub use memory::MemoryStore;
pub use postgres::PgDocumentStore;
pub use repository::Repository;
pub use store::{filter, DatabaseError, Document, DocumentStore, Filter, ID_FIELD};
