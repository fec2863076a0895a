use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use uuid::Uuid;

use super::store::{DatabaseError, DeleteResult, Document, DocumentStore, Filter, UpdateResult};

/// Typed access to one collection of a [`DocumentStore`].
pub struct Repository<T> {
    collection: &'static str,
    store: Arc<dyn DocumentStore>,
    _phantom: PhantomData<fn() -> T>,
}

impl<T> Repository<T>
where
    T: DeserializeOwned,
{
    pub fn new(collection: &'static str, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            collection,
            store,
            _phantom: PhantomData,
        }
    }

    pub async fn select_one(&self, filter: &Filter) -> Result<Option<T>, DatabaseError> {
        self.store
            .find_one(self.collection, filter)
            .await?
            .map(from_document)
            .transpose()
    }

    pub async fn select_any(&self, filter: &Filter) -> Result<Vec<T>, DatabaseError> {
        self.store
            .find_many(self.collection, filter)
            .await?
            .into_iter()
            .map(from_document)
            .collect()
    }

    pub async fn insert<R: Serialize>(&self, record: &R) -> Result<Uuid, DatabaseError> {
        let document = to_document(record)?;
        self.store.insert_one(self.collection, document).await
    }

    pub async fn update(&self, filter: &Filter, changes: Document) -> Result<UpdateResult, DatabaseError> {
        self.store.update_one(self.collection, filter, changes).await
    }

    pub async fn delete(&self, filter: &Filter) -> Result<DeleteResult, DatabaseError> {
        self.store.delete_one(self.collection, filter).await
    }
}

fn from_document<T: DeserializeOwned>(document: Document) -> Result<T, DatabaseError> {
    Ok(serde_json::from_value(Value::Object(document))?)
}

pub fn to_document<R: Serialize>(record: &R) -> Result<Document, DatabaseError> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        other => Err(DatabaseError::InvalidDocument(format!(
            "expected a JSON object, got {}",
            other
        ))),
    }
}
