use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::{matches, DatabaseError, DeleteResult, Document, DocumentStore, Filter, UpdateResult, ID_FIELD};

/// In-process document store used for development and tests.
///
/// Collections keep insertion order. Unique indexes reject inserts and updates that would
/// leave two documents in a collection sharing a value for the indexed field.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    unique: Vec<(String, String)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unique_index(mut self, collection: &str, field: &str) -> Self {
        self.unique.push((collection.to_string(), field.to_string()));
        self
    }

    fn check_unique(&self, collection: &str, docs: &[Document], candidate: &Document, skip: Option<usize>) -> Result<(), DatabaseError> {
        for (_, field) in self.unique.iter().filter(|(c, _)| c == collection) {
            let Some(value) = candidate.get(field) else { continue };
            let clash = docs
                .iter()
                .enumerate()
                .any(|(i, doc)| Some(i) != skip && doc.get(field) == Some(value));
            if clash {
                return Err(DatabaseError::Duplicate(field.clone()));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>, DatabaseError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| matches(doc, filter)))
            .cloned())
    }

    async fn find_many(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, DatabaseError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| docs.iter().filter(|doc| matches(doc, filter)).cloned().collect())
            .unwrap_or_default())
    }

    async fn insert_one(&self, collection: &str, mut document: Document) -> Result<Uuid, DatabaseError> {
        let id = Uuid::new_v4();
        document.insert(ID_FIELD.to_string(), Value::String(id.to_string()));

        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        self.check_unique(collection, docs, &document, None)?;
        docs.push(document);
        Ok(id)
    }

    async fn update_one(&self, collection: &str, filter: &Filter, changes: Document) -> Result<UpdateResult, DatabaseError> {
        if changes.contains_key(ID_FIELD) {
            return Err(DatabaseError::InvalidDocument(format!("'{}' cannot be updated", ID_FIELD)));
        }

        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(UpdateResult::default());
        };
        let Some(index) = docs.iter().position(|doc| matches(doc, filter)) else {
            return Ok(UpdateResult::default());
        };

        let mut updated = docs[index].clone();
        updated.extend(changes);
        self.check_unique(collection, docs, &updated, Some(index))?;
        docs[index] = updated;
        Ok(UpdateResult { matched_count: 1 })
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<DeleteResult, DatabaseError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(DeleteResult::default());
        };
        match docs.iter().position(|doc| matches(doc, filter)) {
            Some(index) => {
                docs.remove(index);
                Ok(DeleteResult { deleted_count: 1 })
            }
            None => Ok(DeleteResult::default()),
        }
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::store::filter;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn insert_assigns_fresh_id() {
        let store = MemoryStore::new();
        let id = store.insert_one("plans", doc(json!({"_id": "spoofed", "name": "A"}))).await.unwrap();

        let found = store
            .find_one("plans", &filter([(ID_FIELD, json!(id.to_string()))]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found["name"], "A");
        assert!(store.find_one("plans", &filter([(ID_FIELD, json!("spoofed"))])).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unique_index_rejects_duplicates() {
        let store = MemoryStore::new().with_unique_index("users", "username");
        store.insert_one("users", doc(json!({"username": "alice"}))).await.unwrap();

        let err = store.insert_one("users", doc(json!({"username": "alice"}))).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Duplicate(field) if field == "username"));

        // Other collections are unaffected
        store.insert_one("plans", doc(json!({"username": "alice"}))).await.unwrap();
    }

    #[tokio::test]
    async fn update_merges_only_given_fields() {
        let store = MemoryStore::new();
        let id = store
            .insert_one("plans", doc(json!({"name": "A", "walls": [1, 2]})))
            .await
            .unwrap();
        let by_id = filter([(ID_FIELD, json!(id.to_string()))]);

        let result = store.update_one("plans", &by_id, doc(json!({"name": "B"}))).await.unwrap();
        assert_eq!(result.matched_count, 1);

        let found = store.find_one("plans", &by_id).await.unwrap().unwrap();
        assert_eq!(found["name"], "B");
        assert_eq!(found["walls"], json!([1, 2]));

        let miss = store
            .update_one("plans", &filter([(ID_FIELD, json!("nope"))]), doc(json!({"name": "C"})))
            .await
            .unwrap();
        assert_eq!(miss.matched_count, 0);
    }

    #[tokio::test]
    async fn update_cannot_touch_id() {
        let store = MemoryStore::new();
        let err = store
            .update_one("plans", &Filter::new(), doc(json!({"_id": "x"})))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidDocument(_)));
    }

    #[tokio::test]
    async fn delete_removes_single_match() {
        let store = MemoryStore::new();
        store.insert_one("plans", doc(json!({"owner": "a"}))).await.unwrap();
        store.insert_one("plans", doc(json!({"owner": "a"}))).await.unwrap();

        let owner = filter([("owner", json!("a"))]);
        assert_eq!(store.delete_one("plans", &owner).await.unwrap().deleted_count, 1);
        assert_eq!(store.find_many("plans", &owner).await.unwrap().len(), 1);
        assert_eq!(store.delete_one("missing", &owner).await.unwrap().deleted_count, 0);
    }
}
