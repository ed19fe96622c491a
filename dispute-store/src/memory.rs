//! In-memory document store.
//!
//! Collections keep insertion order, which is what an unordered query
//! returns. Used by tests and by callers that do not need durability.

use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::trace;

use crate::{Document, DocumentStore, Query, StoreError, StoreResult, apply_patch, new_id};

#[derive(Debug, Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts (or replaces) a document under a caller-chosen id.
    pub async fn put(&self, collection: &str, id: &str, data: Value) {
        let mut guard = self.collections.write().await;
        let docs = guard.entry(collection.to_string()).or_default();
        let doc = Document {
            id: id.to_string(),
            data,
        };
        match docs.iter_mut().find(|d| d.id == id) {
            Some(slot) => *slot = doc,
            None => docs.push(doc),
        }
    }

    /// Snapshot of a whole collection in insertion order.
    pub async fn all(&self, collection: &str) -> Vec<Document> {
        self.collections
            .read()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }
}

impl DocumentStore for InMemoryStore {
    async fn query(&self, query: &Query) -> StoreResult<Vec<Document>> {
        let guard = self.collections.read().await;
        let docs = guard.get(&query.collection).cloned().unwrap_or_default();
        let hits = query.apply(docs);
        trace!(
            collection = %query.collection,
            field = %query.field,
            hits = hits.len(),
            "memory query"
        );
        Ok(hits)
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .cloned())
    }

    async fn insert(&self, collection: &str, data: Value) -> StoreResult<String> {
        if !data.is_object() {
            return Err(StoreError::InvalidDocument(format!(
                "{collection}: document body must be an object"
            )));
        }
        let id = new_id();
        let mut guard = self.collections.write().await;
        guard
            .entry(collection.to_string())
            .or_default()
            .push(Document {
                id: id.clone(),
                data,
            });
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> StoreResult<()> {
        let mut guard = self.collections.write().await;
        let doc = guard
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        apply_patch(&mut doc.data, patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn insert_query_update_roundtrip() {
        let store = InMemoryStore::new();
        let id = store
            .insert("disputes", json!({ "contactId": "c1", "status": "pending" }))
            .await
            .unwrap();
        store
            .insert("disputes", json!({ "contactId": "c2", "status": "pending" }))
            .await
            .unwrap();

        let hits = store
            .query(&Query::new("disputes", "contactId", "c1"))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, id);

        store
            .update("disputes", &id, json!({ "status": "strategy_assigned", "disputeRound": 1 }))
            .await
            .unwrap();
        let doc = store.get("disputes", &id).await.unwrap().unwrap();
        assert_eq!(doc.str_field("status"), Some("strategy_assigned"));
        assert_eq!(doc.field("disputeRound"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn update_missing_document_is_not_found() {
        let store = InMemoryStore::new();
        let err = store
            .update("contacts", "nope", json!({ "x": 1 }))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn put_replaces_by_id() {
        let store = InMemoryStore::new();
        store.put("contacts", "c1", json!({ "firstName": "A" })).await;
        store.put("contacts", "c1", json!({ "firstName": "B" })).await;
        let all = store.all("contacts").await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].str_field("firstName"), Some("B"));
    }

    #[tokio::test]
    async fn rejects_non_object_bodies() {
        let store = InMemoryStore::new();
        assert!(store.insert("x", json!("text")).await.is_err());
    }
}
