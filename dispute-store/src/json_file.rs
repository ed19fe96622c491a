//! JSON-on-disk document store.
//!
//! Layout: `<root>/<collection>/<id>.json`, one pretty-printed object per
//! file. Queries scan the collection directory. Writes go through a temp
//! file and a rename, serialized by an in-process lock.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tokio::{fs, sync::Mutex};
use tracing::{debug, warn};

use crate::{Document, DocumentStore, Query, StoreError, StoreResult, apply_patch, new_id};

#[derive(Debug)]
pub struct JsonFileStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Inserts (or replaces) a document under a caller-chosen id.
    pub async fn put(&self, collection: &str, id: &str, data: &Value) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        self.write_doc(collection, id, data).await
    }

    fn collection_dir(&self, collection: &str) -> StoreResult<PathBuf> {
        check_segment(collection)?;
        Ok(self.root.join(collection))
    }

    fn doc_path(&self, collection: &str, id: &str) -> StoreResult<PathBuf> {
        check_segment(id)?;
        Ok(self.collection_dir(collection)?.join(format!("{id}.json")))
    }

    async fn read_doc(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let path = self.doc_path(collection, id)?;
        if !fs::try_exists(&path).await? {
            return Ok(None);
        }
        let bytes = fs::read(&path).await?;
        let data: Value = serde_json::from_slice(&bytes)?;
        Ok(Some(Document {
            id: id.to_string(),
            data,
        }))
    }

    async fn write_doc(&self, collection: &str, id: &str, data: &Value) -> StoreResult<()> {
        let path = self.doc_path(collection, id)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).await?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(data)?).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Loads every document of a collection, sorted by id for stable output.
    async fn scan(&self, collection: &str) -> StoreResult<Vec<Document>> {
        let dir = self.collection_dir(collection)?;
        if !fs::try_exists(&dir).await? {
            return Ok(Vec::new());
        }

        let mut out = Vec::new();
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let bytes = fs::read(&path).await?;
            match serde_json::from_slice::<Value>(&bytes) {
                Ok(data) => out.push(Document {
                    id: id.to_string(),
                    data,
                }),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable document"),
            }
        }
        out.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(out)
    }
}

/// Collection names and ids become path segments; keep them flat.
fn check_segment(s: &str) -> StoreResult<()> {
    let bad = s.is_empty()
        || s == "."
        || s == ".."
        || s.contains(['/', '\\'])
        || s.chars().any(char::is_control);
    if bad {
        return Err(StoreError::InvalidDocument(format!(
            "illegal path segment: {s:?}"
        )));
    }
    Ok(())
}

impl DocumentStore for JsonFileStore {
    async fn query(&self, query: &Query) -> StoreResult<Vec<Document>> {
        let docs = self.scan(&query.collection).await?;
        let hits = query.apply(docs);
        debug!(
            collection = %query.collection,
            field = %query.field,
            hits = hits.len(),
            "json store query"
        );
        Ok(hits)
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        self.read_doc(collection, id).await
    }

    async fn insert(&self, collection: &str, data: Value) -> StoreResult<String> {
        if !data.is_object() {
            return Err(StoreError::InvalidDocument(format!(
                "{collection}: document body must be an object"
            )));
        }
        let id = new_id();
        let _guard = self.write_lock.lock().await;
        self.write_doc(collection, &id, &data).await?;
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self
            .read_doc(collection, id)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        apply_patch(&mut doc.data, patch)?;
        self.write_doc(collection, id, &doc.data).await
    }
}
