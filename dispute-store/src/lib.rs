//! Persistence contracts for the dispute pipeline.
//!
//! The engine only needs four document operations (query by field, read by
//! id, insert, patch) and one blob operation (download). Both contracts are
//! traits returning `impl Future + Send`, so callers stay generic and tests
//! can run against [`InMemoryStore`].
//!
//! Documents are plain `serde_json::Value` objects. Patches are objects whose
//! keys may be dotted paths (`disputes.itemCount`) addressing nested fields.

use std::{cmp::Ordering, future::Future, sync::Arc};

use serde_json::{Map, Value};

pub mod blob;
pub mod errors;
pub mod json_file;
pub mod memory;

pub use blob::{BlobStore, LocalBlobStore, blob_path_from_url};
pub use errors::{StoreError, StoreResult};
pub use json_file::JsonFileStore;
pub use memory::InMemoryStore;

/// A stored document: its id plus the JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    /// Field lookup with dotted-path support.
    pub fn field(&self, path: &str) -> Option<&Value> {
        field_value(&self.data, path)
    }

    pub fn str_field(&self, path: &str) -> Option<&str> {
        self.field(path).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Equality query on one field, with optional ordering and limit.
///
/// When `order_by` is set, documents that lack the ordering field are not
/// returned at all. Callers rely on this to fall through to a differently
/// ordered query.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub field: String,
    pub value: Value,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new(collection: &str, field: &str, value: impl Into<Value>) -> Self {
        Self {
            collection: collection.to_string(),
            field: field.to_string(),
            value: value.into(),
            order_by: None,
            limit: None,
        }
    }

    pub fn order_by_desc(mut self, field: &str) -> Self {
        self.order_by = Some(OrderBy {
            field: field.to_string(),
            direction: Direction::Descending,
        });
        self
    }

    pub fn order_by_asc(mut self, field: &str) -> Self {
        self.order_by = Some(OrderBy {
            field: field.to_string(),
            direction: Direction::Ascending,
        });
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Applies filter, ordering and limit to a candidate list.
    ///
    /// Shared by the store implementations so they agree on semantics.
    pub fn apply(&self, docs: impl IntoIterator<Item = Document>) -> Vec<Document> {
        let mut hits: Vec<Document> = docs
            .into_iter()
            .filter(|d| d.field(&self.field) == Some(&self.value))
            .collect();

        if let Some(order) = &self.order_by {
            hits.retain(|d| d.field(&order.field).is_some_and(|v| !v.is_null()));
            hits.sort_by(|a, b| {
                let ord = compare_values(a.field(&order.field), b.field(&order.field));
                match order.direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }

        if let Some(n) = self.limit {
            hits.truncate(n);
        }
        hits
    }
}

/// Abstract document collection.
pub trait DocumentStore: Send + Sync {
    fn query(&self, query: &Query) -> impl Future<Output = StoreResult<Vec<Document>>> + Send;

    fn get(
        &self,
        collection: &str,
        id: &str,
    ) -> impl Future<Output = StoreResult<Option<Document>>> + Send;

    /// Inserts a new document and returns its generated id.
    fn insert(&self, collection: &str, data: Value)
    -> impl Future<Output = StoreResult<String>> + Send;

    /// Merges `patch` into an existing document.
    ///
    /// # Errors
    /// [`StoreError::NotFound`] when the document does not exist.
    fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Value,
    ) -> impl Future<Output = StoreResult<()>> + Send;
}

impl<T: DocumentStore> DocumentStore for Arc<T> {
    fn query(&self, query: &Query) -> impl Future<Output = StoreResult<Vec<Document>>> + Send {
        (**self).query(query)
    }

    fn get(
        &self,
        collection: &str,
        id: &str,
    ) -> impl Future<Output = StoreResult<Option<Document>>> + Send {
        (**self).get(collection, id)
    }

    fn insert(
        &self,
        collection: &str,
        data: Value,
    ) -> impl Future<Output = StoreResult<String>> + Send {
        (**self).insert(collection, data)
    }

    fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Value,
    ) -> impl Future<Output = StoreResult<()>> + Send {
        (**self).update(collection, id, patch)
    }
}

/// Resolves a dotted path (`a.b.c`) inside a JSON value.
pub fn field_value<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(data, |cur, key| cur.get(key))
}

/// Merges a patch object into `target`. Dotted keys create or descend into
/// nested objects; a non-object on the way is replaced.
pub fn apply_patch(target: &mut Value, patch: Value) -> StoreResult<()> {
    let Value::Object(entries) = patch else {
        return Err(StoreError::InvalidDocument("patch must be an object".into()));
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }

    for (key, val) in entries {
        let mut parts = key.split('.').peekable();
        let mut cur = &mut *target;
        while let Some(part) = parts.next() {
            if !cur.is_object() {
                *cur = Value::Object(Map::new());
            }
            let Some(map) = cur.as_object_mut() else {
                break;
            };
            if parts.peek().is_none() {
                map.insert(part.to_string(), val);
                break;
            }
            cur = map
                .entry(part.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }
    }
    Ok(())
}

/// Total order over JSON scalars used for `order_by`.
///
/// Numbers compare numerically, strings lexicographically (RFC3339
/// timestamps sort chronologically), mixed types by a fixed type rank.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(Value::Array(_)) => 4,
            Some(Value::Object(_)) => 5,
        }
    }
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// New random document id.
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn doc(id: &str, data: Value) -> Document {
        Document {
            id: id.into(),
            data,
        }
    }

    #[test]
    fn patch_creates_nested_paths() {
        let mut v = json!({ "name": "Jane", "disputes": { "itemCount": 1 } });
        apply_patch(
            &mut v,
            json!({ "disputes.itemCount": 4, "disputes.lastScan": "2025-01-01", "creditReport.negativeItems": 4 }),
        )
        .unwrap();
        assert_eq!(
            v,
            json!({
                "name": "Jane",
                "disputes": { "itemCount": 4, "lastScan": "2025-01-01" },
                "creditReport": { "negativeItems": 4 }
            })
        );
    }

    #[test]
    fn patch_must_be_object() {
        let mut v = json!({});
        assert!(matches!(
            apply_patch(&mut v, json!([1])),
            Err(StoreError::InvalidDocument(_))
        ));
    }

    #[test]
    fn ordered_query_drops_documents_without_the_field() {
        let docs = vec![
            doc("a", json!({ "contactId": "c1", "createdAt": "2024-01-01T00:00:00Z" })),
            doc("b", json!({ "contactId": "c1" })),
            doc("c", json!({ "contactId": "c1", "createdAt": "2024-06-01T00:00:00Z" })),
            doc("d", json!({ "contactId": "c2", "createdAt": "2025-01-01T00:00:00Z" })),
        ];
        let q = Query::new("reports", "contactId", "c1").order_by_desc("createdAt");
        let ids: Vec<_> = q.apply(docs.clone()).into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["c", "a"]);

        let unordered = Query::new("reports", "contactId", "c1").limit(2);
        let ids: Vec<_> = unordered.apply(docs).into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn numbers_order_numerically() {
        assert_eq!(
            compare_values(Some(&json!(9)), Some(&json!(10))),
            Ordering::Less
        );
        assert_eq!(
            compare_values(Some(&json!("9")), Some(&json!("10"))),
            Ordering::Greater
        );
    }

    #[test]
    fn dotted_field_lookup() {
        let d = doc("x", json!({ "a": { "b": { "c": 3 } } }));
        assert_eq!(d.field("a.b.c"), Some(&json!(3)));
        assert_eq!(d.field("a.x"), None);
    }
}
