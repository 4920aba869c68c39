//! In-memory record store for tests and development.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::{MembershipResult, StoreError};

use super::{Document, RecordStore, StoreTransaction, TxFn};

type Collections = HashMap<String, BTreeMap<String, Document>>;

/// In-memory [`RecordStore`] backed by a single mutex-guarded map.
///
/// Transactions hold the store lock for their whole duration, so they
/// serialize against each other and against plain operations — which is
/// exactly the atomicity the mentorship graph relies on.
#[derive(Default)]
pub struct MemoryRecordStore {
    collections: Mutex<Collections>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Shallow merge `patch` into `doc`; `null` values remove fields.
fn merge(doc: &mut Document, patch: &Document) {
    let (Some(target), Some(fields)) = (doc.as_object_mut(), patch.as_object()) else {
        return;
    };
    for (key, value) in fields {
        if value.is_null() {
            target.remove(key);
        } else {
            target.insert(key.clone(), value.clone());
        }
    }
}

enum Staged {
    Put(String, String, Document),
    Update(String, String, Document),
    Delete(String, String),
}

struct MemoryTransaction<'a> {
    base: &'a Collections,
    staged: Vec<Staged>,
}

impl MemoryTransaction<'_> {
    /// Committed state of one collection with this transaction's staged
    /// writes overlaid (read-your-writes).
    fn effective(&self, collection: &str) -> BTreeMap<String, Document> {
        let mut view = self.base.get(collection).cloned().unwrap_or_default();
        for op in &self.staged {
            match op {
                Staged::Put(c, id, doc) if c == collection => {
                    view.insert(id.clone(), doc.clone());
                }
                Staged::Update(c, id, patch) if c == collection => {
                    if let Some(doc) = view.get_mut(id) {
                        merge(doc, patch);
                    }
                }
                Staged::Delete(c, id) if c == collection => {
                    view.remove(id);
                }
                _ => {}
            }
        }
        view
    }
}

#[async_trait]
impl<'a> StoreTransaction for MemoryTransaction<'a> {
    async fn get(&mut self, collection: &str, id: &str) -> MembershipResult<Option<Document>> {
        Ok(self.effective(collection).remove(id))
    }

    async fn query(
        &mut self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> MembershipResult<Vec<Document>> {
        Ok(self
            .effective(collection)
            .into_values()
            .filter(|doc| doc.get(field) == Some(value))
            .collect())
    }

    fn put(&mut self, collection: &str, id: &str, doc: Document) {
        self.staged
            .push(Staged::Put(collection.to_string(), id.to_string(), doc));
    }

    fn update(&mut self, collection: &str, id: &str, patch: Document) {
        self.staged
            .push(Staged::Update(collection.to_string(), id.to_string(), patch));
    }

    fn delete(&mut self, collection: &str, id: &str) {
        self.staged
            .push(Staged::Delete(collection.to_string(), id.to_string()));
    }
}

fn commit(staged: Vec<Staged>, collections: &mut Collections) -> MembershipResult<()> {
    for op in staged {
        match op {
            Staged::Put(collection, id, doc) => {
                collections.entry(collection).or_default().insert(id, doc);
            }
            Staged::Update(collection, id, patch) => {
                let doc = collections
                    .get_mut(&collection)
                    .and_then(|c| c.get_mut(&id))
                    .ok_or_else(|| StoreError::MissingDocument {
                        collection: collection.clone(),
                        id: id.clone(),
                    })?;
                merge(doc, &patch);
            }
            Staged::Delete(collection, id) => {
                if let Some(c) = collections.get_mut(&collection) {
                    c.remove(&id);
                }
            }
        }
    }
    Ok(())
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get(&self, collection: &str, id: &str) -> MembershipResult<Option<Document>> {
        let collections = self.collections.lock().await;
        Ok(collections
            .get(collection)
            .and_then(|c| c.get(id))
            .cloned())
    }

    async fn put(&self, collection: &str, id: &str, doc: Document) -> MembershipResult<()> {
        let mut collections = self.collections.lock().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), doc);
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, patch: Document) -> MembershipResult<()> {
        let mut collections = self.collections.lock().await;
        let doc = collections
            .get_mut(collection)
            .and_then(|c| c.get_mut(id))
            .ok_or_else(|| StoreError::MissingDocument {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        merge(doc, &patch);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> MembershipResult<()> {
        let mut collections = self.collections.lock().await;
        if let Some(c) = collections.get_mut(collection) {
            c.remove(id);
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> MembershipResult<Vec<Document>> {
        let collections = self.collections.lock().await;
        Ok(collections
            .get(collection)
            .map(|c| {
                c.values()
                    .filter(|doc| doc.get(field) == Some(value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn clear(&self, collection: &str) -> MembershipResult<()> {
        let mut collections = self.collections.lock().await;
        collections.remove(collection);
        Ok(())
    }

    async fn run_transaction<'a>(&self, f: TxFn<'a>) -> MembershipResult<()> {
        let mut collections = self.collections.lock().await;
        let mut tx = MemoryTransaction {
            base: &*collections,
            staged: Vec::new(),
        };
        f(&mut tx).await?;
        let MemoryTransaction { staged, .. } = tx;
        commit(staged, &mut collections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MembershipError;
    use serde_json::json;

    #[tokio::test]
    async fn update_merges_and_null_removes() {
        let store = MemoryRecordStore::new();
        store
            .put("members", "a", json!({ "id": "a", "role": "pending", "element": "air" }))
            .await
            .unwrap();
        store
            .update("members", "a", json!({ "role": "mentor", "element": null }))
            .await
            .unwrap();

        let doc = store.get("members", "a").await.unwrap().unwrap();
        assert_eq!(doc["role"], "mentor");
        assert!(doc.get("element").is_none());
    }

    #[tokio::test]
    async fn update_missing_document_errors() {
        let store = MemoryRecordStore::new();
        let err = store
            .update("members", "ghost", json!({ "role": "mentor" }))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn aborted_transaction_leaves_no_trace() {
        let store = MemoryRecordStore::new();
        store
            .put("members", "a", json!({ "id": "a" }))
            .await
            .unwrap();

        let result = store
            .run_transaction(Box::new(|tx| {
                Box::pin(async move {
                    tx.put("members", "b", json!({ "id": "b" }));
                    tx.delete("members", "a");
                    Err(MembershipError::not_found("abort on purpose"))
                })
            }))
            .await;

        assert!(result.is_err());
        assert!(store.get("members", "a").await.unwrap().is_some());
        assert!(store.get("members", "b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn transaction_reads_see_staged_writes() {
        let store = MemoryRecordStore::new();
        store
            .run_transaction(Box::new(|tx| {
                Box::pin(async move {
                    tx.put("mentorship", "e1", json!({ "id": "e1", "mentorId": "m" }));
                    let mentor = json!("m");
                    let edges = tx.query("mentorship", "mentorId", &mentor).await?;
                    assert_eq!(edges.len(), 1);
                    Ok(())
                })
            }))
            .await
            .unwrap();
    }
}
