//! Shared fixtures for the integration suites.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mentorline::{
    collections, Document, MembershipResult, MemoryRecordStore, RecordStore, Role, StoreError,
    TxFn,
};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

/// Fresh store with log capture wired up; `RUST_LOG` controls verbosity.
pub fn store() -> Arc<MemoryRecordStore> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
    Arc::new(MemoryRecordStore::new())
}

pub async fn seed_member_at(
    store: &impl RecordStore,
    id: &str,
    role: Role,
    is_active: bool,
    created_at: DateTime<Utc>,
) {
    let doc = json!({
        "id": id,
        "email": format!("{id}@example.org"),
        "role": role,
        "isActive": is_active,
        "location": "Porto",
        "intake": { "name": format!("Member {id}") },
        "createdAt": created_at,
        "updatedAt": created_at,
    });
    store.put(collections::MEMBERS, id, doc).await.unwrap();
}

pub async fn seed_member(store: &impl RecordStore, id: &str, role: Role, is_active: bool) {
    seed_member_at(store, id, role, is_active, Utc::now()).await;
}

pub async fn seed_pending(store: &impl RecordStore, id: &str) {
    seed_member(store, id, Role::Pending, false).await;
}

pub async fn seed_mentor(store: &impl RecordStore, id: &str) {
    seed_member(store, id, Role::Mentor, true).await;
}

pub async fn seed_participant(store: &impl RecordStore, id: &str) {
    seed_member(store, id, Role::Participant, true).await;
}

/// Fault-injecting store wrapper. `fail_after(op, collection, n)` lets the
/// next `n` calls of that operation against that collection succeed and
/// fails every later one with a transient store error.
pub struct FailingStore<S> {
    inner: Arc<S>,
    plans: Mutex<HashMap<(&'static str, String), usize>>,
}

impl<S> FailingStore<S> {
    pub fn new(inner: Arc<S>) -> Self {
        Self {
            inner,
            plans: Mutex::new(HashMap::new()),
        }
    }

    pub fn fail_after(&self, op: &'static str, collection: &str, ok_calls: usize) {
        self.plans
            .lock()
            .unwrap()
            .insert((op, collection.to_string()), ok_calls);
    }

    fn check(&self, op: &'static str, collection: &str) -> MembershipResult<()> {
        let mut plans = self.plans.lock().unwrap();
        if let Some(remaining) = plans.get_mut(&(op, collection.to_string())) {
            if *remaining == 0 {
                return Err(StoreError::Unavailable(format!(
                    "injected failure: {op} on {collection}"
                ))
                .into());
            }
            *remaining -= 1;
        }
        Ok(())
    }
}

#[async_trait]
impl<S: RecordStore> RecordStore for FailingStore<S> {
    async fn get(&self, collection: &str, id: &str) -> MembershipResult<Option<Document>> {
        self.check("get", collection)?;
        self.inner.get(collection, id).await
    }

    async fn put(&self, collection: &str, id: &str, doc: Document) -> MembershipResult<()> {
        self.check("put", collection)?;
        self.inner.put(collection, id, doc).await
    }

    async fn update(&self, collection: &str, id: &str, patch: Document) -> MembershipResult<()> {
        self.check("update", collection)?;
        self.inner.update(collection, id, patch).await
    }

    async fn delete(&self, collection: &str, id: &str) -> MembershipResult<()> {
        self.check("delete", collection)?;
        self.inner.delete(collection, id).await
    }

    async fn query(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> MembershipResult<Vec<Document>> {
        self.check("query", collection)?;
        self.inner.query(collection, field, value).await
    }

    async fn clear(&self, collection: &str) -> MembershipResult<()> {
        self.check("clear", collection)?;
        self.inner.clear(collection).await
    }

    async fn run_transaction<'a>(&self, f: TxFn<'a>) -> MembershipResult<()> {
        self.check("transaction", "")?;
        self.inner.run_transaction(f).await
    }
}
