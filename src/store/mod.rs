//! The RecordStore boundary.
//!
//! Persistence is a document-oriented collaborator exposing CRUD and
//! field-equality queries over named collections, injected into every
//! component as an `Arc<S>`; there is no ambient store handle. Multi-
//! document atomicity is only available through
//! [`RecordStore::run_transaction`].

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;

use crate::error::MembershipResult;

mod memory;

pub use memory::MemoryRecordStore;

/// A stored document. Always a JSON object; field names are camelCase.
pub type Document = Value;

/// Names of the collections the core reads and writes.
pub mod collections {
    pub const MEMBERS: &str = "members";
    pub const PROFILES: &str = "profiles";
    pub const MENTORSHIP: &str = "mentorship";
    pub const POSTS: &str = "posts";
    pub const COMMENTS: &str = "comments";
    pub const CONVERSATIONS: &str = "conversations";

    /// Per-member message subtree, deleted wholesale on removal.
    pub fn messages(member_id: &str) -> String {
        format!("conversations/{member_id}/messages")
    }
}

/// Consistent view used inside [`RecordStore::run_transaction`].
///
/// Reads observe committed state plus this transaction's own staged writes.
/// Writes are buffered and applied atomically iff the closure returns `Ok`;
/// on `Err` nothing is applied.
#[async_trait]
pub trait StoreTransaction: Send {
    async fn get(&mut self, collection: &str, id: &str) -> MembershipResult<Option<Document>>;

    async fn query(
        &mut self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> MembershipResult<Vec<Document>>;

    fn put(&mut self, collection: &str, id: &str, doc: Document);

    /// Shallow merge into an existing document; `null` values remove fields.
    /// Committing fails if the target does not exist.
    fn update(&mut self, collection: &str, id: &str, patch: Document);

    fn delete(&mut self, collection: &str, id: &str);
}

/// Closure executed by [`RecordStore::run_transaction`].
pub type TxFn<'a> = Box<
    dyn for<'t> FnOnce(&'t mut dyn StoreTransaction) -> BoxFuture<'t, MembershipResult<()>>
        + Send
        + 'a,
>;

/// Document-oriented persistence collaborator.
///
/// Every call is an async I/O suspension point and may fail transiently
/// ([`StoreError::Unavailable`](crate::error::StoreError) /
/// [`StoreError::Timeout`](crate::error::StoreError)). Individual calls are
/// atomic; sequences of calls are not, unless wrapped in
/// [`run_transaction`](Self::run_transaction).
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    async fn get(&self, collection: &str, id: &str) -> MembershipResult<Option<Document>>;

    /// Create or replace a document.
    async fn put(&self, collection: &str, id: &str, doc: Document) -> MembershipResult<()>;

    /// Shallow merge into an existing document; `null` values remove fields.
    /// Fails with a missing-document store error if the target is absent.
    async fn update(&self, collection: &str, id: &str, patch: Document) -> MembershipResult<()>;

    /// Delete a document. Deleting an absent document is a no-op; callers
    /// that need strict semantics check existence first.
    async fn delete(&self, collection: &str, id: &str) -> MembershipResult<()>;

    /// All documents whose `field` equals `value`.
    async fn query(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> MembershipResult<Vec<Document>>;

    /// Drop an entire collection. Used for per-member message subtrees;
    /// clearing an empty or unknown collection is a no-op.
    async fn clear(&self, collection: &str) -> MembershipResult<()>;

    /// Run `f` against a transactional view. The closure's reads and the
    /// commit of its writes happen atomically with respect to every other
    /// store operation; if `f` returns `Err` the transaction leaves no trace.
    async fn run_transaction<'a>(&self, f: TxFn<'a>) -> MembershipResult<()>;
}
