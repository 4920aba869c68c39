//! # Mentorline
//!
//! Membership lifecycle and mentor-assignment core for volunteer and
//! mentoring organizations: applicants register as `pending`, an
//! administrator approves or rejects them, approved members get a role,
//! and participants are linked to exactly one mentor (each mentor capped
//! at five participants). Removing a member purges every dependent record
//! in dependency order.
//!
//! Persistence is an injected [`RecordStore`], a document-oriented
//! collaborator with per-call atomicity and an explicit transaction
//! primitive. [`MemoryRecordStore`] ships for tests and development.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mentorline::{MembershipConfig, MembershipCore, MemoryRecordStore, Role};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryRecordStore::new());
//!     let core = MembershipCore::new(store, MembershipConfig::default());
//!
//!     // applicant "ana" was created as pending by the signup flow
//!     core.lifecycle
//!         .approve("ana", Role::Participant, Some("mentor-1"))
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod cascade;
pub mod config;
pub mod error;
pub mod graph;
pub mod lifecycle;
pub mod registry;
pub mod store;
pub mod types;

pub use cascade::CascadeDeletionEngine;
pub use config::MembershipConfig;
pub use error::{MembershipError, MembershipResult, StoreError};
pub use graph::MentorshipGraph;
pub use lifecycle::LifecycleOrchestrator;
pub use registry::MembershipRegistry;
pub use store::{collections, Document, MemoryRecordStore, RecordStore, StoreTransaction, TxFn};
pub use types::{Member, MemberRecord, MemberRole, MentorshipEdge, Profile, Role};

use std::sync::Arc;

/// The four components bundled over one shared store handle.
pub struct MembershipCore<S: RecordStore> {
    pub registry: MembershipRegistry<S>,
    pub graph: MentorshipGraph<S>,
    pub lifecycle: LifecycleOrchestrator<S>,
    pub cascade: CascadeDeletionEngine<S>,
}

impl<S: RecordStore> MembershipCore<S> {
    pub fn new(store: Arc<S>, config: MembershipConfig) -> Self {
        Self {
            registry: MembershipRegistry::new(Arc::clone(&store)),
            graph: MentorshipGraph::new(Arc::clone(&store), &config),
            lifecycle: LifecycleOrchestrator::new(Arc::clone(&store), &config),
            cascade: CascadeDeletionEngine::new(store),
        }
    }
}
