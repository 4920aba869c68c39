use thiserror::Error;

/// Membership core error types.
///
/// Validation variants (`NotFound`, `InvalidRole`, `CapacityExceeded`,
/// `AlreadyAssigned`, `EdgeNotFound`) are raised before any mutation and
/// need no rollback. `Store` wraps transient persistence failures.
/// `PartialFailure` means a multi-step operation committed some sub-steps
/// and could not be rolled back; an operator has to reconcile manually.
#[derive(Error, Debug)]
pub enum MembershipError {
    #[error("{0}")]
    NotFound(String),

    #[error("invalid role: {0}")]
    InvalidRole(String),

    #[error("mentor {mentor_id} already has {count} participants (limit {limit})")]
    CapacityExceeded {
        mentor_id: String,
        count: usize,
        limit: usize,
    },

    #[error("participant {participant_id} is already assigned to mentor {mentor_id}")]
    AlreadyAssigned {
        participant_id: String,
        mentor_id: String,
    },

    #[error("no mentorship link from mentor {mentor_id} to participant {participant_id}")]
    EdgeNotFound {
        mentor_id: String,
        participant_id: String,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("{operation} failed after steps {completed:?} had committed: {message}")]
    PartialFailure {
        operation: &'static str,
        completed: Vec<&'static str>,
        message: String,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MembershipError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn invalid_role(message: impl Into<String>) -> Self {
        Self::InvalidRole(message.into())
    }

    /// True when the error only says a referenced record is absent.
    /// The cascade engine treats these as already-deleted targets.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::Store(StoreError::MissingDocument { .. })
        )
    }

    /// True for failures where retrying the whole operation from scratch is
    /// safe, provided nothing was partially applied.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Store(StoreError::Unavailable(_) | StoreError::Timeout(_))
        )
    }
}

/// Persistence layer error types.
///
/// The in-memory store only raises `MissingDocument`; the other variants
/// are the vocabulary for real [`RecordStore`](crate::store::RecordStore)
/// backends. `Conflict` is for stores with optimistic concurrency control,
/// `Corrupt` for documents a backend cannot decode.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store operation timed out: {0}")]
    Timeout(String),

    #[error("transaction conflict: {0}")]
    Conflict(String),

    #[error("missing document {id} in {collection}")]
    MissingDocument { collection: String, id: String },

    #[error("malformed document {id} in {collection}: {reason}")]
    Corrupt {
        collection: String,
        id: String,
        reason: String,
    },
}

pub type MembershipResult<T> = Result<T, MembershipError>;
