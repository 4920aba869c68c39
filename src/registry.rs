//! Member account records and their pending/active transition.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use crate::error::{MembershipError, MembershipResult};
use crate::store::{collections, RecordStore};
use crate::types::{Member, Role};

/// Owns member account records. Mutations here touch the `members`
/// collection only; edges, profiles and dependent content belong to the
/// graph, the orchestrator and the cascade engine.
pub struct MembershipRegistry<S: RecordStore> {
    store: Arc<S>,
}

impl<S: RecordStore> Clone for MembershipRegistry<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: RecordStore> MembershipRegistry<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn get(&self, member_id: &str) -> MembershipResult<Option<Member>> {
        match self.store.get(collections::MEMBERS, member_id).await? {
            Some(doc) => Ok(Some(Member::from_doc(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn require(&self, member_id: &str) -> MembershipResult<Member> {
        self.get(member_id).await?.ok_or_else(|| {
            MembershipError::not_found(format!("member {member_id} not found"))
        })
    }

    /// All pending applicants, newest first.
    pub async fn list_pending(&self) -> MembershipResult<Vec<Member>> {
        let role = json!(Role::Pending);
        let docs = self
            .store
            .query(collections::MEMBERS, "role", &role)
            .await?;
        let mut members = docs
            .into_iter()
            .map(Member::from_doc)
            .collect::<MembershipResult<Vec<_>>>()?;
        members.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(members)
    }

    /// Set a member's role and active flag.
    ///
    /// The participant `element` tag is left untouched either way: it only
    /// surfaces in the domain model while the role is `participant`.
    pub async fn set_active(
        &self,
        member_id: &str,
        role: Role,
        is_active: bool,
    ) -> MembershipResult<()> {
        if role == Role::Pending && is_active {
            return Err(MembershipError::invalid_role(
                "a member cannot be active with role 'pending'",
            ));
        }
        self.require(member_id).await?;
        let patch = json!({
            "role": role,
            "isActive": is_active,
            "updatedAt": Utc::now(),
        });
        self.store
            .update(collections::MEMBERS, member_id, patch)
            .await
    }

    /// Remove the member record only, without cascading. Deleting an
    /// unknown member is an error, not a silent success.
    pub async fn delete(&self, member_id: &str) -> MembershipResult<()> {
        self.require(member_id).await?;
        self.store.delete(collections::MEMBERS, member_id).await
    }
}
