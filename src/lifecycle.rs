//! The approval state machine and multi-step coordination.
//!
//! ```text
//! pending --approve(role, mentor?)--> active(role)
//! pending --reject--> [removed]
//! active(participant) --change_role(participant, new_mentor)--> active(participant)
//! active(role) --change_role(new_role)--> active(new_role)
//! any --remove--> [removed]
//! ```
//!
//! The store offers no multi-document transactions across these steps, so
//! each operation applies compensating rollbacks on failure. A rollback
//! that itself fails escalates to `PartialFailure`.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use crate::cascade::CascadeDeletionEngine;
use crate::config::MembershipConfig;
use crate::error::{MembershipError, MembershipResult};
use crate::graph::MentorshipGraph;
use crate::registry::MembershipRegistry;
use crate::store::{collections, RecordStore};
use crate::types::{Member, Profile, Role};

pub struct LifecycleOrchestrator<S: RecordStore> {
    store: Arc<S>,
    registry: MembershipRegistry<S>,
    graph: MentorshipGraph<S>,
    cascade: CascadeDeletionEngine<S>,
}

impl<S: RecordStore> Clone for LifecycleOrchestrator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            registry: self.registry.clone(),
            graph: self.graph.clone(),
            cascade: self.cascade.clone(),
        }
    }
}

impl<S: RecordStore> LifecycleOrchestrator<S> {
    pub fn new(store: Arc<S>, config: &MembershipConfig) -> Self {
        Self {
            registry: MembershipRegistry::new(Arc::clone(&store)),
            graph: MentorshipGraph::new(Arc::clone(&store), config),
            cascade: CascadeDeletionEngine::new(Arc::clone(&store)),
            store,
        }
    }

    /// Approve a pending applicant into `role`.
    ///
    /// The mentor edge is created first: a capacity or duplicate violation
    /// must abort before the member or profile is touched. If activation or
    /// profile provisioning fails afterwards, the edge (and any committed
    /// activation) is rolled back before the error surfaces.
    pub async fn approve(
        &self,
        member_id: &str,
        role: Role,
        mentor_id: Option<&str>,
    ) -> MembershipResult<()> {
        if role == Role::Pending {
            return Err(MembershipError::invalid_role(
                "cannot approve a member into the 'pending' role",
            ));
        }
        let member = self.registry.require(member_id).await?;
        if !member.is_pending() {
            return Err(MembershipError::invalid_role(format!(
                "member {member_id} is not pending (current role '{}')",
                member.role.kind()
            )));
        }

        let mut edge_mentor: Option<&str> = None;
        if role == Role::Participant {
            if let Some(mentor) = mentor_id {
                self.graph.assign_pending_approval(mentor, member_id).await?;
                edge_mentor = Some(mentor);
            }
        }

        if let Err(err) = self.registry.set_active(member_id, role, true).await {
            return self
                .compensate_approval(member_id, edge_mentor, false, err)
                .await;
        }

        if let Err(err) = self.upsert_profile(&member, role).await {
            return self
                .compensate_approval(member_id, edge_mentor, true, err)
                .await;
        }

        tracing::info!(member_id, role = %role, "member approved");
        Ok(())
    }

    async fn compensate_approval(
        &self,
        member_id: &str,
        edge_mentor: Option<&str>,
        activated: bool,
        cause: MembershipError,
    ) -> MembershipResult<()> {
        let mut completed: Vec<&'static str> = Vec::new();
        if edge_mentor.is_some() {
            completed.push("assign-mentor");
        }
        if activated {
            completed.push("activate");
        }
        tracing::warn!(member_id, error = %cause, "approval failed, rolling back");

        if activated {
            if let Err(rollback_err) = self
                .registry
                .set_active(member_id, Role::Pending, false)
                .await
            {
                tracing::error!(member_id, error = %rollback_err, "rollback of activation failed");
                return Err(MembershipError::PartialFailure {
                    operation: "approve",
                    completed,
                    message: format!("{cause}; rollback of activation failed: {rollback_err}"),
                });
            }
        }

        if let Some(mentor) = edge_mentor {
            if let Err(rollback_err) = self.graph.unassign(mentor, member_id).await {
                tracing::error!(member_id, error = %rollback_err, "rollback of mentor edge failed");
                return Err(MembershipError::PartialFailure {
                    operation: "approve",
                    completed,
                    message: format!("{cause}; rollback of mentor edge failed: {rollback_err}"),
                });
            }
        }

        Err(cause)
    }

    /// Reject a pending applicant. Uses the full removal path so a
    /// mid-upload applicant leaves no orphaned partial records behind.
    pub async fn reject(&self, member_id: &str) -> MembershipResult<()> {
        let member = self.registry.require(member_id).await?;
        if !member.is_pending() {
            return Err(MembershipError::invalid_role(format!(
                "member {member_id} is not pending (current role '{}'); \
                 only applicants can be rejected",
                member.role.kind()
            )));
        }
        tracing::info!(member_id, "applicant rejected");
        self.cascade.remove(member_id).await
    }

    /// Change an active member's role, keeping graph and profile consistent.
    ///
    /// Reassigning a participant's mentor is this operation with
    /// `new_role = participant` and the new mentor id (delete + create under
    /// the hood). Moving to `staff` deletes the public profile; leaving
    /// `staff` re-provisions one. All sub-steps succeed or the
    /// pre-operation state is restored.
    pub async fn change_role(
        &self,
        member_id: &str,
        new_role: Role,
        new_mentor_id: Option<&str>,
    ) -> MembershipResult<()> {
        if new_role == Role::Pending {
            return Err(MembershipError::invalid_role(
                "cannot change a member back to 'pending'",
            ));
        }
        let member = self.registry.require(member_id).await?;
        let old_role = member.role.kind();
        if old_role == Role::Pending {
            return Err(MembershipError::invalid_role(format!(
                "member {member_id} is still pending; approve or reject it instead"
            )));
        }

        let old_mentor = if old_role == Role::Participant {
            self.graph.edge_for_participant(member_id).await?
        } else {
            None
        };

        if let Some(mentor) = &old_mentor {
            self.graph.unassign(mentor, member_id).await?;
        }

        if let Err(err) = self.registry.set_active(member_id, new_role, true).await {
            return self
                .rollback_change_role(member_id, old_role, old_mentor.as_deref(), false, None, err)
                .await;
        }

        let mut new_mentor_assigned: Option<&str> = None;
        if new_role == Role::Participant {
            if let Some(mentor) = new_mentor_id {
                if let Err(err) = self.graph.assign(mentor, member_id).await {
                    return self
                        .rollback_change_role(
                            member_id,
                            old_role,
                            old_mentor.as_deref(),
                            true,
                            None,
                            err,
                        )
                        .await;
                }
                new_mentor_assigned = Some(mentor);
            }
        }

        let profile_result = if new_role == Role::Staff {
            // Staff members are not publicly listed.
            self.store.delete(collections::PROFILES, member_id).await
        } else {
            self.upsert_profile(&member, new_role).await
        };
        if let Err(err) = profile_result {
            return self
                .rollback_change_role(
                    member_id,
                    old_role,
                    old_mentor.as_deref(),
                    true,
                    new_mentor_assigned,
                    err,
                )
                .await;
        }

        tracing::info!(member_id, from = %old_role, to = %new_role, "member role changed");
        Ok(())
    }

    /// Undo a partially applied `change_role`, newest step first. The role
    /// is restored before the old edge so the strict assignment
    /// precondition holds again. `role_changed` says whether the role write
    /// itself committed; when it did not, that step is neither reverted nor
    /// reported as completed.
    async fn rollback_change_role(
        &self,
        member_id: &str,
        old_role: Role,
        old_mentor: Option<&str>,
        role_changed: bool,
        new_mentor_assigned: Option<&str>,
        cause: MembershipError,
    ) -> MembershipResult<()> {
        tracing::warn!(member_id, error = %cause, "role change failed, rolling back");
        let mut completed: Vec<&'static str> = Vec::new();
        if old_mentor.is_some() {
            completed.push("unassign-old-mentor");
        }
        if role_changed {
            completed.push("set-role");
        }
        if new_mentor_assigned.is_some() {
            completed.push("assign-new-mentor");
        }

        let partial = |message: String| MembershipError::PartialFailure {
            operation: "change_role",
            completed: completed.clone(),
            message,
        };

        if let Some(mentor) = new_mentor_assigned {
            if let Err(rollback_err) = self.graph.unassign(mentor, member_id).await {
                tracing::error!(member_id, error = %rollback_err, "rollback of new edge failed");
                return Err(partial(format!(
                    "{cause}; rollback of new mentor edge failed: {rollback_err}"
                )));
            }
        }

        if role_changed {
            if let Err(rollback_err) = self.registry.set_active(member_id, old_role, true).await {
                tracing::error!(member_id, error = %rollback_err, "rollback of role failed");
                return Err(partial(format!(
                    "{cause}; rollback of role failed: {rollback_err}"
                )));
            }
        }

        if let Some(mentor) = old_mentor {
            if let Err(rollback_err) = self.graph.assign(mentor, member_id).await {
                tracing::error!(member_id, error = %rollback_err, "restore of old edge failed");
                return Err(partial(format!(
                    "{cause}; restore of old mentor edge failed: {rollback_err}"
                )));
            }
        }

        Err(cause)
    }

    /// Remove a member and all dependent records.
    pub async fn remove(&self, member_id: &str) -> MembershipResult<()> {
        self.cascade.remove(member_id).await
    }

    /// Create the profile on first approval, or update it on re-approval
    /// and role changes. The re-approval path only touches `role` and the
    /// update timestamp: user-authored content and counters stay as they
    /// are.
    async fn upsert_profile(&self, member: &Member, role: Role) -> MembershipResult<()> {
        let now = Utc::now();
        match self.store.get(collections::PROFILES, &member.id).await? {
            Some(_) => {
                let patch = json!({ "role": role, "updatedAt": now });
                self.store
                    .update(collections::PROFILES, &member.id, patch)
                    .await
            }
            None => {
                let profile = Profile::seed(member, role, now);
                self.store
                    .put(
                        collections::PROFILES,
                        &member.id,
                        serde_json::to_value(&profile)?,
                    )
                    .await
            }
        }
    }
}
