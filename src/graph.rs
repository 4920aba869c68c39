//! The mentor-participant graph and its capacity invariants.
//!
//! Invariants enforced on every mutation:
//! - a participant has at most one mentor
//! - a mentor has at most `mentor_capacity` participants (default 5)
//! - both endpoints exist with the expected roles at edge-creation time
//!
//! Precondition reads and the edge write execute inside one store
//! transaction. Two concurrent `assign` calls against the same mentor
//! cannot both observe count = capacity - 1 and both commit.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::json;

use crate::config::MembershipConfig;
use crate::error::{MembershipError, MembershipResult};
use crate::store::{collections, RecordStore};
use crate::types::{Member, MentorshipEdge, Role};

pub struct MentorshipGraph<S: RecordStore> {
    store: Arc<S>,
    capacity: usize,
}

impl<S: RecordStore> Clone for MentorshipGraph<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            capacity: self.capacity,
        }
    }
}

impl<S: RecordStore> MentorshipGraph<S> {
    pub fn new(store: Arc<S>, config: &MembershipConfig) -> Self {
        Self {
            store,
            capacity: config.mentor_capacity,
        }
    }

    /// Link a participant to a mentor.
    ///
    /// Fails with [`MembershipError::CapacityExceeded`] when the mentor is
    /// full and [`MembershipError::AlreadyAssigned`] (naming the existing
    /// mentor) when the participant is already linked, so callers can say
    /// which constraint was violated.
    pub async fn assign(&self, mentor_id: &str, participant_id: &str) -> MembershipResult<()> {
        self.assign_inner(mentor_id, participant_id, false).await
    }

    /// Assignment performed while approving a pending applicant: the
    /// participant-side role check accepts `pending`, since the activation
    /// that makes the member a participant only commits afterwards.
    pub(crate) async fn assign_pending_approval(
        &self,
        mentor_id: &str,
        participant_id: &str,
    ) -> MembershipResult<()> {
        self.assign_inner(mentor_id, participant_id, true).await
    }

    async fn assign_inner(
        &self,
        mentor_id: &str,
        participant_id: &str,
        allow_pending: bool,
    ) -> MembershipResult<()> {
        let capacity = self.capacity;
        let mentor_id = mentor_id.to_string();
        let participant_id = participant_id.to_string();

        self.store
            .run_transaction(Box::new(move |tx| {
                Box::pin(async move {
                    let mentor_doc = tx
                        .get(collections::MEMBERS, &mentor_id)
                        .await?
                        .ok_or_else(|| {
                            MembershipError::not_found(format!("mentor {mentor_id} not found"))
                        })?;
                    let mentor = Member::from_doc(mentor_doc)?;
                    if mentor.role.kind() != Role::Mentor {
                        return Err(MembershipError::invalid_role(format!(
                            "member {mentor_id} has role '{}', expected 'mentor'",
                            mentor.role.kind()
                        )));
                    }

                    let participant_doc = tx
                        .get(collections::MEMBERS, &participant_id)
                        .await?
                        .ok_or_else(|| {
                            MembershipError::not_found(format!(
                                "participant {participant_id} not found"
                            ))
                        })?;
                    let participant = Member::from_doc(participant_doc)?;
                    let participant_role = participant.role.kind();
                    let acceptable = participant_role == Role::Participant
                        || (allow_pending && participant_role == Role::Pending);
                    if !acceptable {
                        return Err(MembershipError::invalid_role(format!(
                            "member {participant_id} has role '{participant_role}', \
                             expected 'participant'"
                        )));
                    }

                    let key = json!(participant_id);
                    let existing = tx
                        .query(collections::MENTORSHIP, "participantId", &key)
                        .await?;
                    if let Some(doc) = existing.into_iter().next() {
                        let edge: MentorshipEdge = serde_json::from_value(doc)?;
                        return Err(MembershipError::AlreadyAssigned {
                            participant_id: participant_id.clone(),
                            mentor_id: edge.mentor_id,
                        });
                    }

                    let key = json!(mentor_id);
                    let count = tx
                        .query(collections::MENTORSHIP, "mentorId", &key)
                        .await?
                        .len();
                    if count >= capacity {
                        return Err(MembershipError::CapacityExceeded {
                            mentor_id: mentor_id.clone(),
                            count,
                            limit: capacity,
                        });
                    }

                    let edge = MentorshipEdge::new(&mentor_id, &participant_id);
                    let id = edge.id.clone();
                    tx.put(collections::MENTORSHIP, &id, serde_json::to_value(&edge)?);
                    tracing::debug!(%mentor_id, %participant_id, "mentorship edge created");
                    Ok(())
                })
            }))
            .await
    }

    /// Remove exactly the edge between `mentor_id` and `participant_id`.
    pub async fn unassign(&self, mentor_id: &str, participant_id: &str) -> MembershipResult<()> {
        let mentor_id = mentor_id.to_string();
        let participant_id = participant_id.to_string();

        self.store
            .run_transaction(Box::new(move |tx| {
                Box::pin(async move {
                    let key = json!(participant_id);
                    let edges = tx
                        .query(collections::MENTORSHIP, "participantId", &key)
                        .await?;
                    let edge = edges
                        .into_iter()
                        .map(serde_json::from_value::<MentorshipEdge>)
                        .collect::<Result<Vec<_>, _>>()?
                        .into_iter()
                        .find(|edge| edge.mentor_id == mentor_id)
                        .ok_or_else(|| MembershipError::EdgeNotFound {
                            mentor_id: mentor_id.clone(),
                            participant_id: participant_id.clone(),
                        })?;
                    tx.delete(collections::MENTORSHIP, &edge.id);
                    tracing::debug!(%mentor_id, %participant_id, "mentorship edge removed");
                    Ok(())
                })
            }))
            .await
    }

    /// Participant ids currently linked to `mentor_id`.
    pub async fn edges_for_mentor(&self, mentor_id: &str) -> MembershipResult<HashSet<String>> {
        let key = json!(mentor_id);
        let docs = self
            .store
            .query(collections::MENTORSHIP, "mentorId", &key)
            .await?;
        docs.into_iter()
            .map(|doc| {
                let edge: MentorshipEdge = serde_json::from_value(doc)?;
                Ok(edge.participant_id)
            })
            .collect()
    }

    /// The mentor linked to `participant_id`, if any.
    pub async fn edge_for_participant(
        &self,
        participant_id: &str,
    ) -> MembershipResult<Option<String>> {
        let key = json!(participant_id);
        let docs = self
            .store
            .query(collections::MENTORSHIP, "participantId", &key)
            .await?;
        match docs.into_iter().next() {
            Some(doc) => {
                let edge: MentorshipEdge = serde_json::from_value(doc)?;
                Ok(Some(edge.mentor_id))
            }
            None => Ok(None),
        }
    }
}
