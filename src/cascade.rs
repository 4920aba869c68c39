//! Cascading deletion of a member and every record that references it.
//!
//! Deletion order keeps referential integrity for concurrent readers:
//! edges and authored content disappear first, the identity record last,
//! so nothing ever points at a vanished member. Already-absent targets are
//! tolerated; any other store failure aborts with a partial-failure error
//! naming the steps that had committed.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::error::{MembershipError, MembershipResult};
use crate::store::{collections, Document, RecordStore};
use crate::types::MentorshipEdge;

pub struct CascadeDeletionEngine<S: RecordStore> {
    store: Arc<S>,
}

impl<S: RecordStore> Clone for CascadeDeletionEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

fn doc_id(doc: &Document) -> Option<&str> {
    doc.get("id").and_then(Value::as_str)
}

impl<S: RecordStore> CascadeDeletionEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Remove `member_id` and all dependent records, in dependency order.
    pub async fn remove(&self, member_id: &str) -> MembershipResult<()> {
        // Removing an unknown member is an error, not a silent success.
        self.store
            .get(collections::MEMBERS, member_id)
            .await?
            .ok_or_else(|| MembershipError::not_found(format!("member {member_id} not found")))?;

        let mut completed: Vec<&'static str> = Vec::new();

        self.step(&mut completed, "mentorship-edges", self.delete_edges(member_id).await)?;
        self.step(
            &mut completed,
            "authored-content",
            self.delete_authored_content(member_id).await,
        )?;
        self.step(
            &mut completed,
            "conversations",
            self.delete_conversations(member_id).await,
        )?;
        self.step(
            &mut completed,
            "profile",
            self.store.delete(collections::PROFILES, member_id).await,
        )?;
        self.step(
            &mut completed,
            "member-record",
            self.store.delete(collections::MEMBERS, member_id).await,
        )?;

        tracing::info!(member_id, "member removed with all dependent records");
        Ok(())
    }

    fn step(
        &self,
        completed: &mut Vec<&'static str>,
        name: &'static str,
        result: MembershipResult<()>,
    ) -> MembershipResult<()> {
        match result {
            Ok(()) => {
                tracing::debug!(step = name, "cascade step done");
                completed.push(name);
                Ok(())
            }
            Err(err) if err.is_not_found() => {
                tracing::debug!(step = name, "cascade step had nothing to delete");
                completed.push(name);
                Ok(())
            }
            Err(err) => {
                tracing::error!(step = name, error = %err, "cascade deletion aborted");
                Err(MembershipError::PartialFailure {
                    operation: "remove",
                    completed: completed.clone(),
                    message: format!("step '{name}' failed: {err}"),
                })
            }
        }
    }

    /// Every edge where the member is mentor or participant.
    async fn delete_edges(&self, member_id: &str) -> MembershipResult<()> {
        let key = json!(member_id);
        for field in ["mentorId", "participantId"] {
            let docs = self
                .store
                .query(collections::MENTORSHIP, field, &key)
                .await?;
            for doc in docs {
                let edge: MentorshipEdge = serde_json::from_value(doc)?;
                self.store.delete(collections::MENTORSHIP, &edge.id).await?;
            }
        }
        Ok(())
    }

    /// The member's posts (with the comments nested under them) and the
    /// member's comments on other members' posts. Comments live in a flat
    /// author-indexed collection, so both directions are field queries
    /// rather than full scans.
    async fn delete_authored_content(&self, member_id: &str) -> MembershipResult<()> {
        let author = json!(member_id);

        let posts = self.store.query(collections::POSTS, "authorId", &author).await?;
        for post in posts {
            let Some(post_id) = doc_id(&post) else { continue };
            let key = json!(post_id);
            let comments = self.store.query(collections::COMMENTS, "postId", &key).await?;
            for comment in comments {
                if let Some(comment_id) = doc_id(&comment) {
                    self.store.delete(collections::COMMENTS, comment_id).await?;
                }
            }
            self.store.delete(collections::POSTS, post_id).await?;
        }

        let comments = self
            .store
            .query(collections::COMMENTS, "authorId", &author)
            .await?;
        for comment in comments {
            if let Some(comment_id) = doc_id(&comment) {
                self.store.delete(collections::COMMENTS, comment_id).await?;
            }
        }
        Ok(())
    }

    /// The member's conversation document and its whole message subtree.
    async fn delete_conversations(&self, member_id: &str) -> MembershipResult<()> {
        self.store.clear(&collections::messages(member_id)).await?;
        self.store.delete(collections::CONVERSATIONS, member_id).await
    }
}
