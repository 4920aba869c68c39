//! Domain types and their storage-boundary records.
//!
//! Domain structs (`Member`, `Profile`, `MentorshipEdge`) are what the
//! components work with. Stored documents are schemaless JSON objects with
//! camelCase field names; the flat `MemberRecord` shape exists only to
//! convert between the two at the store boundary.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{MembershipError, MembershipResult};
use crate::store::Document;

/// Role tag for a member account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Pending,
    Admin,
    Mentor,
    Participant,
    Staff,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Admin => write!(f, "admin"),
            Self::Mentor => write!(f, "mentor"),
            Self::Participant => write!(f, "participant"),
            Self::Staff => write!(f, "staff"),
        }
    }
}

impl FromStr for Role {
    type Err = MembershipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "admin" => Ok(Self::Admin),
            "mentor" => Ok(Self::Mentor),
            "participant" => Ok(Self::Participant),
            "staff" => Ok(Self::Staff),
            other => Err(MembershipError::invalid_role(format!(
                "unknown role '{other}'"
            ))),
        }
    }
}

/// Role with its role-specific data.
///
/// Stored member documents carry the role tag and every optional
/// role-specific field side by side; in the domain model the data only
/// exists in the matching variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberRole {
    Pending,
    Admin,
    Mentor,
    /// `element` is the cosmetic categorical tag participants pick at intake.
    Participant { element: Option<String> },
    Staff,
}

impl MemberRole {
    pub fn kind(&self) -> Role {
        match self {
            Self::Pending => Role::Pending,
            Self::Admin => Role::Admin,
            Self::Mentor => Role::Mentor,
            Self::Participant { .. } => Role::Participant,
            Self::Staff => Role::Staff,
        }
    }

    /// Rebuild the variant from the flat storage shape. Role-specific fields
    /// attached to a non-matching role tag are dropped.
    pub fn from_parts(role: Role, element: Option<String>) -> Self {
        match role {
            Role::Pending => Self::Pending,
            Role::Admin => Self::Admin,
            Role::Mentor => Self::Mentor,
            Role::Participant => Self::Participant { element },
            Role::Staff => Self::Staff,
        }
    }
}

/// A member account: an applicant (`pending`, inactive) or an approved,
/// active member with an assigned role.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub id: String,
    pub email: String,
    pub role: MemberRole,
    pub is_active: bool,
    pub location: Option<String>,
    /// Intake questionnaire answers, carried verbatim onto the profile
    /// at approval time.
    pub intake: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Member {
    pub fn is_pending(&self) -> bool {
        self.role.kind() == Role::Pending
    }

    pub fn from_doc(doc: Document) -> MembershipResult<Self> {
        let record: MemberRecord = serde_json::from_value(doc)?;
        Ok(record.into())
    }

    pub fn to_doc(&self) -> MembershipResult<Document> {
        Ok(serde_json::to_value(MemberRecord::from(self.clone()))?)
    }
}

/// Flat storage-boundary shape for a member document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberRecord {
    pub id: String,
    pub email: String,
    pub role: Role,
    #[serde(rename = "isActive")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub intake: Value,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<Member> for MemberRecord {
    fn from(member: Member) -> Self {
        let (role, element) = match member.role {
            MemberRole::Participant { element } => (Role::Participant, element),
            other => (other.kind(), None),
        };
        Self {
            id: member.id,
            email: member.email,
            role,
            is_active: member.is_active,
            element,
            location: member.location,
            intake: member.intake,
            created_at: member.created_at,
            updated_at: member.updated_at,
        }
    }
}

impl From<MemberRecord> for Member {
    fn from(record: MemberRecord) -> Self {
        Self {
            id: record.id,
            email: record.email,
            role: MemberRole::from_parts(record.role, record.element),
            is_active: record.is_active,
            location: record.location,
            intake: record.intake,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Public-facing denormalized view of an active non-staff member,
/// keyed 1:1 by the member id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(rename = "associatedId")]
    pub associated_id: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(rename = "photoURL", default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(rename = "followersCount")]
    pub followers_count: u64,
    #[serde(rename = "followingCount")]
    pub following_count: u64,
    #[serde(rename = "postsCount")]
    pub posts_count: u64,
    /// Mirrors the member's role.
    pub role: Role,
    #[serde(default)]
    pub intake: Value,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// The profile created when a pending member is approved: counters
    /// seeded to zero, intake answers carried over verbatim.
    pub fn seed(member: &Member, role: Role, now: DateTime<Utc>) -> Self {
        let display_name = member
            .intake
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_else(|| member.email.split('@').next().unwrap_or(&member.email))
            .to_string();
        Self {
            associated_id: member.id.clone(),
            display_name,
            bio: String::new(),
            photo_url: None,
            followers_count: 0,
            following_count: 0,
            posts_count: 0,
            role,
            intake: member.intake.clone(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// One mentor-participant relationship. Edges are never mutated in place;
/// reassignment is delete + create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MentorshipEdge {
    pub id: String,
    #[serde(rename = "mentorId")]
    pub mentor_id: String,
    #[serde(rename = "participantId")]
    pub participant_id: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl MentorshipEdge {
    pub fn new(mentor_id: &str, participant_id: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            mentor_id: mentor_id.to_string(),
            participant_id: participant_id.to_string(),
            created_at: Utc::now(),
        }
    }
}
