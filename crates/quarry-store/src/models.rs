//! Records returned by the directory

use chrono::{DateTime, Utc};
use quarry_connector::Role;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Organization {
    pub id: i64,
    pub name: String,
    pub admin_email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// A user's seat in one organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Member {
    pub email: String,
    pub role: Role,
}

/// One of the organizations a user belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrganizationMembership {
    pub organization: Organization,
    pub role: Role,
}

/// What an invitation did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InviteOutcome {
    Added(Member),
    /// The user was already in the organization; their role is unchanged
    AlreadyMember(Member),
}

impl InviteOutcome {
    pub fn member(&self) -> &Member {
        match self {
            InviteOutcome::Added(member) | InviteOutcome::AlreadyMember(member) => member,
        }
    }
}

/// Lower-cased, trimmed e-mail used as the user key
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
