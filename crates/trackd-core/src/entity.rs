// crates/trackd-core/src/entity.rs
//
// Domain entities for the project-tracking service.
//
// These are the persistence-layer shapes held by the repositories. The
// public response shapes (without password hashes) live with the
// services that expose them; `Identity` is the trimmed view that
// travels through sessions and the call context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub uuid: Uuid,
    pub username: String,
    /// bcrypt hash, never the raw password.
    pub password_hash: String,
    pub email: String,
    pub enable: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The authenticated identity attached to sessions and verified calls.
/// Carries no secret material.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub uuid: Uuid,
    pub username: String,
    pub email: String,
    pub enable: bool,
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Identity {
            uuid: user.uuid,
            username: user.username.clone(),
            email: user.email.clone(),
            enable: user.enable,
        }
    }
}

/// Lifecycle state of an issue.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Backlog,
    Todo,
    InProgress,
    Done,
    Cancelled,
}

impl Default for IssueStatus {
    fn default() -> Self {
        IssueStatus::Backlog
    }
}

/// A tracked work item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub uuid: Uuid,
    pub title: String,
    pub description: String,
    pub status: IssueStatus,
    /// Story-point estimate; 0 when unestimated.
    pub estimate: u64,
    pub creator: Option<Uuid>,
    pub assignee: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
