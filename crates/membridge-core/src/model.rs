//! Domain models for the membership bridge.
//!
//! Remote users, groups, and memberships are owned by the remote API; this
//! system only holds cached projections of them. Share mappings and queued
//! tasks are owned locally and mutated exclusively by the reconciliation
//! engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Membership tier of a remote user, as reported by the membership API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipTier {
    /// Not a member (external account).
    None,
    Regular,
    Extraordinary,
    Honorary,
}

impl MembershipTier {
    /// Whether this tier counts as an actual member of the organization.
    #[must_use]
    pub fn is_member(self) -> bool {
        self != MembershipTier::None
    }

    /// Wire name of the tier as used in API filters.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MembershipTier::None => "none",
            MembershipTier::Regular => "regular",
            MembershipTier::Extraordinary => "extraordinary",
            MembershipTier::Honorary => "honorary",
        }
    }
}

/// A user as known to the remote membership API.
///
/// The authoritative copy lives remotely; local state is a projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteUser {
    /// Stable remote identifier, used as the local account name.
    pub uid: String,
    pub email: String,
    /// Display name assembled from the remote first/last name.
    pub display_name: String,
    pub tier: MembershipTier,
}

/// A group as known to the remote membership API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteGroup {
    /// Stable remote identifier, used as the local group id.
    pub gid: String,
    /// Human-readable group name; also the shared folder name.
    pub name: String,
    /// Whether the group gets a shared storage folder.
    pub requires_storage: bool,
}

/// A (user, group) membership pair sourced from the remote API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMembership {
    pub user: String,
    pub group: String,
}

/// Lifecycle state of a [`GroupShareMapping`].
///
/// Hard-deleted mappings have no state: the row is gone. The transition is
/// monotonic: a row never comes back after hard deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingState {
    Active,
    /// Soft-deleted at the given instant, awaiting retention expiry.
    PendingDeletion(DateTime<Utc>),
}

/// Locally persisted link between a remote group and its shared folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupShareMapping {
    /// Surrogate key.
    pub id: i64,
    /// Remote group identifier. At most one active mapping per gid.
    pub gid: String,
    /// Local folder identifier. At most one mapping per folder.
    pub folder_id: i64,
    /// Soft-deletion timestamp; `None` while the mapping is active.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl GroupShareMapping {
    #[must_use]
    pub fn state(&self) -> MappingState {
        match self.deleted_at {
            None => MappingState::Active,
            Some(at) => MappingState::PendingDeletion(at),
        }
    }

    /// Whether the retention window has fully elapsed at `now`.
    #[must_use]
    pub fn retention_expired(&self, now: DateTime<Utc>, retention: chrono::Duration) -> bool {
        match self.deleted_at {
            Some(at) => now - at > retention,
            None => false,
        }
    }
}

/// Kind of deferred work carried by a [`QueuedTask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Parameter is the remote user id to sync.
    SyncUser,
    /// Parameter is the remote session token to clear.
    ClearSession,
}

impl TaskType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::SyncUser => "sync_user",
            TaskType::ClearSession => "clear_session",
        }
    }

    /// Parse the stored wire name back into a task type.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sync_user" => Some(TaskType::SyncUser),
            "clear_session" => Some(TaskType::ClearSession),
            _ => None,
        }
    }
}

/// A queued unit of deferred per-login/per-logout work.
///
/// Drained FIFO with at-most-once semantics: the runner deletes the row
/// whether or not the task succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedTask {
    pub id: i64,
    pub task_type: TaskType,
    pub parameter: String,
}
