//! Host platform identity/storage capability.
//!
//! The bridge never talks to the collaboration platform directly; everything
//! it needs (accounts, groups, folders, shares) goes through this trait.
//! The engine receives an implementation by injection, integration tests use
//! an in-memory one.

use crate::error::IdentityError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Identifier of a folder in the host storage subsystem.
pub type FolderId = i64;

/// Identifier of a share in the host sharing subsystem.
pub type ShareId = i64;

/// A folder under the file-owner account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: FolderId,
    pub name: String,
}

/// A group-type share on a folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalShare {
    pub id: ShareId,
    pub folder_id: FolderId,
    /// Group id the folder is shared with.
    pub shared_with: String,
    pub permissions: SharePermissions,
}

/// Share permission bitmask, following the host platform's constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharePermissions(pub u32);

impl SharePermissions {
    pub const READ: SharePermissions = SharePermissions(1);
    pub const UPDATE: SharePermissions = SharePermissions(2);
    pub const CREATE: SharePermissions = SharePermissions(4);
    pub const DELETE: SharePermissions = SharePermissions(8);
    pub const SHARE: SharePermissions = SharePermissions(16);

    /// Everything except re-sharing.
    pub const GROUP_FOLDER: SharePermissions = SharePermissions(1 | 2 | 4 | 8);

    #[must_use]
    pub fn contains(self, other: SharePermissions) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for SharePermissions {
    type Output = SharePermissions;

    fn bitor(self, rhs: SharePermissions) -> SharePermissions {
        SharePermissions(self.0 | rhs.0)
    }
}

/// Capability set the reconciliation engine requires from the host platform.
///
/// Implementations must be safe to call concurrently; the engine serializes
/// folder mutations per group id itself.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    // ── Users ─────────────────────────────────────────────────────────

    async fn user_exists(&self, uid: &str) -> Result<bool, IdentityError>;

    /// Create a local account. The password only satisfies the host's
    /// account-creation API; authentication happens against the remote API.
    async fn create_user(&self, uid: &str, password: &str) -> Result<(), IdentityError>;

    async fn set_display_name(&self, uid: &str, display_name: &str) -> Result<(), IdentityError>;

    async fn set_email(&self, uid: &str, email: &str) -> Result<(), IdentityError>;

    async fn set_quota(&self, uid: &str, quota: &str) -> Result<(), IdentityError>;

    /// All local account ids managed by the host.
    async fn list_users(&self) -> Result<Vec<String>, IdentityError>;

    // ── Groups ────────────────────────────────────────────────────────

    async fn group_exists(&self, gid: &str) -> Result<bool, IdentityError>;

    async fn create_group(&self, gid: &str) -> Result<(), IdentityError>;

    async fn add_to_group(&self, uid: &str, gid: &str) -> Result<(), IdentityError>;

    async fn remove_from_group(&self, uid: &str, gid: &str) -> Result<(), IdentityError>;

    /// Group ids the user currently belongs to.
    async fn user_groups(&self, uid: &str) -> Result<Vec<String>, IdentityError>;

    /// User ids currently in the group; empty if the group does not exist.
    async fn group_members(&self, gid: &str) -> Result<Vec<String>, IdentityError>;

    // ── Folders (under a named owner account) ─────────────────────────

    async fn find_folder(
        &self,
        owner: &str,
        folder_id: FolderId,
    ) -> Result<Option<Folder>, IdentityError>;

    async fn find_folder_by_name(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<Option<Folder>, IdentityError>;

    async fn create_folder(&self, owner: &str, name: &str) -> Result<Folder, IdentityError>;

    async fn rename_folder(
        &self,
        owner: &str,
        folder_id: FolderId,
        new_name: &str,
    ) -> Result<(), IdentityError>;

    /// Delete a folder and, transitively, its shares.
    async fn delete_folder(&self, owner: &str, folder_id: FolderId) -> Result<(), IdentityError>;

    // ── Shares ────────────────────────────────────────────────────────

    /// Group-type shares created by `owner` on the given folder.
    async fn group_shares_on_folder(
        &self,
        owner: &str,
        folder_id: FolderId,
    ) -> Result<Vec<LocalShare>, IdentityError>;

    async fn create_group_share(
        &self,
        owner: &str,
        folder_id: FolderId,
        gid: &str,
        permissions: SharePermissions,
    ) -> Result<ShareId, IdentityError>;

    async fn delete_share(&self, share_id: ShareId) -> Result<(), IdentityError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_folder_permissions_exclude_resharing() {
        let p = SharePermissions::GROUP_FOLDER;
        assert!(p.contains(SharePermissions::READ));
        assert!(p.contains(SharePermissions::UPDATE));
        assert!(p.contains(SharePermissions::CREATE));
        assert!(p.contains(SharePermissions::DELETE));
        assert!(!p.contains(SharePermissions::SHARE));
    }

    #[test]
    fn permissions_bitor() {
        let p = SharePermissions::READ | SharePermissions::SHARE;
        assert_eq!(p.0, 17);
        assert!(p.contains(SharePermissions::SHARE));
    }
}
