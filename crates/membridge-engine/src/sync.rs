//! The reconciliation engine.
//!
//! Diffs authoritative remote state (users, groups, memberships) against
//! local state and applies the minimal set of mutations through the
//! [`IdentityStore`]. Every step is idempotent: re-running a sync with
//! unchanged remote state performs no mutations, and a sync interrupted by
//! an API outage converges on the next run.

use crate::error::{SyncError, SyncResult};
use crate::locks::KeyedLocks;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use membridge_api::{ApiClient, ListQuery};
use membridge_core::{
    Folder, GroupShareStore, IdentityError, IdentityStore, RemoteGroup, RemoteUser,
    SharePermissions, SyncConfig,
};
use rand::RngCore;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Length of the generated never-stored provisioning password.
const PASSWORD_LENGTH: usize = 30;

/// Page size for authoritative listings.
const PAGE_SIZE: u32 = 100;

/// Counters from a [`ApiSync::sync_all_users`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserSyncStats {
    pub synced: u32,
    /// Local accounts with no remote counterpart (locally managed).
    pub skipped: u32,
    pub failed: u32,
}

/// Counters from a [`ApiSync::sync_shares`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShareSyncStats {
    /// Groups whose folder and share were reconciled.
    pub synced: u32,
    /// Groups whose folder reconciliation failed (logged, skipped).
    pub failed: u32,
    /// Mappings newly soft-deleted this cycle.
    pub soft_deleted: u32,
}

/// The reconciliation engine.
///
/// Single-threaded per invocation; safe to invoke concurrently with itself
/// (folder mutations are serialized per group id).
pub struct ApiSync {
    client: Arc<ApiClient>,
    identity: Arc<dyn IdentityStore>,
    shares: Arc<dyn GroupShareStore>,
    config: Arc<SyncConfig>,
    folder_locks: KeyedLocks,
}

impl ApiSync {
    #[must_use]
    pub fn new(
        client: Arc<ApiClient>,
        identity: Arc<dyn IdentityStore>,
        shares: Arc<dyn GroupShareStore>,
        config: Arc<SyncConfig>,
    ) -> Self {
        Self {
            client,
            identity,
            shares,
            config,
            folder_locks: KeyedLocks::new(),
        }
    }

    fn token(&self) -> Option<&str> {
        Some(self.config.api_token.as_str())
    }

    // ── Per-user sync ─────────────────────────────────────────────────

    /// Converge one local account with its remote counterpart.
    ///
    /// Profile fields are updated, storage-bearing group memberships are
    /// mirrored (groups and folders created lazily), admin rights granted
    /// per the allowlist, and stale managed memberships pruned. If the
    /// authoritative membership listing cannot be fetched the whole sync
    /// aborts with an error; the caller decides fail-open vs fail-closed.
    pub async fn sync_user(&self, remote: &RemoteUser) -> SyncResult<()> {
        let uid = remote.uid.as_str();

        if self.identity.user_exists(uid).await? {
            self.identity.set_display_name(uid, &remote.display_name).await?;
            self.identity.set_email(uid, &remote.email).await?;
        } else {
            self.create_user(remote).await?;
        }

        // Authoritative memberships, with the group documents embedded.
        let query = ListQuery::new()
            .filter(json!({ "user": uid }))
            .embedded(json!({ "group": 1 }))
            .max_results(PAGE_SIZE);
        let memberships = self
            .client
            .group_memberships_pages(query, self.token())
            .collect_all()
            .await?;

        let mut justified: HashSet<String> = HashSet::new();
        let mut admin_justified = false;

        for membership in &memberships {
            let Some(api_group) = membership.group.expanded() else {
                warn!(
                    uid,
                    group = membership.group.id(),
                    "membership listing did not embed the group, skipping"
                );
                continue;
            };
            let group = RemoteGroup::from(api_group.clone());

            if group.requires_storage {
                self.ensure_group_member(uid, &group.gid).await?;
                self.create_or_update_group_folder(&group).await?;
                justified.insert(group.gid.clone());
            }

            if self.config.is_admin_group(&group.name) {
                admin_justified = true;
            }
        }

        if admin_justified {
            self.ensure_group_member(uid, &self.config.local_admin_group).await?;
        }

        self.prune_memberships(remote, &justified, admin_justified).await?;

        if remote.tier.is_member() {
            self.ensure_group_member(uid, &self.config.internal_group).await?;
        }

        debug!(uid, groups = justified.len(), "user sync complete");
        Ok(())
    }

    /// Resolve a remote user by id and sync it. A missing remote user is a
    /// distinct error so the caller can tell "locally managed" apart from
    /// an API failure.
    pub async fn sync_user_by_id(&self, uid: &str) -> SyncResult<()> {
        match self.client.find_user(uid, self.token()).await? {
            Some(api_user) => self.sync_user(&RemoteUser::from(api_user)).await,
            None => Err(SyncError::UserNotFound {
                uid: uid.to_string(),
            }),
        }
    }

    /// Sync every local account that has a remote counterpart.
    ///
    /// Per-user isolation: one user failing (or not existing remotely) never
    /// aborts the batch.
    pub async fn sync_all_users(&self) -> SyncResult<UserSyncStats> {
        let mut stats = UserSyncStats::default();

        for uid in self.identity.list_users().await? {
            match self.sync_user_by_id(&uid).await {
                Ok(()) => stats.synced += 1,
                Err(SyncError::UserNotFound { .. }) => {
                    debug!(uid, "no remote counterpart, leaving account untouched");
                    stats.skipped += 1;
                }
                Err(e) => {
                    warn!(uid, error = %e, "user sync failed");
                    stats.failed += 1;
                }
            }
        }

        info!(
            synced = stats.synced,
            skipped = stats.skipped,
            failed = stats.failed,
            "full user sync complete"
        );
        Ok(stats)
    }

    /// Remove the user from every managed local group membership that the
    /// remote no longer justifies. Unmanaged groups are left alone.
    async fn prune_memberships(
        &self,
        remote: &RemoteUser,
        justified: &HashSet<String>,
        admin_justified: bool,
    ) -> SyncResult<()> {
        let uid = remote.uid.as_str();

        for gid in self.identity.user_groups(uid).await? {
            if justified.contains(&gid) {
                continue;
            }
            if gid == self.config.local_admin_group {
                // The pinned file owner keeps admin no matter what.
                if admin_justified || uid == self.config.file_owner_account {
                    continue;
                }
            } else if gid == self.config.internal_group {
                if remote.tier.is_member() {
                    continue;
                }
            } else if self.shares.find_by_gid(&gid).await?.is_none() {
                // Not a bridge-managed group.
                continue;
            }

            self.identity.remove_from_group(uid, &gid).await?;
            info!(uid, gid, "membership pruned");
        }
        Ok(())
    }

    /// Lazily create the local group and add the user to it.
    async fn ensure_group_member(&self, uid: &str, gid: &str) -> SyncResult<()> {
        if !self.identity.group_exists(gid).await? {
            self.identity.create_group(gid).await?;
            info!(gid, "local group created");
        }
        self.identity.add_to_group(uid, gid).await?;
        Ok(())
    }

    // ── Share sync ────────────────────────────────────────────────────

    /// Converge shared folders with the authoritative set of groups that
    /// require storage.
    ///
    /// Groups missing from the listing get their mapping soft-deleted (not
    /// their folder; transient listing gaps must not destroy data);
    /// reappearing groups are restored in
    /// [`Self::create_or_update_group_folder`].
    pub async fn sync_shares(&self) -> SyncResult<ShareSyncStats> {
        let query = ListQuery::new()
            .filter(json!({ "requires_storage": true }))
            .max_results(PAGE_SIZE);
        // Pagination failure aborts the cycle: acting on a truncated listing
        // would soft-delete every mapping beyond the truncation point.
        let groups = self
            .client
            .groups_pages(query, self.token())
            .collect_all()
            .await?;

        let mut stats = ShareSyncStats::default();
        let mut seen: HashSet<String> = HashSet::new();

        for api_group in groups {
            let group = RemoteGroup::from(api_group);
            seen.insert(group.gid.clone());
            match self.create_or_update_group_folder(&group).await {
                Ok(()) => stats.synced += 1,
                Err(e) => {
                    error!(gid = group.gid, name = group.name, error = %e, "folder reconciliation failed");
                    stats.failed += 1;
                }
            }
        }

        for mapping in self.shares.list_all().await? {
            if seen.contains(&mapping.gid) || mapping.deleted_at.is_some() {
                continue;
            }
            let _guard = self.folder_locks.lock(&mapping.gid).await;
            match self
                .identity
                .find_folder(&self.config.file_owner_account, mapping.folder_id)
                .await?
            {
                Some(folder) => {
                    self.remove_group_shares(folder.id).await?;
                    self.shares.mark_deleted(mapping.id, Utc::now()).await?;
                    stats.soft_deleted += 1;
                    info!(gid = mapping.gid, folder = folder.name, "mapping soft-deleted");
                }
                None => {
                    // Folder is already gone; nothing left to retain.
                    self.shares.delete(mapping.id).await?;
                    info!(gid = mapping.gid, "mapping for vanished folder removed");
                }
            }
        }

        info!(
            synced = stats.synced,
            failed = stats.failed,
            soft_deleted = stats.soft_deleted,
            "share sync complete"
        );
        Ok(stats)
    }

    /// Ensure the group's folder exists, carries the current group name, is
    /// recorded in the mapping table, and is shared with the group.
    ///
    /// Serialized per group id: concurrent syncs cannot race two folders
    /// into existence for the same group.
    pub async fn create_or_update_group_folder(&self, group: &RemoteGroup) -> SyncResult<()> {
        let _guard = self.folder_locks.lock(&group.gid).await;
        let owner = self.config.file_owner_account.as_str();

        let mapping = self.shares.find_by_gid(&group.gid).await?;
        let existing_folder = match &mapping {
            Some(mapping) => self.identity.find_folder(owner, mapping.folder_id).await?,
            None => None,
        };

        let folder = match existing_folder {
            Some(folder) if folder.name != group.name => {
                self.identity.rename_folder(owner, folder.id, &group.name).await?;
                info!(gid = group.gid, from = folder.name, to = group.name, "folder renamed");
                Folder {
                    id: folder.id,
                    name: group.name.clone(),
                }
            }
            Some(folder) => folder,
            None => self.find_or_allocate_folder(group).await?,
        };

        match mapping {
            Some(mapping) => {
                if mapping.folder_id != folder.id {
                    self.shares.set_folder(mapping.id, folder.id).await?;
                }
                if mapping.deleted_at.is_some() {
                    self.shares.restore(mapping.id).await?;
                    info!(gid = group.gid, "mapping restored before retention expiry");
                }
            }
            None => match self.shares.insert(&group.gid, folder.id).await {
                Ok(_) => {}
                Err(e) if e.is_conflict() => {
                    // A concurrent sync won the insert; its row stands.
                    debug!(gid = group.gid, "mapping insert lost a race, continuing");
                }
                Err(e) => return Err(e.into()),
            },
        }

        let shares = self.identity.group_shares_on_folder(owner, folder.id).await?;
        if !shares.iter().any(|share| share.shared_with == group.gid) {
            self.identity
                .create_group_share(owner, folder.id, &group.gid, SharePermissions::GROUP_FOLDER)
                .await?;
            info!(folder = folder.name, gid = group.gid, "shared folder created");
        }

        Ok(())
    }

    /// Find a folder for the group by name, or create one. A folder whose
    /// name is taken by a *different* group's folder is never reused; a
    /// fresh folder with a disambiguated name is allocated instead.
    async fn find_or_allocate_folder(&self, group: &RemoteGroup) -> SyncResult<Folder> {
        let owner = self.config.file_owner_account.as_str();

        match self.identity.find_folder_by_name(owner, &group.name).await? {
            Some(existing) => match self.shares.find_by_folder(existing.id).await? {
                Some(mapping) if mapping.gid != group.gid => {
                    let name = self.disambiguated_name(&group.name).await?;
                    warn!(
                        gid = group.gid,
                        taken = group.name,
                        allocated = name,
                        "folder name collision, allocating a fresh folder"
                    );
                    Ok(self.identity.create_folder(owner, &name).await?)
                }
                _ => Ok(existing),
            },
            None => Ok(self.identity.create_folder(owner, &group.name).await?),
        }
    }

    /// First free `"{base} (n)"` name under the file-owner account.
    async fn disambiguated_name(&self, base: &str) -> SyncResult<String> {
        let owner = self.config.file_owner_account.as_str();
        for n in 2..10_000u32 {
            let candidate = format!("{base} ({n})");
            if self
                .identity
                .find_folder_by_name(owner, &candidate)
                .await?
                .is_none()
            {
                return Ok(candidate);
            }
        }
        Err(IdentityError::backend(format!("no free folder name for '{base}'")).into())
    }

    /// Delete all group-type shares on a folder.
    async fn remove_group_shares(&self, folder_id: i64) -> SyncResult<()> {
        let owner = self.config.file_owner_account.as_str();
        for share in self.identity.group_shares_on_folder(owner, folder_id).await? {
            self.identity.delete_share(share.id).await?;
        }
        Ok(())
    }

    /// Hard-delete mappings (and their folders) whose retention window has
    /// expired.
    ///
    /// Idempotent and safe to run concurrently with [`Self::sync_shares`]:
    /// a folder that is already gone counts as cleaned.
    pub async fn cleanup_shares(&self) -> SyncResult<()> {
        let owner = self.config.file_owner_account.as_str();
        let cutoff = Utc::now() - self.config.share_retention();

        for mapping in self.shares.list_deleted_before(cutoff).await? {
            let _guard = self.folder_locks.lock(&mapping.gid).await;
            match self.identity.find_folder(owner, mapping.folder_id).await? {
                Some(folder) => {
                    self.identity.delete_folder(owner, folder.id).await?;
                    info!(gid = mapping.gid, folder = folder.name, "retired group folder deleted");
                }
                None => {
                    debug!(gid = mapping.gid, "folder already gone");
                }
            }
            self.shares.delete(mapping.id).await?;
        }
        Ok(())
    }

    // ── Admin sync ────────────────────────────────────────────────────

    /// Converge the local admin group with remote admin-group memberships.
    ///
    /// The file-owner account is pinned: it stays admin even when absent
    /// from the remote listing.
    pub async fn sync_admin_users(&self) -> SyncResult<()> {
        let local_admin = self.config.local_admin_group.as_str();
        let file_owner = self.config.file_owner_account.as_str();

        let verified = self.remote_admin_members().await?;

        if !self.identity.group_exists(local_admin).await? {
            self.identity.create_group(local_admin).await?;
        }
        self.identity.add_to_group(file_owner, local_admin).await?;

        for uid in &verified {
            if self.identity.user_exists(uid).await? {
                self.identity.add_to_group(uid, local_admin).await?;
            } else {
                debug!(uid, "remote admin has no local account yet");
            }
        }

        for uid in self.identity.group_members(local_admin).await? {
            if uid == file_owner || verified.contains(&uid) {
                continue;
            }
            self.identity.remove_from_group(&uid, local_admin).await?;
            info!(uid, "admin rights revoked");
        }

        Ok(())
    }

    /// User ids of all members of the configured remote admin groups.
    async fn remote_admin_members(&self) -> SyncResult<HashSet<String>> {
        if self.config.admin_groups.is_empty() {
            return Ok(HashSet::new());
        }

        let query = ListQuery::new()
            .filter(json!({ "name": { "$in": self.config.admin_groups } }))
            .max_results(PAGE_SIZE);
        let admin_gids: Vec<String> = self
            .client
            .groups_pages(query, self.token())
            .collect_all()
            .await?
            .into_iter()
            .map(|group| group.id)
            .collect();

        if admin_gids.is_empty() {
            return Ok(HashSet::new());
        }

        let query = ListQuery::new()
            .filter(json!({ "group": { "$in": admin_gids } }))
            .max_results(PAGE_SIZE);
        let members = self
            .client
            .group_memberships_pages(query, self.token())
            .collect_all()
            .await?
            .into_iter()
            .map(|membership| membership.user)
            .collect();

        Ok(members)
    }

    // ── Account provisioning ──────────────────────────────────────────

    /// Provision a local account for a remote user.
    ///
    /// The password is random and never stored anywhere; it only satisfies
    /// the host's account-creation API. Authentication always goes through
    /// the remote API. Users get no personal quota; their storage lives in
    /// the shared group folders.
    pub async fn create_user(&self, remote: &RemoteUser) -> SyncResult<()> {
        let uid = remote.uid.as_str();
        self.identity.create_user(uid, &generate_password()).await?;
        self.identity.set_display_name(uid, &remote.display_name).await?;
        self.identity.set_email(uid, &remote.email).await?;
        self.identity.set_quota(uid, "0 B").await?;
        info!(uid, "local account provisioned");
        Ok(())
    }

    // ── Sessions ──────────────────────────────────────────────────────

    /// Delete the remote session identified by its token (logout cleanup).
    /// A session that is already gone counts as success.
    pub async fn clear_api_session(&self, token: &str) -> SyncResult<()> {
        match self.client.find_session_by_token(token).await {
            Ok(Some(session)) => {
                match self.client.delete_session(&session.id, &session.etag, token).await {
                    Ok(()) => {
                        debug!(session = session.id, "remote session cleared");
                        Ok(())
                    }
                    Err(e) if e.is_not_found() => Ok(()),
                    Err(e) => Err(e.into()),
                }
            }
            Ok(None) => {
                debug!("session already gone");
                Ok(())
            }
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Random base64 password, truncated to a fixed length. Generated from the
/// OS entropy source and never persisted.
fn generate_password() -> String {
    let mut bytes = [0u8; 24];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    let mut encoded = BASE64.encode(bytes);
    encoded.truncate(PASSWORD_LENGTH);
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_passwords_are_fixed_length_and_unique() {
        let a = generate_password();
        let b = generate_password();
        assert_eq!(a.len(), PASSWORD_LENGTH);
        assert_eq!(b.len(), PASSWORD_LENGTH);
        assert_ne!(a, b);
    }
}
