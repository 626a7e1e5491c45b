//! In-memory doubles for the host identity store and the persistence
//! traits, plus mock-API helpers shared by the engine tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use membridge_api::ApiClient;
use membridge_core::{
    Folder, FolderId, GroupShareMapping, GroupShareStore, IdentityError, IdentityStore,
    LocalShare, QueuedTask, QueuedTaskStore, ShareId, SharePermissions, StoreError, SyncConfig,
    TaskType,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};
use wiremock::MockServer;

// ── Test wiring ───────────────────────────────────────────────────────

pub fn config_for(server: &MockServer) -> Arc<SyncConfig> {
    let mut config = SyncConfig::new(format!("{}/", server.uri()), "api-key");
    config.admin_groups = vec!["IT Board".to_string()];
    Arc::new(config)
}

pub fn client_for(config: &SyncConfig) -> Arc<ApiClient> {
    Arc::new(ApiClient::with_http_client(&config.api_base_url, reqwest_client()).unwrap())
}

fn reqwest_client() -> reqwest::Client {
    reqwest::Client::new()
}

/// A groups list envelope with no further pages.
pub fn groups_page(groups: &[(&str, &str, bool)]) -> serde_json::Value {
    let items: Vec<_> = groups
        .iter()
        .map(|(gid, name, storage)| {
            serde_json::json!({"_id": gid, "name": name, "requires_storage": storage})
        })
        .collect();
    serde_json::json!({"_items": items, "_meta": {"total": items.len()}, "_links": {}})
}

/// A memberships list envelope with embedded group documents.
pub fn memberships_page(uid: &str, groups: &[(&str, &str, bool)]) -> serde_json::Value {
    let items: Vec<_> = groups
        .iter()
        .map(|(gid, name, storage)| {
            serde_json::json!({
                "user": uid,
                "group": {"_id": gid, "name": name, "requires_storage": storage}
            })
        })
        .collect();
    serde_json::json!({"_items": items, "_meta": {"total": items.len()}, "_links": {}})
}

/// A memberships list envelope with bare user/group id pairs.
pub fn membership_ids_page(pairs: &[(&str, &str)]) -> serde_json::Value {
    let items: Vec<_> = pairs
        .iter()
        .map(|(user, group)| serde_json::json!({"user": user, "group": group}))
        .collect();
    serde_json::json!({"_items": items, "_meta": {"total": items.len()}, "_links": {}})
}

pub fn user_doc(uid: &str, membership: &str) -> serde_json::Value {
    serde_json::json!({
        "_id": uid,
        "email": format!("{uid}@example.org"),
        "firstname": uid,
        "lastname": "Remote",
        "membership": membership
    })
}

// ── In-memory identity store ──────────────────────────────────────────

#[derive(Debug, Default, Clone)]
struct UserRecord {
    display_name: String,
    email: String,
    quota: String,
}

#[derive(Debug, Default)]
struct IdentityState {
    users: BTreeMap<String, UserRecord>,
    groups: BTreeMap<String, BTreeSet<String>>,
    folders: BTreeMap<FolderId, String>,
    shares: BTreeMap<ShareId, LocalShare>,
    next_folder_id: FolderId,
    next_share_id: ShareId,
}

/// In-memory [`IdentityStore`] standing in for the host platform.
#[derive(Default)]
pub struct MemoryIdentityStore {
    state: Mutex<IdentityState>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Assertion helpers.

    pub fn folder_names(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.folders.values().cloned().collect()
    }

    pub fn folder_count(&self) -> usize {
        self.state.lock().unwrap().folders.len()
    }

    pub fn share_count(&self) -> usize {
        self.state.lock().unwrap().shares.len()
    }

    pub fn shares(&self) -> Vec<LocalShare> {
        self.state.lock().unwrap().shares.values().cloned().collect()
    }

    pub fn members_of(&self, gid: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .groups
            .get(gid)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn groups_of(&self, uid: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .groups
            .iter()
            .filter(|(_, members)| members.contains(uid))
            .map(|(gid, _)| gid.clone())
            .collect()
    }

    pub fn display_name_of(&self, uid: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state.users.get(uid).map(|user| user.display_name.clone())
    }

    pub fn folder_name(&self, folder_id: FolderId) -> Option<String> {
        self.state.lock().unwrap().folders.get(&folder_id).cloned()
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn user_exists(&self, uid: &str) -> Result<bool, IdentityError> {
        Ok(self.state.lock().unwrap().users.contains_key(uid))
    }

    async fn create_user(&self, uid: &str, _password: &str) -> Result<(), IdentityError> {
        let mut state = self.state.lock().unwrap();
        if state.users.contains_key(uid) {
            return Err(IdentityError::AlreadyExists {
                resource: "user",
                id: uid.to_string(),
            });
        }
        state.users.insert(uid.to_string(), UserRecord::default());
        Ok(())
    }

    async fn set_display_name(&self, uid: &str, display_name: &str) -> Result<(), IdentityError> {
        let mut state = self.state.lock().unwrap();
        let user = state.users.get_mut(uid).ok_or(IdentityError::NotFound {
            resource: "user",
            id: uid.to_string(),
        })?;
        user.display_name = display_name.to_string();
        Ok(())
    }

    async fn set_email(&self, uid: &str, email: &str) -> Result<(), IdentityError> {
        let mut state = self.state.lock().unwrap();
        let user = state.users.get_mut(uid).ok_or(IdentityError::NotFound {
            resource: "user",
            id: uid.to_string(),
        })?;
        user.email = email.to_string();
        Ok(())
    }

    async fn set_quota(&self, uid: &str, quota: &str) -> Result<(), IdentityError> {
        let mut state = self.state.lock().unwrap();
        let user = state.users.get_mut(uid).ok_or(IdentityError::NotFound {
            resource: "user",
            id: uid.to_string(),
        })?;
        user.quota = quota.to_string();
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<String>, IdentityError> {
        Ok(self.state.lock().unwrap().users.keys().cloned().collect())
    }

    async fn group_exists(&self, gid: &str) -> Result<bool, IdentityError> {
        Ok(self.state.lock().unwrap().groups.contains_key(gid))
    }

    async fn create_group(&self, gid: &str) -> Result<(), IdentityError> {
        let mut state = self.state.lock().unwrap();
        if state.groups.contains_key(gid) {
            return Err(IdentityError::AlreadyExists {
                resource: "group",
                id: gid.to_string(),
            });
        }
        state.groups.insert(gid.to_string(), BTreeSet::new());
        Ok(())
    }

    async fn add_to_group(&self, uid: &str, gid: &str) -> Result<(), IdentityError> {
        let mut state = self.state.lock().unwrap();
        let members = state.groups.get_mut(gid).ok_or(IdentityError::NotFound {
            resource: "group",
            id: gid.to_string(),
        })?;
        members.insert(uid.to_string());
        Ok(())
    }

    async fn remove_from_group(&self, uid: &str, gid: &str) -> Result<(), IdentityError> {
        let mut state = self.state.lock().unwrap();
        if let Some(members) = state.groups.get_mut(gid) {
            members.remove(uid);
        }
        Ok(())
    }

    async fn user_groups(&self, uid: &str) -> Result<Vec<String>, IdentityError> {
        Ok(self.groups_of(uid))
    }

    async fn group_members(&self, gid: &str) -> Result<Vec<String>, IdentityError> {
        Ok(self.members_of(gid))
    }

    async fn find_folder(
        &self,
        _owner: &str,
        folder_id: FolderId,
    ) -> Result<Option<Folder>, IdentityError> {
        let state = self.state.lock().unwrap();
        Ok(state.folders.get(&folder_id).map(|name| Folder {
            id: folder_id,
            name: name.clone(),
        }))
    }

    async fn find_folder_by_name(
        &self,
        _owner: &str,
        name: &str,
    ) -> Result<Option<Folder>, IdentityError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .folders
            .iter()
            .find(|(_, folder_name)| folder_name.as_str() == name)
            .map(|(id, folder_name)| Folder {
                id: *id,
                name: folder_name.clone(),
            }))
    }

    async fn create_folder(&self, _owner: &str, name: &str) -> Result<Folder, IdentityError> {
        let mut state = self.state.lock().unwrap();
        if state.folders.values().any(|folder_name| folder_name == name) {
            return Err(IdentityError::AlreadyExists {
                resource: "folder",
                id: name.to_string(),
            });
        }
        state.next_folder_id += 1;
        let id = state.next_folder_id;
        state.folders.insert(id, name.to_string());
        Ok(Folder {
            id,
            name: name.to_string(),
        })
    }

    async fn rename_folder(
        &self,
        _owner: &str,
        folder_id: FolderId,
        new_name: &str,
    ) -> Result<(), IdentityError> {
        let mut state = self.state.lock().unwrap();
        let name = state.folders.get_mut(&folder_id).ok_or(IdentityError::NotFound {
            resource: "folder",
            id: folder_id.to_string(),
        })?;
        *name = new_name.to_string();
        Ok(())
    }

    async fn delete_folder(&self, _owner: &str, folder_id: FolderId) -> Result<(), IdentityError> {
        let mut state = self.state.lock().unwrap();
        if state.folders.remove(&folder_id).is_none() {
            return Err(IdentityError::NotFound {
                resource: "folder",
                id: folder_id.to_string(),
            });
        }
        // Shares go with the folder.
        state.shares.retain(|_, share| share.folder_id != folder_id);
        Ok(())
    }

    async fn group_shares_on_folder(
        &self,
        _owner: &str,
        folder_id: FolderId,
    ) -> Result<Vec<LocalShare>, IdentityError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .shares
            .values()
            .filter(|share| share.folder_id == folder_id)
            .cloned()
            .collect())
    }

    async fn create_group_share(
        &self,
        _owner: &str,
        folder_id: FolderId,
        gid: &str,
        permissions: SharePermissions,
    ) -> Result<ShareId, IdentityError> {
        let mut state = self.state.lock().unwrap();
        if !state.folders.contains_key(&folder_id) {
            return Err(IdentityError::NotFound {
                resource: "folder",
                id: folder_id.to_string(),
            });
        }
        state.next_share_id += 1;
        let id = state.next_share_id;
        state.shares.insert(
            id,
            LocalShare {
                id,
                folder_id,
                shared_with: gid.to_string(),
                permissions,
            },
        );
        Ok(id)
    }

    async fn delete_share(&self, share_id: ShareId) -> Result<(), IdentityError> {
        self.state.lock().unwrap().shares.remove(&share_id);
        Ok(())
    }
}

// ── In-memory share-mapping store ─────────────────────────────────────

#[derive(Default)]
struct ShareStoreState {
    rows: Vec<GroupShareMapping>,
    next_id: i64,
}

/// In-memory [`GroupShareStore`] enforcing the uniqueness invariants.
#[derive(Default)]
pub struct MemoryShareStore {
    state: Mutex<ShareStoreState>,
}

impl MemoryShareStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a row directly, bypassing the engine (for retention tests).
    pub fn seed(&self, gid: &str, folder_id: i64, deleted_at: Option<DateTime<Utc>>) -> i64 {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = state.next_id;
        state.rows.push(GroupShareMapping {
            id,
            gid: gid.to_string(),
            folder_id,
            deleted_at,
        });
        id
    }

    pub fn rows(&self) -> Vec<GroupShareMapping> {
        self.state.lock().unwrap().rows.clone()
    }
}

#[async_trait]
impl GroupShareStore for MemoryShareStore {
    async fn find_by_gid(&self, gid: &str) -> Result<Option<GroupShareMapping>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state.rows.iter().find(|row| row.gid == gid).cloned())
    }

    async fn find_by_folder(
        &self,
        folder_id: i64,
    ) -> Result<Option<GroupShareMapping>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state.rows.iter().find(|row| row.folder_id == folder_id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<GroupShareMapping>, StoreError> {
        Ok(self.rows())
    }

    async fn list_deleted_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<GroupShareMapping>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .rows
            .iter()
            .filter(|row| row.deleted_at.is_some_and(|at| at < cutoff))
            .cloned()
            .collect())
    }

    async fn insert(&self, gid: &str, folder_id: i64) -> Result<GroupShareMapping, StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.rows.iter().any(|row| row.gid == gid) {
            return Err(StoreError::Conflict {
                message: format!("gid already mapped: {gid}"),
            });
        }
        if state.rows.iter().any(|row| row.folder_id == folder_id) {
            return Err(StoreError::Conflict {
                message: format!("folder already mapped: {folder_id}"),
            });
        }
        state.next_id += 1;
        let row = GroupShareMapping {
            id: state.next_id,
            gid: gid.to_string(),
            folder_id,
            deleted_at: None,
        };
        state.rows.push(row.clone());
        Ok(row)
    }

    async fn set_folder(&self, id: i64, folder_id: i64) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        if state
            .rows
            .iter()
            .any(|row| row.folder_id == folder_id && row.id != id)
        {
            return Err(StoreError::Conflict {
                message: format!("folder already mapped: {folder_id}"),
            });
        }
        let row = state
            .rows
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or(StoreError::NotFound { id })?;
        row.folder_id = folder_id;
        Ok(())
    }

    async fn mark_deleted(&self, id: i64, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        let row = state
            .rows
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or(StoreError::NotFound { id })?;
        row.deleted_at = Some(at);
        Ok(())
    }

    async fn restore(&self, id: i64) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        let row = state
            .rows
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or(StoreError::NotFound { id })?;
        row.deleted_at = None;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.rows.retain(|row| row.id != id);
        Ok(())
    }
}

// ── In-memory task queue ──────────────────────────────────────────────

#[derive(Default)]
struct QueueState {
    rows: Vec<QueuedTask>,
    next_id: i64,
}

/// In-memory FIFO [`QueuedTaskStore`].
#[derive(Default)]
pub struct MemoryQueueStore {
    state: Mutex<QueueState>,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().rows.len()
    }
}

#[async_trait]
impl QueuedTaskStore for MemoryQueueStore {
    async fn enqueue(&self, task_type: TaskType, parameter: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = state.next_id;
        state.rows.push(QueuedTask {
            id,
            task_type,
            parameter: parameter.to_string(),
        });
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<QueuedTask>, StoreError> {
        Ok(self.state.lock().unwrap().rows.clone())
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.rows.retain(|row| row.id != id);
        Ok(())
    }
}
