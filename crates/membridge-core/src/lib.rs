//! membridge core library
//!
//! Shared types for the membership-API bridge.
//!
//! # Modules
//!
//! - [`model`] - Domain models (remote users/groups, share mappings, queued tasks)
//! - [`config`] - Explicit, injectable sync configuration
//! - [`error`] - Error types shared across the store and identity seams
//! - [`identity`] - The host platform's identity/storage capability trait
//! - [`store`] - Persistence traits for locally owned state

pub mod config;
pub mod error;
pub mod identity;
pub mod model;
pub mod store;

pub use config::SyncConfig;
pub use error::{IdentityError, StoreError};
pub use identity::{Folder, FolderId, IdentityStore, LocalShare, ShareId, SharePermissions};
pub use model::{
    GroupMembership, GroupShareMapping, MappingState, MembershipTier, QueuedTask, RemoteGroup,
    RemoteUser, TaskType,
};
pub use store::{GroupShareStore, QueuedTaskStore};
