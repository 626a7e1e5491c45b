//! Typed HTTP client for the remote membership API.
//!
//! The remote service is the single source of truth for users, groups, and
//! group memberships; this crate only reads it (plus session create/delete
//! for authentication probes).

pub mod client;
pub mod dto;
pub mod error;
pub mod page;
pub mod query;

pub use client::ApiClient;
pub use dto::{
    ApiGroup, ApiGroupMembership, ApiSession, ApiUser, Expandable, Link, Links, ListResponse, Meta,
};
pub use error::{ApiError, ApiResult};
pub use page::Pages;
pub use query::ListQuery;
