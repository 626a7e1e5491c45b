//! Wire types for the remote membership API.
//!
//! The API is an Eve-style REST service: list endpoints return an
//! `{_items, _meta, _links}` envelope, documents carry `_id`/`_etag`
//! bookkeeping fields, and related resources can be inflated in place with
//! the `embedded` query parameter.

use membridge_core::{GroupMembership, MembershipTier, RemoteGroup, RemoteUser};
use serde::{Deserialize, Serialize};

/// A user document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiUser {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub membership: MembershipTier,
}

impl From<ApiUser> for RemoteUser {
    fn from(user: ApiUser) -> Self {
        RemoteUser {
            display_name: format!("{} {}", user.firstname, user.lastname),
            uid: user.id,
            email: user.email,
            tier: user.membership,
        }
    }
}

/// A group document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiGroup {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub requires_storage: bool,
}

impl From<ApiGroup> for RemoteGroup {
    fn from(group: ApiGroup) -> Self {
        RemoteGroup {
            gid: group.id,
            name: group.name,
            requires_storage: group.requires_storage,
        }
    }
}

/// A related resource that is either a bare id or, when requested through
/// `embedded`, the full document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Expandable<T> {
    Expanded(T),
    Id(String),
}

impl<T> Expandable<T> {
    /// The full document, when it was embedded.
    #[must_use]
    pub fn expanded(&self) -> Option<&T> {
        match self {
            Expandable::Expanded(doc) => Some(doc),
            Expandable::Id(_) => None,
        }
    }
}

impl Expandable<ApiGroup> {
    /// The group id regardless of expansion.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Expandable::Expanded(group) => &group.id,
            Expandable::Id(id) => id,
        }
    }
}

impl Expandable<ApiUser> {
    /// The user id regardless of expansion.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Expandable::Expanded(user) => &user.id,
            Expandable::Id(id) => id,
        }
    }
}

/// A group membership document, linking a user to a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiGroupMembership {
    pub user: String,
    pub group: Expandable<ApiGroup>,
}

impl From<ApiGroupMembership> for GroupMembership {
    fn from(membership: ApiGroupMembership) -> Self {
        GroupMembership {
            group: membership.group.id().to_string(),
            user: membership.user,
        }
    }
}

/// A session document, returned by `POST sessions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSession {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_etag")]
    pub etag: String,
    pub token: String,
    /// The authenticated user: id only, or the full document when the login
    /// request asked for `embedded={"user":1}`.
    pub user: Expandable<ApiUser>,
}

/// List metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Meta {
    pub total: u64,
}

/// A hyperlink in `_links`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
}

/// Pagination links.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Links {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<Link>,
}

/// The list envelope returned by every collection endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse<T> {
    #[serde(rename = "_items")]
    pub items: Vec<T>,
    #[serde(rename = "_meta", default)]
    pub meta: Meta,
    #[serde(rename = "_links", default)]
    pub links: Links,
}

impl<T> ListResponse<T> {
    /// The `next` page href, if the listing is not exhausted.
    #[must_use]
    pub fn next_href(&self) -> Option<&str> {
        self.links.next.as_ref().map(|link| link.href.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn user_decodes_and_projects() {
        let user: ApiUser = serde_json::from_value(json!({
            "_id": "pablo",
            "email": "pablo@example.org",
            "firstname": "Pablo",
            "lastname": "Verra",
            "membership": "regular"
        }))
        .unwrap();
        let remote = RemoteUser::from(user);
        assert_eq!(remote.uid, "pablo");
        assert_eq!(remote.display_name, "Pablo Verra");
        assert_eq!(remote.tier, MembershipTier::Regular);
    }

    #[test]
    fn group_requires_storage_defaults_false() {
        let group: ApiGroup =
            serde_json::from_value(json!({"_id": "g1", "name": "Board"})).unwrap();
        assert!(!group.requires_storage);
    }

    #[test]
    fn membership_decodes_plain_and_embedded() {
        let plain: ApiGroupMembership =
            serde_json::from_value(json!({"user": "u1", "group": "g1"})).unwrap();
        assert_eq!(plain.group.id(), "g1");
        assert!(plain.group.expanded().is_none());

        let embedded: ApiGroupMembership = serde_json::from_value(json!({
            "user": "u1",
            "group": {"_id": "g1", "name": "Board", "requires_storage": true}
        }))
        .unwrap();
        assert_eq!(embedded.group.id(), "g1");
        assert!(embedded.group.expanded().unwrap().requires_storage);

        let pair = GroupMembership::from(embedded);
        assert_eq!(pair.user, "u1");
        assert_eq!(pair.group, "g1");
    }

    #[test]
    fn list_envelope_decodes() {
        let list: ListResponse<ApiGroup> = serde_json::from_value(json!({
            "_items": [{"_id": "g1", "name": "Board", "requires_storage": true}],
            "_meta": {"total": 42},
            "_links": {"next": {"href": "groups?page=2"}}
        }))
        .unwrap();
        assert_eq!(list.items.len(), 1);
        assert_eq!(list.meta.total, 42);
        assert_eq!(list.next_href(), Some("groups?page=2"));
    }

    #[test]
    fn missing_field_is_a_decode_error() {
        let result: Result<ApiUser, _> = serde_json::from_value(json!({"_id": "u1"}));
        assert!(result.is_err());
    }
}
