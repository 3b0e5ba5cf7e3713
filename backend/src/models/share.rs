//! Share grants: capability tokens giving an external viewer access to one
//! owner's dashboard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque share token. The sole lookup key of a grant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShareToken(String);

impl ShareToken {
    /// Generate a fresh random token (UUID v4, hyphenless).
    pub fn generate() -> Self {
        ShareToken(Uuid::new_v4().simple().to_string())
    }

    pub fn new(value: impl Into<String>) -> Self {
        ShareToken(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShareToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    View,
    Edit,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::View => "view",
            Permission::Edit => "edit",
        }
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "view" => Ok(Permission::View),
            "edit" => Ok(Permission::Edit),
            other => Err(format!("Unknown permission '{}': expected view or edit", other)),
        }
    }
}

/// A stored share grant. Grants are never updated: a permission change is a
/// revoke followed by a new grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareGrant {
    pub share_token: ShareToken,
    pub owner_id: String,
    pub shared_with_email: String,
    pub permission: Permission,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl ShareGrant {
    /// A grant without `expires_at` never expires.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn grant(expires_at: Option<DateTime<Utc>>) -> ShareGrant {
        ShareGrant {
            share_token: ShareToken::generate(),
            owner_id: "owner-1".to_string(),
            shared_with_email: "viewer@example.com".to_string(),
            permission: Permission::View,
            created_at: Utc::now(),
            expires_at,
        }
    }

    #[test]
    fn test_generated_tokens_are_distinct() {
        let a = ShareToken::generate();
        let b = ShareToken::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
    }

    #[test]
    fn test_permission_parse() {
        assert_eq!("view".parse::<Permission>().unwrap(), Permission::View);
        assert_eq!("edit".parse::<Permission>().unwrap(), Permission::Edit);
        assert!("admin".parse::<Permission>().is_err());
        assert!("VIEW".parse::<Permission>().is_err());
    }

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        assert!(!grant(None).is_expired(now));
        assert!(!grant(Some(now + Duration::days(1))).is_expired(now));
        assert!(grant(Some(now - Duration::seconds(1))).is_expired(now));
    }

    #[test]
    fn test_grant_json_shape() {
        let json = serde_json::to_value(grant(None)).unwrap();
        assert_eq!(json["permission"], "view");
        assert_eq!(json["ownerId"], "owner-1");
        assert!(json["expiresAt"].is_null());
    }
}
