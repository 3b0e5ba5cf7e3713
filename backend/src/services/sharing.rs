//! Share-link authorizer.
//!
//! A grant moves `Issued -> Active -> Revoked`. Revoked and unknown tokens are
//! indistinguishable to callers, and so are expired ones.

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::AuthUser;
use crate::db::{FullRepository, ShareDeletion};
use crate::error::{CoachError, CoachResult};
use crate::models::{Permission, ShareGrant, ShareToken};

pub const DEFAULT_SHARE_BASE_URL: &str = "http://localhost:5173";

/// Same message for unknown, revoked and expired tokens.
const SHARE_NOT_FOUND: &str = "Share link is invalid or has been revoked";
const SHARE_FORBIDDEN: &str = "Access denied for this share link";

/// The `[sharing]` configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareSettings {
    /// Prefix of generated share URLs.
    pub base_url: String,
    /// Applied when a request does not ask for an expiry. `None` = never.
    pub default_expiry_days: Option<u32>,
}

impl Default for ShareSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SHARE_BASE_URL.to_string(),
            default_expiry_days: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateShareRequest {
    pub shared_with_email: String,
    pub permission: String,
    pub expires_in_days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedShare {
    pub share_token: ShareToken,
    pub share_url: String,
    pub shared_with_email: String,
    pub permission: Permission,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareVerification {
    pub permission: Permission,
    pub owner_id: String,
    pub shared_with_email: String,
}

fn validate_email(email: &str) -> CoachResult<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    };
    if valid && !email.contains(char::is_whitespace) {
        Ok(())
    } else {
        Err(CoachError::InvalidInput(format!(
            "sharedWithEmail '{}' is not a valid email address",
            email
        )))
    }
}

pub struct ShareService {
    repo: Arc<dyn FullRepository>,
    settings: ShareSettings,
}

impl ShareService {
    pub fn new(repo: Arc<dyn FullRepository>, settings: ShareSettings) -> Self {
        Self { repo, settings }
    }

    pub fn settings(&self) -> &ShareSettings {
        &self.settings
    }

    pub fn share_url(&self, token: &ShareToken) -> String {
        format!("{}/shared/{}", self.settings.base_url.trim_end_matches('/'), token)
    }

    /// Issue a new grant for `owner`. Several grants to the same email are
    /// allowed and revocable on their own.
    ///
    /// # Errors
    /// `InvalidInput` for a bad email, permission or expiry; `Conflict` if
    /// the generated token already exists.
    pub async fn create_share(
        &self,
        owner: &AuthUser,
        request: CreateShareRequest,
        now: DateTime<Utc>,
    ) -> CoachResult<CreatedShare> {
        let email = request.shared_with_email.trim().to_string();
        validate_email(&email)?;
        let permission: Permission = request
            .permission
            .parse()
            .map_err(CoachError::InvalidInput)?;

        let expires_at = match request.expires_in_days.or(self.settings.default_expiry_days) {
            Some(0) => {
                return Err(CoachError::InvalidInput(
                    "expiresInDays must be at least 1".to_string(),
                ))
            }
            Some(days) => Some(
                Duration::try_days(i64::from(days))
                    .and_then(|span| now.checked_add_signed(span))
                    .ok_or_else(|| {
                        CoachError::InvalidInput(format!("expiresInDays {} is too large", days))
                    })?,
            ),
            None => None,
        };

        let grant = ShareGrant {
            share_token: ShareToken::generate(),
            owner_id: owner.user_id.clone(),
            shared_with_email: email,
            permission,
            created_at: now,
            expires_at,
        };
        self.repo.insert_share(&grant).await?;

        info!(
            "Service layer: user {} shared dashboard with {} ({})",
            grant.owner_id,
            grant.shared_with_email,
            grant.permission.as_str()
        );

        Ok(CreatedShare {
            share_url: self.share_url(&grant.share_token),
            share_token: grant.share_token,
            shared_with_email: grant.shared_with_email,
            permission: grant.permission,
            expires_at: grant.expires_at,
        })
    }

    /// Check a token, and the viewer's email when one is supplied.
    ///
    /// The email comparison is exact (case-sensitive).
    pub async fn verify_share(
        &self,
        token: &ShareToken,
        email: Option<&str>,
        now: DateTime<Utc>,
    ) -> CoachResult<ShareVerification> {
        let grant = match self.repo.get_share(token).await? {
            Some(grant) if !grant.is_expired(now) => grant,
            Some(_) => {
                debug!("Share token presented after expiry");
                return Err(CoachError::NotFound(SHARE_NOT_FOUND.to_string()));
            }
            None => return Err(CoachError::NotFound(SHARE_NOT_FOUND.to_string())),
        };

        if let Some(email) = email {
            if email != grant.shared_with_email {
                return Err(CoachError::Forbidden(SHARE_FORBIDDEN.to_string()));
            }
        }

        Ok(ShareVerification {
            permission: grant.permission,
            owner_id: grant.owner_id,
            shared_with_email: grant.shared_with_email,
        })
    }

    /// Every grant `owner` has not revoked, oldest first. Expired grants are
    /// included so the owner can see and clean them up.
    pub async fn list_shares(&self, owner: &AuthUser) -> CoachResult<Vec<ShareGrant>> {
        Ok(self.repo.list_shares_for_owner(&owner.user_id).await?)
    }

    pub async fn revoke_share(&self, owner: &AuthUser, token: &ShareToken) -> CoachResult<()> {
        match self.repo.delete_share(token, &owner.user_id).await? {
            ShareDeletion::Deleted => {
                info!("Service layer: user {} revoked a share", owner.user_id);
                Ok(())
            }
            ShareDeletion::NotOwner => Err(CoachError::Forbidden(
                "Only the owner can revoke this share".to_string(),
            )),
            ShareDeletion::Missing => Err(CoachError::NotFound(SHARE_NOT_FOUND.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::LocalRepository;

    fn service() -> ShareService {
        ShareService::new(Arc::new(LocalRepository::new()), ShareSettings::default())
    }

    fn user(id: &str) -> AuthUser {
        AuthUser {
            user_id: id.to_string(),
            email: format!("{}@example.com", id),
        }
    }

    fn request(email: &str, permission: &str) -> CreateShareRequest {
        CreateShareRequest {
            shared_with_email: email.to_string(),
            permission: permission.to_string(),
            expires_in_days: None,
        }
    }

    #[tokio::test]
    async fn test_share_url_uses_base() {
        let svc = ShareService::new(
            Arc::new(LocalRepository::new()),
            ShareSettings {
                base_url: "https://coach.example.com/".to_string(),
                default_expiry_days: None,
            },
        );
        let created = svc
            .create_share(&user("alice"), request("bob@example.com", "view"), Utc::now())
            .await
            .unwrap();
        assert_eq!(
            created.share_url,
            format!("https://coach.example.com/shared/{}", created.share_token)
        );
    }

    #[tokio::test]
    async fn test_invalid_inputs_rejected() {
        let svc = service();
        let owner = user("alice");
        for (email, permission) in [("", "view"), ("nobody", "view"), ("a@b.com", "admin"), ("a@b.com", "View")] {
            let err = svc
                .create_share(&owner, request(email, permission), Utc::now())
                .await
                .unwrap_err();
            assert!(matches!(err, CoachError::InvalidInput(_)), "{email} {permission}");
        }
        assert!(svc.list_shares(&owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_email_match_is_case_sensitive() {
        let svc = service();
        let created = svc
            .create_share(&user("alice"), request("Bob@example.com", "edit"), Utc::now())
            .await
            .unwrap();

        let ok = svc
            .verify_share(&created.share_token, Some("Bob@example.com"), Utc::now())
            .await
            .unwrap();
        assert_eq!(ok.permission, Permission::Edit);
        assert_eq!(ok.owner_id, "alice");

        let err = svc
            .verify_share(&created.share_token, Some("bob@example.com"), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, CoachError::Forbidden(_)));

        // No email given: the token alone is enough.
        assert!(svc
            .verify_share(&created.share_token, None, Utc::now())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_expired_share_looks_missing() {
        let svc = service();
        let created_at = Utc::now() - Duration::days(10);
        let created = svc
            .create_share(
                &user("alice"),
                CreateShareRequest {
                    expires_in_days: Some(3),
                    ..request("bob@example.com", "view")
                },
                created_at,
            )
            .await
            .unwrap();
        assert!(created.expires_at.is_some());

        let err = svc
            .verify_share(&created.share_token, Some("bob@example.com"), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, CoachError::NotFound(ref m) if m == SHARE_NOT_FOUND));
    }

    #[tokio::test]
    async fn test_zero_day_expiry_rejected() {
        let err = service()
            .create_share(
                &user("alice"),
                CreateShareRequest {
                    expires_in_days: Some(0),
                    ..request("bob@example.com", "view")
                },
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoachError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_oversized_expiry_rejected() {
        let svc = service();
        let err = svc
            .create_share(
                &user("alice"),
                CreateShareRequest {
                    expires_in_days: Some(u32::MAX),
                    ..request("bob@example.com", "view")
                },
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoachError::InvalidInput(ref m) if m.contains("too large")));
        assert!(svc.list_shares(&user("alice")).await.unwrap().is_empty());

        let created = svc
            .create_share(
                &user("alice"),
                CreateShareRequest {
                    expires_in_days: Some(3650),
                    ..request("bob@example.com", "view")
                },
                Utc::now(),
            )
            .await
            .unwrap();
        assert!(created.expires_at.is_some());
    }

    #[tokio::test]
    async fn test_revoke_by_other_owner_is_forbidden() {
        let svc = service();
        let created = svc
            .create_share(&user("alice"), request("bob@example.com", "view"), Utc::now())
            .await
            .unwrap();

        let err = svc
            .revoke_share(&user("mallory"), &created.share_token)
            .await
            .unwrap_err();
        assert!(matches!(err, CoachError::Forbidden(_)));
        assert!(svc
            .verify_share(&created.share_token, None, Utc::now())
            .await
            .is_ok());

        svc.revoke_share(&user("alice"), &created.share_token)
            .await
            .unwrap();
        let err = svc
            .revoke_share(&user("alice"), &created.share_token)
            .await
            .unwrap_err();
        assert!(matches!(err, CoachError::NotFound(_)));
    }
}
