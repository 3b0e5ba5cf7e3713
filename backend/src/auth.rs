//! Caller authentication.
//!
//! Credentials are verified by an upstream collaborator; this module only
//! turns what the request carries into an [`AuthUser`] or an
//! `Unauthenticated` error.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{CoachError, CoachResult};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";

/// A verified caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub user_id: String,
    pub email: String,
}

/// The authentication-relevant parts of a request.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    /// Raw `Authorization` header value.
    pub authorization: Option<String>,
    pub user_id: Option<String>,
    pub user_email: Option<String>,
}

impl Credentials {
    pub fn bearer_token(&self) -> Option<&str> {
        let value = self.authorization.as_deref()?.trim();
        let (scheme, token) = value.split_once(' ')?;
        let token = token.trim();
        (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
    }
}

pub trait Authenticator: Send + Sync {
    fn authenticate(&self, credentials: &Credentials) -> CoachResult<AuthUser>;
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Trusts identity headers set by an authenticating gateway in front of the
/// service.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrustedHeaderAuthenticator;

impl Authenticator for TrustedHeaderAuthenticator {
    fn authenticate(&self, credentials: &Credentials) -> CoachResult<AuthUser> {
        let user_id = non_blank(credentials.user_id.as_ref());
        let email = non_blank(credentials.user_email.as_ref());
        match (user_id, email) {
            (Some(user_id), Some(email)) => Ok(AuthUser { user_id, email }),
            _ => Err(CoachError::Unauthenticated(format!(
                "Missing {} / {} headers",
                USER_ID_HEADER, USER_EMAIL_HEADER
            ))),
        }
    }
}

/// One `[[auth.tokens]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEntry {
    pub token: String,
    pub user_id: String,
    pub email: String,
}

/// Bearer tokens mapped to users by configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenAuthenticator {
    tokens: HashMap<String, AuthUser>,
}

impl StaticTokenAuthenticator {
    pub fn new(entries: impl IntoIterator<Item = TokenEntry>) -> Self {
        let tokens = entries
            .into_iter()
            .map(|e| {
                (
                    e.token,
                    AuthUser {
                        user_id: e.user_id,
                        email: e.email,
                    },
                )
            })
            .collect();
        Self { tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl Authenticator for StaticTokenAuthenticator {
    fn authenticate(&self, credentials: &Credentials) -> CoachResult<AuthUser> {
        let token = credentials
            .bearer_token()
            .ok_or_else(|| CoachError::Unauthenticated("Missing bearer token".to_string()))?;
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| CoachError::Unauthenticated("Invalid bearer token".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trusted_headers() {
        let creds = Credentials {
            user_id: Some("u-1".to_string()),
            user_email: Some("u1@example.com".to_string()),
            ..Default::default()
        };
        let user = TrustedHeaderAuthenticator.authenticate(&creds).unwrap();
        assert_eq!(user.user_id, "u-1");

        let blank = Credentials {
            user_id: Some("  ".to_string()),
            user_email: Some("u1@example.com".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            TrustedHeaderAuthenticator.authenticate(&blank),
            Err(CoachError::Unauthenticated(_))
        ));
    }

    #[test]
    fn test_static_tokens() {
        let auth = StaticTokenAuthenticator::new([TokenEntry {
            token: "secret".to_string(),
            user_id: "u-2".to_string(),
            email: "u2@example.com".to_string(),
        }]);

        let ok = Credentials {
            authorization: Some("Bearer secret".to_string()),
            ..Default::default()
        };
        assert_eq!(auth.authenticate(&ok).unwrap().user_id, "u-2");

        for header in [None, Some("Bearer wrong"), Some("Basic secret"), Some("Bearer ")] {
            let creds = Credentials {
                authorization: header.map(str::to_string),
                ..Default::default()
            };
            assert!(auth.authenticate(&creds).is_err(), "{header:?}");
        }
    }
}
