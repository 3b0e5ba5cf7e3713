//! Request authentication extractor.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use super::error::AppError;
use super::state::AppState;
use crate::auth::{AuthUser, Credentials, USER_EMAIL_HEADER, USER_ID_HEADER};

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub fn credentials_from_headers(headers: &HeaderMap) -> Credentials {
    Credentials {
        authorization: header(headers, AUTHORIZATION.as_str()),
        user_id: header(headers, USER_ID_HEADER),
        user_email: header(headers, USER_EMAIL_HEADER),
    }
}

/// Handlers taking an [`AuthUser`] reject unauthenticated requests with 401.
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let credentials = credentials_from_headers(&parts.headers);
        state
            .authenticator
            .authenticate(&credentials)
            .map_err(AppError::from)
    }
}
