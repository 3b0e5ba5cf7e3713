//! Share grant storage.
//!
//! Grants are keyed by token. Listing by owner goes through a secondary index
//! with one entry per `(owner_id, token)`, so concurrent creates and revokes
//! for the same owner never overwrite each other.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{ShareGrant, ShareToken};

/// Outcome of a conditional share delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareDeletion {
    Deleted,
    /// No grant with that token (never issued or already revoked).
    Missing,
    /// The grant exists but belongs to someone else; it was left intact.
    NotOwner,
}

#[async_trait]
pub trait ShareRepository: Send + Sync {
    /// Store a new grant and its owner-index entry atomically.
    ///
    /// # Errors
    /// `ConflictError` if the token is already in use.
    async fn insert_share(&self, grant: &ShareGrant) -> RepositoryResult<()>;

    async fn get_share(&self, token: &ShareToken) -> RepositoryResult<Option<ShareGrant>>;

    /// Grants created by `owner_id`, oldest first. Index entries whose primary
    /// record is gone are skipped.
    async fn list_shares_for_owner(&self, owner_id: &str) -> RepositoryResult<Vec<ShareGrant>>;

    /// Delete a grant if and only if it belongs to `owner_id`. The primary
    /// record and the index entry are removed together.
    async fn delete_share(
        &self,
        token: &ShareToken,
        owner_id: &str,
    ) -> RepositoryResult<ShareDeletion>;
}
