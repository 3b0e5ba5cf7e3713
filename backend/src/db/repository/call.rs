//! Call and transcript storage.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{Call, CallId, CallTimestamp, NewCall, TranscriptSegment};

/// Repository trait for calls and their transcripts.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait CallRepository: Send + Sync {
    // ==================== Health & Connection ====================

    /// Check if the storage backend is reachable.
    ///
    /// # Returns
    /// - `Ok(true)` if healthy
    /// - `Ok(false)` if unhealthy but no error occurred
    /// - `Err(RepositoryError)` if the check itself failed
    async fn health_check(&self) -> RepositoryResult<bool>;

    // ==================== Call Operations ====================

    /// Store a call with its transcript.
    ///
    /// Idempotent by `checksum`: when a call with the same checksum already
    /// exists it is returned unchanged and nothing is written.
    ///
    /// # Arguments
    /// * `call` - Validated ingestion payload
    /// * `checksum` - Content hash of the payload
    async fn store_call(&self, call: &NewCall, checksum: &str) -> RepositoryResult<Call>;

    /// # Errors
    /// `NotFound` if the call does not exist.
    async fn get_call(&self, call_id: CallId) -> RepositoryResult<Call>;

    /// All calls, oldest first.
    async fn list_calls(&self) -> RepositoryResult<Vec<Call>>;

    /// Transcript segments of a call in conversation order.
    ///
    /// # Errors
    /// `NotFound` if the call does not exist.
    async fn get_transcript(&self, call_id: CallId) -> RepositoryResult<Vec<TranscriptSegment>>;

    /// Correct a call's duration after the fact (e.g. from an audio probe).
    async fn update_call_duration(&self, call_id: CallId, duration: f64) -> RepositoryResult<Call>;

    /// Overwrite the timestamp of every segment, in order.
    ///
    /// # Errors
    /// `ValidationError` if `timestamps.len()` differs from the segment count.
    async fn update_transcript_timestamps(
        &self,
        call_id: CallId,
        timestamps: &[CallTimestamp],
    ) -> RepositoryResult<()>;
}
