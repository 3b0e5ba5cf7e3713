//! Repository-agnostic service layer.
//!
//! Input validation and checksum handling live here so they behave the same
//! for every storage backend. HTTP handlers and the coaching pipeline call
//! these functions rather than the repository traits directly.

use log::{debug, info};

use super::checksum::transcript_checksum;
use super::repository::{ErrorContext, FullRepository, RepositoryError, RepositoryResult};
use crate::models::{Call, CallId, CoachingReport, NewCall, Objection, Question, TranscriptSegment};

// ==================== Health & Connection ====================

/// Pass-through to the repository's health check.
pub async fn health_check<R: FullRepository + ?Sized>(repo: &R) -> RepositoryResult<bool> {
    repo.health_check().await
}

// ==================== Call Operations ====================

/// Validate and store a call.
///
/// Uploading the same conversation twice returns the call stored the first
/// time.
///
/// # Errors
/// `ValidationError` for a malformed payload; nothing is written in that case.
pub async fn store_call<R: FullRepository + ?Sized>(
    repo: &R,
    call: &NewCall,
) -> RepositoryResult<Call> {
    call.validate().map_err(|msg| {
        RepositoryError::validation_with_context(msg, ErrorContext::new("store_call").with_entity("call"))
    })?;

    let checksum = transcript_checksum(call);
    debug!("Service layer: storing call with checksum {}", checksum);
    let stored = repo.store_call(call, &checksum).await?;
    info!(
        "Service layer: call {} stored ({} segments, rep={})",
        stored.call_id,
        call.segments.len(),
        stored.rep_name
    );
    Ok(stored)
}

pub async fn get_call<R: FullRepository + ?Sized>(repo: &R, call_id: CallId) -> RepositoryResult<Call> {
    repo.get_call(call_id).await
}

pub async fn list_calls<R: FullRepository + ?Sized>(repo: &R) -> RepositoryResult<Vec<Call>> {
    repo.list_calls().await
}

pub async fn get_transcript<R: FullRepository + ?Sized>(
    repo: &R,
    call_id: CallId,
) -> RepositoryResult<Vec<TranscriptSegment>> {
    repo.get_transcript(call_id).await
}

/// Correct a call's duration.
///
/// Only the call row changes. Stored offsets past the new duration are
/// redistributed by `CoachingPipeline::update_call_duration`, or by the next
/// pipeline run.
pub async fn update_call_duration<R: FullRepository + ?Sized>(
    repo: &R,
    call_id: CallId,
    duration: f64,
) -> RepositoryResult<Call> {
    if !duration.is_finite() || duration <= 0.0 {
        return Err(RepositoryError::validation_with_context(
            format!("duration must be positive, got {}", duration),
            ErrorContext::new("update_call_duration").with_entity_id(call_id),
        ));
    }
    let call = repo.update_call_duration(call_id, duration).await?;
    info!("Service layer: call {} duration set to {:.1}s", call_id, duration);
    Ok(call)
}

// ==================== Coaching Reads ====================

pub async fn fetch_objections<R: FullRepository + ?Sized>(
    repo: &R,
    call_id: CallId,
) -> RepositoryResult<Vec<Objection>> {
    repo.fetch_objections(call_id).await
}

pub async fn fetch_questions<R: FullRepository + ?Sized>(
    repo: &R,
    call_id: CallId,
) -> RepositoryResult<Vec<Question>> {
    repo.fetch_questions(call_id).await
}

pub async fn fetch_coaching_report<R: FullRepository + ?Sized>(
    repo: &R,
    call_id: CallId,
) -> RepositoryResult<Option<CoachingReport>> {
    repo.fetch_coaching_report(call_id).await
}

#[cfg(test)]
#[path = "services_tests.rs"]
mod services_tests;
