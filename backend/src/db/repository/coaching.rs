//! Coaching artifact storage.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{CallId, CoachingArtifacts, CoachingReport, Objection, Question};

/// Repository trait for the artifacts produced by the coaching pipeline.
#[async_trait]
pub trait CoachingRepository: Send + Sync {
    /// Replace every objection, question and the report of a call as one
    /// atomic unit. Readers see either the previous set or the new one.
    ///
    /// # Errors
    /// `NotFound` if the call does not exist.
    async fn replace_coaching_artifacts(
        &self,
        call_id: CallId,
        artifacts: &CoachingArtifacts,
    ) -> RepositoryResult<()>;

    /// Objections of a call ordered by timestamp. Empty when none were found
    /// or the pipeline has not run yet.
    async fn fetch_objections(&self, call_id: CallId) -> RepositoryResult<Vec<Objection>>;

    async fn fetch_questions(&self, call_id: CallId) -> RepositoryResult<Vec<Question>>;

    /// `Ok(None)` when the pipeline has not produced a report for the call.
    async fn fetch_coaching_report(&self, call_id: CallId)
        -> RepositoryResult<Option<CoachingReport>>;
}
