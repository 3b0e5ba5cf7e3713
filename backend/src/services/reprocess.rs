//! Background batch reprocessing.
//!
//! Spawned from the HTTP layer; progress goes to the job tracker so users can
//! follow it over SSE.

use std::sync::Arc;

use crate::db::services as db_services;
use crate::models::CallId;
use crate::services::job_tracker::{JobTracker, LogLevel};
use crate::services::pipeline::{CallOutcome, CoachingPipeline, ProcessOptions};

/// Which calls a reprocessing job covers.
pub enum ReprocessTarget {
    Calls(Vec<CallId>),
    /// Every call in the store at the time the job starts.
    All,
}

/// Reprocess the target calls one by one, logging each outcome.
///
/// A failing call is logged and skipped; the job fails only when the set of
/// calls cannot be determined.
pub async fn run_reprocess_job(
    job_id: String,
    tracker: JobTracker,
    pipeline: Arc<CoachingPipeline>,
    target: ReprocessTarget,
    options: ProcessOptions,
) -> Vec<CallOutcome> {
    tracker.log(&job_id, LogLevel::Info, "Starting coaching reprocessing...");

    let call_ids = match target {
        ReprocessTarget::Calls(ids) => ids,
        ReprocessTarget::All => {
            match db_services::list_calls(pipeline.repository().as_ref()).await {
                Ok(calls) => calls.into_iter().map(|c| c.call_id).collect(),
                Err(e) => {
                    tracker.fail_job(&job_id, format!("Failed to list calls: {}", e));
                    return Vec::new();
                }
            }
        }
    };

    tracker.set_total(&job_id, call_ids.len());
    tracker.log(
        &job_id,
        LogLevel::Info,
        format!("Reprocessing {} call(s)", call_ids.len()),
    );

    let mut outcomes = Vec::with_capacity(call_ids.len());
    for call_id in call_ids {
        let outcome = pipeline
            .process_calls(std::slice::from_ref(&call_id), &options)
            .await
            .into_iter()
            .next();
        tracker.advance(&job_id);

        let Some(outcome) = outcome else { continue };
        if outcome.ok {
            tracker.log(
                &job_id,
                LogLevel::Success,
                format!(
                    "✓ Call {} coached (score {})",
                    call_id,
                    outcome.overall_score.unwrap_or_default()
                ),
            );
        } else {
            tracker.log(
                &job_id,
                LogLevel::Warning,
                format!(
                    "Call {} skipped: {}",
                    call_id,
                    outcome.error.as_deref().unwrap_or("unknown error")
                ),
            );
        }
        outcomes.push(outcome);
    }

    let succeeded = outcomes.iter().filter(|o| o.ok).count();
    tracker.log(
        &job_id,
        LogLevel::Success,
        format!(
            "Reprocessing finished: {} succeeded, {} failed",
            succeeded,
            outcomes.len() - succeeded
        ),
    );
    tracker.complete_job(
        &job_id,
        serde_json::to_value(&outcomes)
            .ok()
            .map(|o| serde_json::json!({ "outcomes": o })),
    );

    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::NormalizerConfig;
    use crate::db::LocalRepository;
    use crate::models::{CallTimestamp, NewCall, Speaker, TranscriptSegment};
    use crate::services::analysis_client::{NoAnalysisProvider, NoProfileLookup};
    use crate::services::job_tracker::JobStatus;

    async fn setup() -> (Arc<CoachingPipeline>, CallId) {
        let repo = Arc::new(LocalRepository::new());
        let call = NewCall {
            rep_name: "Dana".to_string(),
            customer_name: "Acme".to_string(),
            duration: 60.0,
            segments: vec![TranscriptSegment::new(
                Speaker::Representative,
                "What challenges are you facing?",
                CallTimestamp::ZERO,
            )],
        };
        let call_id = db_services::store_call(repo.as_ref(), &call)
            .await
            .unwrap()
            .call_id;
        let pipeline = CoachingPipeline::new(
            repo,
            Arc::new(NoAnalysisProvider),
            Arc::new(NoProfileLookup),
            NormalizerConfig::default(),
        );
        (Arc::new(pipeline), call_id)
    }

    #[tokio::test]
    async fn test_job_completes_with_partial_failure() {
        let (pipeline, call_id) = setup().await;
        let tracker = JobTracker::new();
        let job_id = tracker.create_job(2);

        let outcomes = run_reprocess_job(
            job_id.clone(),
            tracker.clone(),
            pipeline,
            ReprocessTarget::Calls(vec![call_id, CallId::new(404)]),
            ProcessOptions::default(),
        )
        .await;

        assert_eq!(outcomes.len(), 2);
        let job = tracker.get_job(&job_id).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.processed, 2);
        assert!(job.logs.iter().any(|l| l.level == LogLevel::Warning));
        assert!(job.result.is_some());
    }

    #[tokio::test]
    async fn test_all_target_covers_every_call() {
        let (pipeline, call_id) = setup().await;
        let tracker = JobTracker::new();
        let job_id = tracker.create_job(0);

        let outcomes = run_reprocess_job(
            job_id.clone(),
            tracker.clone(),
            pipeline,
            ReprocessTarget::All,
            ProcessOptions::default(),
        )
        .await;
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].call_id, call_id);
        assert!(outcomes[0].ok);
        let job = tracker.get_job(&job_id).unwrap();
        assert_eq!((job.total, job.processed), (1, 1));
    }
}
