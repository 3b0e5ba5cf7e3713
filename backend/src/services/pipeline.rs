//! Coaching pipeline: transcript in, persisted coaching artifacts out.
//!
//! One run per call:
//! 1. load the call and its transcript
//! 2. rebuild segment timestamps and write them back, when asked to or when
//!    stored offsets no longer fit inside the call's duration
//! 3. extract objections and questions
//! 4. obtain the analysis payload (request-supplied, else the provider)
//! 5. best-effort customer profile enrichment
//! 6. aggregate and atomically replace the stored artifacts
//!
//! Runs for the same call are serialized in-process; the repository's atomic
//! replace covers concurrent writers in other processes.

use chrono::Utc;
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::algorithms::{
    build_report, extract_objections, extract_questions, normalize_timestamps, NormalizerConfig,
    PauseJitter,
};
use crate::db::{services as db_services, CallRepository, CoachingRepository, FullRepository};
use crate::error::{CoachError, CoachResult};
use crate::models::{
    AnalysisPayload, Call, CallId, CallTimestamp, CoachingArtifacts, CoachingReport,
    TranscriptSegment,
};
use crate::services::analysis_client::{AnalysisProvider, ProfileLookup};

/// Per-run switches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOptions {
    /// Scores to use instead of calling the analysis provider.
    #[serde(default)]
    pub analysis: Option<AnalysisPayload>,
    /// Rebuild segment timestamps before extraction. Also happens without
    /// this flag when a stored offset lies past the call's duration.
    #[serde(default)]
    pub normalize_timestamps: bool,
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachingSummary {
    pub call_id: CallId,
    pub objection_count: usize,
    pub question_count: usize,
    pub timestamps_normalized: bool,
    pub report: CoachingReport,
}

/// One entry of a batch run. A failed call never aborts the others.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallOutcome {
    pub call_id: CallId,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct CoachingPipeline {
    repo: Arc<dyn FullRepository>,
    analysis: Arc<dyn AnalysisProvider>,
    profiles: Arc<dyn ProfileLookup>,
    normalizer: NormalizerConfig,
    call_locks: Mutex<HashMap<CallId, Arc<tokio::sync::Mutex<()>>>>,
}

impl CoachingPipeline {
    pub fn new(
        repo: Arc<dyn FullRepository>,
        analysis: Arc<dyn AnalysisProvider>,
        profiles: Arc<dyn ProfileLookup>,
        normalizer: NormalizerConfig,
    ) -> Self {
        Self {
            repo,
            analysis,
            profiles,
            normalizer,
            call_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn repository(&self) -> &Arc<dyn FullRepository> {
        &self.repo
    }

    fn call_lock(&self, call_id: CallId) -> Arc<tokio::sync::Mutex<()>> {
        self.call_locks
            .lock()
            .entry(call_id)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Drop lock entries nobody is holding or waiting on.
    fn prune_call_locks(&self) {
        self.call_locks
            .lock()
            .retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    /// A seeded normalizer gets a per-call seed so different calls do not
    /// share one pause pattern, while reruns of a call stay reproducible.
    fn normalizer_for(&self, call_id: CallId) -> NormalizerConfig {
        match self.normalizer.jitter {
            PauseJitter::Seeded(seed) => self
                .normalizer
                .clone()
                .with_jitter(PauseJitter::Seeded(seed ^ call_id.value() as u64)),
            PauseJitter::Entropy => self.normalizer.clone(),
        }
    }

    /// Run the pipeline for one call and persist the result.
    ///
    /// # Errors
    /// `NotFound` for an unknown call, `UpstreamUnavailable` when the analysis
    /// provider fails, `Storage` when the replace fails. Profile lookup
    /// failures are logged and ignored.
    pub async fn process_call(
        &self,
        call_id: CallId,
        options: &ProcessOptions,
    ) -> CoachResult<CoachingSummary> {
        let lock = self.call_lock(call_id);
        let result = {
            let _guard = lock.lock().await;
            self.run(call_id, options, None).await
        };
        drop(lock);
        self.prune_call_locks();
        result
    }

    /// Correct a call's duration and keep its stored offsets inside it.
    ///
    /// When the new duration cuts off part of the transcript, the timestamps
    /// are redistributed onto it. A call that was already coached is coached
    /// again with the scores and profile of its current report, so neither
    /// the analysis provider nor the profile lookup is contacted.
    pub async fn update_call_duration(&self, call_id: CallId, duration: f64) -> CoachResult<Call> {
        let lock = self.call_lock(call_id);
        let result = {
            let _guard = lock.lock().await;
            self.apply_duration(call_id, duration).await
        };
        drop(lock);
        self.prune_call_locks();
        result
    }

    async fn apply_duration(&self, call_id: CallId, duration: f64) -> CoachResult<Call> {
        let repo = self.repo.as_ref();
        let call = db_services::update_call_duration(repo, call_id, duration).await?;
        let mut transcript = db_services::get_transcript(repo, call_id).await?;
        if !exceeds_duration(&transcript, call.duration) {
            return Ok(call);
        }

        match db_services::fetch_coaching_report(repo, call_id).await? {
            Some(report) => {
                let options = ProcessOptions {
                    normalize_timestamps: true,
                    ..Default::default()
                };
                self.run(call_id, &options, Some(&report)).await?;
            }
            None => self.normalize_and_store(&call, &mut transcript).await?,
        }
        info!(
            "Service layer: call {} shortened to {:.1}s, timestamps redistributed",
            call_id, call.duration
        );
        Ok(call)
    }

    async fn normalize_and_store(
        &self,
        call: &Call,
        transcript: &mut [TranscriptSegment],
    ) -> CoachResult<()> {
        normalize_timestamps(transcript, call.duration, &self.normalizer_for(call.call_id))?;
        let timestamps: Vec<CallTimestamp> = transcript.iter().map(|s| s.timestamp).collect();
        self.repo
            .update_transcript_timestamps(call.call_id, &timestamps)
            .await?;
        Ok(())
    }

    /// `previous` carries the scores and profile over from an earlier report
    /// instead of asking the collaborators again.
    async fn run(
        &self,
        call_id: CallId,
        options: &ProcessOptions,
        previous: Option<&CoachingReport>,
    ) -> CoachResult<CoachingSummary> {
        if let Some(payload) = &options.analysis {
            payload.validate().map_err(CoachError::InvalidInput)?;
        }
        let repo = self.repo.as_ref();
        let call = db_services::get_call(repo, call_id).await?;
        let mut transcript = db_services::get_transcript(repo, call_id).await?;
        debug!(
            "Service layer: processing call {} ({} segments)",
            call_id,
            transcript.len()
        );

        let normalize = options.normalize_timestamps || exceeds_duration(&transcript, call.duration);
        if normalize {
            if !options.normalize_timestamps {
                warn!(
                    "Service layer: call {} has offsets past its {:.1}s duration, normalizing",
                    call_id, call.duration
                );
            }
            self.normalize_and_store(&call, &mut transcript).await?;
        }

        let objections = extract_objections(&transcript);
        let questions = extract_questions(&transcript);

        let analysis = match (&options.analysis, previous) {
            (Some(payload), _) => payload.clone(),
            (None, Some(report)) => AnalysisPayload::from_report(report),
            (None, None) => self.analysis.analyze(&call, &transcript).await?,
        };

        let profile = match previous {
            Some(report) => report.customer_profile.clone(),
            None => match self.profiles.lookup(&call).await {
                Ok(profile) => profile,
                Err(e) => {
                    warn!("Profile enrichment skipped for call {}: {}", call_id, e);
                    None
                }
            },
        };

        let report = build_report(call_id, &objections, &questions, &analysis, profile, Utc::now());
        let artifacts = CoachingArtifacts {
            objections,
            questions,
            report,
        };
        repo.replace_coaching_artifacts(call_id, &artifacts).await?;

        info!(
            "Service layer: call {} coached (score {}, {} objections, {} questions)",
            call_id,
            artifacts.report.overall_score.value,
            artifacts.objections.len(),
            artifacts.questions.len()
        );

        Ok(CoachingSummary {
            call_id,
            objection_count: artifacts.objections.len(),
            question_count: artifacts.questions.len(),
            timestamps_normalized: normalize,
            report: artifacts.report,
        })
    }

    /// Process every call independently and report one outcome per id, in
    /// input order.
    pub async fn process_calls(
        &self,
        call_ids: &[CallId],
        options: &ProcessOptions,
    ) -> Vec<CallOutcome> {
        let mut outcomes = Vec::with_capacity(call_ids.len());
        for &call_id in call_ids {
            let outcome = match self.process_call(call_id, options).await {
                Ok(summary) => CallOutcome {
                    call_id,
                    ok: true,
                    overall_score: Some(summary.report.overall_score.value),
                    error_code: None,
                    error: None,
                },
                Err(e) => {
                    warn!("Service layer: call {} failed: {}", call_id, e);
                    CallOutcome {
                        call_id,
                        ok: false,
                        overall_score: None,
                        error_code: Some(e.code()),
                        error: Some(e.to_string()),
                    }
                }
            };
            outcomes.push(outcome);
        }
        outcomes
    }
}

fn exceeds_duration(transcript: &[TranscriptSegment], duration: f64) -> bool {
    transcript
        .iter()
        .any(|s| f64::from(s.timestamp.seconds()) > duration)
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod pipeline_tests;
