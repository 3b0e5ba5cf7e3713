//! Service layer: orchestration on top of the repository and the pure
//! algorithms.
//!
//! Every service receives its collaborators at construction time; nothing
//! here reaches for process-wide state.

pub mod analysis_client;
pub mod job_tracker;
pub mod pipeline;
pub mod reprocess;
pub mod sharing;

pub use analysis_client::{
    AnalysisProvider, HttpAnalysisProvider, HttpProfileLookup, NoAnalysisProvider,
    NoProfileLookup, ProfileLookup,
};
pub use job_tracker::{Job, JobStatus, JobTracker, LogEntry, LogLevel};
pub use pipeline::{CallOutcome, CoachingPipeline, CoachingSummary, ProcessOptions};
pub use reprocess::{run_reprocess_job, ReprocessTarget};
pub use sharing::{CreateShareRequest, CreatedShare, ShareService, ShareSettings, ShareVerification};
