//! Public API surface.
//!
//! Consolidates the types callers of the library and the HTTP front end see.
//! Everything here derives Serialize/Deserialize with the wire field names.

pub use crate::models::{
    AgentScores, AnalysisPayload, Call, CallId, CallTimestamp, CoachingArtifacts,
    CoachingReport, CustomerProfile, NewCall, Objection, ObjectionCategory, Permission, Question,
    QuestionType, ScoreSource, ScoredValue, Severity, ShareGrant, ShareToken, Speaker,
    TranscriptSegment,
};

pub use crate::services::{
    CallOutcome, CoachingSummary, CreateShareRequest, CreatedShare, Job, JobStatus, LogEntry,
    LogLevel, ProcessOptions, ShareVerification,
};

pub use crate::auth::AuthUser;
pub use crate::error::{CoachError, CoachResult};

#[cfg(test)]
#[path = "api_tests.rs"]
mod api_tests;
