//! Domain models for calls, transcripts, coaching artifacts and share grants.

pub mod macros;

pub mod coaching;
pub mod share;
pub mod transcript;

crate::define_id_type!(i64, CallId);

pub use coaching::{
    AgentScores, AnalysisPayload, CoachingArtifacts, CoachingReport, CustomerProfile, Objection,
    ObjectionCategory, Question, QuestionType, ScoreSource, ScoredValue, Severity,
};
pub use share::{Permission, ShareGrant, ShareToken};
pub use transcript::{Call, CallTimestamp, NewCall, Speaker, TranscriptSegment};
