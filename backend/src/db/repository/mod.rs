//! Repository trait definitions for persistence.
//!
//! Storage is split across focused traits so implementations stay small and
//! testable:
//!
//! - [`error`]: Error types for repository operations
//! - [`call`]: Calls and their transcripts
//! - [`coaching`]: Objections, questions and coaching reports
//! - [`share`]: Share grants and the per-owner index
//!
//! # Convenience Trait Bound
//!
//! For code that needs every capability, use [`FullRepository`]:
//!
//! ```ignore
//! async fn rerun<R: FullRepository + ?Sized>(repo: &R, call_id: CallId) -> RepositoryResult<()> {
//!     let segments = repo.get_transcript(call_id).await?;
//!     // ...
//!     repo.replace_coaching_artifacts(call_id, &artifacts).await
//! }
//! ```

pub mod call;
pub mod coaching;
pub mod error;
pub mod share;

pub use error::{ErrorContext, RepositoryError, RepositoryResult};

pub use call::CallRepository;
pub use coaching::CoachingRepository;
pub use share::{ShareDeletion, ShareRepository};

/// Composite trait bound for a complete repository implementation.
///
/// Automatically implemented for any type that implements all three
/// repository traits.
pub trait FullRepository: CallRepository + CoachingRepository + ShareRepository {}

impl<T> FullRepository for T where T: CallRepository + CoachingRepository + ShareRepository {}
