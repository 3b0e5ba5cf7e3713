//! Pure transcript analysis: no I/O, no storage.
//!
//! The pipeline runs these in order: [`timestamps`] rewrites segment offsets,
//! [`objections`] and [`questions`] read the normalized transcript, and
//! [`coaching`] folds their output into a call-level report.

pub mod coaching;
pub mod objections;
pub mod questions;
pub mod rules;
pub mod timestamps;

pub use coaching::build_report;
pub use objections::extract_objections;
pub use questions::extract_questions;
pub use timestamps::{normalize_timestamps, NormalizerConfig, PauseJitter};
