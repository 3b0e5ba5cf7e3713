//! # Call Coach
//!
//! Coaching engine for recorded sales calls.
//!
//! Given a transcript (speaker-labelled segments with rough `mm:ss` offsets),
//! the crate normalizes timestamps, extracts customer objections and the
//! representative's questions, and aggregates them into a scored coaching
//! report. Reports can be shared with another person through expiring,
//! revocable share links. A REST API is exposed via Axum.
//!
//! ## Architecture
//!
//! - [`algorithms`]: Pure, deterministic extraction and scoring
//! - [`models`]: Domain types (calls, transcripts, coaching artifacts, share grants)
//! - [`db`]: Repository traits, in-memory and PostgreSQL backends, db service layer
//! - [`services`]: Coaching pipeline, share-link service, analysis clients, jobs
//! - [`auth`]: Caller authentication capability
//! - [`config`]: `coach.toml` and environment configuration
//! - [`http`]: Axum-based HTTP server and request handlers
//!
//! ## Example
//!
//! ```ignore
//! use call_coach::algorithms::{extract_objections, extract_questions};
//!
//! let objections = extract_objections(&segments);
//! let questions = extract_questions(&segments);
//! ```

// Allow large error types - RepositoryError contains rich context for debugging
#![allow(clippy::result_large_err)]

pub mod algorithms;
pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

#[cfg(feature = "http-server")]
pub mod http;
