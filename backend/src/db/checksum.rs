//! Checksum calculation for call deduplication.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::models::{NewCall, Speaker};

/// Calculate SHA-256 checksum of arbitrary content.
///
/// # Returns
/// Hexadecimal string representation of the SHA-256 hash.
pub fn calculate_checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    hex::encode(result)
}

#[derive(Serialize)]
struct CanonicalSegment<'a> {
    speaker: Speaker,
    text: &'a str,
}

#[derive(Serialize)]
struct CanonicalCall<'a> {
    rep_name: &'a str,
    customer_name: &'a str,
    segments: Vec<CanonicalSegment<'a>>,
}

/// Content hash of an ingestion payload.
///
/// Covers the names and the speaker/text of every segment in order. Timestamps
/// and duration are left out: both are rewritten after ingestion, and an
/// identical conversation should still map to the same call.
pub fn transcript_checksum(call: &NewCall) -> String {
    let canonical = CanonicalCall {
        rep_name: call.rep_name.trim(),
        customer_name: call.customer_name.trim(),
        segments: call
            .segments
            .iter()
            .map(|s| CanonicalSegment {
                speaker: s.speaker,
                text: &s.text,
            })
            .collect(),
    };
    // Serializing plain strings and enums cannot fail.
    let json = serde_json::to_string(&canonical).unwrap_or_default();
    calculate_checksum(&json)
}
