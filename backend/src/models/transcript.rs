//! Calls and their speaker-tagged transcripts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::CallId;

/// Who spoke a transcript segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    #[serde(alias = "rep", alias = "Representative", alias = "Rep")]
    Representative,
    #[serde(alias = "Customer", alias = "prospect")]
    Customer,
}

impl Speaker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Speaker::Representative => "representative",
            Speaker::Customer => "customer",
        }
    }
}

impl FromStr for Speaker {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "representative" | "rep" => Ok(Speaker::Representative),
            "customer" | "prospect" => Ok(Speaker::Customer),
            other => Err(format!("Unknown speaker: {}", other)),
        }
    }
}

/// Offset from the start of a call, serialized as `mm:ss`.
///
/// Minutes are not wrapped into hours, so a 75 minute offset renders as `75:00`.
/// Parsing also accepts `h:mm:ss`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CallTimestamp(u32);

impl CallTimestamp {
    pub const ZERO: CallTimestamp = CallTimestamp(0);

    pub fn from_seconds(seconds: u32) -> Self {
        CallTimestamp(seconds)
    }

    /// Truncates a fractional offset to whole seconds. Negative and non-finite
    /// inputs collapse to zero.
    pub fn from_secs_f64(seconds: f64) -> Self {
        if !seconds.is_finite() || seconds <= 0.0 {
            return CallTimestamp::ZERO;
        }
        CallTimestamp(seconds.floor().min(u32::MAX as f64) as u32)
    }

    pub fn seconds(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for CallTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl FromStr for CallTimestamp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        let numbers: Vec<u32> = parts
            .iter()
            .map(|p| p.parse::<u32>())
            .collect::<Result<_, _>>()
            .map_err(|_| format!("Invalid timestamp '{}': expected mm:ss", s))?;

        let seconds = match numbers.as_slice() {
            [m, sec] if *sec < 60 => m.checked_mul(60).and_then(|v| v.checked_add(*sec)),
            [h, m, sec] if *m < 60 && *sec < 60 => h
                .checked_mul(3600)
                .and_then(|v| v.checked_add(m * 60 + sec)),
            _ => None,
        };
        seconds
            .map(CallTimestamp)
            .ok_or_else(|| format!("Invalid timestamp '{}': expected mm:ss", s))
    }
}

impl TryFrom<String> for CallTimestamp {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CallTimestamp> for String {
    fn from(ts: CallTimestamp) -> Self {
        ts.to_string()
    }
}

/// One utterance. The order of segments within a call is the conversation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub speaker: Speaker,
    pub text: String,
    #[serde(default)]
    pub timestamp: CallTimestamp,
}

impl TranscriptSegment {
    pub fn new(speaker: Speaker, text: impl Into<String>, timestamp: CallTimestamp) -> Self {
        Self {
            speaker,
            text: text.into(),
            timestamp,
        }
    }

    pub fn is_customer(&self) -> bool {
        self.speaker == Speaker::Customer
    }

    pub fn is_representative(&self) -> bool {
        self.speaker == Speaker::Representative
    }
}

/// A stored sales conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Call {
    pub call_id: CallId,
    /// Total length in seconds; upper bound for every timestamp in the call.
    pub duration: f64,
    pub rep_name: String,
    pub customer_name: String,
    pub checksum: String,
    pub created_at: DateTime<Utc>,
}

/// Ingestion payload for a new call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCall {
    pub rep_name: String,
    pub customer_name: String,
    pub duration: f64,
    pub segments: Vec<TranscriptSegment>,
}

impl NewCall {
    /// Reject malformed ingestion payloads before anything is written.
    pub fn validate(&self) -> Result<(), String> {
        if self.rep_name.trim().is_empty() {
            return Err("repName must not be empty".to_string());
        }
        if self.customer_name.trim().is_empty() {
            return Err("customerName must not be empty".to_string());
        }
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(format!("duration must be positive, got {}", self.duration));
        }
        if self.segments.is_empty() {
            return Err("transcript must contain at least one segment".to_string());
        }
        if let Some(idx) = self.segments.iter().position(|s| s.text.trim().is_empty()) {
            return Err(format!("segment {} has empty text", idx));
        }
        if let Some((idx, seg)) = self
            .segments
            .iter()
            .enumerate()
            .find(|(_, s)| f64::from(s.timestamp.seconds()) > self.duration)
        {
            return Err(format!(
                "segment {} timestamp {} is past the call duration of {}s",
                idx, seg.timestamp, self.duration
            ));
        }
        Ok(())
    }
}
