//! Timestamp normalization.
//!
//! Transcripts arrive with placeholder timestamps. This module rebuilds them by
//! estimating how long each utterance takes to say, inserting pauses between
//! utterances, and scaling the resulting timeline onto the call's known
//! duration.
//!
//! ```text
//!  seg0        pause  seg1            pause   seg2
//! |=====|......|.|==========|.........|...|====|     unscaled timeline
//! 0                                            calculated
//!                 x scale = total / calculated
//! |===============|...|==============================|
//! 0                                                total
//! ```
//!
//! Turn-taking pauses are jittered. The jitter source is seeded by default so a
//! rerun over the same transcript produces the same timestamps.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{CoachError, CoachResult};
use crate::models::{CallTimestamp, TranscriptSegment};

/// Average speaking rate used to estimate utterance length.
pub const DEFAULT_CHARS_PER_SECOND: f64 = 2.5;
pub const DEFAULT_SAME_SPEAKER_PAUSE_SECS: f64 = 0.5;
pub const DEFAULT_TURN_PAUSE_MIN_SECS: f64 = 1.0;
pub const DEFAULT_TURN_PAUSE_MAX_SECS: f64 = 3.0;
pub const DEFAULT_SEED: u64 = 42;

/// Source of the turn-taking pause jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseJitter {
    /// Reproducible: the same seed always yields the same pauses.
    Seeded(u64),
    /// Fresh OS entropy on every run.
    Entropy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizerConfig {
    pub chars_per_second: f64,
    pub same_speaker_pause_secs: f64,
    pub turn_pause_min_secs: f64,
    pub turn_pause_max_secs: f64,
    pub jitter: PauseJitter,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            chars_per_second: DEFAULT_CHARS_PER_SECOND,
            same_speaker_pause_secs: DEFAULT_SAME_SPEAKER_PAUSE_SECS,
            turn_pause_min_secs: DEFAULT_TURN_PAUSE_MIN_SECS,
            turn_pause_max_secs: DEFAULT_TURN_PAUSE_MAX_SECS,
            jitter: PauseJitter::Seeded(DEFAULT_SEED),
        }
    }
}

impl NormalizerConfig {
    /// Same settings with a different jitter source.
    pub fn with_jitter(mut self, jitter: PauseJitter) -> Self {
        self.jitter = jitter;
        self
    }

    fn validate(&self) -> CoachResult<()> {
        if !(self.chars_per_second.is_finite() && self.chars_per_second > 0.0) {
            return Err(CoachError::InvalidInput(format!(
                "chars_per_second must be positive, got {}",
                self.chars_per_second
            )));
        }
        let pauses = [
            self.same_speaker_pause_secs,
            self.turn_pause_min_secs,
            self.turn_pause_max_secs,
        ];
        if pauses.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(CoachError::InvalidInput(
                "pause lengths must be finite and non-negative".to_string(),
            ));
        }
        if self.turn_pause_min_secs > self.turn_pause_max_secs {
            return Err(CoachError::InvalidInput(format!(
                "turn pause range is empty: {}..{}",
                self.turn_pause_min_secs, self.turn_pause_max_secs
            )));
        }
        Ok(())
    }

    fn rng(&self) -> StdRng {
        match self.jitter {
            PauseJitter::Seeded(seed) => StdRng::seed_from_u64(seed),
            PauseJitter::Entropy => StdRng::from_entropy(),
        }
    }
}

/// Start offsets of every segment on the natural (unscaled) timeline, plus the
/// timeline's total length.
#[derive(Debug, Clone, PartialEq)]
pub struct UnscaledTimeline {
    pub starts: Vec<f64>,
    pub calculated_duration: f64,
}

/// Estimated speaking time for one utterance.
pub fn speaking_duration(text: &str, chars_per_second: f64) -> f64 {
    text.trim().chars().count() as f64 / chars_per_second
}

/// Lay segments out back to back with pauses between them.
///
/// The pause before a segment is short when the speaker is unchanged and a
/// jittered turn-taking pause when the speaker changes. Empty segments take no
/// speaking time but still consume their pause.
pub fn unscaled_timeline(
    segments: &[TranscriptSegment],
    config: &NormalizerConfig,
) -> UnscaledTimeline {
    let mut rng = config.rng();
    let mut starts = Vec::with_capacity(segments.len());
    let mut cursor = 0.0_f64;

    for (idx, segment) in segments.iter().enumerate() {
        if idx > 0 {
            let pause = if segments[idx - 1].speaker == segment.speaker {
                config.same_speaker_pause_secs
            } else {
                rng.gen_range(config.turn_pause_min_secs..=config.turn_pause_max_secs)
            };
            cursor += pause;
        }
        starts.push(cursor);
        cursor += speaking_duration(&segment.text, config.chars_per_second);
    }

    UnscaledTimeline {
        starts,
        calculated_duration: cursor,
    }
}

/// Replace every segment's timestamp with one distributed across
/// `total_duration_seconds`.
///
/// Order is preserved and every output timestamp lies in
/// `[0, total_duration_seconds]`. An empty transcript is a no-op. A timeline
/// with zero length (a single empty segment) places everything at `00:00`.
///
/// # Errors
/// `InvalidInput` when the duration is not a positive finite number or the
/// configuration is inconsistent.
pub fn normalize_timestamps(
    segments: &mut [TranscriptSegment],
    total_duration_seconds: f64,
    config: &NormalizerConfig,
) -> CoachResult<()> {
    if !(total_duration_seconds.is_finite() && total_duration_seconds > 0.0) {
        return Err(CoachError::InvalidInput(format!(
            "total duration must be positive, got {}",
            total_duration_seconds
        )));
    }
    config.validate()?;
    if segments.is_empty() {
        return Ok(());
    }

    let timeline = unscaled_timeline(segments, config);
    let scale = if timeline.calculated_duration > 0.0 {
        total_duration_seconds / timeline.calculated_duration
    } else {
        0.0
    };

    for (segment, start) in segments.iter_mut().zip(timeline.starts) {
        let adjusted = (start * scale).clamp(0.0, total_duration_seconds);
        segment.timestamp = CallTimestamp::from_secs_f64(adjusted);
    }

    Ok(())
}

#[cfg(test)]
#[path = "timestamps_tests.rs"]
mod timestamps_tests;
