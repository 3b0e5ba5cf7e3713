//! Call-level coaching report.
//!
//! Combines the extracted objections and questions with the external analysis
//! payload. Scores the payload does not supply are derived from the overall
//! score and tagged [`ScoreSource::Derived`](crate::models::ScoreSource).

use chrono::{DateTime, Utc};

use crate::models::{
    AgentScores, AnalysisPayload, CallId, CoachingReport, CustomerProfile, Objection, Question,
    ScoredValue,
};

/// Mean used when a call has no questions or no objections.
pub const NEUTRAL_MEAN: f64 = 7.0;
/// Overall score when the analysis payload has none.
pub const DEFAULT_OVERALL_SCORE: u8 = 70;
/// Threshold shared by both strength and improvement selection.
pub const GOOD_MEAN_THRESHOLD: f64 = 7.0;

pub const FOCUS_OBJECTIONS: &str = "Objection Handling - Price Concerns";
pub const FOCUS_DISCOVERY: &str = "Discovery & Qualification";

const DISCOVERY_FRACTION: f64 = 0.8;
const OBJECTION_HANDLING_FRACTION: f64 = 0.75;
const RAPPORT_FRACTION: f64 = 0.9;
const CLOSING_FRACTION: f64 = 0.85;

const STRENGTH_STRONG_QUESTIONS: &str = "Asks insightful, open-ended discovery questions";
const STRENGTH_ENGAGEMENT: &str = "Keeps the customer engaged and the conversation moving";
const STRENGTH_FILLER: [&str; 2] = [
    "Clear and professional communication",
    "Listens actively and acknowledges customer input",
];

const IMPROVE_OBJECTIONS: &str =
    "Acknowledge and explore objections before responding with value";
const IMPROVE_QUESTIONS: &str = "Ask more open-ended questions to deepen discovery";
const IMPROVE_FILLER: [&str; 2] = [
    "Summarize customer priorities before presenting the solution",
    "Secure a concrete next step and timeline before closing",
];

fn mean_or_neutral(scores: impl ExactSizeIterator<Item = u8>) -> f64 {
    let n = scores.len();
    if n == 0 {
        return NEUTRAL_MEAN;
    }
    scores.map(f64::from).sum::<f64>() / n as f64
}

pub fn mean_question_quality(questions: &[Question]) -> f64 {
    mean_or_neutral(questions.iter().map(|q| q.quality_score))
}

pub fn mean_objection_score(objections: &[Objection]) -> f64 {
    mean_or_neutral(objections.iter().map(|o| o.response_score))
}

pub fn priority_focus(mean_objection: f64) -> &'static str {
    if mean_objection < GOOD_MEAN_THRESHOLD {
        FOCUS_OBJECTIONS
    } else {
        FOCUS_DISCOVERY
    }
}

pub fn top_strengths(mean_question: f64) -> Vec<String> {
    let lead = if mean_question >= GOOD_MEAN_THRESHOLD {
        STRENGTH_STRONG_QUESTIONS
    } else {
        STRENGTH_ENGAGEMENT
    };
    std::iter::once(lead)
        .chain(STRENGTH_FILLER)
        .map(str::to_string)
        .collect()
}

pub fn top_improvements(mean_objection: f64) -> Vec<String> {
    let lead = if mean_objection < GOOD_MEAN_THRESHOLD {
        IMPROVE_OBJECTIONS
    } else {
        IMPROVE_QUESTIONS
    };
    std::iter::once(lead)
        .chain(IMPROVE_FILLER)
        .map(str::to_string)
        .collect()
}

fn derive(overall: u8, fraction: f64) -> ScoredValue {
    ScoredValue::derived((f64::from(overall) * fraction).round() as u8)
}

fn sub_score(external: Option<u8>, overall: u8, fraction: f64) -> ScoredValue {
    external.map_or_else(|| derive(overall, fraction), ScoredValue::external)
}

/// Overall plus the four agent sub-scores. `qualification` is not part of the
/// report and is ignored.
pub fn resolve_scores(analysis: &AnalysisPayload) -> (ScoredValue, AgentScores) {
    let overall = analysis
        .overall
        .map_or(ScoredValue::derived(DEFAULT_OVERALL_SCORE), ScoredValue::external);
    let base = overall.value;

    let agent = AgentScores {
        discovery: sub_score(analysis.discovery, base, DISCOVERY_FRACTION),
        objection_handling: sub_score(analysis.objection_handling, base, OBJECTION_HANDLING_FRACTION),
        rapport_building: sub_score(analysis.rapport_building, base, RAPPORT_FRACTION),
        closing: sub_score(analysis.closing, base, CLOSING_FRACTION),
    };
    (overall, agent)
}

/// Build the report for one call.
pub fn build_report(
    call_id: CallId,
    objections: &[Objection],
    questions: &[Question],
    analysis: &AnalysisPayload,
    customer_profile: Option<CustomerProfile>,
    generated_at: DateTime<Utc>,
) -> CoachingReport {
    let mean_question = mean_question_quality(questions);
    let mean_objection = mean_objection_score(objections);
    let (overall_score, agent_scores) = resolve_scores(analysis);

    CoachingReport {
        call_id,
        overall_score,
        agent_scores,
        top_strengths: top_strengths(mean_question),
        top_improvements: top_improvements(mean_objection),
        priority_coaching_focus: priority_focus(mean_objection).to_string(),
        mean_question_quality: mean_question,
        mean_objection_score: mean_objection,
        coaching_feedback: analysis.feedback.clone().filter(|f| !f.trim().is_empty()),
        customer_profile,
        generated_at,
    }
}
