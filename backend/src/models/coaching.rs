//! Coaching artifacts derived from a transcript: objections, questions and the
//! call-level report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CallId, CallTimestamp};

/// Response score at or above which an objection counts as resolved.
pub const RESOLVED_SCORE_THRESHOLD: u8 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectionCategory {
    Price,
    Timing,
    Competition,
    General,
}

impl ObjectionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectionCategory::Price => "price",
            ObjectionCategory::Timing => "timing",
            ObjectionCategory::Competition => "competition",
            ObjectionCategory::General => "general",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "price" => Some(ObjectionCategory::Price),
            "timing" => Some(ObjectionCategory::Timing),
            "competition" => Some(ObjectionCategory::Competition),
            "general" => Some(ObjectionCategory::General),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Severity::Low),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            _ => None,
        }
    }
}

/// A customer pushback and how the representative handled it.
///
/// `was_resolved` is not a field: it is always derived from `response_score`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "ObjectionView", from = "ObjectionView")]
pub struct Objection {
    pub timestamp: CallTimestamp,
    pub customer_said: String,
    pub category: ObjectionCategory,
    pub severity: Severity,
    pub rep_response: String,
    pub response_score: u8,
    pub suggested_responses: Vec<String>,
}

impl Objection {
    pub fn was_resolved(&self) -> bool {
        self.response_score >= RESOLVED_SCORE_THRESHOLD
    }
}

/// Wire shape of [`Objection`], carrying the derived `wasResolved` flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectionView {
    timestamp: CallTimestamp,
    customer_said: String,
    category: ObjectionCategory,
    severity: Severity,
    rep_response: String,
    response_score: u8,
    #[serde(default)]
    suggested_responses: Vec<String>,
    #[serde(default)]
    was_resolved: bool,
}

impl From<Objection> for ObjectionView {
    fn from(o: Objection) -> Self {
        let was_resolved = o.was_resolved();
        Self {
            timestamp: o.timestamp,
            customer_said: o.customer_said,
            category: o.category,
            severity: o.severity,
            rep_response: o.rep_response,
            response_score: o.response_score,
            suggested_responses: o.suggested_responses,
            was_resolved,
        }
    }
}

impl From<ObjectionView> for Objection {
    // Incoming `wasResolved` is ignored; the score is authoritative.
    fn from(v: ObjectionView) -> Self {
        Self {
            timestamp: v.timestamp,
            customer_said: v.customer_said,
            category: v.category,
            severity: v.severity,
            rep_response: v.rep_response,
            response_score: v.response_score,
            suggested_responses: v.suggested_responses,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    OpenEnded,
    Probing,
    Closed,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::OpenEnded => "open_ended",
            QuestionType::Probing => "probing",
            QuestionType::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open_ended" => Some(QuestionType::OpenEnded),
            "probing" => Some(QuestionType::Probing),
            "closed" => Some(QuestionType::Closed),
            _ => None,
        }
    }
}

/// A question asked by the representative, with a quality verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub timestamp: CallTimestamp,
    pub question_text: String,
    pub question_type: QuestionType,
    pub quality_score: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub why_good: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub why_bad: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub better_alternative: Option<String>,
}

/// Where a report score came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreSource {
    /// Supplied by the external analysis capability.
    External,
    /// Computed locally as a fallback.
    Derived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredValue {
    pub value: u8,
    pub source: ScoreSource,
}

impl ScoredValue {
    pub fn external(value: u8) -> Self {
        Self {
            value: value.min(100),
            source: ScoreSource::External,
        }
    }

    pub fn derived(value: u8) -> Self {
        Self {
            value: value.min(100),
            source: ScoreSource::Derived,
        }
    }

    pub fn is_external(&self) -> bool {
        self.source == ScoreSource::External
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentScores {
    pub discovery: ScoredValue,
    pub objection_handling: ScoredValue,
    pub rapport_building: ScoredValue,
    pub closing: ScoredValue,
}

/// Score payload returned by the external analysis capability. Every field is
/// optional; missing sub-scores are derived from the overall score.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisPayload {
    #[serde(default)]
    pub overall: Option<u8>,
    #[serde(default)]
    pub discovery: Option<u8>,
    #[serde(default)]
    pub qualification: Option<u8>,
    #[serde(default)]
    pub objection_handling: Option<u8>,
    #[serde(default)]
    pub closing: Option<u8>,
    #[serde(default)]
    pub rapport_building: Option<u8>,
    #[serde(default)]
    pub feedback: Option<String>,
}

impl AnalysisPayload {
    pub fn is_empty(&self) -> bool {
        self == &AnalysisPayload::default()
    }

    /// Rejects scores outside 0-100 rather than clamping them.
    pub fn validate(&self) -> Result<(), String> {
        let scores = [
            ("overall", self.overall),
            ("discovery", self.discovery),
            ("qualification", self.qualification),
            ("objectionHandling", self.objection_handling),
            ("closing", self.closing),
            ("rapportBuilding", self.rapport_building),
        ];
        for (name, score) in scores {
            if let Some(value) = score.filter(|v| *v > 100) {
                return Err(format!("{} score must be between 0 and 100, got {}", name, value));
            }
        }
        Ok(())
    }

    /// The externally supplied part of an existing report. Derived scores are
    /// left out so they get derived again.
    pub fn from_report(report: &CoachingReport) -> Self {
        let external = |score: &ScoredValue| score.is_external().then_some(score.value);
        Self {
            overall: external(&report.overall_score),
            discovery: external(&report.agent_scores.discovery),
            qualification: None,
            objection_handling: external(&report.agent_scores.objection_handling),
            closing: external(&report.agent_scores.closing),
            rapport_building: external(&report.agent_scores.rapport_building),
            feedback: report.coaching_feedback.clone(),
        }
    }
}

/// Optional enrichment about the customer; absent when the lookup failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerProfile {
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

/// Call-level coaching summary. Replaced wholesale on every pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachingReport {
    pub call_id: CallId,
    pub overall_score: ScoredValue,
    pub agent_scores: AgentScores,
    pub top_strengths: Vec<String>,
    pub top_improvements: Vec<String>,
    pub priority_coaching_focus: String,
    pub mean_question_quality: f64,
    pub mean_objection_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coaching_feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_profile: Option<CustomerProfile>,
    pub generated_at: DateTime<Utc>,
}

/// Everything one pipeline run produces for a call, persisted as a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachingArtifacts {
    pub objections: Vec<Objection>,
    pub questions: Vec<Question>,
    pub report: CoachingReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn objection(score: u8) -> Objection {
        Objection {
            timestamp: CallTimestamp::from_seconds(42),
            customer_said: "Too expensive".to_string(),
            category: ObjectionCategory::Price,
            severity: Severity::Medium,
            rep_response: "I understand".to_string(),
            response_score: score,
            suggested_responses: vec![],
        }
    }

    #[test]
    fn test_was_resolved_follows_score() {
        assert!(!objection(6).was_resolved());
        assert!(objection(7).was_resolved());
        assert!(objection(10).was_resolved());
    }

    #[test]
    fn test_objection_serializes_derived_flag() {
        let json = serde_json::to_value(objection(8)).unwrap();
        assert_eq!(json["wasResolved"], true);
        assert_eq!(json["category"], "price");
        assert_eq!(json["timestamp"], "00:42");
    }

    #[test]
    fn test_objection_ignores_incoming_resolved_flag() {
        let mut json = serde_json::to_value(objection(3)).unwrap();
        json["wasResolved"] = serde_json::Value::Bool(true);
        let back: Objection = serde_json::from_value(json).unwrap();
        assert!(!back.was_resolved());
    }

    #[test]
    fn test_enum_round_trip_strings() {
        for c in [
            ObjectionCategory::Price,
            ObjectionCategory::Timing,
            ObjectionCategory::Competition,
            ObjectionCategory::General,
        ] {
            assert_eq!(ObjectionCategory::parse(c.as_str()), Some(c));
        }
        for t in [QuestionType::OpenEnded, QuestionType::Probing, QuestionType::Closed] {
            assert_eq!(QuestionType::parse(t.as_str()), Some(t));
        }
        assert_eq!(Severity::parse("urgent"), None);
    }

    #[test]
    fn test_scored_value_clamps() {
        assert_eq!(ScoredValue::external(150).value, 100);
        assert!(!ScoredValue::derived(50).is_external());
    }

    #[test]
    fn test_analysis_payload_partial_json() {
        let payload: AnalysisPayload =
            serde_json::from_str(r#"{"overall": 82, "objectionHandling": 60}"#).unwrap();
        assert_eq!(payload.overall, Some(82));
        assert_eq!(payload.objection_handling, Some(60));
        assert_eq!(payload.discovery, None);
        assert!(!payload.is_empty());
        assert!(AnalysisPayload::default().is_empty());
    }

    #[test]
    fn test_analysis_payload_rejects_out_of_range_scores() {
        let payload = AnalysisPayload {
            overall: Some(150),
            ..Default::default()
        };
        let err = payload.validate().unwrap_err();
        assert!(err.contains("overall"));

        let payload = AnalysisPayload {
            overall: Some(100),
            closing: Some(0),
            ..Default::default()
        };
        assert!(payload.validate().is_ok());

        let payload = AnalysisPayload {
            rapport_building: Some(101),
            ..Default::default()
        };
        assert!(payload.validate().unwrap_err().contains("rapportBuilding"));
    }
}
