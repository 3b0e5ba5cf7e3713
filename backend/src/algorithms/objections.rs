//! Objection extraction.
//!
//! Customer segments are matched against ordered keyword tables to find
//! pushback. Each hit is paired with the representative's next utterance,
//! which is scored for how well it handled the objection.

use std::collections::HashSet;

use super::rules::{first_match, first_matching_pattern, mentions, mentions_any, mentions_word, KeywordRule};
use crate::models::{
    CallTimestamp, Objection, ObjectionCategory, Severity, Speaker, TranscriptSegment,
};

/// `repResponse` when the customer had the last word.
pub const NO_RESPONSE_SENTINEL: &str = "No response recorded";

/// Score given to a missing response.
pub const NO_RESPONSE_SCORE: u8 = 1;

const BASE_RESPONSE_SCORE: i32 = 5;
const MIN_RESPONSE_SCORE: i32 = 1;
const MAX_RESPONSE_SCORE: i32 = 10;
const SHORT_RESPONSE_CHARS: usize = 50;

/// Trigger phrases, first match wins.
pub const CATEGORY_RULES: &[KeywordRule<ObjectionCategory>] = &[
    KeywordRule::new("expensive", ObjectionCategory::Price),
    KeywordRule::new("cost", ObjectionCategory::Price),
    KeywordRule::new("price", ObjectionCategory::Price),
    KeywordRule::new("budget", ObjectionCategory::Price),
    KeywordRule::new("think about it", ObjectionCategory::Timing),
    KeywordRule::new("not sure", ObjectionCategory::Timing),
    KeywordRule::new("already use", ObjectionCategory::Competition),
    KeywordRule::new("happy with", ObjectionCategory::Competition),
    KeywordRule::new("concern", ObjectionCategory::General),
    KeywordRule::new("worried", ObjectionCategory::General),
    KeywordRule::new("problem", ObjectionCategory::General),
    KeywordRule::new("not interested", ObjectionCategory::General),
];

/// Severity phrases, highest first. Unmatched text is `Low`.
pub const SEVERITY_RULES: &[KeywordRule<Severity>] = &[
    KeywordRule::new("not interested", Severity::High),
    KeywordRule::new("no budget", Severity::High),
    KeywordRule::new("happy with", Severity::High),
    KeywordRule::new("expensive", Severity::Medium),
    KeywordRule::new("think about it", Severity::Medium),
    KeywordRule::new("not sure", Severity::Medium),
];

const EMPATHY: &[&str] = &["understand", "i see"];
const CLARIFYING: &[&str] = &["let me", "can you"];
const VALUE: &[&str] = &["value", "roi", "save"];
const PROBING: &[&str] = &["specifically", "tell me more"];
const CONTRASTIVE: &[&str] = &["but", "however"];

/// Alternative phrasings keyed by category and a sub-phrase of the objection.
struct SuggestionRule {
    category: ObjectionCategory,
    trigger: &'static str,
    responses: [&'static str; 2],
}

const SUGGESTION_RULES: &[SuggestionRule] = &[
    SuggestionRule {
        category: ObjectionCategory::Price,
        trigger: "expensive",
        responses: [
            "What would it be worth to your team to solve this problem this quarter?",
            "If we could show a return within six months, how would that change the conversation?",
        ],
    },
    SuggestionRule {
        category: ObjectionCategory::Price,
        trigger: "budget",
        responses: [
            "When does your next budget cycle start, and who is involved in that decision?",
            "What would need to be true for this to be a budget priority?",
        ],
    },
    SuggestionRule {
        category: ObjectionCategory::Price,
        trigger: "cost",
        responses: [
            "How are you measuring the cost of this problem today?",
            "Which part of the cost matters most to you: upfront spend or total cost over time?",
        ],
    },
    SuggestionRule {
        category: ObjectionCategory::Timing,
        trigger: "think about it",
        responses: [
            "What specifically would you like to think through? I can help with that now.",
            "What would you need to see to feel confident moving forward?",
        ],
    },
    SuggestionRule {
        category: ObjectionCategory::Timing,
        trigger: "not sure",
        responses: [
            "What part are you unsure about?",
            "What would help you feel more certain about the next step?",
        ],
    },
    SuggestionRule {
        category: ObjectionCategory::Competition,
        trigger: "already use",
        responses: [
            "What do you like most about your current solution, and what would you change?",
            "Where does your current tool fall short for your team?",
        ],
    },
    SuggestionRule {
        category: ObjectionCategory::Competition,
        trigger: "happy with",
        responses: [
            "That's great to hear. What would make a switch worth considering?",
            "If you could improve one thing about your current setup, what would it be?",
        ],
    },
    SuggestionRule {
        category: ObjectionCategory::General,
        trigger: "concern",
        responses: [
            "Can you tell me more about that concern?",
            "What would need to happen for that concern to go away?",
        ],
    },
    SuggestionRule {
        category: ObjectionCategory::General,
        trigger: "worried",
        responses: [
            "What's driving that worry?",
            "Have you seen that go wrong before? What happened?",
        ],
    },
];

const GENERIC_SUGGESTIONS: [&str; 2] = [
    "Can you help me understand what's behind that?",
    "What would an ideal outcome look like for you?",
];

pub fn classify_category(text: &str) -> Option<ObjectionCategory> {
    first_match(CATEGORY_RULES, &text.to_lowercase())
}

pub fn classify_severity(text: &str) -> Severity {
    first_match(SEVERITY_RULES, &text.to_lowercase()).unwrap_or(Severity::Low)
}

/// Score a representative's response to an objection, clamped to `1..=10`.
pub fn score_response(response: &str) -> u8 {
    let lower = response.to_lowercase();
    let has_question = mentions(&lower, "?");

    let bonuses = [
        mentions_any(&lower, EMPATHY),
        has_question,
        mentions_any(&lower, CLARIFYING),
        mentions_any(&lower, VALUE),
        mentions_any(&lower, PROBING),
    ];
    let penalties = [
        CONTRASTIVE.iter().any(|t| mentions_word(&lower, t)),
        mentions(&lower, "better") && !has_question,
        response.trim().chars().count() < SHORT_RESPONSE_CHARS,
    ];

    let score = BASE_RESPONSE_SCORE + bonuses.iter().filter(|b| **b).count() as i32
        - penalties.iter().filter(|p| **p).count() as i32;
    score.clamp(MIN_RESPONSE_SCORE, MAX_RESPONSE_SCORE) as u8
}

/// Up to two alternative responses for an objection.
pub fn suggest_responses(category: ObjectionCategory, text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let responses = SUGGESTION_RULES
        .iter()
        .find(|rule| rule.category == category && mentions(&lower, rule.trigger))
        .map(|rule| rule.responses)
        .unwrap_or(GENERIC_SUGGESTIONS);
    responses.iter().map(|r| r.to_string()).collect()
}

/// The first representative segment after `idx`.
fn next_representative(segments: &[TranscriptSegment], idx: usize) -> Option<&TranscriptSegment> {
    segments[idx + 1..]
        .iter()
        .find(|s| s.speaker == Speaker::Representative)
}

/// Extract objections from a transcript, ordered by timestamp.
///
/// A segment produces at most one objection, and a timestamp that already
/// produced one is not flagged again.
pub fn extract_objections(segments: &[TranscriptSegment]) -> Vec<Objection> {
    let mut flagged: HashSet<CallTimestamp> = HashSet::new();
    let mut objections = Vec::new();

    for (idx, segment) in segments.iter().enumerate() {
        if !segment.is_customer() || flagged.contains(&segment.timestamp) {
            continue;
        }
        let lower = segment.text.to_lowercase();
        let Some(category) = first_match(CATEGORY_RULES, &lower) else {
            continue;
        };
        flagged.insert(segment.timestamp);

        let (rep_response, response_score) = match next_representative(segments, idx) {
            Some(reply) => (reply.text.clone(), score_response(&reply.text)),
            None => (NO_RESPONSE_SENTINEL.to_string(), NO_RESPONSE_SCORE),
        };

        log::debug!(
            "Objection at {}: category={} trigger={:?} score={}",
            segment.timestamp,
            category.as_str(),
            first_matching_pattern(CATEGORY_RULES, &lower),
            response_score
        );

        objections.push(Objection {
            timestamp: segment.timestamp,
            customer_said: segment.text.clone(),
            category,
            severity: classify_severity(&segment.text),
            rep_response,
            response_score,
            suggested_responses: suggest_responses(category, &segment.text),
        });
    }

    objections.sort_by_key(|o| o.timestamp);
    objections
}
