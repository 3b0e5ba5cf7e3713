//! Question extraction and quality scoring.

use super::rules::{first_match, mentions, mentions_any, KeywordRule};
use crate::models::{Question, QuestionType, TranscriptSegment};

const MAX_QUALITY_SCORE: u8 = 10;
const CLOSED_SCORE: u8 = 3;

pub const QUESTION_TYPE_RULES: &[KeywordRule<QuestionType>] = &[
    KeywordRule::new("what", QuestionType::OpenEnded),
    KeywordRule::new("how", QuestionType::OpenEnded),
    KeywordRule::new("why", QuestionType::OpenEnded),
    KeywordRule::new("tell me", QuestionType::OpenEnded),
    KeywordRule::new("can you", QuestionType::Probing),
    KeywordRule::new("could you", QuestionType::Probing),
    KeywordRule::new("would you", QuestionType::Probing),
];

const PAIN: &[&str] = &["pain", "problem", "challenge", "struggle"];
const IMPACT: &[&str] = &["impact", "affect", "mean for"];
const CURRENT_STATE: &[&str] = &["currently", "right now", "today"];
const DEEPENING: &[&str] = &["tell me more", "walk me through"];
const CLARIFYING: &[&str] = &["specifically", "exactly"];

const WHY_PAIN: &str = "Uncovers pain points that create urgency";
const WHY_IMPACT: &str = "Quantifies business impact to build the case for change";
const WHY_CURRENT: &str = "Establishes the current state before proposing change";
const WHY_OPEN: &str = "Open-ended question encourages the customer to share detail";
const WHY_DEEPENING: &str = "Invites the customer to expand on their situation";
const WHY_CLARIFYING: &str = "Clarifies details to avoid assumptions";
const WHY_PROBING: &str = "Probes for more information";
const WHY_BAD_CLOSED: &str =
    "Closed question invites a one-word answer and stalls discovery";

/// Templates for rephrasing closed questions, keyed by what the question is
/// trying to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClosedIntent {
    IdentityConfirmation,
    ProductPreference,
    YesNo,
}

const CLOSED_INTENT_RULES: &[KeywordRule<ClosedIntent>] = &[
    KeywordRule::new("am i speaking", ClosedIntent::IdentityConfirmation),
    KeywordRule::new("is this", ClosedIntent::IdentityConfirmation),
    KeywordRule::new("speaking with", ClosedIntent::IdentityConfirmation),
    KeywordRule::new("like our", ClosedIntent::ProductPreference),
    KeywordRule::new("like the", ClosedIntent::ProductPreference),
    KeywordRule::new("prefer", ClosedIntent::ProductPreference),
];

/// Leading auxiliaries that turn a sentence into a yes/no question.
const YES_NO_LEADS: &[&str] = &[
    "do", "does", "did", "is", "are", "was", "were", "will", "have", "has", "should", "can",
    "could", "would", "shall",
];

impl ClosedIntent {
    fn better_alternative(self) -> &'static str {
        match self {
            ClosedIntent::IdentityConfirmation => {
                "Thanks for taking the time today. To make the most of it, what would you like to get out of this call?"
            }
            ClosedIntent::ProductPreference => {
                "Which capabilities matter most to your team, and how would they change your day-to-day?"
            }
            ClosedIntent::YesNo => {
                "What has your experience been with this so far?"
            }
        }
    }
}

const GENERIC_ALTERNATIVE: &str =
    "Rephrase as an open-ended question starting with what, how or why";

pub fn classify_question(text: &str) -> QuestionType {
    first_match(QUESTION_TYPE_RULES, &text.to_lowercase()).unwrap_or(QuestionType::Closed)
}

fn closed_intent(lower: &str) -> Option<ClosedIntent> {
    first_match(CLOSED_INTENT_RULES, lower).or_else(|| {
        let lead = lower
            .trim_start()
            .split(|c: char| !c.is_alphanumeric())
            .next()
            .unwrap_or_default();
        YES_NO_LEADS.contains(&lead).then_some(ClosedIntent::YesNo)
    })
}

/// Rewrite suggestion for a closed question.
pub fn better_alternative(text: &str) -> &'static str {
    closed_intent(&text.to_lowercase())
        .map(ClosedIntent::better_alternative)
        .unwrap_or(GENERIC_ALTERNATIVE)
}

/// Score and explain a single question.
pub fn assess_question(segment: &TranscriptSegment) -> Question {
    let lower = segment.text.to_lowercase();
    let question_type = classify_question(&segment.text);

    let (score, why_good, why_bad, alternative) = match question_type {
        QuestionType::OpenEnded => {
            let pain = mentions_any(&lower, PAIN);
            let impact = mentions_any(&lower, IMPACT);
            let current = mentions_any(&lower, CURRENT_STATE);

            let mut score = 7;
            if pain || impact {
                score += 2;
            }
            if current {
                score += 1;
            }
            let why = if pain {
                WHY_PAIN
            } else if impact {
                WHY_IMPACT
            } else if current {
                WHY_CURRENT
            } else {
                WHY_OPEN
            };
            (score, Some(why), None, None)
        }
        QuestionType::Probing => {
            if mentions_any(&lower, DEEPENING) {
                (8, Some(WHY_DEEPENING), None, None)
            } else if mentions_any(&lower, CLARIFYING) {
                (7, Some(WHY_CLARIFYING), None, None)
            } else {
                (6, Some(WHY_PROBING), None, None)
            }
        }
        QuestionType::Closed => (
            CLOSED_SCORE,
            None,
            Some(WHY_BAD_CLOSED),
            Some(better_alternative(&segment.text)),
        ),
    };

    Question {
        timestamp: segment.timestamp,
        question_text: segment.text.clone(),
        question_type,
        quality_score: score.min(MAX_QUALITY_SCORE),
        why_good: why_good.map(str::to_string),
        why_bad: why_bad.map(str::to_string),
        better_alternative: alternative.map(str::to_string),
    }
}

/// One question per representative segment containing `?`, ordered by
/// timestamp.
pub fn extract_questions(segments: &[TranscriptSegment]) -> Vec<Question> {
    let mut questions: Vec<Question> = segments
        .iter()
        .filter(|s| s.is_representative() && mentions(&s.text, "?"))
        .map(assess_question)
        .collect();
    questions.sort_by_key(|q| q.timestamp);
    questions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CallTimestamp, Speaker};
    use proptest::prelude::*;

    fn rep(text: &str) -> TranscriptSegment {
        TranscriptSegment::new(Speaker::Representative, text, CallTimestamp::ZERO)
    }

    #[test]
    fn test_product_preference_closed_question() {
        let q = assess_question(&rep("Do you like our product?"));
        assert_eq!(q.question_type, QuestionType::Closed);
        assert_eq!(q.quality_score, 3);
        assert!(q.why_bad.is_some());
        assert!(q.why_good.is_none());
        assert_eq!(
            q.better_alternative.as_deref(),
            Some(ClosedIntent::ProductPreference.better_alternative())
        );
    }

    #[test]
    fn test_closed_alternative_table() {
        assert_eq!(
            better_alternative("Is this Jordan?"),
            ClosedIntent::IdentityConfirmation.better_alternative()
        );
        assert_eq!(
            better_alternative("Are you the decision maker?"),
            ClosedIntent::YesNo.better_alternative()
        );
        assert_eq!(better_alternative("Next Tuesday?"), GENERIC_ALTERNATIVE);
    }

    #[test]
    fn test_open_question_bonuses() {
        let q = assess_question(&rep("What challenges are you facing right now?"));
        assert_eq!(q.question_type, QuestionType::OpenEnded);
        assert_eq!(q.quality_score, 10);
        assert_eq!(q.why_good.as_deref(), Some(WHY_PAIN));

        let q = assess_question(&rep("How would that impact your team?"));
        assert_eq!(q.quality_score, 9);
        assert_eq!(q.why_good.as_deref(), Some(WHY_IMPACT));

        // pain and impact together still add only 2
        let q = assess_question(&rep("How does this problem affect revenue?"));
        assert_eq!(q.quality_score, 9);

        let q = assess_question(&rep("What tools do you use?"));
        assert_eq!(q.quality_score, 7);
        assert_eq!(q.why_good.as_deref(), Some(WHY_OPEN));
        assert!(q.better_alternative.is_none());
    }

    #[test]
    fn test_probing_question_bonuses() {
        let q = assess_question(&rep("Could you walk me through the approval process?"));
        assert_eq!(q.question_type, QuestionType::Probing);
        assert_eq!(q.quality_score, 8);

        let q = assess_question(&rep("Can you say exactly which teams?"));
        assert_eq!(q.quality_score, 7);

        let q = assess_question(&rep("Would you send the deck?"));
        assert_eq!(q.quality_score, 6);
        assert_eq!(q.why_good.as_deref(), Some(WHY_PROBING));
    }

    #[test]
    fn test_interrogative_needs_word_start() {
        // "show" must not read as "how"
        assert_eq!(classify_question("Should I show you the demo?"), QuestionType::Closed);
    }

    #[test]
    fn test_extract_filters_speaker_and_question_mark() {
        let segments = vec![
            TranscriptSegment::new(Speaker::Customer, "What does it cost?", CallTimestamp::from_seconds(1)),
            TranscriptSegment::new(Speaker::Representative, "Great question.", CallTimestamp::from_seconds(2)),
            TranscriptSegment::new(Speaker::Representative, "Why now?", CallTimestamp::from_seconds(3)),
        ];
        let questions = extract_questions(&segments);
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].question_text, "Why now?");
    }

    proptest! {
        #[test]
        fn prop_question_filter_and_closed_alternative(
            rows in prop::collection::vec(
                (any::<bool>(), prop::sample::select(vec![
                    "Do you like our product?", "What keeps you up at night?", "Thanks for joining.",
                    "Could you elaborate?", "Is this Sam?", "Got it", "Tell me more?",
                ])),
                0..25,
            )
        ) {
            let segments: Vec<TranscriptSegment> = rows
                .iter()
                .map(|(is_rep, text)| {
                    let speaker = if *is_rep { Speaker::Representative } else { Speaker::Customer };
                    TranscriptSegment::new(speaker, *text, CallTimestamp::ZERO)
                })
                .collect();
            let questions = extract_questions(&segments);

            let expected = rows.iter().filter(|(r, t)| *r && t.contains('?')).count();
            prop_assert_eq!(questions.len(), expected);
            for q in &questions {
                prop_assert!(q.question_text.contains('?'));
                prop_assert!(q.quality_score <= 10);
                if q.question_type == QuestionType::Closed {
                    prop_assert!(q.better_alternative.as_deref().is_some_and(|a| !a.is_empty()));
                    prop_assert!(q.why_good.is_none());
                }
            }
        }
    }
}
