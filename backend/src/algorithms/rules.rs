//! Ordered keyword tables.
//!
//! Classification throughout the pipeline is first-match-wins over a slice of
//! `(pattern, label)` rows. Tables are plain data so rows can be added or
//! reordered without touching control flow.

/// One row of a keyword table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordRule<L> {
    pub pattern: &'static str,
    pub label: L,
}

impl<L> KeywordRule<L> {
    pub const fn new(pattern: &'static str, label: L) -> Self {
        Self { pattern, label }
    }
}

/// True when `term` occurs in `text` starting at a word boundary.
///
/// Both arguments are expected lower-cased. Only the start of the match is
/// anchored, so `"cost"` matches `"costs"` but `"how"` does not match `"show"`.
pub fn mentions(text: &str, term: &str) -> bool {
    if term.is_empty() {
        return false;
    }
    let starts_word = |idx: usize| {
        text[..idx]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric())
    };
    // Terms that begin with punctuation (like "?") are matched anywhere.
    let anchored = term.chars().next().is_some_and(|c| c.is_alphanumeric());
    text.match_indices(term)
        .any(|(idx, _)| !anchored || starts_word(idx))
}

/// Like [`mentions`], but the match must also end on a word boundary, so
/// `"but"` does not match `"button"`.
pub fn mentions_word(text: &str, term: &str) -> bool {
    if term.is_empty() {
        return false;
    }
    let boundary = |c: Option<char>| c.map_or(true, |c| !c.is_alphanumeric());
    text.match_indices(term).any(|(idx, m)| {
        boundary(text[..idx].chars().next_back()) && boundary(text[idx + m.len()..].chars().next())
    })
}

/// True when any of `terms` is mentioned in `text`.
pub fn mentions_any(text: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| mentions(text, t))
}

/// Label of the first row whose pattern is mentioned in `text`.
pub fn first_match<L: Copy>(table: &[KeywordRule<L>], text: &str) -> Option<L> {
    table
        .iter()
        .find(|rule| mentions(text, rule.pattern))
        .map(|rule| rule.label)
}

/// Pattern of the first row mentioned in `text`.
pub fn first_matching_pattern<L>(table: &[KeywordRule<L>], text: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|rule| mentions(text, rule.pattern))
        .map(|rule| rule.pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &[KeywordRule<u8>] = &[
        KeywordRule::new("think about it", 1),
        KeywordRule::new("think", 2),
        KeywordRule::new("cost", 3),
    ];

    #[test]
    fn test_mentions_word_start() {
        assert!(mentions("the costs are high", "cost"));
        assert!(!mentions("show me", "how"));
        assert!(mentions("how does it work", "how"));
        assert!(mentions("ok, how?", "how"));
        assert!(!mentions("android apps", "roi"));
        assert!(mentions("what's the roi", "roi"));
        assert!(!mentions("anything", ""));
    }

    #[test]
    fn test_mentions_ignores_word_interiors() {
        assert!(!mentions("it's inexpensive", "expensive"));
        assert!(mentions("it's expensive", "expensive"));
        assert!(!mentions("you misunderstand me", "understand"));
        assert!(mentions("i understand", "understand"));
    }

    #[test]
    fn test_mentions_punctuation_term() {
        assert!(mentions("really?", "?"));
        assert!(!mentions("really.", "?"));
    }

    #[test]
    fn test_first_match_respects_order() {
        assert_eq!(first_match(TABLE, "let me think about it"), Some(1));
        assert_eq!(first_match(TABLE, "i think so"), Some(2));
        assert_eq!(first_match(TABLE, "what does it cost"), Some(3));
        assert_eq!(first_match(TABLE, "sounds great"), None);
        assert_eq!(first_matching_pattern(TABLE, "i think so"), Some("think"));
    }

    #[test]
    fn test_mentions_word_whole() {
        assert!(mentions_word("but we already pay", "but"));
        assert!(mentions_word("ok, but.", "but"));
        assert!(!mentions_word("click the button", "but"));
        assert!(!mentions_word("rebut", "but"));
    }

    #[test]
    fn test_mentions_any() {
        assert!(mentions_any("i see what you mean", &["understand", "i see"]));
        assert!(!mentions_any("ok", &["understand", "i see"]));
    }
}
