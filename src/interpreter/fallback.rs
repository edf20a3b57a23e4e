//! Rule-based prompt interpretation
//!
//! Used whenever the AI path is unconfigured or fails. It performs no I/O and
//! cannot fail: availability, language and year hints are picked out with
//! fixed patterns, and whatever words remain become keywords.

use crate::filters::SearchFilters;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::sync::OnceLock;

/// Explanation attached to every rule-based result
pub const FALLBACK_EXPLANATION: &str =
    "Filters extracted using rule-based analysis (AI provider unavailable).";

/// Recognised language names and their canonical spelling, in priority order
const LANGUAGES: &[(&str, &str)] = &[
    ("arabic", "Arabic"),
    ("english", "English"),
    ("french", "French"),
    ("spanish", "Spanish"),
    ("german", "German"),
    ("chinese", "Chinese"),
    ("japanese", "Japanese"),
];

/// Words that never make useful search terms
const STOP_WORDS: &[&str] = &[
    "any", "the", "a", "an", "about", "from", "for", "in", "on", "of", "to", "with", "is", "are",
    "was", "were", "be", "been", "books", "book", "available", "last", "years", "year", "short",
    "long", "find", "search", "show", "me", "please", "i", "want", "looking", "need",
];

struct Patterns {
    available: Regex,
    year: Regex,
    last_years: Regex,
    separator: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        available: Regex::new(r"(?i)\bavailab\w*").expect("valid availability pattern"),
        year: Regex::new(r"\b(1[89]\d{2}|20\d{2})\b").expect("valid year pattern"),
        last_years: Regex::new(r"(?i)last\s+(\d+)\s+years?").expect("valid range pattern"),
        separator: Regex::new(r"[^\w]+").expect("valid separator pattern"),
    })
}

/// Extract filters from `prompt` using `current_year` for relative ranges
pub fn interpret(prompt: &str, current_year: i32) -> SearchFilters {
    let patterns = patterns();
    let prompt = prompt.trim();
    let mut filters = SearchFilters::default();

    if patterns.available.is_match(prompt) {
        filters.available_only = Some(true);
    }

    let tokens: Vec<&str> = patterns
        .separator
        .split(prompt)
        .filter(|token| !token.is_empty())
        .collect();

    let language = LANGUAGES
        .iter()
        .find(|(name, _)| tokens.iter().any(|token| token.eq_ignore_ascii_case(name)));
    if let Some((_, canonical)) = language {
        filters.language = Some(canonical.to_string());
    }

    let years: BTreeSet<i32> = patterns
        .year
        .find_iter(prompt)
        .filter_map(|m| m.as_str().parse().ok())
        .collect();
    match (years.first(), years.last()) {
        (Some(&min), Some(&max)) if min != max => {
            filters.publish_year_min = Some(min);
            filters.publish_year_max = Some(max);
        }
        (Some(&year), _) => filters.publish_year_min = Some(year),
        _ => {}
    }

    let span = patterns
        .last_years
        .captures(prompt)
        .and_then(|caps| caps.get(1))
        .and_then(|n| n.as_str().parse::<i32>().ok());
    if let Some(min) = span.and_then(|n| current_year.checked_sub(n)) {
        filters.publish_year_min = Some(min);
        filters.publish_year_max = Some(current_year);
    }

    let language_word = language.map(|(name, _)| *name);
    let mut seen = HashSet::new();
    let keywords: Vec<String> = tokens
        .into_iter()
        .filter(|token| is_keyword(token, language_word))
        .filter(|token| seen.insert(token.to_lowercase()))
        .map(str::to_string)
        .collect();

    if !keywords.is_empty() {
        filters.keywords = Some(keywords);
    }

    filters
}

fn is_keyword(token: &str, language_word: Option<&str>) -> bool {
    if token.chars().count() <= 1 || token.chars().all(char::is_numeric) {
        return false;
    }

    let lower = token.to_lowercase();
    if STOP_WORDS.contains(&lower.as_str()) {
        return false;
    }

    language_word != Some(lower.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords(filters: &SearchFilters) -> Vec<&str> {
        filters
            .keywords
            .iter()
            .flatten()
            .map(String::as_str)
            .collect()
    }

    #[test]
    fn test_available_french_cooking_books() {
        let filters = interpret("available french cooking books", 2025);

        assert_eq!(filters.available_only, Some(true));
        assert_eq!(filters.language.as_deref(), Some("French"));
        assert_eq!(keywords(&filters), vec!["cooking"]);
    }

    #[test]
    fn test_year_range_from_two_years() {
        let filters = interpret("books from 2010 to 1990", 2025);

        assert_eq!(filters.publish_year_min, Some(1990));
        assert_eq!(filters.publish_year_max, Some(2010));
        assert!(filters.keywords.is_none());
    }

    #[test]
    fn test_single_year_sets_lower_bound_only() {
        let filters = interpret("science fiction 1984", 2025);

        assert_eq!(filters.publish_year_min, Some(1984));
        assert_eq!(filters.publish_year_max, None);
        assert_eq!(keywords(&filters), vec!["science", "fiction"]);
    }

    #[test]
    fn test_repeated_year_is_not_a_range() {
        let filters = interpret("1999 and 1999 again", 2025);

        assert_eq!(filters.publish_year_min, Some(1999));
        assert_eq!(filters.publish_year_max, None);
    }

    #[test]
    fn test_last_n_years_overrides_range() {
        let filters = interpret("history books from 1900 in the LAST 5 Years", 2025);

        assert_eq!(filters.publish_year_min, Some(2020));
        assert_eq!(filters.publish_year_max, Some(2025));
        assert_eq!(keywords(&filters), vec!["history"]);
    }

    #[test]
    fn test_language_is_whole_word_and_first_in_table_order() {
        let filters = interpret("germany travel guide", 2025);
        assert_eq!(filters.language, None);
        assert_eq!(keywords(&filters), vec!["germany", "travel", "guide"]);

        let filters = interpret("french or english poetry", 2025);
        assert_eq!(filters.language.as_deref(), Some("English"));
        assert_eq!(keywords(&filters), vec!["french", "or", "poetry"]);
    }

    #[test]
    fn test_keywords_deduplicate_case_insensitively() {
        let filters = interpret("Dragons dragons DRAGONS and wizards", 2025);

        assert_eq!(keywords(&filters), vec!["Dragons", "and", "wizards"]);
    }

    #[test]
    fn test_drops_short_and_numeric_tokens() {
        let filters = interpret("x 42 availability of C programming", 2025);

        assert_eq!(filters.available_only, Some(true));
        assert_eq!(keywords(&filters), vec!["availability", "programming"]);
    }

    #[test]
    fn test_only_exact_available_is_a_stop_word() {
        let filters = interpret("availability of dune", 2025);

        assert_eq!(keywords(&filters), vec!["availability", "dune"]);

        let filters = interpret("available dune", 2025);
        assert_eq!(keywords(&filters), vec!["dune"]);
    }

    #[test]
    fn test_nothing_useful_leaves_filters_empty() {
        let filters = interpret("  show me the books please  ", 2025);

        assert!(filters.is_empty());
    }
}
