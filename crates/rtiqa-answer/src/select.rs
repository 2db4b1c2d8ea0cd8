//! Sentence segmentation, relevance filtering, and deduplication.

use regex::Regex;
use std::sync::LazyLock;

use rtiqa_core::config::SynthesisConfig;

use crate::clean::{normalize_whitespace, remove_short_tokens};

static TERMINAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]+").expect("terminal pattern"));

/// Split on runs of sentence-terminal punctuation and trim each piece.
/// Empty pieces are dropped.
pub fn segment(text: &str) -> Vec<&str> {
    TERMINAL.split(text).map(str::trim).filter(|s| !s.is_empty()).collect()
}

/// Keyword and blocklist vocabulary, lowercased once.
#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    keywords: Vec<String>,
    blocklist: Vec<String>,
    min_words: usize,
}

impl RelevanceFilter {
    pub fn new(config: &SynthesisConfig) -> Self {
        let mut blocklist = Vec::new();
        for phrase in &config.blocklist {
            let literal = phrase.trim().to_lowercase();
            if literal.is_empty() {
                continue;
            }
            // Text is matched after short-token removal, so "government of
            // india ministry" only survives as "government india ministry".
            // The cleaned form is kept when it is still a multi-word phrase.
            let cleaned = normalize_whitespace(&remove_short_tokens(&literal)).trim().to_string();
            if cleaned != literal && cleaned.split_whitespace().count() >= 2 {
                blocklist.push(cleaned);
            }
            blocklist.push(literal);
        }
        Self {
            keywords: config.keywords.iter().map(|k| k.trim().to_lowercase()).filter(|k| !k.is_empty()).collect(),
            blocklist,
            min_words: config.min_words,
        }
    }

    pub fn is_relevant(&self, sentence: &str) -> bool {
        if sentence.split_whitespace().count() < self.min_words {
            return false;
        }
        let lower = sentence.to_lowercase();
        self.keywords.iter().any(|k| lower.contains(k.as_str())) && !self.blocklist.iter().any(|b| lower.contains(b.as_str()))
    }
}

/// The first `limit` relevant sentences, in order.
pub fn select<'a>(sentences: &[&'a str], filter: &RelevanceFilter, limit: usize) -> Vec<&'a str> {
    sentences.iter().copied().filter(|s| filter.is_relevant(s)).take(limit).collect()
}

/// Greedily keep sentences that neither contain nor are contained in an
/// already kept sentence, ignoring case.
pub fn dedup<'a>(sentences: &[&'a str]) -> Vec<&'a str> {
    let mut kept: Vec<&'a str> = Vec::new();
    let mut kept_lower: Vec<String> = Vec::new();
    for &sentence in sentences {
        let lower = sentence.to_lowercase();
        if kept_lower.iter().any(|k| k.contains(lower.as_str()) || lower.contains(k.as_str())) {
            continue;
        }
        kept.push(sentence);
        kept_lower.push(lower);
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> RelevanceFilter {
        RelevanceFilter::new(&SynthesisConfig::default())
    }

    #[test]
    fn segment_splits_on_terminal_runs() {
        assert_eq!(segment("First one. Second?! Third... "), vec!["First one", "Second", "Third"]);
        assert!(segment("  ...  ").is_empty());
    }

    #[test]
    fn keyword_sentence_with_five_words_is_kept() {
        assert!(filter().is_relevant("Citizens have the right everywhere"));
    }

    #[test]
    fn sentence_without_keyword_is_dropped_regardless_of_length() {
        assert!(!filter().is_relevant("The quick brown fox jumps over the lazy dog near the river bank today"));
    }

    #[test]
    fn short_sentences_are_dropped() {
        assert!(!filter().is_relevant("Information Commission constituted"));
    }

    #[test]
    fn keywords_match_case_insensitively() {
        assert!(filter().is_relevant("PUBLIC AUTHORITY SHALL MAINTAIN RECORDS"));
    }

    #[test]
    fn blocklisted_boilerplate_is_dropped_before_and_after_cleaning() {
        let f = filter();
        assert!(!f.is_relevant("Government of India Ministry of Law and Justice information"));
        assert!(!f.is_relevant("Government India Ministry Law and Justice information"));
        assert!(!f.is_relevant("This Act as modified up to the 1st section"));
    }

    #[test]
    fn single_word_remnants_of_blocklist_phrases_do_not_block() {
        assert!(filter().is_relevant("The information may be modified under section eight"));
    }

    #[test]
    fn select_keeps_order_and_bound() {
        let f = filter();
        let sentences = ["right one two three", "noise only here now", "section four five six", "act seven eight nine"];
        assert_eq!(select(&sentences, &f, 2), vec!["right one two three", "section four five six"]);
    }

    #[test]
    fn dedup_drops_contained_and_containing_sentences() {
        let input = [
            "The Act establishes the right information",
            "the act establishes the right information for all citizens",
            "Every public authority shall maintain records",
            "public authority shall maintain",
        ];
        assert_eq!(dedup(&input), vec!["The Act establishes the right information", "Every public authority shall maintain records"]);
    }
}
