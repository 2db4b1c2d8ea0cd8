//! Text normalization for noisy PDF extractions.
//!
//! Each step is a pure `&str -> String` function; [`clean`] runs them in order.

use regex::Regex;
use std::sync::LazyLock;

static NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[^\w\s.,:;\-()\[\]'"]+"#).expect("noise pattern"));
static SHORT_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w{1,2}\b").expect("short token pattern"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern"));
static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").expect("word pattern"));

/// Replace every run of characters outside the allow-list with a space.
/// Allowed: word characters, whitespace, and `. , : ; - ( ) [ ] ' "`.
pub fn strip_noise(text: &str) -> String {
    NOISE.replace_all(text, " ").into_owned()
}

/// Replace standalone words of one or two characters with a space.
pub fn remove_short_tokens(text: &str) -> String {
    SHORT_TOKEN.replace_all(text, " ").into_owned()
}

/// Collapse whitespace runs to a single space. Leading and trailing
/// whitespace is collapsed too, not trimmed.
pub fn normalize_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").into_owned()
}

/// A word repeated three or more times in a row, separated only by
/// whitespace, is reduced to its first occurrence.
pub fn collapse_repeats(text: &str) -> String {
    let words: Vec<regex::Match<'_>> = WORD.find_iter(text).collect();
    let mut out = String::with_capacity(text.len());
    let mut copied_to = 0;
    let mut i = 0;
    while i < words.len() {
        let mut j = i + 1;
        while j < words.len()
            && words[j].as_str() == words[i].as_str()
            && is_whitespace_gap(&text[words[j - 1].end()..words[j].start()])
        {
            j += 1;
        }
        if j - i >= 3 {
            out.push_str(&text[copied_to..words[i].end()]);
            copied_to = words[j - 1].end();
        }
        i = j;
    }
    out.push_str(&text[copied_to..]);
    out
}

fn is_whitespace_gap(gap: &str) -> bool {
    !gap.is_empty() && gap.chars().all(char::is_whitespace)
}

pub fn clean(text: &str) -> String {
    let text = strip_noise(text);
    let text = remove_short_tokens(&text);
    let text = normalize_whitespace(&text);
    collapse_repeats(&text)
}
