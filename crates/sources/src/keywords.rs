//! Keyword tokenization used for profiles and content matching.

use std::collections::HashSet;

/// Shortest token kept
pub const MIN_TOKEN_LEN: usize = 3;

/// Common English words that carry no topical signal
pub const STOP_WORDS: &[&str] = &[
    "about", "after", "again", "all", "also", "and", "any", "are", "because", "been", "before",
    "being", "between", "both", "but", "can", "could", "did", "does", "doing", "down", "during",
    "each", "few", "for", "from", "further", "had", "has", "have", "having", "her", "here",
    "hers", "him", "his", "how", "into", "its", "just", "more", "most", "new", "not", "now",
    "off", "once", "only", "other", "our", "ours", "out", "over", "own", "same", "says", "she",
    "should", "some", "such", "than", "that", "the", "their", "theirs", "them", "then", "there",
    "these", "they", "this", "those", "through", "too", "under", "until", "very", "was", "were",
    "what", "when", "where", "which", "while", "who", "whom", "why", "will", "with", "would",
    "you", "your", "yours",
];

pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token)
}

/// Split text into its distinct keyword tokens.
///
/// A token is a maximal run of alphanumeric characters, lowercased, at least
/// [`MIN_TOKEN_LEN`] characters long and not a stop word.
pub fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|run| run.chars().count() >= MIN_TOKEN_LEN)
        .map(str::to_lowercase)
        .filter(|token| !is_stop_word(token))
        .collect()
}

/// Tokens of an item's title and summary together
pub fn content_tokens(title: &str, summary: &str) -> HashSet<String> {
    let mut tokens = tokenize(title);
    tokens.extend(tokenize(summary));
    tokens
}
