//! Centralized keyword matching.
//!
//! Single-word entries match on word boundaries; multi-word phrases match by
//! substring. Every classifier in the runtime goes through these two
//! functions so the matching rules cannot drift apart.

/// Whole-word containment: `word` appears in `text` with non-alphanumeric
/// characters (or string edges) on both sides. Both inputs lowercase.
pub fn word_match(text: &str, word: &str) -> bool {
    let mut start = 0;
    while let Some(pos) = text[start..].find(word) {
        let begin = start + pos;
        let end = begin + word.len();
        let left_ok = begin == 0
            || !text[..begin].chars().next_back().map(char::is_alphanumeric).unwrap_or(false);
        let right_ok = end == text.len()
            || !text[end..].chars().next().map(char::is_alphanumeric).unwrap_or(false);
        if left_ok && right_ok {
            return true;
        }
        start = begin + word.len().max(1);
    }
    false
}

/// Phrase containment for multi-word entries; plain substring.
pub fn phrase_match(text: &str, phrase: &str) -> bool {
    text.contains(phrase)
}

/// Whether a table entry matches, picking the boundary rule by entry shape.
pub fn entry_match(text: &str, entry: &str) -> bool {
    if entry.contains(' ') {
        phrase_match(text, entry)
    } else {
        word_match(text, entry)
    }
}

/// Count of entries from `table` that match `text`. `text` must already be
/// lowercase.
pub fn score_group(text: &str, table: &[&str]) -> usize {
    table.iter().filter(|entry| entry_match(text, entry)).count()
}

/// Lowercased alphanumeric tokens of an utterance, in order.
pub fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Tokens preserving their original casing.
pub fn raw_tokens(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_boundaries_respected() {
        assert!(word_match("show me the price", "price"));
        assert!(!word_match("priceless artifacts", "price"));
        assert!(word_match("price.", "price"));
    }

    #[test]
    fn phrases_match_by_substring() {
        assert!(entry_match("please sign up now", "sign up"));
        assert!(!entry_match("signal upgrade", "sign up"));
    }

    #[test]
    fn group_scores_count_matches() {
        assert_eq!(score_group("compare the plans and prices", &["compare", "versus"]), 1);
        assert_eq!(score_group("what is this", &["compare", "versus"]), 0);
    }
}
