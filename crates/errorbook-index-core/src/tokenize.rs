//! Entry tokenizer.
//!
//! The index builder and the coverage gate both call [`tokenize`]; they must
//! agree on the token set of every entry, so this is the only place where
//! entry text becomes tokens.

use std::collections::BTreeSet;

use crate::models::Entry;

/// Characters that may appear inside a token after lowercasing.
fn is_token_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'
}

/// Split one raw text chunk into tokens of at least `min_token_length`
/// characters.
///
/// The chunk is trimmed and lowercased, then split on every maximal run of
/// characters outside `[a-z0-9_]`. Empty pieces are never tokens, even
/// with a zero minimum.
pub fn split_tokens(text: &str, min_token_length: usize) -> Vec<String> {
    let normalized = text.trim().to_lowercase();
    normalized
        .split(|c: char| !is_token_char(c))
        .filter(|piece| !piece.is_empty() && piece.len() >= min_token_length)
        .map(str::to_string)
        .collect()
}

/// Deduplicated token set of an entry's text and tag fields.
pub fn tokenize(entry: &Entry, min_token_length: usize) -> BTreeSet<String> {
    entry
        .text_chunks()
        .flat_map(|chunk| split_tokens(chunk, min_token_length))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn entry(value: Value) -> Entry {
        serde_json::from_value(value).unwrap()
    }

    fn set(tokens: &[&str]) -> BTreeSet<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_order_approval_scenario() {
        let entry = entry(json!({
            "title": "Order approval timeout",
            "tags": ["order", "sla"]
        }));
        assert_eq!(
            tokenize(&entry, 2),
            set(&["order", "approval", "timeout", "sla"])
        );
    }

    #[test]
    fn test_split_on_runs_of_separators() {
        assert_eq!(
            split_tokens("  HTTP/2 -- retry_after: 30s!! ", 2),
            vec!["http", "retry_after", "30s"]
        );
    }

    #[test]
    fn test_min_length_filters_short_pieces() {
        assert_eq!(split_tokens("a bb ccc", 3), vec!["ccc"]);
        assert_eq!(split_tokens("a bb ccc", 1), vec!["a", "bb", "ccc"]);
        assert_eq!(split_tokens("--a--", 0), vec!["a"]);
    }

    #[test]
    fn test_non_ascii_letters_split() {
        assert_eq!(split_tokens("Zahlungsfehler Über café", 2), vec!["zahlungsfehler", "ber", "caf"]);
    }

    #[test]
    fn test_deterministic() {
        let entry = entry(json!({
            "title": "Payment refund stuck",
            "notes": "see invoice INV-42"
        }));
        assert_eq!(tokenize(&entry, 2), tokenize(&entry, 2));
    }

    #[test]
    fn test_tag_order_does_not_matter() {
        let a = entry(json!({
            "tags": ["login", "token", "expired"],
            "ontology_tags": ["auth", "session"]
        }));
        let b = entry(json!({
            "ontology_tags": ["session", "auth"],
            "tags": ["expired", "login", "token"]
        }));
        assert_eq!(tokenize(&a, 2), tokenize(&b, 2));
    }

    #[test]
    fn test_empty_and_absent_fields_yield_nothing() {
        assert!(tokenize(&Entry::default(), 2).is_empty());

        let blank = entry(json!({
            "title": "   ",
            "symptom": "",
            "notes": null,
            "tags": []
        }));
        assert!(tokenize(&blank, 2).is_empty());
    }

    #[test]
    fn test_non_string_values_contribute_nothing() {
        let entry = entry(json!({
            "title": 12345,
            "tags": [true, "checkout"],
            "fix_actions": {"step": "retry"}
        }));
        assert_eq!(tokenize(&entry, 2), set(&["checkout"]));
    }

    #[test]
    fn test_all_fields_are_read() {
        let entry = entry(json!({
            "title": "t1",
            "symptom": "s1",
            "root_cause": "r1",
            "notes": "n1",
            "tags": ["g1"],
            "ontology_tags": ["o1"],
            "fix_actions": ["f1"],
            "verification_evidence": ["v1"],
            "status": "ignored"
        }));
        assert_eq!(
            tokenize(&entry, 2),
            set(&["t1", "s1", "r1", "n1", "g1", "o1", "f1", "v1"])
        );
    }
}
