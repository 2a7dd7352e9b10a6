//! Postal code matching.
//!
//! The compiled pattern is shared and immutable; `regex` keeps no scan
//! position between calls, so every call starts from the beginning of its
//! input.

use once_cell::sync::Lazy;
use regex::Regex;

/// Four ASCII digits, one whitespace character, two uppercase letters,
/// delimited by ASCII word boundaries. A non-ASCII letter such as `é` counts
/// as a non-word character on either side.
const POSTAL_CODE_PATTERN: &str = r"(?-u:\b)[0-9]{4}\s[A-Z]{2}(?-u:\b)";

static POSTAL_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(POSTAL_CODE_PATTERN).expect("postal code pattern is valid"));

/// One occurrence of a postal code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// The matched text.
    pub text: String,
    /// Byte offset into the source text.
    pub offset: usize,
}

impl Match {
    /// Byte offset just past the match.
    #[must_use]
    pub fn end(&self) -> usize {
        self.offset + self.text.len()
    }
}

/// All non-overlapping postal codes in `text`, left to right.
#[must_use]
pub fn find_matches(text: &str) -> Vec<Match> {
    POSTAL_CODE
        .find_iter(text)
        .map(|m| Match {
            text: m.as_str().to_string(),
            offset: m.start(),
        })
        .collect()
}

/// Whether `text` holds at least one postal code.
#[must_use]
pub fn contains_match(text: &str) -> bool {
    POSTAL_CODE.is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_match() {
        let matches = find_matches("Address: 1234 AB City");
        assert_eq!(
            matches,
            vec![Match {
                text: "1234 AB".to_string(),
                offset: 9
            }]
        );
        assert_eq!(matches[0].end(), 16);
    }

    #[test]
    fn test_rejects_near_misses() {
        assert!(find_matches("12345 AB").is_empty());
        assert!(find_matches("1234 A").is_empty());
        assert!(find_matches("1234 ab").is_empty());
        assert!(find_matches("1234 ABC").is_empty());
        assert!(find_matches("1234AB").is_empty());
        assert!(find_matches("x1234 AB").is_empty());
    }

    #[test]
    fn test_non_ascii_neighbours_are_boundaries() {
        let trailing = find_matches("1234 ABé");
        assert_eq!(trailing.len(), 1);
        assert_eq!(trailing[0].text, "1234 AB");
        assert_eq!(trailing[0].offset, 0);

        let leading = find_matches("é1234 AB");
        assert_eq!(leading.len(), 1);
        assert_eq!(leading[0].text, "1234 AB");
        assert_eq!(leading[0].offset, 'é'.len_utf8());

        assert!(contains_match("Café 1011 AB"));
        assert!(find_matches("1234 ABx").is_empty());
    }

    #[test]
    fn test_multiple_matches_in_order() {
        let matches = find_matches("From 1011 AB to 3511 CD, via 9999 ZZ.");
        let codes: Vec<_> = matches.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(codes, vec!["1011 AB", "3511 CD", "9999 ZZ"]);
        assert!(matches.windows(2).all(|w| w[0].end() <= w[1].offset));
    }

    #[test]
    fn test_repeated_calls_are_independent() {
        // A stateful global matcher would resume from the previous position.
        let text = "1234 AB";
        assert!(contains_match(text));
        assert_eq!(find_matches(text).len(), 1);
        assert!(contains_match(text));
        assert_eq!(find_matches(text).len(), 1);
        assert_eq!(find_matches("5678 CD and 1234 AB").len(), 2);
        assert_eq!(find_matches(text)[0].offset, 0);
    }

    #[test]
    fn test_other_whitespace_separators() {
        assert_eq!(find_matches("1234\tAB").len(), 1);
        assert_eq!(find_matches("1234\u{a0}AB").len(), 1);
    }

    #[test]
    fn test_offsets_are_byte_offsets() {
        let text = "Straße 1234 AB";
        let matches = find_matches(text);
        assert_eq!(&text[matches[0].offset..matches[0].end()], "1234 AB");
    }

    #[test]
    fn test_empty_input() {
        assert!(find_matches("").is_empty());
        assert!(!contains_match(""));
    }
}
