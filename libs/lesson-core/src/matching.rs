//! Text normalization and edit distance for typed answers.

/// Characters removed by `normalize`.
const STRIPPED_PUNCTUATION: &[char] = &[
    '.', ',', '!', '?', ';', ':', '"', '\'', '(', ')', '[', ']', '{', '}',
];

/// Apostrophe look-alikes folded to `'` before stripping.
const APOSTROPHE_VARIANTS: &[char] = &['\u{2019}', '\u{2018}', '\u{02BC}', '`', '\u{00B4}'];

/// Canonicalize text for comparison.
///
/// Lowercases, unifies apostrophe variants, strips `.,!?;:"'()[]{}`, then
/// trims and collapses internal whitespace. Idempotent.
pub fn normalize(text: &str) -> String {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| if APOSTROPHE_VARIANTS.contains(&c) { '\'' } else { c })
        .filter(|c| !STRIPPED_PUNCTUATION.contains(c))
        .collect();

    normalize_whitespace(&cleaned)
}

/// Split normalized text into whitespace-separated tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Normalize whitespace in a string (trim and collapse multiple spaces).
fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Calculate Levenshtein distance between two strings.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    let m = a_chars.len();
    let n = b_chars.len();

    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }

    // Two rows instead of the full matrix
    let mut prev = (0..=n).collect::<Vec<_>>();
    let mut curr = vec![0; n + 1];

    for i in 1..=m {
        curr[0] = i;

        for j in 1..=n {
            let cost = if a_chars[i - 1] == b_chars[j - 1] {
                0
            } else {
                1
            };

            curr[j] = (prev[j] + 1) // deletion
                .min(curr[j - 1] + 1) // insertion
                .min(prev[j - 1] + cost); // substitution
        }

        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_basics() {
        assert_eq!(normalize("  Hello,   World!  "), "hello world");
        assert_eq!(normalize("What's your name?"), "whats your name");
        assert_eq!(normalize("What\u{2019}s your name?"), "whats your name");
        assert_eq!(normalize("(der) [Tisch] {x}"), "der tisch x");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize(" ?!. "), "");
    }

    #[test]
    fn test_normalize_keeps_letters_outside_ascii() {
        assert_eq!(normalize("Ich heiße Jürgen."), "ich heiße jürgen");
        assert_eq!(normalize("¿Cómo estás?"), "¿cómo estás");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = [
            "  Hello,   World!  ",
            "I\u{2019}m  Anna.",
            "Der   TISCH",
            "My name is [Your name]",
            "\t\n weird\u{00B4}s \"quotes\" ",
            "ÉCOLE",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", s);
        }
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("  Der  Tisch. "), vec!["der", "tisch"]);
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn test_levenshtein_distance() {
        assert_eq!(levenshtein_distance("", ""), 0);
        assert_eq!(levenshtein_distance("abc", "abc"), 0);
        assert_eq!(levenshtein_distance("abc", ""), 3);
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("saturday", "sunday"), 3);
        assert_eq!(levenshtein_distance("tüsch", "tisch"), 1);
    }

    #[test]
    fn test_levenshtein_is_symmetric() {
        let pairs = [
            ("kitten", "sitting"),
            ("hello", "helo"),
            ("", "abc"),
            ("guten morgen", "morgen"),
        ];
        for (a, b) in pairs {
            assert_eq!(levenshtein_distance(a, b), levenshtein_distance(b, a));
            assert_eq!(levenshtein_distance(a, a), 0);
        }
    }
}
