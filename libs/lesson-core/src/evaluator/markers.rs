//! Small fixed word lists used by the language heuristics.

use crate::types::Language;

const ENGLISH_MARKERS: &[&str] = &[
    "the", "is", "are", "i", "am", "you", "my", "your", "and", "hello", "name", "what", "good",
    "morning", "thank", "thanks", "this", "it", "im",
];

const GERMAN_MARKERS: &[&str] = &[
    "der", "die", "das", "ich", "bin", "und", "ist", "nicht", "ein", "eine", "hallo", "mein",
    "heiße", "heisse", "guten", "morgen", "danke", "wie", "du",
];

const SPANISH_MARKERS: &[&str] = &[
    "el", "los", "las", "yo", "soy", "estoy", "y", "hola", "mi", "que", "buenos", "días",
    "gracias", "cómo", "como", "me", "llamo",
];

const FRENCH_MARKERS: &[&str] = &[
    "le", "les", "je", "suis", "et", "bonjour", "mon", "ma", "tu", "une", "merci", "comment",
    "appelle", "cest", "est",
];

const GERMAN_ARTICLES: &[&str] = &[
    "der", "die", "das", "den", "dem", "des", "ein", "eine", "einen", "einem", "einer",
];

const SPANISH_ARTICLES: &[&str] = &["el", "la", "los", "las", "un", "una"];

const FRENCH_ARTICLES: &[&str] = &["le", "la", "les", "un", "une"];

/// Languages with curated marker sets.
pub(super) fn curated_languages() -> [Language; 4] {
    [
        Language::English,
        Language::German,
        Language::Spanish,
        Language::French,
    ]
}

pub(super) fn marker_set(language: &Language) -> Option<&'static [&'static str]> {
    match language {
        Language::English => Some(ENGLISH_MARKERS),
        Language::German => Some(GERMAN_MARKERS),
        Language::Spanish => Some(SPANISH_MARKERS),
        Language::French => Some(FRENCH_MARKERS),
        Language::Other(_) => None,
    }
}

pub(super) fn article_set(language: &Language) -> Option<&'static [&'static str]> {
    match language {
        Language::German => Some(GERMAN_ARTICLES),
        Language::Spanish => Some(SPANISH_ARTICLES),
        Language::French => Some(FRENCH_ARTICLES),
        Language::English | Language::Other(_) => None,
    }
}

pub(super) fn count_markers<'t>(
    markers: &[&str],
    tokens: impl Iterator<Item = &'t String>,
) -> usize {
    tokens
        .filter(|token| markers.contains(&token.as_str()))
        .count()
}
