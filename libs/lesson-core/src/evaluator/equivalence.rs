//! Named equivalences for common phrasing classes.
//!
//! Each matcher recognizes one class of learner phrasing that is correct in
//! spirit but differs from every stored form. They run in `EQUIVALENCES` order
//! and the first match decides.

use super::rules::strip_word_prefix;
use super::EvaluationContext;
use crate::types::AnswerEvaluation;

type Matcher = fn(&EvaluationContext<'_>) -> bool;

const EQUIVALENCES: &[(&str, Matcher)] = &[
    ("contracted_self_introduction", contracted_self_introduction),
    ("contracted_whats_your_name", contracted_whats_your_name),
    ("short_fine_reply", short_fine_reply),
    ("greeting_there", greeting_there),
    ("bare_morning", bare_morning),
];

const GREETINGS: &[&str] = &["hello", "hi", "hey"];

const FINE_REPLIES: &[&str] = &[
    "fine",
    "fine thanks",
    "fine thank you",
    "i am fine",
    "i am fine thanks",
    "i am fine thank you",
];

pub(super) fn named_equivalence(ctx: &EvaluationContext<'_>) -> Option<AnswerEvaluation> {
    EQUIVALENCES
        .iter()
        .any(|(_, matches)| matches(ctx))
        .then(AnswerEvaluation::correct)
}

/// Rewrite a leading contraction (`im`, `whats`) to its long form.
fn expand_leading(text: &str, short: &str, long: &str) -> String {
    match strip_word_prefix(text, short) {
        Some("") => long.to_string(),
        Some(rest) => format!("{} {}", long, rest),
        None => text.to_string(),
    }
}

fn contracted_self_introduction(ctx: &EvaluationContext<'_>) -> bool {
    let user = expand_leading(&ctx.user, "im", "i am");
    if strip_word_prefix(&user, "i am").is_none() {
        return false;
    }

    if ctx
        .expected_forms()
        .any(|form| expand_leading(form, "im", "i am") == user)
    {
        return true;
    }

    ctx.placeholder_prefix.as_deref().is_some_and(|prefix| {
        let prefix = expand_leading(prefix, "im", "i am");
        strip_word_prefix(&user, &prefix).is_some_and(|slot| !slot.is_empty())
    })
}

fn contracted_whats_your_name(ctx: &EvaluationContext<'_>) -> bool {
    let user = expand_leading(&ctx.user, "whats", "what is");
    ctx.expected_forms()
        .filter(|form| form.contains("your name"))
        .any(|form| expand_leading(form, "whats", "what is") == user)
}

fn short_fine_reply(ctx: &EvaluationContext<'_>) -> bool {
    let user = expand_leading(&ctx.user, "im", "i am");
    if !FINE_REPLIES.contains(&user.as_str()) {
        return false;
    }

    ctx.all_forms().any(|form| {
        let form = expand_leading(form, "im", "i am");
        strip_word_prefix(&form, "fine").is_some() || strip_word_prefix(&form, "i am fine").is_some()
    })
}

fn greeting_there(ctx: &EvaluationContext<'_>) -> bool {
    let base = ctx.user.strip_suffix(" there").unwrap_or(ctx.user.as_str());
    if !GREETINGS.contains(&base) {
        return false;
    }

    ctx.all_forms().any(|form| {
        let form = form.strip_suffix(" there").unwrap_or(form);
        GREETINGS.contains(&form)
    })
}

fn bare_morning(ctx: &EvaluationContext<'_>) -> bool {
    ctx.user == "morning" && ctx.all_forms().any(|form| form == "good morning")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Language, Question};

    static ENGLISH: Language = Language::English;

    fn ctx_for<'a>(question: &'a Question, answer: &str) -> EvaluationContext<'a> {
        EvaluationContext::new(question, answer, &ENGLISH)
    }

    #[test]
    fn test_expand_leading() {
        assert_eq!(expand_leading("im anna", "im", "i am"), "i am anna");
        assert_eq!(expand_leading("im", "im", "i am"), "i am");
        assert_eq!(expand_leading("immer", "im", "i am"), "immer");
        assert_eq!(expand_leading("whats up", "whats", "what is"), "what is up");
    }

    #[test]
    fn equivalences_have_unique_names() {
        let mut names: Vec<&str> = EQUIVALENCES.iter().map(|(name, _)| *name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), EQUIVALENCES.len());
    }

    #[test]
    fn greeting_requires_greeting_answer() {
        let q = Question::new("q1", "Say goodbye", "Goodbye", "greetings");
        assert!(!greeting_there(&ctx_for(&q, "hi there")));

        let q = Question::new("q1", "Say hello", "Hello there", "greetings");
        assert!(greeting_there(&ctx_for(&q, "hey")));
    }

    #[test]
    fn fine_reply_requires_fine_answer() {
        let q = Question::new("q1", "How are you?", "I am tired", "feelings");
        assert!(!short_fine_reply(&ctx_for(&q, "fine")));

        let q = Question::new("q1", "How are you?", "I'm fine.", "feelings");
        assert!(short_fine_reply(&ctx_for(&q, "fine thank you")));
    }

    #[test]
    fn self_introduction_without_i_am_is_ignored() {
        let q = Question::new("q1", "Introduce yourself", "My name is Anna", "intro");
        assert!(!contracted_self_introduction(&ctx_for(&q, "I'm Anna")));
    }
}
