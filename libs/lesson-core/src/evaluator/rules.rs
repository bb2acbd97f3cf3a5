//! Rule implementations for the evaluation chain.

use super::markers::{article_set, count_markers, curated_languages, marker_set};
use super::EvaluationContext;
use crate::matching::{levenshtein_distance, normalize};
use crate::types::{AnswerEvaluation, ReasonCode};

/// Canonical endings where "your name" stands in for the learner's own name.
const YOUR_NAME_PHRASES: &[&str] = &[
    "my name is your name",
    "i am your name",
    "im your name",
    "call me your name",
];

const BLANK_MARKER: &str = "___";

/// Return the remainder after `prefix` when `text` starts with it on a word
/// boundary. An exact match yields an empty remainder.
pub(super) fn strip_word_prefix<'t>(text: &'t str, prefix: &str) -> Option<&'t str> {
    let rest = text.strip_prefix(prefix)?;
    if rest.is_empty() {
        Some(rest)
    } else {
        rest.strip_prefix(' ')
    }
}

fn strip_word_suffix<'t>(text: &'t str, suffix: &str) -> Option<&'t str> {
    let rest = text.strip_suffix(suffix)?;
    if rest.is_empty() {
        Some(rest)
    } else {
        rest.strip_suffix(' ')
    }
}

/// Normalized literal text before the first slot of a templated answer.
pub(super) fn placeholder_prefix(canonical: &str) -> Option<String> {
    let lower = canonical.to_lowercase();

    let bracket = ['[', '{', '<']
        .iter()
        .zip([']', '}', '>'])
        .filter_map(|(open, close)| {
            let start = lower.find(*open)?;
            lower[start..].contains(close).then_some(start)
        })
        .min();

    let prefix = match bracket {
        Some(start) => normalize(&lower[..start]),
        None => {
            let normalized = normalize(&lower);
            YOUR_NAME_PHRASES.iter().find_map(|phrase| {
                let head = strip_word_suffix(&normalized, phrase)?;
                let literal = phrase.strip_suffix("your name")?;
                Some(normalize(&format!("{} {}", head, literal)))
            })?
        }
    };

    (!prefix.is_empty()).then_some(prefix)
}

fn extract_blank_value(template: &str, user: &str) -> Option<String> {
    let start = template.find(BLANK_MARKER)?;
    let marker_end = start
        + template[start..]
            .find(|c: char| c != '_')
            .unwrap_or(template.len() - start);

    let prefix = normalize(&template[..start]);
    let suffix = normalize(&template[marker_end..]);

    let mut middle = user;
    if !prefix.is_empty() {
        middle = strip_word_prefix(middle, &prefix)?;
    }
    if !suffix.is_empty() {
        middle = strip_word_suffix(middle, &suffix)?;
    }

    (!middle.is_empty()).then(|| middle.to_string())
}

pub(super) fn blank_fill(ctx: &EvaluationContext<'_>) -> Option<AnswerEvaluation> {
    let blank = ctx.question.blank.as_ref()?;

    let filled = blank
        .template
        .as_deref()
        .and_then(|template| extract_blank_value(template, &ctx.user))
        .unwrap_or_else(|| ctx.user.clone());

    blank
        .answers
        .iter()
        .map(|answer| normalize(answer))
        .any(|answer| !answer.is_empty() && answer == filled)
        .then(AnswerEvaluation::correct)
}

pub(super) fn exact_match(ctx: &EvaluationContext<'_>) -> Option<AnswerEvaluation> {
    ctx.all_forms()
        .any(|form| form == ctx.user)
        .then(AnswerEvaluation::correct)
}

pub(super) fn placeholder_template(ctx: &EvaluationContext<'_>) -> Option<AnswerEvaluation> {
    let prefix = ctx.placeholder_prefix.as_deref()?;

    match strip_word_prefix(&ctx.user, prefix)? {
        "" => Some(AnswerEvaluation::almost(ReasonCode::MissingSlot)),
        _ => Some(AnswerEvaluation::correct()),
    }
}

pub(super) fn wrong_language(ctx: &EvaluationContext<'_>) -> Option<AnswerEvaluation> {
    let target_markers = marker_set(ctx.language);
    let target_count = target_markers
        .map(|markers| count_markers(markers, ctx.user_tokens.iter()))
        .unwrap_or(0);

    // Words the answer key itself uses never count as foreign.
    let expected_tokens: Vec<&str> = ctx
        .expected_forms()
        .flat_map(str::split_whitespace)
        .collect();
    let foreign_tokens: Vec<&String> = ctx
        .user_tokens
        .iter()
        .filter(|token| !expected_tokens.contains(&token.as_str()))
        .collect();

    let best_other = curated_languages()
        .iter()
        .filter(|language| *language != ctx.language)
        .filter_map(marker_set)
        .map(|markers| count_markers(markers, foreign_tokens.iter().copied()))
        .max()
        .unwrap_or(0);

    let dominates = if target_markers.is_some() {
        best_other >= 2 && best_other > target_count * 2
    } else {
        best_other >= 3
    };

    dominates.then(|| AnswerEvaluation::wrong(ReasonCode::WrongLanguage))
}

pub(super) fn article_mismatch(ctx: &EvaluationContext<'_>) -> Option<AnswerEvaluation> {
    let articles = article_set(ctx.language)?;
    let user = &ctx.user_tokens;
    let (user_article, user_rest) = user.split_first()?;
    if user_rest.is_empty() || !articles.contains(&user_article.as_str()) {
        return None;
    }

    ctx.expected_forms()
        .any(|form| {
            let expected: Vec<&str> = form.split_whitespace().collect();
            match expected.split_first() {
                Some((article, rest)) => {
                    articles.contains(article)
                        && *article != user_article.as_str()
                        && rest.len() == user_rest.len()
                        && rest.iter().zip(user_rest).all(|(e, u)| *e == u.as_str())
                }
                None => false,
            }
        })
        .then(|| AnswerEvaluation::almost(ReasonCode::Article))
}

pub(super) fn word_order(ctx: &EvaluationContext<'_>) -> Option<AnswerEvaluation> {
    if ctx.user_tokens.len() < 2 {
        return None;
    }

    let mut user_sorted: Vec<&str> = ctx.user_tokens.iter().map(String::as_str).collect();
    user_sorted.sort_unstable();

    ctx.expected_forms()
        .any(|form| {
            let expected: Vec<&str> = form.split_whitespace().collect();
            if expected.len() != ctx.user_tokens.len() || form == ctx.user {
                return false;
            }
            let mut expected_sorted = expected;
            expected_sorted.sort_unstable();
            expected_sorted == user_sorted
        })
        .then(|| AnswerEvaluation::almost(ReasonCode::WordOrder))
}

/// Allowed edits for an expected answer of this length.
fn typo_budget(expected: &str) -> usize {
    if expected.chars().count() <= 6 {
        1
    } else {
        2
    }
}

pub(super) fn typo(ctx: &EvaluationContext<'_>) -> Option<AnswerEvaluation> {
    std::iter::once(ctx.canonical.as_str())
        .chain(ctx.examples.iter().map(String::as_str))
        .filter(|expected| !expected.is_empty())
        .any(|expected| {
            let distance = levenshtein_distance(&ctx.user, expected);
            distance > 0 && distance <= typo_budget(expected)
        })
        .then(|| AnswerEvaluation::almost(ReasonCode::Typo))
}
