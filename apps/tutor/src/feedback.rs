//! Templated tutor replies.

use lesson_core::{AnswerOutcome, EvaluationResult, Hint, Language, ReasonCode, SessionState};

/// Display name for a lesson language.
pub fn language_name(language: &Language) -> &str {
    match language {
        Language::English => "English",
        Language::German => "German",
        Language::Spanish => "Spanish",
        Language::French => "French",
        Language::Other(code) => code,
    }
}

fn reason_message(reason: Option<ReasonCode>, language: &Language) -> String {
    match reason {
        Some(ReasonCode::Typo) => "Almost! Check your spelling.".to_string(),
        Some(ReasonCode::Article) => "Almost! Check the article.".to_string(),
        Some(ReasonCode::WordOrder) => "Almost! The words are right but the order is off.".to_string(),
        Some(ReasonCode::MissingSlot) => "Almost! Fill in your own name.".to_string(),
        Some(ReasonCode::WrongLanguage) => format!(
            "That looks like another language. Try answering in {}.",
            language_name(language)
        ),
        Some(ReasonCode::Other) | None => "Not quite.".to_string(),
    }
}

/// Build the reply text for a recorded answer.
///
/// Deterministic for a given outcome: the reason code picks the message and
/// the transition adds the hint, reveal or lesson-complete line.
pub fn compose(outcome: &AnswerOutcome, language: &Language) -> String {
    let mut parts: Vec<String> = Vec::new();

    match outcome.evaluation.result {
        EvaluationResult::Correct => parts.push("Correct!".to_string()),
        EvaluationResult::Almost | EvaluationResult::Wrong => {
            if outcome.repeated_same_wrong {
                parts.push("That's the same answer as last time.".to_string());
            }
            parts.push(reason_message(outcome.evaluation.reason, language));
        }
    }

    match &outcome.transition.hint {
        Some(Hint::Level { text, .. }) => parts.push(format!("Hint: {}", text)),
        Some(Hint::Reveal {
            explanation,
            answer,
        }) => {
            parts.push(format!("The answer is \"{}\".", answer));
            if let Some(explanation) = explanation {
                parts.push(explanation.clone());
            }
            parts.push("We'll come back to this one in review.".to_string());
        }
        None => {}
    }

    if outcome.transition.next_state == SessionState::Complete {
        parts.push("Lesson complete!".to_string());
    }

    parts.join(" ")
}
