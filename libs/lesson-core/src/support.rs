//! Whether a tutor reply should carry bilingual support.

use serde::{Deserialize, Serialize};

use crate::types::{AnswerEvaluation, ReasonCode};

/// How much scaffolding the host adds around feedback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportLevel {
    High,
    #[default]
    Medium,
    Low,
}

impl SupportLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SupportLevel::High => "high",
            SupportLevel::Medium => "medium",
            SupportLevel::Low => "low",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "high" => Some(SupportLevel::High),
            "medium" => Some(SupportLevel::Medium),
            "low" => Some(SupportLevel::Low),
            _ => None,
        }
    }
}

/// Decide whether to include support with the reply for this attempt.
///
/// An explicit override always wins. Correct answers never get support.
/// Otherwise `High` always includes it, `Medium` from the second attempt on
/// or when the learner answered in the wrong language, and `Low` only when
/// the answer is about to be revealed.
pub fn should_include_support(
    level: SupportLevel,
    evaluation: &AnswerEvaluation,
    attempt_count: u32,
    max_attempts: u32,
    include_support_override: Option<bool>,
) -> bool {
    if let Some(include) = include_support_override {
        return include;
    }
    if evaluation.is_correct() {
        return false;
    }

    let revealing = attempt_count >= max_attempts.max(1);
    match level {
        SupportLevel::High => true,
        SupportLevel::Medium => {
            attempt_count >= 2 || evaluation.reason == Some(ReasonCode::WrongLanguage) || revealing
        }
        SupportLevel::Low => revealing,
    }
}
