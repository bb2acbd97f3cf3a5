//! Core types for the lesson engine.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LessonError, Result};
use crate::review::{ReviewCandidates, ReviewQueueEntry};

/// Maximum number of entries kept in a learner's recent-confusion list.
pub const RECENT_CONFUSION_CAP: usize = 20;

/// Outcome class of an evaluated answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationResult {
    Correct,
    Almost,
    Wrong,
}

impl EvaluationResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Correct => "correct",
            Self::Almost => "almost",
            Self::Wrong => "wrong",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "correct" => Some(Self::Correct),
            "almost" => Some(Self::Almost),
            "wrong" => Some(Self::Wrong),
            _ => None,
        }
    }

    pub fn is_correct(self) -> bool {
        self == Self::Correct
    }
}

/// Machine-readable reason an answer is almost or wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    Typo,
    Article,
    WordOrder,
    WrongLanguage,
    MissingSlot,
    Other,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Typo => "TYPO",
            Self::Article => "ARTICLE",
            Self::WordOrder => "WORD_ORDER",
            Self::WrongLanguage => "WRONG_LANGUAGE",
            Self::MissingSlot => "MISSING_SLOT",
            Self::Other => "OTHER",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "TYPO" => Some(Self::Typo),
            "ARTICLE" => Some(Self::Article),
            "WORD_ORDER" => Some(Self::WordOrder),
            "WRONG_LANGUAGE" => Some(Self::WrongLanguage),
            "MISSING_SLOT" => Some(Self::MissingSlot),
            "OTHER" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Classification of a learner answer. Value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerEvaluation {
    pub result: EvaluationResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<ReasonCode>,
}

impl AnswerEvaluation {
    pub fn correct() -> Self {
        Self {
            result: EvaluationResult::Correct,
            reason: None,
        }
    }

    pub fn almost(reason: ReasonCode) -> Self {
        Self {
            result: EvaluationResult::Almost,
            reason: Some(reason),
        }
    }

    pub fn wrong(reason: ReasonCode) -> Self {
        Self {
            result: EvaluationResult::Wrong,
            reason: Some(reason),
        }
    }

    pub fn is_correct(&self) -> bool {
        self.result.is_correct()
    }
}

/// Language a lesson is taught in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Language {
    English,
    German,
    Spanish,
    French,
    /// Any language without curated heuristics, by lowercase code.
    Other(String),
}

impl Language {
    pub fn as_str(&self) -> &str {
        match self {
            Self::English => "en",
            Self::German => "de",
            Self::Spanish => "es",
            Self::French => "fr",
            Self::Other(code) => code,
        }
    }

    /// Parse from an ISO 639-1 code or English name. Unknown codes map to `Other`.
    pub fn from_code(code: &str) -> Self {
        let code = code.trim().to_lowercase();
        match code.as_str() {
            "en" | "english" => Self::English,
            "de" | "german" => Self::German,
            "es" | "spanish" => Self::Spanish,
            "fr" | "french" => Self::French,
            _ => Self::Other(code),
        }
    }
}

impl From<String> for Language {
    fn from(code: String) -> Self {
        Self::from_code(&code)
    }
}

impl From<Language> for String {
    fn from(language: Language) -> Self {
        language.as_str().to_string()
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fill-in-the-blank definition. The template marks the blank with `___`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlankFill {
    #[serde(default)]
    pub template: Option<String>,
    pub answers: Vec<String>,
}

/// A lesson question. Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub prompt: String,
    /// Canonical answer. Empty when the content is malformed.
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub accepted_answers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blank: Option<BlankFill>,
    /// Ordered least to most revealing.
    #[serde(default)]
    pub hints: Vec<String>,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub concept_tag: String,
}

impl Question {
    /// Create a question with only the required fields set.
    pub fn new(id: &str, prompt: &str, answer: &str, concept_tag: &str) -> Self {
        Self {
            id: id.to_string(),
            prompt: prompt.to_string(),
            answer: answer.to_string(),
            accepted_answers: Vec::new(),
            blank: None,
            hints: Vec::new(),
            examples: Vec::new(),
            explanation: None,
            concept_tag: concept_tag.to_string(),
        }
    }
}

/// An ordered list of questions for one language.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    pub id: String,
    pub language: Language,
    #[serde(default)]
    pub title: String,
    pub questions: Vec<Question>,
}

impl Lesson {
    /// Check host-level invariants. Authoring quality is not validated here.
    pub fn validate(&self) -> Result<()> {
        if self.questions.is_empty() {
            return Err(LessonError::EmptyLesson {
                lesson_id: self.id.clone(),
            });
        }

        let mut seen = HashSet::new();
        for question in &self.questions {
            if !seen.insert(question.id.as_str()) {
                return Err(LessonError::DuplicateQuestion {
                    lesson_id: self.id.clone(),
                    question_id: question.id.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }
}

/// A recent almost/wrong answer, kept for tutor messaging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Confusion {
    pub lesson_id: String,
    pub question_id: String,
    pub concept_tag: String,
    pub reason: ReasonCode,
    pub at: DateTime<Utc>,
}

/// Per user and language review state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LearnerProfile {
    pub user_id: String,
    pub language: String,
    #[serde(default)]
    pub review_candidates: ReviewCandidates,
    #[serde(default)]
    pub review_queue: Vec<ReviewQueueEntry>,
    /// Newest first, capped at `RECENT_CONFUSION_CAP`.
    #[serde(default)]
    pub recent_confusions: Vec<Confusion>,
}

impl LearnerProfile {
    pub fn new(user_id: &str, language: &Language) -> Self {
        Self {
            user_id: user_id.to_string(),
            language: language.as_str().to_string(),
            ..Default::default()
        }
    }

    pub fn record_confusion(&mut self, confusion: Confusion) {
        self.recent_confusions.insert(0, confusion);
        self.recent_confusions.truncate(RECENT_CONFUSION_CAP);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lesson(questions: Vec<Question>) -> Lesson {
        Lesson {
            id: "greetings".to_string(),
            language: Language::English,
            title: "Greetings".to_string(),
            questions,
        }
    }

    #[test]
    fn empty_lesson_is_rejected() {
        let err = lesson(vec![]).validate().unwrap_err();
        assert_eq!(
            err,
            LessonError::EmptyLesson {
                lesson_id: "greetings".to_string()
            }
        );
    }

    #[test]
    fn duplicate_question_ids_are_rejected() {
        let q = Question::new("q1", "Say hello", "Hello", "greetings");
        let err = lesson(vec![q.clone(), q]).validate().unwrap_err();
        assert!(matches!(err, LessonError::DuplicateQuestion { .. }));
    }

    #[test]
    fn language_codes_round_trip_through_serde() {
        let json = serde_json::to_string(&Language::German).unwrap();
        assert_eq!(json, "\"de\"");
        let parsed: Language = serde_json::from_str("\"Klingon\"").unwrap();
        assert_eq!(parsed, Language::Other("klingon".to_string()));
    }

    #[test]
    fn evaluation_serializes_reason_codes() {
        let json = serde_json::to_value(AnswerEvaluation::almost(ReasonCode::WordOrder)).unwrap();
        assert_eq!(json["result"], "almost");
        assert_eq!(json["reason"], "WORD_ORDER");

        let json = serde_json::to_value(AnswerEvaluation::correct()).unwrap();
        assert!(json.get("reason").is_none());
    }

    #[test]
    fn reason_codes_parse_from_wire_names() {
        for reason in [
            ReasonCode::Typo,
            ReasonCode::Article,
            ReasonCode::WordOrder,
            ReasonCode::WrongLanguage,
            ReasonCode::MissingSlot,
            ReasonCode::Other,
        ] {
            assert_eq!(ReasonCode::from_str(reason.as_str()), Some(reason));
        }
        assert_eq!(ReasonCode::from_str("typo"), None);
        assert_eq!(ReasonCode::from_str("NOT_A_REASON"), None);
    }

    #[test]
    fn question_optional_fields_default() {
        let q: Question = serde_json::from_str(
            r#"{"id":"q1","prompt":"Say hello","concept_tag":"greetings"}"#,
        )
        .unwrap();
        assert_eq!(q.answer, "");
        assert!(q.hints.is_empty());
        assert!(q.blank.is_none());
    }

    #[test]
    fn confusions_keep_newest_first_and_cap() {
        let mut profile = LearnerProfile::new("u1", &Language::German);
        for i in 0..(RECENT_CONFUSION_CAP + 5) {
            profile.record_confusion(Confusion {
                lesson_id: "l1".to_string(),
                question_id: format!("q{}", i),
                concept_tag: "articles".to_string(),
                reason: ReasonCode::Article,
                at: Utc::now(),
            });
        }
        assert_eq!(profile.recent_confusions.len(), RECENT_CONFUSION_CAP);
        assert_eq!(
            profile.recent_confusions[0].question_id,
            format!("q{}", RECENT_CONFUSION_CAP + 4)
        );
    }
}
