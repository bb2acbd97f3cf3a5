//! Lesson progression: the per-question attempt and hint state machine.
//!
//! A session sits in `UserInput` while the learner retries the current
//! question, moves to `Advance` when it steps to the next question, and ends
//! in `Complete` after the last one. Misses escalate hints; the final allowed
//! miss forces the session forward and flags the question for review.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ProgressionError;
use crate::matching::normalize;
use crate::types::{AnswerEvaluation, Language, Lesson, Question};

/// Attempts allowed on one question before it is revealed and skipped.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;

/// Hint level used for the reveal on a forced advance.
pub const REVEAL_HINT_LEVEL: u8 = 3;

/// Session progression state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    /// Awaiting an answer, possibly a retry, on the current question.
    #[default]
    UserInput,
    /// Moved on to the next question.
    Advance,
    /// Lesson finished.
    Complete,
}

/// Attempt bookkeeping for one question.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub attempt_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_answer_normalized: Option<String>,
    /// 0 = none, 1..=2 = authored hint levels, 3 = answer revealed.
    pub hint_level: u8,
}

/// Feedback shown alongside a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Hint {
    Level { level: u8, text: String },
    Reveal {
        #[serde(skip_serializing_if = "Option::is_none")]
        explanation: Option<String>,
        answer: String,
    },
}

/// Where a session is within its lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPosition {
    pub index: usize,
    pub total: usize,
}

impl SessionPosition {
    pub fn is_last(&self) -> bool {
        self.index + 1 >= self.total
    }
}

/// Result of feeding one evaluation into the state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub next_state: SessionState,
    pub next_index: usize,
    pub hint: Option<Hint>,
    pub hint_level: u8,
    pub mark_needs_review: bool,
}

/// Decide the next state for an evaluated answer.
///
/// `attempt_count` already includes the answer being evaluated.
pub fn advance_session(
    position: SessionPosition,
    question: &Question,
    evaluation: &AnswerEvaluation,
    attempt_count: u32,
    max_attempts: u32,
) -> Transition {
    let forward = |hint: Option<Hint>, hint_level: u8, mark_needs_review: bool| {
        if position.is_last() {
            Transition {
                next_state: SessionState::Complete,
                next_index: position.index,
                hint,
                hint_level,
                mark_needs_review,
            }
        } else {
            Transition {
                next_state: SessionState::Advance,
                next_index: position.index + 1,
                hint,
                hint_level,
                mark_needs_review,
            }
        }
    };

    if evaluation.is_correct() {
        return forward(None, 0, false);
    }

    if attempt_count >= max_attempts.max(1) {
        let reveal = Hint::Reveal {
            explanation: question.explanation.clone(),
            answer: display_answer(question),
        };
        return forward(Some(reveal), REVEAL_HINT_LEVEL, true);
    }

    let level = hint_level_for_attempt(attempt_count);
    Transition {
        next_state: SessionState::UserInput,
        next_index: position.index,
        hint: (level > 0).then(|| Hint::Level {
            level,
            text: hint_text(question, level),
        }),
        hint_level: level,
        mark_needs_review: false,
    }
}

/// Attempt 1 earns no hint, attempt 2 the first level, later misses the second.
fn hint_level_for_attempt(attempt_count: u32) -> u8 {
    match attempt_count {
        0 | 1 => 0,
        2 => 1,
        _ => 2,
    }
}

fn display_answer(question: &Question) -> String {
    let answer = question.answer.trim();
    if !answer.is_empty() {
        return answer.to_string();
    }
    question
        .blank
        .as_ref()
        .and_then(|blank| blank.answers.first())
        .cloned()
        .unwrap_or_default()
}

fn hint_text(question: &Question, level: u8) -> String {
    question
        .hints
        .get(usize::from(level) - 1)
        .cloned()
        .unwrap_or_else(|| generated_hint(question, level))
}

/// Deterministic hint for questions without authored hints.
fn generated_hint(question: &Question, level: u8) -> String {
    let answer = display_answer(question);
    let Some(first) = answer.chars().next() else {
        return "Read the prompt again carefully.".to_string();
    };

    if level <= 1 {
        return format!("The answer starts with \"{}\".", first);
    }

    let words: Vec<&str> = answer.split_whitespace().collect();
    let shown = if words.len() > 1 {
        words[..words.len().div_ceil(2)].join(" ")
    } else {
        let chars: Vec<char> = answer.chars().collect();
        chars[..chars.len().div_ceil(2)].iter().collect()
    };
    format!("The answer begins with \"{}...\".", shown)
}

/// What happened when an answer was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOutcome {
    pub question_id: String,
    pub evaluation: AnswerEvaluation,
    pub attempt_count: u32,
    pub transition: Transition,
    /// Same normalized wrong answer as last time. Only used for messaging.
    pub repeated_same_wrong: bool,
}

/// One learner's run through one lesson.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonSession {
    pub user_id: String,
    pub lesson_id: String,
    pub language: Language,
    pub state: SessionState,
    pub current_question_index: usize,
    #[serde(default)]
    pub attempts: HashMap<String, AttemptRecord>,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

impl LessonSession {
    pub fn new(user_id: &str, lesson_id: &str, language: Language, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            lesson_id: lesson_id.to_string(),
            language,
            state: SessionState::UserInput,
            current_question_index: 0,
            attempts: HashMap::new(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            started_at: now,
            updated_at: now,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn is_complete(&self) -> bool {
        self.state == SessionState::Complete
    }

    pub fn attempt(&self, question_id: &str) -> Option<&AttemptRecord> {
        self.attempts.get(question_id)
    }

    /// The question the learner is on, or a desync signal.
    pub fn current_question<'l>(&self, lesson: &'l Lesson) -> Result<&'l Question, ProgressionError> {
        lesson
            .question(self.current_question_index)
            .ok_or(ProgressionError::SessionDesync {
                index: self.current_question_index,
                len: lesson.questions.len(),
            })
    }

    /// Back to the first question with no attempt history.
    pub fn restart(&mut self, now: DateTime<Utc>) {
        self.state = SessionState::UserInput;
        self.current_question_index = 0;
        self.attempts.clear();
        self.started_at = now;
        self.updated_at = now;
    }

    /// Apply an evaluated answer to the current question.
    pub fn record_answer(
        &mut self,
        lesson: &Lesson,
        user_answer: &str,
        evaluation: AnswerEvaluation,
        now: DateTime<Utc>,
    ) -> Result<AnswerOutcome, ProgressionError> {
        if self.is_complete() {
            return Err(ProgressionError::SessionComplete);
        }

        let question = self.current_question(lesson)?;
        let position = SessionPosition {
            index: self.current_question_index,
            total: lesson.questions.len(),
        };
        let normalized = normalize(user_answer);

        let record = self.attempts.entry(question.id.clone()).or_default();
        record.attempt_count = record.attempt_count.saturating_add(1);
        let attempt_count = record.attempt_count;

        let repeated_same_wrong = !evaluation.is_correct()
            && record.last_answer_normalized.as_deref() == Some(normalized.as_str());

        let transition = advance_session(
            position,
            question,
            &evaluation,
            attempt_count,
            self.max_attempts,
        );

        if evaluation.is_correct() {
            *record = AttemptRecord::default();
        } else {
            record.last_answer_normalized = Some(normalized);
            record.hint_level = transition.hint_level;
        }

        self.state = transition.next_state;
        self.current_question_index = transition.next_index;
        self.updated_at = now;

        Ok(AnswerOutcome {
            question_id: question.id.clone(),
            evaluation,
            attempt_count,
            transition,
            repeated_same_wrong,
        })
    }
}
