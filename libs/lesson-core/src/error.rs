//! Error types for lesson-core.

use thiserror::Error;

/// Result type alias using LessonError.
pub type Result<T> = std::result::Result<T, LessonError>;

/// Host-level invariant violations. These are fatal and propagate up.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LessonError {
    #[error("lesson {lesson_id} has no questions")]
    EmptyLesson { lesson_id: String },

    #[error("duplicate question id {question_id} in lesson {lesson_id}")]
    DuplicateQuestion {
        lesson_id: String,
        question_id: String,
    },
}

/// Recoverable progression conditions. The host answers these by restarting
/// the session instead of treating them as failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProgressionError {
    #[error("session desync: question index {index} out of range for {len} questions, restart required")]
    SessionDesync { index: usize, len: usize },

    #[error("session already complete, restart required")]
    SessionComplete,
}

impl ProgressionError {
    /// Whether the host should restart the session to recover.
    pub fn restart_required(&self) -> bool {
        matches!(
            self,
            ProgressionError::SessionDesync { .. } | ProgressionError::SessionComplete
        )
    }
}
