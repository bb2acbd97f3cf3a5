//! Error handling for the tutor host

use lesson_core::LessonError;
use thiserror::Error;

/// Tutor service error types
#[derive(Debug, Error)]
pub enum TutorError {
    #[error("Lesson not found: {language}/{lesson_id}")]
    LessonNotFound { language: String, lesson_id: String },

    #[error("Review entry not found: {0}")]
    ReviewEntryNotFound(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Lesson error: {0}")]
    Lesson(#[from] LessonError),
}

/// Result type alias for tutor operations
pub type Result<T> = std::result::Result<T, TutorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_not_found() {
        let error = TutorError::LessonNotFound {
            language: "de".to_string(),
            lesson_id: "basics".to_string(),
        };
        assert_eq!(error.to_string(), "Lesson not found: de/basics");
    }

    #[test]
    fn test_error_display_config() {
        let error = TutorError::Config("TUTOR_MAX_ATTEMPTS must be a positive integer".to_string());
        assert_eq!(
            error.to_string(),
            "Configuration error: TUTOR_MAX_ATTEMPTS must be a positive integer"
        );
    }

    #[test]
    fn test_lesson_error_converts() {
        let error: TutorError = LessonError::EmptyLesson {
            lesson_id: "basics".to_string(),
        }
        .into();
        assert_eq!(error.to_string(), "Lesson error: lesson basics has no questions");
    }
}
