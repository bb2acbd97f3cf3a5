//! Core lesson engine shared by tutor hosts.
//!
//! Provides:
//! - Text normalization and Levenshtein distance for typed answers
//! - An ordered rule-chain evaluator (correct / almost / wrong with reason codes)
//! - The per-question attempt/hint state machine for lesson sessions
//! - Review candidate scoring and the spaced due-date review queue
//! - Support-inclusion policy and normalization of stored review data

pub mod error;
pub mod evaluator;
pub mod matching;
pub mod progression;
pub mod review;
pub mod support;
pub mod types;

pub use error::{LessonError, ProgressionError, Result};
pub use evaluator::{evaluate_answer, Rule, RULE_ORDER};
pub use matching::{levenshtein_distance, normalize, tokenize};
pub use progression::{
    advance_session, AnswerOutcome, AttemptRecord, Hint, LessonSession, SessionPosition,
    SessionState, Transition, DEFAULT_MAX_ATTEMPTS,
};
pub use review::{
    compute_next_review_due_at, enqueue_review, pick_due_review_queue_items,
    pick_suggested_review_items, ReviewCandidate, ReviewCandidates, ReviewKey, ReviewQueueEntry,
};
pub use support::{should_include_support, SupportLevel};
pub use types::{
    AnswerEvaluation, BlankFill, Confusion, EvaluationResult, Language, LearnerProfile, Lesson,
    Question, ReasonCode,
};
