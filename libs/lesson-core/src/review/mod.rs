//! Spaced review scheduling.
//!
//! Two structures feed review practice:
//! - `ReviewCandidates`: scored, unscheduled signals that a question needs work
//! - the review queue: concrete practice items with a due date
//!
//! Both are bounded and trimmed here with sort-then-truncate, not by storage.

pub mod candidates;
pub mod queue;
pub mod sanitize;

pub use candidates::{
    pick_suggested_review_items, ReviewCandidate, ReviewCandidates, ReviewKey, CANDIDATE_CAP,
};
pub use queue::{
    compute_next_review_due_at, enqueue_review, pick_due_review_queue_items, ReviewQueueEntry,
    QUEUE_CAP,
};
pub use sanitize::{
    normalize_review_candidates, normalize_review_queue, SanitizeReport, StoredLearnerProfile,
};
