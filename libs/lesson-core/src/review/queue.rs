//! Due-date review queue.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{EvaluationResult, Question};

/// Maximum entries kept in a learner's review queue.
pub const QUEUE_CAP: usize = 60;

/// Most due entries handed out at once.
pub const MAX_DUE_PICK: usize = 5;

/// Hours until the next review after the first, second and later correct attempts.
const CORRECT_INTERVAL_HOURS: [i64; 3] = [24, 72, 168];

/// A concrete, due-dated practice item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewQueueEntry {
    pub id: String,
    pub lesson_id: String,
    pub concept_tag: String,
    /// Prompt text as it was when the entry was queued.
    pub prompt: String,
    pub expected_answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_result: Option<EvaluationResult>,
}

impl ReviewQueueEntry {
    /// Snapshot a question as an entry due immediately.
    pub fn for_question(id: &str, lesson_id: &str, question: &Question, now: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            lesson_id: lesson_id.to_string(),
            concept_tag: question.concept_tag.clone(),
            prompt: question.prompt.clone(),
            expected_answer: question.answer.clone(),
            question_id: Some(question.id.clone()),
            created_at: now,
            due_at: now,
            attempts: 0,
            last_result: None,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due_at <= now
    }

    /// Entries are the same practice item when lesson, concept and prompt match.
    pub fn same_item(&self, other: &ReviewQueueEntry) -> bool {
        self.lesson_id == other.lesson_id
            && self.concept_tag == other.concept_tag
            && self.prompt == other.prompt
    }

    /// Count a practice attempt and reschedule.
    pub fn record_attempt(&mut self, result: EvaluationResult, now: DateTime<Utc>) {
        self.attempts = self.attempts.saturating_add(1);
        self.last_result = Some(result);
        self.due_at = compute_next_review_due_at(self.attempts, result, now);
    }

    /// Stand-in question for evaluating a review answer.
    pub fn as_question(&self) -> Question {
        let id = self.question_id.clone().unwrap_or_else(|| self.id.clone());
        Question::new(&id, &self.prompt, &self.expected_answer, &self.concept_tag)
    }
}

/// Next due time after a review attempt.
///
/// Correct answers space out to 24h, 72h and then 168h by attempt count.
/// Anything else is due again immediately.
pub fn compute_next_review_due_at(
    attempts: u32,
    result: EvaluationResult,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    if !result.is_correct() {
        return now;
    }

    let step = match attempts {
        0 | 1 => 0,
        2 => 1,
        _ => 2,
    };
    now + Duration::hours(CORRECT_INTERVAL_HOURS[step])
}

/// Merge `new_items` into `queue`.
///
/// A new item matching an existing entry (same lesson, concept and prompt) is
/// folded into it, pulling its due date forward if needed. Queue order is
/// preserved; over `QUEUE_CAP` the oldest entries by `created_at` go first.
pub fn enqueue_review(
    mut queue: Vec<ReviewQueueEntry>,
    new_items: impl IntoIterator<Item = ReviewQueueEntry>,
) -> Vec<ReviewQueueEntry> {
    for item in new_items {
        match queue.iter_mut().find(|entry| entry.same_item(&item)) {
            Some(existing) => {
                if item.due_at < existing.due_at {
                    existing.due_at = item.due_at;
                }
            }
            None => queue.push(item),
        }
    }

    trim_oldest(&mut queue, QUEUE_CAP);
    queue
}

fn trim_oldest(queue: &mut Vec<ReviewQueueEntry>, cap: usize) {
    if queue.len() <= cap {
        return;
    }

    let mut by_age: Vec<usize> = (0..queue.len()).collect();
    by_age.sort_by(|&a, &b| {
        queue[a]
            .created_at
            .cmp(&queue[b].created_at)
            .then_with(|| queue[a].id.cmp(&queue[b].id))
    });
    let dropped: HashSet<usize> = by_age[..queue.len() - cap].iter().copied().collect();

    let mut index = 0;
    queue.retain(|_| {
        let keep = !dropped.contains(&index);
        index += 1;
        keep
    });
}

/// Entries due at `now`, in queue order, at most `min(MAX_DUE_PICK, limit)`.
pub fn pick_due_review_queue_items(
    queue: &[ReviewQueueEntry],
    now: DateTime<Utc>,
    limit: usize,
) -> Vec<ReviewQueueEntry> {
    queue
        .iter()
        .filter(|entry| entry.is_due(now))
        .take(limit.min(MAX_DUE_PICK))
        .cloned()
        .collect()
}
