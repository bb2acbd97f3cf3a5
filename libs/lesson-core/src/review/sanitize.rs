//! Normalization of persisted review data.
//!
//! Stored profiles are decoded leniently: every field is optional, and a
//! record that does not decode at all (wrong field types) is set aside instead
//! of failing the profile. Records that decode but cannot be repaired (missing
//! ids, unparsable dates, unknown reason codes) are dropped during
//! normalization. Either way a single bad record never costs the others.

use chrono::{DateTime, Utc};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

use super::candidates::{clamp_confidence, ReviewCandidate, ReviewCandidates, ReviewKey, MAX_MISTAKE_COUNT};
use super::queue::{enqueue_review, ReviewQueueEntry};
use crate::types::{Confusion, EvaluationResult, LearnerProfile, ReasonCode, RECENT_CONFUSION_CAP};

/// How many stored records a normalization pass discarded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SanitizeReport {
    pub dropped_candidates: usize,
    pub dropped_queue_entries: usize,
    pub dropped_confusions: usize,
}

impl SanitizeReport {
    pub fn is_clean(&self) -> bool {
        self.dropped_candidates == 0 && self.dropped_queue_entries == 0 && self.dropped_confusions == 0
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredReviewCandidate {
    #[serde(default)]
    pub lesson_id: Option<String>,
    #[serde(default)]
    pub question_id: Option<String>,
    #[serde(default)]
    pub concept_tag: Option<String>,
    #[serde(default)]
    pub last_seen_at: Option<String>,
    #[serde(default)]
    pub last_reviewed_at: Option<String>,
    #[serde(default)]
    pub mistake_count: Option<i64>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredReviewQueueEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub lesson_id: Option<String>,
    #[serde(default)]
    pub concept_tag: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub expected_answer: Option<String>,
    #[serde(default)]
    pub question_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub due_at: Option<String>,
    #[serde(default)]
    pub attempts: Option<i64>,
    #[serde(default)]
    pub last_result: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredConfusion {
    #[serde(default)]
    pub lesson_id: Option<String>,
    #[serde(default)]
    pub question_id: Option<String>,
    #[serde(default)]
    pub concept_tag: Option<String>,
    /// Wire name of a `ReasonCode`; unknown names drop the record.
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub at: Option<String>,
}

/// Learner profile as kept by the persistence collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "RawStoredProfile")]
pub struct StoredLearnerProfile {
    pub review_candidates: Vec<StoredReviewCandidate>,
    pub review_queue: Vec<StoredReviewQueueEntry>,
    pub recent_confusions: Vec<StoredConfusion>,
    /// Records that did not decode and were set aside.
    #[serde(skip)]
    pub undecodable: SanitizeReport,
}

/// One stored record, or whatever was found in its place.
#[derive(Deserialize)]
#[serde(untagged)]
enum MaybeRecord<T> {
    Valid(T),
    Invalid(IgnoredAny),
}

#[derive(Deserialize)]
struct RawStoredProfile {
    #[serde(default)]
    review_candidates: Vec<MaybeRecord<StoredReviewCandidate>>,
    #[serde(default)]
    review_queue: Vec<MaybeRecord<StoredReviewQueueEntry>>,
    #[serde(default)]
    recent_confusions: Vec<MaybeRecord<StoredConfusion>>,
}

fn split_valid<T>(records: Vec<MaybeRecord<T>>) -> (Vec<T>, usize) {
    let total = records.len();
    let valid: Vec<T> = records
        .into_iter()
        .filter_map(|record| match record {
            MaybeRecord::Valid(value) => Some(value),
            MaybeRecord::Invalid(_) => None,
        })
        .collect();
    let invalid = total - valid.len();
    (valid, invalid)
}

impl From<RawStoredProfile> for StoredLearnerProfile {
    fn from(raw: RawStoredProfile) -> Self {
        let (review_candidates, dropped_candidates) = split_valid(raw.review_candidates);
        let (review_queue, dropped_queue_entries) = split_valid(raw.review_queue);
        let (recent_confusions, dropped_confusions) = split_valid(raw.recent_confusions);

        Self {
            review_candidates,
            review_queue,
            recent_confusions,
            undecodable: SanitizeReport {
                dropped_candidates,
                dropped_queue_entries,
                dropped_confusions,
            },
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_time(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn format_time(value: DateTime<Utc>) -> String {
    value.to_rfc3339()
}

impl StoredReviewCandidate {
    /// Repair into a typed candidate, or `None` when the record is unusable.
    pub fn normalize(self) -> Option<ReviewCandidate> {
        let lesson_id = non_blank(self.lesson_id)?;
        let question_id = non_blank(self.question_id)?;
        let last_seen_at = parse_time(self.last_seen_at.as_deref()?)?;
        let last_reviewed_at = match self.last_reviewed_at.as_deref() {
            Some(raw) => Some(parse_time(raw)?),
            None => None,
        };

        Some(ReviewCandidate {
            key: ReviewKey {
                lesson_id,
                question_id,
            },
            concept_tag: self.concept_tag.unwrap_or_default(),
            last_seen_at,
            last_reviewed_at,
            mistake_count: self
                .mistake_count
                .unwrap_or(0)
                .clamp(0, i64::from(MAX_MISTAKE_COUNT)) as u32,
            confidence: clamp_confidence(self.confidence.unwrap_or(f64::NAN)),
        })
    }
}

impl From<&ReviewCandidate> for StoredReviewCandidate {
    fn from(c: &ReviewCandidate) -> Self {
        Self {
            lesson_id: Some(c.key.lesson_id.clone()),
            question_id: Some(c.key.question_id.clone()),
            concept_tag: Some(c.concept_tag.clone()),
            last_seen_at: Some(format_time(c.last_seen_at)),
            last_reviewed_at: c.last_reviewed_at.map(format_time),
            mistake_count: Some(i64::from(c.mistake_count)),
            confidence: Some(c.confidence),
        }
    }
}

impl StoredReviewQueueEntry {
    pub fn normalize(self) -> Option<ReviewQueueEntry> {
        let created_at = parse_time(self.created_at.as_deref()?)?;
        let due_at = match self.due_at.as_deref() {
            Some(raw) => parse_time(raw)?,
            None => created_at,
        };

        Some(ReviewQueueEntry {
            id: non_blank(self.id)?,
            lesson_id: non_blank(self.lesson_id)?,
            concept_tag: self.concept_tag.unwrap_or_default(),
            prompt: non_blank(self.prompt)?,
            expected_answer: non_blank(self.expected_answer)?,
            question_id: non_blank(self.question_id),
            created_at,
            due_at,
            attempts: self.attempts.unwrap_or(0).clamp(0, i64::from(u32::MAX)) as u32,
            last_result: self
                .last_result
                .as_deref()
                .and_then(EvaluationResult::from_str),
        })
    }
}

impl From<&ReviewQueueEntry> for StoredReviewQueueEntry {
    fn from(e: &ReviewQueueEntry) -> Self {
        Self {
            id: Some(e.id.clone()),
            lesson_id: Some(e.lesson_id.clone()),
            concept_tag: Some(e.concept_tag.clone()),
            prompt: Some(e.prompt.clone()),
            expected_answer: Some(e.expected_answer.clone()),
            question_id: e.question_id.clone(),
            created_at: Some(format_time(e.created_at)),
            due_at: Some(format_time(e.due_at)),
            attempts: Some(i64::from(e.attempts)),
            last_result: e.last_result.map(|r| r.as_str().to_string()),
        }
    }
}

impl StoredConfusion {
    pub fn normalize(self) -> Option<Confusion> {
        Some(Confusion {
            lesson_id: non_blank(self.lesson_id)?,
            question_id: non_blank(self.question_id)?,
            concept_tag: self.concept_tag.unwrap_or_default(),
            reason: ReasonCode::from_str(self.reason.as_deref()?.trim())?,
            at: parse_time(self.at.as_deref()?)?,
        })
    }
}

impl From<&Confusion> for StoredConfusion {
    fn from(c: &Confusion) -> Self {
        Self {
            lesson_id: Some(c.lesson_id.clone()),
            question_id: Some(c.question_id.clone()),
            concept_tag: Some(c.concept_tag.clone()),
            reason: Some(c.reason.as_str().to_string()),
            at: Some(format_time(c.at)),
        }
    }
}

/// Drop unusable candidates, fold duplicates and apply the cap.
pub fn normalize_review_candidates(stored: Vec<StoredReviewCandidate>) -> ReviewCandidates {
    ReviewCandidates::from_vec(
        stored
            .into_iter()
            .filter_map(StoredReviewCandidate::normalize)
            .collect(),
    )
}

/// Drop unusable entries, dedupe and apply the cap.
pub fn normalize_review_queue(stored: Vec<StoredReviewQueueEntry>) -> Vec<ReviewQueueEntry> {
    enqueue_review(
        Vec::new(),
        stored
            .into_iter()
            .filter_map(StoredReviewQueueEntry::normalize),
    )
}

impl StoredLearnerProfile {
    /// Typed profile plus a count of what the normalization pass discarded.
    pub fn into_profile(self, user_id: &str, language: &str) -> (LearnerProfile, SanitizeReport) {
        let undecodable = self.undecodable;
        let stored_candidates = self.review_candidates.len();
        let stored_queue = self.review_queue.len();
        let stored_confusions = self.recent_confusions.len();

        let review_candidates = normalize_review_candidates(self.review_candidates);
        let review_queue = normalize_review_queue(self.review_queue);
        let mut recent_confusions: Vec<Confusion> = self
            .recent_confusions
            .into_iter()
            .filter_map(StoredConfusion::normalize)
            .collect();
        recent_confusions.truncate(RECENT_CONFUSION_CAP);

        let report = SanitizeReport {
            dropped_candidates: undecodable.dropped_candidates + stored_candidates
                - review_candidates.len(),
            dropped_queue_entries: undecodable.dropped_queue_entries + stored_queue
                - review_queue.len(),
            dropped_confusions: undecodable.dropped_confusions + stored_confusions
                - recent_confusions.len(),
        };

        let profile = LearnerProfile {
            user_id: user_id.to_string(),
            language: language.to_string(),
            review_candidates,
            review_queue,
            recent_confusions,
        };
        (profile, report)
    }
}

impl From<&LearnerProfile> for StoredLearnerProfile {
    fn from(profile: &LearnerProfile) -> Self {
        Self {
            review_candidates: profile
                .review_candidates
                .as_slice()
                .iter()
                .map(StoredReviewCandidate::from)
                .collect(),
            review_queue: profile
                .review_queue
                .iter()
                .map(StoredReviewQueueEntry::from)
                .collect(),
            recent_confusions: profile
                .recent_confusions
                .iter()
                .map(StoredConfusion::from)
                .collect(),
            undecodable: SanitizeReport::default(),
        }
    }
}
