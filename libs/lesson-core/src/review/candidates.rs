//! Review candidates: scored signals that a question needs more practice.

use std::cmp::Ordering;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::EvaluationResult;

/// Maximum candidates kept per learner and language.
pub const CANDIDATE_CAP: usize = 120;

/// Upper clamp for `mistake_count`.
pub const MAX_MISTAKE_COUNT: u32 = 20;

/// A candidate reviewed this recently is not suggested again.
pub const REVIEW_COOLDOWN_HOURS: i64 = 12;

/// Most suggestions returned at once.
pub const MAX_SUGGESTIONS: usize = 5;

const MS_PER_DAY: i64 = 86_400_000;
const MAX_AGE_DAYS: i64 = 30;
const INITIAL_CONFIDENCE: f64 = 0.5;
const MISTAKE_CONFIDENCE_PENALTY: f64 = 0.15;
const CORRECT_CONFIDENCE_GAIN: f64 = 0.1;
const REVIEW_CONFIDENCE_GAIN: f64 = 0.15;
const REVIEW_CONFIDENCE_PENALTY: f64 = 0.1;

/// Identity of a reviewable question.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReviewKey {
    pub lesson_id: String,
    pub question_id: String,
}

impl ReviewKey {
    pub fn new(lesson_id: &str, question_id: &str) -> Self {
        Self {
            lesson_id: lesson_id.to_string(),
            question_id: question_id.to_string(),
        }
    }
}

/// A scored, unscheduled review signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewCandidate {
    #[serde(flatten)]
    pub key: ReviewKey,
    pub concept_tag: String,
    pub last_seen_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub mistake_count: u32,
    pub confidence: f64,
}

impl ReviewCandidate {
    pub fn new(key: ReviewKey, concept_tag: &str, now: DateTime<Utc>) -> Self {
        Self {
            key,
            concept_tag: concept_tag.to_string(),
            last_seen_at: now,
            last_reviewed_at: None,
            mistake_count: 0,
            confidence: INITIAL_CONFIDENCE,
        }
    }

    /// Whole days since last seen, floored; negative when seen in the future.
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.last_seen_at)
            .num_milliseconds()
            .div_euclid(MS_PER_DAY)
    }

    /// `mistakes*10 + clamp(age_days, 0, 30) + (1 - confidence)*5`
    pub fn score(&self, now: DateTime<Utc>) -> f64 {
        let age = self.age_days(now).clamp(0, MAX_AGE_DAYS) as f64;
        f64::from(self.mistake_count) * 10.0 + age + (1.0 - self.confidence) * 5.0
    }

    /// Reviewed less than `REVIEW_COOLDOWN_HOURS` ago.
    pub fn in_cooldown(&self, now: DateTime<Utc>) -> bool {
        self.last_reviewed_at
            .is_some_and(|reviewed| now - reviewed < Duration::hours(REVIEW_COOLDOWN_HOURS))
    }

    fn adjust_confidence(&mut self, delta: f64) {
        self.confidence = clamp_confidence(self.confidence + delta);
    }
}

pub(crate) fn clamp_confidence(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        INITIAL_CONFIDENCE
    }
}

/// Deterministic ranking: score desc, then newer `last_seen_at`, then
/// concept tag, lesson id and question id ascending.
fn compare_ranked(a: &(f64, &ReviewCandidate), b: &(f64, &ReviewCandidate)) -> Ordering {
    b.0.total_cmp(&a.0)
        .then_with(|| b.1.last_seen_at.cmp(&a.1.last_seen_at))
        .then_with(|| a.1.concept_tag.cmp(&b.1.concept_tag))
        .then_with(|| a.1.key.lesson_id.cmp(&b.1.key.lesson_id))
        .then_with(|| a.1.key.question_id.cmp(&b.1.key.question_id))
}

/// Pick the candidates most worth reviewing now.
///
/// Candidates without mistakes or still in cooldown are skipped. At most
/// `clamp(limit, 1, MAX_SUGGESTIONS)` are returned.
pub fn pick_suggested_review_items(
    candidates: &[ReviewCandidate],
    now: DateTime<Utc>,
    limit: usize,
) -> Vec<ReviewCandidate> {
    let mut ranked: Vec<(f64, &ReviewCandidate)> = candidates
        .iter()
        .filter(|c| c.mistake_count > 0 && !c.in_cooldown(now))
        .map(|c| (c.score(now), c))
        .collect();

    ranked.sort_by(compare_ranked);

    ranked
        .into_iter()
        .take(limit.clamp(1, MAX_SUGGESTIONS))
        .map(|(_, c)| c.clone())
        .collect()
}

/// Bounded candidate set, unique by `ReviewKey`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewCandidates(Vec<ReviewCandidate>);

impl ReviewCandidates {
    /// Build from arbitrary items: duplicates fold to the most recently seen,
    /// then the cap is applied.
    pub fn from_vec(items: Vec<ReviewCandidate>) -> Self {
        let mut set = Self::default();
        for item in items {
            match set.position(&item.key) {
                Some(idx) if set.0[idx].last_seen_at >= item.last_seen_at => {}
                Some(idx) => set.0[idx] = item,
                None => set.0.push(item),
            }
        }
        set.trim();
        set
    }

    pub fn as_slice(&self) -> &[ReviewCandidate] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<ReviewCandidate> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &ReviewKey) -> Option<&ReviewCandidate> {
        self.0.iter().find(|c| &c.key == key)
    }

    fn position(&self, key: &ReviewKey) -> Option<usize> {
        self.0.iter().position(|c| &c.key == key)
    }

    /// An almost/wrong answer during a lesson.
    pub fn record_mistake(&mut self, key: ReviewKey, concept_tag: &str, now: DateTime<Utc>) {
        match self.position(&key) {
            Some(idx) => {
                let candidate = &mut self.0[idx];
                candidate.mistake_count = (candidate.mistake_count + 1).min(MAX_MISTAKE_COUNT);
                candidate.adjust_confidence(-MISTAKE_CONFIDENCE_PENALTY);
                candidate.concept_tag = concept_tag.to_string();
                candidate.last_seen_at = now;
            }
            None => {
                let mut candidate = ReviewCandidate::new(key, concept_tag, now);
                candidate.mistake_count = 1;
                self.0.push(candidate);
                self.trim();
            }
        }
    }

    /// A correct lesson answer. Only touches questions already tracked.
    pub fn record_correct(&mut self, key: &ReviewKey, now: DateTime<Utc>) {
        if let Some(idx) = self.position(key) {
            let candidate = &mut self.0[idx];
            candidate.adjust_confidence(CORRECT_CONFIDENCE_GAIN);
            candidate.last_seen_at = now;
        }
    }

    /// A review practice attempt on a tracked question.
    pub fn mark_reviewed(&mut self, key: &ReviewKey, result: EvaluationResult, now: DateTime<Utc>) {
        if let Some(idx) = self.position(key) {
            let candidate = &mut self.0[idx];
            candidate.last_reviewed_at = Some(now);
            candidate.last_seen_at = now;
            if result.is_correct() {
                candidate.mistake_count = candidate.mistake_count.saturating_sub(1);
                candidate.adjust_confidence(REVIEW_CONFIDENCE_GAIN);
            } else {
                candidate.adjust_confidence(-REVIEW_CONFIDENCE_PENALTY);
            }
        }
    }

    /// Keep the `CANDIDATE_CAP` most recently seen.
    fn trim(&mut self) {
        if self.0.len() <= CANDIDATE_CAP {
            return;
        }
        self.0.sort_by(|a, b| {
            b.last_seen_at
                .cmp(&a.last_seen_at)
                .then_with(|| a.key.cmp(&b.key))
        });
        self.0.truncate(CANDIDATE_CAP);
    }
}
