//! Tutor orchestration: lessons, sessions, review profile and feedback.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use lesson_core::review::StoredLearnerProfile;
use lesson_core::{
    enqueue_review, evaluate_answer, pick_due_review_queue_items, pick_suggested_review_items,
    should_include_support, AnswerEvaluation, Confusion, Hint, Language, LearnerProfile, Lesson,
    LessonSession, ProgressionError, Question, ReviewCandidate, ReviewKey, ReviewQueueEntry,
    SessionState, SupportLevel, DEFAULT_MAX_ATTEMPTS,
};
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::catalog::ContentCatalog;
use crate::config::TutorConfig;
use crate::error::{Result, TutorError};
use crate::explain::{explain_with_timeout, ExplainRequest, Explainer, HttpExplainer};
use crate::feedback;
use crate::store::{ProfileStore, SessionStore};

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// One lock per (user, language) so a learner's submissions apply in order.
///
/// Entries nobody holds or waits on are dropped on the next acquire, so the
/// map stays as large as the set of learners with a request in flight.
#[derive(Default)]
struct KeyedLocks {
    locks: Mutex<HashMap<(String, String), Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    async fn acquire(&self, user_id: &str, language: &Language) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            // Holders and waiters own a clone; the map's copy alone means idle.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry((user_id.to_string(), language.as_str().to_string()))
                .or_default()
                .clone()
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }
}

#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub user_id: String,
    pub language: Language,
    pub lesson_id: String,
    pub answer: String,
    /// Force support on or off for this reply.
    pub include_support: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitResponse {
    pub question_id: String,
    pub evaluation: AnswerEvaluation,
    pub attempt_count: u32,
    pub state: SessionState,
    pub current_question_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<Hint>,
    pub feedback: String,
    pub support_included: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub needs_review: bool,
}

#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    Answered(SubmitResponse),
    /// The stored session no longer fits the lesson. It was restarted and
    /// saved; the answer was not evaluated.
    RestartRequired {
        reason: ProgressionError,
        session: LessonSession,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewResponse {
    pub entry_id: String,
    pub evaluation: AnswerEvaluation,
    pub attempts: u32,
    pub next_due_at: DateTime<Utc>,
    pub feedback: String,
}

pub struct TutorService {
    catalog: Arc<dyn ContentCatalog>,
    sessions: Arc<dyn SessionStore>,
    profiles: Arc<dyn ProfileStore>,
    explainer: Option<Arc<dyn Explainer>>,
    explain_timeout: Duration,
    support_level: SupportLevel,
    max_attempts: u32,
    clock: Clock,
    locks: KeyedLocks,
}

impl TutorService {
    pub fn new(
        catalog: Arc<dyn ContentCatalog>,
        sessions: Arc<dyn SessionStore>,
        profiles: Arc<dyn ProfileStore>,
    ) -> Self {
        let defaults = TutorConfig::default();
        Self {
            catalog,
            sessions,
            profiles,
            explainer: None,
            explain_timeout: defaults.explain_timeout,
            support_level: defaults.support_level,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            clock: Arc::new(Utc::now),
            locks: KeyedLocks::default(),
        }
    }

    /// Build from configuration, wiring the HTTP explainer when a URL is set.
    pub fn from_config(
        config: &TutorConfig,
        catalog: Arc<dyn ContentCatalog>,
        sessions: Arc<dyn SessionStore>,
        profiles: Arc<dyn ProfileStore>,
    ) -> Result<Self> {
        let mut service = Self::new(catalog, sessions, profiles)
            .with_support_level(config.support_level)
            .with_max_attempts(config.max_attempts)
            .with_explain_timeout(config.explain_timeout);

        if let Some(url) = &config.explain_url {
            let explainer = HttpExplainer::new(url, config.explain_timeout)
                .map_err(|e| TutorError::Config(e.to_string()))?;
            service = service.with_explainer(Arc::new(explainer));
        }
        Ok(service)
    }

    pub fn with_explainer(mut self, explainer: Arc<dyn Explainer>) -> Self {
        self.explainer = Some(explainer);
        self
    }

    pub fn with_explain_timeout(mut self, timeout: Duration) -> Self {
        self.explain_timeout = timeout;
        self
    }

    pub fn with_support_level(mut self, level: SupportLevel) -> Self {
        self.support_level = level;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Load a lesson and check its invariants.
    pub async fn lesson(&self, language: &Language, lesson_id: &str) -> Result<Lesson> {
        let lesson = self
            .catalog
            .load_lesson(language, lesson_id)
            .await?
            .ok_or_else(|| TutorError::LessonNotFound {
                language: language.as_str().to_string(),
                lesson_id: lesson_id.to_string(),
            })?;
        lesson.validate()?;
        Ok(lesson)
    }

    /// Evaluate an answer to the learner's current question and move the
    /// session along.
    pub async fn submit_answer(&self, request: SubmitRequest) -> Result<SubmitOutcome> {
        let _guard = self.locks.acquire(&request.user_id, &request.language).await;
        let now = self.now();

        let lesson = self.lesson(&request.language, &request.lesson_id).await?;
        let mut session = match self
            .sessions
            .load_session(&request.user_id, request.language.as_str(), &lesson.id)
            .await?
        {
            Some(session) => session,
            None => self.new_session(&request.user_id, &request.language, &lesson, now),
        };

        let current = if session.is_complete() {
            Err(ProgressionError::SessionComplete)
        } else {
            session.current_question(&lesson)
        };
        let question = match current {
            Ok(question) => question,
            Err(reason) => return self.restart_after(session, reason, now).await,
        };

        let evaluation = evaluate_answer(question, &request.answer, &lesson.language);
        let outcome = match session.record_answer(&lesson, &request.answer, evaluation, now) {
            Ok(outcome) => outcome,
            Err(reason) => return self.restart_after(session, reason, now).await,
        };

        tracing::info!(
            user_id = %request.user_id,
            lesson_id = %lesson.id,
            question_id = %question.id,
            result = evaluation.result.as_str(),
            reason = evaluation.reason.map(|r| r.as_str()),
            attempt = outcome.attempt_count,
            "Answer evaluated"
        );

        let mut profile = self.load_profile(&request.user_id, &request.language).await?;
        self.update_profile(&mut profile, &lesson, question, &evaluation, outcome.transition.mark_needs_review, now);

        let feedback = feedback::compose(&outcome, &lesson.language);
        let support_included = should_include_support(
            self.support_level,
            &evaluation,
            outcome.attempt_count,
            session.max_attempts,
            request.include_support,
        );
        let explanation = if support_included {
            self.explanation_for(&lesson.language, question, &request.answer, &evaluation)
                .await
        } else {
            None
        };

        self.sessions.save_session(&session).await?;
        self.save_profile(&profile).await?;

        Ok(SubmitOutcome::Answered(SubmitResponse {
            question_id: outcome.question_id,
            evaluation,
            attempt_count: outcome.attempt_count,
            state: session.state,
            current_question_index: session.current_question_index,
            hint: outcome.transition.hint,
            feedback,
            support_included,
            explanation,
            needs_review: outcome.transition.mark_needs_review,
        }))
    }

    /// Start the lesson over from its first question.
    pub async fn restart_session(
        &self,
        user_id: &str,
        language: &Language,
        lesson_id: &str,
    ) -> Result<LessonSession> {
        let _guard = self.locks.acquire(user_id, language).await;
        let lesson = self.lesson(language, lesson_id).await?;
        let session = self.new_session(user_id, language, &lesson, self.now());
        self.sessions.save_session(&session).await?;
        Ok(session)
    }

    /// Questions most worth reviewing now, best first.
    pub async fn suggest_reviews(
        &self,
        user_id: &str,
        language: &Language,
        limit: usize,
    ) -> Result<Vec<ReviewCandidate>> {
        let profile = self.load_profile(user_id, language).await?;
        Ok(pick_suggested_review_items(
            profile.review_candidates.as_slice(),
            self.now(),
            limit,
        ))
    }

    /// Queue entries due now, in queue order.
    pub async fn due_reviews(
        &self,
        user_id: &str,
        language: &Language,
        limit: usize,
    ) -> Result<Vec<ReviewQueueEntry>> {
        let profile = self.load_profile(user_id, language).await?;
        Ok(pick_due_review_queue_items(&profile.review_queue, self.now(), limit))
    }

    /// Answer a review queue entry and reschedule it.
    pub async fn submit_review(
        &self,
        user_id: &str,
        language: &Language,
        entry_id: &str,
        answer: &str,
    ) -> Result<ReviewResponse> {
        let _guard = self.locks.acquire(user_id, language).await;
        let now = self.now();
        let mut profile = self.load_profile(user_id, language).await?;

        let entry = profile
            .review_queue
            .iter_mut()
            .find(|entry| entry.id == entry_id)
            .ok_or_else(|| TutorError::ReviewEntryNotFound(entry_id.to_string()))?;

        let evaluation = evaluate_answer(&entry.as_question(), answer, language);
        entry.record_attempt(evaluation.result, now);

        let response = ReviewResponse {
            entry_id: entry.id.clone(),
            evaluation,
            attempts: entry.attempts,
            next_due_at: entry.due_at,
            feedback: if evaluation.is_correct() {
                "Correct!".to_string()
            } else {
                format!("The answer is \"{}\".", entry.expected_answer)
            },
        };

        if let Some(question_id) = entry.question_id.clone() {
            let key = ReviewKey::new(&entry.lesson_id, &question_id);
            profile
                .review_candidates
                .mark_reviewed(&key, evaluation.result, now);
        }

        tracing::info!(
            user_id = %user_id,
            entry_id = %entry_id,
            result = evaluation.result.as_str(),
            next_due_at = %response.next_due_at,
            "Review answered"
        );

        self.save_profile(&profile).await?;
        Ok(response)
    }

    fn new_session(
        &self,
        user_id: &str,
        language: &Language,
        lesson: &Lesson,
        now: DateTime<Utc>,
    ) -> LessonSession {
        LessonSession::new(user_id, &lesson.id, language.clone(), now)
            .with_max_attempts(self.max_attempts)
    }

    async fn restart_after(
        &self,
        mut session: LessonSession,
        reason: ProgressionError,
        now: DateTime<Utc>,
    ) -> Result<SubmitOutcome> {
        tracing::warn!(
            user_id = %session.user_id,
            lesson_id = %session.lesson_id,
            error = %reason,
            "Restarting session"
        );
        session.restart(now);
        self.sessions.save_session(&session).await?;
        Ok(SubmitOutcome::RestartRequired { reason, session })
    }

    async fn load_profile(&self, user_id: &str, language: &Language) -> Result<LearnerProfile> {
        let Some(stored) = self.profiles.load_profile(user_id, language.as_str()).await? else {
            return Ok(LearnerProfile::new(user_id, language));
        };

        let (profile, report) = stored.into_profile(user_id, language.as_str());
        if !report.is_clean() {
            tracing::warn!(
                user_id = %user_id,
                language = %language,
                dropped_candidates = report.dropped_candidates,
                dropped_queue_entries = report.dropped_queue_entries,
                dropped_confusions = report.dropped_confusions,
                "Dropped malformed review records"
            );
        }
        Ok(profile)
    }

    async fn save_profile(&self, profile: &LearnerProfile) -> Result<()> {
        self.profiles
            .save_profile(
                &profile.user_id,
                &profile.language,
                &StoredLearnerProfile::from(profile),
            )
            .await
    }

    fn update_profile(
        &self,
        profile: &mut LearnerProfile,
        lesson: &Lesson,
        question: &Question,
        evaluation: &AnswerEvaluation,
        needs_review: bool,
        now: DateTime<Utc>,
    ) {
        let key = ReviewKey::new(&lesson.id, &question.id);

        if evaluation.is_correct() {
            profile.review_candidates.record_correct(&key, now);
        } else {
            profile
                .review_candidates
                .record_mistake(key, &question.concept_tag, now);
            if let Some(reason) = evaluation.reason {
                profile.record_confusion(Confusion {
                    lesson_id: lesson.id.clone(),
                    question_id: question.id.clone(),
                    concept_tag: question.concept_tag.clone(),
                    reason,
                    at: now,
                });
            }
        }

        if needs_review {
            let entry = ReviewQueueEntry::for_question(
                &Uuid::new_v4().to_string(),
                &lesson.id,
                question,
                now,
            );
            let queue = std::mem::take(&mut profile.review_queue);
            profile.review_queue = enqueue_review(queue, [entry]);
            tracing::debug!(
                lesson_id = %lesson.id,
                question_id = %question.id,
                queued = profile.review_queue.len(),
                "Queued question for review"
            );
        }
    }

    /// Generated explanation when an explainer is wired and answers in time,
    /// otherwise the authored one.
    async fn explanation_for(
        &self,
        language: &Language,
        question: &Question,
        user_answer: &str,
        evaluation: &AnswerEvaluation,
    ) -> Option<String> {
        let authored = question.explanation.clone();
        let Some(explainer) = &self.explainer else {
            return authored;
        };

        let request = ExplainRequest {
            language: language.clone(),
            prompt: question.prompt.clone(),
            expected_answer: question.answer.clone(),
            user_answer: user_answer.to_string(),
            concept_tag: question.concept_tag.clone(),
            reason: evaluation.reason,
        };

        match explain_with_timeout(explainer.as_ref(), &request, self.explain_timeout).await {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!(explainer = explainer.name(), error = %e, "Explanation unavailable");
                authored
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_idle_locks_are_evicted() {
        let locks = KeyedLocks::default();

        for user in ["a", "b", "c"] {
            let _guard = locks.acquire(user, &Language::German).await;
        }
        // The last acquire only sweeps entries released before it.
        assert_eq!(locks.len().await, 1);

        drop(locks.acquire("a", &Language::French).await);
        assert_eq!(locks.len().await, 1);
    }

    #[tokio::test]
    async fn test_held_locks_survive_eviction() {
        let locks = Arc::new(KeyedLocks::default());
        let held = locks.acquire("a", &Language::German).await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire("a", &Language::German).await;
            })
        };
        tokio::task::yield_now().await;

        drop(locks.acquire("b", &Language::German).await);
        assert_eq!(locks.len().await, 2);
        assert!(!waiter.is_finished());

        drop(held);
        waiter.await.unwrap();
        drop(locks.acquire("c", &Language::German).await);
        assert_eq!(locks.len().await, 1);
    }
}
