//! Shared fixtures for tutor integration tests.
//!
//! Everything runs in memory: lessons come from a `MemoryCatalog`, sessions
//! and profiles from a `MemoryStore`, and time from a `TestClock` the test
//! moves by hand.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use lesson_core::{Language, Lesson, Question};
use lesson_tutor::catalog::MemoryCatalog;
use lesson_tutor::explain::{ExplainError, ExplainRequest, Explainer};
use lesson_tutor::service::{SubmitOutcome, SubmitRequest, SubmitResponse, TutorService};
use lesson_tutor::store::MemoryStore;

pub const USER: &str = "learner-1";

/// A wrong answer no rule rescues in the German fixtures.
pub const WRONG: &str = "blah";

#[derive(Clone)]
pub struct TestClock(Arc<Mutex<DateTime<Utc>>>);

impl TestClock {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(
            Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap(),
        )))
    }

    pub fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.0.lock().unwrap();
        *now += by;
    }
}

pub fn german_lesson() -> Lesson {
    let mut table = Question::new("q1", "The table", "der Tisch", "articles");
    table.explanation = Some("Tisch is masculine.".to_string());
    let chair = Question::new("q2", "The chair", "der Stuhl", "articles");
    Lesson {
        id: "basics".to_string(),
        language: Language::German,
        title: "Basics".to_string(),
        questions: vec![table, chair],
    }
}

pub fn empty_lesson() -> Lesson {
    Lesson {
        id: "empty".to_string(),
        language: Language::German,
        title: "Nothing here".to_string(),
        questions: Vec::new(),
    }
}

pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub clock: TestClock,
    pub service: TutorService,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with(|service| service)
    }

    /// Build a context, letting the test adjust the service first.
    pub fn with(configure: impl FnOnce(TutorService) -> TutorService) -> Self {
        let catalog = MemoryCatalog::new()
            .with_lesson(german_lesson())
            .with_lesson(empty_lesson());
        let store = Arc::new(MemoryStore::new());
        let clock = TestClock::new();

        let ticking = clock.clone();
        let service = TutorService::new(Arc::new(catalog), store.clone(), store.clone())
            .with_clock(move || ticking.now());

        Self {
            store,
            clock,
            service: configure(service),
        }
    }

    pub fn request(&self, answer: &str) -> SubmitRequest {
        SubmitRequest {
            user_id: USER.to_string(),
            language: Language::German,
            lesson_id: "basics".to_string(),
            answer: answer.to_string(),
            include_support: None,
        }
    }

    pub async fn submit(&self, answer: &str) -> SubmitOutcome {
        self.service
            .submit_answer(self.request(answer))
            .await
            .expect("submit_answer failed")
    }

    /// Submit and expect the answer to be evaluated.
    pub async fn answer(&self, answer: &str) -> SubmitResponse {
        match self.submit(answer).await {
            SubmitOutcome::Answered(response) => response,
            other => panic!("expected an evaluated answer, got {other:?}"),
        }
    }
}

/// Explainer that always answers with the same text.
pub struct FixedExplainer {
    text: String,
    calls: AtomicU32,
}

impl FixedExplainer {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Explainer for FixedExplainer {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn explain(&self, _request: &ExplainRequest) -> Result<String, ExplainError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(self.text.clone())
    }
}

/// Explainer whose backend is always down.
pub struct FailingExplainer;

#[async_trait]
impl Explainer for FailingExplainer {
    fn name(&self) -> &str {
        "failing"
    }

    async fn explain(&self, _request: &ExplainRequest) -> Result<String, ExplainError> {
        Err(ExplainError::Backend {
            status: 500,
            message: "boom".to_string(),
        })
    }
}

/// Explainer that answers only after `delay`.
pub struct SlowExplainer {
    pub delay: Duration,
}

#[async_trait]
impl Explainer for SlowExplainer {
    fn name(&self) -> &str {
        "slow"
    }

    async fn explain(&self, _request: &ExplainRequest) -> Result<String, ExplainError> {
        tokio::time::sleep(self.delay).await;
        Ok("too late".to_string())
    }
}
