//! Lesson content sources.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use lesson_core::{Language, Lesson};

use crate::error::{Result, TutorError};

/// Read-only source of lesson content.
#[async_trait]
pub trait ContentCatalog: Send + Sync {
    /// Load a lesson, or `None` when it does not exist.
    async fn load_lesson(&self, language: &Language, lesson_id: &str) -> Result<Option<Lesson>>;
}

/// Lessons stored as `{root}/{language}/{lesson_id}.json`.
pub struct JsonCatalog {
    root: PathBuf,
}

impl JsonCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn lesson_path(&self, language: &Language, lesson_id: &str) -> Result<PathBuf> {
        let safe = |part: &str| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        };
        if !safe(language.as_str()) || !safe(lesson_id) {
            return Err(TutorError::Catalog(format!(
                "invalid lesson reference '{}/{}'",
                language, lesson_id
            )));
        }

        Ok(self
            .root
            .join(language.as_str())
            .join(format!("{}.json", lesson_id)))
    }
}

#[async_trait]
impl ContentCatalog for JsonCatalog {
    async fn load_lesson(&self, language: &Language, lesson_id: &str) -> Result<Option<Lesson>> {
        let path = self.lesson_path(language, lesson_id)?;

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(TutorError::Catalog(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let lesson: Lesson = serde_json::from_str(&content)
            .map_err(|e| TutorError::Catalog(format!("invalid lesson {}: {}", path.display(), e)))?;

        tracing::debug!(path = %path.display(), questions = lesson.questions.len(), "Loaded lesson");
        Ok(Some(lesson))
    }
}

/// In-memory catalog, keyed by language code and lesson id.
#[derive(Default)]
pub struct MemoryCatalog {
    lessons: HashMap<(String, String), Lesson>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lesson(mut self, lesson: Lesson) -> Self {
        self.insert(lesson);
        self
    }

    pub fn insert(&mut self, lesson: Lesson) {
        let key = (lesson.language.as_str().to_string(), lesson.id.clone());
        self.lessons.insert(key, lesson);
    }
}

#[async_trait]
impl ContentCatalog for MemoryCatalog {
    async fn load_lesson(&self, language: &Language, lesson_id: &str) -> Result<Option<Lesson>> {
        Ok(self
            .lessons
            .get(&(language.as_str().to_string(), lesson_id.to_string()))
            .cloned())
    }
}
