//! Session and profile persistence seams.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use lesson_core::review::StoredLearnerProfile;
use lesson_core::LessonSession;
use tokio::sync::Mutex;

use crate::error::{Result, TutorError};

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load_session(
        &self,
        user_id: &str,
        language: &str,
        lesson_id: &str,
    ) -> Result<Option<LessonSession>>;

    async fn save_session(&self, session: &LessonSession) -> Result<()>;
}

/// Profiles are stored in their lenient form and normalized on load.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn load_profile(&self, user_id: &str, language: &str) -> Result<Option<StoredLearnerProfile>>;

    async fn save_profile(
        &self,
        user_id: &str,
        language: &str,
        profile: &StoredLearnerProfile,
    ) -> Result<()>;
}

type SessionKey = (String, String, String);
type ProfileKey = (String, String);

/// Process-local store for sessions and profiles.
#[derive(Default)]
pub struct MemoryStore {
    sessions: Mutex<HashMap<SessionKey, LessonSession>>,
    profiles: Mutex<HashMap<ProfileKey, StoredLearnerProfile>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load_session(
        &self,
        user_id: &str,
        language: &str,
        lesson_id: &str,
    ) -> Result<Option<LessonSession>> {
        let key = (user_id.to_string(), language.to_string(), lesson_id.to_string());
        Ok(self.sessions.lock().await.get(&key).cloned())
    }

    async fn save_session(&self, session: &LessonSession) -> Result<()> {
        let key = (
            session.user_id.clone(),
            session.language.as_str().to_string(),
            session.lesson_id.clone(),
        );
        self.sessions.lock().await.insert(key, session.clone());
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn load_profile(&self, user_id: &str, language: &str) -> Result<Option<StoredLearnerProfile>> {
        let key = (user_id.to_string(), language.to_string());
        Ok(self.profiles.lock().await.get(&key).cloned())
    }

    async fn save_profile(
        &self,
        user_id: &str,
        language: &str,
        profile: &StoredLearnerProfile,
    ) -> Result<()> {
        let key = (user_id.to_string(), language.to_string());
        self.profiles.lock().await.insert(key, profile.clone());
        Ok(())
    }
}

/// Sessions and profiles kept as JSON files under one directory.
///
/// Layout: `{root}/sessions/{user}/{language}/{lesson}.json` and
/// `{root}/profiles/{user}/{language}.json`.
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn session_path(&self, user_id: &str, language: &str, lesson_id: &str) -> Result<PathBuf> {
        for part in [user_id, language, lesson_id] {
            check_segment(part)?;
        }
        Ok(self
            .root
            .join("sessions")
            .join(user_id)
            .join(language)
            .join(format!("{}.json", lesson_id)))
    }

    fn profile_path(&self, user_id: &str, language: &str) -> Result<PathBuf> {
        check_segment(user_id)?;
        check_segment(language)?;
        Ok(self
            .root
            .join("profiles")
            .join(user_id)
            .join(format!("{}.json", language)))
    }
}

fn check_segment(part: &str) -> Result<()> {
    let safe = !part.is_empty()
        && part
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if safe {
        Ok(())
    } else {
        Err(TutorError::Store(format!("invalid key segment '{}'", part)))
    }
}

async fn read_optional(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(TutorError::Store(format!(
            "failed to read {}: {}",
            path.display(),
            e
        ))),
    }
}

/// Write through a sibling temp file so readers never see a torn document.
async fn write_atomic(path: &Path, content: String) -> Result<()> {
    let io_err = |e: std::io::Error| TutorError::Store(format!("failed to write {}: {}", path.display(), e));

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, content).await.map_err(io_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(io_err)?;
    Ok(())
}

#[async_trait]
impl SessionStore for JsonFileStore {
    async fn load_session(
        &self,
        user_id: &str,
        language: &str,
        lesson_id: &str,
    ) -> Result<Option<LessonSession>> {
        let path = self.session_path(user_id, language, lesson_id)?;
        let Some(content) = read_optional(&path).await? else {
            return Ok(None);
        };

        let session = serde_json::from_str(&content)
            .map_err(|e| TutorError::Store(format!("invalid session {}: {}", path.display(), e)))?;
        Ok(Some(session))
    }

    async fn save_session(&self, session: &LessonSession) -> Result<()> {
        let path = self.session_path(&session.user_id, session.language.as_str(), &session.lesson_id)?;
        let content = serde_json::to_string_pretty(session)
            .map_err(|e| TutorError::Store(format!("failed to encode session: {}", e)))?;
        write_atomic(&path, content).await
    }
}

#[async_trait]
impl ProfileStore for JsonFileStore {
    async fn load_profile(&self, user_id: &str, language: &str) -> Result<Option<StoredLearnerProfile>> {
        let path = self.profile_path(user_id, language)?;
        let Some(content) = read_optional(&path).await? else {
            return Ok(None);
        };

        // Bad records are set aside by the stored form; only a document that
        // is not a profile at all is an error.
        let profile = serde_json::from_str(&content)
            .map_err(|e| TutorError::Store(format!("invalid profile {}: {}", path.display(), e)))?;
        Ok(Some(profile))
    }

    async fn save_profile(
        &self,
        user_id: &str,
        language: &str,
        profile: &StoredLearnerProfile,
    ) -> Result<()> {
        let path = self.profile_path(user_id, language)?;
        let content = serde_json::to_string_pretty(profile)
            .map_err(|e| TutorError::Store(format!("failed to encode profile: {}", e)))?;
        write_atomic(&path, content).await
    }
}
