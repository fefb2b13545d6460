use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{AnswersByPosition, FinalizedResult, QuestionId, ResultId, UserId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Durable key-value store for the live attempt on this device.
///
/// Values are opaque strings; the typed schema lives in `LocalState`.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Read a value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read. A missing key is `Ok(None)`.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be stored.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a value. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Write several values as one unit.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the values cannot be stored.
    async fn set_all(&self, entries: &[(String, String)]) -> Result<(), StorageError> {
        for (key, value) in entries {
            self.set(key, value).await?;
        }
        Ok(())
    }

    /// Remove several keys as one unit.
    ///
    /// Backends that support transactions override this so that either all
    /// keys go or none do.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    async fn remove_all(&self, keys: &[String]) -> Result<(), StorageError> {
        for key in keys {
            self.remove(key).await?;
        }
        Ok(())
    }
}

/// Shape of a result as sent to the remote result store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewResultRecord {
    pub user_id: UserId,
    pub user_email: Option<String>,
    pub quiz_name: String,
    pub question_ids: Vec<QuestionId>,
    pub answers: AnswersByPosition,
    pub score: u32,
    pub total: u32,
    pub percentage: u8,
}

impl NewResultRecord {
    #[must_use]
    pub fn from_finalized(
        result: &FinalizedResult,
        user_id: UserId,
        user_email: Option<String>,
        quiz_name: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            user_email,
            quiz_name: quiz_name.into(),
            question_ids: result.question_ids().to_vec(),
            answers: result.answers().clone(),
            score: result.score(),
            total: result.total(),
            percentage: result.percentage(),
        }
    }
}

/// A result as read back from the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResult {
    pub id: ResultId,
    pub record: NewResultRecord,
    pub created_at: DateTime<Utc>,
}

impl StoredResult {
    #[must_use]
    pub fn question_ids(&self) -> &[QuestionId] {
        &self.record.question_ids
    }

    #[must_use]
    pub fn answers(&self) -> &AnswersByPosition {
        &self.record.answers
    }
}

/// Remote store of finalized results.
#[async_trait]
pub trait ResultRepository: Send + Sync {
    /// Persist a finalized result and return its generated id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn insert_result(&self, record: &NewResultRecord) -> Result<ResultId, StorageError>;

    /// Fetch a result by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_result(&self, id: ResultId) -> Result<StoredResult, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    local: Arc<Mutex<HashMap<String, String>>>,
    results: Arc<Mutex<HashMap<ResultId, StoredResult>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            local: Arc::new(Mutex::new(HashMap::new())),
            results: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of results stored so far.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn result_count(&self) -> Result<usize, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.len())
    }

    /// Local keys currently present, sorted.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn local_keys(&self) -> Result<Vec<String>, StorageError> {
        let guard = self
            .local
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut keys: Vec<String> = guard.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

#[async_trait]
impl LocalStore for InMemoryRepository {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self
            .local
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self
            .local
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self
            .local
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(key);
        Ok(())
    }

    async fn set_all(&self, entries: &[(String, String)]) -> Result<(), StorageError> {
        let mut guard = self
            .local
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        for (key, value) in entries {
            guard.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    async fn remove_all(&self, keys: &[String]) -> Result<(), StorageError> {
        let mut guard = self
            .local
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        for key in keys {
            guard.remove(key);
        }
        Ok(())
    }
}

#[async_trait]
impl ResultRepository for InMemoryRepository {
    async fn insert_result(&self, record: &NewResultRecord) -> Result<ResultId, StorageError> {
        let mut guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let id = ResultId::generate();
        guard.insert(
            id,
            StoredResult {
                id,
                record: record.clone(),
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn get_result(&self, id: ResultId) -> Result<StoredResult, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }
}

/// Aggregates the local store and the result store behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub local: Arc<dyn LocalStore>,
    pub results: Arc<dyn ResultRepository>,
}

impl Storage {
    /// Both stores backed by `repo`, which stays usable for inspection.
    #[must_use]
    pub fn in_memory(repo: &InMemoryRepository) -> Self {
        let local: Arc<dyn LocalStore> = Arc::new(repo.clone());
        let results: Arc<dyn ResultRepository> = Arc::new(repo.clone());
        Self { local, results }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::Position;

    fn record() -> NewResultRecord {
        let mut answers = AnswersByPosition::new();
        answers.set(Position::FIRST, "A");
        NewResultRecord {
            user_id: UserId::new("user-1").unwrap(),
            user_email: Some("p@example.com".into()),
            quiz_name: "User's knowledge".into(),
            question_ids: vec![QuestionId::new("Q1").unwrap()],
            answers,
            score: 1,
            total: 1,
            percentage: 100,
        }
    }

    #[tokio::test]
    async fn local_store_roundtrip() {
        let repo = InMemoryRepository::new();
        assert_eq!(repo.get("k").await.unwrap(), None);
        repo.set("k", "v").await.unwrap();
        assert_eq!(repo.get("k").await.unwrap().as_deref(), Some("v"));
        repo.remove("k").await.unwrap();
        repo.remove("k").await.unwrap();
        assert_eq!(repo.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn remove_all_clears_every_key() {
        let repo = InMemoryRepository::new();
        repo.set("a", "1").await.unwrap();
        repo.set("b", "2").await.unwrap();
        repo.set("c", "3").await.unwrap();
        repo.remove_all(&["a".into(), "b".into()]).await.unwrap();
        assert_eq!(repo.local_keys().unwrap(), vec!["c".to_string()]);
    }

    #[tokio::test]
    async fn results_insert_and_fetch() {
        let repo = InMemoryRepository::new();
        let id = repo.insert_result(&record()).await.unwrap();
        let stored = repo.get_result(id).await.unwrap();
        assert_eq!(stored.id, id);
        assert_eq!(stored.record, record());
        assert_eq!(repo.result_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn unknown_result_is_not_found() {
        let repo = InMemoryRepository::new();
        let err = repo.get_result(ResultId::generate()).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }
}
