//! Typed view over the device-local key-value schema.
//!
//! Every value is JSON or a plain string under a fixed key. A value that
//! fails to parse is treated as absent and logged; it never aborts a load.

pub mod keys;
mod legacy;

pub use legacy::{MigrationOutcome, migrate_legacy};

use chrono::{DateTime, Utc};
use quiz_core::model::{
    AnswersByPosition, FinalizedResult, Fingerprint, QuestionId, ResultId, Run, RunId, Selection,
};
use std::sync::Arc;
use tracing::warn;

use crate::repository::{LocalStore, StorageError};

/// Typed accessors for the live attempt on this device.
#[derive(Clone)]
pub struct LocalState {
    store: Arc<dyn LocalStore>,
}

impl LocalState {
    #[must_use]
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn LocalStore> {
        &self.store
    }

    // ─── Selection ─────────────────────────────────────────────────────────

    /// Load the presented selection, falling back to the selected ids.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub async fn load_selection(&self) -> Result<Option<Selection>, StorageError> {
        for key in [keys::PRESENTED_IDS, keys::SELECTED_IDS] {
            if let Some(raw) = self.store.get(key).await? {
                if let Some(selection) = parse_selection(key, &raw) {
                    return Ok(Some(selection));
                }
            }
        }
        Ok(None)
    }

    /// Persist `selection` as both the selected and the presented order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the values cannot be stored.
    pub async fn save_selection(&self, selection: &Selection) -> Result<(), StorageError> {
        let json = to_json(selection)?;
        self.store
            .set_all(&[
                (keys::SELECTED_IDS.to_owned(), json.clone()),
                (keys::PRESENTED_IDS.to_owned(), json),
            ])
            .await
    }

    // ─── Run identity ──────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub async fn load_run(&self) -> Result<Option<Run>, StorageError> {
        let Some(raw_id) = self.store.get(keys::RUN_ID).await? else {
            return Ok(None);
        };
        let Ok(id) = raw_id.parse::<RunId>() else {
            warn!(key = keys::RUN_ID, "ignoring malformed run id");
            return Ok(None);
        };
        let Some(fingerprint) = self.store.get(keys::RUN_FINGERPRINT).await? else {
            return Ok(None);
        };
        let started_at = match self.store.get(keys::RUN_STARTED_AT).await? {
            Some(raw) => match DateTime::parse_from_rfc3339(&raw) {
                Ok(ts) => ts.with_timezone(&Utc),
                Err(_) => {
                    warn!(key = keys::RUN_STARTED_AT, "ignoring malformed run start");
                    return Ok(None);
                }
            },
            None => return Ok(None),
        };
        Ok(Some(Run::from_persisted(
            id,
            Fingerprint::from_persisted(fingerprint),
            started_at,
        )))
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the values cannot be stored.
    pub async fn save_run(&self, run: &Run) -> Result<(), StorageError> {
        self.store
            .set_all(&[
                (keys::RUN_ID.to_owned(), run.id().to_string()),
                (
                    keys::RUN_FINGERPRINT.to_owned(),
                    run.fingerprint().as_str().to_owned(),
                ),
                (keys::RUN_STARTED_AT.to_owned(), run.started_at().to_rfc3339()),
            ])
            .await
    }

    // ─── Answers ───────────────────────────────────────────────────────────

    /// Answers of `run_id`. A missing or unreadable ledger is empty.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub async fn load_answers(&self, run_id: RunId) -> Result<AnswersByPosition, StorageError> {
        let key = keys::answers(run_id);
        let Some(raw) = self.store.get(&key).await? else {
            return Ok(AnswersByPosition::new());
        };
        Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(%key, error = %e, "ignoring malformed answers");
            AnswersByPosition::new()
        }))
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be stored.
    pub async fn save_answers(
        &self,
        run_id: RunId,
        answers: &AnswersByPosition,
    ) -> Result<(), StorageError> {
        self.store
            .set(&keys::answers(run_id), &to_json(answers)?)
            .await
    }

    // ─── Finalized marker ──────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub async fn load_finalized(
        &self,
        run_id: RunId,
    ) -> Result<Option<FinalizedResult>, StorageError> {
        let key = keys::finalized(run_id);
        let Some(raw) = self.store.get(&key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(result) => Ok(Some(result)),
            Err(e) => {
                warn!(%key, error = %e, "ignoring malformed finalized result");
                Ok(None)
            }
        }
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be stored.
    pub async fn save_finalized(&self, result: &FinalizedResult) -> Result<(), StorageError> {
        self.store
            .set(&keys::finalized(result.run_id()), &to_json(result)?)
            .await
    }

    /// Id the result store gave the frozen result of `run_id`, if it was
    /// saved.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub async fn load_delivered(&self, run_id: RunId) -> Result<Option<ResultId>, StorageError> {
        let key = keys::delivered(run_id);
        let Some(raw) = self.store.get(&key).await? else {
            return Ok(None);
        };
        match raw.parse::<ResultId>() {
            Ok(id) => Ok(Some(id)),
            Err(e) => {
                warn!(%key, error = %e, "ignoring malformed delivered marker");
                Ok(None)
            }
        }
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be stored.
    pub async fn save_delivered(
        &self,
        run_id: RunId,
        result_id: ResultId,
    ) -> Result<(), StorageError> {
        self.store
            .set(&keys::delivered(run_id), &result_id.to_string())
            .await
    }

    // ─── Lifecycle ─────────────────────────────────────────────────────────

    /// Remove every key of the current attempt, including the ledger and
    /// finalized marker of the stored run.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read or written.
    pub async fn clear_attempt(&self) -> Result<(), StorageError> {
        let run_id = self
            .store
            .get(keys::RUN_ID)
            .await?
            .and_then(|raw| raw.parse::<RunId>().ok());
        self.store.remove_all(&keys::attempt(run_id)).await
    }

    /// Stored schema version, `None` if never stamped.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub async fn schema_version(&self) -> Result<Option<u32>, StorageError> {
        Ok(self
            .store
            .get(keys::SCHEMA_VERSION_KEY)
            .await?
            .and_then(|raw| raw.trim().parse().ok()))
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be stored.
    pub async fn set_schema_version(&self, version: u32) -> Result<(), StorageError> {
        self.store
            .set(keys::SCHEMA_VERSION_KEY, &version.to_string())
            .await
    }
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn parse_selection(key: &str, raw: &str) -> Option<Selection> {
    let ids: Vec<QuestionId> = match serde_json::from_str(raw) {
        Ok(ids) => ids,
        Err(e) => {
            warn!(key, error = %e, "ignoring malformed selection");
            return None;
        }
    };
    if ids.is_empty() {
        return None;
    }
    match Selection::new(ids) {
        Ok(selection) => Some(selection),
        Err(e) => {
            warn!(key, error = %e, "ignoring invalid selection");
            None
        }
    }
}
