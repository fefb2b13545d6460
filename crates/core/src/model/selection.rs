use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::model::catalog::Catalog;
use crate::model::ids::{QuestionId, RunId};
use crate::model::answers::Position;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SelectionError {
    #[error("question {0} is selected more than once")]
    Duplicate(String),

    #[error("question {0} is not in the catalog")]
    Unknown(String),
}

/// Ordered question ids for one attempt.
///
/// Order is presentation order and scoring order; it never changes once fixed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selection(Vec<QuestionId>);

impl Selection {
    /// # Errors
    ///
    /// Returns `SelectionError::Duplicate` if an id repeats.
    pub fn new(ids: Vec<QuestionId>) -> Result<Self, SelectionError> {
        let mut seen = HashSet::with_capacity(ids.len());
        for id in &ids {
            if !seen.insert(id) {
                return Err(SelectionError::Duplicate(id.to_string()));
            }
        }
        Ok(Self(ids))
    }

    /// Check that every selected id resolves in `catalog`.
    ///
    /// # Errors
    ///
    /// Returns `SelectionError::Unknown` for the first id missing from the catalog.
    pub fn ensure_in(&self, catalog: &Catalog) -> Result<(), SelectionError> {
        match self.0.iter().find(|id| !catalog.contains(id)) {
            Some(id) => Err(SelectionError::Unknown(id.to_string())),
            None => Ok(()),
        }
    }

    #[must_use]
    pub fn ids(&self) -> &[QuestionId] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Question id shown at `position`, if in range.
    #[must_use]
    pub fn at(&self, position: Position) -> Option<&QuestionId> {
        self.0.get(position.index())
    }

    /// Stable, order-sensitive serialization of the id sequence.
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        // Vec<String> serialization cannot fail.
        let ids: Vec<&str> = self.0.iter().map(QuestionId::as_str).collect();
        Fingerprint(serde_json::to_string(&ids).unwrap_or_default())
    }

    #[must_use]
    pub fn into_ids(self) -> Vec<QuestionId> {
        self.0
    }
}

/// Derived identity of a selection; two selections are the same attempt iff
/// their fingerprints match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    #[must_use]
    pub fn from_persisted(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The active attempt on this device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    id: RunId,
    fingerprint: Fingerprint,
    started_at: DateTime<Utc>,
}

impl Run {
    /// Start a new run for `selection`, minting a fresh id.
    #[must_use]
    pub fn start(selection: &Selection, started_at: DateTime<Utc>) -> Self {
        Self {
            id: RunId::generate(),
            fingerprint: selection.fingerprint(),
            started_at,
        }
    }

    #[must_use]
    pub fn from_persisted(id: RunId, fingerprint: Fingerprint, started_at: DateTime<Utc>) -> Self {
        Self {
            id,
            fingerprint,
            started_at,
        }
    }

    #[must_use]
    pub fn id(&self) -> RunId {
        self.id
    }

    #[must_use]
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Returns true if this run belongs to `selection`.
    #[must_use]
    pub fn matches(&self, selection: &Selection) -> bool {
        self.fingerprint == selection.fingerprint()
    }
}
