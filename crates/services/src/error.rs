//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{CatalogError, PositionError, QuestionId};
use quiz_core::LinkError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `QuizConfig` validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("question count must be at least 1")]
    ZeroQuestions,
    #[error("time limit must be at least one second")]
    ZeroTimeLimit,
    #[error("pass threshold {0} is above 100")]
    ThresholdOutOfRange(u8),
}

/// Errors emitted by the notification client.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum NotifyError {
    #[error("notifications are not configured")]
    Disabled,
    #[error("notification has no recipient")]
    MissingRecipient,
    #[error("notification request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Link(#[from] LinkError),
}

/// Errors emitted by the quiz session.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no questions available for a quiz")]
    Empty,
    #[error("attempt already finalized")]
    Finalized,
    #[error("position {position} has not been reached")]
    Unreachable { position: u32 },
    #[error("question {0} is not in the catalog")]
    UnknownQuestion(QuestionId),
    #[error("{answer:?} is not an option of question {position}")]
    NotAnOption { position: u32, answer: String },
    #[error(transparent)]
    Position(#[from] PositionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
