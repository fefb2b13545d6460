use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

use quiz_core::model::{AnswersByPosition, Catalog, QuestionId, ResultId};
use quiz_core::{ReviewLink, ScoreReport, score};
use storage::repository::{ResultRepository, StorageError};

//
// ─── REVIEW STATE ──────────────────────────────────────────────────────────────
//

/// A stored result re-scored against the local catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedReview {
    pub result_id: ResultId,
    pub quiz_name: String,
    pub question_ids: Vec<QuestionId>,
    pub answers: AnswersByPosition,
    pub report: ScoreReport,
    pub created_at: DateTime<Utc>,
}

/// Terminal outcome of opening a shared review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewState {
    Ready(Box<SharedReview>),
    /// The record is missing, expired or unreadable. Not retried.
    Unavailable,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Read-only access to stored results.
///
/// Holds only the result store's read side; there is no path from here to
/// local state, finalization or notification.
#[derive(Clone)]
pub struct ReviewService {
    catalog: Arc<Catalog>,
    results: Arc<dyn ResultRepository>,
}

impl ReviewService {
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, results: Arc<dyn ResultRepository>) -> Self {
        Self { catalog, results }
    }

    /// Fetch `result_id` and score it with the same engine as a live attempt.
    pub async fn open(&self, result_id: ResultId) -> ReviewState {
        let stored = match self.results.get_result(result_id).await {
            Ok(stored) => stored,
            Err(StorageError::NotFound) => {
                debug!(%result_id, "shared result not found");
                return ReviewState::Unavailable;
            }
            Err(e) => {
                warn!(%result_id, error = %e, "shared result could not be fetched");
                return ReviewState::Unavailable;
            }
        };

        let report = score(&self.catalog, stored.question_ids(), stored.answers());
        ReviewState::Ready(Box::new(SharedReview {
            result_id: stored.id,
            quiz_name: stored.record.quiz_name.clone(),
            question_ids: stored.record.question_ids.clone(),
            answers: stored.record.answers.clone(),
            report,
            created_at: stored.created_at,
        }))
    }

    /// Parse a link, URL or bare id and open it. A reference that does not
    /// parse is unavailable.
    pub async fn open_link(&self, reference: &str) -> ReviewState {
        match ReviewLink::parse(reference) {
            Ok(link) => self.open(link.result_id).await,
            Err(e) => {
                debug!(error = %e, "unusable review reference");
                ReviewState::Unavailable
            }
        }
    }
}
