use tracing::debug;

use quiz_core::model::{AnswersByPosition, Position, RunId};
use storage::local_state::LocalState;
use storage::repository::StorageError;

use crate::error::SessionError;

/// Position-keyed answers of one run, written through to local state.
pub struct AnswerLedger {
    state: LocalState,
    run_id: RunId,
    total: usize,
    answers: AnswersByPosition,
}

impl AnswerLedger {
    /// Load the ledger of `run_id`. Entries past `total` are dropped.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if local state cannot be read.
    pub async fn load(state: LocalState, run_id: RunId, total: usize) -> Result<Self, StorageError> {
        let answers = state
            .load_answers(run_id)
            .await?
            .iter()
            .filter(|(position, _)| position.index() < total)
            .map(|(position, value)| (position, value.to_owned()))
            .collect();
        Ok(Self {
            state,
            run_id,
            total,
            answers,
        })
    }

    #[must_use]
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Recorded answer, `""` when unanswered.
    #[must_use]
    pub fn get(&self, position: Position) -> &str {
        self.answers.get(position)
    }

    #[must_use]
    pub fn answers(&self) -> &AnswersByPosition {
        &self.answers
    }

    /// Copy of every recorded answer.
    #[must_use]
    pub fn snapshot(&self) -> AnswersByPosition {
        self.answers.clone()
    }

    /// Record `answer` at `position`, replacing any earlier value.
    ///
    /// The write reaches local state before the in-memory ledger changes, so
    /// a failed write leaves both unchanged.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Position` if `position` is past the end, or
    /// `SessionError::Storage` if the write fails.
    pub async fn set(&mut self, position: Position, answer: &str) -> Result<(), SessionError> {
        let position = position.within(self.total)?;
        let mut next = self.answers.clone();
        next.set(position, answer);
        self.state.save_answers(self.run_id, &next).await?;
        self.answers = next;
        debug!(run_id = %self.run_id, %position, "recorded answer");
        Ok(())
    }
}
