use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::answers::AnswersByPosition;
use crate::model::catalog::Catalog;
use crate::model::ids::{QuestionId, RunId};
use crate::model::selection::{Run, Selection};
use crate::scoring::{self, ScoreReport};

/// What triggered finalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalizeReason {
    Manual,
    Timeout,
}

impl fmt::Display for FinalizeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FinalizeReason::Manual => f.write_str("manual"),
            FinalizeReason::Timeout => f.write_str("timeout"),
        }
    }
}

/// The frozen outcome of one run. Produced once; never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizedResult {
    run_id: RunId,
    reason: FinalizeReason,
    question_ids: Vec<QuestionId>,
    answers: AnswersByPosition,
    score: u32,
    total: u32,
    percentage: u8,
    finalized_at: DateTime<Utc>,
}

impl FinalizedResult {
    /// Freeze `answers` for `run` and score them.
    ///
    /// Every position `1..=N` receives a value; absent or whitespace-only
    /// answers are recorded as `""`.
    #[must_use]
    pub fn freeze(
        run: &Run,
        selection: &Selection,
        answers: &AnswersByPosition,
        catalog: &Catalog,
        reason: FinalizeReason,
        finalized_at: DateTime<Utc>,
    ) -> (Self, ScoreReport) {
        let answers = answers.normalized(selection.len());
        let report = scoring::score(catalog, selection.ids(), &answers);
        let result = Self {
            run_id: run.id(),
            reason,
            question_ids: selection.ids().to_vec(),
            answers,
            score: report.correct,
            total: report.total,
            percentage: report.percentage,
            finalized_at,
        };
        (result, report)
    }

    #[must_use]
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    #[must_use]
    pub fn reason(&self) -> FinalizeReason {
        self.reason
    }

    #[must_use]
    pub fn question_ids(&self) -> &[QuestionId] {
        &self.question_ids
    }

    #[must_use]
    pub fn answers(&self) -> &AnswersByPosition {
        &self.answers
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn percentage(&self) -> u8 {
        self.percentage
    }

    #[must_use]
    pub fn finalized_at(&self) -> DateTime<Utc> {
        self.finalized_at
    }

    /// Re-derive the per-item report from the frozen data.
    #[must_use]
    pub fn report(&self, catalog: &Catalog) -> ScoreReport {
        scoring::score(catalog, &self.question_ids, &self.answers)
    }
}
