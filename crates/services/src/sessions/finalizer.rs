use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::{info, warn};

use chrono::{DateTime, Utc};
use quiz_core::ScoreReport;
use quiz_core::model::{Catalog, FinalizeReason, FinalizedResult, Run, Selection};
use storage::local_state::LocalState;

use super::delivery::{DeliveryPipeline, DeliveryWatch};
use super::ledger::AnswerLedger;

//
// ─── LATCH ─────────────────────────────────────────────────────────────────────
//

/// One-shot `Pending → Finalized` switch.
///
/// Closing is a single compare-and-set, so two triggers racing at the
/// deadline cannot both win.
#[derive(Debug, Default)]
pub struct FinalizeLatch(AtomicBool);

impl FinalizeLatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn closed() -> Self {
        Self(AtomicBool::new(true))
    }

    /// Close the latch. Returns true only for the caller that closed it.
    pub fn try_close(&self) -> bool {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

//
// ─── FINALIZER ─────────────────────────────────────────────────────────────────
//

/// What a call to `Finalizer::finalize` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// This call froze the attempt.
    Finalized {
        result: FinalizedResult,
        report: ScoreReport,
    },
    /// Another trigger got there first; nothing changed.
    AlreadyFinalized,
}

/// Fixed facts about the attempt being finalized.
pub struct FinalizeInput<'a> {
    pub run: &'a Run,
    pub selection: &'a Selection,
    pub catalog: &'a Catalog,
    pub state: &'a LocalState,
}

pub struct Finalizer {
    latch: FinalizeLatch,
    frozen: OnceLock<(FinalizedResult, ScoreReport)>,
    delivery: DeliveryPipeline,
}

impl Finalizer {
    #[must_use]
    pub fn new(delivery: DeliveryPipeline) -> Self {
        Self {
            latch: FinalizeLatch::new(),
            frozen: OnceLock::new(),
            delivery,
        }
    }

    /// A finalizer for a run that was frozen before a reload. It never fires
    /// again; delivery resumes only if the result was never saved.
    pub async fn restored(
        delivery: DeliveryPipeline,
        result: FinalizedResult,
        report: ScoreReport,
    ) -> Self {
        delivery.resume(result.clone()).await;
        Self {
            latch: FinalizeLatch::closed(),
            frozen: OnceLock::from((result, report)),
            delivery,
        }
    }

    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.latch.is_closed()
    }

    /// The frozen result, once the winning call has scored it.
    #[must_use]
    pub fn result(&self) -> Option<&(FinalizedResult, ScoreReport)> {
        self.frozen.get()
    }

    #[must_use]
    pub fn deliveries(&self) -> DeliveryWatch {
        self.delivery.watch()
    }

    /// Freeze the ledger, score it and hand it to background delivery.
    ///
    /// Only the first call from any trigger does anything. Local scoring
    /// never depends on the remote store, so the returned result is always
    /// complete even if persistence later fails.
    pub async fn finalize(
        &self,
        reason: FinalizeReason,
        input: FinalizeInput<'_>,
        ledger: &Mutex<AnswerLedger>,
        now: DateTime<Utc>,
    ) -> FinalizeOutcome {
        if !self.latch.try_close() {
            return FinalizeOutcome::AlreadyFinalized;
        }

        let answers = ledger.lock().await.snapshot();
        let (result, report) = FinalizedResult::freeze(
            input.run,
            input.selection,
            &answers,
            input.catalog,
            reason,
            now,
        );
        info!(
            run_id = %result.run_id(),
            %reason,
            score = result.score(),
            total = result.total(),
            "attempt finalized"
        );

        if self.frozen.set((result.clone(), report.clone())).is_err() {
            warn!(run_id = %result.run_id(), "finalized result was already recorded");
        }
        if let Err(e) = input.state.save_finalized(&result).await {
            warn!(run_id = %result.run_id(), error = %e, "could not record finalized marker");
        }
        self.delivery.spawn(result.clone());

        FinalizeOutcome::Finalized { result, report }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn latch_closes_once() {
        let latch = FinalizeLatch::new();
        assert!(!latch.is_closed());
        assert!(latch.try_close());
        assert!(!latch.try_close());
        assert!(latch.is_closed());
    }

    #[test]
    fn latch_has_one_winner_across_threads() {
        let latch = Arc::new(FinalizeLatch::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let latch = Arc::clone(&latch);
                std::thread::spawn(move || latch.try_close())
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn restored_latch_is_closed() {
        assert!(FinalizeLatch::closed().is_closed());
    }
}
