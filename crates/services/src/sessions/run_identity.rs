use tracing::debug;

use quiz_core::Clock;
use quiz_core::model::{Run, Selection};
use storage::local_state::LocalState;
use storage::repository::StorageError;

/// Maps a selection to the run that owns it.
#[derive(Clone)]
pub struct RunIdentityManager {
    state: LocalState,
    clock: Clock,
}

impl RunIdentityManager {
    #[must_use]
    pub fn new(state: LocalState, clock: Clock) -> Self {
        Self { state, clock }
    }

    /// Return the stored run if it was started for `selection`; otherwise mint
    /// and persist a new one.
    ///
    /// A new run never reads the previous run's ledger: ledgers are keyed by
    /// run id, so the old one is orphaned in place.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if local state cannot be read or written.
    pub async fn resolve_run(&self, selection: &Selection) -> Result<Run, StorageError> {
        match self.state.load_run().await? {
            Some(run) if run.matches(selection) => {
                debug!(run_id = %run.id(), "resuming run");
                return Ok(run);
            }
            Some(stale) => debug!(run_id = %stale.id(), "selection changed; rotating run"),
            None => {}
        }

        let run = Run::start(selection, self.clock.now());
        self.state.save_run(&run).await?;
        debug!(run_id = %run.id(), "started run");
        Ok(run)
    }
}
