use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use quiz_core::model::FinalizeReason;
use quiz_core::{Countdown, TickOutcome};

use super::service::QuizSession;

/// A running countdown task for one session.
///
/// Views subscribe to `remaining`; dropping or re-creating a view does not
/// touch the countdown.
pub struct TimerHandle {
    remaining: watch::Receiver<Countdown>,
    task: JoinHandle<()>,
}

impl TimerHandle {
    #[must_use]
    pub fn remaining(&self) -> watch::Receiver<Countdown> {
        self.remaining.clone()
    }

    /// Stop ticking without finalizing.
    pub fn stop(&self) {
        self.task.abort();
    }

    /// Wait for the task to end, either by expiry or because the attempt was
    /// finalized some other way.
    pub async fn finished(self) {
        // An aborted task is a normal way to end.
        let _ = self.task.await;
    }
}

pub(crate) fn spawn(session: Arc<QuizSession>) -> TimerHandle {
    let mut countdown = session.remaining();
    let (tx, rx) = watch::channel(countdown);

    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            if session.is_finalized() {
                debug!("attempt finalized; timer stopping");
                break;
            }
            match countdown.tick() {
                TickOutcome::Running(_) => {
                    tx.send_replace(countdown);
                }
                TickOutcome::Expired => {
                    tx.send_replace(countdown);
                    debug!("time is up");
                    session.finalize(FinalizeReason::Timeout).await;
                    break;
                }
                TickOutcome::Stopped => break,
            }
        }
    });

    TimerHandle {
        remaining: rx,
        task,
    }
}
