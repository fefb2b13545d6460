//! Background persistence and notification of a finalized result.
//!
//! Neither step blocks the attempt. Each reports through its own `watch`
//! channel so the result view can show independent status chips.

use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

use quiz_core::model::{FinalizedResult, ResultId};
use storage::local_state::LocalState;
use storage::repository::{NewResultRecord, ResultRepository};

use crate::access::Identity;
use crate::notify_service::{Notifier, build_request};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DeliveryStatus {
    #[default]
    Idle,
    Pending,
    Succeeded,
    Failed(String),
    Skipped(&'static str),
}

impl DeliveryStatus {
    /// True once the step will not change again.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            DeliveryStatus::Succeeded | DeliveryStatus::Failed(_) | DeliveryStatus::Skipped(_)
        )
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryStatus::Idle => f.write_str("idle"),
            DeliveryStatus::Pending => f.write_str("pending"),
            DeliveryStatus::Succeeded => f.write_str("done"),
            DeliveryStatus::Failed(reason) => write!(f, "failed ({reason})"),
            DeliveryStatus::Skipped(reason) => write!(f, "skipped ({reason})"),
        }
    }
}

/// Sending halves, owned by the finalizer.
struct DeliveryChannels {
    save: watch::Sender<DeliveryStatus>,
    notify: watch::Sender<DeliveryStatus>,
    result_id: watch::Sender<Option<ResultId>>,
}

/// Receiving halves, handed to views.
#[derive(Clone)]
pub struct DeliveryWatch {
    pub save: watch::Receiver<DeliveryStatus>,
    pub notify: watch::Receiver<DeliveryStatus>,
    pub result_id: watch::Receiver<Option<ResultId>>,
}

impl DeliveryWatch {
    /// Wait until both steps have settled.
    pub async fn settled(&mut self) -> (DeliveryStatus, DeliveryStatus) {
        let save = self
            .save
            .wait_for(DeliveryStatus::is_settled)
            .await
            .map(|s| s.clone())
            .unwrap_or_else(|_| self.save.borrow().clone());
        let notify = self
            .notify
            .wait_for(DeliveryStatus::is_settled)
            .await
            .map(|s| s.clone())
            .unwrap_or_else(|_| self.notify.borrow().clone());
        (save, notify)
    }
}

/// Everything needed to deliver a result once it is frozen.
#[derive(Clone)]
pub struct DeliveryPipeline {
    results: Arc<dyn ResultRepository>,
    notifier: Arc<dyn Notifier>,
    state: LocalState,
    identity: Option<Identity>,
    quiz_name: String,
    channels: Arc<DeliveryChannels>,
}

impl DeliveryPipeline {
    #[must_use]
    pub fn new(
        results: Arc<dyn ResultRepository>,
        notifier: Arc<dyn Notifier>,
        state: LocalState,
        identity: Option<Identity>,
        quiz_name: impl Into<String>,
    ) -> Self {
        let channels = DeliveryChannels {
            save: watch::Sender::new(DeliveryStatus::Idle),
            notify: watch::Sender::new(DeliveryStatus::Idle),
            result_id: watch::Sender::new(None),
        };
        Self {
            results,
            notifier,
            state,
            identity,
            quiz_name: quiz_name.into(),
            channels: Arc::new(channels),
        }
    }

    #[must_use]
    pub fn watch(&self) -> DeliveryWatch {
        DeliveryWatch {
            save: self.channels.save.subscribe(),
            notify: self.channels.notify.subscribe(),
            result_id: self.channels.result_id.subscribe(),
        }
    }

    /// Run persistence then notification on a background task.
    pub fn spawn(&self, result: FinalizedResult) {
        let pipeline = self.clone();
        tokio::spawn(async move { pipeline.deliver(&result).await });
    }

    /// Pick up delivery of a result frozen before this process started.
    ///
    /// A result whose save was recorded is only republished; one that was
    /// never saved goes through the whole pipeline again.
    pub async fn resume(&self, result: FinalizedResult) {
        let channels = &self.channels;
        let run_id = result.run_id();
        match self.state.load_delivered(run_id).await {
            Ok(Some(result_id)) => {
                channels.result_id.send_replace(Some(result_id));
                channels.save.send_replace(DeliveryStatus::Succeeded);
                channels.notify.send_replace(DeliveryStatus::Skipped("already delivered"));
            }
            Ok(None) => {
                info!(%run_id, "result was never saved; delivering again");
                self.spawn(result);
            }
            Err(e) => {
                // Unknown delivery state; retrying could store a duplicate.
                error!(%run_id, error = %e, "could not read delivery marker");
                channels.save.send_replace(DeliveryStatus::Failed(e.to_string()));
                channels.notify.send_replace(DeliveryStatus::Skipped("result not saved"));
            }
        }
    }

    async fn deliver(&self, result: &FinalizedResult) {
        let channels = &self.channels;
        let Some(identity) = &self.identity else {
            channels.save.send_replace(DeliveryStatus::Skipped("not signed in"));
            channels.notify.send_replace(DeliveryStatus::Skipped("result not saved"));
            return;
        };

        channels.save.send_replace(DeliveryStatus::Pending);
        let record = NewResultRecord::from_finalized(
            result,
            identity.user_id.clone(),
            identity.email.clone(),
            self.quiz_name.clone(),
        );
        let result_id = match self.results.insert_result(&record).await {
            Ok(id) => {
                info!(run_id = %result.run_id(), result_id = %id, "result saved");
                if let Err(e) = self.state.save_delivered(result.run_id(), id).await {
                    warn!(run_id = %result.run_id(), error = %e, "could not record delivery marker");
                }
                channels.result_id.send_replace(Some(id));
                channels.save.send_replace(DeliveryStatus::Succeeded);
                id
            }
            Err(e) => {
                error!(run_id = %result.run_id(), error = %e, "result save failed");
                channels.save.send_replace(DeliveryStatus::Failed(e.to_string()));
                channels.notify.send_replace(DeliveryStatus::Skipped("result not saved"));
                return;
            }
        };

        let Some(email) = &identity.email else {
            channels.notify.send_replace(DeliveryStatus::Skipped("no e-mail address"));
            return;
        };
        if !self.notifier.enabled() {
            warn!(%result_id, "notifications are not configured; skipping");
            channels.notify.send_replace(DeliveryStatus::Skipped("notifications disabled"));
            return;
        }

        channels.notify.send_replace(DeliveryStatus::Pending);
        let sent = match build_request(
            self.notifier.app_base_url(),
            email,
            result_id,
            result.score(),
            result.total(),
            result.percentage(),
            &self.quiz_name,
        ) {
            Ok(request) => self.notifier.notify(&request).await,
            Err(e) => Err(e),
        };
        match sent {
            Ok(()) => {
                info!(%result_id, "result notification sent");
                channels.notify.send_replace(DeliveryStatus::Succeeded);
            }
            Err(e) => {
                error!(%result_id, error = %e, "result notification failed");
                channels.notify.send_replace(DeliveryStatus::Failed(e.to_string()));
            }
        }
    }
}
