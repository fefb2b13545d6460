use rand::Rng;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use quiz_core::model::{
    Catalog, FinalizeReason, FinalizedResult, Position, PositionError, Question, Run, Selection,
};
use quiz_core::{Clock, Countdown, NavigationGuard, ScoreReport, select_questions};
use storage::local_state::{LocalState, migrate_legacy};
use storage::repository::{ResultRepository, Storage};

use super::delivery::{DeliveryPipeline, DeliveryWatch};
use super::finalizer::{FinalizeInput, FinalizeOutcome, Finalizer};
use super::ledger::AnswerLedger;
use super::progress::AttemptProgress;
use super::run_identity::RunIdentityManager;
use super::timer::{self, TimerHandle};
use crate::access::Identity;
use crate::config::QuizConfig;
use crate::error::SessionError;
use crate::notify_service::Notifier;

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Starts, resumes and retakes attempts on this device.
#[derive(Clone)]
pub struct QuizService {
    clock: Clock,
    config: QuizConfig,
    catalog: Arc<Catalog>,
    state: LocalState,
    results: Arc<dyn ResultRepository>,
    notifier: Arc<dyn Notifier>,
}

impl QuizService {
    #[must_use]
    pub fn new(
        clock: Clock,
        config: QuizConfig,
        catalog: Arc<Catalog>,
        storage: &Storage,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            clock,
            config,
            catalog,
            state: LocalState::new(Arc::clone(&storage.local)),
            results: Arc::clone(&storage.results),
            notifier,
        }
    }

    #[must_use]
    pub fn config(&self) -> &QuizConfig {
        &self.config
    }

    #[must_use]
    pub fn local_state(&self) -> &LocalState {
        &self.state
    }

    /// Resume the attempt stored on this device, or start a new one.
    ///
    /// A stored selection is reused only if every id is still in the catalog.
    /// A run that was finalized before a reload comes back finalized, and one
    /// whose deadline passed while it was closed is finalized as a timeout.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if the catalog has no questions, or
    /// `SessionError::Storage` if local state cannot be read or written.
    pub async fn start<R: Rng + ?Sized>(
        &self,
        identity: Option<Identity>,
        rng: &mut R,
    ) -> Result<Arc<QuizSession>, SessionError> {
        let now = self.clock.now();
        let migration = migrate_legacy(&self.state, now).await?;
        debug!(?migration, "local state ready");

        let selection = match self.state.load_selection().await? {
            Some(selection) if selection.ensure_in(&self.catalog).is_ok() => selection,
            stored => {
                if stored.is_some() {
                    debug!("stored selection no longer matches the catalog; drawing again");
                }
                self.draw(rng).await?
            }
        };

        let run = RunIdentityManager::new(self.state.clone(), self.clock)
            .resolve_run(&selection)
            .await?;
        let ledger = AnswerLedger::load(self.state.clone(), run.id(), selection.len()).await?;

        let delivery = DeliveryPipeline::new(
            Arc::clone(&self.results),
            Arc::clone(&self.notifier),
            self.state.clone(),
            identity,
            self.config.quiz_name(),
        );
        let finalizer = match self.state.load_finalized(run.id()).await? {
            Some(result) => {
                let report = result.report(&self.catalog);
                debug!(run_id = %run.id(), "run was already finalized");
                Finalizer::restored(delivery, result, report).await
            }
            None => Finalizer::new(delivery),
        };

        let session = Arc::new(QuizSession {
            clock: self.clock,
            config: self.config.clone(),
            catalog: Arc::clone(&self.catalog),
            state: self.state.clone(),
            guard: NavigationGuard::new(selection.len()),
            run,
            selection,
            ledger: Mutex::new(ledger),
            finalizer,
        });

        // The deadline passed while no timer was running.
        if !session.is_finalized() && session.deadline_passed() {
            info!(run_id = %session.run().id(), "run reopened after its deadline");
            session.finalize(FinalizeReason::Timeout).await;
        }
        Ok(session)
    }

    /// Clear every key of the current attempt and start a fresh one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if local state cannot be cleared or the new
    /// attempt cannot start.
    pub async fn retake<R: Rng + ?Sized>(
        &self,
        identity: Option<Identity>,
        rng: &mut R,
    ) -> Result<Arc<QuizSession>, SessionError> {
        self.state.clear_attempt().await?;
        info!("attempt cleared for retake");
        self.start(identity, rng).await
    }

    async fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Selection, SessionError> {
        if self.catalog.is_empty() {
            return Err(SessionError::Empty);
        }
        let selection = select_questions(&self.catalog, self.config.question_count(), rng);
        self.state.save_selection(&selection).await?;
        debug!(count = selection.len(), "drew a new selection");
        Ok(selection)
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One live attempt: its fixed selection, run, ledger and finalizer.
pub struct QuizSession {
    clock: Clock,
    config: QuizConfig,
    catalog: Arc<Catalog>,
    state: LocalState,
    guard: NavigationGuard,
    run: Run,
    selection: Selection,
    ledger: Mutex<AnswerLedger>,
    finalizer: Finalizer,
}

impl QuizSession {
    #[must_use]
    pub fn run(&self) -> &Run {
        &self.run
    }

    #[must_use]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    #[must_use]
    pub fn config(&self) -> &QuizConfig {
        &self.config
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.selection.len()
    }

    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.finalizer.is_finalized()
    }

    /// Position a request for `requested` actually lands on.
    pub async fn enter(&self, requested: Position) -> Position {
        let ledger = self.ledger.lock().await;
        let landed = self.guard.resolve(requested, ledger.answers());
        if landed != requested {
            debug!(%requested, %landed, "navigation redirected");
        }
        landed
    }

    /// Where a resumed attempt should open: the first unanswered position,
    /// or the last one when all are answered.
    pub async fn resume_position(&self) -> Position {
        let last = Position::from_index(self.total().saturating_sub(1)).unwrap_or(Position::FIRST);
        self.enter(last).await
    }

    /// # Errors
    ///
    /// Returns `SessionError::Position` if `position` is past the end, or
    /// `SessionError::UnknownQuestion` if the id is missing from the catalog.
    pub fn question(&self, position: Position) -> Result<&Question, SessionError> {
        let out_of_range = PositionError::OutOfRange {
            position: position.get(),
            total: self.total(),
        };
        let id = self.selection.at(position).ok_or(out_of_range)?;
        self.catalog
            .get(id)
            .ok_or_else(|| SessionError::UnknownQuestion(id.clone()))
    }

    /// Recorded answer at `position`, `""` when unanswered.
    pub async fn answer_at(&self, position: Position) -> String {
        self.ledger.lock().await.get(position).to_owned()
    }

    /// Record `option` as the answer at `position`.
    ///
    /// An answer arriving after the run's deadline finalizes the attempt
    /// with `FinalizeReason::Timeout` instead of being recorded.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Finalized` after finalization or the deadline,
    /// `SessionError::Unreachable` past the first unanswered position,
    /// `SessionError::NotAnOption` if `option` is not one of the question's
    /// options, or `SessionError::Storage` if the write fails.
    pub async fn answer(&self, position: Position, option: &str) -> Result<(), SessionError> {
        let question = self.question(position)?;
        if !question.has_option(option) {
            return Err(SessionError::NotAnOption {
                position: position.get(),
                answer: option.to_owned(),
            });
        }

        if self.deadline_passed() {
            self.finalize(FinalizeReason::Timeout).await;
            return Err(SessionError::Finalized);
        }

        let mut ledger = self.ledger.lock().await;
        // Checked under the ledger lock: finalize snapshots under the same lock.
        if self.finalizer.is_finalized() {
            return Err(SessionError::Finalized);
        }
        if !self.guard.can_enter(position, ledger.answers()) {
            return Err(SessionError::Unreachable {
                position: position.get(),
            });
        }
        ledger.set(position, option).await
    }

    /// Whether "Next" or "Submit" is enabled on `current`.
    pub async fn can_advance(&self, current: Position) -> bool {
        let ledger = self.ledger.lock().await;
        self.guard.can_advance(current, ledger.answers())
    }

    /// Manual submit. Past the deadline it counts as a timeout.
    pub async fn submit(&self) -> FinalizeOutcome {
        let reason = if self.deadline_passed() {
            FinalizeReason::Timeout
        } else {
            FinalizeReason::Manual
        };
        self.finalize(reason).await
    }

    /// Finalize for `reason`. Safe to call from any trigger, any number of times.
    pub async fn finalize(&self, reason: FinalizeReason) -> FinalizeOutcome {
        let input = FinalizeInput {
            run: &self.run,
            selection: &self.selection,
            catalog: &self.catalog,
            state: &self.state,
        };
        self.finalizer
            .finalize(reason, input, &self.ledger, self.clock.now())
            .await
    }

    /// Frozen result and score, once finalized.
    #[must_use]
    pub fn result(&self) -> Option<(FinalizedResult, ScoreReport)> {
        self.finalizer.result().cloned()
    }

    /// Live view of background save and notification.
    #[must_use]
    pub fn deliveries(&self) -> DeliveryWatch {
        self.finalizer.deliveries()
    }

    /// Remaining time, derived from the run's start so it never resets.
    #[must_use]
    pub fn remaining(&self) -> Countdown {
        Countdown::resume(self.config.time_limit(), self.run.started_at(), self.clock.now())
    }

    /// True once the run's time budget is spent, whether or not a timer
    /// noticed.
    #[must_use]
    pub fn deadline_passed(&self) -> bool {
        let left = self.remaining();
        left.is_due() || left.is_expired()
    }

    /// Start the run's countdown. Expiry finalizes with `FinalizeReason::Timeout`.
    #[must_use]
    pub fn spawn_timer(self: &Arc<Self>) -> TimerHandle {
        timer::spawn(Arc::clone(self))
    }

    pub async fn progress(&self) -> AttemptProgress {
        let ledger = self.ledger.lock().await;
        let answered = Position::range(self.total())
            .filter(|p| ledger.answers().is_answered(*p))
            .count();
        AttemptProgress::new(self.total(), answered, self.is_finalized())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use quiz_core::model::QuestionDraft;
    use quiz_core::time::fixed_clock;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use storage::repository::InMemoryRepository;

    use crate::error::NotifyError;
    use crate::notify_service::NotificationRequest;

    struct Silent;

    #[async_trait]
    impl Notifier for Silent {
        fn enabled(&self) -> bool {
            false
        }

        fn app_base_url(&self) -> &str {
            "https://quiz.test"
        }

        async fn notify(&self, _request: &NotificationRequest) -> Result<(), NotifyError> {
            Err(NotifyError::Disabled)
        }
    }

    fn catalog(n: usize) -> Arc<Catalog> {
        let drafts = (1..=n)
            .map(|i| QuestionDraft {
                id: format!("Q{i}"),
                prompt: format!("prompt {i}"),
                options: vec!["A".into(), "B".into()],
                answer: "A".into(),
                image: None,
            })
            .collect();
        Arc::new(Catalog::from_drafts(drafts).unwrap())
    }

    fn service(repo: &InMemoryRepository, n: usize, count: usize) -> QuizService {
        let storage = Storage::in_memory(repo);
        let config =
            QuizConfig::new(count, std::time::Duration::from_secs(60), "Test quiz", 70).unwrap();
        QuizService::new(fixed_clock(), config, catalog(n), &storage, Arc::new(Silent))
    }

    fn pos(v: u32) -> Position {
        Position::new(v).unwrap()
    }

    #[tokio::test]
    async fn start_draws_and_resume_keeps_selection() {
        let repo = InMemoryRepository::new();
        let svc = service(&repo, 10, 4);
        let mut rng = StdRng::seed_from_u64(7);

        let first = svc.start(None, &mut rng).await.unwrap();
        assert_eq!(first.total(), 4);
        first.answer(pos(1), "B").await.unwrap();

        let resumed = svc.start(None, &mut rng).await.unwrap();
        assert_eq!(resumed.selection(), first.selection());
        assert_eq!(resumed.run().id(), first.run().id());
        assert_eq!(resumed.answer_at(pos(1)).await, "B");
        assert_eq!(resumed.resume_position().await, pos(2));
    }

    #[tokio::test]
    async fn empty_catalog_cannot_start() {
        let repo = InMemoryRepository::new();
        let svc = service(&repo, 0, 4);
        let err = svc
            .start(None, &mut StdRng::seed_from_u64(1))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, SessionError::Empty));
    }

    #[tokio::test]
    async fn answers_are_gated_by_reach_and_options() {
        let repo = InMemoryRepository::new();
        let session = service(&repo, 5, 3)
            .start(None, &mut StdRng::seed_from_u64(3))
            .await
            .unwrap();

        assert!(matches!(
            session.answer(pos(2), "A").await,
            Err(SessionError::Unreachable { position: 2 })
        ));
        assert!(matches!(
            session.answer(pos(1), "Z").await,
            Err(SessionError::NotAnOption { .. })
        ));
        assert!(!session.can_advance(pos(1)).await);
        session.answer(pos(1), "A").await.unwrap();
        assert!(session.can_advance(pos(1)).await);
        assert_eq!(session.enter(pos(3)).await, pos(2));
    }

    #[tokio::test]
    async fn answers_are_rejected_after_submit() {
        let repo = InMemoryRepository::new();
        let session = service(&repo, 2, 2)
            .start(None, &mut StdRng::seed_from_u64(3))
            .await
            .unwrap();
        session.answer(pos(1), "A").await.unwrap();

        let FinalizeOutcome::Finalized { result, report } = session.submit().await else {
            panic!("first submit should finalize");
        };
        assert_eq!(result.total(), 2);
        assert_eq!(report.correct, 1);
        assert_eq!(report.percentage, 50);
        assert!(matches!(
            session.answer(pos(2), "A").await,
            Err(SessionError::Finalized)
        ));
        assert_eq!(session.submit().await, FinalizeOutcome::AlreadyFinalized);
    }

    #[tokio::test]
    async fn reload_after_finalize_stays_finalized() {
        let repo = InMemoryRepository::new();
        let svc = service(&repo, 3, 3);
        let session = svc.start(None, &mut StdRng::seed_from_u64(5)).await.unwrap();
        session.answer(pos(1), "A").await.unwrap();
        let FinalizeOutcome::Finalized { result, .. } = session.submit().await else {
            panic!("submit should finalize");
        };

        let reloaded = svc.start(None, &mut StdRng::seed_from_u64(5)).await.unwrap();
        assert!(reloaded.is_finalized());
        assert_eq!(reloaded.result().map(|(r, _)| r), Some(result));
        assert_eq!(
            reloaded.finalize(FinalizeReason::Timeout).await,
            FinalizeOutcome::AlreadyFinalized
        );
    }

    #[tokio::test]
    async fn progress_counts_answered_positions() {
        let repo = InMemoryRepository::new();
        let session = service(&repo, 4, 3)
            .start(None, &mut StdRng::seed_from_u64(9))
            .await
            .unwrap();
        session.answer(pos(1), "A").await.unwrap();
        let progress = session.progress().await;
        assert_eq!(progress.total, 3);
        assert_eq!(progress.answered, 1);
        assert_eq!(progress.remaining, 2);
        assert!(!progress.is_complete);
        assert!(!progress.is_finalized);
    }
}
