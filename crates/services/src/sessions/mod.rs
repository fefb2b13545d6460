mod delivery;
mod finalizer;
mod ledger;
mod progress;
mod run_identity;
mod service;
mod timer;

// Public API of the attempt subsystem.
pub use crate::error::SessionError;
pub use delivery::{DeliveryPipeline, DeliveryStatus, DeliveryWatch};
pub use finalizer::{FinalizeInput, FinalizeLatch, FinalizeOutcome, Finalizer};
pub use ledger::AnswerLedger;
pub use progress::AttemptProgress;
pub use run_identity::RunIdentityManager;
pub use service::{QuizService, QuizSession};
pub use timer::TimerHandle;
