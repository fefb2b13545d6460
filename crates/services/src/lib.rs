#![forbid(unsafe_code)]

pub mod access;
pub mod app_services;
pub mod config;
pub mod error;
pub mod notify_service;
pub mod review_service;
pub mod sessions;

pub use quiz_core::Clock;

pub use access::{Identity, ResultsAccess, resolve_access};
pub use app_services::AppServices;
pub use config::{NotifierConfig, QuizConfig};
pub use error::{AppServicesError, ConfigError, NotifyError, SessionError};
pub use notify_service::{HttpNotifier, NotificationRequest, Notifier};
pub use review_service::{ReviewService, ReviewState, SharedReview};

pub use sessions::{
    AttemptProgress, DeliveryStatus, DeliveryWatch, FinalizeOutcome, QuizService, QuizSession,
    TimerHandle,
};
