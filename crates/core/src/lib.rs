#![forbid(unsafe_code)]

pub mod countdown;
pub mod error;
pub mod link;
pub mod model;
pub mod navigation;
pub mod scoring;
pub mod selector;
pub mod time;

pub use countdown::{Countdown, DEFAULT_TIME_LIMIT, TickOutcome};
pub use error::Error;
pub use link::{LinkError, ReviewLink};
pub use navigation::NavigationGuard;
pub use scoring::{DEFAULT_PASS_THRESHOLD, ItemOutcome, ScoreReport, score};
pub use selector::{DEFAULT_QUESTION_COUNT, select_questions};
pub use time::Clock;
