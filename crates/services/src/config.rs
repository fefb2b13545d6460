use std::env;
use std::time::Duration;

use quiz_core::{DEFAULT_PASS_THRESHOLD, DEFAULT_QUESTION_COUNT, DEFAULT_TIME_LIMIT};

use crate::error::ConfigError;

/// Quiz name used in stored records and notifications.
pub const DEFAULT_QUIZ_NAME: &str = "User's knowledge";

/// Base used to build review links when none is configured.
pub const DEFAULT_APP_BASE_URL: &str = "https://example.com";

/// Shape of one quiz: how many questions, how long, and how it is graded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuizConfig {
    question_count: usize,
    time_limit: Duration,
    quiz_name: String,
    pass_threshold: u8,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            question_count: DEFAULT_QUESTION_COUNT,
            time_limit: DEFAULT_TIME_LIMIT,
            quiz_name: DEFAULT_QUIZ_NAME.to_owned(),
            pass_threshold: DEFAULT_PASS_THRESHOLD,
        }
    }
}

impl QuizConfig {
    /// # Errors
    ///
    /// Returns `ConfigError` when the count or time limit is zero, or the
    /// threshold is above 100.
    pub fn new(
        question_count: usize,
        time_limit: Duration,
        quiz_name: impl Into<String>,
        pass_threshold: u8,
    ) -> Result<Self, ConfigError> {
        if question_count == 0 {
            return Err(ConfigError::ZeroQuestions);
        }
        if time_limit.as_secs() == 0 {
            return Err(ConfigError::ZeroTimeLimit);
        }
        if pass_threshold > 100 {
            return Err(ConfigError::ThresholdOutOfRange(pass_threshold));
        }
        Ok(Self {
            question_count,
            time_limit,
            quiz_name: quiz_name.into(),
            pass_threshold,
        })
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.question_count
    }

    #[must_use]
    pub fn time_limit(&self) -> Duration {
        self.time_limit
    }

    #[must_use]
    pub fn quiz_name(&self) -> &str {
        &self.quiz_name
    }

    #[must_use]
    pub fn pass_threshold(&self) -> u8 {
        self.pass_threshold
    }
}

/// Endpoint and link settings for result notifications.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotifierConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub app_base_url: String,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            app_base_url: DEFAULT_APP_BASE_URL.to_owned(),
        }
    }
}

impl NotifierConfig {
    /// Read `QUIZ_NOTIFY_URL`, `QUIZ_NOTIFY_API_KEY` and `QUIZ_APP_BASE_URL`.
    ///
    /// Blank values count as unset.
    #[must_use]
    pub fn from_env() -> Self {
        let var = |name: &str| env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            endpoint: var("QUIZ_NOTIFY_URL"),
            api_key: var("QUIZ_NOTIFY_API_KEY"),
            app_base_url: var("QUIZ_APP_BASE_URL")
                .unwrap_or_else(|| DEFAULT_APP_BASE_URL.to_owned()),
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.endpoint.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_standard_quiz() {
        let config = QuizConfig::default();
        assert_eq!(config.question_count(), 25);
        assert_eq!(config.time_limit(), Duration::from_secs(1800));
        assert_eq!(config.quiz_name(), "User's knowledge");
        assert_eq!(config.pass_threshold(), 70);
    }

    #[test]
    fn rejects_degenerate_values() {
        let limit = Duration::from_secs(60);
        assert_eq!(
            QuizConfig::new(0, limit, "q", 70),
            Err(ConfigError::ZeroQuestions)
        );
        assert_eq!(
            QuizConfig::new(5, Duration::from_millis(500), "q", 70),
            Err(ConfigError::ZeroTimeLimit)
        );
        assert_eq!(
            QuizConfig::new(5, limit, "q", 101),
            Err(ConfigError::ThresholdOutOfRange(101))
        );
    }

    #[test]
    fn notifier_disabled_without_endpoint() {
        let config = NotifierConfig::default();
        assert!(!config.enabled());
        assert_eq!(config.app_base_url, DEFAULT_APP_BASE_URL);
    }
}
