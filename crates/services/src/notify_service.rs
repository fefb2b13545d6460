use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use quiz_core::model::ResultId;
use quiz_core::ReviewLink;

use crate::config::NotifierConfig;
use crate::error::NotifyError;

/// Body sent to the notification collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationRequest {
    pub to: String,
    pub score: u32,
    pub total: u32,
    pub percentage: u8,
    #[serde(rename = "resultId")]
    pub result_id: ResultId,
    #[serde(rename = "reviewUrl")]
    pub review_url: String,
    pub quiz_name: String,
}

/// Best-effort delivery of a finalized result to its participant.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// False when no endpoint is configured; callers skip sending.
    fn enabled(&self) -> bool;

    /// Base URL used to build review links.
    fn app_base_url(&self) -> &str;

    /// Send one notification.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError` when disabled, the request is invalid, or the
    /// endpoint rejects it.
    async fn notify(&self, request: &NotificationRequest) -> Result<(), NotifyError>;
}

#[derive(Clone)]
pub struct HttpNotifier {
    client: Client,
    config: NotifierConfig,
}

impl HttpNotifier {
    #[must_use]
    pub fn new(config: NotifierConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

/// Assemble a `NotificationRequest` against `app_base_url`.
///
/// # Errors
///
/// Returns `NotifyError::MissingRecipient` or `NotifyError::Link`.
pub fn build_request(
    app_base_url: &str,
    to: &str,
    result_id: ResultId,
    score: u32,
    total: u32,
    percentage: u8,
    quiz_name: &str,
) -> Result<NotificationRequest, NotifyError> {
    let to = to.trim();
    if to.is_empty() {
        return Err(NotifyError::MissingRecipient);
    }
    let review_url = ReviewLink::shared(result_id).to_url(app_base_url)?;
    Ok(NotificationRequest {
        to: to.to_owned(),
        score,
        total,
        percentage,
        result_id,
        review_url: review_url.into(),
        quiz_name: quiz_name.to_owned(),
    })
}

#[async_trait]
impl Notifier for HttpNotifier {
    fn enabled(&self) -> bool {
        self.config.enabled()
    }

    fn app_base_url(&self) -> &str {
        &self.config.app_base_url
    }

    async fn notify(&self, request: &NotificationRequest) -> Result<(), NotifyError> {
        let endpoint = self
            .config
            .endpoint
            .as_deref()
            .ok_or(NotifyError::Disabled)?;
        if request.to.trim().is_empty() {
            return Err(NotifyError::MissingRecipient);
        }

        let mut builder = self.client.post(endpoint).json(request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await?;

        if !response.status().is_success() {
            return Err(NotifyError::HttpStatus(response.status()));
        }
        Ok(())
    }
}
