//! Shareable review links (`<base>/results?result_id=<id>&shared=1`).

use thiserror::Error;
use url::Url;

use crate::model::ResultId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LinkError {
    #[error("invalid base url: {0}")]
    InvalidBase(String),

    #[error("link has no result_id")]
    MissingResultId,

    #[error("link has a malformed result_id")]
    MalformedResultId,
}

/// Reference to a stored result, optionally marked as a shared read-only view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewLink {
    pub result_id: ResultId,
    pub shared: bool,
}

impl ReviewLink {
    #[must_use]
    pub fn shared(result_id: ResultId) -> Self {
        Self {
            result_id,
            shared: true,
        }
    }

    /// Render against the application's base URL.
    ///
    /// # Errors
    ///
    /// Returns `LinkError::InvalidBase` if `base` is not an absolute URL.
    pub fn to_url(&self, base: &str) -> Result<Url, LinkError> {
        let mut url = Url::parse(base).map_err(|e| LinkError::InvalidBase(e.to_string()))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| LinkError::InvalidBase(base.to_owned()))?;
            segments.pop_if_empty().push("results");
        }
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("result_id", &self.result_id.to_string());
            if self.shared {
                query.append_pair("shared", "1");
            }
        }
        Ok(url)
    }

    /// Parse a full URL, a bare query string, or a bare result id.
    ///
    /// # Errors
    ///
    /// Returns `LinkError::MissingResultId` or `LinkError::MalformedResultId`.
    pub fn parse(input: &str) -> Result<Self, LinkError> {
        let input = input.trim();
        if let Ok(result_id) = input.parse::<ResultId>() {
            return Ok(Self {
                result_id,
                shared: false,
            });
        }

        let query = match Url::parse(input) {
            Ok(url) => url.query().unwrap_or_default().to_owned(),
            Err(_) => input.trim_start_matches('?').to_owned(),
        };

        let mut result_id = None;
        let mut shared = false;
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "result_id" => result_id = Some(value.into_owned()),
                "shared" => shared = value == "1",
                _ => {}
            }
        }

        let raw = result_id
            .filter(|v| !v.trim().is_empty())
            .ok_or(LinkError::MissingResultId)?;
        let result_id = raw
            .parse::<ResultId>()
            .map_err(|_| LinkError::MalformedResultId)?;
        Ok(Self { result_id, shared })
    }
}
