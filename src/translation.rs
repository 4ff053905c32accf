//! Client for a DeepLX-compatible translation endpoint
//!
//! One request per call, no retries. Supersession of stale requests is the
//! scheduler's job; this client only supports cooperative cancellation via
//! `tokio_util::sync::CancellationToken`.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::config::TranslationConfig;

/// JSON body sent to the translation endpoint
#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    text: &'a str,
    target_lang: &'a str,
}

/// Response body returned by a DeepLX-compatible endpoint
///
/// Only `data` matters here; the rest is kept so a full response
/// deserializes without surprises.
#[derive(Debug, Deserialize)]
pub struct TranslateResponse {
    #[serde(default)]
    pub code: i64,
    pub data: String,
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub source_lang: String,
    #[serde(default)]
    pub target_lang: String,
    #[serde(default)]
    pub alternatives: Vec<String>,
}

/// Failure classification for a translation attempt
#[derive(Debug, Clone, PartialEq)]
pub enum TranslateError {
    /// Network or HTTP-level failure (connect error, timeout, non-2xx status)
    Transport(String),
    /// Anything that is not a recognizable transport failure, such as an
    /// unparseable response body
    Unclassified(String),
}

impl fmt::Display for TranslateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslateError::Transport(msg) => write!(f, "Translation failed: {}", msg),
            TranslateError::Unclassified(msg) => write!(f, "Unexpected error: {}", msg),
        }
    }
}

impl std::error::Error for TranslateError {}

/// Outcome of a single translation attempt
#[derive(Debug, Clone, PartialEq)]
pub enum TranslateOutcome {
    /// The endpoint answered with a translation
    Translated(String),
    /// The call was cancelled before a response arrived (not an error)
    Cancelled,
    /// The call completed but produced no usable translation
    Failed(TranslateError),
}

impl TranslateOutcome {
    /// Text to show the user for this outcome, if any
    ///
    /// Cancelled outcomes produce nothing; the display layer must not touch
    /// the output for them.
    pub fn display_text(&self) -> Option<String> {
        match self {
            TranslateOutcome::Translated(text) => Some(text.clone()),
            TranslateOutcome::Cancelled => None,
            TranslateOutcome::Failed(e) => Some(e.to_string()),
        }
    }
}

/// Seam between the debounce scheduler and the HTTP client, so the
/// scheduler can be exercised against a scripted backend
#[async_trait]
pub trait TranslateApi: Send + Sync {
    /// Translate `text` to the configured target language, abandoning the
    /// call without side effects if `cancel` fires first
    async fn translate(&self, text: &str, cancel: &CancellationToken) -> TranslateOutcome;
}

/// HTTP client for the translation endpoint
pub struct TranslationClient {
    client: reqwest::Client,
    endpoint: String,
    target_lang: String,
}

impl TranslationClient {
    pub fn new(config: &TranslationConfig) -> Result<Self, anyhow::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            target_lang: config.target_lang.clone(),
        })
    }

    /// Translate to an explicit target language (used by the warmup request,
    /// which goes in the opposite direction)
    pub async fn translate_to(
        &self,
        text: &str,
        target_lang: &str,
        cancel: &CancellationToken,
    ) -> TranslateOutcome {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => TranslateOutcome::Cancelled,
            outcome = self.request(text, target_lang) => outcome,
        }
    }

    /// One POST, one classification. Success means a 2xx transport status
    /// and a parseable body; the response-embedded `code` field is ignored.
    async fn request(&self, text: &str, target_lang: &str) -> TranslateOutcome {
        let body = TranslateRequest { text, target_lang };

        let response = match self.client.post(&self.endpoint).json(&body).send().await {
            Ok(response) => response,
            Err(e) => {
                return TranslateOutcome::Failed(TranslateError::Transport(e.to_string()));
            }
        };

        if !response.status().is_success() {
            return TranslateOutcome::Failed(TranslateError::Transport(format!(
                "endpoint returned HTTP {}",
                response.status()
            )));
        }

        match response.json::<TranslateResponse>().await {
            Ok(parsed) => TranslateOutcome::Translated(parsed.data),
            Err(e) => TranslateOutcome::Failed(TranslateError::Unclassified(e.to_string())),
        }
    }
}

#[async_trait]
impl TranslateApi for TranslationClient {
    async fn translate(&self, text: &str, cancel: &CancellationToken) -> TranslateOutcome {
        self.translate_to(text, &self.target_lang, cancel).await
    }
}
