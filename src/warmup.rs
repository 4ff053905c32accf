//! Startup prefetch
//!
//! The first request to a cold endpoint pays for TLS setup and whatever the
//! serverless side needs to spin up. Firing one throwaway call at startup
//! hides that from the first real keystroke.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::WarmupConfig;
use crate::translation::TranslationClient;

/// Issue one fire-and-forget translation call; the outcome is discarded
pub fn spawn_warmup(client: Arc<TranslationClient>, config: WarmupConfig) {
    if !config.enabled {
        return;
    }

    tokio::spawn(async move {
        let token = CancellationToken::new();
        let _ = client
            .translate_to(&config.sample_text, &config.target_lang, &token)
            .await;
    });
}
