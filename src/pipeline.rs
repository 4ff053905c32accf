use anyhow::Context;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::time::Duration;

use crate::config::AppConfig;
use crate::playback::AudioPlayer;
use crate::scheduler::TranslateScheduler;
use crate::speech::SpeechClient;
use crate::translation::{TranslateApi, TranslationClient};

/// Main coordinator wiring input events, the debounce scheduler, and the
/// speech client together
pub struct Translator {
    config: AppConfig,

    // Input events
    input_tx: Option<mpsc::Sender<String>>,
    input_rx: Option<mpsc::Receiver<String>>,

    // Display updates
    output_tx: broadcast::Sender<String>,

    // State control
    running: Arc<AtomicBool>,

    // Last seen input and last accepted translation
    last_input: Arc<RwLock<String>>,
    last_output: Arc<RwLock<String>>,

    // Clients
    translation_client: Arc<TranslationClient>,
    speech_client: Option<Arc<SpeechClient>>,

    // Task handle for graceful shutdown
    scheduler_handle: Option<tokio::task::JoinHandle<()>>,
}

impl Translator {
    /// Creates a new Translator from the application configuration
    ///
    /// The speech client is only constructed when TTS is enabled; the
    /// translation pipeline works without an audio device.
    pub fn new(config: AppConfig) -> Result<Self, anyhow::Error> {
        let (input_tx, input_rx) = mpsc::channel(64);
        let (output_tx, _) = broadcast::channel(100);

        let running = Arc::new(AtomicBool::new(true));
        let last_input = Arc::new(RwLock::new(String::new()));
        let last_output = Arc::new(RwLock::new(String::new()));

        let translation_client = Arc::new(TranslationClient::new(&config.translation)?);

        let speech_client = if config.tts.enabled {
            let player = AudioPlayer::new(&config.tts);
            Some(Arc::new(SpeechClient::new(&config.tts, player)?))
        } else {
            None
        };

        Ok(Self {
            config,
            input_tx: Some(input_tx),
            input_rx: Some(input_rx),
            output_tx,
            running,
            last_input,
            last_output,
            translation_client,
            speech_client,
            scheduler_handle: None,
        })
    }

    /// Spawns the debounce scheduler task
    pub fn start(&mut self) -> Result<(), anyhow::Error> {
        let input_rx = self
            .input_rx
            .take()
            .context("Translator has already been started")?;

        let scheduler = TranslateScheduler::new(
            self.translation_client.clone() as Arc<dyn TranslateApi>,
            self.running.clone(),
            Duration::from_millis(self.config.debounce.quiet_period_ms),
            self.last_input.clone(),
            self.last_output.clone(),
            self.output_tx.clone(),
        );
        self.scheduler_handle = Some(scheduler.start(input_rx));

        Ok(())
    }

    /// Submit a new input snapshot, truncated to the configured maximum
    pub async fn submit_input(&self, text: &str) {
        let text = truncate_chars(text, self.config.translation.max_input_chars);

        if let Some(input_tx) = &self.input_tx {
            if let Err(e) = input_tx.send(text.to_string()).await {
                eprintln!("Failed to submit input: {}", e);
            }
        }
    }

    /// Subscribe to display updates (translations, failure messages, clears)
    pub fn get_output_rx(&self) -> broadcast::Receiver<String> {
        self.output_tx.subscribe()
    }

    pub fn get_running(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    pub fn translation_client(&self) -> Arc<TranslationClient> {
        self.translation_client.clone()
    }

    pub fn last_input(&self) -> String {
        self.last_input.read().clone()
    }

    pub fn last_output(&self) -> String {
        self.last_output.read().clone()
    }

    /// Speak the current input text aloud
    pub async fn speak_input(&self) {
        if let Some(speech) = &self.speech_client {
            speech.speak(&self.last_input()).await;
        }
    }

    /// Speak the last accepted translation aloud
    pub async fn speak_output(&self) {
        if let Some(speech) = &self.speech_client {
            speech.speak(&self.last_output()).await;
        }
    }

    /// Stops the scheduler and waits for it to finish
    pub async fn shutdown(&mut self) -> Result<(), anyhow::Error> {
        self.running.store(false, Ordering::Relaxed);

        // Closing the input channel ends the scheduler task promptly
        self.input_tx = None;

        if let Some(handle) = self.scheduler_handle.take() {
            handle
                .await
                .context("Scheduler task panicked during shutdown")?;
        }

        Ok(())
    }
}

/// Truncate to at most `max` characters, on a char boundary
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
