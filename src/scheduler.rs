//! Debounced translation scheduling
//!
//! Consumes raw input snapshots, waits for a quiet period, then issues at
//! most one translation call at a time. New input supersedes both an armed
//! timer and an in-flight request. The whole state machine
//! (Idle -> Armed -> InFlight -> Idle) lives in a single task, so input
//! handling never interleaves mid-update.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::translation::{TranslateApi, TranslateOutcome};

/// Handle for the single in-flight translation call
///
/// Issuing a new request cancels and discards the previous one first, so at
/// most one of these exists at any time.
struct PendingRequest {
    token: CancellationToken,
    text: String,
}

/// Handles debouncing of input snapshots and lifecycle of translation calls
pub struct TranslateScheduler {
    client: Arc<dyn TranslateApi>,
    running: Arc<AtomicBool>,
    quiet_period: Duration,
    last_input: Arc<RwLock<String>>,
    last_output: Arc<RwLock<String>>,
    output_tx: broadcast::Sender<String>,
}

impl TranslateScheduler {
    pub fn new(
        client: Arc<dyn TranslateApi>,
        running: Arc<AtomicBool>,
        quiet_period: Duration,
        last_input: Arc<RwLock<String>>,
        last_output: Arc<RwLock<String>>,
        output_tx: broadcast::Sender<String>,
    ) -> Self {
        Self {
            client,
            running,
            quiet_period,
            last_input,
            last_output,
            output_tx,
        }
    }

    /// Starts the scheduling task
    ///
    /// The task ends when the input channel closes or `running` goes false.
    pub fn start(&self, mut input_rx: mpsc::Receiver<String>) -> tokio::task::JoinHandle<()> {
        let client = self.client.clone();
        let running = self.running.clone();
        let quiet_period = self.quiet_period;
        let last_input = self.last_input.clone();
        let last_output = self.last_output.clone();
        let output_tx = self.output_tx.clone();

        tokio::spawn(async move {
            // Armed timer: deadline plus the text captured for it
            let mut armed: Option<(Instant, String)> = None;
            let mut pending: Option<PendingRequest> = None;

            // Completed calls come back over a channel so the select below
            // stays free of self-borrowing futures
            let (done_tx, mut done_rx) = mpsc::channel::<(String, TranslateOutcome)>(4);

            loop {
                let deadline = armed.as_ref().map(|(deadline, _)| *deadline);

                tokio::select! {
                    event = input_rx.recv() => {
                        match event {
                            Some(text) => {
                                *last_input.write() = text.clone();

                                if text.trim().is_empty() {
                                    // Empty input: no request, clear everything
                                    armed = None;
                                    if let Some(request) = pending.take() {
                                        request.token.cancel();
                                    }
                                    last_output.write().clear();
                                    let _ = output_tx.send(String::new());
                                } else {
                                    // New input supersedes both the armed
                                    // timer and any request in flight
                                    if let Some(request) = pending.take() {
                                        request.token.cancel();
                                    }
                                    armed = Some((Instant::now() + quiet_period, text));
                                }
                            }
                            None => break,
                        }
                    }

                    _ = async { tokio::time::sleep_until(deadline.unwrap()).await }, if deadline.is_some() => {
                        if let Some((_, text)) = armed.take() {
                            let token = CancellationToken::new();
                            pending = Some(PendingRequest {
                                token: token.clone(),
                                text: text.clone(),
                            });

                            let client = client.clone();
                            let done_tx = done_tx.clone();
                            tokio::spawn(async move {
                                let outcome = client.translate(&text, &token).await;
                                let _ = done_tx.send((text, outcome)).await;
                            });
                        }
                    }

                    completed = done_rx.recv() => {
                        if let Some((text, outcome)) = completed {
                            // Accept the result only if this is still the
                            // current request; a superseded or cancelled
                            // call must never touch the output
                            let is_current = pending
                                .as_ref()
                                .map(|request| request.text == text)
                                .unwrap_or(false);

                            if is_current {
                                pending = None;
                                if let Some(display) = outcome.display_text() {
                                    *last_output.write() = display.clone();
                                    let _ = output_tx.send(display);
                                }
                            }
                        }
                    }

                    _ = tokio::time::sleep(Duration::from_millis(100)) => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                    }
                }
            }

            if let Some(request) = pending.take() {
                request.token.cancel();
            }
        })
    }
}
