use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::TtsConfig;

/// Decoded audio ready for playback (mono f32 samples)
#[derive(Debug, Clone)]
pub struct Utterance {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Utterance {
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f32(self.samples.len() as f32 / self.sample_rate.max(1) as f32)
    }
}

enum PlayerCommand {
    Play(Utterance, f32),
    Stop,
}

/// Audio output abstraction so the speech client can be tested without a
/// sound device
pub trait Playback: Send + Sync {
    /// Start playing `utterance`, stopping whatever was playing before
    fn play(&self, utterance: Utterance);
    /// Stop and release the current utterance, if any
    fn stop(&self);
}

/// Plays one utterance at a time on the default output device
pub struct AudioPlayer {
    command_tx: mpsc::Sender<PlayerCommand>,
    enabled: Arc<AtomicBool>,
    volume: Arc<Mutex<f32>>,
}

impl AudioPlayer {
    pub fn new(config: &TtsConfig) -> Arc<Self> {
        let (command_tx, command_rx) = mpsc::channel::<PlayerCommand>();
        let enabled = Arc::new(AtomicBool::new(config.enabled));
        let volume = Arc::new(Mutex::new(config.volume));

        // Use a dedicated blocking thread for playback (CPAL streams are not Send)
        std::thread::spawn(move || {
            let host = cpal::default_host();

            let device = match host.default_output_device() {
                Some(d) => d,
                None => {
                    eprintln!("No audio output device available for speech playback");
                    return;
                }
            };

            // The active stream plays until it is dropped, the deadline
            // passes, or a new command replaces it
            let mut active: Option<(cpal::Stream, Instant)> = None;

            loop {
                let timeout = match &active {
                    Some((_, done_at)) => done_at.saturating_duration_since(Instant::now()),
                    None => Duration::from_millis(500),
                };

                match command_rx.recv_timeout(timeout) {
                    Ok(PlayerCommand::Play(utterance, volume)) => {
                        // Dropping the old stream stops it before the new
                        // utterance starts
                        active = None;
                        match Self::start_stream(&device, utterance, volume) {
                            Ok(playing) => active = Some(playing),
                            Err(e) => eprintln!("Failed to start playback: {}", e),
                        }
                    }
                    Ok(PlayerCommand::Stop) => {
                        active = None;
                    }
                    Err(mpsc::RecvTimeoutError::Timeout) => {
                        if let Some((_, done_at)) = &active {
                            if Instant::now() >= *done_at {
                                active = None;
                            }
                        }
                    }
                    Err(mpsc::RecvTimeoutError::Disconnected) => break,
                }
            }
        });

        Arc::new(Self {
            command_tx,
            enabled,
            volume,
        })
    }

    fn start_stream(
        device: &cpal::Device,
        utterance: Utterance,
        volume: f32,
    ) -> anyhow::Result<(cpal::Stream, Instant)> {
        let config = device.default_output_config()?;
        let channels = config.channels().max(1) as usize;
        let output_rate = config.sample_rate().0;

        let duration = utterance.duration();
        let samples = Arc::new(utterance.samples);

        // Nearest-sample rate mapping; good enough for synthesized speech
        let step = utterance.sample_rate as f32 / output_rate.max(1) as f32;
        let mut cursor = 0f32;

        let stream = device.build_output_stream(
            &config.into(),
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                for frame in data.chunks_mut(channels) {
                    let idx = cursor as usize;
                    let value = if idx < samples.len() {
                        samples[idx] * volume
                    } else {
                        0.0
                    };
                    for sample in frame.iter_mut() {
                        *sample = value;
                    }
                    cursor += step;
                }
            },
            |err| eprintln!("Audio stream error: {}", err),
            None,
        )?;

        stream.play()?;

        Ok((stream, Instant::now() + duration + Duration::from_millis(100)))
    }
}

impl Playback for AudioPlayer {
    fn play(&self, utterance: Utterance) {
        if !self.enabled.load(Ordering::Relaxed) {
            return;
        }

        let volume = *self.volume.lock();
        let _ = self.command_tx.send(PlayerCommand::Play(utterance, volume));
    }

    fn stop(&self) {
        let _ = self.command_tx.send(PlayerCommand::Stop);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utterance_duration() {
        let utterance = Utterance {
            samples: vec![0.0; 16000],
            sample_rate: 16000,
        };
        assert_eq!(utterance.duration(), Duration::from_secs(1));
    }

    #[test]
    fn test_zero_sample_rate_does_not_divide_by_zero() {
        let utterance = Utterance {
            samples: vec![0.0; 100],
            sample_rate: 0,
        };
        assert_eq!(utterance.duration(), Duration::from_secs(100));
    }
}
