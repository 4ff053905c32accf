//! Remote speech synthesis with local playback
//!
//! Synthesis failures are logged and swallowed; nothing here ever reaches
//! the translation output or the caller.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::config::TtsConfig;
use crate::playback::{Playback, Utterance};

/// JSON body sent to the synthesis endpoint
#[derive(Debug, Serialize)]
struct TtsRequest<'a> {
    text: &'a str,
    voice: &'a str,
}

/// Fetches synthesized speech and hands it to the audio player
pub struct SpeechClient {
    client: reqwest::Client,
    endpoint: String,
    voice: String,
    player: Arc<dyn Playback>,
}

impl SpeechClient {
    pub fn new(config: &TtsConfig, player: Arc<dyn Playback>) -> Result<Self, anyhow::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            voice: config.voice.clone(),
            player,
        })
    }

    /// Speak `text` aloud, stopping any utterance already playing
    ///
    /// No-op for whitespace-only text. Never fails from the caller's point
    /// of view; synthesis and playback errors end up on stderr only.
    pub async fn speak(&self, text: &str) {
        if text.trim().is_empty() {
            return;
        }

        // Stop the current utterance before synthesis starts, matching the
        // press-again-to-restart behavior
        self.player.stop();

        match self.synthesize(text).await {
            Ok(utterance) => self.player.play(utterance),
            Err(e) => eprintln!("Speech synthesis failed: {}", e),
        }
    }

    async fn synthesize(&self, text: &str) -> anyhow::Result<Utterance> {
        let body = TtsRequest {
            text,
            voice: &self.voice,
        };

        let response = self.client.post(&self.endpoint).json(&body).send().await?;

        if !response.status().is_success() {
            anyhow::bail!("synthesis endpoint returned HTTP {}", response.status());
        }

        let bytes = response.bytes().await?;
        decode_wav(&bytes)
    }
}

/// Decode WAV bytes into mono f32 samples
fn decode_wav(bytes: &[u8]) -> anyhow::Result<Utterance> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    let mono = if channels > 1 {
        samples
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    } else {
        samples
    };

    Ok(Utterance {
        samples: mono,
        sample_rate: spec.sample_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum PlayerEvent {
        Play(usize),
        Stop,
    }

    /// Records commands instead of touching a sound device
    struct RecordingPlayer {
        events: Mutex<Vec<PlayerEvent>>,
    }

    impl RecordingPlayer {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                events: Mutex::new(Vec::new()),
            })
        }

        fn events(&self) -> Vec<PlayerEvent> {
            self.events.lock().clone()
        }
    }

    impl Playback for RecordingPlayer {
        fn play(&self, utterance: Utterance) {
            self.events
                .lock()
                .push(PlayerEvent::Play(utterance.samples.len()));
        }

        fn stop(&self) {
            self.events.lock().push(PlayerEvent::Stop);
        }
    }

    fn wav_bytes(samples: &[i16], channels: u16, sample_rate: u32) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for sample in samples {
                writer.write_sample(*sample).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    fn test_config(endpoint: String) -> TtsConfig {
        TtsConfig {
            endpoint,
            ..TtsConfig::default()
        }
    }

    #[test]
    fn test_decode_wav_mono() {
        let bytes = wav_bytes(&[0, i16::MAX, i16::MIN], 1, 24000);
        let utterance = decode_wav(&bytes).unwrap();

        assert_eq!(utterance.sample_rate, 24000);
        assert_eq!(utterance.samples.len(), 3);
        assert!(utterance.samples[0].abs() < f32::EPSILON);
        assert!((utterance.samples[1] - (i16::MAX as f32 / 32768.0)).abs() < 1e-4);
    }

    #[test]
    fn test_decode_wav_downmixes_stereo() {
        // Two frames of [left, right]
        let bytes = wav_bytes(&[16384, -16384, 8192, 8192], 2, 24000);
        let utterance = decode_wav(&bytes).unwrap();

        assert_eq!(utterance.samples.len(), 2);
        assert!(utterance.samples[0].abs() < 1e-4);
        assert!((utterance.samples[1] - 0.25).abs() < 1e-3);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_wav(b"definitely not a wav").is_err());
    }

    #[tokio::test]
    async fn test_speak_empty_text_is_noop() {
        let player = RecordingPlayer::new();
        // Endpoint is never contacted for empty text
        let client = SpeechClient::new(
            &test_config("http://127.0.0.1:9/tts".to_string()),
            player.clone(),
        )
        .unwrap();

        client.speak("   ").await;
        assert!(player.events().is_empty());
    }

    #[tokio::test]
    async fn test_speak_stops_previous_before_playing_next() {
        let mut server = mockito::Server::new_async().await;
        let wav = wav_bytes(&[0; 48], 1, 24000);
        server
            .mock("POST", "/tts")
            .with_status(200)
            .with_body(wav)
            .expect(2)
            .create_async()
            .await;

        let player = RecordingPlayer::new();
        let client = SpeechClient::new(
            &test_config(format!("{}/tts", server.url())),
            player.clone(),
        )
        .unwrap();

        client.speak("你好").await;
        client.speak("你好").await;

        // Each playback is preceded by a stop, so the first utterance is
        // gone before the second starts
        assert_eq!(
            player.events(),
            vec![
                PlayerEvent::Stop,
                PlayerEvent::Play(48),
                PlayerEvent::Stop,
                PlayerEvent::Play(48),
            ]
        );
    }

    #[tokio::test]
    async fn test_synthesis_failure_is_swallowed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/tts")
            .with_status(500)
            .create_async()
            .await;

        let player = RecordingPlayer::new();
        let client = SpeechClient::new(
            &test_config(format!("{}/tts", server.url())),
            player.clone(),
        )
        .unwrap();

        // Must not panic or surface the failure
        client.speak("你好").await;
        assert_eq!(player.events(), vec![PlayerEvent::Stop]);
    }
}
