use serde::{Deserialize, Serialize};

/// Configuration for the remote translation endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    /// URL of the DeepLX-compatible translation endpoint
    pub endpoint: String,
    /// Target language code sent with every request
    pub target_lang: String,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Maximum number of characters accepted per input snapshot
    /// Longer input is truncated before it reaches the scheduler
    pub max_input_chars: usize,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://deeplx.11444.xyz/translate".to_string(),
            target_lang: "EN".to_string(),
            request_timeout_secs: 15,
            max_input_chars: 2000,
        }
    }
}

/// Configuration for input debouncing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebounceConfig {
    /// Quiet period in milliseconds after the last input event before a
    /// translation request is issued
    pub quiet_period_ms: u64,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            quiet_period_ms: 200,
        }
    }
}

/// Configuration for text-to-speech playback
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    /// Whether the speech commands are available at all
    pub enabled: bool,
    /// URL of the speech synthesis endpoint (expects WAV bytes back)
    pub endpoint: String,
    /// Voice name passed to the synthesis endpoint
    pub voice: String,
    /// Per-request timeout in seconds (synthesis can be slow for long text)
    pub request_timeout_secs: u64,
    /// Playback volume (0.0-1.0)
    pub volume: f32,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://oopstts.vercel.app/azure/tts".to_string(),
            voice: "zh-CN-YunyangNeural".to_string(),
            request_timeout_secs: 30,
            volume: 1.0,
        }
    }
}

/// Configuration for the startup prefetch request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WarmupConfig {
    /// Whether to fire the best-effort warmup request at startup
    pub enabled: bool,
    /// Sample text sent with the warmup request
    pub sample_text: String,
    /// Target language for the warmup request
    /// The warmup goes in the opposite direction so it never collides with
    /// a real first request racing it
    pub target_lang: String,
}

impl Default for WarmupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sample_text: "Hello World!".to_string(),
            target_lang: "ZH".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Translation endpoint configuration
    pub translation: TranslationConfig,
    /// Input debounce configuration
    pub debounce: DebounceConfig,
    /// Text-to-speech configuration
    pub tts: TtsConfig,
    /// Startup prefetch configuration
    pub warmup: WarmupConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            translation: TranslationConfig::default(),
            debounce: DebounceConfig::default(),
            tts: TtsConfig::default(),
            warmup: WarmupConfig::default(),
        }
    }
}

/// Helper function to read the application configuration
pub fn read_app_config() -> AppConfig {
    match std::fs::read_to_string("config.toml") {
        Ok(config_str) => match toml::from_str(&config_str) {
            Ok(config) => config,
            Err(e) => {
                println!(
                    "Failed to parse config.toml: {}. Using default configuration.",
                    e
                );
                AppConfig::default()
            }
        },
        Err(e) => {
            println!(
                "Failed to read config.toml: {}. Using default configuration.",
                e
            );
            AppConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.debounce.quiet_period_ms, 200);
        assert_eq!(config.translation.target_lang, "EN");
        assert_eq!(config.translation.max_input_chars, 2000);
        assert!(config.warmup.enabled);
    }

    #[test]
    fn test_partial_config_falls_back_to_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [debounce]
            quiet_period_ms = 500
            "#,
        )
        .unwrap();
        assert_eq!(config.debounce.quiet_period_ms, 500);
        assert_eq!(config.translation.target_lang, "EN");
    }
}
