pub mod config;
pub mod pipeline;
pub mod playback;
pub mod scheduler;
pub mod speech;
pub mod translation;
pub mod warmup;

// Re-export key components for easier access
pub use config::read_app_config;
pub use pipeline::Translator;
pub use playback::AudioPlayer;
pub use scheduler::TranslateScheduler;
pub use speech::SpeechClient;
pub use translation::{TranslateApi, TranslateOutcome, TranslationClient};
