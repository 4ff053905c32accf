use std::sync::atomic::Ordering;

mod config;
mod pipeline;
mod playback;
mod scheduler;
mod speech;
mod translation;
mod warmup;

use clap::Parser;
use tokio::io::AsyncBufReadExt;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use config::read_app_config;
use pipeline::Translator;
use translation::{TranslateApi, TranslateOutcome, TranslationClient};

#[derive(Parser)]
#[command(name = "kuaiyi")]
#[command(about = "Debounced Chinese to English translation in the terminal")]
#[command(version)]
struct Args {
    /// Translate a single string and exit
    #[arg(long)]
    text: Option<String>,

    /// Skip the startup warmup request
    #[arg(long)]
    no_warmup: bool,

    /// Disable the text-to-speech commands
    #[arg(long)]
    no_tts: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    println!("Loading configuration...");
    let mut app_config = read_app_config();
    if args.no_tts {
        app_config.tts.enabled = false;
    }

    if let Some(text) = args.text {
        return run_once(app_config, &text).await;
    }

    let mut translator = Translator::new(app_config.clone())?;
    translator.start()?;

    if !args.no_warmup {
        warmup::spawn_warmup(translator.translation_client(), app_config.warmup.clone());
    }

    run_interactive(translator).await
}

/// One-shot mode: translate a single string, print, exit
async fn run_once(app_config: config::AppConfig, text: &str) -> anyhow::Result<()> {
    let client = TranslationClient::new(&app_config.translation)?;
    let token = CancellationToken::new();

    match client.translate(text, &token).await {
        TranslateOutcome::Translated(translated) => {
            println!("{}", translated);
            Ok(())
        }
        TranslateOutcome::Cancelled => Ok(()),
        TranslateOutcome::Failed(e) => Err(anyhow::anyhow!(e)),
    }
}

async fn run_interactive(mut translator: Translator) -> anyhow::Result<()> {
    println!("Type Chinese text; the translation appears after a short pause.");
    println!("Commands: :say (speak translation), :say-input (speak input), :quit");
    println!("=====================================");

    let running = translator.get_running();
    let mut output_rx = translator.get_output_rx();

    // Ctrl+C flips the running flag; the loop below notices within 100ms
    let running_clone = running.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\nShutting down...");
            running_clone.store(false, Ordering::Relaxed);
        }
    });

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => match line.trim() {
                        ":quit" => break,
                        ":say" => translator.speak_output().await,
                        ":say-input" => translator.speak_input().await,
                        _ => translator.submit_input(&line).await,
                    },
                    Ok(None) => break,
                    Err(e) => {
                        eprintln!("Failed to read input: {}", e);
                        break;
                    }
                }
            }

            update = output_rx.recv() => {
                if let Ok(text) = update {
                    if text.is_empty() {
                        println!("(cleared)");
                    } else {
                        println!("-> {}", text);
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

    translator.shutdown().await?;
    Ok(())
}
