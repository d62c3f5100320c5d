//! Replay a recorded judgment event transcript through a live session.
//!
//! Reads newline-delimited JSON events (`ai_complete`, `final_result`,
//! `error`) from a file or stdin, drives a real session with them, and
//! prints the notices and final verdict. Useful for auditing recorded
//! sessions and debugging protocol drift.
//!
//! ```bash
//! tribunal --issue "Ship the new onboarding flow?" --events session.jsonl
//! cat session.jsonl | tribunal --issue "Ship it?"
//! RUST_LOG=tribunal=debug tribunal --issue "Ship it?" --events session.jsonl
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::warn;

use tribunal::{
    ChannelTransport, ConfigReconciler, JsonFileStore, JudgeEvent, NodeConfig, SessionController,
    SessionNotice, StaticRemote,
};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The proposition to judge
    #[arg(long)]
    issue: String,

    /// Path to a JSONL event transcript (defaults to stdin)
    #[arg(long)]
    events: Option<PathBuf>,

    /// Path to a cached node configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let nodes = match &args.config {
        Some(path) => {
            let reconciler = ConfigReconciler::new(JsonFileStore::new(path), StaticRemote::empty());
            reconciler
                .resolve_worker_config()
                .await
                .context("resolving worker configuration")?
        }
        None => NodeConfig::default_trio(),
    };

    let transcript = match &args.events {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading transcript {}", path.display()))?,
        None => std::io::read_to_string(std::io::stdin()).context("reading stdin")?,
    };

    let (transport, mut driver) = ChannelTransport::pair();
    let controller = SessionController::new();
    let handle = controller.start_session(&args.issue, nodes, transport)?;
    let mut notices = handle.subscribe();

    let feeder = tokio::spawn(async move {
        let Some(request) = driver.next_request().await else {
            return;
        };
        println!(
            "submitted: {}",
            serde_json::to_string(&request).unwrap_or_default()
        );

        for (number, line) in transcript.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<JudgeEvent>(line) {
                Ok(event) => {
                    if !driver.send_event(event) {
                        break;
                    }
                }
                Err(err) => warn!(line = number + 1, %err, "skipping unparseable event"),
            }
        }
        // Dropping the driver closes the channel; an incomplete
        // transcript surfaces as a stream failure.
    });

    let mut failed = None;
    while let Ok(notice) = notices.recv().await {
        match notice {
            SessionNotice::Progress { slot, completed } => {
                println!("progress: {slot} resolved ({completed}/3)");
            }
            SessionNotice::WorkerComplete { slot, result } => match result.response() {
                Some(response) => println!(
                    "{slot}: {} (severity {:.0}) — {}",
                    response.decision, response.severity, response.reason
                ),
                None => println!(
                    "{slot}: FAILED — {}",
                    result.error().unwrap_or("unknown error")
                ),
            },
            SessionNotice::Verdict(verdict) => {
                println!("verdict: {}", verdict.summary_line());
                println!("reasoning: {}", verdict.reasoning);
                break;
            }
            SessionNotice::Error { message, fatal } => {
                if fatal {
                    failed = Some(message);
                    break;
                }
                warn!(%message, "protocol violation");
            }
        }
    }

    feeder.await.ok();

    if let Some(message) = failed {
        anyhow::bail!("session failed: {message}");
    }
    Ok(())
}
