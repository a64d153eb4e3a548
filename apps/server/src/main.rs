//! Chorus Server - headless console host for the Chorus core.
//!
//! Reads prefixed commands from stdin, one line per request from the
//! configured caller, and prints replies to stdout. Voice playback, search
//! and chat delivery are simulated in-process.

mod commands;
mod config;
mod sim;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chorus_core::{
    bootstrap_services, transport_event_channel, CallerContext, Collaborators,
    LoggingEventEmitter, MusicService, SessionSnapshot,
};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;

use crate::commands::{help_text, parse, ConsoleCommand};
use crate::config::ServerConfig;
use crate::sim::{CatalogueResolver, ConsoleSink, SimulatedTransport};

/// Chorus Server - console front-end for per-conversation voice playback.
#[derive(Parser, Debug)]
#[command(name = "chorus-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "CHORUS_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Command prefix (overrides config file).
    #[arg(short, long, env = "CHORUS_PREFIX")]
    prefix: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Chorus Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(prefix) = args.prefix {
        config.prefix = prefix;
    }
    if config.prefix.trim().is_empty() {
        anyhow::bail!("Command prefix must not be empty");
    }

    log::info!(
        "Configuration: prefix={:?}, catalogue={} track(s), speedup={}x",
        config.prefix,
        config.catalogue.len(),
        config.effective_speedup()
    );

    // Wire simulated collaborators into the core
    let core_config = config.to_core_config();
    let (event_tx, event_rx) = transport_event_channel(&core_config);
    let collaborators = Collaborators {
        transport: Arc::new(SimulatedTransport::new(event_tx, config.effective_speedup())),
        resolver: Arc::new(CatalogueResolver::new(config.catalogue.clone())),
        sink: Arc::new(ConsoleSink),
        transport_events: event_rx,
    };
    let services =
        bootstrap_services(&core_config, collaborators).context("Failed to bootstrap services")?;
    services
        .event_bridge
        .set_external_emitter(Arc::new(LoggingEventEmitter));

    services.start_background_tasks();

    log::info!("Background tasks started");

    let caller = config.caller.to_caller_context();
    println!("Chorus is listening. Commands:\n{}", help_text(&config.prefix));

    // Run until stdin closes or a shutdown signal arrives
    tokio::select! {
        result = run_console(&services.music, &caller, &config.prefix) => {
            if let Err(e) = result {
                log::error!("Console input failed: {}", e);
            }
            log::info!("Input closed, cleaning up...");
        }
        _ = shutdown_signal() => {
            log::info!("Shutdown signal received, cleaning up...");
        }
    }

    // Graceful shutdown
    services.shutdown().await;

    log::info!("Shutdown complete");
    Ok(())
}

/// Handles console lines in order until EOF.
async fn run_console(music: &MusicService, caller: &CallerContext, prefix: &str) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        match parse(&line, prefix) {
            Some(ConsoleCommand::Music(command)) => {
                log::debug!("[Console] {:?}", command);
                music.execute(caller, command).await;
            }
            Some(ConsoleCommand::Help) => println!("{}", help_text(prefix)),
            Some(ConsoleCommand::Status) => {
                match music.registry().get(caller.conversation_id) {
                    Some(session) => println!("{}", describe(&session.snapshot())),
                    None => println!("No session yet. Try {prefix}join or {prefix}play <query>."),
                }
            }
            Some(ConsoleCommand::Unknown(name)) => {
                println!("Unknown command `{name}`. Try {prefix}help.");
            }
            None => {}
        }
    }
    Ok(())
}

fn describe(snapshot: &SessionSnapshot) -> String {
    let mut out = format!("Status: {:?}", snapshot.status);
    if let Some(channel) = &snapshot.voice_channel_name {
        out.push_str(&format!(" in `{channel}`"));
    }
    if let Some(track) = &snapshot.current_track {
        out.push_str(&format!(
            "\nCurrent: {} by {} ({})",
            track.title,
            track.author,
            track.length_display()
        ));
    }
    if snapshot.queue.is_empty() {
        out.push_str("\nQueue is empty.");
    } else {
        for (position, track) in snapshot.queue.iter().enumerate() {
            out.push_str(&format!("\n{:>3}. {} by {}", position + 1, track.title, track.author));
        }
    }
    out
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use chorus_core::{ConversationId, SessionStatus, Track};

    #[test]
    fn args_parse_overrides() {
        let args = Args::parse_from(["chorus-server", "--prefix", "?", "-l", "debug"]);
        assert_eq!(args.prefix.as_deref(), Some("?"));
        assert_eq!(args.log_level, log::LevelFilter::Debug);
        assert!(args.config.is_none());
    }

    #[test]
    fn describe_lists_current_and_queue() {
        let track = |title: &str| {
            Track::new(title, title, "Band", "https://music.example/x", Duration::from_secs(65))
        };
        let snapshot = SessionSnapshot {
            conversation_id: ConversationId(1),
            status: SessionStatus::Playing,
            connection: None,
            reply_channel: None,
            voice_channel_name: Some("General".into()),
            current_track: Some(track("One")),
            queue: vec![track("Two")],
        };

        let text = describe(&snapshot);

        assert!(text.starts_with("Status: Playing in `General`"));
        assert!(text.contains("Current: One by Band (1:05)"));
        assert!(text.contains("1. Two by Band"));
    }
}
