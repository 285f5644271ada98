use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};

mod replay;

#[derive(Parser)]
#[command(name = "visage", about = "Visage liveness CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded landmark stream (JSON Lines) through a liveness session
    Replay {
        /// Recording with one landmark frame per line
        recording: PathBuf,
        /// Liveness config TOML (defaults apply when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Give up after this many ms of recording time
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// Print frame reports as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate a liveness config file and print the effective values
    CheckConfig {
        /// Liveness config TOML
        path: PathBuf,
    },
    /// Show daemon status
    Status {
        /// Query the session bus instead of the system bus
        #[arg(long)]
        session_bus: bool,
    },
}

#[zbus::proxy(
    interface = "org.freedesktop.VisageLiveness1",
    default_service = "org.freedesktop.VisageLiveness1",
    default_path = "/org/freedesktop/VisageLiveness1"
)]
trait Liveness {
    async fn status(&self) -> zbus::Result<String>;
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Replay {
            recording,
            config,
            timeout_ms,
            json,
        } => {
            let config = replay::load_config(config.as_deref())?;
            let mut stdout = std::io::stdout().lock();
            let outcome = replay::run(&recording, config, timeout_ms, json, &mut stdout)?;

            match outcome.live_at_ms {
                Some(ts) => println!(
                    "LIVE at {ts} ms after {} frames ({} blinks)",
                    outcome.frames_processed, outcome.blink_count
                ),
                None if outcome.timed_out => bail!(
                    "timed out after {} frames without liveness ({} blinks)",
                    outcome.frames_processed,
                    outcome.blink_count
                ),
                None => bail!(
                    "recording ended after {} frames without liveness ({} blinks, last verdict {})",
                    outcome.frames_processed,
                    outcome.blink_count,
                    outcome.verdict
                ),
            }
        }
        Commands::CheckConfig { path } => {
            let config = replay::load_config(Some(&path))?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Status { session_bus } => {
            let conn = if session_bus {
                zbus::Connection::session().await?
            } else {
                zbus::Connection::system().await?
            };
            let proxy = LivenessProxy::new(&conn).await?;
            let status: serde_json::Value = serde_json::from_str(&proxy.status().await?)?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }

    Ok(())
}
