use anyhow::Result;
use tracing_subscriber::EnvFilter;

mod config;
mod dbus_interface;
mod engine;

use dbus_interface::{LivenessService, BUS_NAME, OBJECT_PATH};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("visaged starting");

    let config = config::Config::from_env()?;
    tracing::info!(
        liveness = ?config.liveness,
        config_file = ?config.liveness_path,
        session_timeout_secs = config.session_timeout.as_secs(),
        max_sessions = config.max_sessions,
        "configuration loaded"
    );

    let engine = engine::spawn_engine(
        config.liveness.clone(),
        config.session_timeout,
        config.max_sessions,
    )?;

    let session_bus = config.session_bus;
    let service = LivenessService {
        config,
        engine,
        started_at: chrono::Utc::now(),
    };

    let builder = if session_bus {
        zbus::connection::Builder::session()?
    } else {
        zbus::connection::Builder::system()?
    };
    let _conn = builder
        .name(BUS_NAME)?
        .serve_at(OBJECT_PATH, service)?
        .build()
        .await?;

    let bus = if session_bus { "session" } else { "system" };
    tracing::info!(bus, name = BUS_NAME, "visaged ready");

    // Keep running until signaled
    tokio::signal::ctrl_c().await?;
    tracing::info!("visaged shutting down");

    Ok(())
}
