use chrono::{DateTime, Utc};
use uuid::Uuid;
use visage_liveness::LandmarkFrame;
use zbus::interface;

use crate::config::Config;
use crate::engine::{EngineError, EngineHandle};

pub const BUS_NAME: &str = "org.freedesktop.VisageLiveness1";
pub const OBJECT_PATH: &str = "/org/freedesktop/VisageLiveness1";

/// D-Bus interface for the Visage liveness daemon.
///
/// Bus name: org.freedesktop.VisageLiveness1
/// Object path: /org/freedesktop/VisageLiveness1
pub struct LivenessService {
    pub config: Config,
    pub engine: EngineHandle,
    pub started_at: DateTime<Utc>,
}

fn parse_session_id(session_id: &str) -> zbus::fdo::Result<Uuid> {
    Uuid::parse_str(session_id)
        .map_err(|e| zbus::fdo::Error::InvalidArgs(format!("invalid session id '{session_id}': {e}")))
}

fn engine_failure(e: EngineError) -> zbus::fdo::Error {
    match e {
        EngineError::UnknownSession(_) => zbus::fdo::Error::InvalidArgs(e.to_string()),
        _ => zbus::fdo::Error::Failed(e.to_string()),
    }
}

#[interface(name = "org.freedesktop.VisageLiveness1")]
impl LivenessService {
    /// Open a liveness session for one authentication attempt.
    ///
    /// Returns the session ID to pass to `SubmitFrame`.
    async fn start_session(&self) -> zbus::fdo::Result<String> {
        let id = self.engine.start().await.map_err(|e| {
            tracing::warn!(error = %e, "start_session failed");
            engine_failure(e)
        })?;
        Ok(id.to_string())
    }

    /// Submit one landmark frame (JSON) and return the frame report (JSON).
    ///
    /// Once a report carries `"verdict": "LIVE"` the session accepts no more
    /// frames; the caller should stop its frame source.
    async fn submit_frame(&self, session_id: &str, frame_json: &str) -> zbus::fdo::Result<String> {
        let id = parse_session_id(session_id)?;
        let frame: LandmarkFrame = serde_json::from_str(frame_json).map_err(|e| {
            tracing::warn!(session = %id, error = %e, "submit_frame: bad frame JSON");
            zbus::fdo::Error::InvalidArgs(format!("invalid landmark frame: {e}"))
        })?;

        let report = self.engine.submit(id, frame).await.map_err(|e| {
            tracing::error!(session = %id, error = %e, "submit_frame failed");
            engine_failure(e)
        })?;

        serde_json::to_string(&report).map_err(|e| zbus::fdo::Error::Failed(e.to_string()))
    }

    /// Discard a session. Returns false if no such session was open.
    async fn abort_session(&self, session_id: &str) -> zbus::fdo::Result<bool> {
        let id = parse_session_id(session_id)?;
        self.engine.abort(id).await.map_err(engine_failure)
    }

    /// Return daemon status information as JSON.
    async fn status(&self) -> zbus::fdo::Result<String> {
        let stats = self.engine.stats().await.map_err(engine_failure)?;
        Ok(serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "started_at": self.started_at,
            "sessions": stats,
            "max_sessions": self.config.max_sessions,
            "session_timeout_secs": self.config.session_timeout.as_secs(),
            "liveness": self.config.liveness,
        })
        .to_string())
    }
}
