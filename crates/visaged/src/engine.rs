use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;
use visage_liveness::{
    FrameReport, LandmarkFrame, LivenessConfig, LivenessSession, SessionError, SessionState,
};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("session error: {0}")]
    Session(#[from] SessionError),
    #[error("unknown or expired session {0}")]
    UnknownSession(Uuid),
    #[error("too many open sessions (limit {0})")]
    TooManySessions(usize),
    #[error("failed to spawn engine thread: {0}")]
    Spawn(std::io::Error),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// Snapshot of the session registry.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    pub open_sessions: usize,
    pub live_sessions: usize,
    pub started_total: u64,
    pub reaped_total: u64,
}

/// Messages sent from D-Bus handlers to the engine thread.
enum EngineRequest {
    Start {
        reply: oneshot::Sender<Result<Uuid, EngineError>>,
    },
    Submit {
        id: Uuid,
        frame: LandmarkFrame,
        reply: oneshot::Sender<Result<FrameReport, EngineError>>,
    },
    Abort {
        id: Uuid,
        reply: oneshot::Sender<bool>,
    },
    Stats {
        reply: oneshot::Sender<EngineStats>,
    },
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    /// Open a new liveness session.
    pub async fn start(&self) -> Result<Uuid, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineRequest::Start { reply }).await?;
        rx.await.map_err(|_| EngineError::ChannelClosed)?
    }

    /// Feed one landmark frame to a session.
    pub async fn submit(&self, id: Uuid, frame: LandmarkFrame) -> Result<FrameReport, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineRequest::Submit { id, frame, reply }).await?;
        rx.await.map_err(|_| EngineError::ChannelClosed)?
    }

    /// Discard a session. Returns false if it did not exist.
    pub async fn abort(&self, id: Uuid) -> Result<bool, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineRequest::Abort { id, reply }).await?;
        rx.await.map_err(|_| EngineError::ChannelClosed)
    }

    pub async fn stats(&self) -> Result<EngineStats, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineRequest::Stats { reply }).await?;
        rx.await.map_err(|_| EngineError::ChannelClosed)
    }

    async fn send(&self, req: EngineRequest) -> Result<(), EngineError> {
        self.tx.send(req).await.map_err(|_| EngineError::ChannelClosed)
    }
}

struct TrackedSession {
    session: LivenessSession,
    started_at: Instant,
}

/// All open sessions. Owned by the engine thread; frames for every session
/// are processed serially.
struct SessionRegistry {
    sessions: HashMap<Uuid, TrackedSession>,
    config: LivenessConfig,
    timeout: Duration,
    max_sessions: usize,
    started_total: u64,
    reaped_total: u64,
}

impl SessionRegistry {
    fn new(config: LivenessConfig, timeout: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            config,
            timeout,
            max_sessions,
            started_total: 0,
            reaped_total: 0,
        }
    }

    /// Drop sessions that have outlived the timeout.
    fn reap(&mut self, now: Instant) {
        let timeout = self.timeout;
        let before = self.sessions.len();
        self.sessions.retain(|id, tracked| {
            let keep = now.saturating_duration_since(tracked.started_at) < timeout;
            if !keep {
                tracing::info!(
                    session = %id,
                    state = ?tracked.session.state(),
                    blinks = tracked.session.blink_count(),
                    "session expired"
                );
            }
            keep
        });
        self.reaped_total += (before - self.sessions.len()) as u64;
    }

    fn start(&mut self, now: Instant) -> Result<Uuid, EngineError> {
        // LIVE sessions stay registered so late frames still get
        // `AlreadyTerminal`, but they no longer hold a slot.
        let pending = self
            .sessions
            .values()
            .filter(|t| !t.session.is_terminal())
            .count();
        if pending >= self.max_sessions {
            return Err(EngineError::TooManySessions(self.max_sessions));
        }
        let session = LivenessSession::new(self.config.clone())?;
        let id = Uuid::new_v4();
        self.sessions.insert(id, TrackedSession { session, started_at: now });
        self.started_total += 1;
        tracing::info!(session = %id, open = self.sessions.len(), "session started");
        Ok(id)
    }

    fn submit(&mut self, id: Uuid, frame: &LandmarkFrame) -> Result<FrameReport, EngineError> {
        let tracked = self.sessions.get_mut(&id).ok_or(EngineError::UnknownSession(id))?;
        let now_ms = frame.timestamp_ms.unwrap_or_else(wall_clock_ms);
        let report = tracked.session.process_raw(&frame.faces, now_ms)?;
        if report.verdict == visage_liveness::Verdict::Live {
            tracing::info!(
                session = %id,
                blinks = report.blink_count,
                elapsed_ms = tracked.started_at.elapsed().as_millis() as u64,
                "session live"
            );
        }
        Ok(report)
    }

    fn abort(&mut self, id: Uuid) -> bool {
        let removed = self.sessions.remove(&id).is_some();
        if removed {
            tracing::info!(session = %id, "session aborted");
        }
        removed
    }

    fn stats(&self) -> EngineStats {
        EngineStats {
            open_sessions: self.sessions.len(),
            live_sessions: self
                .sessions
                .values()
                .filter(|t| t.session.state() == SessionState::Live)
                .count(),
            started_total: self.started_total,
            reaped_total: self.reaped_total,
        }
    }
}

/// Milliseconds since the Unix epoch, for frames that carry no timestamp.
fn wall_clock_ms() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}

/// Spawn the engine on a dedicated OS thread.
///
/// The thread owns every session; requests from D-Bus handlers are served
/// one at a time. Expired sessions are discarded before each request.
pub fn spawn_engine(
    config: LivenessConfig,
    session_timeout: Duration,
    max_sessions: usize,
) -> Result<EngineHandle, EngineError> {
    config.validate().map_err(SessionError::from)?;
    let mut registry = SessionRegistry::new(config, session_timeout, max_sessions);
    let (tx, mut rx) = mpsc::channel::<EngineRequest>(32);

    std::thread::Builder::new()
        .name("visage-liveness".into())
        .spawn(move || {
            tracing::info!("engine thread started");
            while let Some(req) = rx.blocking_recv() {
                let now = Instant::now();
                registry.reap(now);
                match req {
                    EngineRequest::Start { reply } => {
                        let _ = reply.send(registry.start(now));
                    }
                    EngineRequest::Submit { id, frame, reply } => {
                        let _ = reply.send(registry.submit(id, &frame));
                    }
                    EngineRequest::Abort { id, reply } => {
                        let _ = reply.send(registry.abort(id));
                    }
                    EngineRequest::Stats { reply } => {
                        let _ = reply.send(registry.stats());
                    }
                }
            }
            tracing::info!("engine thread exiting");
        })
        .map_err(EngineError::Spawn)?;

    Ok(EngineHandle { tx })
}
