//! `visage replay`: run a recorded landmark stream through a fresh session.

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use anyhow::{Context, Result};
use visage_liveness::{
    replay, JsonLinesSource, LivenessConfig, LivenessSession, ReplayOptions, ReplayOutcome,
};

/// Load the liveness config from `path`, or use the defaults.
pub fn load_config(path: Option<&Path>) -> Result<LivenessConfig> {
    match path {
        Some(p) => LivenessConfig::load(p).with_context(|| format!("loading {}", p.display())),
        None => Ok(LivenessConfig::default()),
    }
}

pub fn run(
    recording: &Path,
    config: LivenessConfig,
    timeout_ms: Option<u64>,
    json: bool,
    out: &mut impl Write,
) -> Result<ReplayOutcome> {
    let file = File::open(recording)
        .with_context(|| format!("opening recording {}", recording.display()))?;
    let mut session = LivenessSession::new(config)?;
    let options = ReplayOptions { timeout_ms };

    let mut write_err = None;
    let outcome = replay(
        &mut session,
        JsonLinesSource::new(BufReader::new(file)),
        &options,
        |ts, report| {
            let line = if json {
                serde_json::json!({ "timestamp_ms": ts, "report": report }).to_string()
            } else {
                format!(
                    "{ts:>8} ms  {:<9} blinks={} facing={} ear={}",
                    report.verdict.to_string(),
                    report.blink_count,
                    report.is_facing_camera,
                    report.avg_ear.map_or_else(|| "-".to_string(), |e| format!("{e:.3}")),
                )
            };
            if write_err.is_none() {
                if let Err(e) = writeln!(out, "{line}") {
                    write_err = Some(e);
                }
            }
        },
    )
    .with_context(|| format!("replaying {}", recording.display()))?;

    if let Some(e) = write_err {
        return Err(e).context("writing frame reports");
    }

    tracing::debug!(?outcome, "replay finished");
    Ok(outcome)
}
