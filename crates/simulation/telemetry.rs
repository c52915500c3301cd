use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use serde_json::json;

use sim_logging::{JsonLogger, LogLevel, LogRecord};

use crate::episode::InteractionLog;
use friction_world::CollisionInfo;

/// Harness-wide logging facade. Records are JSON lines; emission failures
/// are reported to stderr but never abort an episode.
#[derive(Clone)]
pub struct HarnessTelemetry {
    logger: Arc<JsonLogger>,
}

impl HarnessTelemetry {
    /// Opens a telemetry log at the given path.
    pub fn new(path: impl AsRef<Path>, min_level: LogLevel, echo: bool) -> Result<Self> {
        let logger = JsonLogger::new(path)?.with_min_level(min_level).with_echo(echo);
        Ok(Self {
            logger: Arc::new(logger),
        })
    }

    fn emit(&self, record: LogRecord) {
        if let Err(err) = self.logger.log(&record) {
            eprintln!("telemetry write failed: {err}");
        }
    }

    /// Marks the start of an episode.
    pub fn episode_started(&self, episode: usize, scenario_id: &str, variant: &str) {
        self.emit(
            LogRecord::new("orchestrator", LogLevel::Info, "episode started").with_metadata(
                json!({ "episode": episode, "scenario": scenario_id, "variant": variant }),
            ),
        );
    }

    /// Records one executed turn.
    pub fn turn(&self, turn: usize, user_message: &str, action: &str) {
        self.emit(
            LogRecord::new("orchestrator", LogLevel::Info, "turn executed").with_metadata(
                json!({ "turn": turn, "user": user_message, "action": action }),
            ),
        );
    }

    /// Records a terminal collision.
    pub fn collision(&self, collision: &CollisionInfo) {
        self.emit(
            LogRecord::new("world", LogLevel::Warn, collision.message.clone()).with_metadata(
                json!({ "obstacle": collision.obstacle_name }),
            ),
        );
    }

    /// Marks the end of an episode with its headline outcome.
    pub fn episode_finished(&self, log: &InteractionLog) {
        self.emit(
            LogRecord::new("orchestrator", LogLevel::Info, "episode finished").with_metadata(
                json!({
                    "scenario": log.scenario_id,
                    "success": log.succeeded(),
                    "completed": log.completed,
                    "turns": log.total_turns,
                    "clarifications": log.clarifications,
                }),
            ),
        );
    }

    /// Verbose per-turn world dump, gated behind the debug level.
    pub fn debug_state(&self, state: &str) {
        self.emit(LogRecord::new("world", LogLevel::Debug, state));
    }

    /// Recoverable problem.
    pub fn warn(&self, module: &str, message: &str) {
        self.emit(LogRecord::new(module, LogLevel::Warn, message));
    }

    /// Episode-fatal problem.
    pub fn error(&self, module: &str, message: &str) {
        self.emit(LogRecord::new(module, LogLevel::Error, message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_land_in_the_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        let telemetry = HarnessTelemetry::new(&path, LogLevel::Debug, false).unwrap();
        telemetry.episode_started(0, "ref_002", "friction");
        telemetry.warn("session", "command dropped: robot busy");
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("episode started"));
        assert!(content.contains("ref_002"));
        assert!(content.contains("command dropped"));
    }
}
