use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use friction_agents::{FrictionType, Intent};
use friction_evaluator::SuccessEvaluation;
use friction_world::CollisionInfo;

use crate::scenario::TaskScenario;

/// One robot turn as recorded in the episode transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRecord {
    /// Zero-based turn index.
    pub turn: usize,
    /// What the user said going into this turn.
    pub user_message: String,
    /// The structured intent the agent produced.
    pub intent: Intent,
    /// Rendered action description, as appended to the world history.
    pub action: String,
    /// What the robot said or asked, if anything.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub robot_message: Option<String>,
    /// Friction label when this turn was a clarification.
    pub friction: FrictionType,
}

/// Full record of one episode, written into the experiment report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionLog {
    /// Scenario the episode ran.
    pub scenario_id: String,
    /// Ambiguity category of the scenario.
    pub ambiguity: crate::scenario::AmbiguityKind,
    /// Ground-truth goal the episode was scored against.
    pub goal: String,
    /// Decision strategy label.
    pub model_variant: String,
    /// Turn transcript.
    pub turns: Vec<TurnRecord>,
    /// Clarifying questions asked.
    pub clarifications: usize,
    /// Terminal collision, if one occurred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collision: Option<CollisionInfo>,
    /// Whether the user ended the episode satisfied (as opposed to the
    /// turn cap, an error, or a collision ending it).
    pub completed: bool,
    /// Turns executed.
    pub total_turns: usize,
    /// Abort cause, when the episode died on an agent or user error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Final scoring, absent only when setup failed before the first turn.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<SuccessEvaluation>,
}

impl InteractionLog {
    /// Starts an empty log for a scenario/variant pairing.
    #[must_use]
    pub fn new(scenario: &TaskScenario, model_variant: impl Into<String>) -> Self {
        Self {
            scenario_id: scenario.id.clone(),
            ambiguity: scenario.ambiguity,
            goal: scenario.goal.clone(),
            model_variant: model_variant.into(),
            turns: Vec::new(),
            clarifications: 0,
            collision: None,
            completed: false,
            total_turns: 0,
            error: None,
            evaluation: None,
        }
    }

    /// Whether the final evaluation scored the episode a success.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.evaluation.as_ref().is_some_and(|eval| eval.success)
    }
}

/// Aggregate statistics over a batch of episodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentSummary {
    /// Episodes run.
    pub total_episodes: usize,
    /// Episodes scored successful.
    pub successes: usize,
    /// `successes / total_episodes` (0.0 for an empty batch).
    pub success_rate: f64,
    /// Episodes ended by collision.
    pub collisions: usize,
    /// Episodes the user ended satisfied.
    pub completed: usize,
    /// Clarifying questions asked across the batch.
    pub clarifications: usize,
    /// Mean turns per episode.
    pub mean_turns: f64,
}

impl ExperimentSummary {
    /// Computes summary statistics for a batch.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn compute(episodes: &[InteractionLog]) -> Self {
        let total = episodes.len();
        let successes = episodes.iter().filter(|log| log.succeeded()).count();
        let collisions = episodes.iter().filter(|log| log.collision.is_some()).count();
        let completed = episodes.iter().filter(|log| log.completed).count();
        let clarifications = episodes.iter().map(|log| log.clarifications).sum();
        let turn_sum: usize = episodes.iter().map(|log| log.total_turns).sum();
        Self {
            total_episodes: total,
            successes,
            success_rate: if total == 0 {
                0.0
            } else {
                successes as f64 / total as f64
            },
            collisions,
            completed,
            clarifications,
            mean_turns: if total == 0 {
                0.0
            } else {
                turn_sum as f64 / total as f64
            },
        }
    }
}

/// The one-shot results document an experiment run writes at the end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentReport {
    /// Unique run identifier.
    pub run_id: Uuid,
    /// Wall-clock start of the run.
    pub started_at: DateTime<Utc>,
    /// Wall-clock end of the run.
    pub finished_at: DateTime<Utc>,
    /// Decision strategy label.
    pub model_variant: String,
    /// Ambiguity filter the scenario pool was narrowed to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ambiguity_filter: Option<crate::scenario::AmbiguityKind>,
    /// Per-episode records.
    pub episodes: Vec<InteractionLog>,
    /// Aggregate statistics.
    pub summary: ExperimentSummary,
}
