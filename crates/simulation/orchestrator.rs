use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;
use chrono::Utc;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use uuid::Uuid;

use friction_agents::{DecisionAgent, DecisionContext, FrictionType, SimulatedUser};
use friction_evaluator::{EpisodeObservations, TaskEvaluator};
use friction_world::WorldModel;

use crate::action_parser::ActionParser;
use crate::episode::{ExperimentReport, ExperimentSummary, InteractionLog, TurnRecord};
use crate::scenario::{AmbiguityKind, TaskScenario};
use crate::session::CommandGate;
use crate::telemetry::HarnessTelemetry;
use crate::vision::SimulatedVision;

/// Knobs for the turn loop and experiment runner.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Robot turns per episode before the episode is cut off.
    pub max_turns: usize,
    /// Pause between episodes, to pace API-backed runs.
    pub inter_episode_delay: Duration,
    /// Dump the full world state to the log every turn.
    pub debug_state: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            max_turns: 6,
            inter_episode_delay: Duration::from_millis(500),
            debug_state: false,
        }
    }
}

/// Runs robot/user conversations over simulated worlds and batches them
/// into experiment reports.
pub struct Simulator {
    config: SimulatorConfig,
    telemetry: HarnessTelemetry,
    gate: CommandGate,
}

impl Simulator {
    /// Creates a simulator.
    #[must_use]
    pub fn new(config: SimulatorConfig, telemetry: HarnessTelemetry) -> Self {
        Self {
            config,
            telemetry,
            gate: CommandGate::new(),
        }
    }

    /// Runs one episode: the user phrases the goal as a command, the agent
    /// acts one turn at a time, and the loop ends on user satisfaction, a
    /// collision, an agent/user error, or the turn cap. The returned log
    /// always carries a final evaluation unless command generation failed.
    pub async fn simulate_interaction(
        &self,
        scenario: &TaskScenario,
        agent: &mut dyn DecisionAgent,
        user: &mut SimulatedUser,
        variant_label: &str,
    ) -> InteractionLog {
        let mut world = WorldModel::new(&scenario.scene, &scenario.goal);
        let mut log = InteractionLog::new(scenario, variant_label);
        agent.reset();
        user.reset(&scenario.goal, world.full_state_description());

        let mut user_message = match user.generate_initial_command().await {
            Ok(command) => command,
            Err(err) => {
                self.telemetry
                    .error("user", &format!("command generation failed: {err}"));
                log.error = Some(err.to_string());
                return log;
            }
        };
        let mut spoken_responses: Vec<String> = Vec::new();

        for turn_index in 0..self.config.max_turns {
            let scene = world.scene_description_for_agent();
            let camera = SimulatedVision::camera_view(&world);
            if self.config.debug_state {
                self.telemetry.debug_state(&world.full_state_description());
            }

            let context = DecisionContext {
                scene: &scene,
                camera_view: &camera,
                user_message: &user_message,
                turn_index,
            };
            // The gate is claimed before the agent is consulted, so a busy
            // robot never costs the agent a decided intent.
            let Some(_guard) = self.gate.try_begin() else {
                // Only reachable if episodes were ever run concurrently on
                // one simulator; dropped commands are logged, not queued.
                self.telemetry.warn("session", "command dropped: robot busy");
                continue;
            };

            let intent = match agent.decide(&context).await {
                Ok(intent) => intent,
                Err(err) => {
                    self.telemetry
                        .error("agent", &format!("decision failed: {err}"));
                    log.error = Some(err.to_string());
                    break;
                }
            };

            let plan = ActionParser::parse(&intent, &world);
            let collision = world.apply_motion(&plan.description, &plan.motion);
            self.telemetry.turn(turn_index, &user_message, &plan.description);

            let robot_message = if let Some(clarification) = &plan.clarification {
                Some(clarification.question.clone())
            } else if plan.describe {
                Some(SimulatedVision::spoken_summary(&world))
            } else {
                plan.speech.clone()
            };
            if let Some(message) = &robot_message {
                spoken_responses.push(message.clone());
            }

            log.turns.push(TurnRecord {
                turn: turn_index,
                user_message: user_message.clone(),
                intent,
                action: plan.description.clone(),
                robot_message: robot_message.clone(),
                friction: plan
                    .clarification
                    .as_ref()
                    .map_or(FrictionType::None, |c| c.friction),
            });

            if let Some(collision) = collision {
                self.telemetry.collision(&collision);
                log.collision = Some(collision);
                break;
            }

            let state = world.full_state_description();
            if plan.clarification.is_some() {
                // Clarification turns wait for an answer and never count as
                // completing the task on their own.
                log.clarifications += 1;
                match user
                    .respond_to_robot(
                        &state,
                        robot_message.as_deref().unwrap_or(""),
                        &plan.description,
                        false,
                    )
                    .await
                {
                    Ok(Some(reply)) => user_message = reply,
                    Ok(None) => break,
                    Err(err) => {
                        self.telemetry
                            .error("user", &format!("response failed: {err}"));
                        log.error = Some(err.to_string());
                        break;
                    }
                }
            } else {
                // Action turns are graded immediately; a fully met goal ends
                // the episode without waiting for the user.
                let verdict = TaskEvaluator::evaluate(
                    &world,
                    &scenario.goal,
                    &EpisodeObservations {
                        collision: None,
                        spoken_responses: spoken_responses.clone(),
                    },
                );
                if verdict.success {
                    log.completed = true;
                    break;
                }
                let task_complete = user.goal_appears_complete(world.action_history());
                match user
                    .respond_to_robot(
                        &state,
                        robot_message.as_deref().unwrap_or(""),
                        &plan.description,
                        task_complete,
                    )
                    .await
                {
                    Ok(Some(reply)) => user_message = reply,
                    Ok(None) => {
                        log.completed = true;
                        break;
                    }
                    Err(err) => {
                        self.telemetry
                            .error("user", &format!("response failed: {err}"));
                        log.error = Some(err.to_string());
                        break;
                    }
                }
            }
        }

        log.total_turns = log.turns.len();
        let observations = EpisodeObservations {
            collision: log.collision.clone(),
            spoken_responses,
        };
        log.evaluation = Some(TaskEvaluator::evaluate(&world, &scenario.goal, &observations));
        self.telemetry.episode_finished(&log);
        log
    }

    /// Runs a batch of episodes over the given scenario pool, picking a
    /// scenario per episode with a seeded generator, and writes the full
    /// report to `output` once at the end of the run.
    #[allow(clippy::too_many_arguments)]
    pub async fn run_experiments(
        &self,
        agent: &mut dyn DecisionAgent,
        user: &mut SimulatedUser,
        variant_label: &str,
        scenarios: &[TaskScenario],
        ambiguity_filter: Option<AmbiguityKind>,
        episodes: usize,
        seed: u64,
        output: &Path,
    ) -> anyhow::Result<ExperimentReport> {
        anyhow::ensure!(!scenarios.is_empty(), "no scenarios to run");
        let started_at = Utc::now();
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut logs = Vec::with_capacity(episodes);

        for episode in 0..episodes {
            let scenario = &scenarios[rng.gen_range(0..scenarios.len())];
            self.telemetry
                .episode_started(episode, &scenario.id, variant_label);
            let log = self
                .simulate_interaction(scenario, agent, user, variant_label)
                .await;
            logs.push(log);
            if episode + 1 < episodes && !self.config.inter_episode_delay.is_zero() {
                tokio::time::sleep(self.config.inter_episode_delay).await;
            }
        }

        let report = ExperimentReport {
            run_id: Uuid::new_v4(),
            started_at,
            finished_at: Utc::now(),
            model_variant: variant_label.to_string(),
            ambiguity_filter,
            summary: ExperimentSummary::compute(&logs),
            episodes: logs,
        };

        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating results directory {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(output, json)
            .with_context(|| format!("writing results to {}", output.display()))?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::builtin_catalog;
    use friction_agents::{
        ActionIntent, ActionKind, Intent, ScriptedChat, ScriptedDecisionAgent,
    };
    use sim_logging::LogLevel;

    fn simulator(dir: &Path) -> Simulator {
        let telemetry =
            HarnessTelemetry::new(dir.join("run.log"), LogLevel::Debug, false).unwrap();
        Simulator::new(
            SimulatorConfig {
                inter_episode_delay: Duration::ZERO,
                ..SimulatorConfig::default()
            },
            telemetry,
        )
    }

    fn scenario_by_id(id: &str) -> TaskScenario {
        builtin_catalog()
            .into_iter()
            .find(|scenario| scenario.id == id)
            .unwrap()
    }

    fn scripted_user(replies: &[&str]) -> SimulatedUser {
        SimulatedUser::new(Box::new(ScriptedChat::new(replies.iter().copied())))
    }

    fn navigate(target: &str) -> Intent {
        Intent::Single(ActionIntent {
            target: Some(target.into()),
            ..ActionIntent::new(ActionKind::SpatialNavigate)
        })
    }

    #[tokio::test]
    async fn clarified_bottle_episode_succeeds_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let simulator = simulator(dir.path());
        let mut agent = ScriptedDecisionAgent::new([
            Intent::Single(ActionIntent::clarify(
                "Which bottle do you mean?",
                FrictionType::Probing,
            )),
            navigate("center bottle"),
        ]);
        // Initial command, then the answer to the clarification.
        let mut user = scripted_user(&["Go to the water bottle", "The middle one, please."]);

        let scenario = scenario_by_id("ref_002");
        let log = simulator
            .simulate_interaction(&scenario, &mut agent, &mut user, "friction")
            .await;

        assert_eq!(log.total_turns, 2);
        assert_eq!(log.clarifications, 1);
        assert!(log.completed);
        assert!(log.collision.is_none());
        let evaluation = log.evaluation.unwrap();
        assert!(evaluation.success, "{:?}", evaluation.failure_reason);
        assert_eq!(log.turns[0].friction, FrictionType::Probing);
    }

    #[tokio::test]
    async fn collision_ends_the_episode_and_fails_it() {
        let dir = tempfile::tempdir().unwrap();
        let simulator = simulator(dir.path());
        // Charges straight through the blocking chair.
        let mut agent = ScriptedDecisionAgent::new([Intent::Single(ActionIntent::movement(
            ActionKind::Forward,
            3.0,
        ))]);
        let mut user = scripted_user(&["Go over to the book"]);

        let scenario = scenario_by_id("traj_001");
        let log = simulator
            .simulate_interaction(&scenario, &mut agent, &mut user, "no_friction")
            .await;

        assert_eq!(log.total_turns, 1);
        assert!(!log.completed);
        let collision = log.collision.as_ref().unwrap();
        assert_eq!(collision.obstacle_name, "chair");
        let evaluation = log.evaluation.unwrap();
        assert!(!evaluation.success);
        assert!(evaluation.collision);
    }

    #[tokio::test]
    async fn turn_cap_bounds_an_episode_that_never_finishes() {
        let dir = tempfile::tempdir().unwrap();
        let simulator = simulator(dir.path());
        let stops = std::iter::repeat_with(|| {
            Intent::Single(ActionIntent::new(ActionKind::Stop))
        })
        .take(6);
        let mut agent = ScriptedDecisionAgent::new(stops);
        // One initial command plus a nagging reply per turn.
        let mut user = scripted_user(&[
            "Go to the book",
            "Go on then.",
            "You haven't moved.",
            "Still waiting.",
            "Please move.",
            "Anything at all.",
            "Hello?",
        ]);

        let scenario = scenario_by_id("traj_001");
        let log = simulator
            .simulate_interaction(&scenario, &mut agent, &mut user, "zero_shot")
            .await;

        assert_eq!(log.total_turns, 6);
        assert!(!log.completed);
        assert!(log.error.is_none());
        assert!(!log.evaluation.unwrap().success);
    }

    #[tokio::test]
    async fn busy_gate_skips_the_agent_entirely() {
        let dir = tempfile::tempdir().unwrap();
        let simulator = simulator(dir.path());
        let _held = simulator.gate.try_begin().unwrap();
        // An exhausted agent errors when consulted, so a clean log proves
        // the busy gate was checked first.
        let mut agent = ScriptedDecisionAgent::new([]);
        let mut user = scripted_user(&["Go to the book"]);

        let scenario = scenario_by_id("traj_001");
        let log = simulator
            .simulate_interaction(&scenario, &mut agent, &mut user, "friction")
            .await;

        assert_eq!(log.total_turns, 0);
        assert!(log.error.is_none());
    }

    #[tokio::test]
    async fn agent_error_is_recorded_and_still_evaluated() {
        let dir = tempfile::tempdir().unwrap();
        let simulator = simulator(dir.path());
        let mut agent = ScriptedDecisionAgent::new([]);
        let mut user = scripted_user(&["Go to the book"]);

        let scenario = scenario_by_id("traj_001");
        let log = simulator
            .simulate_interaction(&scenario, &mut agent, &mut user, "friction")
            .await;

        assert_eq!(log.total_turns, 0);
        assert!(log.error.is_some());
        assert!(log.evaluation.is_some());
    }

    #[tokio::test]
    async fn run_experiments_writes_the_report_once_at_the_end() {
        let dir = tempfile::tempdir().unwrap();
        let simulator = simulator(dir.path());
        let mut agent = ScriptedDecisionAgent::new([Intent::Single(ActionIntent::movement(
            ActionKind::Forward,
            0.3,
        ))]);
        let mut user = scripted_user(&["Creep forward a little, mind the edge"]);
        let scenarios = vec![scenario_by_id("safe_001")];
        let output = dir.path().join("results").join("report.json");

        let report = simulator
            .run_experiments(
                &mut agent,
                &mut user,
                "friction",
                &scenarios,
                Some(AmbiguityKind::Safety),
                1,
                7,
                &output,
            )
            .await
            .unwrap();

        assert_eq!(report.summary.total_episodes, 1);
        assert_eq!(report.summary.successes, 1);
        let written = std::fs::read_to_string(&output).unwrap();
        let parsed: ExperimentReport = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed.episodes.len(), 1);
        assert_eq!(parsed.episodes[0].scenario_id, "safe_001");
    }

    #[tokio::test]
    async fn empty_scenario_pool_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let simulator = simulator(dir.path());
        let mut agent = ScriptedDecisionAgent::new([]);
        let mut user = scripted_user(&[]);
        let result = simulator
            .run_experiments(
                &mut agent,
                &mut user,
                "friction",
                &[],
                None,
                1,
                0,
                &dir.path().join("report.json"),
            )
            .await;
        assert!(result.is_err());
    }
}
