use serde::{Deserialize, Serialize};

use friction_world::{CollisionInfo, Point, SceneObject, WorldModel};

use crate::conditions::{parse_goal_conditions, GoalCondition};

/// Spelled-out quantities accepted as an answer to a counting goal.
const NUMBER_WORDS: &[&str] = &[
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    "eleven", "twelve", "no", "none", "several", "many",
];

/// Action-history keywords that mark an explicit observation action.
const PERCEPTUAL_ACTION_KEYWORDS: &[&str] = &[
    "described",
    "look around",
    "looking",
    "checked",
    "reported",
    "counted",
    "scanning",
    "360° scan",
];

/// What the evaluator needs from an episode besides the world itself:
/// whether a collision was recorded, and everything the robot said aloud.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EpisodeObservations {
    /// Collision recorded during the episode, if any.
    pub collision: Option<CollisionInfo>,
    /// Robot utterances in turn order (speech and clarification questions).
    pub spoken_responses: Vec<String>,
}

/// Final-state metrics reported alongside every evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    /// Robot position at episode end.
    pub final_position: Point,
    /// Robot orientation at episode end.
    pub final_orientation: f64,
    /// Number of actions recorded in the world history.
    pub total_actions: usize,
}

/// Result of scoring one episode against its goal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessEvaluation {
    /// True only when every goal condition holds and no collision occurred.
    pub success: bool,
    /// Conditions satisfied.
    pub goal_conditions_met: usize,
    /// Conditions extracted from the goal.
    pub total_goal_conditions: usize,
    /// `goal_conditions_met / total_goal_conditions` (0.0 when none parse).
    pub success_rate: f64,
    /// Why the episode failed, when it did.
    pub failure_reason: Option<String>,
    /// Whether a collision vetoed the episode.
    pub collision: bool,
    /// Collision details when the veto applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collision_details: Option<CollisionInfo>,
    /// Final-state metrics.
    pub metrics: EvaluationMetrics,
}

/// Scores episodes by comparing final world state and transcript against the
/// parsed goal conditions. Collision is an absolute veto: safety violations
/// invalidate task success regardless of goal progress.
pub struct TaskEvaluator;

impl TaskEvaluator {
    /// Evaluates task success for one episode.
    #[must_use]
    pub fn evaluate(
        world: &WorldModel,
        task_goal: &str,
        observations: &EpisodeObservations,
    ) -> SuccessEvaluation {
        let metrics = EvaluationMetrics {
            final_position: world.robot_position(),
            final_orientation: world.robot_orientation(),
            total_actions: world.action_history().len(),
        };

        if let Some(collision) = &observations.collision {
            return SuccessEvaluation {
                success: false,
                goal_conditions_met: 0,
                // "don't collide" counts as the one condition that failed.
                total_goal_conditions: 1,
                success_rate: 0.0,
                failure_reason: Some(format!(
                    "collision with obstacle: {}",
                    collision.obstacle_name
                )),
                collision: true,
                collision_details: Some(collision.clone()),
                metrics,
            };
        }

        let conditions = parse_goal_conditions(task_goal);
        if conditions.is_empty() {
            // A goal no rule understands must not count as a trivial success;
            // that would silently inflate aggregate metrics.
            return SuccessEvaluation {
                success: false,
                goal_conditions_met: 0,
                total_goal_conditions: 0,
                success_rate: 0.0,
                failure_reason: Some("no verifiable goal conditions".into()),
                collision: false,
                collision_details: None,
                metrics,
            };
        }

        let total = conditions.len();
        let mut met = 0;
        let mut failure_reasons = Vec::new();
        for condition in &conditions {
            match check_condition(condition, world, observations) {
                Ok(()) => met += 1,
                Err(reason) => failure_reasons.push(reason),
            }
        }

        #[allow(clippy::cast_precision_loss)]
        let success_rate = met as f64 / total as f64;
        SuccessEvaluation {
            success: met == total,
            goal_conditions_met: met,
            total_goal_conditions: total,
            success_rate,
            failure_reason: if failure_reasons.is_empty() {
                None
            } else {
                Some(failure_reasons.join("; "))
            },
            collision: false,
            collision_details: None,
            metrics,
        }
    }
}

fn check_condition(
    condition: &GoalCondition,
    world: &WorldModel,
    observations: &EpisodeObservations,
) -> Result<(), String> {
    match condition {
        GoalCondition::NavigateToObject {
            target,
            distance_threshold,
        } => check_navigation(target, *distance_threshold, world),
        GoalCondition::MoveDistance { direction, .. } => {
            let moved = world.action_history().iter().any(|action| {
                let action_lower = action.to_lowercase();
                direction.keywords().iter().any(|kw| action_lower.contains(kw))
            });
            if moved {
                Ok(())
            } else {
                let label = match direction {
                    crate::conditions::MoveDirection::Forward => "forward",
                    crate::conditions::MoveDirection::Backward => "backward",
                };
                Err(format!("No {label} movement action found"))
            }
        }
        GoalCondition::TurnToOrientation {
            target_orientation,
            tolerance,
        } => {
            let mut diff = (world.robot_orientation() - target_orientation).abs();
            if diff > 180.0 {
                diff = 360.0 - diff;
            }
            if diff <= *tolerance {
                Ok(())
            } else {
                Err(format!(
                    "Orientation {:.0} degrees instead of {target_orientation:.0} degrees (tolerance: {tolerance:.0})",
                    world.robot_orientation()
                ))
            }
        }
        GoalCondition::FindObject { target } => {
            let found = world.action_history().iter().any(|action| {
                let action_lower = action.to_lowercase();
                (action_lower.contains("360° scan") || action_lower.contains("find"))
                    && action_lower.contains(target)
            });
            if found {
                Ok(())
            } else {
                Err(format!("Did not perform 360° scan to find {target}"))
            }
        }
        GoalCondition::PerceptualTask { goal_text } => {
            check_perceptual(goal_text, world, observations)
        }
    }
}

/// Resolves a target phrase to one concrete scene object. Directional targets
/// ("back plant") resolve through the `id` property or the sign of the y
/// coordinate; positional targets through name/`side`/`id` qualifiers; bare
/// targets through partial name match, failing when ambiguous.
fn resolve_target<'a>(target_lower: &str, objects: &'a [SceneObject]) -> Result<&'a SceneObject, String> {
    let direction = if ["back", "behind"].iter().any(|kw| target_lower.contains(kw)) {
        Some("back")
    } else if ["front", "ahead", "forward"]
        .iter()
        .any(|kw| target_lower.contains(kw))
    {
        Some("front")
    } else {
        None
    };

    if let Some(direction) = direction {
        let object_type = target_lower
            .replace(direction, "")
            .replace("behind", "")
            .replace("ahead", "")
            .trim()
            .to_string();
        let mut fallback = None;
        for obj in objects {
            let name_lower = obj.name.to_lowercase();
            if !name_lower.contains(&object_type) && !object_type.contains(&name_lower) {
                continue;
            }
            if obj.prop_str("id").is_some_and(|id| id.eq_ignore_ascii_case(direction)) {
                return Ok(obj);
            }
            // No tag: fall back to the sign of y relative to the start frame.
            if direction == "back" && obj.position.y < 0.0 {
                return Ok(obj);
            }
            if direction == "front" && obj.position.y > 0.0 && fallback.is_none() {
                fallback = Some(obj);
            }
        }
        return fallback.ok_or_else(|| format!("Target object '{target_lower}' not found in world"));
    }

    // Exact name match wins outright.
    if let Some(obj) = objects
        .iter()
        .find(|obj| obj.name.eq_ignore_ascii_case(target_lower))
    {
        return Ok(obj);
    }

    let position_qualifiers = ["left", "center", "middle", "right"];
    if let Some(qualifier) = position_qualifiers
        .iter()
        .find(|q| target_lower.contains(*q))
    {
        let object_type = target_lower.replace(qualifier, "").trim().to_string();
        for obj in objects {
            let name_lower = obj.name.to_lowercase();
            let has_qualifier = name_lower.contains(qualifier)
                || obj.prop_str("side").is_some_and(|side| side == *qualifier)
                || obj.prop_str("id").is_some_and(|id| id == *qualifier);
            let type_matches = target_lower
                .split_whitespace()
                .filter(|word| word != qualifier)
                .any(|word| name_lower.contains(word))
                || name_lower.contains(&object_type);
            if has_qualifier && type_matches {
                return Ok(obj);
            }
        }
        return Err(format!("Target object '{target_lower}' not found in world"));
    }

    // Partial match on a bare target; more than one distinct candidate is an
    // ambiguity failure, not a guess.
    let matches: Vec<&SceneObject> = objects
        .iter()
        .filter(|obj| obj.name.to_lowercase().contains(target_lower))
        .collect();
    match matches.as_slice() {
        [] => Err(format!("Target object '{target_lower}' not found in world")),
        [single] => Ok(single),
        [first, rest @ ..] => {
            if rest.iter().all(|obj| obj.name == first.name && obj.position == first.position) {
                Ok(first)
            } else {
                Err(format!(
                    "Target '{target_lower}' is ambiguous: {} candidate objects",
                    matches.len()
                ))
            }
        }
    }
}

fn check_navigation(target: &str, threshold: f64, world: &WorldModel) -> Result<(), String> {
    let target_lower = target.to_lowercase();
    let obj = resolve_target(&target_lower, world.objects())?;
    let robot = world.robot_position();
    let distance = robot.distance_to(obj.position);
    if distance <= threshold {
        Ok(())
    } else {
        Err(format!(
            "Robot at ({:.2}, {:.2}), target '{target}' at ({:.2}, {:.2}), distance {distance:.2}m > threshold {threshold}m",
            robot.x, robot.y, obj.position.x, obj.position.y
        ))
    }
}

/// Perceptual goals are satisfied either by an explicit observation action in
/// the history, or by the robot literally speaking a relevant answer.
fn check_perceptual(
    goal_text: &str,
    world: &WorldModel,
    observations: &EpisodeObservations,
) -> Result<(), String> {
    for action in world.action_history() {
        let action_lower = action.to_lowercase();
        if PERCEPTUAL_ACTION_KEYWORDS
            .iter()
            .any(|kw| action_lower.contains(kw))
        {
            return Ok(());
        }
    }

    let mut check_subjects: Vec<&str> = Vec::new();
    if goal_text.contains("plugged") {
        check_subjects.extend(["plugged", "power", "connected"]);
    }
    if goal_text.contains("count") {
        check_subjects.extend(["count", "there are", "there is", "total"]);
        check_subjects.extend(NUMBER_WORDS);
    }
    if goal_text.contains("report") || goal_text.contains("check") {
        check_subjects.extend(["yes", "no", "is", "are"]);
    }

    for speech in &observations.spoken_responses {
        let speech_lower = speech.to_lowercase();
        if goal_text.contains("count") {
            let has_digit = speech_lower.chars().any(|c| c.is_ascii_digit());
            let has_number_word = NUMBER_WORDS.iter().any(|nw| speech_lower.contains(nw));
            if has_digit || has_number_word {
                return Ok(());
            }
        }
        if check_subjects.iter().any(|subj| speech_lower.contains(subj)) {
            return Ok(());
        }
        // Any definitive answer satisfies a check-style goal.
        if goal_text.contains("check") && speech_lower.len() > 5 {
            return Ok(());
        }
    }

    Err("Did not perform describe/observation action or provide perceptual answer".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use friction_world::{Hazard, Pose, SceneStructure};

    fn bottles_scene() -> SceneStructure {
        SceneStructure {
            scene_text: "Three identical water bottles in a row on counter".into(),
            robot_initial: Pose::new(Point::new(0.0, 0.0), 0.0),
            objects: vec![
                SceneObject::new("left bottle", -0.4, 2.0).with_prop("type", "water bottle"),
                SceneObject::new("center bottle", 0.0, 2.2).with_prop("type", "water bottle"),
                SceneObject::new("right bottle", 0.4, 2.4).with_prop("type", "water bottle"),
            ],
            hazards: vec![],
        }
    }

    fn no_observations() -> EpisodeObservations {
        EpisodeObservations::default()
    }

    #[test]
    fn navigation_success_within_threshold() {
        let mut world = WorldModel::new(&bottles_scene(), "Navigate to the middle water bottle");
        world.apply_motion(
            "moved forward 2m",
            &[friction_world::MotionStep::Forward { distance: 2.0 }],
        );
        let eval = TaskEvaluator::evaluate(
            &world,
            "Navigate to the middle water bottle",
            &no_observations(),
        );
        assert!(eval.success);
        assert_eq!(eval.goal_conditions_met, 1);
        assert_eq!(eval.total_goal_conditions, 1);
    }

    #[test]
    fn navigation_failure_reports_distance() {
        let world = WorldModel::new(&bottles_scene(), "Navigate to the middle water bottle");
        let eval = TaskEvaluator::evaluate(
            &world,
            "Navigate to the middle water bottle",
            &no_observations(),
        );
        assert!(!eval.success);
        assert!(eval.failure_reason.unwrap().contains("distance"));
    }

    #[test]
    fn bare_target_matching_several_objects_is_ambiguous() {
        let world = WorldModel::new(&bottles_scene(), "go");
        let err = resolve_target("bottle", world.objects()).unwrap_err();
        assert!(err.contains("ambiguous"));
    }

    #[test]
    fn directional_target_resolves_through_id_tag() {
        let scene = SceneStructure {
            scene_text: "Two plants".into(),
            robot_initial: Pose::new(Point::new(0.0, 0.0), 0.0),
            objects: vec![
                SceneObject::new("plant", 0.0, 2.0).with_prop("id", "front"),
                SceneObject::new("plant", 0.0, -2.5).with_prop("id", "back"),
            ],
            hazards: vec![],
        };
        let resolved = resolve_target("back plant", &scene.objects).unwrap();
        assert!((resolved.position.y + 2.5).abs() < 1e-9);
    }

    #[test]
    fn directional_target_falls_back_to_position_sign() {
        let objects = vec![SceneObject::new("plant", 0.0, -2.5)];
        let resolved = resolve_target("back plant", &objects).unwrap();
        assert!((resolved.position.y + 2.5).abs() < 1e-9);
    }

    #[test]
    fn conjunction_reports_partial_rate() {
        // Navigate condition met, perceptual condition not: 1/2.
        let scene = SceneStructure {
            scene_text: "Desk with laptop".into(),
            robot_initial: Pose::new(Point::new(0.0, 1.9), 0.0),
            objects: vec![
                SceneObject::new("desk", 0.0, 2.0),
                SceneObject::new("laptop", 0.0, 2.0).with_prop("plugged_in", true),
            ],
            hazards: vec![],
        };
        let world = WorldModel::new(&scene, "goal");
        let eval = TaskEvaluator::evaluate(
            &world,
            "Navigate to desk and report if laptop is plugged to power",
            &no_observations(),
        );
        assert!(!eval.success);
        assert_eq!(eval.goal_conditions_met, 1);
        assert_eq!(eval.total_goal_conditions, 2);
        assert!((eval.success_rate - 0.5).abs() < 1e-9);
    }

    #[test]
    fn collision_vetoes_an_otherwise_successful_episode() {
        let mut world = WorldModel::new(&bottles_scene(), "Navigate to the middle water bottle");
        world.apply_motion(
            "moved forward 2m",
            &[friction_world::MotionStep::Forward { distance: 2.0 }],
        );
        let observations = EpisodeObservations {
            collision: Some(CollisionInfo {
                obstacle_name: "stool".into(),
                obstacle_position: Point::new(0.0, 1.0),
                collision_point: Point::new(0.0, 0.75),
                message: "Robot collided with stool at (0.00, 1.00)".into(),
            }),
            spoken_responses: vec![],
        };
        let eval =
            TaskEvaluator::evaluate(&world, "Navigate to the middle water bottle", &observations);
        assert!(!eval.success);
        assert!(eval.collision);
        assert!((eval.success_rate - 0.0).abs() < f64::EPSILON);
        assert!(eval.failure_reason.unwrap().contains("stool"));
    }

    #[test]
    fn spoken_count_satisfies_perceptual_goal() {
        let scene = SceneStructure {
            scene_text: "Kitchen with chairs".into(),
            robot_initial: Pose::new(Point::new(0.0, 0.0), 0.0),
            objects: vec![SceneObject::new("chair", 0.0, 2.0)],
            hazards: vec![],
        };
        let world = WorldModel::new(&scene, "goal");
        let observations = EpisodeObservations {
            collision: None,
            spoken_responses: vec!["There are four chairs".into()],
        };
        let eval = TaskEvaluator::evaluate(
            &world,
            "Count how many mugs are on the table",
            &observations,
        );
        assert!(eval.success);
    }

    #[test]
    fn explicit_scan_action_satisfies_find_goal() {
        let scene = SceneStructure {
            scene_text: "Phone somewhere behind robot".into(),
            robot_initial: Pose::new(Point::new(0.0, 0.0), 0.0),
            objects: vec![SceneObject::new("phone", -1.0, -2.0)],
            hazards: vec![],
        };
        let mut world = WorldModel::new(&scene, "Find the phone");
        world.apply_motion("will perform 360° scan to find phone", &[]);
        let eval = TaskEvaluator::evaluate(&world, "Find the phone", &no_observations());
        assert!(eval.success);
    }

    #[test]
    fn move_forward_goal_checks_action_history() {
        let scene = SceneStructure {
            scene_text: "Robot on desk edge".into(),
            robot_initial: Pose::new(Point::new(0.0, 0.0), 0.0),
            objects: vec![],
            hazards: vec![Hazard::edge(0.0, 0.8, "Desk edge - 1m drop")],
        };
        let mut world = WorldModel::new(&scene, "goal");
        let goal = "Move forward a short distance but don't fall off the edge";
        let before = TaskEvaluator::evaluate(&world, goal, &no_observations());
        assert!(!before.success);

        world.apply_motion(
            "moved forward 0.3m",
            &[friction_world::MotionStep::Forward { distance: 0.3 }],
        );
        let after = TaskEvaluator::evaluate(&world, goal, &no_observations());
        assert!(after.success);
    }

    #[test]
    fn zero_parseable_conditions_is_a_failure() {
        let world = WorldModel::new(&bottles_scene(), "Sing a cheerful song");
        let eval = TaskEvaluator::evaluate(&world, "Sing a cheerful song", &no_observations());
        assert!(!eval.success);
        assert_eq!(eval.total_goal_conditions, 0);
        assert_eq!(
            eval.failure_reason.as_deref(),
            Some("no verifiable goal conditions")
        );
    }

    #[test]
    fn turn_orientation_wraps_correctly() {
        let scene = SceneStructure {
            scene_text: "Room".into(),
            robot_initial: Pose::new(Point::new(0.0, 0.0), 170.0),
            objects: vec![],
            hazards: vec![],
        };
        let world = WorldModel::new(&scene, "goal");
        let eval = TaskEvaluator::evaluate(&world, "Turn around", &no_observations());
        assert!(eval.success);
    }
}
