use std::fmt::Write as _;

use friction_agents::{ActionIntent, ActionKind, FrictionType, Intent};
use friction_world::{geometry, MotionStep, WorldModel};

/// Default translation when the agent gives no distance.
const DEFAULT_MOVE_DISTANCE: f64 = 0.5;
/// Default rotation when the agent gives no magnitude.
const DEFAULT_TURN_DEGREES: f64 = 90.0;
/// How far short of a navigation target the robot plans to stop.
const NAV_STOP_SHORT: f64 = 0.4;

/// A clarifying question addressed to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clarification {
    /// The question text.
    pub question: String,
    /// Self-reported friction label.
    pub friction: FrictionType,
}

/// A fully planned robot turn: the rendered description that goes into the
/// action history, the motion steps for the world, and any conversational
/// side channel (speech, clarification, scan announcement).
#[derive(Debug, Clone, Default)]
pub struct ParsedAction {
    /// Human-readable rendering, e.g. "turned right 90°, then moved forward 1.2m".
    pub description: String,
    /// Motion steps in execution order.
    pub motion: Vec<MotionStep>,
    /// Plain speech to relay to the user.
    pub speech: Option<String>,
    /// Clarifying question; pauses the turn loop for a user reply.
    pub clarification: Option<Clarification>,
    /// Object announced in a 360° scan.
    pub scan_target: Option<String>,
    /// Whether the robot chose to describe its camera view aloud.
    pub describe: bool,
}

/// Plans a structured intent against the current world. Planning never
/// mutates the world; execution happens in the orchestrator through
/// [`WorldModel::apply_motion`].
pub struct ActionParser;

impl ActionParser {
    /// Turns an intent into an executable plan. Sequences are flattened in
    /// order; their descriptions are joined with ", then ". A clarification
    /// anywhere in the intent halts the turn: the question is the entire
    /// plan and no motion survives, whatever else the sequence asked for.
    #[must_use]
    pub fn parse(intent: &Intent, world: &WorldModel) -> ParsedAction {
        let mut plan = ParsedAction::default();
        let mut parts: Vec<String> = Vec::new();

        for action in intent.actions() {
            let part = Self::plan_action(action, world, &mut plan);
            if plan.clarification.is_some() {
                return ParsedAction {
                    description: part,
                    clarification: plan.clarification,
                    ..ParsedAction::default()
                };
            }
            parts.push(part);
        }
        if let Some(text) = intent.text() {
            if plan.speech.is_none() {
                plan.speech = Some(text.to_string());
            }
        }
        if parts.is_empty() {
            parts.push("stopped".into());
        }
        plan.description = parts.join(", then ");
        plan
    }

    fn plan_action(action: &ActionIntent, world: &WorldModel, plan: &mut ParsedAction) -> String {
        match action.action {
            ActionKind::Forward => {
                let distance = action.distance.unwrap_or(DEFAULT_MOVE_DISTANCE);
                plan.motion.push(MotionStep::Forward { distance });
                format!("moved forward {distance:.1}m")
            }
            ActionKind::Backward => {
                let distance = action.distance.unwrap_or(DEFAULT_MOVE_DISTANCE);
                plan.motion.push(MotionStep::Backward { distance });
                format!("moved backward {distance:.1}m")
            }
            ActionKind::TurnLeft => {
                let degrees = action.degrees.unwrap_or(DEFAULT_TURN_DEGREES);
                plan.motion.push(MotionStep::TurnLeft { degrees });
                format!("turned left {degrees:.0}°")
            }
            ActionKind::TurnRight => {
                let degrees = action.degrees.unwrap_or(DEFAULT_TURN_DEGREES);
                plan.motion.push(MotionStep::TurnRight { degrees });
                format!("turned right {degrees:.0}°")
            }
            ActionKind::Left => {
                let degrees = action.degrees.unwrap_or(DEFAULT_TURN_DEGREES);
                plan.motion.push(MotionStep::TurnLeft { degrees });
                Self::describe_shorthand("left", degrees, action.distance, &mut plan.motion)
            }
            ActionKind::Right => {
                let degrees = action.degrees.unwrap_or(DEFAULT_TURN_DEGREES);
                plan.motion.push(MotionStep::TurnRight { degrees });
                Self::describe_shorthand("right", degrees, action.distance, &mut plan.motion)
            }
            ActionKind::Stop | ActionKind::Unknown => "stopped".into(),
            ActionKind::Speak => {
                let message = action.message.clone().unwrap_or_default();
                let rendered = format!("said: '{message}'");
                plan.speech = Some(message);
                rendered
            }
            ActionKind::Clarify => {
                let question = action.message.clone().unwrap_or_default();
                let rendered = format!("asked: '{question}'");
                plan.clarification = Some(Clarification {
                    question,
                    friction: action.friction,
                });
                rendered
            }
            ActionKind::DescribeVision => {
                plan.describe = true;
                "described what it sees".into()
            }
            ActionKind::FindObject => {
                let target = action.target.clone().unwrap_or_else(|| "object".into());
                plan.motion.push(MotionStep::TurnRight { degrees: 360.0 });
                let rendered = format!("will perform 360° scan to find {target}");
                plan.scan_target = Some(target);
                rendered
            }
            ActionKind::SpatialNavigate => Self::plan_navigation(action, world, plan),
        }
    }

    fn describe_shorthand(
        side: &str,
        degrees: f64,
        distance: Option<f64>,
        motion: &mut Vec<MotionStep>,
    ) -> String {
        let mut rendered = format!("turned {side} {degrees:.0}°");
        if let Some(distance) = distance {
            motion.push(MotionStep::Forward { distance });
            let _ = write!(rendered, " and moved forward {distance:.1}m");
        }
        rendered
    }

    /// Plans a camera-guided approach: rotate to face the best-matching
    /// object, then close to [`NAV_STOP_SHORT`] of it. Objects the camera
    /// cannot currently see are not valid targets.
    fn plan_navigation(
        action: &ActionIntent,
        world: &WorldModel,
        plan: &mut ParsedAction,
    ) -> String {
        let target = action.target.clone().unwrap_or_default();
        let target_lower = target.to_lowercase();

        let candidate = world
            .sightings()
            .into_iter()
            .filter(|entry| entry.sighting.visible)
            .filter(|entry| {
                let name = world.objects()[entry.index].name.to_lowercase();
                name.contains(&target_lower) || target_lower.contains(&name)
            })
            .min_by(|a, b| a.sighting.distance.total_cmp(&b.sighting.distance));

        let Some(entry) = candidate else {
            plan.speech = Some(format!("I can't see any {target} from here."));
            return format!("looked for {target} but could not see it");
        };

        let obj = &world.objects()[entry.index];
        let bearing = geometry::bearing(world.robot_position(), obj.position);
        let mut delta = geometry::normalize_degrees(bearing - world.robot_orientation());
        if delta > 180.0 {
            delta -= 360.0;
        }
        if delta.abs() > 0.5 {
            if delta > 0.0 {
                plan.motion.push(MotionStep::TurnRight { degrees: delta });
            } else {
                plan.motion.push(MotionStep::TurnLeft { degrees: -delta });
            }
        }
        let approach = (entry.sighting.distance - NAV_STOP_SHORT).max(0.0);
        if approach > 0.01 {
            plan.motion.push(MotionStep::Forward { distance: approach });
        }
        format!(
            "navigated to {} (adjusted {delta:.0}°, moved {approach:.1}m)",
            obj.name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use friction_world::{Point, Pose, SceneObject, SceneStructure};

    fn world_with(objects: Vec<SceneObject>) -> WorldModel {
        let scene = SceneStructure {
            scene_text: "Test scene".into(),
            robot_initial: Pose::new(Point::new(0.0, 0.0), 0.0),
            objects,
            hazards: vec![],
        };
        WorldModel::new(&scene, "test goal")
    }

    #[test]
    fn sequence_joins_descriptions_in_order() {
        let world = world_with(vec![]);
        let intent = Intent::Sequence {
            actions: vec![
                ActionIntent::turn(ActionKind::TurnRight, 90.0),
                ActionIntent::movement(ActionKind::Forward, 1.2),
            ],
            text: Some("Heading over.".into()),
        };
        let plan = ActionParser::parse(&intent, &world);
        assert_eq!(plan.description, "turned right 90°, then moved forward 1.2m");
        assert_eq!(plan.motion.len(), 2);
        assert_eq!(plan.speech.as_deref(), Some("Heading over."));
    }

    #[test]
    fn movement_defaults_apply() {
        let world = world_with(vec![]);
        let plan = ActionParser::parse(
            &Intent::Single(ActionIntent::new(ActionKind::Forward)),
            &world,
        );
        assert_eq!(plan.description, "moved forward 0.5m");
        assert_eq!(
            plan.motion,
            vec![MotionStep::Forward { distance: DEFAULT_MOVE_DISTANCE }]
        );
    }

    #[test]
    fn clarification_produces_no_motion() {
        let world = world_with(vec![]);
        let plan = ActionParser::parse(
            &Intent::Single(ActionIntent::clarify(
                "Which cup do you mean?",
                FrictionType::Probing,
            )),
            &world,
        );
        assert_eq!(plan.description, "asked: 'Which cup do you mean?'");
        assert!(plan.motion.is_empty());
        assert_eq!(
            plan.clarification.as_ref().unwrap().friction,
            FrictionType::Probing
        );
    }

    #[test]
    fn clarification_in_a_sequence_cancels_all_motion() {
        let world = world_with(vec![]);
        let intent = Intent::Sequence {
            actions: vec![
                ActionIntent::movement(ActionKind::Forward, 1.0),
                ActionIntent::clarify("Left or right around it?", FrictionType::Probing),
                ActionIntent::movement(ActionKind::Forward, 1.0),
            ],
            text: Some("On it.".into()),
        };
        let plan = ActionParser::parse(&intent, &world);
        assert!(plan.motion.is_empty());
        assert!(plan.speech.is_none());
        assert_eq!(plan.description, "asked: 'Left or right around it?'");
        assert_eq!(
            plan.clarification.as_ref().unwrap().friction,
            FrictionType::Probing
        );
    }

    #[test]
    fn navigation_turns_toward_and_stops_short() {
        // Cup 2m away, 45° to the robot's right.
        let world = world_with(vec![SceneObject::new(
            "red cup",
            2.0 * std::f64::consts::FRAC_1_SQRT_2,
            2.0 * std::f64::consts::FRAC_1_SQRT_2,
        )]);
        let intent = Intent::Single(ActionIntent {
            target: Some("cup".into()),
            ..ActionIntent::new(ActionKind::SpatialNavigate)
        });
        let plan = ActionParser::parse(&intent, &world);
        assert_eq!(plan.motion.len(), 2);
        assert!(matches!(
            plan.motion[0],
            MotionStep::TurnRight { degrees } if (degrees - 45.0).abs() < 0.1
        ));
        assert!(matches!(
            plan.motion[1],
            MotionStep::Forward { distance } if (distance - 1.6).abs() < 0.01
        ));
        assert!(plan.description.starts_with("navigated to red cup"));
    }

    #[test]
    fn navigation_to_unseen_object_plans_no_motion() {
        // Behind the robot, outside the forward cone.
        let world = world_with(vec![SceneObject::new("plant", 0.0, -2.0)]);
        let intent = Intent::Single(ActionIntent {
            target: Some("plant".into()),
            ..ActionIntent::new(ActionKind::SpatialNavigate)
        });
        let plan = ActionParser::parse(&intent, &world);
        assert!(plan.motion.is_empty());
        assert_eq!(plan.description, "looked for plant but could not see it");
        assert!(plan.speech.unwrap().contains("can't see"));
    }

    #[test]
    fn scan_announces_target_and_sweeps() {
        let world = world_with(vec![]);
        let intent = Intent::Single(ActionIntent {
            target: Some("phone".into()),
            ..ActionIntent::new(ActionKind::FindObject)
        });
        let plan = ActionParser::parse(&intent, &world);
        assert_eq!(plan.description, "will perform 360° scan to find phone");
        assert_eq!(plan.scan_target.as_deref(), Some("phone"));
        assert_eq!(plan.motion, vec![MotionStep::TurnRight { degrees: 360.0 }]);
    }
}
