use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::target::extract_target;

/// Direction of a distance-based movement goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveDirection {
    /// Along the robot's heading.
    Forward,
    /// Against the robot's heading.
    Backward,
}

impl MoveDirection {
    /// Action-history keywords that satisfy this direction.
    #[must_use]
    pub const fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::Forward => &["moved forward", "forward"],
            Self::Backward => &["moved backward", "backward", "back up"],
        }
    }
}

/// One verifiable predicate extracted from a natural-language goal. A goal
/// may decompose into several; all must hold for success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum GoalCondition {
    /// Robot must end within `distance_threshold` meters of the target.
    NavigateToObject {
        /// Target phrase, e.g. "center bottle".
        target: String,
        /// Success radius in meters.
        distance_threshold: f64,
    },
    /// Robot must have performed a movement action in the given direction.
    MoveDistance {
        /// Required direction.
        direction: MoveDirection,
        /// Requested distance in meters (recorded for reporting).
        target_distance: f64,
        /// Accepted deviation in meters (recorded for reporting).
        tolerance: f64,
    },
    /// Robot must end near the target heading.
    TurnToOrientation {
        /// Target heading in degrees.
        target_orientation: f64,
        /// Accepted deviation in degrees.
        tolerance: f64,
    },
    /// Robot must have performed a search action naming the target.
    FindObject {
        /// Object to find.
        target: String,
    },
    /// Robot must have observed/answered (describe, count, check, report).
    PerceptualTask {
        /// Full lowercased goal, kept for answer-content matching.
        goal_text: String,
    },
}

static WITHIN_METERS: Lazy<Regex> = Lazy::new(|| Regex::new(r"within\s+(\d+\.?\d*)\s*m").unwrap());
static METER_COUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+\.?\d*)\s*meter").unwrap());
static FIND_NOUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"find.*?(phone|keys|cup|bottle|bag|book|box)").unwrap());

type Rule = fn(&str) -> Option<Vec<GoalCondition>>;

/// Ordered rule table. The first matching rule claims the goal; order encodes
/// precedence (perceptual phrasing outranks plain navigation because goals
/// like "navigate to desk and count chairs" carry both).
const RULES: &[Rule] = &[
    perceptual_rule,
    find_rule,
    navigate_rule,
    move_distance_rule,
    turn_around_rule,
];

/// Parses a goal into its conjunctive condition set. Returns an empty vector
/// when no rule matches and no fallback target can be extracted.
#[must_use]
pub fn parse_goal_conditions(task_goal: &str) -> Vec<GoalCondition> {
    let goal_lower = task_goal.to_lowercase();
    for rule in RULES {
        if let Some(conditions) = rule(&goal_lower) {
            return conditions;
        }
    }
    // Best-effort fallback: treat whatever noun phrase we can find as a
    // navigation target with a tight threshold.
    extract_target(&goal_lower)
        .map(|target| {
            vec![GoalCondition::NavigateToObject {
                target,
                distance_threshold: 0.5,
            }]
        })
        .unwrap_or_default()
}

fn perceptual_rule(goal_lower: &str) -> Option<Vec<GoalCondition>> {
    let is_perceptual = ["describe", "report", "check", "count"]
        .iter()
        .any(|kw| goal_lower.contains(kw));
    if !is_perceptual {
        return None;
    }
    let mut conditions = vec![GoalCondition::PerceptualTask {
        goal_text: goal_lower.to_string(),
    }];
    // Goals like "navigate to desk and report ..." also carry a loose
    // navigation component.
    if goal_lower.contains("navigate to") || goal_lower.contains("go to") {
        if let Some(target) = extract_target(goal_lower) {
            conditions.push(GoalCondition::NavigateToObject {
                target,
                distance_threshold: 2.0,
            });
        }
    }
    Some(conditions)
}

fn find_rule(goal_lower: &str) -> Option<Vec<GoalCondition>> {
    if !goal_lower.contains("find") {
        return None;
    }
    Some(
        FIND_NOUN
            .captures(goal_lower)
            .map(|caps| {
                vec![GoalCondition::FindObject {
                    target: caps[1].to_string(),
                }]
            })
            .unwrap_or_default(),
    )
}

fn navigate_rule(goal_lower: &str) -> Option<Vec<GoalCondition>> {
    let is_navigation = ["navigate", "go to", "toward"]
        .iter()
        .any(|kw| goal_lower.contains(kw));
    if !is_navigation {
        return None;
    }
    let target = extract_target(goal_lower)?;
    let mut distance_threshold = 0.8;
    if goal_lower.contains("very close") || goal_lower.contains("within") {
        distance_threshold = WITHIN_METERS
            .captures(goal_lower)
            .and_then(|caps| caps[1].parse().ok())
            .unwrap_or(0.5);
    }
    Some(vec![GoalCondition::NavigateToObject {
        target,
        distance_threshold,
    }])
}

fn move_distance_rule(goal_lower: &str) -> Option<Vec<GoalCondition>> {
    let direction = if goal_lower.contains("move forward") {
        MoveDirection::Forward
    } else if goal_lower.contains("move backward") {
        MoveDirection::Backward
    } else {
        return None;
    };
    let condition = METER_COUNT.captures(goal_lower).map_or(
        GoalCondition::MoveDistance {
            direction,
            target_distance: 0.5,
            tolerance: 0.5,
        },
        |caps| GoalCondition::MoveDistance {
            direction,
            target_distance: caps[1].parse().unwrap_or(0.5),
            tolerance: 0.3,
        },
    );
    Some(vec![condition])
}

fn turn_around_rule(goal_lower: &str) -> Option<Vec<GoalCondition>> {
    if goal_lower.contains("turn around") || goal_lower.contains("180") {
        Some(vec![GoalCondition::TurnToOrientation {
            target_orientation: 180.0,
            tolerance: 30.0,
        }])
    } else {
        None
    }
}
