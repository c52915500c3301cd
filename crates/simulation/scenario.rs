use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use friction_world::{Hazard, Point, Pose, SceneObject, SceneStructure};

/// Why a scenario's command is hard to execute literally. Drives scenario
/// filtering and per-category reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityKind {
    /// Several objects match the reference ("the cup" with two cups).
    Referential,
    /// The obvious path is blocked or unsafe to follow literally.
    Trajectory,
    /// Acting literally risks a fall or collision.
    Safety,
    /// The task needs a step the command never states (turn, scan).
    ImplicitPrecondition,
    /// The command depends on a frame of reference ("behind you").
    Orientation,
    /// Unambiguous control scenario.
    None,
}

impl AmbiguityKind {
    /// All kinds, in reporting order.
    pub const ALL: [Self; 6] = [
        Self::Referential,
        Self::Trajectory,
        Self::Safety,
        Self::ImplicitPrecondition,
        Self::Orientation,
        Self::None,
    ];
}

impl std::fmt::Display for AmbiguityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Referential => "referential",
            Self::Trajectory => "trajectory",
            Self::Safety => "safety",
            Self::ImplicitPrecondition => "implicit_precondition",
            Self::Orientation => "orientation",
            Self::None => "none",
        };
        f.write_str(name)
    }
}

impl FromStr for AmbiguityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "referential" => Ok(Self::Referential),
            "trajectory" => Ok(Self::Trajectory),
            "safety" => Ok(Self::Safety),
            "implicit_precondition" => Ok(Self::ImplicitPrecondition),
            "orientation" => Ok(Self::Orientation),
            "none" => Ok(Self::None),
            other => Err(format!("unknown ambiguity kind '{other}'")),
        }
    }
}

/// One evaluation scenario: a scene fixture plus the ground-truth goal the
/// episode is scored against. The simulated user sees the goal; the robot
/// only hears whatever command the user phrases from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskScenario {
    /// Stable identifier, e.g. "ref_002".
    pub id: String,
    /// Short human-readable title.
    pub title: String,
    /// Ambiguity category.
    pub ambiguity: AmbiguityKind,
    /// Ground-truth goal used for command generation and evaluation.
    pub goal: String,
    /// Scene fixture.
    pub scene: SceneStructure,
}

/// Scenario loading failures.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// Could not read the scenario file.
    #[error("failed to read scenario file: {0}")]
    Io(#[from] std::io::Error),
    /// The file was not a valid scenario list.
    #[error("failed to parse scenario file: {0}")]
    Parse(#[from] serde_json::Error),
    /// The file parsed but contained no scenarios.
    #[error("scenario file contained no scenarios")]
    Empty,
}

/// Loads scenarios from a JSON file holding an array of [`TaskScenario`].
pub fn load_from_file(path: impl AsRef<Path>) -> Result<Vec<TaskScenario>, ScenarioError> {
    let raw = fs::read_to_string(path)?;
    let scenarios: Vec<TaskScenario> = serde_json::from_str(&raw)?;
    if scenarios.is_empty() {
        return Err(ScenarioError::Empty);
    }
    Ok(scenarios)
}

/// Keeps only scenarios of the given ambiguity kind; `None` keeps all.
#[must_use]
pub fn filter_by_ambiguity(
    scenarios: Vec<TaskScenario>,
    kind: Option<AmbiguityKind>,
) -> Vec<TaskScenario> {
    match kind {
        None => scenarios,
        Some(kind) => scenarios
            .into_iter()
            .filter(|scenario| scenario.ambiguity == kind)
            .collect(),
    }
}

fn scenario(
    id: &str,
    title: &str,
    ambiguity: AmbiguityKind,
    goal: &str,
    scene_text: &str,
    objects: Vec<SceneObject>,
    hazards: Vec<Hazard>,
) -> TaskScenario {
    TaskScenario {
        id: id.into(),
        title: title.into(),
        ambiguity,
        goal: goal.into(),
        scene: SceneStructure {
            scene_text: scene_text.into(),
            robot_initial: Pose::new(Point::new(0.0, 0.0), 0.0),
            objects,
            hazards,
        },
    }
}

/// The built-in scenario catalog. Object layouts use the scene coordinate
/// frame: the robot starts at the origin facing +y.
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn builtin_catalog() -> Vec<TaskScenario> {
    vec![
        // --- Referential ambiguity ---
        scenario(
            "ref_001",
            "Two cups, different colors",
            AmbiguityKind::Referential,
            "Navigate to the red cup (the one on the left side)",
            "A desk with a red cup on the left and a blue cup on the right",
            vec![
                SceneObject::new("red cup", -0.3, 2.0)
                    .with_prop("color", "red")
                    .with_prop("side", "left"),
                SceneObject::new("blue cup", 0.3, 2.0)
                    .with_prop("color", "blue")
                    .with_prop("side", "right"),
            ],
            vec![],
        ),
        scenario(
            "ref_002",
            "Three identical bottles",
            AmbiguityKind::Referential,
            "Navigate to the middle water bottle",
            "A kitchen counter with three identical water bottles in a row",
            vec![
                SceneObject::new("left bottle", -0.4, 2.0).with_prop("type", "water bottle"),
                SceneObject::new("center bottle", 0.0, 2.2).with_prop("type", "water bottle"),
                SceneObject::new("right bottle", 0.4, 2.4).with_prop("type", "water bottle"),
            ],
            vec![],
        ),
        scenario(
            "ref_003",
            "Two books on a shelf",
            AmbiguityKind::Referential,
            "Navigate to the green book",
            "A low shelf holding a red book and a green book side by side",
            vec![
                SceneObject::new("red book", -0.25, 1.8).with_prop("color", "red"),
                SceneObject::new("green book", 0.25, 1.8).with_prop("color", "green"),
            ],
            vec![],
        ),
        scenario(
            "ref_004",
            "Three trash bins",
            AmbiguityKind::Referential,
            "Navigate to the center trash bin",
            "An office wall with three trash bins in a row",
            vec![
                SceneObject::new("left trash bin", -0.6, 2.5).with_prop("side", "left"),
                SceneObject::new("center trash bin", 0.0, 2.5).with_prop("side", "center"),
                SceneObject::new("right trash bin", 0.6, 2.5).with_prop("side", "right"),
            ],
            vec![],
        ),
        scenario(
            "ref_005",
            "Two doors",
            AmbiguityKind::Referential,
            "Navigate to the left door",
            "A hallway ending in two doors",
            vec![
                SceneObject::new("left door", -0.8, 3.0).with_prop("side", "left"),
                SceneObject::new("right door", 0.8, 3.0).with_prop("side", "right"),
            ],
            vec![],
        ),
        // --- Trajectory ambiguity ---
        scenario(
            "traj_001",
            "Chair blocking the direct path",
            AmbiguityKind::Trajectory,
            "Navigate to the book",
            "A book on the far side of the desk with a chair directly in between",
            vec![
                SceneObject::new("chair", 0.0, 1.0).blocking().with_prop("radius", 0.25),
                SceneObject::new("book", 0.0, 3.0),
            ],
            vec![],
        ),
        scenario(
            "traj_002",
            "Stool on the requested straight line",
            AmbiguityKind::Trajectory,
            "Move forward 3 meters",
            "An open floor with a stool 1.5m in front of the robot",
            vec![SceneObject::new("stool", 0.0, 1.5).blocking().with_prop("radius", 0.2)],
            vec![],
        ),
        scenario(
            "traj_003",
            "Narrow gap between boxes",
            AmbiguityKind::Trajectory,
            "Navigate to the bag",
            "A bag beyond two boxes that leave only a narrow gap",
            vec![
                SceneObject::new("small box", -0.5, 1.5).blocking().with_prop("radius", 0.2),
                SceneObject::new("large box", 0.5, 1.5).blocking().with_prop("radius", 0.3),
                SceneObject::new("bag", 0.0, 3.0),
            ],
            vec![],
        ),
        // --- Safety ---
        scenario(
            "safe_001",
            "Desk edge directly ahead",
            AmbiguityKind::Safety,
            "Move forward a short distance but don't fall off the edge",
            "The robot sits on a desk; the edge is 0.8m ahead",
            vec![],
            vec![Hazard::edge(0.0, 0.8, "Desk edge - 1m drop")],
        ),
        scenario(
            "safe_002",
            "Keys near the edge",
            AmbiguityKind::Safety,
            "Navigate to the keys",
            "Keys lying close to the table edge",
            vec![SceneObject::new("keys", 0.1, 1.4)],
            vec![Hazard::edge(0.0, 1.6, "Table edge - 0.8m drop")],
        ),
        scenario(
            "safe_003",
            "Shelf edge behind the robot",
            AmbiguityKind::Safety,
            "Turn around carefully without falling off the shelf edge",
            "The robot sits on a narrow shelf with the edge just behind it",
            vec![],
            vec![Hazard::edge(0.0, -0.4, "Shelf edge - 1.5m drop")],
        ),
        scenario(
            "safe_004",
            "Ledge behind",
            AmbiguityKind::Safety,
            "Move backward a short distance but don't fall off the edge",
            "A counter with a ledge 0.6m behind the robot",
            vec![],
            vec![Hazard::edge(0.0, -0.6, "Counter ledge - 0.9m drop")],
        ),
        // --- Implicit preconditions ---
        scenario(
            "implicit_001",
            "Laptop outside the camera cone",
            AmbiguityKind::ImplicitPrecondition,
            "Navigate to the laptop",
            "A laptop sits off to the robot's rear-left, outside its camera view",
            vec![SceneObject::new("laptop", -1.5, -1.0)],
            vec![],
        ),
        scenario(
            "implicit_002",
            "Two plants, front and back",
            AmbiguityKind::ImplicitPrecondition,
            "Navigate to the plant behind you",
            "Identical plants in front of and behind the robot",
            vec![
                SceneObject::new("plant", 0.0, 2.0).with_prop("id", "front"),
                SceneObject::new("plant", 0.0, -2.5).with_prop("id", "back"),
            ],
            vec![],
        ),
        scenario(
            "implicit_003",
            "Phone somewhere out of sight",
            AmbiguityKind::ImplicitPrecondition,
            "Find the phone",
            "A phone lying behind the robot where the camera cannot see it",
            vec![SceneObject::new("phone", -1.0, -2.0)],
            vec![],
        ),
        // --- Orientation ---
        scenario(
            "orient_001",
            "Door behind the robot",
            AmbiguityKind::Orientation,
            "Turn around and face the door",
            "A door directly behind the robot",
            vec![SceneObject::new("door", 0.0, -3.0)],
            vec![],
        ),
        scenario(
            "orient_002",
            "Chair off to the left",
            AmbiguityKind::Orientation,
            "Navigate to the chair to the left",
            "Two chairs, one to each side of the robot",
            vec![
                SceneObject::new("left chair", -1.5, 0.8).with_prop("side", "left"),
                SceneObject::new("right chair", 1.5, 0.8).with_prop("side", "right"),
            ],
            vec![],
        ),
        scenario(
            "orient_003",
            "Shelf at the robot's back",
            AmbiguityKind::Orientation,
            "Turn around and look at the shelf",
            "A shelf directly behind the robot",
            vec![SceneObject::new("shelf", 0.0, -2.0)],
            vec![],
        ),
        // --- Perceptual controls ---
        scenario(
            "percept_001",
            "Counting cups",
            AmbiguityKind::None,
            "Count how many cups are on the desk",
            "A desk with three cups spread across it",
            vec![
                SceneObject::new("white cup", -0.5, 2.0).with_prop("color", "white"),
                SceneObject::new("red cup", 0.0, 2.2).with_prop("color", "red"),
                SceneObject::new("blue cup", 0.5, 2.0).with_prop("color", "blue"),
            ],
            vec![],
        ),
        scenario(
            "percept_002",
            "Laptop power check",
            AmbiguityKind::None,
            "Check if the laptop is plugged to power",
            "A laptop on the desk with its power cable visible",
            vec![SceneObject::new("laptop", 0.0, 2.0).with_prop("plugged_in", true)],
            vec![],
        ),
        scenario(
            "percept_003",
            "Open-ended description",
            AmbiguityKind::None,
            "Describe what you can see on the table",
            "A cluttered table with a mug, a book and a plant",
            vec![
                SceneObject::new("mug", -0.4, 1.8),
                SceneObject::new("book", 0.0, 2.0),
                SceneObject::new("plant", 0.4, 2.2),
            ],
            vec![],
        ),
        scenario(
            "percept_004",
            "Navigate then report",
            AmbiguityKind::None,
            "Navigate to the desk and report if the mug is empty",
            "A desk with a single mug on it",
            vec![
                SceneObject::new("desk", 0.0, 2.5),
                SceneObject::new("mug", 0.1, 2.4).with_prop("empty", true),
            ],
            vec![],
        ),
        // --- Compound scenarios ---
        scenario(
            "complex_001",
            "Two mugs behind an obstacle near an edge",
            AmbiguityKind::Referential,
            "Navigate to the red mug",
            "Two mugs past a box, with the desk edge off to the right",
            vec![
                SceneObject::new("small box", 0.0, 1.2).blocking().with_prop("radius", 0.2),
                SceneObject::new("red mug", -0.4, 2.6).with_prop("color", "red"),
                SceneObject::new("white mug", 0.4, 2.6).with_prop("color", "white"),
            ],
            vec![Hazard::edge(1.0, 1.5, "Desk edge - 1m drop")],
        ),
        scenario(
            "complex_002",
            "Keys hidden behind a box",
            AmbiguityKind::ImplicitPrecondition,
            "Find the keys",
            "Keys somewhere behind a large box, not visible from the start",
            vec![
                SceneObject::new("large box", 0.5, 1.0).blocking().with_prop("radius", 0.3),
                SceneObject::new("keys", 1.2, -1.5),
            ],
            vec![],
        ),
        scenario(
            "complex_003",
            "Bottle row with a chair in the way",
            AmbiguityKind::Referential,
            "Navigate to the right bottle",
            "Three bottles behind a chair that blocks the center approach",
            vec![
                SceneObject::new("chair", 0.0, 1.3).blocking().with_prop("radius", 0.25),
                SceneObject::new("left bottle", -0.5, 2.8),
                SceneObject::new("center bottle", 0.0, 2.8),
                SceneObject::new("right bottle", 0.5, 2.8),
            ],
            vec![],
        ),
        scenario(
            "complex_004",
            "Report from the far side of an edge",
            AmbiguityKind::Safety,
            "Navigate to the plant and check if it needs water",
            "A plant near the desk edge",
            vec![SceneObject::new("plant", 0.3, 2.0).with_prop("needs_water", false)],
            vec![Hazard::edge(0.0, 2.4, "Desk edge - 1m drop")],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn catalog_ids_are_unique() {
        let catalog = builtin_catalog();
        let mut ids: Vec<&str> = catalog.iter().map(|s| s.id.as_str()).collect();
        ids.sort_unstable();
        let before = ids.len();
        ids.dedup();
        assert_eq!(ids.len(), before);
        assert!(catalog.len() >= 24);
    }

    #[test]
    fn every_ambiguity_kind_is_covered() {
        let catalog = builtin_catalog();
        for kind in AmbiguityKind::ALL {
            assert!(
                catalog.iter().any(|s| s.ambiguity == kind),
                "no scenario for {kind:?}"
            );
        }
    }

    #[test]
    fn filter_keeps_only_requested_kind() {
        let filtered =
            filter_by_ambiguity(builtin_catalog(), Some(AmbiguityKind::Referential));
        assert!(!filtered.is_empty());
        assert!(filtered
            .iter()
            .all(|s| s.ambiguity == AmbiguityKind::Referential));
    }

    #[test]
    fn scenarios_round_trip_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenarios.json");
        let catalog = builtin_catalog();
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(serde_json::to_string(&catalog).unwrap().as_bytes())
            .unwrap();
        let loaded = load_from_file(&path).unwrap();
        assert_eq!(loaded.len(), catalog.len());
        assert_eq!(loaded[1].id, "ref_002");
    }

    #[test]
    fn empty_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.json");
        std::fs::write(&path, "[]").unwrap();
        assert!(matches!(load_from_file(&path), Err(ScenarioError::Empty)));
    }
}
