use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::geometry::{normalize_degrees, Point};

/// Robot pose: position plus orientation in degrees, normalized to `[0, 360)`.
/// Orientation 0 faces "north/forward"; turning right increases it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Position in scene coordinates.
    pub position: Point,
    /// Heading in degrees.
    pub orientation: f64,
}

impl Pose {
    /// Creates a pose, normalizing the orientation.
    #[must_use]
    pub fn new(position: Point, orientation: f64) -> Self {
        Self {
            position,
            orientation: normalize_degrees(orientation),
        }
    }

    /// Rotates in place by a signed delta (positive = clockwise/right).
    pub fn rotate(&mut self, delta_degrees: f64) {
        self.orientation = normalize_degrees(self.orientation + delta_degrees);
    }
}

/// A static object in the scene. Names are not required to be unique;
/// disambiguation happens through properties (`id`, `side`, `color`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    /// Display name, e.g. "center bottle" or "trash bin".
    pub name: String,
    /// Fixed position for the lifetime of an episode.
    pub position: Point,
    /// Semantic tags: `color`, `size`, `side`, `id`, `obstacle`, `radius`.
    #[serde(default)]
    pub properties: IndexMap<String, Value>,
}

impl SceneObject {
    /// Creates an object with empty properties.
    #[must_use]
    pub fn new(name: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            name: name.into(),
            position: Point::new(x, y),
            properties: IndexMap::new(),
        }
    }

    /// Adds a property tag.
    #[must_use]
    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Marks the object as blocking the robot's path.
    #[must_use]
    pub fn blocking(self) -> Self {
        self.with_prop("obstacle", true)
    }

    /// Whether the object blocks motion.
    #[must_use]
    pub fn is_obstacle(&self) -> bool {
        self.properties
            .get("obstacle")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Collision radius override, if the scenario sets one.
    #[must_use]
    pub fn radius_override(&self) -> Option<f64> {
        self.properties.get("radius").and_then(Value::as_f64)
    }

    /// String-valued property accessor.
    #[must_use]
    pub fn prop_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }
}

/// A fall/drop risk. Hazards are never collided with geometrically; they are
/// only surfaced through scene text for the decision agent to reason about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hazard {
    /// Hazard category, e.g. "edge".
    #[serde(rename = "type")]
    pub kind: String,
    /// Location of the hazard.
    pub position: Point,
    /// Human-readable description, e.g. "Desk edge - 1m drop".
    pub description: String,
}

impl Hazard {
    /// Creates an edge hazard.
    #[must_use]
    pub fn edge(x: f64, y: f64, description: impl Into<String>) -> Self {
        Self {
            kind: "edge".into(),
            position: Point::new(x, y),
            description: description.into(),
        }
    }
}

/// Immutable scene fixture a fresh [`crate::WorldModel`] is built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneStructure {
    /// Objective one-line scene description.
    pub scene_text: String,
    /// Robot starting pose.
    pub robot_initial: Pose,
    /// Static objects.
    pub objects: Vec<SceneObject>,
    /// Static hazards.
    #[serde(default)]
    pub hazards: Vec<Hazard>,
}

impl SceneStructure {
    /// Looks up the first object whose name matches case-insensitively.
    #[must_use]
    pub fn object_by_name(&self, name: &str) -> Option<&SceneObject> {
        self.objects
            .iter()
            .find(|obj| obj.name.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pose_normalizes_orientation() {
        let mut pose = Pose::new(Point::new(0.0, 0.0), -90.0);
        assert!((pose.orientation - 270.0).abs() < 1e-9);
        pose.rotate(180.0);
        assert!((pose.orientation - 90.0).abs() < 1e-9);
    }

    #[test]
    fn object_property_accessors() {
        let obj = SceneObject::new("chair", 0.0, 1.5)
            .blocking()
            .with_prop("id", "left")
            .with_prop("radius", 0.25);
        assert!(obj.is_obstacle());
        assert_eq!(obj.prop_str("id"), Some("left"));
        assert!((obj.radius_override().unwrap() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn scene_round_trips_through_json() {
        let scene = SceneStructure {
            scene_text: "Two cups on a table".into(),
            robot_initial: Pose::new(Point::new(0.0, 0.0), 0.0),
            objects: vec![SceneObject::new("red cup", -0.3, 2.0).with_prop("color", "red")],
            hazards: vec![Hazard::edge(0.0, 0.8, "Desk edge - 1m drop")],
        };
        let json = serde_json::to_string(&scene).unwrap();
        let back: SceneStructure = serde_json::from_str(&json).unwrap();
        assert_eq!(back, scene);
        assert_eq!(back.object_by_name("RED CUP").unwrap().name, "red cup");
    }
}
