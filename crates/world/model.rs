use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::{
    geometry::{self, Point, Sighting},
    scene::{Pose, SceneObject, SceneStructure},
};

/// Robot collision radius in meters.
pub const ROBOT_RADIUS: f64 = 0.1;
/// Default obstacle collision radius; scenarios may override per object.
pub const OBSTACLE_RADIUS: f64 = 0.1;
/// Forward field of view of the simulated camera.
pub const FOV_DEGREES: f64 = 120.0;
/// Maximum visibility range of the simulated camera.
pub const MAX_VIEW_RANGE: f64 = 10.0;
/// How far short of first contact the robot stops, to avoid interpenetration.
pub const CONTACT_BACKOFF: f64 = 0.05;

/// One atomic motion step derived from a structured intent. A step is either
/// a pure rotation or a pure translation at the current heading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "step")]
pub enum MotionStep {
    /// Clockwise rotation in degrees.
    TurnRight {
        /// Rotation magnitude.
        degrees: f64,
    },
    /// Counter-clockwise rotation in degrees.
    TurnLeft {
        /// Rotation magnitude.
        degrees: f64,
    },
    /// Translation along the current heading.
    Forward {
        /// Distance in meters.
        distance: f64,
    },
    /// Translation against the current heading.
    Backward {
        /// Distance in meters.
        distance: f64,
    },
}

/// Outcome of the robot contacting an obstacle mid-translation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionInfo {
    /// Name of the obstacle hit.
    pub obstacle_name: String,
    /// Obstacle center.
    pub obstacle_position: Point,
    /// Where the robot stopped.
    pub collision_point: Point,
    /// Human-readable collision summary.
    pub message: String,
}

/// What the robot currently perceives of one scene object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectSighting {
    /// Index into the world's object list.
    pub index: usize,
    /// Distance/offset/visibility of the object.
    pub sighting: Sighting,
}

/// Mutable world aggregate for one episode: robot pose, static objects and
/// hazards, and the ordered action history. Pose changes only through
/// [`WorldModel::apply_motion`]; visibility is derived, never stored.
#[derive(Debug, Clone)]
pub struct WorldModel {
    task_goal: String,
    scene_text: String,
    pose: Pose,
    objects: Vec<SceneObject>,
    hazards: Vec<crate::scene::Hazard>,
    action_history: Vec<String>,
}

impl WorldModel {
    /// Builds a fresh world from a scene fixture.
    #[must_use]
    pub fn new(scene: &SceneStructure, task_goal: impl Into<String>) -> Self {
        Self {
            task_goal: task_goal.into(),
            scene_text: scene.scene_text.clone(),
            pose: Pose::new(scene.robot_initial.position, scene.robot_initial.orientation),
            objects: scene.objects.clone(),
            hazards: scene.hazards.clone(),
            action_history: Vec::new(),
        }
    }

    /// The natural-language goal this episode is evaluated against.
    #[must_use]
    pub fn task_goal(&self) -> &str {
        &self.task_goal
    }

    /// Current robot position.
    #[must_use]
    pub const fn robot_position(&self) -> Point {
        self.pose.position
    }

    /// Current robot orientation in `[0, 360)`.
    #[must_use]
    pub const fn robot_orientation(&self) -> f64 {
        self.pose.orientation
    }

    /// Scene objects (positions are static for the episode).
    #[must_use]
    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    /// Scene hazards.
    #[must_use]
    pub fn hazards(&self) -> &[crate::scene::Hazard] {
        &self.hazards
    }

    /// Ordered log of rendered action descriptions.
    #[must_use]
    pub fn action_history(&self) -> &[String] {
        &self.action_history
    }

    /// Applies one robot action: records its rendered description, then runs
    /// the structured motion steps sequentially. Translation stops at first
    /// obstacle contact and any remaining steps are discarded. An action with
    /// no motion steps (speech, clarification) leaves the pose untouched.
    pub fn apply_motion(
        &mut self,
        description: impl Into<String>,
        steps: &[MotionStep],
    ) -> Option<CollisionInfo> {
        self.action_history.push(description.into());

        for step in steps {
            match *step {
                MotionStep::TurnRight { degrees } => self.pose.rotate(degrees),
                MotionStep::TurnLeft { degrees } => self.pose.rotate(-degrees),
                MotionStep::Forward { distance } => {
                    if let Some(collision) = self.translate(distance) {
                        return Some(collision);
                    }
                }
                MotionStep::Backward { distance } => {
                    if let Some(collision) = self.translate(-distance) {
                        return Some(collision);
                    }
                }
            }
        }
        None
    }

    fn translate(&mut self, signed_distance: f64) -> Option<CollisionInfo> {
        let (hx, hy) = geometry::heading(self.pose.orientation);
        let start = self.pose.position;
        let end = Point::new(
            signed_distance.mul_add(hx, start.x),
            signed_distance.mul_add(hy, start.y),
        );

        if let Some(collision) = self.collision_on_path(start, end) {
            self.pose.position = collision.collision_point;
            return Some(collision);
        }
        self.pose.position = end;
        None
    }

    /// Tests a translation segment against every obstacle. The robot stops
    /// [`CONTACT_BACKOFF`] short of first contact, clamped to the segment
    /// start. Non-obstacle objects never block motion.
    #[must_use]
    pub fn collision_on_path(&self, start: Point, end: Point) -> Option<CollisionInfo> {
        let length = start.distance_to(end);
        if length < 0.01 {
            return None;
        }
        let dir_x = (end.x - start.x) / length;
        let dir_y = (end.y - start.y) / length;

        for obj in self.objects.iter().filter(|obj| obj.is_obstacle()) {
            let radius = ROBOT_RADIUS + obj.radius_override().unwrap_or(OBSTACLE_RADIUS);
            if let Some(along) = geometry::first_contact(start, end, obj.position, radius) {
                let stop = (along - CONTACT_BACKOFF).max(0.0);
                let collision_point = Point::new(
                    stop.mul_add(dir_x, start.x),
                    stop.mul_add(dir_y, start.y),
                );
                return Some(CollisionInfo {
                    obstacle_name: obj.name.clone(),
                    obstacle_position: obj.position,
                    collision_point,
                    message: format!(
                        "Robot collided with {} at ({:.2}, {:.2})",
                        obj.name, obj.position.x, obj.position.y
                    ),
                });
            }
        }
        None
    }

    /// Recomputes what the camera sees of every object at the current pose.
    #[must_use]
    pub fn sightings(&self) -> Vec<ObjectSighting> {
        self.objects
            .iter()
            .enumerate()
            .map(|(index, obj)| ObjectSighting {
                index,
                sighting: geometry::sight(
                    self.pose.position,
                    self.pose.orientation,
                    obj.position,
                    FOV_DEGREES,
                    MAX_VIEW_RANGE,
                ),
            })
            .collect()
    }

    /// Egocentric camera view: only objects inside the viewing cone, with
    /// distance, a coarse bearing bucket, color tags, and blocking markers.
    /// Objects outside the cone are omitted entirely.
    #[must_use]
    pub fn robot_pov_description(&self) -> String {
        let mut pov = String::from("VISUAL ANALYSIS FROM CAMERA:\n\n");
        let _ = writeln!(
            pov,
            "Robot Status: Facing {}, Position ({:.1}, {:.1})\n",
            self.orientation_label(),
            self.pose.position.x,
            self.pose.position.y
        );

        let visible: Vec<ObjectSighting> = self
            .sightings()
            .into_iter()
            .filter(|entry| entry.sighting.visible)
            .collect();

        pov.push_str("Objects Detected:\n");
        if visible.is_empty() {
            pov.push_str("- No objects in forward camera view\n");
        } else {
            for entry in visible {
                let obj = &self.objects[entry.index];
                let bucket = bearing_bucket(entry.sighting.offset_degrees);
                let blocking = if obj.is_obstacle() { " [BLOCKING PATH]" } else { "" };
                let _ = writeln!(
                    pov,
                    "- {} at {:.1}m {bucket}{blocking}",
                    obj.name, entry.sighting.distance
                );
                if let Some(color) = obj.prop_str("color") {
                    let _ = writeln!(pov, "  (color: {color})");
                }
            }
        }
        pov.push('\n');

        let ahead: Vec<(&crate::scene::Hazard, f64)> = self
            .hazards
            .iter()
            .filter(|hazard| hazard.position.y - self.pose.position.y > 0.0)
            .map(|hazard| (hazard, self.pose.position.distance_to(hazard.position)))
            .collect();
        if !ahead.is_empty() {
            pov.push_str("Environment Notes:\n");
            for (hazard, distance) in ahead {
                let _ = writeln!(pov, "- {} detected at {distance:.1}m ahead", hazard.description);
            }
            pov.push('\n');
        }

        pov
    }

    /// Omniscient view for the simulated user: every object with position,
    /// distance and visibility, every hazard, and the full action history.
    /// Never exposed to the robot decision agent.
    #[must_use]
    pub fn full_state_description(&self) -> String {
        let mut state = String::from("=== COMPLETE WORLD STATE ===\n\n");
        let _ = writeln!(state, "Scene: {}\n", self.scene_text);
        let _ = writeln!(
            state,
            "Robot Position: ({:.2}, {:.2})",
            self.pose.position.x, self.pose.position.y
        );
        let _ = writeln!(
            state,
            "Robot Orientation: {:.0} degrees ({})\n",
            self.pose.orientation,
            self.orientation_label()
        );

        if !self.objects.is_empty() {
            state.push_str("Objects in World:\n");
            for entry in self.sightings() {
                let obj = &self.objects[entry.index];
                let visibility = if entry.sighting.visible {
                    "VISIBLE"
                } else {
                    "NOT VISIBLE"
                };
                let obstacle = if obj.is_obstacle() { " [OBSTACLE]" } else { "" };
                let _ = writeln!(
                    state,
                    "  - {}: pos ({:.1}, {:.1}), dist {:.1}m [{visibility}]{obstacle}",
                    obj.name, obj.position.x, obj.position.y, entry.sighting.distance
                );
            }
            state.push('\n');
        }

        if !self.hazards.is_empty() {
            state.push_str("Hazards:\n");
            for hazard in &self.hazards {
                let _ = writeln!(
                    state,
                    "  - {}: ({:.1}, {:.1}) - {}",
                    hazard.kind, hazard.position.x, hazard.position.y, hazard.description
                );
            }
            state.push('\n');
        }

        if !self.action_history.is_empty() {
            state.push_str("Robot Actions So Far:\n");
            for (i, action) in self.action_history.iter().enumerate() {
                let _ = writeln!(state, "  {}. {action}", i + 1);
            }
        }

        state
    }

    /// Objective scene description for the decision agent: scene text plus
    /// hazard distances, but no object coordinates.
    #[must_use]
    pub fn scene_description_for_agent(&self) -> String {
        let mut desc = format!("Scene: {}\n", self.scene_text);
        if !self.hazards.is_empty() {
            desc.push_str("\nHazards in scene:\n");
            for hazard in &self.hazards {
                let distance = self.pose.position.distance_to(hazard.position);
                let _ = writeln!(desc, "- {} at {distance:.1}m from robot", hazard.description);
            }
        }
        desc
    }

    /// Coarse cardinal label for the current orientation.
    #[must_use]
    pub fn orientation_label(&self) -> &'static str {
        let angle = self.pose.orientation;
        if !(22.5..337.5).contains(&angle) {
            "North/Forward"
        } else if angle < 67.5 {
            "Northeast"
        } else if angle < 112.5 {
            "East/Right"
        } else if angle < 157.5 {
            "Southeast"
        } else if angle < 202.5 {
            "South/Backward"
        } else if angle < 247.5 {
            "Southwest"
        } else if angle < 292.5 {
            "West/Left"
        } else {
            "Northwest"
        }
    }
}

fn bearing_bucket(offset_degrees: f64) -> &'static str {
    if offset_degrees < 15.0 {
        "directly ahead"
    } else if offset_degrees < 45.0 {
        "slightly to the side"
    } else {
        "to the side"
    }
}
