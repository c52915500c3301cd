use std::fmt::Write as _;

use friction_world::WorldModel;

/// Simulated camera: renders the agent-facing view and turns it into the
/// one-liner the robot speaks when asked to describe what it sees.
pub struct SimulatedVision;

impl SimulatedVision {
    /// Full camera analysis text shown to the decision agent each turn.
    #[must_use]
    pub fn camera_view(world: &WorldModel) -> String {
        world.robot_pov_description()
    }

    /// Short spoken summary of the current view, e.g.
    /// "I can see red cup at 2.0m, blue cup at 2.1m."
    #[must_use]
    pub fn spoken_summary(world: &WorldModel) -> String {
        let visible: Vec<String> = world
            .sightings()
            .into_iter()
            .filter(|entry| entry.sighting.visible)
            .map(|entry| {
                format!(
                    "{} at {:.1}m",
                    world.objects()[entry.index].name,
                    entry.sighting.distance
                )
            })
            .collect();

        if visible.is_empty() {
            return "I don't see anything in front of me.".into();
        }
        let mut summary = String::from("I can see ");
        summary.push_str(&visible.join(", "));
        let _ = write!(summary, ".");
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use friction_world::{Point, Pose, SceneObject, SceneStructure};

    #[test]
    fn spoken_summary_lists_only_visible_objects() {
        let scene = SceneStructure {
            scene_text: "Cup ahead, plant behind".into(),
            robot_initial: Pose::new(Point::new(0.0, 0.0), 0.0),
            objects: vec![
                SceneObject::new("red cup", 0.0, 2.0),
                SceneObject::new("plant", 0.0, -2.0),
            ],
            hazards: vec![],
        };
        let world = WorldModel::new(&scene, "look");
        let summary = SimulatedVision::spoken_summary(&world);
        assert_eq!(summary, "I can see red cup at 2.0m.");
    }

    #[test]
    fn empty_view_says_so() {
        let scene = SceneStructure {
            scene_text: "Empty".into(),
            robot_initial: Pose::new(Point::new(0.0, 0.0), 0.0),
            objects: vec![],
            hazards: vec![],
        };
        let world = WorldModel::new(&scene, "look");
        assert_eq!(
            SimulatedVision::spoken_summary(&world),
            "I don't see anything in front of me."
        );
    }
}
