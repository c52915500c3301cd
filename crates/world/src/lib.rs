#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rust_2018_idioms,
    missing_docs
)]

//! World model for the synthetic evaluation harness: 2D scene state,
//! deterministic motion semantics, collision geometry, and visibility.

/// Pure 2D geometry: bearings, field-of-view tests, segment/circle contact.
#[path = "../geometry.rs"]
pub mod geometry;

/// Scene data model: poses, objects, hazards, scene structure fixtures.
#[path = "../scene.rs"]
pub mod scene;

/// Mutable world aggregate tracking the robot through an episode.
#[path = "../model.rs"]
pub mod model;

pub use geometry::{Point, Sighting};
pub use model::{CollisionInfo, MotionStep, WorldModel};
pub use scene::{Hazard, Pose, SceneObject, SceneStructure};
