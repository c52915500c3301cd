#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rust_2018_idioms,
    missing_docs
)]

//! Task success evaluator: parses natural-language goals into verifiable
//! conditions and checks them against the final world state and transcript.

/// Target-object extraction from goal phrasing.
#[path = "../target.rs"]
pub mod target;

/// Goal condition vocabulary and the ordered parsing rule table.
#[path = "../conditions.rs"]
pub mod conditions;

/// Success evaluation over world state and episode observations.
#[path = "../evaluator.rs"]
pub mod evaluator;

pub use conditions::{parse_goal_conditions, GoalCondition, MoveDirection};
pub use evaluator::{EpisodeObservations, EvaluationMetrics, SuccessEvaluation, TaskEvaluator};
pub use target::extract_target;
