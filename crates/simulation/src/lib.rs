#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rust_2018_idioms,
    missing_docs
)]

//! Episode orchestration: turns structured intents into world motion, runs
//! the robot/user conversation loop, and batches episodes into experiments.

/// Structured-intent execution planning.
#[path = "../action_parser.rs"]
pub mod action_parser;

/// Camera view rendering for agents and spoken scene summaries.
#[path = "../vision.rs"]
pub mod vision;

/// Scenario catalog and JSON scenario loading.
#[path = "../scenario.rs"]
pub mod scenario;

/// Per-episode records and the experiment report format.
#[path = "../episode.rs"]
pub mod episode;

/// Structured logging facade for the harness.
#[path = "../telemetry.rs"]
pub mod telemetry;

/// Single-flight command gating.
#[path = "../session.rs"]
pub mod session;

/// The turn loop and the experiment runner.
#[path = "../orchestrator.rs"]
pub mod orchestrator;

pub use action_parser::{ActionParser, Clarification, ParsedAction};
pub use episode::{ExperimentReport, ExperimentSummary, InteractionLog, TurnRecord};
pub use orchestrator::{Simulator, SimulatorConfig};
pub use scenario::{builtin_catalog, AmbiguityKind, ScenarioError, TaskScenario};
pub use session::CommandGate;
pub use telemetry::HarnessTelemetry;
pub use vision::SimulatedVision;
