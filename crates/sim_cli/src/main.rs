#![deny(clippy::all, clippy::pedantic, clippy::nursery, rust_2018_idioms)]

//! Experiment runner CLI: picks a decision strategy and a scenario pool,
//! runs a batch of episodes, and writes the results report.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;

use friction_agents::{LlmDecisionAgent, ModelVariant, OpenAiChat, SimulatedUser};
use friction_simulation::{
    builtin_catalog, scenario, AmbiguityKind, HarnessTelemetry, Simulator, SimulatorConfig,
};
use sim_logging::LogLevel;

#[derive(Debug, Parser)]
#[command(
    name = "friction-cli",
    about = "Runs conversational-friction evaluation experiments against simulated scenes"
)]
struct Args {
    /// Decision strategy: friction, no_friction, zero_shot, zero_shot_multiturn.
    #[arg(long, default_value = "friction")]
    variant: String,

    /// Episodes to run.
    #[arg(long, default_value_t = 10)]
    episodes: usize,

    /// Only run scenarios of one ambiguity kind (referential, trajectory,
    /// safety, implicit_precondition, orientation, none).
    #[arg(long)]
    ambiguity: Option<String>,

    /// JSON file with custom scenarios; the built-in catalog is used otherwise.
    #[arg(long)]
    scenario_file: Option<PathBuf>,

    /// Chat model to drive both the robot and the simulated user.
    #[arg(long, default_value = "gpt-4o-mini")]
    model: String,

    /// Seed for scenario selection.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Robot turns per episode.
    #[arg(long, default_value_t = 6)]
    max_turns: usize,

    /// Pause between episodes, in milliseconds.
    #[arg(long, default_value_t = 500)]
    delay_ms: u64,

    /// Log verbosity: debug, info, warn, error.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Telemetry log file (JSON lines).
    #[arg(long, default_value = "logs/run.jsonl")]
    log_file: PathBuf,

    /// Results report path, written once at the end of the run.
    #[arg(long, default_value = "results/experiment.json")]
    output: PathBuf,

    /// List the available variants and ambiguity kinds, then exit.
    #[arg(long)]
    list_types: bool,
}

/// Fully resolved run configuration. Everything the harness needs is made
/// explicit here; nothing else is read from the environment at run time.
#[derive(Debug)]
struct HarnessConfig {
    variant: ModelVariant,
    episodes: usize,
    ambiguity: Option<AmbiguityKind>,
    scenario_file: Option<PathBuf>,
    model: String,
    api_key: String,
    seed: u64,
    max_turns: usize,
    inter_episode_delay: Duration,
    log_level: LogLevel,
    log_file: PathBuf,
    output: PathBuf,
}

impl HarnessConfig {
    fn from_args(args: &Args) -> anyhow::Result<Self> {
        let variant = ModelVariant::from_str(&args.variant).map_err(anyhow::Error::msg)?;
        let ambiguity = args
            .ambiguity
            .as_deref()
            .map(AmbiguityKind::from_str)
            .transpose()
            .map_err(anyhow::Error::msg)?;
        let log_level = parse_log_level(&args.log_level)?;
        let api_key = std::env::var("OPENAI_API_KEY")
            .context("OPENAI_API_KEY must be set to run experiments")?;
        Ok(Self {
            variant,
            episodes: args.episodes,
            ambiguity,
            scenario_file: args.scenario_file.clone(),
            model: args.model.clone(),
            api_key,
            seed: args.seed,
            max_turns: args.max_turns,
            inter_episode_delay: Duration::from_millis(args.delay_ms),
            log_level,
            log_file: args.log_file.clone(),
            output: args.output.clone(),
        })
    }
}

fn parse_log_level(raw: &str) -> anyhow::Result<LogLevel> {
    match raw {
        "debug" => Ok(LogLevel::Debug),
        "info" => Ok(LogLevel::Info),
        "warn" => Ok(LogLevel::Warn),
        "error" => Ok(LogLevel::Error),
        other => anyhow::bail!("unknown log level '{other}'"),
    }
}

fn print_types() {
    println!("Model variants:");
    for variant in ModelVariant::ALL {
        println!("  {variant:<20} {}", variant.description());
    }
    println!("\nAmbiguity kinds:");
    for kind in AmbiguityKind::ALL {
        println!("  {kind}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if args.list_types {
        print_types();
        return Ok(());
    }

    let config = HarnessConfig::from_args(&args)?;

    let scenarios = match &config.scenario_file {
        Some(path) => scenario::load_from_file(path)
            .with_context(|| format!("loading scenarios from {}", path.display()))?,
        None => builtin_catalog(),
    };
    let scenarios = scenario::filter_by_ambiguity(scenarios, config.ambiguity);
    anyhow::ensure!(
        !scenarios.is_empty(),
        "no scenarios left after ambiguity filtering"
    );

    let telemetry = HarnessTelemetry::new(&config.log_file, config.log_level, true)?;
    let simulator = Simulator::new(
        SimulatorConfig {
            max_turns: config.max_turns,
            inter_episode_delay: config.inter_episode_delay,
            debug_state: config.log_level == LogLevel::Debug,
        },
        telemetry,
    );

    let robot_chat = OpenAiChat::new(config.api_key.clone(), config.model.clone());
    let mut agent = LlmDecisionAgent::new(Box::new(robot_chat), config.variant);
    // The user model samples warmer so phrasing varies across episodes.
    let user_chat = OpenAiChat::new(config.api_key.clone(), config.model.clone())
        .with_temperature(0.7);
    let mut user = SimulatedUser::new(Box::new(user_chat));

    let report = simulator
        .run_experiments(
            &mut agent,
            &mut user,
            &config.variant.to_string(),
            &scenarios,
            config.ambiguity,
            config.episodes,
            config.seed,
            &config.output,
        )
        .await?;

    let summary = &report.summary;
    println!("run {} ({})", report.run_id, report.model_variant);
    println!(
        "episodes: {}  successes: {} ({:.0}%)  collisions: {}  clarifications: {}  mean turns: {:.1}",
        summary.total_episodes,
        summary.successes,
        summary.success_rate * 100.0,
        summary.collisions,
        summary.clarifications,
        summary.mean_turns
    );
    println!("report written to {}", config.output.display());
    Ok(())
}
