//! Journey Simulation CLI
//!
//! The `journey-sim` command plays a scenario headlessly and prints the
//! resulting snapshot and results report.
//!
//! ## Commands
//!
//! - `run`: Step a scenario through a number of ticks, optionally applying
//!   interventions along the way
//! - `catalog`: List the interventions available per stage
//! - `validate`: Check scenario and config files without running them
//!
//! Without `--scenario`, the built-in airport departure sample is used.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use journey_sim_core::sample::{airport_departure_scenario, airport_financial_inputs};
use journey_sim_core::{
    EngineConfig, FinancialInputs, ResultsReport, Scenario, SimulationEngine, Snapshot,
};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, Level};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "journey-sim")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Tick-driven journey playback with what-if interventions", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Scenario file (JSON). Defaults to the airport departure sample.
    #[arg(short, long, global = true)]
    scenario: Option<PathBuf>,

    /// Engine config file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play the scenario and print the outcome
    Run {
        /// Number of ticks to run
        #[arg(short, long, default_value_t = 60)]
        ticks: usize,

        /// Interval per tick, in seconds
        #[arg(short, long, default_value_t = 1.0)]
        interval: f64,

        /// Playback speed multiplier
        #[arg(long)]
        speed: Option<f64>,

        /// Apply an intervention, as `stage:intervention@minute` (repeatable)
        #[arg(short, long = "apply")]
        apply: Vec<PlannedIntervention>,

        /// Financial inputs file (JSON). Defaults to the sample figures
        /// when running the sample scenario.
        #[arg(long)]
        financials: Option<PathBuf>,

        /// Print snapshot and report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List interventions per stage
    Catalog,

    /// Validate scenario and config without running
    Validate,
}

/// An intervention to apply once simulated time reaches `at_minutes`
#[derive(Debug, Clone)]
struct PlannedIntervention {
    stage_id: String,
    intervention_id: String,
    at_minutes: f64,
}

impl FromStr for PlannedIntervention {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (target, at) = match s.split_once('@') {
            Some((target, at)) => (target, at),
            None => (s, "0"),
        };
        let (stage_id, intervention_id) = target
            .split_once(':')
            .ok_or_else(|| format!("expected stage:intervention[@minute], got '{}'", s))?;
        let at_minutes: f64 = at
            .parse()
            .map_err(|_| format!("invalid minute '{}' in '{}'", at, s))?;
        if stage_id.is_empty() || intervention_id.is_empty() {
            return Err(format!("empty stage or intervention in '{}'", s));
        }
        Ok(Self {
            stage_id: stage_id.to_string(),
            intervention_id: intervention_id.to_string(),
            at_minutes,
        })
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init()
        .ok();
}

fn load_scenario(path: Option<&Path>) -> Result<Scenario> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read scenario {}", path.display()))?;
            Scenario::from_json_str(&json)
                .with_context(|| format!("Invalid scenario {}", path.display()))
        }
        None => Ok(airport_departure_scenario()),
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            EngineConfig::from_json_str(&json)
                .with_context(|| format!("Invalid config {}", path.display()))
        }
        None => Ok(EngineConfig::default()),
    }
}

fn load_financials(path: Option<&Path>, sample: bool) -> Result<FinancialInputs> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read financials {}", path.display()))?;
            serde_json::from_str(&json)
                .with_context(|| format!("Invalid financials {}", path.display()))
        }
        None if sample => Ok(airport_financial_inputs()),
        None => Ok(FinancialInputs::default()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let scenario = load_scenario(cli.scenario.as_deref())?;
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            ticks,
            interval,
            speed,
            apply,
            financials,
            json,
        } => {
            let inputs = load_financials(financials.as_deref(), cli.scenario.is_none())?;
            cmd_run(scenario, config, ticks, interval, speed, apply, &inputs, json)
        }
        Commands::Catalog => cmd_catalog(&scenario),
        Commands::Validate => {
            println!(
                "Scenario '{}' is valid: {} stages, {} entities, {} interventions",
                scenario.id,
                scenario.stages.len(),
                scenario.entity_specs().len(),
                scenario.interventions.len()
            );
            println!(
                "Config is valid: tolerances {}/{}%, playback {:?}",
                config.tracking.delay_tolerance_percent,
                config.tracking.critical_tolerance_percent,
                config.playback_mode
            );
            Ok(())
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_run(
    scenario: Scenario,
    config: EngineConfig,
    ticks: usize,
    interval: f64,
    speed: Option<f64>,
    mut planned: Vec<PlannedIntervention>,
    inputs: &FinancialInputs,
    json: bool,
) -> Result<()> {
    if !(interval > 0.0) {
        bail!("--interval must be positive, got {}", interval);
    }

    let mut engine = SimulationEngine::new(config)?;
    let handle = engine.load_scenario(scenario)?;
    if let Some(speed) = speed {
        engine.set_speed(handle, speed)?;
    }

    planned.sort_by(|a, b| a.at_minutes.total_cmp(&b.at_minutes));
    let mut pending = planned.into_iter().peekable();

    engine.start(handle)?;
    for _ in 0..ticks {
        let now = engine.get_snapshot(handle)?.time_minutes;
        while let Some(next) = pending.next_if(|p| p.at_minutes <= now) {
            let stage = engine
                .apply_intervention(handle, &next.stage_id, &next.intervention_id)
                .with_context(|| {
                    format!("Failed to apply {}:{}", next.stage_id, next.intervention_id)
                })?;
            info!(stage = %stage.id, at = now, "applied planned intervention");
        }

        let result = engine.tick(handle, interval)?;
        debug!(time = result.time_minutes, moved = result.entities_moved, "tick");
        if result.finished {
            break;
        }
    }
    engine.pause(handle)?;

    // Interventions planned past the last tick still count for the results
    for next in pending {
        engine.apply_intervention(handle, &next.stage_id, &next.intervention_id)?;
    }

    let baseline = engine.baseline_snapshot(handle)?;
    let current = engine.get_snapshot(handle)?;
    let report = engine.compute_results(handle, &baseline, &current, inputs)?;

    if json {
        let out = serde_json::json!({
            "snapshot": current,
            "report": report,
            "events": engine.events(handle)?.len(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print_snapshot(&current);
        print_report(&report);
    }
    Ok(())
}

fn cmd_catalog(scenario: &Scenario) -> Result<()> {
    let catalog = scenario.catalog();
    for stage in &scenario.stages {
        println!("{} ({})", stage.name, stage.id);
        let entries = catalog.interventions_for(&stage.id);
        if entries.is_empty() {
            println!("  (no interventions)");
        }
        for entry in entries {
            println!(
                "  {:<24} {:?}, {:.0}% confidence: {}",
                entry.id, entry.intervention_type, entry.confidence_percent, entry.impact_description
            );
        }
    }
    Ok(())
}

fn print_snapshot(snapshot: &Snapshot) {
    println!(
        "t = {:.1} min ({:?}, x{})",
        snapshot.time_minutes, snapshot.clock_state, snapshot.speed
    );
    println!();
    println!("{:<14} {:<10} {:>8} {:>10} {:>8}", "stage", "status", "wait", "throughput", "eff %");
    for stage in &snapshot.stages {
        println!(
            "{:<14} {:<10} {:>8.1} {:>10.0} {:>8.1}{}",
            stage.id,
            format!("{:?}", stage.status),
            stage.metrics.wait_time_minutes,
            stage.metrics.throughput_per_hour,
            stage.metrics.efficiency_percent,
            stage
                .intervention
                .as_ref()
                .map(|r| format!("  [{}]", r.intervention_id))
                .unwrap_or_default()
        );
    }
    println!();
    for entity in &snapshot.entities {
        let stage = snapshot
            .stages
            .get(entity.current_stage_index)
            .map(|s| s.id.as_str())
            .unwrap_or("?");
        println!(
            "{:<12} {:<10} {:<14} {:?}",
            entity.id, entity.profile, stage, entity.status
        );
    }
    println!();
}

fn print_report(report: &ResultsReport) {
    println!("{:<32} {:>12} {:>12} {:>9}  impact", "metric", "baseline", "optimized", "change");
    for metric in &report.metrics {
        let change = metric
            .improvement_percent
            .map(|p| format!("{:+.1}%", p))
            .unwrap_or_else(|| "n/a".to_string());
        println!(
            "{:<32} {:>12.2} {:>12.2} {:>9}  {:?}",
            metric.key, metric.baseline_value, metric.optimized_value, change, metric.impact_level
        );
    }
    println!();
    println!("Total annual value: {:.0}", report.total_annual_value);
    match report.payback_months {
        Some(months) => println!("Payback: {:.1} months", months),
        None => println!("Payback: n/a"),
    }
    if let Some(roi) = report.first_year_roi_percent {
        println!("First-year ROI: {:.0}%", roi);
    }
    for issue in &report.issues {
        println!("warning: {}", issue);
    }
}
