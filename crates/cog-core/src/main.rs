//! Cognisphere CLI Runner
//!
//! Drives the simulation engine from the command line: builds a world,
//! injects a scheduled stimulus stream, writes a JSONL event log and
//! periodic snapshots, and prints an end-of-run summary.

use clap::Parser;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use cog_core::events::EventLogger;
use cog_core::{write_snapshot_to_dir, Config, Simulation, ViewFilters};
use cog_events::StimulusSchedule;

/// Command line arguments for the simulation.
#[derive(Parser, Debug)]
#[command(name = "cognisphere")]
#[command(about = "Deterministic emergent-civilization simulation engine")]
struct Args {
    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Number of agents to spawn
    #[arg(long)]
    agents: Option<usize>,

    /// Number of ticks to simulate
    #[arg(long, default_value_t = 1000)]
    ticks: u64,

    /// Interval between world snapshots, in ticks (0 disables)
    #[arg(long)]
    snapshot_interval: Option<u64>,

    /// Path to a TOML tuning file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to a JSON stimulus schedule (tick -> stimulus batch)
    #[arg(long)]
    stimuli: Option<PathBuf>,

    /// Output directory for event log and snapshots
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    if let Err(error) = run(args) {
        eprintln!("error: {}", error);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let run_id = uuid::Uuid::new_v4();

    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(),
    }
    .with_overrides(args.seed, args.agents, args.snapshot_interval);

    let schedule: StimulusSchedule = match &args.stimuli {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => StimulusSchedule::new(),
    };

    println!("Cognisphere Simulation Engine");
    println!("=============================");
    println!("Run: {}", run_id);
    println!("Seed: {}", config.simulation.seed);
    println!("Agents: {}", config.simulation.agent_count);
    println!("Ticks: {}", args.ticks);
    println!("Scheduled stimuli: {}", schedule.item_count());
    println!();

    fs::create_dir_all(&args.output_dir)?;
    let snapshot_dir = args.output_dir.join("snapshots");
    let mut event_logger = EventLogger::new(args.output_dir.join("events.jsonl"))?;

    let mut sim = Simulation::initialize(config)?;
    event_logger.log_batch(&sim.events_for_tick(0))?;

    let mut events_by_type: BTreeMap<String, u64> = BTreeMap::new();
    for _ in 0..args.ticks {
        let batch = schedule.batch_for(sim.current_tick() + 1).to_vec();
        let result = sim.advance_tick(&batch)?;

        let tick_events = sim.events_for_tick(result.tick);
        for event in &tick_events {
            let key = serde_json::to_value(event.event_type)?
                .as_str()
                .unwrap_or("unknown")
                .to_string();
            *events_by_type.entry(key).or_insert(0) += 1;
        }
        event_logger.log_batch(&tick_events)?;

        if result.rejected_stimuli > 0 {
            println!(
                "[tick {:>5}] rejected {} malformed stimuli",
                result.tick, result.rejected_stimuli
            );
        }
        for change in &result.culture_changes {
            println!(
                "[tick {:>5}] {} {} {}",
                result.tick, change.artifact, change.artifact_id, change.change
            );
        }
        if result.tick % 100 == 0 {
            println!(
                "[tick {:>5}] {} events so far, divergence {:.4}",
                result.tick,
                sim.event_count(),
                sim.divergence()
            );
        }
    }

    // Final snapshot alongside the periodic ones.
    let final_snapshot = sim.export_snapshot("simulation_end")?;
    let path = write_snapshot_to_dir(&final_snapshot, &snapshot_dir)?;
    event_logger.flush()?;

    let view = sim.get_state_view(&ViewFilters::everything());
    let canonical_myths = view.myths.iter().filter(|m| m.status == "canonical").count();
    let adopted_norms = view.norms.iter().filter(|n| n.status == "canonical").count();

    println!();
    println!("Simulation complete after {} ticks.", sim.current_tick());
    println!("Events committed: {}", sim.event_count());
    for (event_type, count) in &events_by_type {
        println!("  {:<12} {}", event_type, count);
    }
    println!("Canonical myths: {}", canonical_myths);
    println!("Adopted norms: {}", adopted_norms);
    println!("Language divergence: {:.4}", sim.divergence());
    println!("Final snapshot: {}", path.display());

    Ok(())
}
