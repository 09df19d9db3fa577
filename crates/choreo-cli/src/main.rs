//! Command-line player for Choreo puzzles.
//!
//! Usage: `choreo [--world FILE] [--step-ms MS] [--instant] [--json] <COMMANDS>...`

mod render;
mod telemetry;

use anyhow::{bail, Result};
use choreo_core::{EngineConfig, RunSummary, Script};
use choreo_engine::{ChannelObserver, Engine, RunStatus, SimulationState};
use choreo_world::{Simulation, WorldModel};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "choreo")]
#[command(about = "Play a movement script against a grid puzzle")]
struct Args {
    /// Commands to play, e.g. `forward turn-right pause` or `f,f,r,f`
    #[arg(required_unless_present = "print_world")]
    commands: Vec<String>,

    /// World description (JSON); defaults to the built-in puzzle
    #[arg(long)]
    world: Option<PathBuf>,

    /// Delay between steps in milliseconds
    #[arg(long = "step-ms")]
    step_ms: Option<u64>,

    /// Play without delays
    #[arg(long)]
    instant: bool,

    /// Print snapshots as JSON lines instead of drawing the board
    #[arg(long)]
    json: bool,

    /// Print the world description and exit
    #[arg(long)]
    print_world: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    telemetry::init_logging(args.log_json)?;

    let world = match &args.world {
        Some(path) => WorldModel::load(path)?,
        None => WorldModel::reference(),
    };

    if args.print_world {
        println!("{}", world.to_json_pretty()?);
        return Ok(());
    }

    let script: Script = args.commands.join(" ").parse()?;
    if script.is_empty() {
        bail!("no commands given");
    }

    let mut config = if args.instant {
        EngineConfig::instant()
    } else {
        EngineConfig::default()
    };
    if let Some(ms) = args.step_ms {
        config.step_duration_ms = ms;
    }

    info!(
        commands = script.len(),
        instant = args.instant,
        "Playing script"
    );

    let status = if args.instant {
        play_instant(&world, &config, &script, args.json)?
    } else {
        play_timed(world, config, &script, args.json).await?
    };

    match status.summary() {
        Some(summary) => print_summary(&summary),
        None => warn!("Run did not finish: {:?}", status),
    }

    Ok(())
}

fn play_instant(
    world: &WorldModel,
    config: &EngineConfig,
    script: &Script,
    json: bool,
) -> Result<RunStatus> {
    world.validate()?;
    let mut sim = Simulation::new(Arc::new(world.clone()), config.scoring);
    let result = sim.run_to_completion(&script.kinds(), |state| show(world, state, json));

    Ok(match result {
        Ok(summary) => RunStatus::Completed(summary),
        Err(reason) => RunStatus::Rejected(reason),
    })
}

async fn play_timed(
    world: WorldModel,
    config: EngineConfig,
    script: &Script,
    json: bool,
) -> Result<RunStatus> {
    let engine = Engine::new(world.clone(), config)?;

    if !json {
        println!("{}", render::render_board(&world, &engine.snapshot()));
    }

    let (tx, mut rx) = mpsc::unbounded_channel::<SimulationState>();
    let printer = tokio::spawn(async move {
        while let Some(state) = rx.recv().await {
            show(&world, &state, json);
        }
    });

    let status = tokio::select! {
        status = engine.run_script(script, ChannelObserver::new(tx)) => status,
        _ = shutdown_signal() => {
            engine.reset();
            RunStatus::Cancelled
        }
    };

    printer.await?;
    Ok(status)
}

fn show(world: &WorldModel, state: &SimulationState, json: bool) {
    if json {
        match serde_json::to_string(state) {
            Ok(line) => println!("{}", line),
            Err(e) => warn!("Failed to encode snapshot: {}", e),
        }
    } else {
        println!("{}", render::render_board(world, state));
    }
}

fn print_summary(summary: &RunSummary) {
    println!(
        "Outcome: {}, score {} ({} of {} commands executed)",
        summary.outcome, summary.score, summary.steps_executed, summary.script_len
    );
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, abandoning run");
}
