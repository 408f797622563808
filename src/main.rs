//! Savanna - headless runner
//!
//! Builds a world, steps it for a fixed number of ticks and prints a JSON
//! summary. Useful for soak runs, profiling and reproducing seeds.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use savanna::core::error::Result;
use savanna::entity::EntityType;
use savanna::simulation::{GameOver, GameVariant, Simulation};
use savanna::SimulationConfig;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Game {
    Chase,
    Tribal,
}

impl From<Game> for GameVariant {
    fn from(game: Game) -> Self {
        match game {
            Game::Chase => GameVariant::Chase,
            Game::Tribal => GameVariant::Tribal,
        }
    }
}

/// Headless Savanna runner
#[derive(Parser, Debug)]
#[command(name = "savanna")]
#[command(about = "Step a savanna world without a renderer and report the outcome")]
struct Args {
    /// Which game to build
    #[arg(long, value_enum, default_value = "chase")]
    game: Game,

    /// Maximum number of steps; stops early on game over
    #[arg(long, default_value_t = 3600)]
    ticks: u64,

    /// Random seed (overrides the config file's seed)
    #[arg(long)]
    seed: Option<u64>,

    /// Step length in milliseconds (defaults to the config's step)
    #[arg(long)]
    step_ms: Option<f64>,

    /// TOML config; anything it omits keeps its default
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the final world state as JSON to this path
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

#[derive(Serialize)]
struct RunSummary {
    game: GameVariant,
    seed: u64,
    ticks: u64,
    time_ms: f64,
    population: BTreeMap<EntityType, usize>,
    deaths: usize,
    spawns: usize,
    game_over: Option<GameOver>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("savanna=info")),
        )
        .init();

    let args = Args::parse();
    let variant = GameVariant::from(args.game);

    let mut config = match &args.config {
        Some(path) => SimulationConfig::load(path)?,
        None => match variant {
            GameVariant::Chase => SimulationConfig::chase(),
            GameVariant::Tribal => SimulationConfig::tribal(),
        },
    };
    if let Some(seed) = args.seed {
        config.world.seed = seed;
    }
    if let Some(step) = args.step_ms {
        config.world.step_ms = step;
    }
    let seed = config.world.seed;
    let step_ms = config.world.step_ms;

    let mut sim = Simulation::from_config(variant, config)?;
    tracing::info!("running {:?} for up to {} ticks of {} ms", variant, args.ticks, step_ms);

    let (mut deaths, mut spawns) = (0, 0);
    for _ in 0..args.ticks {
        for event in sim.advance_world(step_ms) {
            match event {
                savanna::SimulationEvent::Died { .. } => deaths += 1,
                savanna::SimulationEvent::Spawned { .. } => spawns += 1,
                _ => {}
            }
        }
        if sim.state.is_over() {
            break;
        }
    }

    if let Some(path) = &args.snapshot {
        std::fs::write(path, sim.state.to_json_pretty()?)?;
        tracing::info!("snapshot written to {}", path.display());
    }

    let summary = RunSummary {
        game: variant,
        seed,
        ticks: sim.state.tick,
        time_ms: sim.state.time_ms,
        population: sim.state.population(),
        deaths,
        spawns,
        game_over: sim.state.game_over,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
