//! Umbra headless simulation.
//!
//! Usage: `umbra-sim [LEVEL.toml] [--write-config]`
//!
//! Without a level path the built-in bottle room is used.

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use umbra_sim::{LevelDefinition, Scenario, SimConfig};

const BUILTIN_LEVEL: &str = include_str!("../levels/bottle_room.toml");

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("umbra=info".parse()?))
        .init();

    info!("Starting Umbra simulation v{}", env!("CARGO_PKG_VERSION"));

    let mut write_config = false;
    let mut level_path = None;
    for arg in std::env::args().skip(1) {
        if arg == "--write-config" {
            write_config = true;
        } else {
            level_path = Some(arg);
        }
    }

    let mut config = SimConfig::load();
    config.validate();
    if write_config {
        config.save().context("failed to write config")?;
    }

    let level = match &level_path {
        Some(path) => {
            LevelDefinition::load(path).with_context(|| format!("failed to load level {path}"))?
        },
        None => LevelDefinition::from_toml_str(BUILTIN_LEVEL).context("built-in level is invalid")?,
    };

    let ticks = config.max_ticks;
    let mut scenario = Scenario::new(&level, config)?;
    let report = scenario.run(ticks);

    for transition in &report.transitions {
        info!(
            "tick {:>5}: {} {} -> {}",
            transition.tick, transition.agent, transition.from, transition.to
        );
    }
    for (i, (state, position)) in report.enemies.iter().enumerate() {
        info!("enemy {i} ends in {state} at {position}");
    }
    info!(
        "Player {} at {}; {} hides, puzzle {}",
        if report.player_hidden { "hidden" } else { "exposed" },
        report.player_position,
        report.hides,
        if report.puzzle_solved { "solved" } else { "unsolved" }
    );

    Ok(())
}
