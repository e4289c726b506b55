//! # RONDO Demo
//!
//! Runs the player, enemy and wall objects for a few frames and logs what
//! each handler sees.
//!
//! ```bash
//! cargo build --release --package rondo --features demo
//!
//! # Default configuration
//! RUST_LOG=debug ./rondo_demo
//!
//! # Sizing from a TOML file
//! ./rondo_demo rondo.toml
//! ```

use std::process::ExitCode;

use rondo::objects::{self, ENEMY, PLAYER, WALL};
use rondo::{EngineConfig, EngineResult, GameLoop, Registry};
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

const FRAMES: u64 = 8;

fn run(config: &EngineConfig) -> EngineResult<()> {
    let mut registry = Registry::with_config(config)?;
    objects::register(&mut registry)?;

    let mut game = GameLoop::new(registry, objects::priority)?;
    objects::bind_step(game.step_mut());
    objects::bind_draw(game.draw_mut());

    let registry = game.registry_mut();
    let player = registry.spawn(PLAYER)?;
    if let Some(state) = registry.state_mut::<objects::ObjectPlayer>(player) {
        state.set_name("Ada");
    }
    registry.spawn(ENEMY)?;
    registry.spawn(ENEMY)?;
    registry.spawn(WALL)?;

    for _ in 0..FRAMES {
        let stats = game.tick()?;
        info!(
            "frame {} done in {}us: {} alive, {} failures",
            stats.frame, stats.total_us, stats.alive, stats.failures
        );
    }
    game.stats().log_summary();

    let report = game.shutdown();
    info!(
        "shutdown: {} instances destroyed, {} destructor failures",
        report.teardown.instances_destroyed, report.teardown.destructor_failures
    );
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => match EngineConfig::load(&path) {
            Ok(config) => config,
            Err(err) => {
                error!("{}", err);
                return ExitCode::FAILURE;
            }
        },
        None => EngineConfig::default(),
    };

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("demo failed: {}", err);
            ExitCode::FAILURE
        }
    }
}
