//! Terminal front end for the lifegrid Game of Life simulator.
//!
//! This is the main entry point that wires together configuration,
//! logging, the simulation runner, and the line-command console. It runs
//! until the user types `quit` or stdin closes.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `lifegrid-config.yaml` (or `LIFEGRID_CONFIG`)
//! 2. Initialize structured logging (tracing), to stderr
//! 3. Create the simulation from the grid and speed settings
//! 4. Spawn the runner task and the render task
//! 5. Serve console commands
//! 6. Shut the runner down and log the result

mod console;
mod error;

use std::path::PathBuf;

use lifegrid_core::config::{LifeConfig, LogFormat, LoggingConfig};
use lifegrid_core::{runner, Simulation, SimulationError};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Environment variable naming the configuration file.
const CONFIG_PATH_ENV: &str = "LIFEGRID_CONFIG";

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "lifegrid-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration is invalid, stdin cannot be read, or
/// the runner task fails.
#[tokio::main]
async fn main() -> Result<(), EngineError> {
    // 1. Load configuration.
    let config = load_config()?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);
    info!(
        rows = config.grid.rows,
        cols = config.grid.cols,
        initial_speed = config.speed.initial,
        base_delay_ms = config.speed.base_delay_ms,
        "Configuration loaded"
    );

    // 3. Create the simulation.
    let simulation = Simulation::new(&config)?;

    // 4. Spawn the runner and the renderer.
    let (handle, runner_task) = runner::spawn(simulation);
    let render_task = tokio::spawn(console::render_updates(handle.subscribe()));

    // 5. Serve the console.
    let session = console::run(&handle, config.random.density).await;

    // 6. Shut down, even if the console failed.
    match handle.shutdown().await {
        Ok(_) | Err(SimulationError::RunnerClosed) => {}
        Err(e) => warn!(error = %e, "Shutdown request rejected"),
    }
    drop(handle);
    let result = runner_task.await?;
    runner::log_run_end(&result);
    if let Err(e) = render_task.await {
        warn!(error = %e, "Render task failed");
    }

    session?;
    info!("lifegrid-engine shutdown complete");
    Ok(())
}

/// Load configuration from `LIFEGRID_CONFIG` or `lifegrid-config.yaml`.
///
/// A missing file means defaults; a present but invalid file is an error.
fn load_config() -> Result<LifeConfig, EngineError> {
    let path = std::env::var_os(CONFIG_PATH_ENV)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    if path.exists() {
        Ok(LifeConfig::from_file(&path)?)
    } else {
        let mut config = LifeConfig::default();
        config.logging.apply_env_overrides();
        Ok(config)
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Logs go to stderr
/// so they do not interleave with the grid on stdout.
fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}
