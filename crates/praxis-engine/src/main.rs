//! Demo binary for Praxis.
//!
//! Generates a small build site, wires one agent's managers into the
//! stage-driven tick loop, and runs a build task tree that simulates,
//! acts, fetches, and walks until every target block is in place.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `praxis-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Build the stage schedule from the tick config
//! 4. Generate the demo site
//! 5. Build the agent and its managers
//! 6. Start the build task tree
//! 7. Install the Ctrl-C stop switch
//! 8. Run the tick loop
//! 9. Log the result

mod agent;
mod callback;
mod error;
mod resources;
mod tasks;
mod world;

use std::path::Path;
use std::sync::Arc;

use praxis_core::clock::{StageClock, StageSchedule};
use praxis_core::config::{LoggingConfig, PraxisConfig};
use praxis_core::control::RunControl;
use praxis_core::runner;
use praxis_core::tick::TickDriver;
use tokio::runtime::Handle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::agent::{Agent, BuildHost};
use crate::callback::ProgressCallback;
use crate::error::EngineError;

/// Environment variable that overrides the configured log filter.
const LOG_ENV: &str = "PRAXIS_LOG";

/// Environment variable that picks the demo site seed.
const SEED_ENV: &str = "PRAXIS_SEED";

/// Ticks between progress logs.
const PROGRESS_EVERY: u64 = 20;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if any initialization step fails, or if the build
/// ends with a failure report.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let (config, found) = load_config()?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);
    info!("praxis-engine starting");
    if !found {
        info!("Config file not found, using defaults");
    }
    info!(
        stages = config.tick.stages.len(),
        tick_interval_ms = config.tick.tick_interval_ms,
        max_ticks = config.tick.max_ticks,
        reach = config.build.reach,
        "Configuration loaded"
    );

    // 3. Build the stage schedule.
    let schedule = StageSchedule::from_config(&config.tick).map_err(EngineError::from)?;
    info!(
        first = schedule.name(schedule.first()),
        terminal = schedule.name(schedule.terminal()),
        "Stage schedule built"
    );

    // 4. Generate the demo site.
    let seed = site_seed();
    let site = world::demo_site(seed);
    info!(seed, targets = site.targets.len(), stored = site.storage.len(), "Demo site generated");

    // 5. Build the agent.
    let agent = Agent::new(&config, &schedule, site.world, site.storage, Handle::current())?;
    info!(owner = %agent.owner(), "Agent ready");

    // 6. Start the build.
    let mut host = BuildHost::new(agent, &config.tasks, &schedule);
    host.start(site.targets).map_err(EngineError::from)?;

    // 7. Stop cleanly on Ctrl-C.
    let control = Arc::new(RunControl::new(&config.tick));
    {
        let control = Arc::clone(&control);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Ctrl-C received, stopping after the current tick");
                    control.request_stop();
                }
                Err(e) => warn!(error = %e, "failed to listen for Ctrl-C"),
            }
        });
    }

    // 8. Run the tick loop.
    let mut driver = TickDriver::new(StageClock::new(schedule));
    let mut callback = ProgressCallback::new(PROGRESS_EVERY);
    let result = runner::run_ticks(&mut driver, &mut host, &control, &mut callback)
        .await
        .map_err(EngineError::from)?;

    // 9. Log results.
    runner::log_run_end(&result);
    if let Some(report) = host.forest().failures().first() {
        return Err(EngineError::Build {
            message: report.to_string(),
        }
        .into());
    }
    info!(
        end_reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        finale = ?host.finale_state(),
        "praxis-engine shutdown complete"
    );

    Ok(())
}

/// Load configuration from `praxis-config.yaml` in the working directory.
///
/// Returns the configuration and whether the file was found.
fn load_config() -> Result<(PraxisConfig, bool), EngineError> {
    let config_path = Path::new("praxis-config.yaml");
    if config_path.exists() {
        let config = PraxisConfig::from_file(config_path)?;
        Ok((config, true))
    } else {
        Ok((PraxisConfig::default(), false))
    }
}

/// Install the tracing subscriber.
///
/// `PRAXIS_LOG` takes precedence over the configured level.
fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Seed of the demo site, from `PRAXIS_SEED` or zero.
fn site_seed() -> u64 {
    std::env::var(SEED_ENV)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(0)
}
