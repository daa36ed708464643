//! Battle resolution binary for Bastion.
//!
//! Loads a world configuration and a scenario, resolves the scenario's
//! commands in a single tick, and prints one JSON battle report per line.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `$BASTION_CONFIG` or `bastion-config.yaml`
//! 2. Initialize structured logging (`BASTION_LOG` overrides the level)
//! 3. Load the scenario named on the command line (default
//!    `bastion-scenario.yaml`)
//! 4. Resolve the tick and emit reports
//! 5. Log the tick summary

mod error;
mod scenario;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bastion_core::config::WorldConfig;
use bastion_core::ports::{
    BattleReport, CollectingReportSink, InMemoryVillageStore, ReportSink, TracingReportSink,
    VillageStore,
};
use bastion_core::resolver::ResolveContext;
use bastion_core::tick::TickDriver;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::scenario::Scenario;

const DEFAULT_CONFIG: &str = "bastion-config.yaml";
const DEFAULT_SCENARIO: &str = "bastion-scenario.yaml";

/// Forwards every report to two sinks.
struct FanOut {
    collect: Arc<CollectingReportSink>,
    log: TracingReportSink,
}

impl ReportSink for FanOut {
    fn emit(&self, report: BattleReport) {
        self.log.emit(report.clone());
        self.collect.emit(report);
    }
}

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration or scenario loading fails, or if a
/// report cannot be serialized.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config = load_config()?;

    // 2. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("BASTION_LOG")
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!(
        world_name = %config.world.name,
        seed = config.world.seed,
        speed = config.world.speed,
        rng = ?config.world.rng,
        "bastion-engine starting"
    );

    // 3. Load the scenario.
    let scenario_path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_SCENARIO), PathBuf::from);
    let scenario = Scenario::from_file(&scenario_path)?;
    info!(
        path = %scenario_path.display(),
        villages = scenario.villages.len(),
        commands = scenario.commands.len(),
        "Scenario loaded"
    );

    // 4. Resolve.
    let store = Arc::new(InMemoryVillageStore::with_villages(scenario.villages));
    let collect = Arc::new(CollectingReportSink::new());
    let sink = FanOut {
        collect: Arc::clone(&collect),
        log: TracingReportSink,
    };
    let driver = TickDriver::new(
        ResolveContext::new(config),
        Arc::clone(&store) as Arc<dyn VillageStore>,
        Arc::new(sink),
    );
    let summary = driver.resolve_tick(scenario.commands).await;

    for battle in collect.battles() {
        println!("{}", serde_json::to_string(&battle).map_err(EngineError::from)?);
    }
    for rejection in &summary.rejected {
        warn!(
            command_id = %rejection.command_id,
            code = rejection.error.code(),
            error = %rejection.error,
            "Rejected"
        );
    }

    // 5. Summary.
    info!(
        admitted = summary.admitted,
        rejected = summary.rejected.len(),
        battles = summary.battles,
        reinforcements = summary.reinforcements,
        captures = summary.captures,
        failed = summary.failed.len(),
        villages = store.all().len(),
        "bastion-engine finished"
    );

    Ok(())
}

/// Load the world configuration.
///
/// Uses `$BASTION_CONFIG` when set, otherwise `bastion-config.yaml` in the
/// working directory. A missing default file means default rules.
fn load_config() -> Result<WorldConfig, EngineError> {
    if let Some(path) = std::env::var_os("BASTION_CONFIG") {
        return Ok(WorldConfig::from_file(Path::new(&path))?);
    }
    let path = Path::new(DEFAULT_CONFIG);
    if path.exists() {
        Ok(WorldConfig::from_file(path)?)
    } else {
        Ok(WorldConfig::default())
    }
}
