//! Trains one model per (area, metric) from everything in the reading store.
//!
//! Exits non-zero only when the reading store or the model directory cannot
//! be used. Skipped and failed units are logged and do not affect the exit
//! code.

use aircast::{
    error_chain, AircastError, ArtifactStore, Config, ReadingStore, TrainingOrchestrator,
    TrainingRun, UnitStatus,
};
use env_logger::Env;
use log::{error, info, warn};
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    match run() {
        Ok(run) => {
            report(&run);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", error_chain(&e));
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<TrainingRun, AircastError> {
    let config = Config::from_env()?;
    info!("Reading training data from {}", config.database_path.display());
    let store = ReadingStore::open(&config.database_path)?;
    store.ensure_schema()?;
    let artifacts = ArtifactStore::open(config.model_dir.clone())?;

    let orchestrator = TrainingOrchestrator::new(config.training, artifacts);
    Ok(orchestrator.run_from_store(&store)?)
}

fn report(run: &TrainingRun) {
    match run {
        TrainingRun::NotEnoughData { rows, required } => {
            info!("Not enough data to train: {rows} readings, need at least {required}.");
        }
        TrainingRun::Completed { .. } => {
            for outcome in run.outcomes() {
                match &outcome.status {
                    UnitStatus::Trained {
                        test_rmse, path, ..
                    } => info!(
                        "{}/{}: RMSE {:.2}, saved to {}",
                        outcome.area,
                        outcome.metric,
                        test_rmse,
                        path.display()
                    ),
                    UnitStatus::Skipped(reason) => {
                        info!("{}/{}: skipped, {}", outcome.area, outcome.metric, reason)
                    }
                    UnitStatus::Failed(message) => {
                        warn!("{}/{}: failed, {}", outcome.area, outcome.metric, message)
                    }
                }
            }
        }
    }
}
