//! Runs one ingestion cycle over the configured locations and appends the
//! valid readings to the store. Meant to be triggered by an external
//! scheduler.

use aircast::{
    error_chain, AircastError, Collector, Config, OpenWeatherClient, ReadingStore, StoreError,
};
use env_logger::Env;
use log::{error, info, warn};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", error_chain(&e));
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), AircastError> {
    let config = Config::from_env()?;
    if config.ingest.api_key.is_empty() {
        warn!("No OpenWeatherMap API key configured, requests will be rejected upstream");
    }

    let database_path = config.database_path.clone();
    let mut store = tokio::task::spawn_blocking(move || -> Result<ReadingStore, StoreError> {
        let store = ReadingStore::open(&database_path)?;
        store.ensure_schema()?;
        Ok(store)
    })
    .await??;
    info!("Using reading store at {}", config.database_path.display());

    let client = OpenWeatherClient::new(&config.ingest)?;
    let collector = Collector::new(client, config.locations, config.ingest.request_spacing);
    let report = collector.run_cycle().await;

    if report.is_empty() {
        warn!("No valid data collected to save");
        return Ok(());
    }

    let readings = report.readings;
    let saved = tokio::task::spawn_blocking(move || store.append(&readings)).await??;
    info!("Saved {} readings", saved);
    Ok(())
}
