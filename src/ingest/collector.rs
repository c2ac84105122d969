//! One ingestion cycle over every configured location.

use crate::ingest::error::ProviderError;
use crate::ingest::provider::ReadingSource;
use crate::types::location::Location;
use crate::types::reading::Reading;
use crate::utils::error_chain;
use log::{info, warn};
use std::time::Duration;

/// A location that yielded no reading this cycle.
#[derive(Debug)]
pub struct LocationFailure {
    pub area: String,
    pub error: ProviderError,
}

/// Outcome of one cycle: valid readings plus the isolated per-location failures.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub readings: Vec<Reading>,
    pub failures: Vec<LocationFailure>,
}

impl CycleReport {
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

pub struct Collector<S> {
    source: S,
    locations: Vec<Location>,
    spacing: Duration,
}

impl<S: ReadingSource> Collector<S> {
    /// `spacing` is the pause between two consecutive locations.
    pub fn new(source: S, locations: Vec<Location>, spacing: Duration) -> Self {
        Self {
            source,
            locations,
            spacing,
        }
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    /// Fetches every location in order. A failing location is recorded and
    /// skipped; it never prevents the remaining locations from being fetched.
    pub async fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();

        for (index, location) in self.locations.iter().enumerate() {
            if index > 0 && !self.spacing.is_zero() {
                tokio::time::sleep(self.spacing).await;
            }

            info!("Fetching data for {}", location.name);
            match self.source.fetch(location).await {
                Ok(reading) => {
                    info!(
                        "Fetched {}: pm25={:?} aqi={:?} temperature={:?}",
                        location.name, reading.pm25, reading.aqi, reading.temperature
                    );
                    report.readings.push(reading);
                }
                Err(error) => {
                    warn!(
                        "No data for {} this cycle: {}",
                        location.name,
                        error_chain(&error)
                    );
                    report.failures.push(LocationFailure {
                        area: location.name.clone(),
                        error,
                    });
                }
            }
        }

        info!(
            "Ingestion cycle finished: {} readings, {} failed locations",
            report.readings.len(),
            report.failures.len()
        );
        report
    }
}
