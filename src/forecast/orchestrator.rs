//! A training run: every (area, metric) unit in the store, each isolated from
//! the others.

use crate::config::TrainingConfig;
use crate::forecast::artifact::ArtifactStore;
use crate::forecast::error::ForecastError;
use crate::forecast::features::{metric_frame, FeatureBuilder};
use crate::forecast::trainer::{MetricTrainer, SkipReason, TrainOutcome};
use crate::store::error::StoreError;
use crate::store::reading_store::ReadingStore;
use crate::types::metric::{TargetMetric, CALENDAR_FEATURES};
use crate::types::reading::Reading;
use crate::utils::error_chain;
use log::{error, info, warn};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum UnitStatus {
    Trained {
        test_rmse: f64,
        train_rows: usize,
        test_rows: usize,
        path: PathBuf,
    },
    Skipped(SkipReason),
    /// Fit or persistence failed; carries the full error chain.
    Failed(String),
}

/// Result for one (area, metric) unit.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitOutcome {
    pub area: String,
    pub metric: TargetMetric,
    pub status: UnitStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrainingRun {
    /// The store holds fewer rows than the global minimum; nothing was trained.
    NotEnoughData { rows: usize, required: usize },
    Completed {
        rows: usize,
        outcomes: Vec<UnitOutcome>,
    },
}

impl TrainingRun {
    pub fn outcomes(&self) -> &[UnitOutcome] {
        match self {
            TrainingRun::NotEnoughData { .. } => &[],
            TrainingRun::Completed { outcomes, .. } => outcomes,
        }
    }

    pub fn trained_count(&self) -> usize {
        self.outcomes()
            .iter()
            .filter(|outcome| matches!(outcome.status, UnitStatus::Trained { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes()
            .iter()
            .filter(|outcome| matches!(outcome.status, UnitStatus::Failed(_)))
            .count()
    }
}

pub struct TrainingOrchestrator {
    config: TrainingConfig,
    artifacts: ArtifactStore,
    features: FeatureBuilder,
}

impl TrainingOrchestrator {
    pub fn new(config: TrainingConfig, artifacts: ArtifactStore) -> Self {
        Self {
            config,
            artifacts,
            features: FeatureBuilder::new(),
        }
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Trains from a snapshot of the whole store.
    ///
    /// Only reading the store can fail; every per-unit problem ends up in the
    /// returned [`TrainingRun`]. Metrics whose column the table lacks are
    /// skipped with [`SkipReason::MissingFeatures`].
    pub fn run_from_store(&self, store: &ReadingStore) -> Result<TrainingRun, StoreError> {
        let missing_columns = store.missing_columns()?;
        let absent: Vec<TargetMetric> = TargetMetric::ALL
            .iter()
            .copied()
            .filter(|metric| missing_columns.contains(&metric.column()))
            .collect();
        if !missing_columns.is_empty() {
            warn!("city_metrics has no column for: {}", missing_columns.join(", "));
        }

        let readings = store.load_all()?;
        info!("Loaded {} readings from the store", readings.len());
        Ok(self.run_with_absent(&readings, &absent))
    }

    pub fn run(&self, readings: &[Reading]) -> TrainingRun {
        self.run_with_absent(readings, &[])
    }

    fn run_with_absent(&self, readings: &[Reading], absent: &[TargetMetric]) -> TrainingRun {
        if readings.len() < self.config.min_total_rows {
            info!(
                "Not enough data to train: {} readings, need at least {}",
                readings.len(),
                self.config.min_total_rows
            );
            return TrainingRun::NotEnoughData {
                rows: readings.len(),
                required: self.config.min_total_rows,
            };
        }

        let mut by_area: BTreeMap<&str, Vec<Reading>> = BTreeMap::new();
        for reading in readings {
            by_area
                .entry(reading.area_name.as_str())
                .or_default()
                .push(reading.clone());
        }

        let mut outcomes = Vec::with_capacity(by_area.len() * TargetMetric::ALL.len());
        for (area, area_readings) in &by_area {
            info!("--- Processing data and training models for {area} ---");
            let area_outcomes: Vec<UnitOutcome> = TargetMetric::ALL
                .iter()
                .map(|&metric| UnitOutcome {
                    area: area.to_string(),
                    metric,
                    status: self.train_unit(area, metric, area_readings, absent),
                })
                .collect();

            if area_outcomes.iter().all(|outcome| {
                matches!(
                    outcome.status,
                    UnitStatus::Skipped(SkipReason::InsufficientData { .. })
                )
            }) {
                info!("Not enough featured data for {area}. Skipping.");
            }
            outcomes.extend(area_outcomes);
        }

        let run = TrainingRun::Completed {
            rows: readings.len(),
            outcomes,
        };
        info!(
            "Training run finished: {} models trained, {} failed, {} units total",
            run.trained_count(),
            run.failed_count(),
            run.outcomes().len()
        );
        run
    }

    fn train_unit(
        &self,
        area: &str,
        metric: TargetMetric,
        readings: &[Reading],
        absent: &[TargetMetric],
    ) -> UnitStatus {
        match self.fit_and_save(area, metric, readings, absent.contains(&metric)) {
            Ok(status) => status,
            Err(e) => {
                let message = error_chain(&e);
                error!("Training {metric} for {area} failed: {message}");
                UnitStatus::Failed(message)
            }
        }
    }

    fn fit_and_save(
        &self,
        area: &str,
        metric: TargetMetric,
        readings: &[Reading],
        column_absent: bool,
    ) -> Result<UnitStatus, ForecastError> {
        let rows = self.features.build(readings, metric);
        let mut frame = metric_frame(metric, &rows)?;
        if column_absent {
            frame = frame.select(CALENDAR_FEATURES)?;
        }

        info!("Training model for {metric}...");
        match MetricTrainer::new(&self.config).train(area, metric, &frame)? {
            TrainOutcome::Skipped(reason) => {
                warn!("Skipping model for '{metric}' in {area}: {reason}");
                Ok(UnitStatus::Skipped(reason))
            }
            TrainOutcome::Trained(model) => {
                info!(
                    "-> Model for '{metric}' trained. Test RMSE: {:.2}",
                    model.test_rmse
                );
                let path = self.artifacts.save(&model)?;
                info!("-> Model saved to {}", path.display());
                Ok(UnitStatus::Trained {
                    test_rmse: model.test_rmse,
                    train_rows: model.train_rows,
                    test_rows: model.test_rows,
                    path,
                })
            }
        }
    }
}
