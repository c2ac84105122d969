//! Fits one model for one (area, metric) unit from its feature frame.

use crate::config::TrainingConfig;
use crate::forecast::artifact::TrainedModel;
use crate::forecast::boosting::{rmse, GradientBoostedRegressor};
use crate::forecast::error::ForecastError;
use crate::types::metric::TargetMetric;
use chrono::Utc;
use log::debug;
use polars::prelude::*;
use std::fmt;

/// Why a unit was not trained. Skips are expected while data accumulates.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    InsufficientData { rows: usize, required: usize },
    MissingFeatures { missing: Vec<String> },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InsufficientData { rows, required } => {
                write!(f, "insufficient data ({rows} featured rows, need {required})")
            }
            SkipReason::MissingFeatures { missing } => {
                write!(f, "missing features: {}", missing.join(", "))
            }
        }
    }
}

#[derive(Debug)]
pub enum TrainOutcome {
    Trained(TrainedModel),
    Skipped(SkipReason),
}

pub struct MetricTrainer<'a> {
    config: &'a TrainingConfig,
}

impl<'a> MetricTrainer<'a> {
    pub fn new(config: &'a TrainingConfig) -> Self {
        Self { config }
    }

    /// Splits `frame` chronologically, fits on the leading part with the
    /// trailing part as evaluation set, and reports test RMSE.
    ///
    /// `frame` must be in ascending time order, as produced by
    /// [`metric_frame`](crate::forecast::features::metric_frame).
    pub fn train(
        &self,
        area: &str,
        metric: TargetMetric,
        frame: &DataFrame,
    ) -> Result<TrainOutcome, ForecastError> {
        let feature_names = metric.feature_names();
        let missing: Vec<String> = feature_names
            .iter()
            .map(String::as_str)
            .chain([metric.column()])
            .filter(|name| frame.get_column_index(name).is_none())
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            return Ok(TrainOutcome::Skipped(SkipReason::MissingFeatures { missing }));
        }

        let rows = frame.height();
        if rows < self.config.min_featured_rows {
            return Ok(TrainOutcome::Skipped(SkipReason::InsufficientData {
                rows,
                required: self.config.min_featured_rows,
            }));
        }

        let columns = feature_names
            .iter()
            .map(|name| column_values(frame, name))
            .collect::<Result<Vec<_>, _>>()?;
        let x: Vec<Vec<f64>> = (0..rows)
            .map(|row| columns.iter().map(|column| column[row]).collect())
            .collect();
        let y = column_values(frame, metric.column())?;

        let split = split_index(rows, self.config.train_fraction);
        let (x_train, x_test) = x.split_at(split);
        let (y_train, y_test) = y.split_at(split);
        debug!(
            "{area}/{metric}: {} training rows, {} test rows",
            x_train.len(),
            x_test.len()
        );

        let (model, report) = GradientBoostedRegressor::fit(
            &self.config.boosting,
            x_train,
            y_train,
            Some((x_test, y_test)),
        )
        .map_err(|source| ForecastError::Fit {
            area: area.to_string(),
            metric,
            source,
        })?;
        let predictions = model.predict(x_test).map_err(|source| ForecastError::Fit {
            area: area.to_string(),
            metric,
            source,
        })?;
        let test_rmse = rmse(&predictions, y_test);
        debug!(
            "{area}/{metric}: kept {} of {} rounds",
            report.best_round, report.rounds_trained
        );

        Ok(TrainOutcome::Trained(TrainedModel {
            area: area.to_string(),
            metric,
            feature_names,
            model,
            test_rmse,
            train_rows: x_train.len(),
            test_rows: x_test.len(),
            trained_at: Utc::now(),
        }))
    }
}

/// Size of the leading training partition: `floor(fraction * rows)`, kept
/// within `1..rows` so neither side is empty.
pub fn split_index(rows: usize, fraction: f64) -> usize {
    // Tolerance absorbs products like 0.8 * 55 = 43.99999...
    let split = (rows as f64 * fraction + 1e-9).floor() as usize;
    split.clamp(1, rows.saturating_sub(1).max(1))
}

fn column_values(frame: &DataFrame, name: &str) -> Result<Vec<f64>, ForecastError> {
    let values = frame.column(name)?.as_materialized_series().cast(&DataType::Float64)?;
    values
        .f64()?
        .into_iter()
        .map(|value| {
            value
                .filter(|v| v.is_finite())
                .ok_or_else(|| ForecastError::NonFiniteInput {
                    column: name.to_string(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::boosting::BoostingParams;
    use crate::forecast::features::{metric_frame, FeatureBuilder};
    use crate::types::metric::CALENDAR_FEATURES;
    use crate::types::reading::Reading;
    use chrono::{Duration, TimeZone};

    fn config() -> TrainingConfig {
        TrainingConfig::builder()
            .boosting(BoostingParams::builder().max_rounds(100).learning_rate(0.1).build())
            .build()
    }

    fn frame(n: usize) -> DataFrame {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let readings: Vec<Reading> = (0..n)
            .map(|i| {
                let mut reading = Reading::empty("Andheri", start + Duration::hours(i as i64));
                reading.temperature = Some(25.0 + 4.0 * ((i % 24) as f64 / 24.0));
                reading
            })
            .collect();
        let rows = FeatureBuilder::new().build(&readings, TargetMetric::Temperature);
        metric_frame(TargetMetric::Temperature, &rows).unwrap()
    }

    #[test]
    fn test_split_index() {
        for rows in 2..500 {
            assert_eq!(split_index(rows, 0.8), rows * 4 / 5, "rows = {rows}");
        }
        assert_eq!(split_index(1, 0.8), 1);
        assert_eq!(split_index(10, 1.0), 9);
    }

    #[test]
    fn test_trains_with_enough_rows() {
        let config = config();
        let outcome = MetricTrainer::new(&config)
            .train("Andheri", TargetMetric::Temperature, &frame(81))
            .unwrap();

        let model = match outcome {
            TrainOutcome::Trained(model) => model,
            other => panic!("expected a trained model, got {other:?}"),
        };
        assert_eq!(model.train_rows, 64);
        assert_eq!(model.test_rows, 16);
        assert_eq!(model.feature_names, TargetMetric::Temperature.feature_names());
        assert!(model.test_rmse.is_finite());
        assert!(model.test_rmse < 4.0);
    }

    #[test]
    fn test_skips_short_frames() {
        let config = config();
        let outcome = MetricTrainer::new(&config)
            .train("Andheri", TargetMetric::Temperature, &frame(40))
            .unwrap();
        assert!(matches!(
            outcome,
            TrainOutcome::Skipped(SkipReason::InsufficientData {
                rows: 39,
                required: 50
            })
        ));
    }

    #[test]
    fn test_skips_missing_features() {
        let config = config();
        let frame = frame(61).drop("temperature_lag1").unwrap();
        let outcome = MetricTrainer::new(&config)
            .train("Andheri", TargetMetric::Temperature, &frame)
            .unwrap();
        match outcome {
            TrainOutcome::Skipped(reason @ SkipReason::MissingFeatures { .. }) => {
                assert_eq!(reason.to_string(), "missing features: temperature_lag1");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_missing_features_reported_before_row_count() {
        let config = config();
        let frame = frame(1).select(CALENDAR_FEATURES).unwrap();
        let outcome = MetricTrainer::new(&config)
            .train("Andheri", TargetMetric::Temperature, &frame)
            .unwrap();
        match outcome {
            TrainOutcome::Skipped(SkipReason::MissingFeatures { missing }) => {
                assert_eq!(
                    missing,
                    ["temperature_lag1", "temperature_roll_avg3", "temperature"]
                );
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_skip_reason_display() {
        let reason = SkipReason::InsufficientData {
            rows: 12,
            required: 50,
        };
        assert_eq!(reason.to_string(), "insufficient data (12 featured rows, need 50)");
    }
}
