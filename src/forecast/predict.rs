//! Next-reading predictions from persisted models.

use crate::forecast::artifact::{ArtifactStore, TrainedModel};
use crate::forecast::error::ForecastError;
use crate::forecast::features::FeatureBuilder;
use crate::types::metric::TargetMetric;
use crate::types::reading::Reading;
use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub area: String,
    pub metric: TargetMetric,
    pub at: DateTime<Utc>,
    pub value: f64,
}

/// Predicts `model.metric` at `at` from the area's reading history.
///
/// The feature vector is built under the model's own metric and its names
/// must equal the persisted `feature_names` in order and presence.
pub fn predict_next(
    model: &TrainedModel,
    history: &[Reading],
    at: DateTime<Utc>,
) -> Result<Prediction, ForecastError> {
    let built = model.metric.feature_names();
    if built != model.feature_names {
        return Err(ForecastError::FeatureMismatch {
            metric: model.metric,
            expected: model.feature_names.clone(),
            found: built,
        });
    }

    let features = FeatureBuilder::new()
        .next_features(history, model.metric, at)
        .ok_or_else(|| ForecastError::NoHistory {
            area: model.area.clone(),
            metric: model.metric,
        })?;
    let value = model
        .model
        .predict_one(&features)
        .map_err(|source| ForecastError::Predict {
            area: model.area.clone(),
            metric: model.metric,
            source,
        })?;

    Ok(Prediction {
        area: model.area.clone(),
        metric: model.metric,
        at,
        value,
    })
}

/// One hour after the most recent reading in `history`.
pub fn next_hour(history: &[Reading]) -> Option<DateTime<Utc>> {
    history
        .iter()
        .map(|reading| reading.timestamp)
        .max()
        .map(|latest| latest + Duration::hours(1))
}

/// Next-hour predictions for every metric with a stored model for `area`.
///
/// Metrics without a loadable model, or without usable history, come back
/// as errors next to the successful ones.
pub fn forecast_area(
    artifacts: &ArtifactStore,
    area: &str,
    history: &[Reading],
) -> Vec<(TargetMetric, Result<Prediction, ForecastError>)> {
    let Some(at) = next_hour(history) else {
        return TargetMetric::ALL
            .iter()
            .map(|&metric| {
                let error = ForecastError::NoHistory {
                    area: area.to_string(),
                    metric,
                };
                (metric, Err(error))
            })
            .collect();
    };

    TargetMetric::ALL
        .iter()
        .map(|&metric| {
            let prediction = artifacts
                .load(area, metric)
                .and_then(|model| predict_next(&model, history, at));
            (metric, prediction)
        })
        .collect()
}
