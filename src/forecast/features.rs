//! Turns an area's reading history into supervised rows for one metric.
//!
//! Every row carries calendar features of its own timestamp plus two history
//! features that only look at strictly earlier readings:
//!
//! * `<m>_lag1`: the metric at the immediately preceding reading.
//! * `<m>_roll_avg3`: mean of the metric over up to three immediately
//!   preceding readings, ignoring missing values.
//!
//! A row is kept only when the target and both history features are defined.

use crate::types::metric::TargetMetric;
use crate::types::reading::Reading;
use chrono::{DateTime, Datelike, Timelike, Utc};
use polars::prelude::*;

/// Number of preceding readings averaged by `<m>_roll_avg3`.
pub const ROLLING_WINDOW: usize = 3;

/// Hour of day (0-23), day of week (Monday = 0) and month (1-12).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarFeatures {
    pub hour: u32,
    pub day_of_week: u32,
    pub month: u32,
}

impl CalendarFeatures {
    pub fn of(timestamp: DateTime<Utc>) -> Self {
        Self {
            hour: timestamp.hour(),
            day_of_week: timestamp.weekday().num_days_from_monday(),
            month: timestamp.month(),
        }
    }
}

/// One supervised example for a single metric.
#[derive(Debug, Clone, PartialEq)]
pub struct FeaturedRow {
    pub timestamp: DateTime<Utc>,
    pub calendar: CalendarFeatures,
    pub lag1: f64,
    pub roll_avg3: f64,
    pub target: f64,
}

impl FeaturedRow {
    /// Values in [`TargetMetric::feature_names`] order.
    pub fn features(&self) -> [f64; 5] {
        [
            f64::from(self.calendar.hour),
            f64::from(self.calendar.day_of_week),
            f64::from(self.calendar.month),
            self.lag1,
            self.roll_avg3,
        ]
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureBuilder;

impl FeatureBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Featured rows for `metric`, ascending by timestamp.
    ///
    /// `readings` should all belong to one area. They are sorted here (stable,
    /// so equal timestamps keep their input order); the input itself is left
    /// untouched.
    pub fn build(&self, readings: &[Reading], metric: TargetMetric) -> Vec<FeaturedRow> {
        let sorted = sorted_by_time(readings);
        let values: Vec<Option<f64>> = sorted
            .iter()
            .map(|reading| metric.value(reading).filter(|v| v.is_finite()))
            .collect();

        let mut rows = Vec::with_capacity(sorted.len().saturating_sub(1));
        for (index, reading) in sorted.iter().enumerate().skip(1) {
            let Some(target) = values[index] else {
                continue;
            };
            let Some(lag1) = values[index - 1] else {
                continue;
            };
            let Some(roll_avg3) = trailing_mean(&values[..index]) else {
                continue;
            };
            rows.push(FeaturedRow {
                timestamp: reading.timestamp,
                calendar: CalendarFeatures::of(reading.timestamp),
                lag1,
                roll_avg3,
                target,
            });
        }
        rows
    }

    /// Feature values for predicting `metric` at `at`, from the whole history.
    ///
    /// `None` when the most recent reading has no value for the metric.
    pub fn next_features(
        &self,
        history: &[Reading],
        metric: TargetMetric,
        at: DateTime<Utc>,
    ) -> Option<[f64; 5]> {
        let sorted = sorted_by_time(history);
        let values: Vec<Option<f64>> = sorted
            .iter()
            .map(|reading| metric.value(reading).filter(|v| v.is_finite()))
            .collect();

        let lag1 = (*values.last()?)?;
        let roll_avg3 = trailing_mean(&values)?;
        let calendar = CalendarFeatures::of(at);
        Some([
            f64::from(calendar.hour),
            f64::from(calendar.day_of_week),
            f64::from(calendar.month),
            lag1,
            roll_avg3,
        ])
    }
}

fn sorted_by_time(readings: &[Reading]) -> Vec<&Reading> {
    let mut sorted: Vec<&Reading> = readings.iter().collect();
    sorted.sort_by_key(|reading| reading.timestamp);
    sorted
}

/// Mean of the defined values among the last [`ROLLING_WINDOW`] entries.
fn trailing_mean(values: &[Option<f64>]) -> Option<f64> {
    let start = values.len().saturating_sub(ROLLING_WINDOW);
    let (sum, count) = values[start..]
        .iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Lays out `rows` as a frame with one column per feature plus the target.
///
/// Column names follow [`TargetMetric::feature_names`], the target column is
/// named after the metric itself.
pub fn metric_frame(metric: TargetMetric, rows: &[FeaturedRow]) -> PolarsResult<DataFrame> {
    let column = |name: &str, values: Vec<f64>| Column::new(name.into(), values);
    let mut columns: Vec<Column> = metric
        .feature_names()
        .iter()
        .enumerate()
        .map(|(position, name)| {
            column(
                name,
                rows.iter().map(|row| row.features()[position]).collect(),
            )
        })
        .collect();
    columns.push(column(
        metric.column(),
        rows.iter().map(|row| row.target).collect(),
    ));
    DataFrame::new(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone};

    fn start() -> DateTime<Utc> {
        // A Friday.
        Utc.with_ymd_and_hms(2024, 3, 1, 22, 0, 0).unwrap()
    }

    fn series(pm25: &[Option<f64>]) -> Vec<Reading> {
        pm25.iter()
            .enumerate()
            .map(|(i, value)| {
                let mut reading = Reading::empty("Bandra", start() + Duration::hours(i as i64));
                reading.pm25 = *value;
                reading
            })
            .collect()
    }

    #[test]
    fn test_calendar_features() {
        let calendar = CalendarFeatures::of(start());
        assert_eq!(calendar.hour, 22);
        assert_eq!(calendar.day_of_week, 4);
        assert_eq!(calendar.month, 3);
    }

    #[test]
    fn test_lag_and_rolling_mean() {
        let readings = series(&[Some(10.0), Some(20.0), Some(30.0), Some(40.0), Some(50.0)]);
        let rows = FeatureBuilder::new().build(&readings, TargetMetric::Pm25);

        assert_eq!(rows.len(), 4);
        // Second reading: only one prior value.
        assert_relative_eq!(rows[0].lag1, 10.0);
        assert_relative_eq!(rows[0].roll_avg3, 10.0);
        assert_relative_eq!(rows[0].target, 20.0);
        // Third reading: mean of two prior values.
        assert_relative_eq!(rows[1].roll_avg3, 15.0);
        // Fifth reading: window of three, excludes the current value.
        assert_relative_eq!(rows[3].lag1, 40.0);
        assert_relative_eq!(rows[3].roll_avg3, 30.0);
        assert_relative_eq!(rows[3].target, 50.0);
        assert_eq!(rows[3].calendar.hour, 2);
        assert_eq!(rows[3].calendar.day_of_week, 5);
    }

    #[test]
    fn test_missing_values_drop_rows() {
        let readings = series(&[Some(10.0), None, Some(30.0), Some(40.0), Some(50.0)]);
        let rows = FeatureBuilder::new().build(&readings, TargetMetric::Pm25);

        // Index 1 has no target, index 2 has no lag.
        let targets: Vec<f64> = rows.iter().map(|r| r.target).collect();
        assert_eq!(targets, [40.0, 50.0]);
        // Window before index 3 is [10, None, 30].
        assert_relative_eq!(rows[0].roll_avg3, 20.0);
    }

    #[test]
    fn test_unsorted_input_gives_sorted_output() {
        let mut readings = series(&[Some(1.0), Some(2.0), Some(3.0), Some(4.0)]);
        readings.reverse();
        let before = readings.clone();

        let rows = FeatureBuilder::new().build(&readings, TargetMetric::Pm25);

        assert_eq!(readings, before);
        assert!(rows.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        let targets: Vec<f64> = rows.iter().map(|r| r.target).collect();
        assert_eq!(targets, [2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_features_use_only_earlier_readings() {
        let readings = series(&[Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(5.0)]);
        let baseline = FeatureBuilder::new().build(&readings, TargetMetric::Pm25);

        let mut changed = readings.clone();
        changed[3].pm25 = Some(1000.0);
        let rows = FeatureBuilder::new().build(&changed, TargetMetric::Pm25);

        // Rows up to and including the changed reading have identical features.
        for (row, base) in rows.iter().zip(&baseline).take(3) {
            assert_eq!(row.features(), base.features());
        }
        assert_ne!(rows[3].features(), baseline[3].features());
    }

    #[test]
    fn test_build_is_deterministic() {
        let readings = series(&[Some(3.0), Some(1.0), Some(4.0), Some(1.0), Some(5.0)]);
        let builder = FeatureBuilder::new();
        assert_eq!(
            builder.build(&readings, TargetMetric::Pm25),
            builder.build(&readings, TargetMetric::Pm25)
        );
    }

    #[test]
    fn test_metrics_are_independent() {
        let mut readings = series(&[Some(1.0), Some(2.0), Some(3.0)]);
        readings[1].temperature = Some(25.0);
        let builder = FeatureBuilder::new();

        assert_eq!(builder.build(&readings, TargetMetric::Pm25).len(), 2);
        assert!(builder.build(&readings, TargetMetric::Temperature).is_empty());
    }

    #[test]
    fn test_next_features() {
        let readings = series(&[Some(10.0), Some(20.0), Some(30.0), Some(40.0)]);
        let at = start() + Duration::hours(4);

        let features = FeatureBuilder::new()
            .next_features(&readings, TargetMetric::Pm25, at)
            .unwrap();

        assert_eq!(features, [2.0, 5.0, 3.0, 40.0, 30.0]);
        assert!(FeatureBuilder::new()
            .next_features(&readings, TargetMetric::Pm10, at)
            .is_none());
    }

    #[test]
    fn test_metric_frame_layout() {
        let readings = series(&[Some(10.0), Some(20.0), Some(30.0)]);
        let rows = FeatureBuilder::new().build(&readings, TargetMetric::Pm25);

        let frame = metric_frame(TargetMetric::Pm25, &rows).unwrap();

        assert_eq!(frame.height(), 2);
        let names: Vec<String> = frame
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect();
        assert_eq!(
            names,
            ["hour", "day_of_week", "month", "pm25_lag1", "pm25_roll_avg3", "pm25"]
        );
        let targets: Vec<Option<f64>> = frame
            .column("pm25")
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(targets, [Some(20.0), Some(30.0)]);
    }
}
