//! The set of reading columns a forecast model is trained for.

use crate::types::reading::Reading;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Calendar features shared by every metric, in model input order.
pub const CALENDAR_FEATURES: [&str; 3] = ["hour", "day_of_week", "month"];

/// A reading column that gets its own next-reading model per area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetMetric {
    Aqi,
    Pm25,
    Pm10,
    Temperature,
    Humidity,
}

impl TargetMetric {
    /// Every metric the orchestrator trains, in training order.
    pub const ALL: [TargetMetric; 5] = [
        TargetMetric::Aqi,
        TargetMetric::Pm25,
        TargetMetric::Pm10,
        TargetMetric::Temperature,
        TargetMetric::Humidity,
    ];

    /// Column name in `city_metrics` and in feature frames.
    pub fn column(&self) -> &'static str {
        match self {
            TargetMetric::Aqi => "aqi",
            TargetMetric::Pm25 => "pm25",
            TargetMetric::Pm10 => "pm10",
            TargetMetric::Temperature => "temperature",
            TargetMetric::Humidity => "humidity",
        }
    }

    pub fn value(&self, reading: &Reading) -> Option<f64> {
        match self {
            TargetMetric::Aqi => reading.aqi,
            TargetMetric::Pm25 => reading.pm25,
            TargetMetric::Pm10 => reading.pm10,
            TargetMetric::Temperature => reading.temperature,
            TargetMetric::Humidity => reading.humidity,
        }
    }

    pub fn lag_column(&self) -> String {
        format!("{}_lag1", self.column())
    }

    pub fn rolling_column(&self) -> String {
        format!("{}_roll_avg3", self.column())
    }

    /// Ordered model inputs: `[hour, day_of_week, month, <m>_lag1, <m>_roll_avg3]`.
    pub fn feature_names(&self) -> Vec<String> {
        CALENDAR_FEATURES
            .iter()
            .map(|name| name.to_string())
            .chain([self.lag_column(), self.rolling_column()])
            .collect()
    }
}

/// Formats a `TargetMetric` as its column name.
///
/// ```
/// use aircast::TargetMetric;
///
/// assert_eq!(TargetMetric::Pm25.to_string(), "pm25");
/// ```
impl fmt::Display for TargetMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column())
    }
}
