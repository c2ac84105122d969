//! The reading record appended to the `city_metrics` table by ingestion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One poll of the upstream providers for a single location.
///
/// Readings are append-only: ingestion creates them and nothing downstream
/// mutates or deletes them. `(timestamp, area_name)` is not unique, duplicate
/// polls are tolerated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Instant the reading was taken (UTC).
    pub timestamp: DateTime<Utc>,
    /// Name of the configured location (e.g. "Bandra").
    pub area_name: String,
    /// US AQI derived from `pm25`.
    pub aqi: Option<f64>,
    /// PM2.5 concentration in µg/m³.
    pub pm25: Option<f64>,
    /// PM10 concentration in µg/m³.
    pub pm10: Option<f64>,
    /// Nitrogen dioxide in µg/m³.
    pub no2: Option<f64>,
    /// Ozone in µg/m³.
    pub o3: Option<f64>,
    /// Carbon monoxide in µg/m³.
    pub co: Option<f64>,
    /// Air temperature in °C.
    pub temperature: Option<f64>,
    /// Relative humidity in %.
    pub humidity: Option<f64>,
}

impl Reading {
    /// A reading with only its key set; every measurement is `None`.
    pub fn empty(area_name: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            area_name: area_name.into(),
            aqi: None,
            pm25: None,
            pm10: None,
            no2: None,
            o3: None,
            co: None,
            temperature: None,
            humidity: None,
        }
    }
}
