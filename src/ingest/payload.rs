//! Wire shapes of the OpenWeatherMap air-pollution and current-weather
//! responses, and their normalization into a [`Reading`].

use crate::aqi::us_aqi_from_pm25;
use crate::ingest::error::ProviderError;
use crate::types::reading::Reading;
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct PollutionResponse {
    /// Absent when the provider answered with an error object.
    pub list: Option<Vec<PollutionEntry>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollutionEntry {
    #[serde(default)]
    pub components: Components,
}

/// Pollutant concentrations in µg/m³.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Components {
    pub co: Option<f64>,
    pub no2: Option<f64>,
    pub o3: Option<f64>,
    pub pm2_5: Option<f64>,
    pub pm10: Option<f64>,
}

/// The `cod` field is a number on success and sometimes a string on errors.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ResponseCode {
    Number(i64),
    Text(String),
}

impl ResponseCode {
    pub fn is_success(&self) -> bool {
        match self {
            ResponseCode::Number(code) => *code == 200,
            ResponseCode::Text(code) => code.trim() == "200",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherResponse {
    pub cod: Option<ResponseCode>,
    pub message: Option<String>,
    pub main: Option<MainBlock>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MainBlock {
    /// °C when requested with `units=metric`.
    pub temp: Option<f64>,
    pub humidity: Option<f64>,
}

/// Builds the reading for `area` from both provider responses.
///
/// Fails when either response reports an error, when the pollution list is
/// empty, or when PM2.5 is missing (such readings are never stored). AQI is
/// derived from PM2.5.
pub fn normalize(
    area: &str,
    timestamp: DateTime<Utc>,
    pollution: PollutionResponse,
    weather: WeatherResponse,
) -> Result<Reading, ProviderError> {
    let upstream = |message: String| ProviderError::Upstream {
        area: area.to_string(),
        message,
    };

    let entry = pollution
        .list
        .ok_or_else(|| upstream("air pollution response has no 'list'".to_string()))?
        .into_iter()
        .next()
        .ok_or_else(|| upstream("air pollution list is empty".to_string()))?;

    if !weather.cod.as_ref().is_some_and(ResponseCode::is_success) {
        return Err(upstream(format!(
            "weather response code {:?}: {}",
            weather.cod,
            weather.message.as_deref().unwrap_or("no message")
        )));
    }
    let main = weather
        .main
        .ok_or_else(|| upstream("weather response has no 'main' block".to_string()))?;

    let components = entry.components;
    let pm25 = components.pm2_5.ok_or_else(|| ProviderError::MissingField {
        area: area.to_string(),
        field: "pm2_5",
    })?;

    let mut reading = Reading::empty(area, timestamp);
    reading.aqi = us_aqi_from_pm25(pm25).map(f64::from);
    reading.pm25 = Some(pm25);
    reading.pm10 = components.pm10;
    reading.no2 = components.no2;
    reading.o3 = components.o3;
    reading.co = components.co;
    reading.temperature = main.temp;
    reading.humidity = main.humidity;
    Ok(reading)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const POLLUTION_OK: &str = r#"{
        "coord": {"lon": 72.835, "lat": 19.063},
        "list": [{
            "main": {"aqi": 3},
            "components": {"co": 540.7, "no": 0.1, "no2": 12.3, "o3": 61.5,
                           "so2": 8.2, "pm2_5": 40.0, "pm10": 72.4, "nh3": 4.1},
            "dt": 1709280000
        }]
    }"#;

    const WEATHER_OK: &str = r#"{
        "main": {"temp": 29.4, "feels_like": 32.0, "pressure": 1010, "humidity": 66},
        "name": "Bandra",
        "cod": 200
    }"#;

    fn timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
    }

    fn parse(pollution: &str, weather: &str) -> Result<Reading, ProviderError> {
        normalize(
            "Bandra",
            timestamp(),
            serde_json::from_str(pollution).unwrap(),
            serde_json::from_str(weather).unwrap(),
        )
    }

    #[test]
    fn test_normalize_success() {
        let reading = parse(POLLUTION_OK, WEATHER_OK).unwrap();

        assert_eq!(reading.area_name, "Bandra");
        assert_eq!(reading.timestamp, timestamp());
        assert_eq!(reading.pm25, Some(40.0));
        assert_eq!(reading.pm10, Some(72.4));
        assert_eq!(reading.no2, Some(12.3));
        assert_eq!(reading.o3, Some(61.5));
        assert_eq!(reading.co, Some(540.7));
        assert_eq!(reading.temperature, Some(29.4));
        assert_eq!(reading.humidity, Some(66.0));
        assert_eq!(reading.aqi, Some(112.0));
    }

    #[test]
    fn test_error_object_without_list() {
        let err = parse(r#"{"cod": 401, "message": "Invalid API key"}"#, WEATHER_OK).unwrap_err();
        assert!(matches!(err, ProviderError::Upstream { .. }));
    }

    #[test]
    fn test_weather_error_code_as_string() {
        let weather = r#"{"cod": "404", "message": "city not found"}"#;
        let err = parse(POLLUTION_OK, weather).unwrap_err();
        match err {
            ProviderError::Upstream { area, message } => {
                assert_eq!(area, "Bandra");
                assert!(message.contains("city not found"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_pm25_is_rejected() {
        let pollution = r#"{"list": [{"components": {"pm10": 10.0}}]}"#;
        let err = parse(pollution, WEATHER_OK).unwrap_err();
        assert!(matches!(err, ProviderError::MissingField { field: "pm2_5", .. }));
    }

    #[test]
    fn test_empty_list_is_rejected() {
        let err = parse(r#"{"list": []}"#, WEATHER_OK).unwrap_err();
        assert!(matches!(err, ProviderError::Upstream { .. }));
    }

    #[test]
    fn test_string_success_code() {
        assert!(ResponseCode::Text("200".into()).is_success());
        assert!(!ResponseCode::Number(500).is_success());
    }
}
