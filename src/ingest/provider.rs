//! Upstream data providers.

use crate::config::IngestConfig;
use crate::ingest::error::ProviderError;
use crate::ingest::payload::{normalize, PollutionResponse, WeatherResponse};
use crate::types::location::Location;
use crate::types::reading::Reading;
use chrono::Utc;
use log::{debug, warn};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::future::Future;

/// Produces one reading for a location per call.
///
/// Any error means "no data for this location this cycle"; the collector
/// logs it and moves on to the next location.
pub trait ReadingSource {
    fn fetch(
        &self,
        location: &Location,
    ) -> impl Future<Output = Result<Reading, ProviderError>> + Send;
}

/// OpenWeatherMap air-pollution plus current-weather endpoints.
pub struct OpenWeatherClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl OpenWeatherClient {
    /// Builds a client whose every request is bounded by `config.request_timeout`.
    pub fn new(config: &IngestConfig) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(ProviderError::ClientBuild)?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        location: &Location,
        extra: &[(&str, &str)],
    ) -> Result<T, ProviderError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let mut query = vec![
            ("lat", location.latitude().to_string()),
            ("lon", location.longitude().to_string()),
            ("appid", self.api_key.clone()),
        ];
        query.extend(extra.iter().map(|(k, v)| (*k, v.to_string())));

        debug!("Requesting {} for {}", url, location.name);
        let response = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkRequest(url.clone(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("HTTP error for {}: {:?}", url, e);
                return Err(if let Some(status) = e.status() {
                    ProviderError::HttpStatus {
                        url,
                        status,
                        source: e,
                    }
                } else {
                    ProviderError::NetworkRequest(url, e)
                });
            }
        };

        let body = response
            .bytes()
            .await
            .map_err(|e| ProviderError::NetworkRequest(url.clone(), e))?;
        serde_json::from_slice(&body)
            .map_err(|source| ProviderError::MalformedPayload { url, source })
    }
}

impl ReadingSource for OpenWeatherClient {
    async fn fetch(&self, location: &Location) -> Result<Reading, ProviderError> {
        let timestamp = Utc::now();
        let (pollution, weather) = tokio::try_join!(
            self.get_json::<PollutionResponse>("air_pollution", location, &[]),
            self.get_json::<WeatherResponse>("weather", location, &[("units", "metric")]),
        )?;
        normalize(&location.name, timestamp, pollution, weather)
    }
}
