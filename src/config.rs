//! Process-wide settings for ingestion and training.
//!
//! A [`Config`] is built once by a binary (from defaults plus environment
//! overrides) and passed down explicitly; library code never reads the
//! environment itself.

use crate::error::ConfigError;
use crate::forecast::boosting::BoostingParams;
use crate::types::location::{LatLon, Location};
use bon::Builder;
use std::path::PathBuf;
use std::time::Duration;

const DATA_DIR_NAME: &str = "aircast";
const DATABASE_FILE_NAME: &str = "city_metrics.sqlite3";
const MODEL_DIR_NAME: &str = "models";
const ENV_PREFIX: &str = "AIRCAST";

pub const DEFAULT_OPENWEATHER_URL: &str = "http://api.openweathermap.org/data/2.5";

/// Five Mumbai locations polled when no other table is configured.
pub fn default_locations() -> Vec<Location> {
    vec![
        Location::new("Colaba", LatLon(18.906, 72.813)),
        Location::new("Worli", LatLon(19.017, 72.816)),
        Location::new("Bandra", LatLon(19.063, 72.835)),
        Location::new("Andheri", LatLon(19.119, 72.846)),
        Location::new("Malad", LatLon(19.189, 72.846)),
    ]
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("data"))
        .join(DATA_DIR_NAME)
}

/// Settings for polling the upstream providers.
#[derive(Debug, Clone, Builder)]
pub struct IngestConfig {
    /// Credential appended to every provider request as `appid`.
    #[builder(into, default)]
    pub api_key: String,
    /// Base URL of the provider API, without a trailing slash.
    #[builder(into, default = DEFAULT_OPENWEATHER_URL.to_string())]
    pub base_url: String,
    /// Upper bound for a single HTTP request.
    #[builder(default = Duration::from_secs(15))]
    pub request_timeout: Duration,
    /// Pause between two locations of the same cycle.
    #[builder(default = Duration::from_secs(2))]
    pub request_spacing: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Thresholds and hyperparameters for a training run.
#[derive(Debug, Clone, Builder)]
pub struct TrainingConfig {
    /// Rows needed across the whole store before any training happens.
    #[builder(default = 100)]
    pub min_total_rows: usize,
    /// Featured rows needed for one (area, metric) unit.
    #[builder(default = 50)]
    pub min_featured_rows: usize,
    /// Leading share of featured rows used for fitting; the rest is held out.
    #[builder(default = 0.8)]
    pub train_fraction: f64,
    #[builder(default)]
    pub boosting: BoostingParams,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Top-level configuration handed to the collector and the orchestrator.
#[derive(Debug, Clone, Builder)]
pub struct Config {
    /// SQLite file holding the `city_metrics` table.
    #[builder(into, default = default_data_dir().join(DATABASE_FILE_NAME))]
    pub database_path: PathBuf,
    /// Directory receiving one model artifact per (area, metric).
    #[builder(into, default = default_data_dir().join(MODEL_DIR_NAME))]
    pub model_dir: PathBuf,
    #[builder(default = default_locations())]
    pub locations: Vec<Location>,
    #[builder(default)]
    pub ingest: IngestConfig,
    #[builder(default)]
    pub training: TrainingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Config {
    /// Defaults overridden by `AIRCAST_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Applies overrides from `lookup`, keyed by full variable name.
    ///
    /// The provider credential also accepts the unprefixed `OPENWEATHER_API_KEY`.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}_{name}"));

        if let Some(key) = var("OPENWEATHER_API_KEY").or_else(|| lookup("OPENWEATHER_API_KEY")) {
            self.ingest.api_key = key;
        }
        if let Some(url) = var("OPENWEATHER_URL") {
            self.ingest.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(path) = var("DATABASE_PATH") {
            self.database_path = PathBuf::from(path);
        }
        if let Some(path) = var("MODEL_DIR") {
            self.model_dir = PathBuf::from(path);
        }
        if let Some(secs) = var("REQUEST_TIMEOUT_SECS") {
            self.ingest.request_timeout = parse_secs("REQUEST_TIMEOUT_SECS", &secs)?;
        }
        if let Some(secs) = var("REQUEST_SPACING_SECS") {
            self.ingest.request_spacing = parse_secs("REQUEST_SPACING_SECS", &secs)?;
        }
        Ok(())
    }
}

fn parse_secs(name: &str, value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|source| ConfigError::InvalidValue {
            variable: format!("{ENV_PREFIX}_{name}"),
            value: value.to_string(),
            source,
        })
}
