mod aqi;
mod config;
mod error;
mod forecast;
mod ingest;
mod store;
mod types;
mod utils;

pub use aqi::{us_aqi_from_pm25, AqiCategory};
pub use config::*;
pub use error::{AircastError, ConfigError};
pub use utils::error_chain;

pub use types::location::{LatLon, Location};
pub use types::metric::{TargetMetric, CALENDAR_FEATURES};
pub use types::reading::Reading;

pub use store::error::StoreError;
pub use store::reading_store::ReadingStore;

pub use ingest::collector::{Collector, CycleReport, LocationFailure};
pub use ingest::error::ProviderError;
pub use ingest::provider::{OpenWeatherClient, ReadingSource};

pub use forecast::artifact::{ArtifactStore, TrainedModel};
pub use forecast::boosting::{BoostingParams, FitReport, GradientBoostedRegressor};
pub use forecast::error::{BoostingError, ForecastError};
pub use forecast::features::{metric_frame, CalendarFeatures, FeatureBuilder, FeaturedRow};
pub use forecast::orchestrator::{TrainingOrchestrator, TrainingRun, UnitOutcome, UnitStatus};
pub use forecast::predict::{forecast_area, next_hour, predict_next, Prediction};
pub use forecast::trainer::{MetricTrainer, SkipReason, TrainOutcome};
