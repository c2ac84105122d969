use crate::forecast::error::ForecastError;
use crate::ingest::error::ProviderError;
use crate::store::error::StoreError;
use std::num::ParseIntError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AircastError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Forecast(#[from] ForecastError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {variable}")]
    InvalidValue {
        variable: String,
        value: String,
        #[source]
        source: ParseIntError,
    },
}
