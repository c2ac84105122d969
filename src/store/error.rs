use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to create database directory '{0}'")]
    DirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to open reading store at '{0}'")]
    Open(PathBuf, #[source] rusqlite::Error),

    #[error("Failed to create table city_metrics")]
    Schema(#[source] rusqlite::Error),

    #[error("Reading store query failed")]
    Query(#[from] rusqlite::Error),

    #[error("Invalid stored timestamp '{value}'")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}
