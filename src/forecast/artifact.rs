//! Persisted models, one file per (area, metric).

use crate::forecast::boosting::GradientBoostedRegressor;
use crate::forecast::error::ForecastError;
use crate::types::metric::TargetMetric;
use crate::utils::ensure_dir_exists;
use bincode::config::{Configuration, Fixint, Limit, LittleEndian};
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Upper bound on what a decoded artifact may claim, so a corrupt length
/// prefix fails the decode instead of allocating.
const MAX_ARTIFACT_BYTES: usize = 64 * 1024 * 1024;

const BINCODE_CONFIG: Configuration<LittleEndian, Fixint> =
    bincode::config::standard().with_fixed_int_encoding();
const DECODE_CONFIG: Configuration<LittleEndian, Fixint, Limit<MAX_ARTIFACT_BYTES>> =
    BINCODE_CONFIG.with_limit::<MAX_ARTIFACT_BYTES>();

/// A fitted model together with the feature names it was trained on, in
/// input order. Inference must build its vector in exactly this order.
#[derive(Debug, Serialize, Deserialize)]
pub struct TrainedModel {
    pub area: String,
    pub metric: TargetMetric,
    pub feature_names: Vec<String>,
    pub model: GradientBoostedRegressor,
    pub test_rmse: f64,
    pub train_rows: usize,
    pub test_rows: usize,
    pub trained_at: DateTime<Utc>,
}

/// Directory of model artifacts.
///
/// Saving replaces any previous artifact for the same unit atomically, so a
/// reader never sees a half-written file.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Opens `dir`, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, ForecastError> {
        let dir = dir.into();
        ensure_dir_exists(&dir).map_err(|e| ForecastError::ArtifactDir(dir.clone(), e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<dir>/<area>_<metric>_model.bin`, with the area name percent-encoded
    /// so distinct areas never share a file.
    pub fn path_for(&self, area: &str, metric: TargetMetric) -> PathBuf {
        self.dir.join(format!("{}_{}_model.bin", file_safe(area), metric))
    }

    pub fn save(&self, model: &TrainedModel) -> Result<PathBuf, ForecastError> {
        let path = self.path_for(&model.area, model.metric);
        let bytes = bincode::serde::encode_to_vec(model, BINCODE_CONFIG).map_err(|e| {
            ForecastError::ArtifactEncode {
                area: model.area.clone(),
                metric: model.metric,
                source: Box::new(e),
            }
        })?;

        let mut temp = NamedTempFile::new_in(&self.dir)
            .map_err(|e| ForecastError::ArtifactWrite(path.clone(), e))?;
        temp.write_all(&bytes)
            .and_then(|_| temp.flush())
            .map_err(|e| ForecastError::ArtifactWrite(path.clone(), e))?;
        temp.persist(&path)
            .map_err(|e| ForecastError::ArtifactPersist(path.clone(), e))?;

        info!("Saved model artifact {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }

    pub fn load(&self, area: &str, metric: TargetMetric) -> Result<TrainedModel, ForecastError> {
        Self::load_path(&self.path_for(area, metric))
    }

    pub fn load_path(path: &Path) -> Result<TrainedModel, ForecastError> {
        debug!("Loading model artifact {}", path.display());
        let bytes =
            fs::read(path).map_err(|e| ForecastError::ArtifactRead(path.to_path_buf(), e))?;
        let (model, _) = bincode::serde::decode_from_slice(&bytes, DECODE_CONFIG)
            .map_err(|e| ForecastError::ArtifactDecode(path.to_path_buf(), Box::new(e)))?;
        Ok(model)
    }
}

/// Percent-encodes every byte outside `[A-Za-z0-9-]`. Injective, and `_`
/// never appears unencoded, so it stays unambiguous as the separator.
fn file_safe(area: &str) -> String {
    let mut encoded = String::with_capacity(area.len());
    for byte in area.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}
