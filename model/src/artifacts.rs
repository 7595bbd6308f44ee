use std::{
    env, fs,
    path::{Path, PathBuf},
};

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

use crate::error::WidthMismatchErr;

/// Number of fixed numeric columns preceding the location block:
/// `[total_sqft, bath, bhk]`, in that exact order. This is a contract with
/// the training pipeline, not something derived from the schema document.
pub const NUMERIC_PREFIX: usize = 3;

/// Ordered feature-column names, loaded from the schema document.
///
/// The first [`NUMERIC_PREFIX`] entries are the numeric columns; everything
/// after them is one column per recognized location, in document order. An
/// empty schema is a valid, degraded state.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Schema {
    pub data_columns: Vec<String>,
}

impl Schema {
    /// The location columns: everything after the fixed numeric prefix.
    pub fn location_columns(&self) -> &[String] {
        if self.data_columns.len() > NUMERIC_PREFIX {
            &self.data_columns[NUMERIC_PREFIX..]
        } else {
            &[]
        }
    }

    /// Total feature-vector width this schema implies.
    pub fn width(&self) -> usize {
        NUMERIC_PREFIX + self.location_columns().len()
    }

    /// Reads and parses a schema document.
    ///
    /// Never errors: a missing file or malformed document degrades to the
    /// empty schema.
    pub fn load(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                log::warn!("cannot read schema document '{}': {e}", path.display());
                return Self::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(schema) => schema,
            Err(e) => {
                log::warn!("malformed schema document '{}': {e}", path.display());
                Self::default()
            }
        }
    }
}

/// A fitted linear regressor, the one opaque capability this service needs
/// from the external training pipeline.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LinearModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LinearModel {
    /// Deserializes a model artifact from a JSON file.
    ///
    /// # Errors
    /// Returns a human-readable string if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("cannot read '{}': {e}", path.display()))?;

        serde_json::from_str(&content).map_err(|e| format!("invalid model artifact: {e}"))
    }

    /// Scalar prediction over one feature vector. The raw regression output
    /// is the contract: no clamping, no rounding.
    ///
    /// # Errors
    /// `WidthMismatchErr` when `x` isn't the width the model was fitted on.
    pub fn predict(&self, x: &[f64]) -> Result<f64, WidthMismatchErr> {
        if x.len() != self.coefficients.len() {
            return Err(WidthMismatchErr {
                got: x.len(),
                expected: self.coefficients.len(),
            });
        }

        let w = ArrayView1::from(self.coefficients.as_slice());
        Ok(w.dot(&ArrayView1::from(x)) + self.intercept)
    }
}

/// A fitted standard scaler: `(x - mean) / scale`, element-wise.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Scaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl Scaler {
    /// Deserializes a scaler artifact from a JSON file.
    ///
    /// # Errors
    /// Returns a human-readable string if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("cannot read '{}': {e}", path.display()))?;

        serde_json::from_str(&content).map_err(|e| format!("invalid scaler artifact: {e}"))
    }

    /// Normalizes a raw feature vector, preserving its width.
    ///
    /// # Errors
    /// `WidthMismatchErr` when `x` isn't the width the scaler was fitted on;
    /// callers treat that as a cue to keep the raw vector.
    pub fn transform(&self, x: &[f64]) -> Result<Vec<f64>, WidthMismatchErr> {
        if x.len() != self.mean.len() || x.len() != self.scale.len() {
            return Err(WidthMismatchErr {
                got: x.len(),
                expected: self.mean.len(),
            });
        }

        Ok(x.iter()
            .zip(&self.mean)
            .zip(&self.scale)
            .map(|((v, m), s)| (v - m) / s)
            .collect())
    }
}

/// Canonical on-disk locations for the three artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub columns: PathBuf,
    pub scaler: PathBuf,
}

impl ArtifactPaths {
    /// Reads the artifact locations from `MODEL_PATH`, `COLUMNS_PATH` and
    /// `SCALER_PATH`, defaulting to the local data directory.
    pub fn from_env() -> Self {
        let var = |key: &str, default: &str| -> PathBuf {
            env::var(key).unwrap_or_else(|_| default.to_string()).into()
        };

        Self {
            model: var("MODEL_PATH", "./data/home_prices_model.json"),
            columns: var("COLUMNS_PATH", "./data/columns.json"),
            scaler: var("SCALER_PATH", "./data/scaler.json"),
        }
    }
}
