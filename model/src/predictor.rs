use std::{fs, io};

use log::{info, warn};
use serde::Serialize;

use crate::{
    error::{PredictErr, Result},
    features,
    store::ArtifactStore,
};

/// Synthetic input used to validate a freshly swapped model before the
/// report calls it loaded: 1000 sqft, 2 BHK, 2 bath, first known location.
const CANARY_SQFT: f64 = 1000.0;
const CANARY_BHK: u32 = 2;
const CANARY_BATH: u32 = 2;

/// A single served prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub value: f64,
    pub model_version: String,
}

/// Outcome of an admin artifact swap.
#[derive(Debug, Serialize)]
pub struct SwapReport {
    /// Which artifacts were persisted: `"model"`, `"columns"`.
    pub saved: Vec<&'static str>,
    pub model_loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The prediction service: orchestrates the artifact store and the
/// feature-vector builder, and owns the swap protocol.
pub struct Predictor {
    store: ArtifactStore,
}

impl Predictor {
    pub fn new(store: ArtifactStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Produces a single price prediction from raw, already range-checked
    /// inputs.
    ///
    /// # Errors
    /// `PredictErr::ModelUnavailable` when no model artifact is loaded;
    /// `PredictErr::Model` when the loaded model rejects the feature
    /// vector (a schema/model width disagreement).
    pub fn predict(
        &self,
        total_sqft: f64,
        bhk: u32,
        bath: u32,
        location: &str,
    ) -> Result<Prediction> {
        self.store.ensure_ready();
        let bundle = self.store.snapshot();

        let Some(model) = bundle.model else {
            return Err(PredictErr::ModelUnavailable);
        };
        let schema = bundle.schema.unwrap_or_default();

        let x = features::build_vector(
            total_sqft,
            bath,
            bhk,
            location,
            &schema,
            bundle.scaler.as_deref(),
        );

        let value = model.predict(&x)?;

        Ok(Prediction {
            value,
            model_version: bundle.version,
        })
    }

    /// Applies an admin artifact upload.
    ///
    /// Persists whichever artifacts were supplied to their canonical
    /// locations (overwriting in place), reloads the schema from disk
    /// unconditionally, reloads the model, and gates a successful reload
    /// behind one canary prediction.
    ///
    /// A model that deserializes but fails its canary is reported as
    /// `model_loaded: false` with the failure message, yet stays installed
    /// in memory: there is no rollback to the previously serving model.
    ///
    /// # Errors
    /// Only filesystem failures while persisting the uploaded bytes.
    pub fn swap(
        &self,
        model_bytes: Option<&[u8]>,
        schema_bytes: Option<&[u8]>,
    ) -> io::Result<SwapReport> {
        let mut saved = Vec::new();

        if let Some(bytes) = model_bytes {
            fs::write(&self.store.paths().model, bytes)?;
            saved.push("model");
        }
        if let Some(bytes) = schema_bytes {
            fs::write(&self.store.paths().columns, bytes)?;
            saved.push("columns");
        }

        // The schema is always re-read, even when only a model was
        // uploaded: it reflects whatever is on disk now. Both artifacts
        // install together under one write.
        let (schema, model_loaded) = self.store.reload_all();

        if model_loaded {
            let canary_location = schema
                .location_columns()
                .first()
                .map(String::as_str)
                .unwrap_or("");

            if let Err(e) = self.predict(CANARY_SQFT, CANARY_BHK, CANARY_BATH, canary_location) {
                warn!("swapped model failed canary prediction: {e}");
                return Ok(SwapReport {
                    saved,
                    model_loaded: false,
                    error: Some(e.to_string()),
                });
            }
        }

        info!(
            saved = saved.len(),
            model_loaded = model_loaded,
            version = self.store.model_version().as_str();
            "artifact swap applied"
        );

        Ok(SwapReport {
            saved,
            model_loaded,
            error: None,
        })
    }
}
