use serde::{Deserialize, Serialize};

/// The fixed numeric ordering contract published through `/api/metadata`.
pub const FEATURE_ORDER: [&str; 3] = ["total_sqft", "bath", "bhk"];

/// Body of `POST /api/predict`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PredictRequest {
    pub total_sqft: f64,
    pub bhk: u32,
    pub bath: u32,
    pub location: String,
}

impl PredictRequest {
    /// Range checks on the raw inputs, applied before any core logic runs.
    ///
    /// # Errors
    /// A human-readable detail message naming the offending field.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.total_sqft > 0.0) {
            return Err("total_sqft must be greater than 0".to_string());
        }
        if !(1..=10).contains(&self.bhk) {
            return Err("bhk must be between 1 and 10".to_string());
        }
        if self.bath > 10 {
            return Err("bath must be between 0 and 10".to_string());
        }

        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub predicted_price_lakhs: f64,
    pub model_version: String,
    pub input: PredictRequest,
}

#[derive(Debug, Serialize)]
pub struct MetadataResponse {
    pub locations: Vec<String>,
    pub feature_order: [&'static str; 3],
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub model_loaded: bool,
    pub model_version: String,
}

/// Error body shape shared by every non-2xx response.
#[derive(Debug, Serialize)]
pub struct Detail {
    pub detail: String,
}
