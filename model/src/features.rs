use log::debug;

use crate::artifacts::{NUMERIC_PREFIX, Scaler, Schema};

/// Builds the feature vector for one prediction request.
///
/// Layout: `[total_sqft, bath, bhk]` in that fixed order, then one binary
/// indicator per schema location column. The location string is matched
/// lowercased and trimmed; an unrecognized location leaves the indicator
/// block all zero, which the model treats as a neutral, city-average
/// effect. Scaling is best-effort: a scaler that rejects the vector is
/// skipped and the raw vector is used.
///
/// This builder itself never fails.
///
/// # Arguments
/// * `total_sqft` - Area in square feet.
/// * `bath` - Bathroom count.
/// * `bhk` - Bedroom (BHK) count.
/// * `location` - Free-text location name.
/// * `schema` - The current feature-column schema.
/// * `scaler` - Optional fitted scaler.
///
/// # Returns
/// A vector of width `schema.width()`.
pub fn build_vector(
    total_sqft: f64,
    bath: u32,
    bhk: u32,
    location: &str,
    schema: &Schema,
    scaler: Option<&Scaler>,
) -> Vec<f64> {
    let mut x = Vec::with_capacity(schema.width());
    x.push(total_sqft);
    x.push(f64::from(bath));
    x.push(f64::from(bhk));
    x.resize(schema.width(), 0.0);

    let location = location.trim().to_lowercase();
    if let Some(idx) = schema
        .location_columns()
        .iter()
        .position(|col| *col == location)
    {
        x[NUMERIC_PREFIX + idx] = 1.0;
    }

    if let Some(scaler) = scaler {
        match scaler.transform(&x) {
            Ok(scaled) => return scaled,
            Err(e) => debug!("scaler rejected vector, keeping raw features: {e}"),
        }
    }

    x
}
