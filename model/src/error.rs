use std::{
    error::Error,
    fmt::{self, Display},
};

/// The result type used by the prediction service.
pub type Result<T> = std::result::Result<T, PredictErr>;

/// Error returned by a fitted artifact when the given vector's width
/// doesn't match the width the artifact was fitted on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidthMismatchErr {
    pub got: usize,
    pub expected: usize,
}

impl Display for WidthMismatchErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "feature vector width mismatch: got {}, expected {}",
            self.got, self.expected
        )
    }
}

impl Error for WidthMismatchErr {}

/// Errors the prediction service can surface to its callers.
///
/// Everything else that can go wrong under the hood (missing schema,
/// missing scaler, scaler rejecting a vector) degrades to a neutral
/// default instead of erroring.
#[derive(Debug)]
pub enum PredictErr {
    /// No model artifact is currently loaded.
    ModelUnavailable,
    /// The loaded model rejected the feature vector.
    Model(WidthMismatchErr),
}

impl Display for PredictErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictErr::ModelUnavailable => f.write_str("model not loaded"),
            PredictErr::Model(e) => write!(f, "model rejected input: {e}"),
        }
    }
}

impl Error for PredictErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PredictErr::Model(e) => Some(e),
            PredictErr::ModelUnavailable => None,
        }
    }
}

impl From<WidthMismatchErr> for PredictErr {
    fn from(value: WidthMismatchErr) -> Self {
        Self::Model(value)
    }
}
