pub mod artifacts;
pub mod audit;
pub mod error;
pub mod features;
pub mod predictor;
pub mod store;

pub use error::{PredictErr, Result};
pub use predictor::{Prediction, Predictor, SwapReport};
pub use store::ArtifactStore;
