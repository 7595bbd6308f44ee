use model::{Predictor, audit::AuditSink};

/// Shared application state handed to every handler.
pub struct AppState {
    pub predictor: Predictor,
    pub audit: AuditSink,
    pub admin_api_key: String,
}
