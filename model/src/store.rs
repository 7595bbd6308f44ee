use std::sync::Arc;

use log::{debug, warn};
use parking_lot::RwLock;

use crate::artifacts::{ArtifactPaths, LinearModel, Scaler, Schema};

/// One self-consistent view of the loaded artifacts.
///
/// Handed out by value so a prediction never mixes pieces from two
/// different swaps.
#[derive(Debug, Clone)]
pub struct Bundle {
    pub schema: Option<Arc<Schema>>,
    pub model: Option<Arc<LinearModel>>,
    pub scaler: Option<Arc<Scaler>>,
    pub version: String,
}

impl Default for Bundle {
    fn default() -> Self {
        Self {
            schema: None,
            model: None,
            scaler: None,
            version: "v0".to_string(),
        }
    }
}

/// Process-wide slots for the schema, model and scaler artifacts.
///
/// All three live behind a single lock, and an admin swap installs the
/// fresh schema and model under one write, so concurrent predictions
/// never observe a torn (new schema, old model) mix.
pub struct ArtifactStore {
    paths: ArtifactPaths,
    bundle: RwLock<Bundle>,
}

impl ArtifactStore {
    /// Creates a store with all slots unset.
    ///
    /// # Arguments
    /// * `paths` - Canonical on-disk locations for the three artifacts.
    pub fn new(paths: ArtifactPaths) -> Self {
        Self {
            paths,
            bundle: RwLock::new(Bundle::default()),
        }
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    /// Reloads the schema from its canonical location.
    ///
    /// Never errors: a read or parse failure installs the empty schema.
    ///
    /// # Returns
    /// The freshly installed schema.
    pub fn load_schema(&self) -> Arc<Schema> {
        let schema = Arc::new(Schema::load(&self.paths.columns));
        debug!(locations = schema.location_columns().len(); "schema loaded");
        self.bundle.write().schema = Some(schema.clone());
        schema
    }

    /// Reloads the model from its canonical location.
    ///
    /// On success the version tag becomes the artifact file's base name.
    /// On failure the slot is cleared: a broken reload leaves the service
    /// with no model rather than a stale one.
    ///
    /// # Returns
    /// Whether the model deserialized successfully.
    pub fn load_model(&self) -> bool {
        let model = LinearModel::load(&self.paths.model);
        self.install_model(model, &mut self.bundle.write())
    }

    /// Reloads the schema and the model from their canonical locations and
    /// installs both under a single write acquisition, so a concurrent
    /// snapshot never observes the fresh schema next to the previous model.
    ///
    /// # Returns
    /// The freshly installed schema and whether the model deserialized.
    pub fn reload_all(&self) -> (Arc<Schema>, bool) {
        let schema = Arc::new(Schema::load(&self.paths.columns));
        let model = LinearModel::load(&self.paths.model);

        let mut bundle = self.bundle.write();
        bundle.schema = Some(schema.clone());
        let loaded = self.install_model(model, &mut bundle);

        (schema, loaded)
    }

    fn install_model(&self, model: Result<LinearModel, String>, bundle: &mut Bundle) -> bool {
        match model {
            Ok(model) => {
                bundle.model = Some(Arc::new(model));
                bundle.version = self
                    .paths
                    .model
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "v0".to_string());
                true
            }
            Err(e) => {
                warn!("cannot load model: {e}");
                bundle.model = None;
                false
            }
        }
    }

    /// Reloads the scaler from its canonical location. A missing file or a
    /// deserialization failure yields "absent", never an error.
    pub fn load_scaler(&self) {
        let scaler = if self.paths.scaler.exists() {
            match Scaler::load(&self.paths.scaler) {
                Ok(scaler) => Some(Arc::new(scaler)),
                Err(e) => {
                    warn!("cannot load scaler: {e}");
                    None
                }
            }
        } else {
            None
        };

        self.bundle.write().scaler = scaler;
    }

    /// Loads whichever slots are still unset, from their canonical
    /// locations. Idempotent; called before every prediction.
    pub fn ensure_ready(&self) {
        let (schema, model, scaler) = {
            let bundle = self.bundle.read();
            (
                bundle.schema.is_some(),
                bundle.model.is_some(),
                bundle.scaler.is_some(),
            )
        };

        if !schema {
            self.load_schema();
        }
        if !model {
            self.load_model();
        }
        if !scaler {
            self.load_scaler();
        }
    }

    /// A self-consistent (schema, model, scaler) triple plus version tag.
    pub fn snapshot(&self) -> Bundle {
        self.bundle.read().clone()
    }

    pub fn model_loaded(&self) -> bool {
        self.bundle.read().model.is_some()
    }

    pub fn model_version(&self) -> String {
        self.bundle.read().version.clone()
    }
}
