use crate::error::Result;
use crate::ml::features::FeatureVector;
use crate::ml::models::{LastPrediction, ModelMetadata, ModelOrigin};
use crate::ml::regressor::DemandRegressor;
use parking_lot::RwLock;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Online prediction service.
///
/// Owns the loaded regressor (immutable after startup, safe to invoke from
/// concurrent requests) and the single last-prediction slot. The slot is
/// lock-guarded; semantics across concurrent writers stay last-write-wins.
pub struct PredictionService {
    /// Loaded model, read-only after startup
    regressor: DemandRegressor,

    /// Where the artifact lives on disk
    artifact_path: PathBuf,

    /// Most recent successful prediction, absent until the first one
    last_prediction: RwLock<Option<LastPrediction>>,
}

impl PredictionService {
    /// Load the artifact, or bootstrap a placeholder model when it is
    /// missing or unreadable. The placeholder is persisted so later
    /// restarts load it instead of re-bootstrapping.
    pub fn load_or_bootstrap(artifact_path: &Path) -> Result<Self> {
        let regressor = if artifact_path.exists() {
            match DemandRegressor::load(artifact_path) {
                Ok(regressor) => {
                    info!(
                        artifact = %artifact_path.display(),
                        origin = %regressor.origin(),
                        "Model artifact loaded"
                    );
                    regressor
                }
                Err(e) => {
                    warn!(
                        artifact = %artifact_path.display(),
                        error = %e,
                        "Model artifact unreadable, rebuilding placeholder"
                    );
                    Self::bootstrap_placeholder(artifact_path)?
                }
            }
        } else {
            info!(
                artifact = %artifact_path.display(),
                "No model artifact found, bootstrapping placeholder"
            );
            Self::bootstrap_placeholder(artifact_path)?
        };

        Ok(Self {
            regressor,
            artifact_path: artifact_path.to_path_buf(),
            last_prediction: RwLock::new(None),
        })
    }

    fn bootstrap_placeholder(artifact_path: &Path) -> Result<DemandRegressor> {
        let regressor = DemandRegressor::placeholder()?;
        regressor.save(artifact_path)?;
        Ok(regressor)
    }

    /// Validate and coerce a request payload, invoke the model, round to
    /// 2 decimal places, and record the result in the last-prediction slot.
    ///
    /// Failures are request-level: the slot is untouched and the service
    /// keeps answering.
    pub fn predict(&self, payload: &Value) -> Result<LastPrediction> {
        let features = FeatureVector::from_payload(payload)?;
        let raw = self.regressor.predict_one(&features)?;
        let record = LastPrediction::new(features, round2(raw));

        *self.last_prediction.write() = Some(record.clone());
        Ok(record)
    }

    /// Contents of the last-prediction slot, if populated since startup
    pub fn last_prediction(&self) -> Option<LastPrediction> {
        self.last_prediction.read().clone()
    }

    pub fn origin(&self) -> ModelOrigin {
        self.regressor.origin()
    }

    pub fn metadata(&self) -> &ModelMetadata {
        self.regressor.metadata()
    }

    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
