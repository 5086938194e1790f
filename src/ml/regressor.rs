use crate::error::{AppError, Result};
use crate::ml::features::{FeatureVector, N_FEATURES};
use crate::ml::models::{ModelMetadata, ModelOrigin};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use std::fs;
use std::path::Path;

/// Forest size used when none is configured
pub const DEFAULT_N_TREES: u16 = 100;

/// Seed used when none is configured
pub const DEFAULT_SEED: u64 = 42;

/// Random-forest demand regressor plus the metadata persisted with it.
///
/// The whole struct is the artifact: bincode-encoded, overwritten on every
/// training run, loaded once at serving startup and never mutated after.
#[derive(Serialize, Deserialize)]
pub struct DemandRegressor {
    /// Fitted forest
    model: RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>,

    /// Training provenance and fit quality
    metadata: ModelMetadata,

    /// Trained vs. placeholder
    origin: ModelOrigin,
}

impl DemandRegressor {
    /// Fit a forest on the projected feature matrix and target vector
    pub fn fit(
        features: &Array2<f64>,
        targets: &Array1<f64>,
        n_trees: u16,
        seed: u64,
    ) -> Result<Self> {
        if features.nrows() == 0 {
            return Err(AppError::Dataset(
                "cannot fit on an empty training set".to_string(),
            ));
        }

        let x = ndarray_to_densematrix(features);
        let y: Vec<f64> = targets.iter().copied().collect();

        let params = RandomForestRegressorParameters::default()
            .with_n_trees(n_trees.into())
            .with_seed(seed);

        let model = RandomForestRegressor::fit(&x, &y, params)
            .map_err(|e| AppError::Model(format!("failed to fit random forest: {}", e)))?;

        Ok(Self {
            model,
            metadata: ModelMetadata {
                trained_at: chrono::Utc::now(),
                n_training_samples: features.nrows(),
                n_features: features.ncols(),
                n_trees,
                seed,
                train_r2: None,
                holdout_r2: None,
            },
            origin: ModelOrigin::Trained,
        })
    }

    /// Build the serving bootstrap model: one synthetic example, so a
    /// service with no trained artifact can still answer requests.
    pub fn placeholder() -> Result<Self> {
        let features =
            Array2::from_shape_vec((1, N_FEATURES), vec![1.0, 1.0, 10.0, 8.0, 1.0, 0.0])
                .map_err(|e| AppError::Internal(format!("placeholder features: {}", e)))?;
        let targets = Array1::from_vec(vec![5.0]);

        let mut regressor = Self::fit(&features, &targets, DEFAULT_N_TREES, DEFAULT_SEED)?;
        regressor.origin = ModelOrigin::Placeholder;
        Ok(regressor)
    }

    /// Record evaluation scores in the metadata
    pub fn with_scores(mut self, train_r2: f64, holdout_r2: Option<f64>) -> Self {
        self.metadata.train_r2 = Some(train_r2);
        self.metadata.holdout_r2 = holdout_r2;
        self
    }

    /// Predict for a batch of rows
    pub fn predict(&self, features: &Array2<f64>) -> Result<Vec<f64>> {
        let x = ndarray_to_densematrix(features);
        self.model
            .predict(&x)
            .map_err(|e| AppError::Model(format!("prediction failed: {}", e)))
    }

    /// Predict for a single feature vector
    pub fn predict_one(&self, features: &FeatureVector) -> Result<f64> {
        let x = DenseMatrix::new(1, N_FEATURES, features.as_row().to_vec(), false);
        let predictions = self
            .model
            .predict(&x)
            .map_err(|e| AppError::Model(format!("prediction failed: {}", e)))?;

        predictions
            .first()
            .copied()
            .ok_or_else(|| AppError::Model("model returned no prediction".to_string()))
    }

    /// Coefficient of determination against the given targets
    pub fn score(&self, features: &Array2<f64>, targets: &Array1<f64>) -> Result<f64> {
        let predictions = self.predict(features)?;
        let actuals: Vec<f64> = targets.iter().copied().collect();
        Ok(r_squared(&actuals, &predictions))
    }

    pub fn origin(&self) -> ModelOrigin {
        self.origin
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    /// Serialize to the artifact path, overwriting any previous artifact
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let bytes = bincode::serialize(self)?;
        fs::write(path, bytes)?;
        Ok(())
    }

    /// Deserialize from the artifact path
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        Ok(bincode::deserialize(&bytes)?)
    }
}

fn ndarray_to_densematrix(arr: &Array2<f64>) -> DenseMatrix<f64> {
    let shape = arr.shape();
    let data: Vec<f64> = arr.iter().copied().collect();
    DenseMatrix::new(shape[0], shape[1], data, false)
}

/// Coefficient of determination. A constant target scores 1.0 only on a
/// perfect fit, 0.0 otherwise.
pub fn r_squared(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let n = y_true.len();
    if n == 0 {
        return 0.0;
    }

    let mean = y_true.iter().sum::<f64>() / n as f64;
    let ss_tot: f64 = y_true.iter().map(|y| (y - mean).powi(2)).sum();
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(y, p)| (y - p).powi(2))
        .sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }

    1.0 - ss_res / ss_tot
}
