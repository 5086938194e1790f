use crate::error::{AppError, Result};
use crate::ml::features::{FeatureVector, N_FEATURES};
use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One historical sales record.
///
/// The imputable columns stay `Option`al at parse time; `Dataset::impute`
/// resolves them before any fitting happens. Records missing a
/// non-imputable field never make it out of ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesRecord {
    pub store_id: i64,
    pub sku_id: i64,
    pub total_price: f64,
    pub base_price: f64,
    pub is_featured_sku: Option<i64>,
    pub is_display_sku: Option<i64>,
    pub units_sold: Option<f64>,
}

impl SalesRecord {
    /// Project to the model's feature schema. Unresolved promotion flags
    /// fall back to 0 ("not promoted"), the same value imputation assigns.
    pub fn feature_vector(&self) -> FeatureVector {
        FeatureVector {
            store_id: self.store_id,
            sku_id: self.sku_id,
            total_price: self.total_price,
            base_price: self.base_price,
            is_featured_sku: self.is_featured_sku.unwrap_or(0),
            is_display_sku: self.is_display_sku.unwrap_or(0),
        }
    }

    /// Hashable identity over all columns, for duplicate detection
    fn dedup_key(&self) -> (i64, i64, u64, u64, Option<i64>, Option<i64>, Option<u64>) {
        (
            self.store_id,
            self.sku_id,
            self.total_price.to_bits(),
            self.base_price.to_bits(),
            self.is_featured_sku,
            self.is_display_sku,
            self.units_sold.map(f64::to_bits),
        )
    }
}

/// Result of one imputation pass
#[derive(Debug, Clone, Serialize)]
pub struct ImputationSummary {
    /// Mean of the `units_sold` values that were present
    pub units_sold_mean: f64,

    /// Rows whose `units_sold` was filled with the mean
    pub n_units_sold_imputed: usize,

    /// Flag cells (either column) filled with 0
    pub n_flags_imputed: usize,
}

/// An in-memory training dataset
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub records: Vec<SalesRecord>,
}

impl Dataset {
    pub fn new(records: Vec<SalesRecord>) -> Self {
        Self { records }
    }

    pub fn n_rows(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Apply the missing-value policy in place.
    ///
    /// `units_sold` gaps take the column mean of the present values;
    /// promotion-flag gaps take 0. Errors if no `units_sold` value is
    /// present at all, since the mean is then undefined.
    pub fn impute(&mut self) -> Result<ImputationSummary> {
        let present: Vec<f64> = self.records.iter().filter_map(|r| r.units_sold).collect();
        if present.is_empty() {
            return Err(AppError::Dataset(
                "units_sold has no present values to impute from".to_string(),
            ));
        }
        let mean = present.iter().sum::<f64>() / present.len() as f64;

        let mut n_units = 0;
        let mut n_flags = 0;
        for record in &mut self.records {
            if record.units_sold.is_none() {
                record.units_sold = Some(mean);
                n_units += 1;
            }
            if record.is_featured_sku.is_none() {
                record.is_featured_sku = Some(0);
                n_flags += 1;
            }
            if record.is_display_sku.is_none() {
                record.is_display_sku = Some(0);
                n_flags += 1;
            }
        }

        Ok(ImputationSummary {
            units_sold_mean: mean,
            n_units_sold_imputed: n_units,
            n_flags_imputed: n_flags,
        })
    }

    /// Count rows identical across all columns to an earlier row.
    ///
    /// Duplicates stay in the training set; the count is reported only.
    pub fn duplicate_count(&self) -> usize {
        let mut seen = HashSet::with_capacity(self.records.len());
        self.records
            .iter()
            .filter(|r| !seen.insert(r.dedup_key()))
            .count()
    }

    /// Seeded shuffle split into (train, holdout) subsets.
    ///
    /// The holdout takes `ceil(n * holdout_fraction)` rows. Same data and
    /// seed always produce the same membership.
    pub fn train_test_split(&self, holdout_fraction: f64, seed: u64) -> (Dataset, Dataset) {
        let n = self.records.len();
        let n_holdout = ((n as f64) * holdout_fraction).ceil() as usize;
        let n_holdout = n_holdout.min(n);

        let mut indices: Vec<usize> = (0..n).collect();
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        let holdout: Vec<SalesRecord> = indices[..n_holdout]
            .iter()
            .map(|&i| self.records[i].clone())
            .collect();
        let train: Vec<SalesRecord> = indices[n_holdout..]
            .iter()
            .map(|&i| self.records[i].clone())
            .collect();

        (Dataset::new(train), Dataset::new(holdout))
    }

    /// Feature matrix (n_rows x 6), columns in contract order
    pub fn feature_matrix(&self) -> Array2<f64> {
        let mut features = Array2::zeros((self.records.len(), N_FEATURES));
        for (i, record) in self.records.iter().enumerate() {
            for (j, value) in record.feature_vector().as_row().iter().enumerate() {
                features[[i, j]] = *value;
            }
        }
        features
    }

    /// Regression targets. Rows reach fitting only after `impute`, so an
    /// unresolved target here reads as 0.
    pub fn targets(&self) -> Array1<f64> {
        Array1::from_iter(self.records.iter().map(|r| r.units_sold.unwrap_or(0.0)))
    }
}

/// Whether an artifact came out of the training pipeline or the serving
/// bootstrap path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelOrigin {
    /// Fitted by the training pipeline on a real dataset
    Trained,

    /// Synthesized at serving startup so the service can answer;
    /// structurally valid, not meaningful
    Placeholder,
}

impl std::fmt::Display for ModelOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelOrigin::Trained => write!(f, "trained"),
            ModelOrigin::Placeholder => write!(f, "placeholder"),
        }
    }
}

/// Model metadata persisted alongside the fitted regressor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Training timestamp
    pub trained_at: DateTime<Utc>,

    /// Number of training samples
    pub n_training_samples: usize,

    /// Number of features
    pub n_features: usize,

    /// Number of trees in the forest
    pub n_trees: u16,

    /// Seed used for the forest
    pub seed: u64,

    /// R² on the training subset
    pub train_r2: Option<f64>,

    /// R² on the holdout subset
    pub holdout_r2: Option<f64>,
}

/// The most recent request/response pair, held in the single
/// last-prediction slot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LastPrediction {
    pub store_id: i64,
    pub sku_id: i64,
    pub total_price: f64,
    pub base_price: f64,
    pub is_featured_sku: i64,
    pub is_display_sku: i64,
    pub prediction: f64,
    pub predicted_at: DateTime<Utc>,
}

impl LastPrediction {
    pub fn new(features: FeatureVector, prediction: f64) -> Self {
        Self {
            store_id: features.store_id,
            sku_id: features.sku_id,
            total_price: features.total_price,
            base_price: features.base_price,
            is_featured_sku: features.is_featured_sku,
            is_display_sku: features.is_display_sku,
            prediction,
            predicted_at: Utc::now(),
        }
    }
}

/// Summary of one training run
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    /// Rows that parsed into records
    pub n_rows_loaded: usize,

    /// Malformed rows skipped during ingestion
    pub n_rows_skipped: usize,

    /// Exact duplicate rows detected (kept in the training set)
    pub n_duplicates: usize,

    /// Imputation counts and the computed mean
    pub imputation: ImputationSummary,

    /// Training subset size
    pub n_train: usize,

    /// Holdout subset size
    pub n_holdout: usize,

    /// R² on the training subset
    pub train_r2: f64,

    /// R² on the holdout subset (absent when nothing was held out)
    pub holdout_r2: Option<f64>,

    /// Holdout ground truth, split order
    pub holdout_actuals: Vec<f64>,

    /// Holdout predictions, split order
    pub holdout_predictions: Vec<f64>,

    /// Where the artifact was written
    pub artifact_path: std::path::PathBuf,
}
