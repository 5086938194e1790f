use crate::config::TrainingConfig;
use crate::error::{AppError, Result};
use crate::ml::features::FEATURE_COLUMNS;
use crate::ml::models::{Dataset, SalesRecord, TrainingReport};
use crate::ml::regressor::DemandRegressor;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Target column name
const TARGET_COLUMN: &str = "units_sold";

/// Ingestion counters
#[derive(Debug, Clone, Copy)]
pub struct IngestSummary {
    /// Rows that parsed into records
    pub n_loaded: usize,

    /// Malformed rows skipped
    pub n_skipped: usize,
}

/// Column positions resolved from the header row.
///
/// Columns are located by name, so the file's column order is free and
/// extra columns are ignored.
struct ColumnIndex {
    store_id: usize,
    sku_id: usize,
    total_price: usize,
    base_price: usize,
    is_featured_sku: usize,
    is_display_sku: usize,
    units_sold: usize,
}

impl ColumnIndex {
    fn from_header(header: &str) -> Result<Self> {
        let columns: Vec<&str> = header.split(',').map(str::trim).collect();
        let find = |name: &str| -> Result<usize> {
            columns
                .iter()
                .position(|c| *c == name)
                .ok_or_else(|| AppError::MissingColumn(name.to_string()))
        };

        Ok(Self {
            store_id: find(FEATURE_COLUMNS[0])?,
            sku_id: find(FEATURE_COLUMNS[1])?,
            total_price: find(FEATURE_COLUMNS[2])?,
            base_price: find(FEATURE_COLUMNS[3])?,
            is_featured_sku: find(FEATURE_COLUMNS[4])?,
            is_display_sku: find(FEATURE_COLUMNS[5])?,
            units_sold: find(TARGET_COLUMN)?,
        })
    }

    /// Parse one data row. `None` means the row is malformed and skipped.
    fn parse_row(&self, line: &str) -> Option<SalesRecord> {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();

        Some(SalesRecord {
            store_id: parse_int(fields.get(self.store_id)?)?,
            sku_id: parse_int(fields.get(self.sku_id)?)?,
            total_price: parse_float(fields.get(self.total_price)?)?,
            base_price: parse_float(fields.get(self.base_price)?)?,
            is_featured_sku: parse_optional_int(fields.get(self.is_featured_sku)?)?,
            is_display_sku: parse_optional_int(fields.get(self.is_display_sku)?)?,
            units_sold: parse_optional_float(fields.get(self.units_sold)?)?,
        })
    }
}

/// Integer cell. Accepts a float rendering like "1.0" since numeric columns
/// often round-trip through float-typed tooling.
fn parse_int(s: &str) -> Option<i64> {
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    s.parse::<f64>().ok().map(|f| f as i64)
}

fn parse_float(s: &str) -> Option<f64> {
    s.parse::<f64>().ok()
}

/// Empty cell is a missing value (Some(None)); a non-empty cell that does
/// not parse makes the whole row malformed (None).
fn parse_optional_int(s: &str) -> Option<Option<i64>> {
    if s.is_empty() {
        return Some(None);
    }
    parse_int(s).map(Some)
}

fn parse_optional_float(s: &str) -> Option<Option<f64>> {
    if s.is_empty() {
        return Some(None);
    }
    parse_float(s).map(Some)
}

/// Read a header-carrying comma-delimited dataset.
///
/// The header must name every required column; data rows that fail to
/// parse are skipped and counted rather than aborting the load.
pub fn load_dataset(path: &Path) -> Result<(Dataset, IngestSummary)> {
    let file = File::open(path)
        .map_err(|e| AppError::Dataset(format!("failed to open {}: {}", path.display(), e)))?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines();

    let header = match lines.next() {
        Some(line) => line?,
        None => return Err(AppError::Dataset("dataset is empty".to_string())),
    };
    let index = ColumnIndex::from_header(&header)?;

    let mut records = Vec::new();
    let mut n_skipped = 0usize;
    for line in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match index.parse_row(&line) {
            Some(record) => records.push(record),
            None => {
                n_skipped += 1;
                debug!(row = %line, "Skipping malformed row");
            }
        }
    }

    if records.is_empty() {
        return Err(AppError::Dataset(format!(
            "no usable rows in {}",
            path.display()
        )));
    }

    let summary = IngestSummary {
        n_loaded: records.len(),
        n_skipped,
    };
    Ok((Dataset::new(records), summary))
}

/// Offline training pipeline: ingest, clean, split, fit, evaluate, persist.
pub struct TrainingPipeline {
    config: TrainingConfig,
    artifact_path: PathBuf,
}

impl TrainingPipeline {
    pub fn new(config: TrainingConfig, artifact_path: PathBuf) -> Self {
        Self {
            config,
            artifact_path,
        }
    }

    /// Run the pipeline end to end. The fitted model is always persisted;
    /// fit quality is reported, never gated on.
    pub fn run(&self) -> Result<TrainingReport> {
        info!(dataset = %self.config.dataset_path.display(), "Loading dataset");
        let (mut dataset, ingest) = load_dataset(&self.config.dataset_path)?;

        let missing_units = dataset
            .records
            .iter()
            .filter(|r| r.units_sold.is_none())
            .count();
        let missing_flags = dataset
            .records
            .iter()
            .filter(|r| r.is_featured_sku.is_none() || r.is_display_sku.is_none())
            .count();
        info!(
            rows = ingest.n_loaded,
            skipped = ingest.n_skipped,
            missing_units_sold = missing_units,
            rows_with_missing_flags = missing_flags,
            "Dataset loaded"
        );

        let imputation = dataset.impute()?;
        info!(
            units_sold_mean = imputation.units_sold_mean,
            units_sold_imputed = imputation.n_units_sold_imputed,
            flags_imputed = imputation.n_flags_imputed,
            "Missing values imputed"
        );

        let n_duplicates = dataset.duplicate_count();
        if n_duplicates > 0 {
            warn!(count = n_duplicates, "Found duplicate rows");
        }

        let (train, holdout) =
            dataset.train_test_split(self.config.holdout_fraction, self.config.seed);
        info!(
            train_rows = train.n_rows(),
            holdout_rows = holdout.n_rows(),
            seed = self.config.seed,
            "Dataset partitioned"
        );
        if train.is_empty() {
            return Err(AppError::Dataset(
                "no rows left to train on after holdout split".to_string(),
            ));
        }

        let x_train = train.feature_matrix();
        let y_train = train.targets();

        info!(n_trees = self.config.n_trees, "Fitting random forest");
        let regressor =
            DemandRegressor::fit(&x_train, &y_train, self.config.n_trees, self.config.seed)?;

        let train_r2 = regressor.score(&x_train, &y_train)?;
        info!(train_r2, "Training fit score");

        let (holdout_r2, holdout_actuals, holdout_predictions) = if holdout.is_empty() {
            (None, Vec::new(), Vec::new())
        } else {
            let x_holdout = holdout.feature_matrix();
            let y_holdout = holdout.targets();
            let predictions = regressor.predict(&x_holdout)?;
            let actuals: Vec<f64> = y_holdout.iter().copied().collect();
            let r2 = regressor.score(&x_holdout, &y_holdout)?;
            info!(holdout_r2 = r2, "Holdout fit score");
            debug!(?actuals, ?predictions, "Holdout actual vs predicted");
            (Some(r2), actuals, predictions)
        };

        let regressor = regressor.with_scores(train_r2, holdout_r2);
        regressor.save(&self.artifact_path)?;
        info!(artifact = %self.artifact_path.display(), "Model persisted");

        Ok(TrainingReport {
            n_rows_loaded: ingest.n_loaded,
            n_rows_skipped: ingest.n_skipped,
            n_duplicates,
            imputation,
            n_train: train.n_rows(),
            n_holdout: holdout.n_rows(),
            train_r2,
            holdout_r2,
            holdout_actuals,
            holdout_predictions,
            artifact_path: self.artifact_path.clone(),
        })
    }
}
