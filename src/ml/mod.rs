/// Demand forecasting core
///
/// This module provides the prediction pipeline and its feature contract:
/// - Dataset ingestion, cleaning, and seeded partitioning
/// - Random-forest regression over the fixed six-column feature schema
/// - Model artifact persistence and loading
/// - The online prediction service with placeholder bootstrap

pub mod features;
pub mod models;
pub mod pipeline;
pub mod regressor;
pub mod service;

pub use features::{FeatureVector, FEATURE_COLUMNS, N_FEATURES};
pub use models::{
    Dataset, ImputationSummary, LastPrediction, ModelMetadata, ModelOrigin, SalesRecord,
    TrainingReport,
};
pub use pipeline::{load_dataset, IngestSummary, TrainingPipeline};
pub use regressor::{DemandRegressor, DEFAULT_N_TREES, DEFAULT_SEED};
pub use service::PredictionService;
