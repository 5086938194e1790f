use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Training pipeline configuration
    #[serde(default)]
    pub training: TrainingConfig,

    /// Model artifact configuration
    #[serde(default)]
    pub model: ModelConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/default.toml".to_string());

        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(&config_path).required(false))
            // Override with environment variables (prefix: DEMAND_)
            .add_source(
                config::Environment::with_prefix("DEMAND")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            training: TrainingConfig::default(),
            model: ModelConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Path to the historical sales dataset (delimited, with header)
    #[serde(default = "default_dataset_path")]
    pub dataset_path: PathBuf,

    /// Fraction of rows held out for evaluation
    #[serde(default = "default_holdout_fraction")]
    pub holdout_fraction: f64,

    /// Random seed for the train/holdout split and the forest
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Number of trees in the forest
    #[serde(default = "default_n_trees")]
    pub n_trees: u16,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            dataset_path: default_dataset_path(),
            holdout_fraction: default_holdout_fraction(),
            seed: default_seed(),
            n_trees: default_n_trees(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Path of the serialized model artifact
    #[serde(default = "default_artifact_path")]
    pub artifact_path: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            artifact_path: default_artifact_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level filter used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_dataset_path() -> PathBuf {
    PathBuf::from("data/train.csv")
}

fn default_holdout_fraction() -> f64 {
    0.1
}

fn default_seed() -> u64 {
    42
}

fn default_n_trees() -> u16 {
    100
}

fn default_artifact_path() -> PathBuf {
    PathBuf::from("model.bin")
}

fn default_log_level() -> String {
    "info".to_string()
}
