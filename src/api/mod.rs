pub mod handlers;
pub mod routes;

pub use routes::*;

use crate::ml::PredictionService;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PredictionService>,
}

impl AppState {
    pub fn new(service: Arc<PredictionService>) -> Self {
        Self { service }
    }
}
