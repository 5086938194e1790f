use crate::api::AppState;
use crate::error::Result;
use crate::ml::{LastPrediction, ModelOrigin};
use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::{json, Value};

/// Informational root endpoint
pub async fn index() -> Json<Value> {
    Json(json!({
        "message": "Welcome! Use POST /predict to make predictions."
    }))
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model_origin: state.service.origin(),
    })
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub model_origin: ModelOrigin,
}

/// Make a prediction from a six-field feature payload.
///
/// Values arrive as request data and are coerced per field; coercion
/// failures surface as a structured `success: false` response, never a
/// crash.
pub async fn predict(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<Json<PredictResponse>> {
    let prediction = state.service.predict(&payload)?;

    Ok(Json(PredictResponse {
        success: true,
        prediction,
        model_origin: state.service.origin(),
    }))
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub success: bool,
    pub prediction: LastPrediction,
    pub model_origin: ModelOrigin,
}

/// Return the most recent prediction, or an explicit "nothing yet" message
pub async fn last_prediction(State(state): State<AppState>) -> Json<Value> {
    match state.service.last_prediction() {
        Some(record) => Json(json!({ "last_prediction": record })),
        None => Json(json!({
            "message": "No prediction made yet. Send a POST request first."
        })),
    }
}
