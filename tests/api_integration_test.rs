/// Integration tests for the HTTP prediction API
///
/// These tests drive the real router end to end:
/// - Placeholder bootstrap on a fresh service
/// - Prediction success and structured failure responses
/// - The last-prediction slot semantics
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use retail_demand_forecaster::{
    api::{build_router, AppState},
    ml::PredictionService,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

fn bootstrap_router(dir: &TempDir) -> Router {
    let service =
        Arc::new(PredictionService::load_or_bootstrap(&dir.path().join("model.bin")).unwrap());
    build_router(AppState::new(service))
}

fn post_predict(payload: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn valid_payload() -> Value {
    json!({
        "store_id": 1,
        "sku_id": 101,
        "total_price": 12.5,
        "base_price": 15.0,
        "is_featured_sku": 1,
        "is_display_sku": 0,
    })
}

#[tokio::test]
async fn test_index_points_at_predict() {
    let dir = TempDir::new().unwrap();
    let router = bootstrap_router(&dir);

    let response = router.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("/predict"));
}

#[tokio::test]
async fn test_predict_on_fresh_bootstrap_succeeds() {
    let dir = TempDir::new().unwrap();
    let router = bootstrap_router(&dir);

    let response = router.oneshot(post_predict(&valid_payload())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["model_origin"], json!("placeholder"));

    let prediction = &body["prediction"];
    assert_eq!(prediction["store_id"], json!(1));
    assert_eq!(prediction["sku_id"], json!(101));
    assert_eq!(prediction["total_price"], json!(12.5));

    let value = prediction["prediction"].as_f64().unwrap();
    assert!(value.is_finite());
    // rounded to exactly 2 decimal places
    assert_eq!(value, (value * 100.0).round() / 100.0);
}

#[tokio::test]
async fn test_predict_with_non_numeric_price_fails_then_recovers() {
    let dir = TempDir::new().unwrap();
    let router = bootstrap_router(&dir);

    let mut bad = valid_payload();
    bad["total_price"] = json!("abc");

    let response = router
        .clone()
        .oneshot(post_predict(&bad))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["success"], json!(false));
    assert!(!body["error"].as_str().unwrap().is_empty());

    // the service keeps answering after a failed request
    let response = router.oneshot(post_predict(&valid_payload())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
}

#[tokio::test]
async fn test_predict_with_missing_field_fails() {
    let dir = TempDir::new().unwrap();
    let router = bootstrap_router(&dir);

    let mut payload = valid_payload();
    payload.as_object_mut().unwrap().remove("base_price");

    let response = router.oneshot(post_predict(&payload)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].as_str().unwrap().contains("base_price"));
}

#[tokio::test]
async fn test_fresh_service_reports_no_prediction_yet() {
    let dir = TempDir::new().unwrap();
    let router = bootstrap_router(&dir);

    let response = router.oneshot(get("/predict")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("No prediction made yet"));
    assert!(body.get("last_prediction").is_none());
}

#[tokio::test]
async fn test_last_prediction_reflects_most_recent_success() {
    let dir = TempDir::new().unwrap();
    let router = bootstrap_router(&dir);

    router
        .clone()
        .oneshot(post_predict(&valid_payload()))
        .await
        .unwrap();

    let response = router.oneshot(get("/predict")).await.unwrap();
    let body = body_json(response).await;

    let last = &body["last_prediction"];
    assert_eq!(last["store_id"], json!(1));
    assert_eq!(last["sku_id"], json!(101));
    assert!(last["prediction"].as_f64().is_some());
}

#[tokio::test]
async fn test_last_prediction_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let router = bootstrap_router(&dir);

    router
        .clone()
        .oneshot(post_predict(&valid_payload()))
        .await
        .unwrap();

    let first = body_json(router.clone().oneshot(get("/predict")).await.unwrap()).await;
    let second = body_json(router.oneshot(get("/predict")).await.unwrap()).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_failed_predict_leaves_slot_unchanged() {
    let dir = TempDir::new().unwrap();
    let router = bootstrap_router(&dir);

    router
        .clone()
        .oneshot(post_predict(&valid_payload()))
        .await
        .unwrap();
    let before = body_json(router.clone().oneshot(get("/predict")).await.unwrap()).await;

    let mut bad = valid_payload();
    bad["sku_id"] = json!("not-a-sku");
    let response = router.clone().oneshot(post_predict(&bad)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let after = body_json(router.oneshot(get("/predict")).await.unwrap()).await;
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_health_reports_model_origin() {
    let dir = TempDir::new().unwrap();
    let router = bootstrap_router(&dir);

    let response = router.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], json!("ok"));
    assert_eq!(body["model_origin"], json!("placeholder"));
}
