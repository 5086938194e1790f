use crate::error::{AppError, Result};
use serde::Serialize;
use serde_json::Value;

/// The model's input schema, in contract order.
///
/// The fitted regressor is a function of exactly these six columns in
/// exactly this order; changing either invalidates any persisted artifact.
pub const FEATURE_COLUMNS: [&str; 6] = [
    "store_id",
    "sku_id",
    "total_price",
    "base_price",
    "is_featured_sku",
    "is_display_sku",
];

/// Number of model input features
pub const N_FEATURES: usize = FEATURE_COLUMNS.len();

/// A single validated inference input
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    pub store_id: i64,
    pub sku_id: i64,
    pub total_price: f64,
    pub base_price: f64,
    pub is_featured_sku: i64,
    pub is_display_sku: i64,
}

impl FeatureVector {
    /// Project to the row the regressor consumes, in `FEATURE_COLUMNS` order
    pub fn as_row(&self) -> [f64; N_FEATURES] {
        [
            self.store_id as f64,
            self.sku_id as f64,
            self.total_price,
            self.base_price,
            self.is_featured_sku as f64,
            self.is_display_sku as f64,
        ]
    }

    /// Coerce a JSON request payload into a feature vector.
    ///
    /// Values may arrive as JSON numbers, numeric strings, or booleans for
    /// the promotion flags. A missing key or non-coercible value is a
    /// request-level validation error naming the offending field.
    pub fn from_payload(payload: &Value) -> Result<Self> {
        Ok(Self {
            store_id: coerce_int(payload, "store_id")?,
            sku_id: coerce_int(payload, "sku_id")?,
            total_price: coerce_float(payload, "total_price")?,
            base_price: coerce_float(payload, "base_price")?,
            is_featured_sku: coerce_int(payload, "is_featured_sku")?,
            is_display_sku: coerce_int(payload, "is_display_sku")?,
        })
    }
}

fn field<'a>(payload: &'a Value, name: &str) -> Result<&'a Value> {
    payload
        .get(name)
        .ok_or_else(|| AppError::Validation(format!("missing field '{}'", name)))
}

fn coerce_int(payload: &Value, name: &str) -> Result<i64> {
    let value = field(payload, name)?;
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| {
                AppError::Validation(format!("field '{}' is out of integer range", name))
            }),
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| {
            AppError::Validation(format!("field '{}' is not a valid integer: '{}'", name, s))
        }),
        Value::Bool(b) => Ok(i64::from(*b)),
        other => Err(AppError::Validation(format!(
            "field '{}' is not numeric: {}",
            name, other
        ))),
    }
}

fn coerce_float(payload: &Value, name: &str) -> Result<f64> {
    let value = field(payload, name)?;
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| AppError::Validation(format!("field '{}' is out of range", name))),
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| {
            AppError::Validation(format!("field '{}' is not a valid number: '{}'", name, s))
        }),
        Value::Bool(b) => Ok(f64::from(u8::from(*b))),
        other => Err(AppError::Validation(format!(
            "field '{}' is not numeric: {}",
            name, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_payload_numeric_values() {
        let payload = json!({
            "store_id": 1,
            "sku_id": 101,
            "total_price": 12.5,
            "base_price": 15.0,
            "is_featured_sku": 1,
            "is_display_sku": 0,
        });

        let features = FeatureVector::from_payload(&payload).unwrap();
        assert_eq!(features.store_id, 1);
        assert_eq!(features.sku_id, 101);
        assert_eq!(features.total_price, 12.5);
        assert_eq!(features.as_row(), [1.0, 101.0, 12.5, 15.0, 1.0, 0.0]);
    }

    #[test]
    fn test_from_payload_string_values() {
        let payload = json!({
            "store_id": "7",
            "sku_id": "202",
            "total_price": "9.99",
            "base_price": " 11.5 ",
            "is_featured_sku": "0",
            "is_display_sku": "1",
        });

        let features = FeatureVector::from_payload(&payload).unwrap();
        assert_eq!(features.store_id, 7);
        assert_eq!(features.base_price, 11.5);
        assert_eq!(features.is_display_sku, 1);
    }

    #[test]
    fn test_from_payload_bool_flags() {
        let payload = json!({
            "store_id": 1,
            "sku_id": 1,
            "total_price": 1.0,
            "base_price": 1.0,
            "is_featured_sku": true,
            "is_display_sku": false,
        });

        let features = FeatureVector::from_payload(&payload).unwrap();
        assert_eq!(features.is_featured_sku, 1);
        assert_eq!(features.is_display_sku, 0);
    }

    #[test]
    fn test_from_payload_missing_field() {
        let payload = json!({
            "store_id": 1,
            "sku_id": 101,
            "total_price": 12.5,
            "base_price": 15.0,
            "is_featured_sku": 1,
        });

        let err = FeatureVector::from_payload(&payload).unwrap_err();
        assert!(err.to_string().contains("is_display_sku"));
    }

    #[test]
    fn test_from_payload_non_numeric_string() {
        let payload = json!({
            "store_id": 1,
            "sku_id": 101,
            "total_price": "abc",
            "base_price": 15.0,
            "is_featured_sku": 1,
            "is_display_sku": 0,
        });

        let err = FeatureVector::from_payload(&payload).unwrap_err();
        assert!(err.to_string().contains("total_price"));
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn test_column_order_is_the_contract() {
        assert_eq!(
            FEATURE_COLUMNS,
            [
                "store_id",
                "sku_id",
                "total_price",
                "base_price",
                "is_featured_sku",
                "is_display_sku"
            ]
        );
    }
}
