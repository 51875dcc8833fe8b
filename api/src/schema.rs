use ::serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::model::PredictionRequest;

pub const YIELD_UNIT: &str = "tons/hectare";

#[derive(Debug, Deserialize, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub model: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct RangeView {
    pub min: f64,
    pub max: f64,
}

/// Valid categorical values plus numeric bounds, as served to the client.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FeaturesResponse {
    pub areas: Vec<String>,
    pub crops: Vec<String>,
    pub soil_types: Vec<String>,
    pub ranges: BTreeMap<String, RangeView>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PredictResponse {
    pub predicted_yield: f64,
    pub unit: String,
    pub input_data: PredictionRequest,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
}
