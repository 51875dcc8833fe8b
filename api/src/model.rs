use serde::{Deserialize, Serialize};

/// A validated, normalized prediction request.
///
/// Field names on the wire match the columns the model was trained on.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PredictionRequest {
    #[serde(rename = "Area")]
    pub area: String,
    #[serde(rename = "Crop")]
    pub crop: String,
    #[serde(rename = "Soil_Type")]
    pub soil_type: String,
    #[serde(rename = "Temperature")]
    pub temperature: f64, // °C
    #[serde(rename = "Humidity")]
    pub humidity: f64, // %
    #[serde(rename = "PH")]
    pub ph: f64,
    #[serde(rename = "Annual_Rainfall")]
    pub annual_rainfall: f64, // mm
}

/// Outcome of a single successful prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct YieldPrediction {
    pub predicted_yield: f64,
    pub input: PredictionRequest,
}
