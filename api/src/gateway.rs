//! Feature gateway: turns free-form request JSON into the model input vector.
//!
//! Validation happens in two passes. The first collects every missing field;
//! only when all seven are present does the second pass check types,
//! categories and numeric bounds, again reporting every offending field.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::{FieldViolation, GatewayError, ModelError};
use crate::estimator::{Categories, ModelArtifact, N_FEATURES};
use crate::model::{PredictionRequest, YieldPrediction};
use crate::schema::{FeaturesResponse, RangeView};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    Area,
    Crop,
    SoilType,
    Temperature,
    Humidity,
    Ph,
    AnnualRainfall,
}

/// Inclusive bounds on a numeric input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericRange {
    pub min: f64,
    pub max: f64,
}

impl NumericRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

impl Feature {
    /// Model input order.
    pub const ALL: [Feature; N_FEATURES] = [
        Feature::Area,
        Feature::Crop,
        Feature::SoilType,
        Feature::Temperature,
        Feature::Humidity,
        Feature::Ph,
        Feature::AnnualRainfall,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Feature::Area => "Area",
            Feature::Crop => "Crop",
            Feature::SoilType => "Soil_Type",
            Feature::Temperature => "Temperature",
            Feature::Humidity => "Humidity",
            Feature::Ph => "PH",
            Feature::AnnualRainfall => "Annual_Rainfall",
        }
    }

    /// Accepted bounds, `None` for categorical features.
    pub fn range(self) -> Option<NumericRange> {
        match self {
            Feature::Temperature => Some(NumericRange::new(-10.0, 50.0)),
            Feature::Humidity => Some(NumericRange::new(0.0, 100.0)),
            Feature::Ph => Some(NumericRange::new(0.0, 14.0)),
            Feature::AnnualRainfall => Some(NumericRange::new(0.0, 3000.0)),
            Feature::Area | Feature::Crop | Feature::SoilType => None,
        }
    }

    fn classes(self, categories: &Categories) -> &[String] {
        match self {
            Feature::Area => categories.areas.as_slice(),
            Feature::Crop => categories.crops.as_slice(),
            Feature::SoilType => categories.soil_types.as_slice(),
            _ => &[],
        }
    }
}

fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

fn categorical(
    obj: &Map<String, Value>,
    feature: Feature,
    categories: &Categories,
) -> Result<String, FieldViolation> {
    let raw = match obj.get(feature.name()) {
        Some(Value::String(s)) => s,
        _ => return Err(FieldViolation::new(feature.name(), "must be a string")),
    };
    Categories::lookup(feature.classes(categories), raw)
        .map(|(_, canonical)| canonical.to_string())
        .ok_or_else(|| {
            FieldViolation::new(feature.name(), format!("has unknown value '{}'", raw.trim()))
        })
}

fn numeric(obj: &Map<String, Value>, feature: Feature) -> Result<f64, FieldViolation> {
    let value = match obj.get(feature.name()) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| FieldViolation::new(feature.name(), "must be a number"))?;

    if !value.is_finite() {
        return Err(FieldViolation::new(feature.name(), "must be a finite number"));
    }
    if let Some(range) = feature.range() {
        if !range.contains(value) {
            return Err(FieldViolation::new(
                feature.name(),
                format!(
                    "must be between {} and {} (got {value})",
                    range.min, range.max
                ),
            ));
        }
    }
    Ok(value)
}

/// Validates and normalizes a raw request body against the trained vocabulary.
pub fn validate(raw: &Value, categories: &Categories) -> Result<PredictionRequest, GatewayError> {
    let obj = raw.as_object().ok_or(GatewayError::NotAnObject)?;

    let missing: Vec<&'static str> = Feature::ALL
        .iter()
        .filter(|f| is_missing(obj.get(f.name())))
        .map(|f| f.name())
        .collect();
    if !missing.is_empty() {
        return Err(GatewayError::MissingFields(missing));
    }

    match (
        categorical(obj, Feature::Area, categories),
        categorical(obj, Feature::Crop, categories),
        categorical(obj, Feature::SoilType, categories),
        numeric(obj, Feature::Temperature),
        numeric(obj, Feature::Humidity),
        numeric(obj, Feature::Ph),
        numeric(obj, Feature::AnnualRainfall),
    ) {
        (
            Ok(area),
            Ok(crop),
            Ok(soil_type),
            Ok(temperature),
            Ok(humidity),
            Ok(ph),
            Ok(annual_rainfall),
        ) => Ok(PredictionRequest {
            area,
            crop,
            soil_type,
            temperature,
            humidity,
            ph,
            annual_rainfall,
        }),
        (area, crop, soil_type, temperature, humidity, ph, annual_rainfall) => {
            let violations = [
                area.err(),
                crop.err(),
                soil_type.err(),
                temperature.err(),
                humidity.err(),
                ph.err(),
                annual_rainfall.err(),
            ]
            .into_iter()
            .flatten()
            .collect();
            Err(GatewayError::InvalidFields(violations))
        }
    }
}

/// Label-encodes the categoricals and lays out the model input vector.
pub fn encode(
    request: &PredictionRequest,
    categories: &Categories,
) -> Result<[f64; N_FEATURES], GatewayError> {
    let index = |feature: Feature, value: &str| {
        Categories::lookup(feature.classes(categories), value)
            .map(|(idx, _)| idx as f64)
            .ok_or_else(|| {
                FieldViolation::new(feature.name(), format!("has unknown value '{value}'"))
            })
    };
    let mut violations = Vec::new();
    let mut encoded = [0.0; N_FEATURES];
    for (slot, (feature, value)) in encoded.iter_mut().zip([
        (Feature::Area, request.area.as_str()),
        (Feature::Crop, request.crop.as_str()),
        (Feature::SoilType, request.soil_type.as_str()),
    ]) {
        match index(feature, value) {
            Ok(idx) => *slot = idx,
            Err(violation) => violations.push(violation),
        }
    }
    if !violations.is_empty() {
        return Err(GatewayError::InvalidFields(violations));
    }
    encoded[3] = request.temperature;
    encoded[4] = request.humidity;
    encoded[5] = request.ph;
    encoded[6] = request.annual_rainfall;
    Ok(encoded)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Validation front of a loaded model.
#[derive(Debug)]
pub struct Gateway {
    artifact: ModelArtifact,
}

impl Gateway {
    /// Wraps a model, rejecting artifacts that fail validation.
    pub fn new(artifact: ModelArtifact) -> Result<Self, ModelError> {
        artifact.validate()?;
        Ok(Self { artifact })
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    pub fn validate(&self, raw: &Value) -> Result<PredictionRequest, GatewayError> {
        validate(raw, &self.artifact.categories)
    }

    /// Validates, encodes and runs the model. Negative outputs are clamped to
    /// zero and the result is rounded to two decimals.
    pub fn predict(&self, raw: &Value) -> Result<YieldPrediction, GatewayError> {
        let request = self.validate(raw)?;
        let features = encode(&request, &self.artifact.categories)?;
        let raw_yield = self.artifact.predict(&features)?;
        tracing::debug!(?features, raw_yield, "model evaluated");
        Ok(YieldPrediction {
            predicted_yield: round2(raw_yield.max(0.0)),
            input: request,
        })
    }

    pub fn catalog(&self) -> FeaturesResponse {
        let ranges = Feature::ALL
            .iter()
            .filter_map(|f| {
                f.range().map(|r| {
                    (
                        f.name().to_string(),
                        RangeView {
                            min: r.min,
                            max: r.max,
                        },
                    )
                })
            })
            .collect::<BTreeMap<_, _>>();
        let categories = &self.artifact.categories;
        FeaturesResponse {
            areas: categories.areas.clone(),
            crops: categories.crops.clone(),
            soil_types: categories.soil_types.clone(),
            ranges,
        }
    }
}
