//! Prediction client.
//!
//! Mirrors what the form frontend does: probe `/health` once, fetch the valid
//! categories from `/features`, check the form locally with the same rules
//! the server applies, then submit to `/predict`.

use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

use crate::error::GatewayError;
use crate::estimator::Categories;
use crate::gateway;
use crate::model::PredictionRequest;
use crate::schema::{ErrorResponse, FeaturesResponse, HealthResponse, PredictResponse};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Checking,
    Connected,
    Error,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Prediction service unavailable. Please try again later.")]
    ServiceUnavailable(#[source] reqwest::Error),

    #[error("{message}")]
    Validation { message: String, fields: Vec<String> },

    #[error("Feature options have not been loaded yet")]
    FeaturesNotLoaded,

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },
}

impl From<GatewayError> for ClientError {
    fn from(err: GatewayError) -> Self {
        ClientError::Validation {
            fields: err.fields(),
            message: err.to_string(),
        }
    }
}

/// Raw form input; every field is text as typed by the user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredictionForm {
    pub area: String,
    pub crop: String,
    pub soil_type: String,
    pub temperature: String,
    pub humidity: String,
    pub ph: String,
    pub annual_rainfall: String,
}

impl PredictionForm {
    fn to_json(&self) -> Value {
        json!({
            "Area": self.area,
            "Crop": self.crop,
            "Soil_Type": self.soil_type,
            "Temperature": self.temperature,
            "Humidity": self.humidity,
            "PH": self.ph,
            "Annual_Rainfall": self.annual_rainfall,
        })
    }
}

pub struct PredictionClient {
    http: Client,
    base_url: String,
    status: ConnectionStatus,
    features: Option<FeaturesResponse>,
}

impl PredictionClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClientError::ServiceUnavailable)?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            status: ConnectionStatus::Checking,
            features: None,
        })
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn features(&self) -> Option<&FeaturesResponse> {
        self.features.as_ref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Probes `/health` and records the resulting connectivity status.
    pub async fn check_health(&mut self) -> ConnectionStatus {
        self.status = ConnectionStatus::Checking;
        let probe = async {
            self.http
                .get(self.url("/health"))
                .send()
                .await?
                .error_for_status()?
                .json::<HealthResponse>()
                .await
        };
        self.status = match probe.await {
            Ok(health) if health.model_loaded => ConnectionStatus::Connected,
            Ok(_) => ConnectionStatus::Error,
            Err(e) => {
                tracing::warn!(error = %e, "health probe failed");
                ConnectionStatus::Error
            }
        };
        self.status
    }

    /// Fetches the valid category options; required before submitting.
    pub async fn load_features(&mut self) -> Result<&FeaturesResponse, ClientError> {
        let response = self
            .http
            .get(self.url("/features"))
            .send()
            .await
            .map_err(ClientError::ServiceUnavailable)?;
        let catalog = read_json::<FeaturesResponse>(response).await?;
        Ok(self.features.insert(catalog))
    }

    /// Runs the server's validation rules against the loaded options.
    pub fn validate(&self, form: &PredictionForm) -> Result<PredictionRequest, ClientError> {
        let catalog = self.features.as_ref().ok_or(ClientError::FeaturesNotLoaded)?;
        let categories = Categories {
            areas: catalog.areas.clone(),
            crops: catalog.crops.clone(),
            soil_types: catalog.soil_types.clone(),
        };
        Ok(gateway::validate(&form.to_json(), &categories)?)
    }

    /// Validates locally, then submits the normalized request.
    pub async fn predict(&self, form: &PredictionForm) -> Result<PredictResponse, ClientError> {
        let request = self.validate(form)?;
        let response = self
            .http
            .post(self.url("/predict"))
            .json(&request)
            .send()
            .await
            .map_err(ClientError::ServiceUnavailable)?;
        read_json::<PredictResponse>(response).await
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return response.json::<T>().await.map_err(ClientError::ServiceUnavailable);
    }
    let body = response
        .text()
        .await
        .map_err(ClientError::ServiceUnavailable)?;
    match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(err) if status.is_client_error() => Err(ClientError::Validation {
            message: err.error,
            fields: err.fields,
        }),
        Ok(err) => Err(ClientError::Server {
            status: status.as_u16(),
            message: err.error,
        }),
        Err(_) => Err(ClientError::Server {
            status: status.as_u16(),
            message: body,
        }),
    }
}

pub fn render_prediction(response: &PredictResponse) -> String {
    format!(
        "Predicted yield: {:.2} {}",
        response.predicted_yield, response.unit
    )
}
