use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::error::ModelError;
use crate::estimator::ModelArtifact;
use crate::gateway::Gateway;
use crate::handler::{get_features, get_health, not_found, predict_yield};

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
}

impl AppState {
    pub fn new(artifact: ModelArtifact) -> Result<Self, ModelError> {
        Ok(Self {
            gateway: Arc::new(Gateway::new(artifact)?),
        })
    }
}

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/features", get(get_features))
        .route("/predict", post(predict_yield))
        .fallback(not_found)
        .with_state(app_state)
}
