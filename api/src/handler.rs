use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::{
    extract::{Json, State},
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::Value;

use crate::app::AppState;
use crate::error::GatewayError;
use crate::schema::{ErrorResponse, FeaturesResponse, HealthResponse, PredictResponse, YIELD_UNIT};

pub async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let artifact = state.gateway.artifact();
    Json(HealthResponse {
        status: "healthy".to_string(),
        model_loaded: true,
        model: artifact.name.clone(),
        version: artifact.version.clone(),
        timestamp: Utc::now(),
    })
}

pub async fn get_features(State(state): State<AppState>) -> Json<FeaturesResponse> {
    Json(state.gateway.catalog())
}

pub async fn predict_yield(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, GatewayError> {
    let Json(payload) = payload.map_err(|e| GatewayError::MalformedBody(e.body_text()))?;

    match state.gateway.predict(&payload) {
        Ok(prediction) => {
            tracing::info!(
                area = %prediction.input.area,
                crop = %prediction.input.crop,
                predicted_yield = prediction.predicted_yield,
                "prediction served"
            );
            Ok((
                StatusCode::OK,
                Json(PredictResponse {
                    predicted_yield: prediction.predicted_yield,
                    unit: YIELD_UNIT.to_string(),
                    input_data: prediction.input,
                }),
            ))
        }
        Err(e @ GatewayError::Model(_)) => {
            tracing::error!(error = %e, "model evaluation failed");
            Err(e)
        }
        Err(e) => {
            tracing::warn!(error = %e, "prediction request rejected");
            Err(e)
        }
    }
}

pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "Not found".to_string(),
            fields: Vec::new(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{create_router, AppState};
    use crate::estimator::{Estimator, LinearRegression, ModelArtifact, N_FEATURES};
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use axum::Router;
    use serde_json::json;
    use tower::util::ServiceExt;

    fn app() -> Router {
        create_router(AppState::new(ModelArtifact::builtin()).unwrap())
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_predict(body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/predict")
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.into())
            .unwrap()
    }

    fn sample() -> Value {
        json!({
            "Area": "Punjab",
            "Crop": "Wheat",
            "Soil_Type": "Loamy",
            "Temperature": 25.5,
            "Humidity": 65.0,
            "PH": 6.5,
            "Annual_Rainfall": 850.0
        })
    }

    #[tokio::test]
    async fn health_reports_loaded_model() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let health: HealthResponse = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(health.status, "healthy");
        assert!(health.model_loaded);
        assert_eq!(health.version, "builtin");
    }

    #[tokio::test]
    async fn features_are_stable() {
        let mut catalogs = Vec::new();
        for _ in 0..2 {
            let response = app()
                .oneshot(Request::builder().uri("/features").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            catalogs.push(body_json(response).await);
        }
        assert_eq!(catalogs[0], catalogs[1]);
        assert!(catalogs[0]["areas"]
            .as_array()
            .unwrap()
            .contains(&json!("Punjab")));
        assert_eq!(catalogs[0]["ranges"]["Temperature"], json!({"min": -10.0, "max": 50.0}));
    }

    #[tokio::test]
    async fn predict_returns_yield_and_echo() {
        let response = app()
            .oneshot(post_predict(sample().to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["predicted_yield"].as_f64().unwrap() > 0.0);
        assert_eq!(body["unit"], "tons/hectare");
        assert_eq!(body["input_data"], sample());
    }

    #[tokio::test]
    async fn predict_rejects_missing_fields() {
        let response = app()
            .oneshot(post_predict(json!({"Area": "Punjab"}).to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(
            body["error"],
            "Missing required fields: Crop, Soil_Type, Temperature, Humidity, PH, Annual_Rainfall"
        );
        assert_eq!(body["fields"].as_array().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn predict_rejects_out_of_range() {
        let mut body = sample();
        body["Annual_Rainfall"] = json!(3000.1);
        let response = app().oneshot(post_predict(body.to_string())).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["fields"], json!(["Annual_Rainfall"]));
    }

    #[tokio::test]
    async fn predict_rejects_malformed_json() {
        let response = app().oneshot(post_predict("{not json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().starts_with("Invalid JSON body"));
    }

    #[tokio::test]
    async fn predict_rejects_non_object_body() {
        let response = app().oneshot(post_predict("[1,2]")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Request body must be a JSON object");
    }

    #[tokio::test]
    async fn model_failure_is_server_error() {
        let mut coefficients = vec![0.0; N_FEATURES];
        coefficients[6] = 1e308; // overflows to infinity on rainfall
        let artifact = ModelArtifact {
            estimator: Estimator::Linear(LinearRegression {
                intercept: 0.0,
                coefficients,
            }),
            ..ModelArtifact::builtin()
        };
        let app = create_router(AppState::new(artifact).unwrap());

        let response = app.oneshot(post_predict(sample().to_string())).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(
            body["error"],
            "Prediction failed: model produced a non-finite prediction"
        );
        assert!(body.get("fields").is_none());
    }

    #[tokio::test]
    async fn unknown_route_is_json_404() {
        let response = app()
            .oneshot(Request::builder().uri("/train").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "Not found");
    }
}
