use crop_yield_api::app::{self, AppState};
use crop_yield_api::config::Config;
use crop_yield_api::estimator::ModelArtifact;
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crop_yield_api=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    let artifact = match &config.model_path {
        Some(path) => ModelArtifact::load(path)?,
        None => {
            tracing::warn!("MODEL_PATH not set, serving the built-in model");
            ModelArtifact::builtin()
        }
    };

    let state = AppState::new(artifact)?;

    let app = app::create_router(state);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;

    Ok(())
}
