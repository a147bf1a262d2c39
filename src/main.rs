mod auth;
mod config;
mod domain;
mod services;
mod state;
mod store;
mod web;

use crate::state::SharedState;
use axum::Router;
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = config::Settings::from_env();

    let store = store::Store::new();
    let auth = auth::resolve(&settings, &store).await;
    let demo_mode = !settings.backend_configured();

    let generator = Arc::new(services::generate::GenerationService::new(
        settings.openai_api_key.clone(),
        settings.openai_model.clone(),
    ));
    if !generator.is_configured() {
        tracing::warn!("OPENAI_API_KEY not set; question generation serves built-in samples");
    }
    let extractor = Arc::new(services::extract::ExtractionService::new(
        settings.ocr_api_url.clone(),
        settings.ocr_api_key.clone(),
    ));
    let mailer = Arc::new(services::mail::MailService::new(
        settings.mail_api_url.clone(),
        settings.mail_api_key.clone(),
    ));

    let shared: SharedState = Arc::new(state::AppState {
        store,
        auth,
        generator,
        extractor,
        mailer,
        session_key: settings.session_secret.clone(),
        demo_mode,
        identities: Arc::new(tokio::sync::RwLock::new(std::collections::HashMap::new())),
        drafts: Arc::new(tokio::sync::RwLock::new(std::collections::HashMap::new())),
    });

    let app = Router::new()
        .merge(web::routes(shared.clone()))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = settings.bind_addr;
    tracing::info!("Listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
