mod config;
mod contacts;
mod db_types;
mod elevenlabs;
mod elevenlabs_types;
mod error;
mod filters;
mod handlers;
mod metrics;
mod store;
mod types;

use crate::config::Config;
use crate::types::AppState;

use axum::{
    routing::{get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::prelude::*;

pub fn app(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/functions/get-batch-status",
            post(handlers::batch_status).options(handlers::preflight),
        )
        .route(
            "/functions/get-conversation-audio",
            post(handlers::conversation_audio).options(handlers::preflight),
        )
        .route("/api/dashboard", get(handlers::dashboard))
        .route("/api/campaign-filter", get(handlers::campaign_filter))
        .route("/api/campaign-filter/toggle", post(handlers::toggle_campaign))
        .route(
            "/api/campaigns/:campaign_id/conversations",
            get(handlers::campaign_conversations),
        )
        .route("/api/transcripts/:conversation_id", get(handlers::transcript))
        .route(
            "/api/contacts",
            get(handlers::list_contacts).post(handlers::create_contact),
        )
        .route("/api/contacts/:contact_id", put(handlers::update_contact))
        .route("/api/contact-messages", post(handlers::submit_contact_message))
        .route("/health", get(|| async { "ok" }))
        .with_state(app_state)
}

#[tokio::main]
async fn main() {
    // A missing .env is fine; the variables may come from the environment.
    let _ = dotenvy::dotenv();
    let subscriber = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_file(true)
                .with_line_number(true),
        )
        .with(tracing_subscriber::filter::Targets::new().with_targets([
            ("hyper", tracing_subscriber::filter::LevelFilter::OFF),
            ("sqlx", tracing_subscriber::filter::LevelFilter::WARN),
            ("callboard_rs", tracing_subscriber::filter::LevelFilter::DEBUG),
        ]));
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to install tracing subscriber: {e}");
    }

    if let Err(e) = run().await {
        error!(error=%e, "callboard exited with an error");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    if config.elevenlabs_api_key.is_none() {
        tracing::warn!("ELEVENLABS_API_KEY not set; proxy endpoints will answer 500");
    }

    let db_pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&db_pool).await?;
    info!("database migrations applied");

    let bind_addr = config.bind_addr;
    let app_state = Arc::new(AppState::new(config, db_pool));

    info!(addr=%bind_addr, "listening");
    axum::Server::bind(&bind_addr)
        .serve(app(app_state).into_make_service())
        .await?;
    Ok(())
}
