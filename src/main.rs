//! Storefront API server

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use storefront_api::api::{build_app, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&std::env::var("DATABASE_URL")?)
        .await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let nats = match std::env::var("NATS_URL") {
        Ok(url) => match async_nats::connect(&url).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unreachable, domain events disabled");
                None
            }
        },
        Err(_) => None,
    };

    let app = build_app(AppState { db, nats });
    let port = std::env::var("PORT").unwrap_or_else(|_| "8083".to_string());
    tracing::info!("storefront API listening on 0.0.0.0:{}", port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?, app).await?;
    Ok(())
}
