//! OpenSASE Storefront - Self-hosted storefront and back-office

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use opensase_storefront::publisher::EventPublisher;
use opensase_storefront::services::accounts;
use opensase_storefront::store::{PgStore, Store};
use opensase_storefront::{build_router, AppState, Config};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let store = match &config.database_url {
        Some(url) => Store::Postgres(PgStore::connect(url, 10).await?),
        None => {
            tracing::warn!("DATABASE_URL not set; using the in-memory store, data is lost on exit");
            Store::in_memory()
        }
    };
    let events = EventPublisher::connect(config.nats_url.as_deref()).await;
    let port = config.port;
    let currency = config.currency.clone();
    let state = AppState::new(store, config, events);
    accounts::ensure_admin(&state).await?;

    let app = build_router(state).layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive());

    tracing::info!(%currency, "🚀 OpenSASE Storefront listening on 0.0.0.0:{}", port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?, app).await?;
    Ok(())
}
