//! unicms - Multi-tenant university content management

use anyhow::Result;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use unicms::{api, config::Config, db};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "unicms=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting unicms...");

    let config_path = std::env::var("UNICMS_CONFIG").unwrap_or_else(|_| "config.yml".to_string());
    let config = Config::load_with_env(Path::new(&config_path))?;
    tracing::info!("Configuration loaded from {}", config_path);

    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {}", config.database.url);

    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    if config.server.admin_token.is_none() {
        tracing::warn!("No admin token configured; dashboard routes are open");
    }
    if config.verification.expose_code {
        tracing::warn!("Verification codes are returned in API responses");
    }

    let state = api::create_state(pool, &config);
    let app = api::build_router(state, &config.server.cors_origin);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
