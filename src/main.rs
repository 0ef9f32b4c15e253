use health_portal::{
    config::session::{validate_production_config, SessionConfig},
    db, routes,
    services::media_store::MediaStore,
    AppState,
};

use anyhow::Context;
use std::net::SocketAddr;
use tower_sessions_sqlx_store::SqliteStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "health_portal=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    validate_production_config()?;

    let pool = db::create_pool().await?;
    db::run_migrations(&pool).await?;

    let media_store = MediaStore::from_env();
    tokio::fs::create_dir_all(media_store.root())
        .await
        .with_context(|| format!("Failed to create media root {}", media_store.root().display()))?;

    let session_store = SqliteStore::new(pool.clone())
        .with_table_name("sessions")
        .map_err(|e| anyhow::anyhow!("Invalid session table name: {}", e))?;
    session_store.migrate().await?;
    let session_layer = SessionConfig::from_env().create_layer(session_store);

    let app = routes::portal_router(AppState::new(pool, media_store)).layer(session_layer);

    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse::<u16>()?;
    let addr = SocketAddr::from((host.parse::<std::net::IpAddr>()?, port));

    tracing::info!("Health portal running on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
