use health_portal::{
    config::RelayConfig,
    handlers::RelayState,
    routes,
    services::{email_relay::EmailRelay, mail_transport::SmtpMailTransport},
};

use std::{net::SocketAddr, sync::Arc};
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

    let config = RelayConfig::from_env()?;
    if config.credentials().is_none() {
        tracing::warn!("EMAIL_USER or EMAIL_PASS is not set; every send will fail");
    }
    tracing::info!(
        host = %config.smtp.host,
        port = config.smtp.port,
        encryption = ?config.smtp.encryption,
        "Using SMTP relay"
    );

    let transport = Arc::new(SmtpMailTransport::new(config.smtp.clone()));
    let state = RelayState {
        relay: Arc::new(EmailRelay::new(config, transport)),
    };
    let app = routes::relay_router(state);

    let host = std::env::var("RELAY_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("RELAY_PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse::<u16>()?;
    let addr = SocketAddr::from((host.parse::<std::net::IpAddr>()?, port));

    tracing::info!("Mail relay listening on http://{}/send-email", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
