//! Bursar API Server
//!
//! Main entry point for the Bursar backend service.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bursar_api::{AppState, create_router, notify::StageMailer};
use bursar_db::connect;
use bursar_shared::{AppConfig, EmailService, JwtConfig, JwtService, StageNotifier};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bursar=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load().expect("Failed to load configuration");

    // Connect to database
    let db = Arc::new(connect(&config.database).await?);
    info!("Connected to database");

    // Create JWT service
    let jwt_config = JwtConfig {
        secret: config.jwt.secret.clone(),
        #[allow(clippy::cast_possible_wrap)]
        access_token_expires_minutes: (config.jwt.access_token_expiry_secs / 60) as i64,
    };
    let jwt_service = Arc::new(JwtService::new(jwt_config));

    // Create email service and the stage-waiting fan-out behind it
    let email_service = Arc::new(EmailService::new(config.email.clone()));
    info!(
        smtp_host = %config.email.smtp_host,
        smtp_port = %config.email.smtp_port,
        "Email service configured"
    );
    let mailer = Arc::new(StageMailer::new(Arc::clone(&db), email_service));
    let notifier = StageNotifier::spawn(mailer);

    // Create application state
    let state = AppState {
        db,
        jwt_service,
        notifier,
    };

    // Create router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
