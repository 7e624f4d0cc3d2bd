mod auth;
mod calendar;
mod config;
mod error;
mod handlers;
mod meetings;
mod routes;
#[cfg(test)]
mod test_support;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::auth::{CredentialManager, InstalledFlowOptions};
use crate::calendar::CalendarClient;
use crate::config::AppConfig;
use crate::meetings::MeetingService;
use crate::routes::{create_app, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "meet_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenv::dotenv().ok();
    let config = AppConfig::from_env()?;

    tracing::info!("Starting {} {}", config.api_title, config.api_version);

    // Credentials are obtained up front so any consent prompt happens at boot
    let options = InstalledFlowOptions {
        redirect_port: config.oauth_redirect_port,
        timeout: Duration::from_secs(config.oauth_timeout_secs),
        open_browser: config.oauth_open_browser,
    };
    let credentials = CredentialManager::installed_flow(
        &config.google_credentials_file,
        &config.token_cache_file,
        options,
    )
    .await?;
    credentials
        .access_token()
        .await
        .context("Failed to obtain Google Calendar credentials")?;
    tracing::info!("Google Calendar credentials ready");

    let calendar = CalendarClient::new(
        &config.calendar_api_base_url,
        &config.calendar_id,
        Arc::new(credentials),
    );

    let state = AppState {
        meetings: Arc::new(MeetingService::new(calendar)),
        api_title: config.api_title.clone(),
        api_version: config.api_version.clone(),
    };
    let app = create_app(state, config.cors_origins());

    // Run server
    let addr = config.listen_addr();
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
