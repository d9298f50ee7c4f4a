// SPDX-License-Identifier: MIT

//! Ticketbox API server.

use std::sync::Arc;

use ticketbox::{
    auth::CredentialCodec,
    config::Config,
    services::{IdentityService, ProviderClient},
    store::{TicketStore, UserVault},
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    dotenvy::dotenv().ok();
    let config =
        Config::load_or_init(&Config::config_path()).expect("Failed to load configuration");
    tracing::info!(host = %config.host, port = config.port, "Starting ticketbox API");

    let data_dir = Config::data_dir();
    let users = UserVault::new(data_dir.join("users")).expect("Failed to open user vault");
    let tickets = TicketStore::new(data_dir.join("tickets"), config.key.clone())
        .expect("Failed to open ticket store");
    tracing::info!(path = %data_dir.display(), "Storage initialized");

    let codec = CredentialCodec::new(config.key_bytes());
    let provider = ProviderClient::new(
        config.client_id.clone(),
        config.client_secret.clone(),
        config.redirect_uri.clone(),
    );
    let identity = IdentityService::new(
        provider,
        users.clone(),
        codec.clone(),
        config.admins.clone(),
    );

    let state = Arc::new(AppState {
        config: config.clone(),
        codec,
        identity,
        users,
        tickets,
    });

    let app = ticketbox::routes::create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ticketbox=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
