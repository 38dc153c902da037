//! Usage: Portal runtime state (settings, pooled HTTP client) and the server lifecycle.

use crate::infra::settings::PortalSettings;
use crate::shared::error::{AppError, AppResult};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;

use super::listen;
use super::protected_paths::ProtectedPaths;
use super::routes::build_router;

#[derive(Clone)]
pub(crate) struct PortalState {
    pub(crate) settings: Arc<PortalSettings>,
    pub(crate) client: reqwest::Client,
    pub(crate) protected: Arc<ProtectedPaths>,
}

impl PortalState {
    pub(crate) fn new(settings: PortalSettings) -> AppResult<Self> {
        let protected = settings.protected_path_set()?;
        let client = build_provider_client(&settings)?;
        Ok(Self {
            settings: Arc::new(settings),
            client,
            protected: Arc::new(protected),
        })
    }
}

fn build_provider_client(settings: &PortalSettings) -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(format!("passport-portal/{}", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(
            settings.provider_connect_timeout_seconds.into(),
        ))
        .timeout(Duration::from_secs(
            settings.provider_request_timeout_seconds.into(),
        ))
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(|e| AppError::with_source("PORTAL_HTTP_CLIENT_INIT", e.to_string(), e))
}

/// Builds the full portal router for `settings` (validated first).
pub fn build_app(settings: PortalSettings) -> AppResult<Router> {
    settings.validate()?;
    let state = PortalState::new(settings)?;
    Ok(build_router(state))
}

/// Binds the configured listen address and serves until Ctrl-C.
pub async fn serve(settings: PortalSettings) -> AppResult<()> {
    let parsed = listen::parse_listen_address(&settings.listen_address)
        .map_err(|e| AppError::new("CONFIG_INVALID", e))?;
    let listen_addr = listen::format_host_port(&parsed.host, parsed.port);

    let protected = settings.protected_path_set()?;
    let app = build_app(settings)?;

    let listener = tokio::net::TcpListener::bind((parsed.host.as_str(), parsed.port))
        .await
        .map_err(|e| {
            AppError::with_source("PORTAL_BIND_FAILED", format!("failed to bind {listen_addr}"), e)
        })?;

    let port = listener
        .local_addr()
        .map(|addr| addr.port())
        .unwrap_or(parsed.port);
    let base_host = if listen::is_wildcard_host(&parsed.host) {
        "127.0.0.1"
    } else {
        parsed.host.as_str()
    };
    tracing::info!(
        listen_addr = %listen_addr,
        base_url = %format!("http://{}", listen::format_host_port(base_host, port)),
        protected = ?protected.prefixes(),
        "portal listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::with_source("PORTAL_SERVE_FAILED", e.to_string(), e))?;

    tracing::info!("portal stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to install Ctrl-C handler: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
