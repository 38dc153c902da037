use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;

use super::manager::PortalState;
use super::oauth::callback::oauth_callback;
use super::oauth::guard::access_guard;
use super::oauth::start::start_pkce;
use super::pages;
use crate::shared::time::now_unix_seconds;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    app: &'static str,
    version: &'static str,
    ts: u64,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        app: "passport-portal",
        version: env!("CARGO_PKG_VERSION"),
        ts: now_unix_seconds(),
    })
}

/// The guard wraps every route (fallback included) and decides per path
/// whether to act, so configured protected prefixes need no route of their own.
pub(super) fn build_router(state: PortalState) -> Router {
    Router::new()
        .route("/", get(pages::home))
        .route("/health", get(health))
        .route(pages::START_LOGIN_PATH, get(start_pkce))
        .route(pages::CALLBACK_PATH, get(oauth_callback))
        .route(pages::LOGIN_PATH, get(pages::login))
        .route(pages::FORBIDDEN_PATH, get(pages::forbidden))
        .route(pages::LOGOUT_PATH, get(pages::logout))
        .route(pages::DASHBOARD_PATH, get(pages::dashboard))
        .route(&format!("{}/*rest", pages::DASHBOARD_PATH), get(pages::dashboard))
        .fallback(pages::not_found)
        .layer(middleware::from_fn_with_state(state.clone(), access_guard))
        .with_state(state)
}
