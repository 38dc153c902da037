//! Usage: `GET /api/auth/start` - begin the PKCE login and hand the browser to the provider.

use axum::extract::State;
use axum::http::header::CACHE_CONTROL;
use axum::response::{IntoResponse, Redirect, Response};

use super::cookies::{append_set_cookie, session_cookie, VERIFIER_COOKIE};
use super::pkce::{generate_pkce_pair, CODE_CHALLENGE_METHOD};
use crate::gateway::manager::PortalState;

pub(crate) const START_PKCE_PATH: &str = "/start-pkce";

pub(crate) fn authorize_url(api_base: &str, code_challenge: &str) -> String {
    format!(
        "{api_base}{START_PKCE_PATH}?code_challenge={}&code_challenge_method={CODE_CHALLENGE_METHOD}",
        urlencoding::encode(code_challenge)
    )
}

pub(crate) async fn start_pkce(State(state): State<PortalState>) -> Response {
    let settings = &state.settings;
    let pair = generate_pkce_pair();

    let cookie = session_cookie(
        VERIFIER_COOKIE,
        pair.code_verifier,
        settings.verifier_cookie_ttl_seconds.into(),
        settings.cookie_secure(),
    );
    let location = authorize_url(settings.api_base(), &pair.code_challenge);

    tracing::info!(
        ttl_secs = settings.verifier_cookie_ttl_seconds,
        "pkce login started"
    );

    let mut response =
        ([(CACHE_CONTROL, "no-store")], Redirect::temporary(&location)).into_response();
    append_set_cookie(response.headers_mut(), &cookie);
    response
}
