//! Usage: Access guard middleware for protected paths (validate, refresh once, or redirect).

use axum::extract::{Request, State};
use axum::http::header::CACHE_CONTROL;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use serde_json::Value;

use super::cookies::{append_set_cookie, cookie_value, session_cookie, TOKEN_COOKIE};
use super::token_bundle::TokenBundle;
use super::token_exchange::{refresh_access_token, TokenRefreshRequest};
use super::user_info::{validate_access_token, TokenValidation};
use crate::gateway::manager::PortalState;
use crate::gateway::pages::{FORBIDDEN_PATH, LOGIN_PATH};
use crate::shared::security::mask_token;

pub(crate) const REFRESH_TOKEN_PATH: &str = "/oauth/token";

/// User JSON from the whoami endpoint, attached to requests the guard lets through.
/// `None` after a silent refresh, since the new token is not re-validated.
#[derive(Debug, Clone)]
pub(crate) struct AuthenticatedUser(pub(crate) Option<Value>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DenyReason {
    NoCookie,
    MissingToken,
    RefreshFailed,
    Rejected,
    ProviderUnavailable,
}

impl DenyReason {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::NoCookie => "no_cookie",
            Self::MissingToken => "missing_token",
            Self::RefreshFailed => "refresh_failed",
            Self::Rejected => "rejected",
            Self::ProviderUnavailable => "provider_unavailable",
        }
    }
}

#[derive(Debug)]
pub(crate) enum GuardOutcome {
    Allowed {
        user: Option<Value>,
        refreshed: Option<TokenBundle>,
    },
    Forbidden,
    Denied(DenyReason),
}

pub(crate) async fn evaluate(state: &PortalState, headers: &HeaderMap) -> GuardOutcome {
    let jar = CookieJar::from_headers(headers);
    let Some(raw) = cookie_value(&jar, TOKEN_COOKIE) else {
        return GuardOutcome::Denied(DenyReason::NoCookie);
    };
    let bundle = match TokenBundle::from_json(raw) {
        Ok(bundle) => bundle,
        Err(err) if err.is_missing_token() => {
            return GuardOutcome::Denied(DenyReason::MissingToken)
        }
        Err(err) => {
            tracing::debug!("unreadable token cookie: {}", err);
            return GuardOutcome::Denied(DenyReason::NoCookie);
        }
    };

    let api_base = state.settings.api_base();
    let validation =
        match validate_access_token(&state.client, api_base, bundle.access_token()).await {
            Ok(v) => v,
            Err(err) => {
                tracing::warn!(kind = err.kind(), "access token validation failed: {}", err);
                return GuardOutcome::Denied(DenyReason::ProviderUnavailable);
            }
        };

    match validation {
        TokenValidation::Valid(user) => GuardOutcome::Allowed {
            user,
            refreshed: None,
        },
        TokenValidation::Forbidden => GuardOutcome::Forbidden,
        TokenValidation::Rejected(status) => {
            tracing::info!(status, "access token rejected by provider");
            GuardOutcome::Denied(DenyReason::Rejected)
        }
        TokenValidation::Expired => {
            let token_uri = format!("{api_base}{REFRESH_TOKEN_PATH}");
            let request = TokenRefreshRequest {
                token_uri: &token_uri,
                client_id: &state.settings.oauth_client_id,
                refresh_token: bundle.refresh_token(),
            };
            match refresh_access_token(&state.client, &request).await {
                Ok(refreshed) => {
                    tracing::info!(
                        access_token = %mask_token(refreshed.access_token()),
                        "access token refreshed"
                    );
                    GuardOutcome::Allowed {
                        user: None,
                        refreshed: Some(refreshed),
                    }
                }
                Err(err) => {
                    tracing::warn!(kind = err.kind(), "token refresh failed: {}", err);
                    GuardOutcome::Denied(DenyReason::RefreshFailed)
                }
            }
        }
    }
}

fn no_store_redirect(location: &str) -> Response {
    ([(CACHE_CONTROL, "no-store")], Redirect::temporary(location)).into_response()
}

pub(crate) async fn access_guard(
    State(state): State<PortalState>,
    mut req: Request,
    next: Next,
) -> Response {
    if !state.protected.is_protected(req.uri().path()) {
        return next.run(req).await;
    }

    let path = req.uri().path().to_string();
    match evaluate(&state, req.headers()).await {
        GuardOutcome::Allowed { user, refreshed } => {
            tracing::debug!(path = %path, refreshed = refreshed.is_some(), "access allowed");
            req.extensions_mut().insert(AuthenticatedUser(user));
            let mut response = next.run(req).await;
            if let Some(bundle) = refreshed {
                let cookie = session_cookie(
                    TOKEN_COOKIE,
                    bundle.to_cookie_value(),
                    bundle.max_age_secs(state.settings.default_token_ttl_seconds.into()),
                    state.settings.cookie_secure(),
                );
                append_set_cookie(response.headers_mut(), &cookie);
            }
            response
        }
        GuardOutcome::Forbidden => {
            tracing::info!(path = %path, outcome = "forbidden", "access denied");
            no_store_redirect(FORBIDDEN_PATH)
        }
        GuardOutcome::Denied(reason) => {
            tracing::info!(path = %path, outcome = reason.as_str(), "access denied");
            no_store_redirect(LOGIN_PATH)
        }
    }
}
