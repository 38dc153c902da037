//! Usage: `GET /api/auth/callback` - exchange the authorization code for the token bundle.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use serde_json::{json, Value};

use super::cookies::{
    append_set_cookie, cookie_value, removal_cookie, session_cookie, TOKEN_COOKIE, VERIFIER_COOKIE,
};
use super::errors::AuthError;
use super::token_exchange::{exchange_authorization_code, TokenExchangeRequest};
use crate::gateway::manager::PortalState;
use crate::gateway::pages::DASHBOARD_PATH;
use crate::infra::settings::PortalSettings;
use crate::shared::security::mask_token;

const MISSING_INPUT_MESSAGE: &str = "Invalid state: missing code or verifier";

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CallbackQuery {
    code: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub(crate) async fn oauth_callback(
    State(state): State<PortalState>,
    Query(query): Query<CallbackQuery>,
    jar: CookieJar,
) -> Response {
    if let Some(error) = non_empty(query.error.as_deref()) {
        tracing::warn!(
            error,
            error_description = query.error_description.as_deref().unwrap_or("-"),
            "provider redirected back with an authorization error"
        );
    }

    let code = non_empty(query.code.as_deref());
    let verifier = cookie_value(&jar, VERIFIER_COOKIE);
    let (Some(code), Some(verifier)) = (code, verifier) else {
        tracing::warn!(
            has_code = code.is_some(),
            has_verifier = verifier.is_some(),
            "oauth callback rejected"
        );
        return error_response(&state.settings, AuthError::MissingInput);
    };

    let settings = &state.settings;
    let request = TokenExchangeRequest {
        token_uri: &settings.oauth_token_url,
        client_id: &settings.oauth_client_id,
        redirect_uri: &settings.oauth_redirect_uri,
        code,
        code_verifier: verifier,
    };

    let bundle = match exchange_authorization_code(&state.client, &request).await {
        Ok(bundle) => bundle,
        Err(err) => return error_response(settings, err),
    };

    let max_age = bundle.max_age_secs(settings.default_token_ttl_seconds.into());
    tracing::info!(
        access_token = %mask_token(bundle.access_token()),
        expires_in = ?bundle.expires_in(),
        max_age_secs = max_age,
        "authorization code exchanged"
    );

    let secure = settings.cookie_secure();
    let location = format!("{}{DASHBOARD_PATH}", settings.app_base());
    let mut response = Redirect::temporary(&location).into_response();
    let headers = response.headers_mut();
    append_set_cookie(
        headers,
        &session_cookie(TOKEN_COOKIE, bundle.to_cookie_value(), max_age, secure),
    );
    append_set_cookie(headers, &removal_cookie(VERIFIER_COOKIE, secure));
    response
}

/// JSON body for the provider's error payload: parsed JSON when possible, raw text otherwise.
fn provider_details(body: &str) -> Value {
    serde_json::from_str::<Value>(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

fn error_response(settings: &PortalSettings, err: AuthError) -> Response {
    match err {
        AuthError::MissingInput => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": MISSING_INPUT_MESSAGE })),
        )
            .into_response(),
        AuthError::Provider { status, body } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "Token exchange failed",
                "status": status,
                "details": provider_details(&body),
            })),
        )
            .into_response(),
        other => {
            tracing::error!(kind = other.kind(), "token exchange failed: {}", other);
            let mut body = json!({
                "error": "Internal server error",
                "message": other.to_string(),
            });
            if !settings.is_production() {
                body["stack"] = Value::String(other.chain().join("\n"));
            }
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}
