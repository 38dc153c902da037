//! Usage: OAuth token endpoint calls (authorization_code + refresh_token grants).

use super::errors::AuthError;
use super::token_bundle::{bundle_from_refresh_response, TokenBundle};
use crate::shared::security::redacted_body_snippet;
use serde_json::Value;

#[derive(Debug, Clone)]
pub(crate) struct TokenExchangeRequest<'a> {
    pub(crate) token_uri: &'a str,
    pub(crate) client_id: &'a str,
    pub(crate) redirect_uri: &'a str,
    pub(crate) code: &'a str,
    pub(crate) code_verifier: &'a str,
}

#[derive(Debug, Clone)]
pub(crate) struct TokenRefreshRequest<'a> {
    pub(crate) token_uri: &'a str,
    pub(crate) client_id: &'a str,
    pub(crate) refresh_token: &'a str,
}

pub(crate) async fn exchange_authorization_code(
    client: &reqwest::Client,
    req: &TokenExchangeRequest<'_>,
) -> Result<TokenBundle, AuthError> {
    let form = [
        ("grant_type", "authorization_code"),
        ("client_id", req.client_id.trim()),
        ("redirect_uri", req.redirect_uri.trim()),
        ("code", req.code.trim()),
        ("code_verifier", req.code_verifier.trim()),
    ];

    let response = client.post(req.token_uri.trim()).form(&form).send().await?;
    let body = read_success_body(response, "authorization_code").await?;
    Ok(TokenBundle::from_json(&body)?)
}

pub(crate) async fn refresh_access_token(
    client: &reqwest::Client,
    req: &TokenRefreshRequest<'_>,
) -> Result<TokenBundle, AuthError> {
    let form = [
        ("grant_type", "refresh_token"),
        ("refresh_token", req.refresh_token.trim()),
        ("client_id", req.client_id.trim()),
    ];

    let response = client.post(req.token_uri.trim()).form(&form).send().await?;
    let body = read_success_body(response, "refresh_token").await?;
    Ok(bundle_from_refresh_response(&body, req.refresh_token)?)
}

/// Returns the body of a 2xx response; anything else becomes `AuthError::Provider`.
async fn read_success_body(
    response: reqwest::Response,
    grant: &'static str,
) -> Result<String, AuthError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let (error_code, error_message) = parse_oauth_error_details(&body);
        tracing::warn!(
            grant,
            status = status.as_u16(),
            error_code = error_code.as_deref().unwrap_or("-"),
            error_message = error_message.as_deref().unwrap_or("-"),
            body = %redacted_body_snippet(&body),
            "token endpoint rejected grant"
        );
        return Err(AuthError::Provider {
            status: status.as_u16(),
            body,
        });
    }

    Ok(body)
}

/// Extracts `(error, error_description)` from an OAuth error body.
/// Laravel Passport also sends `message` and `hint`; `message` is used when
/// `error_description` is absent.
fn parse_oauth_error_details(body: &str) -> (Option<String>, Option<String>) {
    let value: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) => return (None, None),
    };

    let pick = |key: &str| {
        value
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    let code = pick("error");
    let message = pick("error_description").or_else(|| pick("message"));
    (code, message)
}
