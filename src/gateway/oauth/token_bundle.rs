//! Usage: Typed view over the provider's token response, persisted verbatim in `oauth_data`.
//!
//! The provider JSON object is kept as-is so the cookie always holds exactly
//! what the token endpoint returned; only `access_token`, `refresh_token`
//! and `expires_in` are lifted into typed fields.

use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub(crate) enum BundleError {
    #[error("token bundle is not valid json")]
    NotJson,
    #[error("token bundle is not a json object")]
    NotObject,
    #[error("token bundle has no access_token")]
    MissingAccessToken,
    #[error("token bundle has no refresh_token")]
    MissingRefreshToken,
}

impl BundleError {
    /// Malformed payloads are treated like a missing cookie; well-formed
    /// payloads without tokens are reported separately.
    pub(crate) fn is_missing_token(self) -> bool {
        matches!(self, Self::MissingAccessToken | Self::MissingRefreshToken)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TokenBundle {
    access_token: String,
    refresh_token: String,
    expires_in: Option<u64>,
    raw: Map<String, Value>,
}

impl TokenBundle {
    pub(crate) fn from_value(value: Value) -> Result<Self, BundleError> {
        let Value::Object(raw) = value else {
            return Err(BundleError::NotObject);
        };

        let access_token =
            non_empty_str(&raw, "access_token").ok_or(BundleError::MissingAccessToken)?;
        let refresh_token =
            non_empty_str(&raw, "refresh_token").ok_or(BundleError::MissingRefreshToken)?;
        let expires_in = raw.get("expires_in").and_then(parse_u64_lossy);

        Ok(Self {
            access_token,
            refresh_token,
            expires_in,
            raw,
        })
    }

    pub(crate) fn from_json(body: &str) -> Result<Self, BundleError> {
        let value: Value = serde_json::from_str(body).map_err(|_| BundleError::NotJson)?;
        Self::from_value(value)
    }

    pub(crate) fn to_cookie_value(&self) -> String {
        let json = Value::Object(self.raw.clone()).to_string();
        urlencoding::encode(&json).into_owned()
    }

    pub(crate) fn access_token(&self) -> &str {
        &self.access_token
    }

    pub(crate) fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    pub(crate) fn expires_in(&self) -> Option<u64> {
        self.expires_in
    }

    /// Cookie lifetime: the provider's `expires_in`, or `default_secs` when absent or zero.
    pub(crate) fn max_age_secs(&self, default_secs: u64) -> u64 {
        self.expires_in.filter(|v| *v > 0).unwrap_or(default_secs)
    }
}

fn non_empty_str(raw: &Map<String, Value>, key: &str) -> Option<String> {
    raw.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_u64_lossy(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

/// Parses a refresh-grant response. Providers that do not rotate refresh
/// tokens may omit `refresh_token`; the previous one is carried over so the
/// rewritten cookie still satisfies the bundle invariant.
pub(crate) fn bundle_from_refresh_response(
    body: &str,
    previous_refresh_token: &str,
) -> Result<TokenBundle, BundleError> {
    let value: Value = serde_json::from_str(body).map_err(|_| BundleError::NotJson)?;
    let Value::Object(mut raw) = value else {
        return Err(BundleError::NotObject);
    };
    if non_empty_str(&raw, "refresh_token").is_none() && !previous_refresh_token.trim().is_empty()
    {
        raw.insert(
            "refresh_token".to_string(),
            Value::String(previous_refresh_token.to_string()),
        );
    }
    TokenBundle::from_value(Value::Object(raw))
}
