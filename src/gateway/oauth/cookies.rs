//! Usage: The portal's two cookies, read through `CookieJar` and written as `Set-Cookie` headers.
//!
//! `CookieJar::from_headers` percent-decodes values on the way in. Values are
//! written already percent-encoded, so the jar hands back exactly what was
//! stored before encoding.

use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, HeaderValue};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

pub(crate) const VERIFIER_COOKIE: &str = "pkce_verifier";
pub(crate) const TOKEN_COOKIE: &str = "oauth_data";

/// Non-empty value of `name`; an empty cookie counts as absent.
pub(crate) fn cookie_value<'a>(jar: &'a CookieJar, name: &str) -> Option<&'a str> {
    jar.get(name)
        .map(|cookie| cookie.value().trim())
        .filter(|value| !value.is_empty())
}

pub(crate) fn session_cookie(
    name: &'static str,
    value: String,
    max_age_secs: u64,
    secure: bool,
) -> Cookie<'static> {
    let max_age = i64::try_from(max_age_secs).unwrap_or(i64::MAX);
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::seconds(max_age))
        .build()
}

pub(crate) fn removal_cookie(name: &'static str, secure: bool) -> Cookie<'static> {
    Cookie::build((name, ""))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::ZERO)
        .build()
}

/// Appends a `Set-Cookie` header; cookies that are not valid header text are dropped.
pub(crate) fn append_set_cookie(headers: &mut HeaderMap, cookie: &Cookie<'_>) {
    match HeaderValue::from_str(&cookie.to_string()) {
        Ok(value) => {
            headers.append(SET_COOKIE, value);
        }
        Err(_) => tracing::warn!(
            name = cookie.name(),
            "dropping Set-Cookie header with invalid characters"
        ),
    }
}
