//! Usage: User-facing HTML pages (home, login, forbidden, dashboard) and logout.

use axum::extract::{Extension, State};
use axum::http::header::CACHE_CONTROL;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use serde_json::Value;

use super::manager::PortalState;
use super::oauth::cookies::{append_set_cookie, removal_cookie, TOKEN_COOKIE};
use super::oauth::guard::AuthenticatedUser;

pub(crate) const DASHBOARD_PATH: &str = "/dashboard";
pub(crate) const LOGIN_PATH: &str = "/auth/login";
pub(crate) const FORBIDDEN_PATH: &str = "/auth/forbidden";
pub(crate) const LOGOUT_PATH: &str = "/auth/logout";
pub(crate) const START_LOGIN_PATH: &str = "/api/auth/start";
pub(crate) const CALLBACK_PATH: &str = "/api/auth/callback";

/// Routes of the login flow itself; guarding any of them would loop.
pub(crate) const AUTH_FLOW_PATHS: [&str; 5] = [
    START_LOGIN_PATH,
    CALLBACK_PATH,
    LOGIN_PATH,
    FORBIDDEN_PATH,
    LOGOUT_PATH,
];

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title}</title>\n</head>\n<body>\n<main>\n{body}\n</main>\n</body>\n</html>\n"
    )
}

fn login_button() -> String {
    format!("<p><a class=\"button\" href=\"{START_LOGIN_PATH}\">Login with OAuth</a></p>")
}

pub(crate) async fn home() -> Html<String> {
    Html(layout(
        "Welcome",
        &format!("<h1>Welcome</h1>\n{}", login_button()),
    ))
}

pub(crate) async fn login() -> Html<String> {
    Html(layout(
        "Sign in",
        &format!(
            "<h1>Sign in</h1>\n<p>Your session has ended or you are not signed in.</p>\n{}",
            login_button()
        ),
    ))
}

pub(crate) async fn forbidden() -> (StatusCode, Html<String>) {
    (
        StatusCode::FORBIDDEN,
        Html(layout(
            "Forbidden",
            &format!(
                "<h1>Access denied</h1>\n<p>Your account is not allowed to view this page.</p>\n\
                 <p><a href=\"{LOGOUT_PATH}\">Sign out</a></p>"
            ),
        )),
    )
}

pub(crate) async fn not_found() -> (StatusCode, Html<String>) {
    (
        StatusCode::NOT_FOUND,
        Html(layout("Not found", "<h1>Not found</h1>")),
    )
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn display_name(user: &Value) -> Option<&str> {
    ["name", "email"].iter().find_map(|key| {
        user.get(*key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|v| !v.is_empty())
    })
}

pub(crate) async fn dashboard(user: Option<Extension<AuthenticatedUser>>) -> Html<String> {
    let greeting = user
        .as_ref()
        .and_then(|Extension(AuthenticatedUser(value))| value.as_ref())
        .and_then(display_name)
        .map(|name| format!("Welcome back, {}.", escape_html(name)))
        .unwrap_or_else(|| "Welcome back.".to_string());

    Html(layout(
        "Dashboard",
        &format!(
            "<h1>Dashboard</h1>\n<p>{greeting}</p>\n<p><a href=\"{LOGOUT_PATH}\">Sign out</a></p>"
        ),
    ))
}

/// Drops the local token cookie only; the provider session is left untouched.
pub(crate) async fn logout(State(state): State<PortalState>) -> Response {
    let mut response =
        ([(CACHE_CONTROL, "no-store")], Redirect::temporary(LOGIN_PATH)).into_response();
    append_set_cookie(
        response.headers_mut(),
        &removal_cookie(TOKEN_COOKIE, state.settings.cookie_secure()),
    );
    tracing::info!("portal session cleared");
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn escapes_markup_in_user_names() {
        assert_eq!(
            escape_html("<script>alert('x')</script> & co"),
            "&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt; &amp; co"
        );
    }

    #[test]
    fn display_name_prefers_name_then_email() {
        assert_eq!(display_name(&json!({"name": "Ada", "email": "a@x"})), Some("Ada"));
        assert_eq!(display_name(&json!({"name": " ", "email": "a@x"})), Some("a@x"));
        assert_eq!(display_name(&json!({"email": "a@x"})), Some("a@x"));
        assert_eq!(display_name(&json!({"id": 1})), None);
    }

    #[tokio::test]
    async fn dashboard_without_user_uses_generic_greeting() {
        let Html(page) = dashboard(None).await;
        assert!(page.contains("Welcome back."));

        let user = AuthenticatedUser(Some(json!({"name": "<b>Ada</b>"})));
        let Html(page) = dashboard(Some(Extension(user))).await;
        assert!(page.contains("Welcome back, &lt;b&gt;Ada&lt;/b&gt;."));
    }

    #[tokio::test]
    async fn login_page_links_to_start() {
        let Html(page) = login().await;
        assert!(page.contains("href=\"/api/auth/start\""));
    }
}
