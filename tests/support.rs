use std::ffi::OsString;
use std::sync::{Mutex, MutexGuard, OnceLock};

use axum::body::{to_bytes, Body};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::Request;
use axum::response::Response;
use axum::Router;
use passport_portal_lib::settings::{self, PortalSettings};
use tower::ServiceExt;

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn env_lock() -> MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
struct EnvRestore {
    saved: Vec<(&'static str, Option<OsString>)>,
}

impl EnvRestore {
    fn save_once(&mut self, key: &'static str) {
        if self.saved.iter().any(|(k, _)| *k == key) {
            return;
        }
        self.saved.push((key, std::env::var_os(key)));
    }

    fn set_var(&mut self, key: &'static str, value: impl Into<OsString>) {
        self.save_once(key);
        std::env::set_var(key, value.into());
    }

    fn remove_var(&mut self, key: &'static str) {
        self.save_once(key);
        std::env::remove_var(key);
    }
}

impl Drop for EnvRestore {
    fn drop(&mut self) {
        for (key, value) in self.saved.drain(..).rev() {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
    }
}

const PORTAL_ENV_KEYS: [&str; 14] = [
    "NEXT_PUBLIC_OAUTH_TOKEN_URL",
    "NEXT_PUBLIC_OAUTH_CLIENT_ID",
    "NEXT_PUBLIC_OAUTH_REDIRECT_URI",
    "NEXT_PUBLIC_APP_URL",
    "NEXT_PUBLIC_API_URL",
    "PORTAL_LISTEN_ADDRESS",
    "PORTAL_PROTECTED_PATHS",
    "PORTAL_PROVIDER_CONNECT_TIMEOUT_SECONDS",
    "PORTAL_PROVIDER_REQUEST_TIMEOUT_SECONDS",
    "PORTAL_VERIFIER_COOKIE_TTL_SECONDS",
    "PORTAL_DEFAULT_TOKEN_TTL_SECONDS",
    "PORTAL_COOKIE_SECURE",
    "PORTAL_ENV",
    "PORTAL_CONFIG",
];

/// Serializes tests that touch process env and restores it on drop.
/// Every portal variable starts out unset.
pub struct TestEnv {
    _lock: MutexGuard<'static, ()>,
    env: EnvRestore,
}

impl TestEnv {
    pub fn new() -> Self {
        let lock = env_lock();
        let mut env = EnvRestore::default();
        for key in PORTAL_ENV_KEYS {
            env.remove_var(key);
        }
        Self { _lock: lock, env }
    }

    #[allow(dead_code)]
    pub fn set(&mut self, key: &'static str, value: impl Into<OsString>) {
        self.env.set_var(key, value);
    }

    /// Points the portal at a mock provider listening on `provider_uri`.
    #[allow(dead_code)]
    pub fn point_at(&mut self, provider_uri: &str) {
        self.set("NEXT_PUBLIC_OAUTH_TOKEN_URL", format!("{provider_uri}/oauth/token"));
        self.set("NEXT_PUBLIC_OAUTH_CLIENT_ID", "portal-client");
        self.set(
            "NEXT_PUBLIC_OAUTH_REDIRECT_URI",
            "http://portal.test/api/auth/callback",
        );
        self.set("NEXT_PUBLIC_APP_URL", "http://portal.test");
        self.set("NEXT_PUBLIC_API_URL", provider_uri);
        self.set("PORTAL_ENV", "development");
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(dead_code)]
pub fn load_settings() -> PortalSettings {
    settings::load().expect("settings")
}

#[allow(dead_code)]
pub async fn get(app: &Router, uri: &str, cookie: Option<&str>) -> Response {
    let mut req = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        req = req.header(COOKIE, cookie);
    }
    app.clone()
        .oneshot(req.body(Body::empty()).expect("request"))
        .await
        .expect("response")
}

/// `name=value` pair of the first `Set-Cookie` header for `name`.
#[allow(dead_code)]
pub fn set_cookie_pair(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{name}=")))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

#[allow(dead_code)]
pub async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8_lossy(&bytes).into_owned()
}
