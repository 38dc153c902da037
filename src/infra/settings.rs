//! Usage: Portal settings (schema, TOML file + environment loading, sanitizing, validation).

use crate::gateway::pages::{AUTH_FLOW_PATHS, DASHBOARD_PATH};
use crate::gateway::protected_paths::{ProtectedPaths, DEFAULT_PROTECTED_PREFIX};
use crate::shared::error::AppResult;
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

pub const ENV_CONFIG_FILE: &str = "PORTAL_CONFIG";

const ENV_OAUTH_TOKEN_URL: &str = "NEXT_PUBLIC_OAUTH_TOKEN_URL";
const ENV_OAUTH_CLIENT_ID: &str = "NEXT_PUBLIC_OAUTH_CLIENT_ID";
const ENV_OAUTH_REDIRECT_URI: &str = "NEXT_PUBLIC_OAUTH_REDIRECT_URI";
const ENV_APP_URL: &str = "NEXT_PUBLIC_APP_URL";
const ENV_API_URL: &str = "NEXT_PUBLIC_API_URL";
const ENV_LISTEN_ADDRESS: &str = "PORTAL_LISTEN_ADDRESS";
const ENV_PROTECTED_PATHS: &str = "PORTAL_PROTECTED_PATHS";
const ENV_CONNECT_TIMEOUT: &str = "PORTAL_PROVIDER_CONNECT_TIMEOUT_SECONDS";
const ENV_REQUEST_TIMEOUT: &str = "PORTAL_PROVIDER_REQUEST_TIMEOUT_SECONDS";
const ENV_VERIFIER_TTL: &str = "PORTAL_VERIFIER_COOKIE_TTL_SECONDS";
const ENV_DEFAULT_TOKEN_TTL: &str = "PORTAL_DEFAULT_TOKEN_TTL_SECONDS";
const ENV_COOKIE_SECURE: &str = "PORTAL_COOKIE_SECURE";
const ENV_RUNTIME: &str = "PORTAL_ENV";

pub const DEFAULT_LISTEN_ADDRESS: &str = "127.0.0.1:3000";
pub const DEFAULT_PROVIDER_CONNECT_TIMEOUT_SECONDS: u32 = 5;
pub const DEFAULT_PROVIDER_REQUEST_TIMEOUT_SECONDS: u32 = 10;
pub const DEFAULT_VERIFIER_COOKIE_TTL_SECONDS: u32 = 600;
pub const DEFAULT_TOKEN_TTL_SECONDS: u32 = 3600;
const MAX_PROVIDER_CONNECT_TIMEOUT_SECONDS: u32 = 60;
const MAX_PROVIDER_REQUEST_TIMEOUT_SECONDS: u32 = 120;
const MAX_VERIFIER_COOKIE_TTL_SECONDS: u32 = 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeEnvironment {
    Development,
    Production,
}

impl Default for RuntimeEnvironment {
    fn default() -> Self {
        Self::Production
    }
}

impl RuntimeEnvironment {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" | "test" => Some(Self::Development),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalSettings {
    // Identity provider token endpoint used for the authorization_code grant.
    pub oauth_token_url: String,
    pub oauth_client_id: String,
    pub oauth_redirect_uri: String,
    // Public base URL of this portal; the callback redirects to `{app_url}/dashboard`.
    pub app_url: String,
    // Identity provider API base (`/start-pkce`, `/oauth/token`, `/api/user/show`).
    pub api_url: String,
    pub listen_address: String,
    pub protected_paths: Vec<String>,
    pub provider_connect_timeout_seconds: u32,
    pub provider_request_timeout_seconds: u32,
    pub verifier_cookie_ttl_seconds: u32,
    pub default_token_ttl_seconds: u32,
    // `None` derives the Secure flag from the scheme of `app_url`.
    pub cookie_secure: Option<bool>,
    pub environment: RuntimeEnvironment,
}

impl Default for PortalSettings {
    fn default() -> Self {
        Self {
            oauth_token_url: String::new(),
            oauth_client_id: String::new(),
            oauth_redirect_uri: String::new(),
            app_url: String::new(),
            api_url: String::new(),
            listen_address: DEFAULT_LISTEN_ADDRESS.to_string(),
            protected_paths: vec![DEFAULT_PROTECTED_PREFIX.to_string()],
            provider_connect_timeout_seconds: DEFAULT_PROVIDER_CONNECT_TIMEOUT_SECONDS,
            provider_request_timeout_seconds: DEFAULT_PROVIDER_REQUEST_TIMEOUT_SECONDS,
            verifier_cookie_ttl_seconds: DEFAULT_VERIFIER_COOKIE_TTL_SECONDS,
            default_token_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
            cookie_secure: None,
            environment: RuntimeEnvironment::default(),
        }
    }
}

impl PortalSettings {
    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure
            .unwrap_or_else(|| self.app_url.trim().starts_with("https://"))
    }

    pub fn is_production(&self) -> bool {
        self.environment == RuntimeEnvironment::Production
    }

    pub fn app_base(&self) -> &str {
        self.app_url.trim().trim_end_matches('/')
    }

    pub fn api_base(&self) -> &str {
        self.api_url.trim().trim_end_matches('/')
    }

    pub(crate) fn protected_path_set(&self) -> AppResult<ProtectedPaths> {
        ProtectedPaths::from_entries(&self.protected_paths)
    }

    pub fn validate(&self) -> AppResult<()> {
        require_http_url(ENV_OAUTH_TOKEN_URL, &self.oauth_token_url)?;
        require_http_url(ENV_OAUTH_REDIRECT_URI, &self.oauth_redirect_uri)?;
        require_http_url(ENV_APP_URL, &self.app_url)?;
        require_http_url(ENV_API_URL, &self.api_url)?;
        if self.oauth_client_id.trim().is_empty() {
            return Err(format!("CONFIG_INVALID: {ENV_OAUTH_CLIENT_ID} is required").into());
        }
        if self.listen_address.trim().is_empty() {
            return Err(format!("CONFIG_INVALID: {ENV_LISTEN_ADDRESS} is required").into());
        }
        let protected = self.protected_path_set()?;
        if let Some(path) = AUTH_FLOW_PATHS.iter().find(|p| protected.is_protected(p)) {
            return Err(format!(
                "CONFIG_INVALID: {ENV_PROTECTED_PATHS} must not cover the login route {path}"
            )
            .into());
        }
        if !protected.is_protected(DASHBOARD_PATH) {
            return Err(format!(
                "CONFIG_INVALID: {ENV_PROTECTED_PATHS} must cover {DASHBOARD_PATH}"
            )
            .into());
        }
        Ok(())
    }
}

fn require_http_url(name: &str, value: &str) -> AppResult<()> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("CONFIG_INVALID: {name} is required").into());
    }
    let url = Url::parse(trimmed)
        .map_err(|e| format!("CONFIG_INVALID: {name} is not a valid URL: {e}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("CONFIG_INVALID: {name} must use http or https").into());
    }
    Ok(())
}

fn sanitize_timeouts(settings: &mut PortalSettings) -> bool {
    let mut changed = false;

    if settings.provider_connect_timeout_seconds == 0 {
        settings.provider_connect_timeout_seconds = DEFAULT_PROVIDER_CONNECT_TIMEOUT_SECONDS;
        changed = true;
    }
    if settings.provider_connect_timeout_seconds > MAX_PROVIDER_CONNECT_TIMEOUT_SECONDS {
        settings.provider_connect_timeout_seconds = MAX_PROVIDER_CONNECT_TIMEOUT_SECONDS;
        changed = true;
    }

    if settings.provider_request_timeout_seconds == 0 {
        settings.provider_request_timeout_seconds = DEFAULT_PROVIDER_REQUEST_TIMEOUT_SECONDS;
        changed = true;
    }
    if settings.provider_request_timeout_seconds > MAX_PROVIDER_REQUEST_TIMEOUT_SECONDS {
        settings.provider_request_timeout_seconds = MAX_PROVIDER_REQUEST_TIMEOUT_SECONDS;
        changed = true;
    }

    changed
}

fn sanitize_cookie_ttls(settings: &mut PortalSettings) -> bool {
    let mut changed = false;

    if settings.verifier_cookie_ttl_seconds == 0 {
        settings.verifier_cookie_ttl_seconds = DEFAULT_VERIFIER_COOKIE_TTL_SECONDS;
        changed = true;
    }
    if settings.verifier_cookie_ttl_seconds > MAX_VERIFIER_COOKIE_TTL_SECONDS {
        settings.verifier_cookie_ttl_seconds = MAX_VERIFIER_COOKIE_TTL_SECONDS;
        changed = true;
    }
    if settings.default_token_ttl_seconds == 0 {
        settings.default_token_ttl_seconds = DEFAULT_TOKEN_TTL_SECONDS;
        changed = true;
    }

    changed
}

fn sanitize(settings: &mut PortalSettings) -> bool {
    let timeouts = sanitize_timeouts(settings);
    let ttls = sanitize_cookie_ttls(settings);
    timeouts || ttls
}

pub fn parse_toml(content: &str) -> AppResult<PortalSettings> {
    toml::from_str(content)
        .map_err(|e| format!("CONFIG_INVALID: failed to parse settings file: {e}").into())
}

fn parse_u32(name: &str, raw: &str) -> AppResult<u32> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| format!("CONFIG_INVALID: {name} must be a non-negative integer").into())
}

fn parse_bool(name: &str, raw: &str) -> AppResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(format!("CONFIG_INVALID: {name} must be a boolean").into()),
    }
}

/// Overlays values from `lookup` (normally the process environment) onto `settings`.
/// Empty values are treated as unset.
pub fn apply_env_overrides<F>(settings: &mut PortalSettings, lookup: F) -> AppResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| {
        lookup(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    if let Some(v) = get(ENV_OAUTH_TOKEN_URL) {
        settings.oauth_token_url = v;
    }
    if let Some(v) = get(ENV_OAUTH_CLIENT_ID) {
        settings.oauth_client_id = v;
    }
    if let Some(v) = get(ENV_OAUTH_REDIRECT_URI) {
        settings.oauth_redirect_uri = v;
    }
    if let Some(v) = get(ENV_APP_URL) {
        settings.app_url = v;
    }
    if let Some(v) = get(ENV_API_URL) {
        settings.api_url = v;
    }
    if let Some(v) = get(ENV_LISTEN_ADDRESS) {
        settings.listen_address = v;
    }
    if let Some(v) = get(ENV_PROTECTED_PATHS) {
        settings.protected_paths = v
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
    }
    if let Some(v) = get(ENV_CONNECT_TIMEOUT) {
        settings.provider_connect_timeout_seconds = parse_u32(ENV_CONNECT_TIMEOUT, &v)?;
    }
    if let Some(v) = get(ENV_REQUEST_TIMEOUT) {
        settings.provider_request_timeout_seconds = parse_u32(ENV_REQUEST_TIMEOUT, &v)?;
    }
    if let Some(v) = get(ENV_VERIFIER_TTL) {
        settings.verifier_cookie_ttl_seconds = parse_u32(ENV_VERIFIER_TTL, &v)?;
    }
    if let Some(v) = get(ENV_DEFAULT_TOKEN_TTL) {
        settings.default_token_ttl_seconds = parse_u32(ENV_DEFAULT_TOKEN_TTL, &v)?;
    }
    if let Some(v) = get(ENV_COOKIE_SECURE) {
        settings.cookie_secure = Some(parse_bool(ENV_COOKIE_SECURE, &v)?);
    }
    if let Some(v) = get(ENV_RUNTIME) {
        settings.environment = RuntimeEnvironment::parse(&v).ok_or_else(|| {
            format!("CONFIG_INVALID: {ENV_RUNTIME} must be `development` or `production`")
        })?;
    }

    Ok(())
}

/// Builds validated settings: defaults, then the optional TOML file, then `lookup`.
pub fn resolve<F>(config_file: Option<&Path>, lookup: F) -> AppResult<PortalSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let mut settings = match config_file {
        Some(path) => {
            let content = std::fs::read_to_string(path).map_err(|e| {
                format!(
                    "CONFIG_INVALID: failed to read settings file {}: {e}",
                    path.display()
                )
            })?;
            parse_toml(&content)?
        }
        None => PortalSettings::default(),
    };

    apply_env_overrides(&mut settings, lookup)?;
    if sanitize(&mut settings) {
        tracing::warn!("portal settings contained out-of-range values; clamped to safe defaults");
    }
    settings.validate()?;
    Ok(settings)
}

/// Reads settings from the process environment (and `PORTAL_CONFIG`, when set).
pub fn load() -> AppResult<PortalSettings> {
    let config_file = std::env::var_os(ENV_CONFIG_FILE)
        .filter(|v| !v.is_empty())
        .map(std::path::PathBuf::from);
    resolve(config_file.as_deref(), |key| std::env::var(key).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn required_env() -> Vec<(&'static str, &'static str)> {
        vec![
            (ENV_OAUTH_TOKEN_URL, "http://passport.test/oauth/token"),
            (ENV_OAUTH_CLIENT_ID, "client-7"),
            (ENV_OAUTH_REDIRECT_URI, "http://portal.test/api/auth/callback"),
            (ENV_APP_URL, "http://portal.test/"),
            (ENV_API_URL, "http://passport.test"),
        ]
    }

    #[test]
    fn resolve_from_env_applies_defaults() {
        let settings = resolve(None, env_of(&required_env())).expect("settings");
        assert_eq!(settings.oauth_client_id, "client-7");
        assert_eq!(settings.app_base(), "http://portal.test");
        assert_eq!(settings.listen_address, DEFAULT_LISTEN_ADDRESS);
        assert_eq!(settings.protected_paths, vec!["/dashboard".to_string()]);
        assert_eq!(
            settings.provider_request_timeout_seconds,
            DEFAULT_PROVIDER_REQUEST_TIMEOUT_SECONDS
        );
        assert!(!settings.cookie_secure());
        assert!(settings.is_production());
    }

    #[test]
    fn missing_required_value_is_config_error() {
        let mut env = required_env();
        env.retain(|(k, _)| *k != ENV_API_URL);
        let err = resolve(None, env_of(&env)).expect_err("should fail");
        assert_eq!(err.code(), "CONFIG_INVALID");
        assert!(err.message().contains(ENV_API_URL));
    }

    #[test]
    fn non_http_url_is_rejected() {
        let mut env = required_env();
        env.push((ENV_APP_URL, "ftp://portal.test"));
        let lookup = env_of(&env);
        let err = resolve(None, lookup).expect_err("should fail");
        assert!(err.message().contains("http or https"));
    }

    #[test]
    fn env_overrides_knobs_and_clamps_timeouts() {
        let mut env = required_env();
        env.extend([
            (ENV_PROTECTED_PATHS, "/dashboard/:path*, /admin"),
            (ENV_REQUEST_TIMEOUT, "9999"),
            (ENV_CONNECT_TIMEOUT, "0"),
            (ENV_COOKIE_SECURE, "yes"),
            (ENV_RUNTIME, "development"),
        ]);
        let settings = resolve(None, env_of(&env)).expect("settings");
        assert_eq!(
            settings.provider_request_timeout_seconds,
            MAX_PROVIDER_REQUEST_TIMEOUT_SECONDS
        );
        assert_eq!(
            settings.provider_connect_timeout_seconds,
            DEFAULT_PROVIDER_CONNECT_TIMEOUT_SECONDS
        );
        assert!(settings.cookie_secure());
        assert!(!settings.is_production());
        let paths = settings.protected_path_set().expect("paths");
        assert!(paths.is_protected("/admin/x"));
        assert!(paths.is_protected("/dashboard"));
    }

    #[test]
    fn protecting_the_login_flow_is_rejected() {
        for entries in ["/", "/auth", "/api/auth/:path*"] {
            let mut env = required_env();
            env.push((ENV_PROTECTED_PATHS, entries));
            let err = resolve(None, env_of(&env)).expect_err("should fail");
            assert_eq!(err.code(), "CONFIG_INVALID", "{entries}");
        }
    }

    #[test]
    fn leaving_the_dashboard_unguarded_is_rejected() {
        for entries in ["/admin", "/dashboard/reports", "/dashboardx"] {
            let mut env = required_env();
            env.push((ENV_PROTECTED_PATHS, entries));
            let err = resolve(None, env_of(&env)).expect_err("should fail");
            assert_eq!(err.code(), "CONFIG_INVALID", "{entries}");
            assert!(err.message().contains("must cover /dashboard"), "{entries}");
        }

        let mut env = required_env();
        env.push((ENV_PROTECTED_PATHS, "/dashboard,/admin"));
        assert!(resolve(None, env_of(&env)).is_ok());
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let mut env = required_env();
        env.push((ENV_VERIFIER_TTL, "ten"));
        let err = resolve(None, env_of(&env)).expect_err("should fail");
        assert!(err.message().contains(ENV_VERIFIER_TTL));
    }

    #[test]
    fn toml_file_is_overlaid_by_env() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("portal.toml");
        std::fs::write(
            &path,
            r#"
oauth_token_url = "https://passport.test/oauth/token"
oauth_client_id = "from-file"
oauth_redirect_uri = "https://portal.test/api/auth/callback"
app_url = "https://portal.test"
api_url = "https://passport.test"
listen_address = "0.0.0.0:8080"
"#,
        )
        .expect("write settings");

        let settings =
            resolve(Some(&path), env_of(&[(ENV_OAUTH_CLIENT_ID, "from-env")])).expect("settings");
        assert_eq!(settings.oauth_client_id, "from-env");
        assert_eq!(settings.listen_address, "0.0.0.0:8080");
        assert!(settings.cookie_secure());
    }

    #[test]
    fn unreadable_file_is_config_error() {
        let err = resolve(Some(Path::new("/nonexistent/portal.toml")), env_of(&[]))
            .expect_err("should fail");
        assert_eq!(err.code(), "CONFIG_INVALID");
    }
}
