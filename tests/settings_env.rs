mod support;

use passport_portal_lib::settings::{self, RuntimeEnvironment};
use support::TestEnv;

#[test]
fn load_reads_process_environment() {
    let mut env = TestEnv::new();
    env.point_at("https://passport.example.test");
    env.set("PORTAL_LISTEN_ADDRESS", "0.0.0.0:8080");
    env.set("PORTAL_ENV", "production");

    let loaded = settings::load().expect("settings");
    assert_eq!(loaded.api_base(), "https://passport.example.test");
    assert_eq!(loaded.listen_address, "0.0.0.0:8080");
    assert_eq!(loaded.environment, RuntimeEnvironment::Production);
    assert_eq!(loaded.verifier_cookie_ttl_seconds, 600);
}

#[test]
fn load_without_required_values_fails_with_config_code() {
    let _env = TestEnv::new();
    let err = settings::load().expect_err("should fail");
    assert_eq!(err.code(), "CONFIG_INVALID");
}

#[test]
fn config_file_named_by_env_is_used() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = dir.path().join("portal.toml");
    std::fs::write(
        &file,
        r#"
oauth_token_url = "https://passport.example.test/oauth/token"
oauth_client_id = "file-client"
oauth_redirect_uri = "https://portal.example.test/api/auth/callback"
app_url = "https://portal.example.test"
api_url = "https://passport.example.test/"
protected_paths = ["/dashboard", "/admin/:path*"]
environment = "development"
"#,
    )
    .expect("write config");

    let mut env = TestEnv::new();
    env.set(settings::ENV_CONFIG_FILE, file.as_os_str());

    let loaded = settings::load().expect("settings");
    assert_eq!(loaded.oauth_client_id, "file-client");
    assert_eq!(loaded.api_base(), "https://passport.example.test");
    assert!(loaded.cookie_secure());
    assert!(!loaded.is_production());
    assert!(passport_portal_lib::build_app(loaded).is_ok());
}

#[test]
fn build_app_rejects_invalid_settings() {
    let _env = TestEnv::new();
    let err = passport_portal_lib::build_app(settings::PortalSettings::default())
        .expect_err("should fail");
    assert_eq!(err.code(), "CONFIG_INVALID");
}

#[test]
fn build_app_refuses_to_leave_the_dashboard_unguarded() {
    let mut env = TestEnv::new();
    env.point_at("http://passport.test");
    let mut loaded = settings::load().expect("settings");
    loaded.protected_paths = vec!["/admin".to_string()];

    let err = passport_portal_lib::build_app(loaded).expect_err("should fail");
    assert_eq!(err.code(), "CONFIG_INVALID");
    assert!(err.message().contains("/dashboard"));
}
