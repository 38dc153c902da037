//! Usage: Access token validation against the provider's "whoami" endpoint.

use super::errors::AuthError;
use serde_json::Value;

pub(crate) const USER_INFO_PATH: &str = "/api/user/show";

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenValidation {
    /// 2xx; carries the user JSON when the body parsed.
    Valid(Option<Value>),
    /// 401: the access token may be refreshed.
    Expired,
    /// 403: authenticated but not allowed.
    Forbidden,
    Rejected(u16),
}

pub(crate) async fn validate_access_token(
    client: &reqwest::Client,
    api_base: &str,
    access_token: &str,
) -> Result<TokenValidation, AuthError> {
    let url = format!("{api_base}{USER_INFO_PATH}");
    let response = client
        .get(url)
        .bearer_auth(access_token)
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await?;

    let status = response.status();
    if status.is_success() {
        // Body is informational only; a garbled one does not revoke access.
        let user = response.json::<Value>().await.ok();
        return Ok(TokenValidation::Valid(user));
    }

    Ok(match status.as_u16() {
        401 => TokenValidation::Expired,
        403 => TokenValidation::Forbidden,
        other => TokenValidation::Rejected(other),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn validate_with(status: u16, body: Option<Value>) -> TokenValidation {
        let server = MockServer::start().await;
        let mut template = ResponseTemplate::new(status);
        if let Some(body) = body {
            template = template.set_body_json(body);
        }
        Mock::given(method("GET"))
            .and(path(USER_INFO_PATH))
            .and(header("authorization", "Bearer access-1"))
            .respond_with(template)
            .expect(1)
            .mount(&server)
            .await;

        validate_access_token(&reqwest::Client::new(), &server.uri(), "access-1")
            .await
            .expect("validation")
    }

    #[tokio::test]
    async fn success_returns_user_payload() {
        let outcome = validate_with(200, Some(json!({"id": 1, "name": "Ada"}))).await;
        assert_eq!(
            outcome,
            TokenValidation::Valid(Some(json!({"id": 1, "name": "Ada"})))
        );
    }

    #[tokio::test]
    async fn success_with_empty_body_is_still_valid() {
        assert_eq!(validate_with(204, None).await, TokenValidation::Valid(None));
    }

    #[tokio::test]
    async fn status_codes_map_to_outcomes() {
        assert_eq!(validate_with(401, None).await, TokenValidation::Expired);
        assert_eq!(validate_with(403, None).await, TokenValidation::Forbidden);
        assert_eq!(validate_with(500, None).await, TokenValidation::Rejected(500));
    }

    #[tokio::test]
    async fn unreachable_provider_is_transport_error() {
        // Port 9 (discard) is not expected to accept HTTP connections locally.
        let err = validate_access_token(&reqwest::Client::new(), "http://127.0.0.1:9", "t")
            .await
            .expect_err("should fail");
        assert!(matches!(err, AuthError::Transport(_)));
    }

    #[tokio::test]
    async fn stalled_provider_is_timeout_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(USER_INFO_PATH))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(1))
            .build()
            .expect("client");

        let err = validate_access_token(&client, &server.uri(), "t")
            .await
            .expect_err("should time out");
        assert_eq!(err.kind(), "provider_timeout");
    }
}
