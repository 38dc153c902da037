//! Usage: Failure taxonomy for the login flow and the access guard's provider calls.

use super::token_bundle::BundleError;

#[derive(Debug, thiserror::Error)]
pub(crate) enum AuthError {
    #[error("missing authorization code or verifier")]
    MissingInput,
    #[error("identity provider returned status {status}")]
    Provider { status: u16, body: String },
    #[error("identity provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid identity provider response: {0}")]
    InvalidResponse(#[from] BundleError),
}

impl AuthError {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::MissingInput => "missing_input",
            Self::Provider { .. } => "provider_error",
            Self::Transport(err) if err.is_timeout() => "provider_timeout",
            Self::Transport(err) if err.is_connect() => "provider_unreachable",
            Self::Transport(_) => "transport_error",
            Self::InvalidResponse(_) => "invalid_response",
        }
    }

    /// Display text of this error followed by each `source()` in turn.
    pub(crate) fn chain(&self) -> Vec<String> {
        let mut out = vec![self.to_string()];
        let mut current = std::error::Error::source(self);
        while let Some(err) = current {
            let text = err.to_string();
            if out.last() != Some(&text) {
                out.push(text);
            }
            current = err.source();
        }
        out
    }
}
