//! Usage: OAuth2 authorization-code + PKCE login against the identity provider.
//!
//! `start` and `callback` run the browser login; `guard` protects configured
//! paths on every request, refreshing an expired access token at most once.

pub(crate) mod callback;
pub(crate) mod cookies;
pub(crate) mod errors;
pub(crate) mod guard;
pub(crate) mod pkce;
pub(crate) mod start;
pub(crate) mod token_bundle;
pub(crate) mod token_exchange;
pub(crate) mod user_info;
