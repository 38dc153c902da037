//! Usage: HTTP surface of the portal (router, pages, OAuth login flow, access guard).

mod listen;
mod manager;
pub(crate) mod oauth;
pub(crate) mod pages;
pub(crate) mod protected_paths;
mod routes;

pub use manager::{build_app, serve};
