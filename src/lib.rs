//! Usage: Passport portal library (OAuth2/PKCE login and an access guard for protected pages).

mod app;
mod gateway;
mod infra;
mod shared;

pub use app::logging;
pub use gateway::{build_app, serve};
pub use infra::settings;
pub use shared::error::{AppError, AppResult};
