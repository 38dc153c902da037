//! Usage: `passport-portal` binary entry point.

use passport_portal_lib::{logging, serve, settings};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let log_dir = logging::log_dir_from_env();
    let _logging = match logging::init(log_dir.as_deref()) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let settings = match settings::load() {
        Ok(settings) => settings,
        Err(err) => {
            tracing::error!(code = err.code(), "failed to load settings: {}", err.message());
            return ExitCode::FAILURE;
        }
    };

    match serve(settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(code = err.code(), "portal exited: {}", err.message());
            ExitCode::FAILURE
        }
    }
}
