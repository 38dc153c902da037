//! Usage: Wall-clock helpers.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub(crate) fn now_unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_secs()
}
