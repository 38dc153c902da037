//! Usage: Single source of truth for which request paths the access guard covers.
//!
//! Entries are plain prefixes (`/dashboard`) or route-matcher patterns
//! (`/dashboard/:path*`); both normalize to the same segment-bounded prefix.

use super::pages::DASHBOARD_PATH;
use crate::shared::error::AppResult;
use regex::Regex;
use std::sync::OnceLock;

pub(crate) const DEFAULT_PROTECTED_PREFIX: &str = DASHBOARD_PATH;

static MATCHER_ENTRY: OnceLock<Regex> = OnceLock::new();

fn matcher_entry_regex() -> &'static Regex {
    MATCHER_ENTRY.get_or_init(|| {
        Regex::new(r"^(?P<prefix>/[A-Za-z0-9._~\-/]*?)/?(?:/:[A-Za-z_][A-Za-z0-9_]*[*+?]?)?$")
            .expect("matcher entry regex is valid")
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ProtectedPaths {
    prefixes: Vec<String>,
}

impl Default for ProtectedPaths {
    fn default() -> Self {
        Self {
            prefixes: vec![DEFAULT_PROTECTED_PREFIX.to_string()],
        }
    }
}

impl ProtectedPaths {
    pub(crate) fn from_entries<S: AsRef<str>>(entries: &[S]) -> AppResult<Self> {
        let mut prefixes: Vec<String> = Vec::with_capacity(entries.len());
        for entry in entries {
            let prefix = normalize_entry(entry.as_ref())?;
            if !prefixes.contains(&prefix) {
                prefixes.push(prefix);
            }
        }
        if prefixes.is_empty() {
            return Err("CONFIG_INVALID: at least one protected path is required"
                .to_string()
                .into());
        }
        Ok(Self { prefixes })
    }

    pub(crate) fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    pub(crate) fn is_protected(&self, path: &str) -> bool {
        self.prefixes
            .iter()
            .any(|prefix| path_has_prefix(path, prefix.as_str()))
    }
}

fn path_has_prefix(path: &str, prefix: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

fn normalize_entry(raw: &str) -> AppResult<String> {
    let entry = raw.trim();
    let caps = matcher_entry_regex()
        .captures(entry)
        .ok_or_else(|| format!("CONFIG_INVALID: invalid protected path entry `{entry}`"))?;
    let prefix = caps
        .name("prefix")
        .map(|m| m.as_str().trim_end_matches('/'))
        .unwrap_or_default();
    if prefix.is_empty() {
        return Ok("/".to_string());
    }
    if prefix.contains("//") {
        return Err(format!("CONFIG_INVALID: invalid protected path entry `{entry}`").into());
    }
    Ok(prefix.to_string())
}
