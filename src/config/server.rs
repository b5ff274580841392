// src/config/server.rs
use std::path::PathBuf;

pub const ENV_CORS_ALLOWED_ORIGINS: &str = "CORS_ALLOWED_ORIGINS";
pub const ENV_USERS_FILE: &str = "USERS_FILE";
pub const DEFAULT_USERS_FILE: &str = "data/users.csv";

/// Transport-side settings, read from the environment only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerConfig {
    /// Empty means permissive CORS (local/dev).
    pub allowed_origins: Vec<String>,
    pub users_file: PathBuf,
    /// Mount `/metrics` (DEBUG_ROUTES=1).
    pub debug_routes: bool,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let allowed_origins = std::env::var(ENV_CORS_ALLOWED_ORIGINS)
            .map(|v| parse_origins(&v))
            .unwrap_or_default();
        let users_file = std::env::var(ENV_USERS_FILE)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_USERS_FILE));
        let debug_routes = std::env::var("DEBUG_ROUTES")
            .ok()
            .is_some_and(|v| v == "1");
        Self {
            allowed_origins,
            users_file,
            debug_routes,
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.trim_end_matches('/').to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_trimmed_and_blanks_dropped() {
        let v = parse_origins(" https://a.example/ ,, https://b.example ");
        assert_eq!(v, vec!["https://a.example", "https://b.example"]);
    }
}
