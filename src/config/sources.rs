// src/config/sources.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ingest::types::Platform;

pub const ENV_SOURCES_CONFIG_PATH: &str = "SOURCES_CONFIG_PATH";
pub const DEFAULT_SOURCES_CONFIG_PATH: &str = "config/sources.toml";

fn default_timeout_secs() -> u64 {
    15
}
fn default_timeframe() -> String {
    "today 12-m".to_string()
}
fn default_true() -> bool {
    true
}

/// Per-platform record caps. Adapter policy, passed in on every fetch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SourceLimits {
    pub reddit: usize,
    pub youtube: usize,
    pub twitter: usize,
    pub quora: usize,
    pub wikipedia: usize,
}

impl Default for SourceLimits {
    fn default() -> Self {
        Self {
            reddit: 5,
            youtube: 3,
            twitter: 5,
            quora: 3,
            wikipedia: 1,
        }
    }
}

impl SourceLimits {
    pub fn for_platform(&self, p: Platform) -> usize {
        match p {
            Platform::Reddit => self.reddit,
            Platform::Youtube => self.youtube,
            Platform::Twitter => self.twitter,
            Platform::Quora => self.quora,
            Platform::Wikipedia => self.wikipedia,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourcesConfig {
    /// Max wait per adapter/trend call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Trend window, e.g. "today 12-m" or "today 3-m".
    #[serde(default = "default_timeframe")]
    pub trends_timeframe: String,
    /// Condense the reddit query into keywords before searching.
    #[serde(default = "default_true")]
    pub refine_reddit_query: bool,
    #[serde(default)]
    pub limits: SourceLimits,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            trends_timeframe: default_timeframe(),
            refine_reddit_query: true,
            limits: SourceLimits::default(),
        }
    }
}

impl SourcesConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading sources config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: SourcesConfig = toml::from_str(s).context("parsing sources config")?;
        // A zero timeout would fail every source instantly.
        if cfg.timeout_secs == 0 {
            cfg.timeout_secs = default_timeout_secs();
        }
        if cfg.trends_timeframe.trim().is_empty() {
            cfg.trends_timeframe = default_timeframe();
        }
        Ok(cfg)
    }

    /// Load using env var + fallbacks:
    /// 1) $SOURCES_CONFIG_PATH (must exist)
    /// 2) config/sources.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_SOURCES_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("SOURCES_CONFIG_PATH points to non-existent path"));
            }
            return Self::load_from(&pb);
        }
        let default = PathBuf::from(DEFAULT_SOURCES_CONFIG_PATH);
        if default.exists() {
            return Self::load_from(&default);
        }
        Ok(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg = SourcesConfig::from_toml_str(
            r#"
timeout_secs = 0
[limits]
reddit = 10
"#,
        )
        .unwrap();
        assert_eq!(cfg.timeout_secs, 15);
        assert_eq!(cfg.limits.reddit, 10);
        assert_eq!(cfg.limits.youtube, 3);
        assert_eq!(cfg.trends_timeframe, "today 12-m");
        assert!(cfg.refine_reddit_query);
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        env::remove_var(ENV_SOURCES_CONFIG_PATH);

        // No file in the temp CWD -> defaults
        assert_eq!(SourcesConfig::load_default().unwrap(), SourcesConfig::default());

        let p = tmp.path().join("custom.toml");
        fs::write(&p, "timeout_secs = 3\ntrends_timeframe = \"today 3-m\"").unwrap();
        env::set_var(ENV_SOURCES_CONFIG_PATH, p.display().to_string());
        let cfg = SourcesConfig::load_default().unwrap();
        assert_eq!(cfg.timeout(), Duration::from_secs(3));
        assert_eq!(cfg.trends_timeframe, "today 3-m");

        env::set_var(ENV_SOURCES_CONFIG_PATH, tmp.path().join("missing.toml").display().to_string());
        assert!(SourcesConfig::load_default().is_err());
        env::remove_var(ENV_SOURCES_CONFIG_PATH);

        env::set_current_dir(&old).unwrap();
    }
}
