// src/config/ai.rs
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path};

pub const ENV_AI_CONFIG_PATH: &str = "AI_CONFIG_PATH";
pub const DEFAULT_AI_CONFIG_PATH: &str = "config/ai.json";

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_daily_limit() -> u32 {
    500
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub enabled: bool,
    /// "gemini" | "openai" (case-insensitive)
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Provider model id; each provider has its own default when absent.
    #[serde(default)]
    pub model: Option<String>,
    /// "ENV" means: read from GEMINI_API_KEY / OPENAI_API_KEY (by provider)
    #[serde(default)]
    pub api_key: String,
    /// Real calls allowed per UTC day across all facets/chat/refine.
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,
    /// Override the provider endpoint (proxies, tests).
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_provider(),
            model: None,
            api_key: String::new(),
            daily_limit: default_daily_limit(),
            base_url: None,
        }
    }
}

impl AiConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        let cfg: AiConfig = serde_json::from_str(&data)?;
        cfg.resolved()
    }

    /// `$AI_CONFIG_PATH`, then `config/ai.json`, then a config derived from
    /// the environment alone (enabled when GEMINI_API_KEY is set).
    pub fn load_default() -> anyhow::Result<Self> {
        if let Ok(p) = env::var(ENV_AI_CONFIG_PATH) {
            return Self::load_from_file(p);
        }
        if Path::new(DEFAULT_AI_CONFIG_PATH).exists() {
            return Self::load_from_file(DEFAULT_AI_CONFIG_PATH);
        }
        Ok(Self::from_env())
    }

    pub fn from_env() -> Self {
        match env::var("GEMINI_API_KEY") {
            Ok(key) if !key.trim().is_empty() => Self {
                enabled: true,
                api_key: key,
                ..Self::default()
            },
            _ => Self::default(),
        }
    }

    fn resolved(mut self) -> anyhow::Result<Self> {
        self.provider = self.provider.trim().to_lowercase();

        if self.api_key.trim().eq_ignore_ascii_case("env") {
            let var = match self.provider.as_str() {
                "gemini" => "GEMINI_API_KEY",
                "openai" => "OPENAI_API_KEY",
                other => anyhow::bail!("Unsupported provider in config: {other}"),
            };
            // A missing key disables the engine instead of failing the boot.
            self.api_key = env::var(var).unwrap_or_default();
            if self.enabled && self.api_key.trim().is_empty() {
                tracing::warn!(target: "engine", env = var, "api key not set; engine disabled");
                self.enabled = false;
            }
        }

        if self.daily_limit == 0 {
            self.daily_limit = default_daily_limit();
        }
        Ok(self)
    }
}
