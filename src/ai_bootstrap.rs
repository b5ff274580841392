// src/ai_bootstrap.rs
use crate::analyze::engine::{build_engine_from_config, DynEngine, GenerationOptions};
use crate::config::ai::AiConfig;
use tracing::{info, warn};

/// Loaded engine config plus the engine built from it.
pub struct EngineRuntime {
    pub cfg: AiConfig,
    pub engine: DynEngine,
}

impl EngineRuntime {
    pub fn from_config(cfg: AiConfig) -> anyhow::Result<Self> {
        // Safe diagnostics: only provider + enabled + key length
        info!(
            target: "engine",
            provider = %cfg.provider,
            enabled = cfg.enabled,
            key_len = cfg.api_key.len(),
            daily_limit = cfg.daily_limit,
            "engine config loaded"
        );
        let engine = build_engine_from_config(&cfg)?;
        Ok(Self { cfg, engine })
    }

    pub fn load_default() -> anyhow::Result<Self> {
        Self::from_config(AiConfig::load_default()?)
    }

    /// One short refine-sized call at startup so a bad key shows up in the
    /// logs immediately. Never fails the boot.
    pub async fn quick_probe(&self) {
        if !self.cfg.enabled {
            warn!(target: "engine", "quick_probe skipped: engine disabled in config");
            return;
        }
        match self
            .engine
            .generate("Reply with the single word: ready", &GenerationOptions::REFINE)
            .await
        {
            Ok(text) => info!(target: "engine", provider = self.engine.provider_name(), chars = text.len(), "quick_probe ok"),
            Err(e) => warn!(target: "engine", provider = self.engine.provider_name(), error = %e, "quick_probe failed"),
        }
    }
}
