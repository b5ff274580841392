//! Analysis engine port: provider abstraction + daily call limit.
//!
//! Every caller passes explicit `GenerationOptions`; providers never fill in
//! sampling defaults of their own.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};

use crate::config::ai::AiConfig;
use crate::error::EngineError;

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

/// Sampling parameters for one generation call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub top_p: f32,
}

impl GenerationOptions {
    /// Report facets: factual, long-form.
    pub const REPORT: Self = Self {
        temperature: 0.3,
        max_output_tokens: 2000,
        top_p: 0.9,
    };
    /// Follow-up conversation: more creative, shorter.
    pub const CHAT: Self = Self {
        temperature: 0.7,
        max_output_tokens: 1000,
        top_p: 0.9,
    };
    /// Keyword extraction for search terms.
    pub const REFINE: Self = Self {
        temperature: 0.2,
        max_output_tokens: 64,
        top_p: 0.9,
    };
}

pub type EngineFuture<'a> = Pin<Box<dyn Future<Output = Result<String, EngineError>> + Send + 'a>>;

/// Text generation capability shared by the report, chat and refine paths.
/// Implementations are stateless handles, safe to call concurrently.
pub trait AnalysisEngine: Send + Sync {
    fn generate<'a>(&'a self, prompt: &'a str, options: &'a GenerationOptions) -> EngineFuture<'a>;
    /// Provider name for diagnostics/metrics.
    fn provider_name(&self) -> &'static str;
}

pub type DynEngine = Arc<dyn AnalysisEngine>;

/// Factory: build an engine according to config and environment variables.
///
/// * `AI_TEST_MODE=mock` returns a deterministic mock engine.
/// * `AI_TEST_MODE=error` returns an engine that always fails.
/// * Else if `config.enabled == false` (or no key), returns a disabled engine.
/// * Else builds the real provider wrapped with the daily limit.
pub fn build_engine_from_config(config: &AiConfig) -> Result<DynEngine, EngineError> {
    match std::env::var("AI_TEST_MODE").as_deref() {
        Ok("mock") => {
            return Ok(Arc::new(DailyLimitEngine::new(
                MockEngine::default(),
                config.daily_limit,
            )))
        }
        Ok("error") => return Ok(Arc::new(MockEngine::failing())),
        _ => {}
    }

    if !config.enabled || config.api_key.trim().is_empty() {
        return Ok(Arc::new(DisabledEngine));
    }

    let engine: DynEngine = match config.provider.as_str() {
        "openai" => Arc::new(DailyLimitEngine::new(
            OpenAiEngine::new(config)?,
            config.daily_limit,
        )),
        "gemini" => Arc::new(DailyLimitEngine::new(
            GeminiEngine::new(config)?,
            config.daily_limit,
        )),
        other => {
            tracing::warn!(provider = other, "unknown AI provider; engine disabled");
            Arc::new(DisabledEngine)
        }
    };
    Ok(engine)
}

fn http_client() -> Result<reqwest::Client, EngineError> {
    Ok(reqwest::Client::builder()
        .user_agent("topic-pulse/0.1")
        .connect_timeout(Duration::from_secs(4))
        .timeout(Duration::from_secs(60))
        .build()?)
}

async fn error_for_status(resp: reqwest::Response) -> Result<reqwest::Response, EngineError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body: String = resp
        .text()
        .await
        .unwrap_or_default()
        .chars()
        .take(300)
        .collect();
    Err(EngineError::Status { status, body })
}

// ------------------------------------------------------------
// Concrete providers
// ------------------------------------------------------------

/// Google Gemini (`generateContent`). Requires an API key.
pub struct GeminiEngine {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiEngine {
    pub fn new(config: &AiConfig) -> Result<Self, EngineError> {
        Ok(Self {
            http: http_client()?,
            api_key: config.api_key.clone(),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| "gemini-1.5-flash".to_string()),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com".to_string()),
        })
    }

    async fn generate_impl(&self, prompt: &str, options: &GenerationOptions) -> Result<String, EngineError> {
        #[derive(Serialize)]
        struct Part<'a> {
            text: &'a str,
        }
        #[derive(Serialize)]
        struct Content<'a> {
            parts: Vec<Part<'a>>,
        }
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct GenConfig {
            temperature: f32,
            max_output_tokens: u32,
            top_p: f32,
        }
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Req<'a> {
            contents: Vec<Content<'a>>,
            generation_config: GenConfig,
        }
        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            candidates: Vec<Candidate>,
        }
        #[derive(Deserialize)]
        struct Candidate {
            content: Option<CandidateContent>,
        }
        #[derive(Deserialize)]
        struct CandidateContent {
            #[serde(default)]
            parts: Vec<RespPart>,
        }
        #[derive(Deserialize)]
        struct RespPart {
            #[serde(default)]
            text: String,
        }

        let req = Req {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenConfig {
                temperature: options.temperature,
                max_output_tokens: options.max_output_tokens,
                top_p: options.top_p,
            },
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );
        let resp = self
            .http
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&req)
            .send()
            .await?;
        let body: Resp = error_for_status(resp).await?.json().await?;

        let text = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect::<String>())
            .unwrap_or_default();
        non_empty(text)
    }
}

impl AnalysisEngine for GeminiEngine {
    fn generate<'a>(&'a self, prompt: &'a str, options: &'a GenerationOptions) -> EngineFuture<'a> {
        Box::pin(self.generate_impl(prompt, options))
    }
    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}

/// OpenAI provider (Chat Completions API).
pub struct OpenAiEngine {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiEngine {
    pub fn new(config: &AiConfig) -> Result<Self, EngineError> {
        Ok(Self {
            http: http_client()?,
            api_key: config.api_key.clone(),
            model: config.model.clone().unwrap_or_else(|| "gpt-4o-mini".to_string()),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| "https://api.openai.com".to_string()),
        })
    }

    async fn generate_impl(&self, prompt: &str, options: &GenerationOptions) -> Result<String, EngineError> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
            top_p: f32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            #[serde(default)]
            content: Option<String>,
        }

        let req = Req {
            model: &self.model,
            messages: vec![Msg {
                role: "user",
                content: prompt,
            }],
            temperature: options.temperature,
            max_tokens: options.max_output_tokens,
            top_p: options.top_p,
        };

        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let resp = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await?;
        let body: Resp = error_for_status(resp).await?.json().await?;
        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        non_empty(text)
    }
}

impl AnalysisEngine for OpenAiEngine {
    fn generate<'a>(&'a self, prompt: &'a str, options: &'a GenerationOptions) -> EngineFuture<'a> {
        Box::pin(self.generate_impl(prompt, options))
    }
    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

fn non_empty(text: String) -> Result<String, EngineError> {
    if text.trim().is_empty() {
        Err(EngineError::EmptyResponse)
    } else {
        Ok(text)
    }
}

/// Always fails with `EngineError::Disabled`; used when AI is off.
pub struct DisabledEngine;

impl AnalysisEngine for DisabledEngine {
    fn generate<'a>(&'a self, _prompt: &'a str, _options: &'a GenerationOptions) -> EngineFuture<'a> {
        Box::pin(async { Err(EngineError::Disabled) })
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Deterministic engine for local runs (`AI_TEST_MODE`).
#[derive(Clone, Default)]
pub struct MockEngine {
    fail: bool,
}

impl MockEngine {
    pub fn failing() -> Self {
        Self { fail: true }
    }
}

impl AnalysisEngine for MockEngine {
    fn generate<'a>(&'a self, prompt: &'a str, _options: &'a GenerationOptions) -> EngineFuture<'a> {
        let fail = self.fail;
        let first_line = prompt.lines().next().unwrap_or_default().to_string();
        Box::pin(async move {
            if fail {
                return Err(EngineError::Status {
                    status: 503,
                    body: "mock failure".to_string(),
                });
            }
            Ok(format!("Mock analysis for: {first_line}"))
        })
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

// ------------------------------------------------------------
// Daily limit wrapper
// ------------------------------------------------------------

#[derive(Debug)]
struct DailyCounter {
    date: NaiveDate,
    count: u32,
}

/// Caps real provider calls per UTC day. Only successful calls count.
pub struct DailyLimitEngine<E: AnalysisEngine> {
    inner: E,
    daily_limit: u32,
    counter: Mutex<DailyCounter>,
}

impl<E: AnalysisEngine> DailyLimitEngine<E> {
    pub fn new(inner: E, daily_limit: u32) -> Self {
        Self {
            inner,
            daily_limit,
            counter: Mutex::new(DailyCounter {
                date: Utc::now().date_naive(),
                count: 0,
            }),
        }
    }

    /// Claims one call for today under a single lock. `None` when the cap is
    /// already taken, including by calls still in flight.
    fn reserve(&self) -> Option<NaiveDate> {
        let mut g = self.counter.lock().unwrap_or_else(|e| e.into_inner());
        let today = Utc::now().date_naive();
        if g.date != today {
            g.date = today;
            g.count = 0;
        }
        if g.count >= self.daily_limit {
            return None;
        }
        g.count += 1;
        Some(today)
    }

    /// Gives back a slot claimed by a call that failed.
    fn release(&self, day: NaiveDate) {
        let mut g = self.counter.lock().unwrap_or_else(|e| e.into_inner());
        if g.date == day {
            g.count = g.count.saturating_sub(1);
        }
    }

    async fn generate_impl(&self, prompt: &str, options: &GenerationOptions) -> Result<String, EngineError> {
        let provider = self.inner.provider_name();
        let Some(day) = self.reserve() else {
            counter!("engine_calls_total", "provider" => provider, "result" => "daily_limit")
                .increment(1);
            return Err(EngineError::DailyLimit(self.daily_limit));
        };

        let out = self.inner.generate(prompt, options).await;
        match &out {
            Ok(text) => {
                counter!("engine_calls_total", "provider" => provider, "result" => "ok").increment(1);
                tracing::debug!(target: "engine", provider, chars = text.len(), "generation ok");
            }
            Err(e) => {
                self.release(day);
                counter!("engine_calls_total", "provider" => provider, "result" => e.kind())
                    .increment(1);
                tracing::warn!(target: "engine", provider, error = %e, "generation failed");
            }
        }
        out
    }
}

impl<E: AnalysisEngine> AnalysisEngine for DailyLimitEngine<E> {
    fn generate<'a>(&'a self, prompt: &'a str, options: &'a GenerationOptions) -> EngineFuture<'a> {
        Box::pin(self.generate_impl(prompt, options))
    }
    fn provider_name(&self) -> &'static str {
        self.inner.provider_name()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::analyze::report::{ReportAssembler, FACET_FAILURE_PREFIX};

    #[tokio::test]
    async fn disabled_engine_fails() {
        let e = DisabledEngine;
        let res = e.generate("hello", &GenerationOptions::REPORT).await;
        assert!(matches!(res, Err(EngineError::Disabled)));
    }

    #[tokio::test]
    async fn daily_limit_blocks_after_cap() {
        let e = DailyLimitEngine::new(MockEngine::default(), 2);
        for _ in 0..2 {
            assert!(e.generate("q", &GenerationOptions::CHAT).await.is_ok());
        }
        let third = e.generate("q", &GenerationOptions::CHAT).await;
        assert!(matches!(third, Err(EngineError::DailyLimit(2))));
    }

    #[tokio::test]
    async fn failures_do_not_consume_the_limit() {
        let e = DailyLimitEngine::new(MockEngine::failing(), 1);
        assert!(e.generate("q", &GenerationOptions::CHAT).await.is_err());
        assert!(e.generate("q", &GenerationOptions::CHAT).await.is_err());
        assert!(e.reserve().is_some());
    }

    struct SlowEngine {
        calls: AtomicUsize,
    }

    impl AnalysisEngine for SlowEngine {
        fn generate<'a>(&'a self, _prompt: &'a str, _options: &'a GenerationOptions) -> EngineFuture<'a> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok("done".to_string())
            })
        }
        fn provider_name(&self) -> &'static str {
            "slow"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_facets_respect_the_daily_limit() {
        let limited = Arc::new(DailyLimitEngine::new(
            SlowEngine { calls: AtomicUsize::new(0) },
            2,
        ));
        let assembler = ReportAssembler::new(limited.clone());
        let facets = assembler.assemble("solar", &[]).await;

        assert_eq!(limited.inner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(facets.values().filter(|v| *v == "done").count(), 2);
        assert_eq!(
            facets
                .values()
                .filter(|v| v.starts_with(FACET_FAILURE_PREFIX))
                .count(),
            3
        );
    }

    #[serial_test::serial]
    #[test]
    fn disabled_config_builds_disabled_engine() {
        let cfg = AiConfig::default();
        std::env::remove_var("AI_TEST_MODE");
        let e = build_engine_from_config(&cfg).unwrap();
        assert_eq!(e.provider_name(), "disabled");
    }
}
