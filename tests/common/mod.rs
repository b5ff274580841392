// tests/common/mod.rs
//! Test doubles shared by the integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;

use topic_pulse::analyze::engine::{AnalysisEngine, EngineFuture, GenerationOptions};
use topic_pulse::error::{EngineError, SourceError};
use topic_pulse::ingest::types::{
    Platform, Record, SourceAdapter, TrendAdapter, TrendPoint, TrendSeries,
};

pub fn record(platform: Platform, title: &str) -> Record {
    Record::new(platform, title, format!("https://{platform}.test/{title}"))
}

/// What a stub adapter does when called.
#[derive(Clone)]
pub enum Reply {
    Records(Vec<Record>),
    Fail,
}

/// Canned adapter: optional delay (tokio time, so paused clocks work),
/// records every query it receives.
pub struct StubAdapter {
    platform: Platform,
    reply: Reply,
    delay: Duration,
    refined: bool,
    pub queries: Arc<Mutex<Vec<String>>>,
}

impl StubAdapter {
    pub fn ok(platform: Platform, records: Vec<Record>) -> Self {
        Self::new(platform, Reply::Records(records))
    }

    pub fn titles(platform: Platform, titles: &[&str]) -> Self {
        Self::ok(platform, titles.iter().map(|t| record(platform, t)).collect())
    }

    pub fn empty(platform: Platform) -> Self {
        Self::ok(platform, Vec::new())
    }

    pub fn failing(platform: Platform) -> Self {
        Self::new(platform, Reply::Fail)
    }

    fn new(platform: Platform, reply: Reply) -> Self {
        Self {
            platform,
            reply,
            delay: Duration::ZERO,
            refined: false,
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn wants_refined_query(mut self) -> Self {
        self.refined = true;
        self
    }
}

#[async_trait]
impl SourceAdapter for StubAdapter {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn prefers_refined_query(&self) -> bool {
        self.refined
    }

    async fn fetch(&self, query: &str, _limit: usize) -> Result<Vec<Record>, SourceError> {
        self.queries.lock().push(query.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.reply {
            Reply::Records(r) => Ok(r.clone()),
            Reply::Fail => Err(SourceError::Status(503)),
        }
    }
}

pub struct StubTrends {
    series: Option<TrendSeries>,
    delay: Duration,
}

impl StubTrends {
    pub fn absent() -> Self {
        Self {
            series: None,
            delay: Duration::ZERO,
        }
    }

    /// Weekly points starting 2024-01-01.
    pub fn points(n: usize) -> Self {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let points = (0..n)
            .map(|i| TrendPoint {
                date: start + chrono::Duration::weeks(i as i64),
                value: 40 + i as i64,
            })
            .collect();
        Self {
            series: Some(TrendSeries {
                points,
                top_related: Vec::new(),
                rising_related: Vec::new(),
            }),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl TrendAdapter for StubTrends {
    async fn fetch(&self, _query: &str, _timeframe: &str) -> Result<Option<TrendSeries>, SourceError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.series.clone())
    }
}

type Script = dyn Fn(&str, &GenerationOptions) -> Result<String, EngineError> + Send + Sync;

/// Engine whose reply is computed from the prompt; every prompt is kept.
pub struct ScriptedEngine {
    script: Box<Script>,
    pub prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedEngine {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(&str, &GenerationOptions) -> Result<String, EngineError> + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn echo() -> Self {
        Self::new(|prompt, _| Ok(format!("ok: {}", prompt.lines().next().unwrap_or_default())))
    }

    pub fn unavailable() -> Self {
        Self::new(|_, _| Err(EngineError::Disabled))
    }
}

impl AnalysisEngine for ScriptedEngine {
    fn generate<'a>(&'a self, prompt: &'a str, options: &'a GenerationOptions) -> EngineFuture<'a> {
        self.prompts.lock().push(prompt.to_string());
        let out = (self.script)(prompt, options);
        Box::pin(async move { out })
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}
