// src/ingest/types.rs
use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::SourceError;

/// Content platforms, in the fixed order records are concatenated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Reddit,
    Youtube,
    Twitter,
    Quora,
    Wikipedia,
}

impl Platform {
    pub const ALL: [Platform; 5] = [
        Platform::Reddit,
        Platform::Youtube,
        Platform::Twitter,
        Platform::Quora,
        Platform::Wikipedia,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Reddit => "reddit",
            Platform::Youtube => "youtube",
            Platform::Twitter => "twitter",
            Platform::Quora => "quora",
            Platform::Wikipedia => "wikipedia",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalized unit of content. Only `platform` and `url` are guaranteed;
/// everything else is best-effort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub platform: Platform,
    pub title_or_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// e.g. upvotes, views, retweets. The metric set varies per platform.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub engagement: BTreeMap<String, i64>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<NaiveDate>,
    /// Post text, transcript excerpt or summary; truncated by the adapter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl Record {
    pub fn new(platform: Platform, title_or_text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            platform,
            title_or_text: title_or_text.into(),
            author: None,
            engagement: BTreeMap::new(),
            url: url.into(),
            created: None,
            body: None,
        }
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn metric(mut self, name: &str, value: i64) -> Self {
        self.engagement.insert(name.to_string(), value);
        self
    }

    pub fn created(mut self, date: Option<NaiveDate>) -> Self {
        self.created = date;
        self
    }

    pub fn body(mut self, body: Option<String>) -> Self {
        self.body = body;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedQuery {
    pub query: String,
    pub value: i64,
}

/// Interest-over-time series plus related query lists for one term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendSeries {
    #[serde(rename = "trends")]
    pub points: Vec<TrendPoint>,
    pub top_related: Vec<RelatedQuery>,
    pub rising_related: Vec<RelatedQuery>,
}

/// One content platform behind the aggregator.
///
/// Implementations must be callable concurrently with other adapters, must cap
/// their own output at `limit`, and drop (not fail on) sub-items that cannot be
/// enriched.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn platform(&self) -> Platform;

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<Record>, SourceError>;

    /// Whether this upstream searches better with condensed keywords.
    fn prefers_refined_query(&self) -> bool {
        false
    }
}

/// Search-interest source. An empty series is reported as `Ok(None)`.
#[async_trait]
pub trait TrendAdapter: Send + Sync {
    async fn fetch(&self, query: &str, timeframe: &str) -> Result<Option<TrendSeries>, SourceError>;
}

/// Stand-in for a platform whose credentials were unavailable at startup.
/// Always fails, so the platform still gets its `failed` ledger entry.
#[derive(Debug, Clone, Copy)]
pub struct DisabledAdapter(pub Platform);

#[async_trait]
impl SourceAdapter for DisabledAdapter {
    fn platform(&self) -> Platform {
        self.0
    }

    async fn fetch(&self, _query: &str, _limit: usize) -> Result<Vec<Record>, SourceError> {
        Err(SourceError::Disabled(self.0.as_str()))
    }
}

/// Trend stand-in when the trends upstream is switched off.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledTrends;

#[async_trait]
impl TrendAdapter for DisabledTrends {
    async fn fetch(&self, _query: &str, _timeframe: &str) -> Result<Option<TrendSeries>, SourceError> {
        Err(SourceError::Disabled("google_trends"))
    }
}
