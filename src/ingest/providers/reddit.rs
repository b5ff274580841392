// src/ingest/providers/reddit.rs
use async_trait::async_trait;
use serde::Deserialize;

use crate::error::SourceError;
use crate::ingest::providers::{date_from_unix, get_json, http_client, trim_base};
use crate::ingest::types::{Platform, Record, SourceAdapter};
use crate::ingest::{normalize_text, truncate_chars};

const DEFAULT_BASE: &str = "https://www.reddit.com";
const BODY_CAP: usize = 500;

#[derive(Debug, Deserialize)]
struct Listing {
    #[serde(default)]
    data: ListingData,
}
#[derive(Debug, Default, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}
#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}
#[derive(Debug, Deserialize)]
struct Post {
    title: Option<String>,
    author: Option<String>,
    #[serde(default)]
    ups: i64,
    #[serde(default)]
    num_comments: i64,
    #[serde(default)]
    permalink: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    created_utc: f64,
}

/// Keyword search over public listings (`/search.json`, sorted by top).
pub struct RedditAdapter {
    base_url: String,
    client: reqwest::Client,
}

impl RedditAdapter {
    pub fn new() -> Result<Self, SourceError> {
        Self::with_base_url(DEFAULT_BASE)
    }

    pub fn with_base_url(base: &str) -> Result<Self, SourceError> {
        Ok(Self {
            base_url: trim_base(base),
            client: http_client("SocialMediaAnalyzer/1.0")?,
        })
    }

    fn to_record(p: Post) -> Record {
        let title = p
            .title
            .map(|t| normalize_text(&t))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "No title".to_string());
        let body = if p.selftext.trim().is_empty() {
            "[Media Post]".to_string()
        } else {
            truncate_chars(&normalize_text(&p.selftext), BODY_CAP)
        };
        Record::new(
            Platform::Reddit,
            title,
            format!("https://reddit.com{}", p.permalink),
        )
        .author(format!("u/{}", p.author.as_deref().unwrap_or("anonymous")))
        .metric("upvotes", p.ups)
        .metric("comments", p.num_comments)
        .created(date_from_unix(p.created_utc))
        .body(Some(body))
    }
}

#[async_trait]
impl SourceAdapter for RedditAdapter {
    fn platform(&self) -> Platform {
        Platform::Reddit
    }

    fn prefers_refined_query(&self) -> bool {
        true
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<Record>, SourceError> {
        let limit_s = limit.to_string();
        let req = self
            .client
            .get(format!("{}/search.json", self.base_url))
            .query(&[("q", query), ("sort", "top"), ("limit", limit_s.as_str())]);
        let listing: Listing = get_json(req).await?;

        Ok(listing
            .data
            .children
            .into_iter()
            .take(limit)
            .map(|c| Self::to_record(c.data))
            .collect())
    }
}
