// src/ingest/providers/twitter.rs
use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::SourceError;
use crate::ingest::providers::{date_from_rfc3339, get_json, http_client, trim_base};
use crate::ingest::types::{Platform, Record, SourceAdapter};
use crate::ingest::{normalize_text, truncate_chars};

const DEFAULT_BASE: &str = "https://api.twitter.com";
/// The v2 recent-search endpoint rejects max_results below 10.
const MIN_PAGE: usize = 10;
const TEXT_CAP: usize = 1000;

#[derive(Debug, Deserialize)]
struct SearchResp {
    #[serde(default)]
    data: Vec<Tweet>,
    #[serde(default)]
    includes: Includes,
}
#[derive(Debug, Deserialize)]
struct Tweet {
    id: String,
    text: String,
    author_id: Option<String>,
    created_at: Option<String>,
    #[serde(default)]
    public_metrics: PublicMetrics,
}
#[derive(Debug, Default, Deserialize)]
struct PublicMetrics {
    #[serde(default)]
    retweet_count: i64,
    #[serde(default)]
    like_count: i64,
}
#[derive(Debug, Default, Deserialize)]
struct Includes {
    #[serde(default)]
    users: Vec<User>,
}
#[derive(Debug, Deserialize)]
struct User {
    id: String,
    username: String,
}

/// Recent-tweet search (API v2, app bearer token).
/// Without a token at startup the platform is served by a `DisabledAdapter`.
pub struct TwitterAdapter {
    bearer_token: String,
    base_url: String,
    client: reqwest::Client,
}

impl TwitterAdapter {
    pub fn new(bearer_token: String) -> Result<Self, SourceError> {
        Self::with_base_url(bearer_token, DEFAULT_BASE)
    }

    pub fn with_base_url(bearer_token: String, base: &str) -> Result<Self, SourceError> {
        Ok(Self {
            bearer_token,
            base_url: trim_base(base),
            client: http_client("topic-pulse/0.1")?,
        })
    }
}

#[async_trait]
impl SourceAdapter for TwitterAdapter {
    fn platform(&self) -> Platform {
        Platform::Twitter
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<Record>, SourceError> {
        let q = format!("{query} lang:en");
        let page = limit.clamp(MIN_PAGE, 100).to_string();
        let req = self
            .client
            .get(format!("{}/2/tweets/search/recent", self.base_url))
            .bearer_auth(&self.bearer_token)
            .query(&[
                ("query", q.as_str()),
                ("max_results", page.as_str()),
                ("tweet.fields", "created_at,public_metrics,author_id"),
                ("expansions", "author_id"),
                ("user.fields", "username"),
            ]);
        let resp: SearchResp = get_json(req).await?;

        let users: HashMap<String, String> = resp
            .includes
            .users
            .into_iter()
            .map(|u| (u.id, u.username))
            .collect();

        Ok(resp
            .data
            .into_iter()
            .take(limit)
            .map(|t| {
                let username = t
                    .author_id
                    .as_ref()
                    .and_then(|id| users.get(id))
                    .cloned();
                let url = match &username {
                    Some(u) => format!("https://twitter.com/{u}/status/{}", t.id),
                    None => format!("https://twitter.com/i/web/status/{}", t.id),
                };
                let mut rec = Record::new(
                    Platform::Twitter,
                    truncate_chars(&normalize_text(&t.text), TEXT_CAP),
                    url,
                )
                .metric("retweets", t.public_metrics.retweet_count)
                .metric("likes", t.public_metrics.like_count)
                .created(t.created_at.as_deref().and_then(date_from_rfc3339));
                rec.author = username;
                rec
            })
            .collect())
    }
}
