// src/ingest/providers/google_trends.rs
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::SourceError;
use crate::ingest::providers::{check_status, date_from_unix, trim_base, BROWSER_UA};
use crate::ingest::types::{RelatedQuery, TrendAdapter, TrendPoint, TrendSeries};

const DEFAULT_BASE: &str = "https://trends.google.com";
const HL: &str = "en-US";
const TZ: &str = "360";
const RELATED_TAKE: usize = 5;

#[derive(Debug, Deserialize)]
struct Explore {
    #[serde(default)]
    widgets: Vec<Widget>,
}
#[derive(Debug, Deserialize)]
struct Widget {
    id: String,
    token: String,
    request: Value,
}

#[derive(Debug, Deserialize)]
struct Multiline {
    default: Timeline,
}
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Timeline {
    #[serde(default)]
    timeline_data: Vec<TimelinePoint>,
}
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimelinePoint {
    time: String,
    #[serde(default)]
    value: Vec<i64>,
    #[serde(default)]
    has_data: Vec<bool>,
}

#[derive(Debug, Deserialize)]
struct Related {
    default: RankedLists,
}
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RankedLists {
    #[serde(default)]
    ranked_list: Vec<RankedList>,
}
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RankedList {
    #[serde(default)]
    ranked_keyword: Vec<RankedKeyword>,
}
#[derive(Debug, Deserialize)]
struct RankedKeyword {
    query: String,
    #[serde(default)]
    value: i64,
}

/// Drop the anti-JSON-hijacking prefix (`)]}'` plus optional `,`) the
/// trends endpoints put in front of every payload.
pub fn strip_xssi(body: &str) -> &str {
    let trimmed = body.trim_start();
    match trimmed.strip_prefix(")]}'") {
        Some(rest) => rest.trim_start_matches(',').trim_start(),
        None => trimmed,
    }
}

fn parse_payload<T: DeserializeOwned>(body: &str) -> Result<T, SourceError> {
    serde_json::from_str(strip_xssi(body)).map_err(SourceError::parse)
}

/// Search-interest series and related queries from the public widget API.
pub struct GoogleTrendsAdapter {
    base_url: String,
    client: reqwest::Client,
    warm_cookies: bool,
}

impl GoogleTrendsAdapter {
    pub fn new() -> Result<Self, SourceError> {
        let mut adapter = Self::with_base_url(DEFAULT_BASE)?;
        adapter.warm_cookies = true;
        Ok(adapter)
    }

    /// No cookie warm-up request; used against stub servers.
    pub fn with_base_url(base: &str) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .user_agent(BROWSER_UA)
            .cookie_store(true)
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            base_url: trim_base(base),
            client,
            warm_cookies: false,
        })
    }

    async fn get_text(&self, path: &str, query: &[(&str, &str)]) -> Result<String, SourceError> {
        let resp = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .send()
            .await?;
        Ok(check_status(resp)?.text().await?)
    }

    async fn widget<T: DeserializeOwned>(&self, path: &str, w: &Widget) -> Result<T, SourceError> {
        let req = w.request.to_string();
        let body = self
            .get_text(
                path,
                &[("hl", HL), ("tz", TZ), ("req", req.as_str()), ("token", w.token.as_str())],
            )
            .await?;
        parse_payload(&body)
    }

    async fn related(&self, w: Option<&Widget>) -> (Vec<RelatedQuery>, Vec<RelatedQuery>) {
        let Some(w) = w else {
            return (Vec::new(), Vec::new());
        };
        match self.widget::<Related>("/trends/api/widgetdata/relatedsearches", w).await {
            Ok(r) => {
                let mut lists = r.default.ranked_list.into_iter().map(|l| {
                    l.ranked_keyword
                        .into_iter()
                        .take(RELATED_TAKE)
                        .map(|k| RelatedQuery { query: k.query, value: k.value })
                        .collect::<Vec<_>>()
                });
                let top = lists.next().unwrap_or_default();
                let rising = lists.next().unwrap_or_default();
                (top, rising)
            }
            Err(e) => {
                tracing::debug!(target: "google_trends", error = %e, "related queries unavailable");
                (Vec::new(), Vec::new())
            }
        }
    }
}

fn to_points(timeline: Timeline) -> Vec<TrendPoint> {
    timeline
        .timeline_data
        .into_iter()
        .filter(|p| p.has_data.first().copied().unwrap_or(true))
        .filter_map(|p| {
            let secs: f64 = p.time.parse().ok()?;
            Some(TrendPoint {
                date: date_from_unix(secs)?,
                value: *p.value.first()?,
            })
        })
        .collect()
}

#[async_trait]
impl TrendAdapter for GoogleTrendsAdapter {
    async fn fetch(&self, query: &str, timeframe: &str) -> Result<Option<TrendSeries>, SourceError> {
        if self.warm_cookies {
            // Cookie priming only; the explore call reports real failures.
            let _ = self.client.get(format!("{}/?geo=US", self.base_url)).send().await;
        }

        let req = json!({
            "comparisonItem": [{ "keyword": query, "geo": "", "time": timeframe }],
            "category": 0,
            "property": "",
        })
        .to_string();
        let body = self
            .get_text("/trends/api/explore", &[("hl", HL), ("tz", TZ), ("req", req.as_str())])
            .await?;
        let explore: Explore = parse_payload(&body)?;

        let timeseries = explore
            .widgets
            .iter()
            .find(|w| w.id == "TIMESERIES")
            .ok_or_else(|| SourceError::parse("explore response has no TIMESERIES widget"))?;
        let multiline: Multiline = self
            .widget("/trends/api/widgetdata/multiline", timeseries)
            .await?;

        let points = to_points(multiline.default);
        if points.is_empty() {
            return Ok(None);
        }

        let related_widget = explore.widgets.iter().find(|w| w.id == "RELATED_QUERIES");
        let (top_related, rising_related) = self.related(related_widget).await;

        Ok(Some(TrendSeries {
            points,
            top_related,
            rising_related,
        }))
    }
}
