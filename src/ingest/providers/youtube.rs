// src/ingest/providers/youtube.rs
use async_trait::async_trait;
use futures::future::join_all;
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::error::SourceError;
use crate::ingest::providers::{check_status, date_from_rfc3339, get_json, http_client, trim_base};
use crate::ingest::types::{Platform, Record, SourceAdapter};
use crate::ingest::{clean_body, normalize_text};

const DEFAULT_API_BASE: &str = "https://www.googleapis.com";
const DEFAULT_TRANSCRIPT_BASE: &str = "https://video.google.com";
const TRANSCRIPT_SEGMENTS: usize = 500;
const TRANSCRIPT_CAP: usize = 3000;

#[derive(Debug, Deserialize)]
struct SearchResp {
    #[serde(default)]
    items: Vec<SearchItem>,
}
#[derive(Debug, Deserialize)]
struct SearchItem {
    id: VideoId,
    snippet: Snippet,
}
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoId {
    video_id: Option<String>,
}
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    channel_title: String,
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideosResp {
    #[serde(default)]
    items: Vec<VideoInfo>,
}
#[derive(Debug, Deserialize)]
struct VideoInfo {
    #[serde(default)]
    statistics: Statistics,
}
/// The Data API returns counters as decimal strings.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    view_count: Option<String>,
    like_count: Option<String>,
    comment_count: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Transcript {
    #[serde(rename = "text", default)]
    lines: Vec<TranscriptLine>,
}
#[derive(Debug, Deserialize)]
struct TranscriptLine {
    #[serde(rename = "$text", default)]
    text: String,
}

fn count(v: &Option<String>) -> i64 {
    v.as_deref().and_then(|s| s.parse().ok()).unwrap_or(0)
}

/// Joined text of the first segments of a timed-text XML document.
pub fn parse_transcript(xml: &str) -> Option<String> {
    let t: Transcript = from_str(xml).ok()?;
    let joined = t
        .lines
        .iter()
        .take(TRANSCRIPT_SEGMENTS)
        .map(|l| l.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    clean_body(&joined, TRANSCRIPT_CAP)
}

/// Video search + per-video statistics + optional transcript.
pub struct YoutubeAdapter {
    api_key: String,
    api_base: String,
    transcript_base: String,
    client: reqwest::Client,
}

impl YoutubeAdapter {
    pub fn new(api_key: String) -> Result<Self, SourceError> {
        Self::with_base_urls(api_key, DEFAULT_API_BASE, DEFAULT_TRANSCRIPT_BASE)
    }

    pub fn with_base_urls(api_key: String, api_base: &str, transcript_base: &str) -> Result<Self, SourceError> {
        Ok(Self {
            api_key,
            api_base: trim_base(api_base),
            transcript_base: trim_base(transcript_base),
            client: http_client("topic-pulse/0.1")?,
        })
    }

    async fn statistics(&self, video_id: &str) -> Result<Statistics, SourceError> {
        let req = self
            .client
            .get(format!("{}/youtube/v3/videos", self.api_base))
            .query(&[
                ("part", "snippet,statistics"),
                ("id", video_id),
                ("key", self.api_key.as_str()),
            ]);
        let resp: VideosResp = get_json(req).await?;
        resp.items
            .into_iter()
            .next()
            .map(|v| v.statistics)
            .ok_or(SourceError::Empty)
    }

    /// Missing/disabled captions are normal; any failure yields `None`.
    async fn transcript(&self, video_id: &str) -> Option<String> {
        let resp = self
            .client
            .get(format!("{}/api/timedtext", self.transcript_base))
            .query(&[("lang", "en"), ("v", video_id)])
            .send()
            .await
            .ok()?;
        let body = check_status(resp).ok()?.text().await.ok()?;
        if body.trim().is_empty() {
            return None;
        }
        parse_transcript(&body)
    }

    async fn enrich(&self, item: SearchItem) -> Option<Record> {
        let video_id = item.id.video_id?;
        let stats = match self.statistics(&video_id).await {
            Ok(s) => s,
            Err(e) => {
                tracing::debug!(target: "youtube", %video_id, error = %e, "dropping video without metadata");
                return None;
            }
        };
        let transcript = self.transcript(&video_id).await;

        Some(
            Record::new(
                Platform::Youtube,
                normalize_text(&item.snippet.title),
                format!("https://youtube.com/watch?v={video_id}"),
            )
            .author(item.snippet.channel_title)
            .metric("views", count(&stats.view_count))
            .metric("likes", count(&stats.like_count))
            .metric("comments", count(&stats.comment_count))
            .created(item.snippet.published_at.as_deref().and_then(date_from_rfc3339))
            .body(transcript),
        )
    }
}

#[async_trait]
impl SourceAdapter for YoutubeAdapter {
    fn platform(&self) -> Platform {
        Platform::Youtube
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<Record>, SourceError> {
        let max = limit.to_string();
        let req = self
            .client
            .get(format!("{}/youtube/v3/search", self.api_base))
            .query(&[
                ("q", query),
                ("part", "id,snippet"),
                ("maxResults", max.as_str()),
                ("type", "video"),
                ("order", "relevance"),
                ("key", self.api_key.as_str()),
            ]);
        let search: SearchResp = get_json(req).await?;

        let enriched = join_all(
            search
                .items
                .into_iter()
                .take(limit)
                .map(|item| self.enrich(item)),
        )
        .await;
        Ok(enriched.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_xml_is_joined_and_decoded() {
        let xml = r#"<?xml version="1.0" encoding="utf-8" ?><transcript><text start="0" dur="1.2">Hello &amp;amp; welcome</text><text start="1.2" dur="2">to   the show</text></transcript>"#;
        assert_eq!(
            parse_transcript(xml),
            Some("Hello & welcome to the show".to_string())
        );
    }

    #[test]
    fn garbage_transcript_is_none() {
        assert_eq!(parse_transcript("<html><body>nope"), None);
        assert_eq!(parse_transcript("<transcript></transcript>"), None);
    }
}
