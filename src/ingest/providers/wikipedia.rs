// src/ingest/providers/wikipedia.rs
use async_trait::async_trait;
use serde::Deserialize;

use crate::error::SourceError;
use crate::ingest::clean_body;
use crate::ingest::providers::{get_json, http_client, trim_base};
use crate::ingest::types::{Platform, Record, SourceAdapter};

const DEFAULT_BASE: &str = "https://en.wikipedia.org";
const EXTRACT_CAP: usize = 2000;

#[derive(Debug, Deserialize)]
struct SearchResp {
    #[serde(default)]
    query: SearchQuery,
}
#[derive(Debug, Default, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}
#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Debug, Deserialize)]
struct Summary {
    title: String,
    #[serde(default)]
    extract: String,
    content_urls: Option<ContentUrls>,
}
#[derive(Debug, Deserialize)]
struct ContentUrls {
    desktop: DesktopUrls,
}
#[derive(Debug, Deserialize)]
struct DesktopUrls {
    page: String,
}

/// Top search hits resolved to page summaries.
pub struct WikipediaAdapter {
    base_url: String,
    client: reqwest::Client,
}

impl WikipediaAdapter {
    pub fn new() -> Result<Self, SourceError> {
        Self::with_base_url(DEFAULT_BASE)
    }

    pub fn with_base_url(base: &str) -> Result<Self, SourceError> {
        Ok(Self {
            base_url: trim_base(base),
            client: http_client("topic-pulse/0.1")?,
        })
    }

    async fn summary(&self, title: &str) -> Result<Summary, SourceError> {
        let path_title = title.replace(' ', "_");
        let mut url = reqwest::Url::parse(&format!("{}/api/rest_v1/page/summary/", self.base_url))
            .map_err(SourceError::parse)?;
        url.path_segments_mut()
            .map_err(|_| SourceError::parse("base url cannot carry a path"))?
            .pop_if_empty()
            .push(&path_title);
        get_json(self.client.get(url)).await
    }
}

#[async_trait]
impl SourceAdapter for WikipediaAdapter {
    fn platform(&self) -> Platform {
        Platform::Wikipedia
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<Record>, SourceError> {
        let req = self
            .client
            .get(format!("{}/w/api.php", self.base_url))
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("format", "json"),
            ]);
        let search: SearchResp = get_json(req).await?;

        let mut out = Vec::new();
        for hit in search.query.search.into_iter().take(limit) {
            let summary = match self.summary(&hit.title).await {
                Ok(s) => s,
                Err(e) => {
                    tracing::debug!(target: "wikipedia", title = %hit.title, error = %e, "dropping hit without summary");
                    continue;
                }
            };
            let url = summary
                .content_urls
                .map(|c| c.desktop.page)
                .unwrap_or_else(|| {
                    format!("https://en.wikipedia.org/wiki/{}", summary.title.replace(' ', "_"))
                });
            out.push(
                Record::new(Platform::Wikipedia, summary.title, url)
                    .body(clean_body(&summary.extract, EXTRACT_CAP)),
            );
        }
        Ok(out)
    }
}
