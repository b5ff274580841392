// src/ingest/providers/quora.rs
use async_trait::async_trait;
use scraper::{Html, Selector};

use crate::error::SourceError;
use crate::ingest::normalize_text;
use crate::ingest::providers::{check_status, http_client, trim_base, BROWSER_UA};
use crate::ingest::types::{Platform, Record, SourceAdapter};

const DEFAULT_BASE: &str = "https://www.quora.com";

/// Keyword search page + markup extraction of question titles/links.
pub struct QuoraAdapter {
    base_url: String,
    client: reqwest::Client,
}

impl QuoraAdapter {
    pub fn new() -> Result<Self, SourceError> {
        Self::with_base_url(DEFAULT_BASE)
    }

    pub fn with_base_url(base: &str) -> Result<Self, SourceError> {
        Ok(Self {
            base_url: trim_base(base),
            client: http_client(BROWSER_UA)?,
        })
    }
}

/// Pull question records out of a search results page.
/// Result boxes without a title or a link are skipped.
pub fn parse_search_page(html: &str, limit: usize) -> Result<Vec<Record>, SourceError> {
    let item_sel = Selector::parse(".q-box.qu-borderBottom").map_err(SourceError::parse)?;
    let title_sel = Selector::parse(".q-text.qu-dynamicFontSize--large").map_err(SourceError::parse)?;
    let link_sel = Selector::parse("a[href]").map_err(SourceError::parse)?;

    let doc = Html::parse_document(html);
    let mut out = Vec::new();
    for item in doc.select(&item_sel).take(limit) {
        let Some(title_el) = item.select(&title_sel).next() else {
            continue;
        };
        let title = normalize_text(&title_el.text().collect::<String>());
        if title.is_empty() {
            continue;
        }
        let Some(href) = item
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
        else {
            continue;
        };
        out.push(Record::new(Platform::Quora, title, absolute_url(href)));
    }
    Ok(out)
}

fn absolute_url(href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else {
        format!("{DEFAULT_BASE}/{}", href.trim_start_matches('/'))
    }
}

#[async_trait]
impl SourceAdapter for QuoraAdapter {
    fn platform(&self) -> Platform {
        Platform::Quora
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<Record>, SourceError> {
        let resp = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", query)])
            .send()
            .await?;
        let html = check_status(resp)?.text().await?;
        parse_search_page(&html, limit)
    }
}
