// src/analyze/report.rs
//! Report synthesis: one engine call per facet over the same record corpus.
//!
//! Facets are independent. A failed facet becomes an inline
//! "Analysis unavailable" marker; the report always carries all five keys.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use metrics::counter;
use serde::{Deserialize, Serialize};

use crate::analyze::engine::{DynEngine, GenerationOptions};
use crate::error::FacetError;
use crate::ingest::ledger::StatusLedger;
use crate::ingest::types::{Record, TrendSeries};

/// Upper bound on serialized corpus characters sent with each facet prompt.
pub const MAX_PAYLOAD_CHARS: usize = 10_000;

pub const FACET_FAILURE_PREFIX: &str = "Analysis unavailable";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
    DetailedExplanation,
    MarketAnalysis,
    PublicOpinion,
    SentimentAnalysis,
    TrendAnalysis,
}

impl Facet {
    pub const ALL: [Facet; 5] = [
        Facet::DetailedExplanation,
        Facet::MarketAnalysis,
        Facet::PublicOpinion,
        Facet::SentimentAnalysis,
        Facet::TrendAnalysis,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Facet::DetailedExplanation => "detailed_explanation",
            Facet::MarketAnalysis => "market_analysis",
            Facet::PublicOpinion => "public_opinion",
            Facet::SentimentAnalysis => "sentiment_analysis",
            Facet::TrendAnalysis => "trend_analysis",
        }
    }

    pub fn instruction(&self, query: &str) -> String {
        match self {
            Facet::DetailedExplanation => format!(
                "Provide a comprehensive 400-word explanation of '{query}' based on these posts. \
                 Include recent trends and developments."
            ),
            Facet::MarketAnalysis => format!(
                "Analyze commercial potential and market opportunities for '{query}'. \
                 Include data from the last 6 months where available."
            ),
            Facet::PublicOpinion => format!(
                "Summarize public sentiment and key opinions about '{query}'. \
                 Identify major concerns and positive aspects mentioned."
            ),
            Facet::SentimentAnalysis => format!(
                "Perform detailed sentiment analysis on content about '{query}'. \
                 Provide percentages for positive, neutral, and negative sentiment. \
                 Include a breakdown by platform if possible."
            ),
            Facet::TrendAnalysis => format!(
                "Identify emerging trends related to '{query}' based on the data. \
                 Highlight any patterns or changes over time."
            ),
        }
    }
}

impl std::fmt::Display for Facet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final response of one analysis. Wire names follow the public API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub query: String,
    #[serde(rename = "platform_status")]
    pub status: StatusLedger,
    #[serde(rename = "analysis")]
    pub facets: BTreeMap<Facet, String>,
    #[serde(rename = "google_trends")]
    pub trends: Option<TrendSeries>,
    pub source_count: usize,
    pub timestamp: DateTime<Utc>,
}

/// Serialize the corpus once and cap it at `max_chars` (on a char boundary).
pub fn corpus_payload(records: &[Record], max_chars: usize) -> String {
    let full = serde_json::to_string_pretty(records).unwrap_or_else(|_| "[]".to_string());
    match full.char_indices().nth(max_chars) {
        Some((idx, _)) => full[..idx].to_string(),
        None => full,
    }
}

pub fn failure_marker(err: &FacetError) -> String {
    format!("{FACET_FAILURE_PREFIX}: {}", err.source)
}

#[derive(Clone)]
pub struct ReportAssembler {
    engine: DynEngine,
    max_payload_chars: usize,
}

impl ReportAssembler {
    pub fn new(engine: DynEngine) -> Self {
        Self {
            engine,
            max_payload_chars: MAX_PAYLOAD_CHARS,
        }
    }

    pub fn with_max_payload_chars(mut self, n: usize) -> Self {
        self.max_payload_chars = n;
        self
    }

    /// Run all facets concurrently over the same (immutable) payload.
    pub async fn assemble(&self, query: &str, records: &[Record]) -> BTreeMap<Facet, String> {
        let payload = corpus_payload(records, self.max_payload_chars);
        let payload = payload.as_str();

        let calls = Facet::ALL.into_iter().map(|facet| async move {
            let text = match self.facet(facet, query, payload).await {
                Ok(text) => text,
                Err(err) => {
                    tracing::warn!(target: "report", facet = facet.as_str(), error = %err, "facet failed");
                    counter!("report_facet_failures_total", "facet" => facet.as_str()).increment(1);
                    failure_marker(&err)
                }
            };
            (facet, text)
        });

        join_all(calls).await.into_iter().collect()
    }

    async fn facet(&self, facet: Facet, query: &str, payload: &str) -> Result<String, FacetError> {
        let prompt = format!("{}\n\nData:\n{}", facet.instruction(query), payload);
        self.engine
            .generate(&prompt, &GenerationOptions::REPORT)
            .await
            .map_err(|source| FacetError { facet, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::Platform;

    #[test]
    fn payload_is_capped_on_char_boundary() {
        let recs = vec![Record::new(Platform::Reddit, "žluťoučký kůň".repeat(50), "https://r")];
        let p = corpus_payload(&recs, 100);
        assert_eq!(p.chars().count(), 100);
        let whole = corpus_payload(&recs, usize::MAX);
        assert!(whole.starts_with(&p));
    }

    #[test]
    fn facet_keys_match_wire_names() {
        for f in Facet::ALL {
            let v = serde_json::to_value(f).unwrap();
            assert_eq!(v, serde_json::Value::String(f.as_str().to_string()));
        }
    }

    #[test]
    fn instructions_mention_query() {
        for f in Facet::ALL {
            assert!(f.instruction("solar panels").contains("'solar panels'"));
        }
    }
}
