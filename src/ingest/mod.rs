// src/ingest/mod.rs
pub mod aggregator;
pub mod ledger;
pub mod providers;
pub mod types;

pub use aggregator::{Aggregation, Aggregator, AggregatorBuilder};
pub use ledger::{Source, SourceStatus, StatusLedger};
pub use types::{Platform, Record, SourceAdapter, TrendAdapter, TrendSeries};

use metrics::{describe_counter, describe_histogram};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "aggregate_source_total",
            "Source fetch outcomes by source and outcome (ok/empty/error kind)."
        );
        describe_histogram!(
            "aggregate_source_ms",
            "Per-source fetch time in milliseconds."
        );
        describe_counter!(
            "aggregate_exhausted_total",
            "Aggregations where every source failed."
        );
        describe_counter!(
            "report_facet_failures_total",
            "Report facets replaced by the failure marker."
        );
        describe_counter!("engine_calls_total", "Analysis engine calls by result.");
        describe_counter!(
            "refine_fallback_total",
            "Query refinements that fell back to the raw query."
        );
    });
}

/// Normalize upstream text: decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out.trim().to_string()
}

/// Cap `s` at `max_chars` characters, appending "..." when something was cut.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", s[..idx].trim_end()),
        None => s.to_string(),
    }
}

/// `normalize_text` then `truncate_chars`; `None` when nothing is left.
pub fn clean_body(s: &str, max_chars: usize) -> Option<String> {
    let t = normalize_text(s);
    if t.is_empty() {
        None
    } else {
        Some(truncate_chars(&t, max_chars))
    }
}
