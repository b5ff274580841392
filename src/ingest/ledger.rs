// src/ingest/ledger.rs
//! Per-source outcome ledger.
//!
//! The ledger is the only state carried from an analysis into the follow-up
//! chat, so it stays a small serializable map: `{"reddit": "success", ...}`.

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::ingest::types::Platform;

/// Every source the aggregator attempts: the five platforms plus trends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Reddit,
    Youtube,
    Twitter,
    Quora,
    Wikipedia,
    GoogleTrends,
}

impl Source {
    pub const ALL: [Source; 6] = [
        Source::Reddit,
        Source::Youtube,
        Source::Twitter,
        Source::Quora,
        Source::Wikipedia,
        Source::GoogleTrends,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Reddit => "reddit",
            Source::Youtube => "youtube",
            Source::Twitter => "twitter",
            Source::Quora => "quora",
            Source::Wikipedia => "wikipedia",
            Source::GoogleTrends => "google_trends",
        }
    }
}

impl Source {
    /// Reverse of [`Source::as_str`].
    pub fn from_key(key: &str) -> Option<Source> {
        Source::ALL.into_iter().find(|s| s.as_str() == key)
    }
}

impl From<Platform> for Source {
    fn from(p: Platform) -> Self {
        match p {
            Platform::Reddit => Source::Reddit,
            Platform::Youtube => Source::Youtube,
            Platform::Twitter => Source::Twitter,
            Platform::Quora => Source::Quora,
            Platform::Wikipedia => Source::Wikipedia,
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusLedger(BTreeMap<Source, SourceStatus>);

impl StatusLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the outcome for `source`. Returns `false` (and leaves the first
    /// value in place) if the source was already recorded.
    pub fn record(&mut self, source: Source, status: SourceStatus) -> bool {
        if self.0.contains_key(&source) {
            return false;
        }
        self.0.insert(source, status);
        true
    }

    pub fn get(&self, source: Source) -> Option<SourceStatus> {
        self.0.get(&source).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when the ledger holds at least one entry and none of them succeeded.
    pub fn all_failed(&self) -> bool {
        !self.0.is_empty() && self.0.values().all(|s| *s == SourceStatus::Failed)
    }

    pub fn failed_sources(&self) -> Vec<Source> {
        self.iter()
            .filter(|(_, s)| *s == SourceStatus::Failed)
            .map(|(src, _)| src)
            .collect()
    }

    /// Builds a ledger from caller-supplied JSON. Unknown keys are skipped
    /// and any value other than `"success"` reads as failed.
    pub fn from_loose_json(value: &serde_json::Value) -> Self {
        let mut ledger = Self::new();
        let Some(map) = value.as_object() else {
            return ledger;
        };
        for (key, status) in map {
            let Some(source) = Source::from_key(key) else {
                tracing::debug!(target: "ledger", key = %key, "ignoring unknown source key");
                continue;
            };
            let status = match status.as_str() {
                Some("success") => SourceStatus::Success,
                _ => SourceStatus::Failed,
            };
            ledger.record(source, status);
        }
        ledger
    }

    /// Entries in declaration order (reddit … wikipedia, google_trends).
    pub fn iter(&self) -> impl Iterator<Item = (Source, SourceStatus)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }
}

impl FromIterator<(Source, SourceStatus)> for StatusLedger {
    fn from_iter<I: IntoIterator<Item = (Source, SourceStatus)>>(iter: I) -> Self {
        let mut ledger = StatusLedger::new();
        for (src, status) in iter {
            ledger.record(src, status);
        }
        ledger
    }
}

/// Shared write side used while the fan-out is in flight.
/// Each key is written once; a second write for the same key is ignored.
#[derive(Debug, Default)]
pub struct LedgerRecorder {
    inner: Mutex<StatusLedger>,
}

impl LedgerRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, source: Source, status: SourceStatus) {
        let mut ledger = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if !ledger.record(source, status) {
            tracing::warn!(target: "aggregate", %source, "duplicate ledger write ignored");
        }
    }

    pub fn into_ledger(self) -> StatusLedger {
        self.inner.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_write_wins() {
        let mut l = StatusLedger::new();
        assert!(l.record(Source::Reddit, SourceStatus::Success));
        assert!(!l.record(Source::Reddit, SourceStatus::Failed));
        assert_eq!(l.get(Source::Reddit), Some(SourceStatus::Success));
        assert_eq!(l.len(), 1);
    }

    #[test]
    fn serializes_as_flat_map_in_declaration_order() {
        let l: StatusLedger = [
            (Source::GoogleTrends, SourceStatus::Success),
            (Source::Reddit, SourceStatus::Failed),
        ]
        .into_iter()
        .collect();
        let s = serde_json::to_string(&l).unwrap();
        assert_eq!(s, r#"{"reddit":"failed","google_trends":"success"}"#);

        let back: StatusLedger = serde_json::from_str(&s).unwrap();
        assert_eq!(back, l);
    }

    #[test]
    fn all_failed_needs_entries() {
        let mut l = StatusLedger::new();
        assert!(!l.all_failed());
        l.record(Source::Quora, SourceStatus::Failed);
        assert!(l.all_failed());
        l.record(Source::Wikipedia, SourceStatus::Success);
        assert!(!l.all_failed());
        assert_eq!(l.failed_sources(), vec![Source::Quora]);
    }

    #[test]
    fn recorder_ignores_second_write() {
        let r = LedgerRecorder::new();
        r.record(Source::Twitter, SourceStatus::Failed);
        r.record(Source::Twitter, SourceStatus::Success);
        let l = r.into_ledger();
        assert_eq!(l.get(Source::Twitter), Some(SourceStatus::Failed));
    }

    #[test]
    fn loose_json_skips_unknown_keys_and_odd_values() {
        let v = serde_json::json!({
            "reddit": "success",
            "twitter": "rate_limited",
            "mastodon": "success",
            "quora": null
        });
        let l = StatusLedger::from_loose_json(&v);
        assert_eq!(l.len(), 3);
        assert_eq!(l.get(Source::Reddit), Some(SourceStatus::Success));
        assert_eq!(l.get(Source::Twitter), Some(SourceStatus::Failed));
        assert_eq!(l.get(Source::Quora), Some(SourceStatus::Failed));
        assert!(StatusLedger::from_loose_json(&serde_json::json!("nope")).is_empty());
    }
}
