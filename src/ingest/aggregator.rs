// src/ingest/aggregator.rs
//! # Aggregator
//! Fans one query out to every content adapter plus the trend source, each
//! under its own timeout, and folds the outcomes into records + trends + ledger.
//!
//! - All calls start together; none waits on another.
//! - Each source writes exactly one ledger entry. Non-empty success is
//!   `success`; empty, error and timeout are all `failed`.
//! - Records are concatenated in platform declaration order, not completion order.
//! - If every source failed the aggregation is `AggregationExhausted`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use metrics::{counter, histogram};
use tokio::time::Instant;

use crate::analyze::refine::QueryRefiner;
use crate::config::sources::{SourceLimits, SourcesConfig};
use crate::error::{AggregationExhausted, SourceError};
use crate::ingest::ensure_metrics_described;
use crate::ingest::ledger::{LedgerRecorder, Source, SourceStatus, StatusLedger};
use crate::ingest::types::{
    DisabledAdapter, DisabledTrends, Platform, Record, SourceAdapter, TrendAdapter, TrendSeries,
};

/// Output of one successful aggregation pass.
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub records: Vec<Record>,
    pub trends: Option<TrendSeries>,
    pub status: StatusLedger,
}

impl Aggregation {
    pub fn source_count(&self) -> usize {
        self.records.len()
    }
}

pub struct Aggregator {
    /// Exactly one adapter per platform, in `Platform::ALL` order.
    adapters: Vec<Arc<dyn SourceAdapter>>,
    trends: Arc<dyn TrendAdapter>,
    refiner: Option<QueryRefiner>,
    limits: SourceLimits,
    timeout: Duration,
    timeframe: String,
}

impl Aggregator {
    pub fn builder() -> AggregatorBuilder {
        AggregatorBuilder::default()
    }

    pub async fn aggregate(&self, query: &str) -> Result<Aggregation, AggregationExhausted> {
        ensure_metrics_described();
        let started = Instant::now();
        let ledger = LedgerRecorder::new();

        let content = join_all(
            self.adapters
                .iter()
                .map(|a| self.run_adapter(a.as_ref(), query, &ledger)),
        );
        let trends = self.run_trends(query, &ledger);
        let (batches, trends) = tokio::join!(content, trends);

        let status = ledger.into_ledger();
        let records: Vec<Record> = batches.into_iter().flatten().collect();

        if status.all_failed() {
            counter!("aggregate_exhausted_total").increment(1);
            tracing::warn!(
                target: "aggregate",
                %query,
                failed = ?status.failed_sources(),
                "no source produced data"
            );
            return Err(AggregationExhausted { status });
        }

        tracing::info!(
            target: "aggregate",
            %query,
            records = records.len(),
            trends = trends.is_some(),
            failed = ?status.failed_sources(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "aggregation done"
        );

        Ok(Aggregation {
            records,
            trends,
            status,
        })
    }

    async fn run_adapter(
        &self,
        adapter: &dyn SourceAdapter,
        query: &str,
        ledger: &LedgerRecorder,
    ) -> Vec<Record> {
        let platform = adapter.platform();
        let limit = self.limits.for_platform(platform);
        let t0 = Instant::now();

        let call = async {
            let q = match &self.refiner {
                Some(r) if adapter.prefers_refined_query() => r.refine(query).await,
                _ => query.to_string(),
            };
            adapter.fetch(&q, limit).await
        };

        let outcome = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(mut records)) => {
                records.truncate(limit);
                if records.is_empty() {
                    Err(SourceError::Empty)
                } else {
                    Ok(records)
                }
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(SourceError::Timeout(self.timeout)),
        };

        let elapsed_ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("aggregate_source_ms", "source" => platform.as_str()).record(elapsed_ms);

        match outcome {
            Ok(records) => {
                ledger.record(platform.into(), SourceStatus::Success);
                counter!("aggregate_source_total", "source" => platform.as_str(), "outcome" => "ok")
                    .increment(1);
                tracing::debug!(target: "aggregate", source = %platform, records = records.len(), elapsed_ms, "source ok");
                records
            }
            Err(e) => {
                ledger.record(platform.into(), SourceStatus::Failed);
                counter!("aggregate_source_total", "source" => platform.as_str(), "outcome" => e.kind())
                    .increment(1);
                tracing::warn!(target: "aggregate", source = %platform, outcome = e.kind(), error = %e, elapsed_ms, "source failed");
                Vec::new()
            }
        }
    }

    async fn run_trends(&self, query: &str, ledger: &LedgerRecorder) -> Option<TrendSeries> {
        let source = Source::GoogleTrends;
        let t0 = Instant::now();

        let outcome = match tokio::time::timeout(
            self.timeout,
            self.trends.fetch(query, &self.timeframe),
        )
        .await
        {
            Ok(Ok(Some(series))) if !series.points.is_empty() => Ok(series),
            Ok(Ok(_)) => Err(SourceError::Empty),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(SourceError::Timeout(self.timeout)),
        };

        let elapsed_ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("aggregate_source_ms", "source" => source.as_str()).record(elapsed_ms);

        match outcome {
            Ok(series) => {
                ledger.record(source, SourceStatus::Success);
                counter!("aggregate_source_total", "source" => source.as_str(), "outcome" => "ok")
                    .increment(1);
                Some(series)
            }
            Err(e) => {
                ledger.record(source, SourceStatus::Failed);
                counter!("aggregate_source_total", "source" => source.as_str(), "outcome" => e.kind())
                    .increment(1);
                tracing::warn!(target: "aggregate", %source, outcome = e.kind(), error = %e, elapsed_ms, "trends failed");
                None
            }
        }
    }
}

/// Collects adapters; any platform left unset gets a `DisabledAdapter`.
pub struct AggregatorBuilder {
    adapters: BTreeMap<Platform, Arc<dyn SourceAdapter>>,
    trends: Option<Arc<dyn TrendAdapter>>,
    refiner: Option<QueryRefiner>,
    limits: SourceLimits,
    timeout: Duration,
    timeframe: String,
}

impl Default for AggregatorBuilder {
    fn default() -> Self {
        let cfg = SourcesConfig::default();
        Self {
            adapters: BTreeMap::new(),
            trends: None,
            refiner: None,
            limits: cfg.limits.clone(),
            timeout: cfg.timeout(),
            timeframe: cfg.trends_timeframe,
        }
    }
}

impl AggregatorBuilder {
    pub fn config(mut self, cfg: &SourcesConfig) -> Self {
        self.limits = cfg.limits.clone();
        self.timeout = cfg.timeout();
        self.timeframe = cfg.trends_timeframe.clone();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn limits(mut self, limits: SourceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Register an adapter under its own platform. A second adapter for the
    /// same platform replaces the first.
    pub fn adapter(mut self, adapter: Arc<dyn SourceAdapter>) -> Self {
        let p = adapter.platform();
        if self.adapters.insert(p, adapter).is_some() {
            tracing::warn!(target: "aggregate", platform = %p, "adapter replaced");
        }
        self
    }

    pub fn trends(mut self, trends: Arc<dyn TrendAdapter>) -> Self {
        self.trends = Some(trends);
        self
    }

    pub fn refiner(mut self, refiner: Option<QueryRefiner>) -> Self {
        self.refiner = refiner;
        self
    }

    pub fn build(mut self) -> Aggregator {
        let adapters = Platform::ALL
            .into_iter()
            .map(|p| {
                self.adapters
                    .remove(&p)
                    .unwrap_or_else(|| Arc::new(DisabledAdapter(p)) as Arc<dyn SourceAdapter>)
            })
            .collect();
        Aggregator {
            adapters,
            trends: self.trends.unwrap_or_else(|| Arc::new(DisabledTrends)),
            refiner: self.refiner,
            limits: self.limits,
            timeout: self.timeout,
            timeframe: self.timeframe,
        }
    }
}
