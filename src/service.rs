// src/service.rs
//! Request-level orchestration: aggregation followed by report assembly, and
//! the stateless follow-up chat. Nothing here outlives a single call.

use chrono::Utc;

use crate::analyze::chat::{ChatContext, ChatTurn};
use crate::analyze::report::{AnalysisReport, ReportAssembler};
use crate::analyze::DynEngine;
use crate::error::{AggregationExhausted, EngineError};
use crate::ingest::aggregator::Aggregator;
use crate::ingest::ledger::StatusLedger;

pub struct AnalysisService {
    aggregator: Aggregator,
    assembler: ReportAssembler,
    chat: ChatContext,
}

impl AnalysisService {
    pub fn new(aggregator: Aggregator, engine: DynEngine) -> Self {
        Self {
            aggregator,
            assembler: ReportAssembler::new(engine.clone()),
            chat: ChatContext::new(engine),
        }
    }

    /// Full analysis pass. Fails only when every source failed; facet
    /// failures are rendered inline by the assembler.
    pub async fn analyze(&self, query: &str) -> Result<AnalysisReport, AggregationExhausted> {
        let agg = self.aggregator.aggregate(query).await?;
        let facets = self.assembler.assemble(query, &agg.records).await;

        Ok(AnalysisReport {
            query: query.to_string(),
            source_count: agg.source_count(),
            status: agg.status,
            facets,
            trends: agg.trends,
            timestamp: Utc::now(),
        })
    }

    pub async fn chat(
        &self,
        query: &str,
        history: &[ChatTurn],
        status: &StatusLedger,
        topic: Option<&str>,
    ) -> Result<String, EngineError> {
        self.chat.respond(query, history, status, topic).await
    }
}
