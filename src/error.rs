//! Typed failures for the aggregation and synthesis paths.
//!
//! Each error is caught at exactly one boundary:
//! - `SourceError` at the aggregator (becomes a `failed` ledger entry),
//! - `FacetError` at the report assembler (becomes an inline marker),
//! - `AggregationExhausted` and chat-side `EngineError` reach the HTTP layer.

use std::time::Duration;

use thiserror::Error;

use crate::analyze::report::Facet;
use crate::ingest::ledger::StatusLedger;

/// One adapter's fetch failed. Never propagated past the aggregator.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{0} adapter is disabled (missing credentials)")]
    Disabled(&'static str),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("upstream returned status {0}")]
    Status(u16),
    #[error("could not parse upstream response: {0}")]
    Parse(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("upstream returned no usable items")]
    Empty,
}

impl SourceError {
    pub fn parse(msg: impl std::fmt::Display) -> Self {
        Self::Parse(msg.to_string())
    }

    /// Short label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Disabled(_) => "disabled",
            Self::Http(_) => "http",
            Self::Status(_) => "status",
            Self::Parse(_) => "parse",
            Self::Timeout(_) => "timeout",
            Self::Empty => "empty",
        }
    }
}

/// Text-generation call failed.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("analysis engine is disabled")]
    Disabled,
    #[error("engine request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("engine returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("engine returned an empty response")]
    EmptyResponse,
    #[error("daily engine limit of {0} calls reached")]
    DailyLimit(u32),
}

impl EngineError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Http(_) => "http",
            Self::Status { .. } => "status",
            Self::EmptyResponse => "empty",
            Self::DailyLimit(_) => "daily_limit",
        }
    }
}

/// Every configured source (content platforms and trends) ended in `failed`.
#[derive(Debug, Error)]
#[error("no data could be collected from any platform")]
pub struct AggregationExhausted {
    pub status: StatusLedger,
}

/// A single report facet could not be generated; rendered inline, never propagated.
#[derive(Debug, Error)]
#[error("{facet} failed: {source}")]
pub struct FacetError {
    pub facet: Facet,
    #[source]
    pub source: EngineError,
}

/// User directory failures (the credential file sits beside the core).
#[derive(Debug, Error)]
pub enum UserStoreError {
    #[error("user store io: {0}")]
    Io(#[from] std::io::Error),
    #[error("user store csv: {0}")]
    Csv(#[from] csv::Error),
}
