// src/analyze/mod.rs
//! Synthesis side: engine port, query refinement, report facets, chat.

pub mod chat;
pub mod engine;
pub mod refine;
pub mod report;

pub use crate::analyze::chat::{ChatContext, ChatTurn, Role};
pub use crate::analyze::engine::{AnalysisEngine, DynEngine, GenerationOptions};
pub use crate::analyze::refine::QueryRefiner;
pub use crate::analyze::report::{AnalysisReport, Facet, ReportAssembler};
