// src/config/mod.rs
pub mod ai;
pub mod server;
pub mod sources;

pub use ai::AiConfig;
pub use server::ServerConfig;
pub use sources::{SourceLimits, SourcesConfig};
