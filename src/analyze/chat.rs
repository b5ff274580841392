// src/analyze/chat.rs
//! Stateless follow-up conversation grounded in the per-source status ledger.
//! The caller sends the whole history each time; no records are consulted.

use serde::{Deserialize, Serialize};

use crate::analyze::engine::{DynEngine, GenerationOptions};
use crate::error::EngineError;
use crate::ingest::ledger::{SourceStatus, StatusLedger};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    fn label(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

/// One line per ledger entry, in ledger order.
pub fn status_narration(status: &StatusLedger) -> String {
    status
        .iter()
        .map(|(source, st)| match st {
            SourceStatus::Success => format!("{source} data was successfully analyzed"),
            SourceStatus::Failed => format!("{source} data was not available"),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_prompt(
    query: &str,
    history: &[ChatTurn],
    status: &StatusLedger,
    topic: Option<&str>,
) -> String {
    let topic = topic.map(str::trim).filter(|t| !t.is_empty()).unwrap_or("the topic");

    let mut prompt = format!(
        "You are a social media analysis assistant helping a user understand data about '{topic}'.\n\n\
         Platform Analysis Status:\n{}\n\nChat History:\n",
        status_narration(status)
    );
    for turn in history {
        prompt.push_str(turn.role.label());
        prompt.push_str(": ");
        prompt.push_str(&turn.content);
        prompt.push('\n');
    }
    prompt.push_str("\nUser: ");
    prompt.push_str(query);
    prompt.push_str("\nAssistant:");
    prompt
}

#[derive(Clone)]
pub struct ChatContext {
    engine: DynEngine,
}

impl ChatContext {
    pub fn new(engine: DynEngine) -> Self {
        Self { engine }
    }

    /// No fallback text: an engine failure is returned to the caller.
    pub async fn respond(
        &self,
        query: &str,
        history: &[ChatTurn],
        status: &StatusLedger,
        topic: Option<&str>,
    ) -> Result<String, EngineError> {
        let prompt = build_prompt(query, history, status, topic);
        tracing::debug!(target: "chat", turns = history.len(), prompt_chars = prompt.len(), "chat prompt built");
        self.engine.generate(&prompt, &GenerationOptions::CHAT).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::ledger::Source;

    fn ledger() -> StatusLedger {
        [
            (Source::Reddit, SourceStatus::Success),
            (Source::Twitter, SourceStatus::Failed),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn narration_lists_each_source() {
        assert_eq!(
            status_narration(&ledger()),
            "reddit data was successfully analyzed\ntwitter data was not available"
        );
    }

    #[test]
    fn prompt_keeps_turn_order_and_ends_with_query() {
        let history = vec![
            ChatTurn {
                role: Role::User,
                content: "first".into(),
            },
            ChatTurn {
                role: Role::Assistant,
                content: "second".into(),
            },
        ];
        let p = build_prompt("third?", &history, &ledger(), Some("EVs"));
        assert!(p.contains("about 'EVs'"));
        let i1 = p.find("user: first").unwrap();
        let i2 = p.find("assistant: second").unwrap();
        assert!(i1 < i2);
        assert!(p.ends_with("User: third?\nAssistant:"));
    }

    #[test]
    fn blank_topic_falls_back() {
        let p = build_prompt("q", &[], &StatusLedger::new(), Some("  "));
        assert!(p.contains("about 'the topic'"));
    }
}
