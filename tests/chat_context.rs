// tests/chat_context.rs
mod common;

use std::sync::Arc;

use common::{record, ScriptedEngine, StubAdapter, StubTrends};
use topic_pulse::analyze::chat::{status_narration, ChatTurn, Role};
use topic_pulse::analyze::{ChatContext, GenerationOptions};
use topic_pulse::error::EngineError;
use topic_pulse::ingest::{Aggregator, Platform};
use topic_pulse::AnalysisService;

fn history() -> Vec<ChatTurn> {
    vec![
        ChatTurn {
            role: Role::User,
            content: "What do people think?".into(),
        },
        ChatTurn {
            role: Role::Assistant,
            content: "Mostly positive.".into(),
        },
    ]
}

fn narration_of(prompt: &str) -> &str {
    let start = prompt.find("Platform Analysis Status:\n").unwrap() + "Platform Analysis Status:\n".len();
    let end = prompt.find("\n\nChat History:").unwrap();
    &prompt[start..end]
}

#[tokio::test]
async fn narration_depends_on_ledger_not_records() {
    // Two aggregations with different records but the same per-source outcome.
    let small = Aggregator::builder()
        .adapter(Arc::new(StubAdapter::ok(Platform::Reddit, vec![record(Platform::Reddit, "one")])))
        .trends(Arc::new(StubTrends::absent()))
        .build();
    let large = Aggregator::builder()
        .adapter(Arc::new(StubAdapter::titles(Platform::Reddit, &["a", "b", "c", "d"])))
        .trends(Arc::new(StubTrends::absent()))
        .build();
    let a = small.aggregate("topic").await.unwrap();
    let b = large.aggregate("topic").await.unwrap();
    assert_ne!(a.records, b.records);
    assert_eq!(a.status, b.status);

    let engine = Arc::new(ScriptedEngine::echo());
    let chat = ChatContext::new(engine.clone());
    chat.respond("and now?", &history(), &a.status, Some("topic")).await.unwrap();
    chat.respond("and now?", &history(), &b.status, Some("topic")).await.unwrap();

    let prompts = engine.prompts.lock();
    assert_eq!(prompts.len(), 2);
    assert_eq!(narration_of(&prompts[0]), narration_of(&prompts[1]));
    assert_eq!(narration_of(&prompts[0]), status_narration(&a.status));
    assert!(!prompts[0].contains("https://reddit.test/one"));
}

#[tokio::test]
async fn chat_uses_creative_options_and_full_history() {
    let engine = Arc::new(ScriptedEngine::new(|_, opts| {
        assert_eq!(*opts, GenerationOptions::CHAT);
        Ok("sure".into())
    }));
    let chat = ChatContext::new(engine.clone());
    let status = Default::default();

    let reply = chat.respond("next?", &history(), &status, None).await.unwrap();
    assert_eq!(reply, "sure");

    let prompts = engine.prompts.lock();
    let p = &prompts[0];
    assert!(p.contains("about 'the topic'"));
    assert!(p.contains("user: What do people think?\nassistant: Mostly positive.\n"));
    assert!(p.ends_with("\nUser: next?\nAssistant:"));
}

#[tokio::test]
async fn chat_engine_failure_propagates() {
    let service = AnalysisService::new(
        Aggregator::builder().build(),
        Arc::new(ScriptedEngine::unavailable()),
    );
    let err = service
        .chat("hello", &[], &Default::default(), Some("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Disabled));
}
