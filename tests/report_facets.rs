// tests/report_facets.rs
mod common;

use std::sync::Arc;

use common::{record, ScriptedEngine};
use topic_pulse::analyze::report::{Facet, FACET_FAILURE_PREFIX};
use topic_pulse::analyze::{GenerationOptions, ReportAssembler};
use topic_pulse::error::EngineError;
use topic_pulse::ingest::Platform;

#[tokio::test]
async fn failed_sentiment_facet_is_marked_inline() {
    let engine = ScriptedEngine::new(|prompt, _| {
        if prompt.starts_with("Perform detailed sentiment analysis") {
            Err(EngineError::Status {
                status: 500,
                body: "boom".into(),
            })
        } else {
            Ok("real text".to_string())
        }
    });
    let assembler = ReportAssembler::new(Arc::new(engine));
    let records = vec![record(Platform::Reddit, "post")];

    let facets = assembler.assemble("heat pumps", &records).await;

    assert_eq!(facets.len(), 5);
    for f in Facet::ALL {
        let text = &facets[&f];
        if f == Facet::SentimentAnalysis {
            assert!(text.starts_with(FACET_FAILURE_PREFIX), "got {text}");
            assert!(text.contains("500"));
        } else {
            assert_eq!(text, "real text");
        }
    }
}

#[tokio::test]
async fn every_facet_sees_the_same_capped_payload_and_report_options() {
    let engine = Arc::new(ScriptedEngine::new(|_, opts| {
        assert_eq!(*opts, GenerationOptions::REPORT);
        Ok("x".into())
    }));
    let assembler = ReportAssembler::new(engine.clone()).with_max_payload_chars(64);
    let records: Vec<_> = (0..20)
        .map(|i| record(Platform::Youtube, &format!("video-{i}")))
        .collect();

    assembler.assemble("gadgets", &records).await;

    let prompts = engine.prompts.lock();
    assert_eq!(prompts.len(), 5);
    let payloads: Vec<&str> = prompts
        .iter()
        .map(|p| p.split_once("\n\nData:\n").map(|(_, d)| d).unwrap_or_default())
        .collect();
    assert_eq!(payloads[0].chars().count(), 64);
    assert!(payloads.iter().all(|p| *p == payloads[0]));
}

#[tokio::test]
async fn all_facets_failing_still_yields_five_keys() {
    let assembler = ReportAssembler::new(Arc::new(ScriptedEngine::unavailable()));
    let facets = assembler.assemble("q", &[]).await;
    assert_eq!(facets.len(), 5);
    assert!(facets.values().all(|t| t.starts_with(FACET_FAILURE_PREFIX)));
}
