// src/analyze/refine.rs
//! Keyword condensation for upstreams that search better with terse terms.
//! Fail-open: any engine problem returns the query untouched.

use metrics::counter;

use crate::analyze::engine::{DynEngine, GenerationOptions};

#[derive(Clone)]
pub struct QueryRefiner {
    engine: DynEngine,
}

impl QueryRefiner {
    pub fn new(engine: DynEngine) -> Self {
        Self { engine }
    }

    pub async fn refine(&self, query: &str) -> String {
        let prompt = format!(
            "Extract key keywords from: '{query}'. Return only 2-3 space-separated keywords."
        );
        match self.engine.generate(&prompt, &GenerationOptions::REFINE).await {
            Ok(raw) => match clean_keywords(&raw) {
                Some(k) => {
                    tracing::debug!(target: "refine", %query, refined = %k, "query refined");
                    k
                }
                None => {
                    counter!("refine_fallback_total").increment(1);
                    query.to_string()
                }
            },
            Err(e) => {
                tracing::warn!(target: "refine", %query, error = %e, "refinement failed; using raw query");
                counter!("refine_fallback_total").increment(1);
                query.to_string()
            }
        }
    }
}

/// First non-empty line, surrounding quotes stripped, whitespace collapsed.
fn clean_keywords(raw: &str) -> Option<String> {
    let line = raw.lines().map(str::trim).find(|l| !l.is_empty())?;
    let line = line.trim_matches(|c| c == '"' || c == '\'' || c == '`');
    let out = line.split_whitespace().collect::<Vec<_>>().join(" ");
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleans_quotes_and_blank_lines() {
        assert_eq!(
            clean_keywords("\n  \"quantum   computing\"  \n extra"),
            Some("quantum computing".to_string())
        );
        assert_eq!(clean_keywords(" \n\"\" "), None);
    }
}
