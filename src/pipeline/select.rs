use serde_json::Value;

use crate::{
    audit::{AuditEventKind, AuditLogger, AuditRecord},
    oracle::{Message, Oracle},
    pipeline::{PlanError, bundle::ensure_bundles, extract::extract_json, normalize::normalize,
               score::score},
    types::GenMode,
};

/// Generate N candidates (one in deterministic mode, three in adaptive),
/// keep the highest-scoring survivor. A candidate that fails at the oracle,
/// extraction, parse or normalize step is dropped silently, without retry.
/// Zero survivors is a hard failure; no
/// partial or default plan is ever synthesized. Ties go to the earliest
/// candidate.
pub async fn select<O: Oracle>(
    oracle: &O,
    messages: &[Message],
    notes: &str,
    mode: GenMode,
    audit: &AuditLogger,
) -> Result<Value, PlanError> {
    let mut best: Option<(f64, Value)> = None;

    for i in 0..mode.candidate_count() {
        let raw = match oracle.complete(messages, mode).await {
            Ok(text) => text,
            Err(e) => {
                drop_candidate(audit, mode, i, &format!("oracle failure: {e}"));
                continue;
            }
        };

        let Some(json_text) = extract_json(&raw) else {
            drop_candidate(audit, mode, i, "no JSON object in output");
            continue;
        };
        // Extraction validated parseability; a failure here means the text
        // changed underneath us, which cannot happen.
        let value: Value = match serde_json::from_str(&json_text) {
            Ok(v) => v,
            Err(_) => {
                drop_candidate(audit, mode, i, "extracted span failed to re-parse");
                continue;
            }
        };
        let Some(mut candidate) = normalize(value) else {
            drop_candidate(audit, mode, i, "top-level JSON is not an object");
            continue;
        };
        ensure_bundles(notes, &mut candidate);

        let candidate_score = score(&candidate);
        audit.record(AuditRecord {
            event: AuditEventKind::CandidateGenerated,
            mode: Some(mode),
            candidate: Some(i),
            score: Some(candidate_score),
            summary: None,
        });

        // Strict greater-than keeps the earliest candidate on ties.
        if best.as_ref().is_none_or(|(s, _)| candidate_score > *s) {
            best = Some((candidate_score, candidate));
        }
    }

    match best {
        Some((winning_score, plan)) => {
            audit.record(AuditRecord {
                event: AuditEventKind::PlanSelected,
                mode: Some(mode),
                candidate: None,
                score: Some(winning_score),
                summary: None,
            });
            Ok(plan)
        }
        None => {
            audit.record(AuditRecord {
                event: AuditEventKind::Error,
                mode: Some(mode),
                candidate: None,
                score: None,
                summary: Some("all candidates failed extraction"),
            });
            Err(PlanError::NoCandidates)
        }
    }
}

fn drop_candidate(audit: &AuditLogger, mode: GenMode, index: usize, reason: &str) {
    audit.record(AuditRecord {
        event: AuditEventKind::CandidateDropped,
        mode: Some(mode),
        candidate: Some(index),
        score: None,
        summary: Some(reason),
    });
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::{Result, anyhow};
    use serde_json::json;

    use super::select;
    use crate::{
        audit::AuditLogger,
        oracle::{Message, Oracle},
        pipeline::PlanError,
        types::GenMode,
    };

    /// Replays a scripted sequence of oracle outputs.
    struct FakeOracle {
        replies: Vec<Result<String>>,
        calls: AtomicUsize,
    }

    impl FakeOracle {
        fn new(replies: Vec<Result<String>>) -> Self {
            Self {
                replies,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Oracle for FakeOracle {
        async fn complete(&self, _messages: &[Message], _mode: GenMode) -> Result<String> {
            let i = self.calls.fetch_add(1, Ordering::SeqCst);
            match self.replies.get(i) {
                Some(Ok(s)) => Ok(s.clone()),
                Some(Err(e)) => Err(anyhow!("{e}")),
                None => Err(anyhow!("fake oracle exhausted")),
            }
        }
    }

    fn test_audit() -> AuditLogger {
        AuditLogger::new(&std::env::temp_dir())
    }

    fn plan_with_citations(n: usize) -> String {
        let refs: Vec<String> = (0..n).map(|i| format!("sphere:x#{i}")).collect();
        json!({"tasks": [{"title": "water point", "evidence_refs": refs}]}).to_string()
    }

    #[tokio::test]
    async fn deterministic_mode_makes_exactly_one_call() {
        let oracle = FakeOracle::new(vec![Ok(plan_with_citations(1))]);
        let out = select(&oracle, &[], "calm", GenMode::Deterministic, &test_audit())
            .await
            .expect("one good candidate");
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 1);
        assert_eq!(out["tasks"][0]["title"], "water point");
    }

    #[tokio::test]
    async fn adaptive_mode_keeps_highest_scoring_candidate() {
        let oracle = FakeOracle::new(vec![
            Ok(plan_with_citations(1)),
            Ok(plan_with_citations(4)),
            Ok(plan_with_citations(2)),
        ]);
        let out = select(&oracle, &[], "calm", GenMode::Adaptive, &test_audit())
            .await
            .expect("candidates survived");
        assert_eq!(
            out["tasks"][0]["evidence_refs"].as_array().unwrap().len(),
            4
        );
    }

    #[tokio::test]
    async fn unparsable_candidates_are_dropped_not_fatal() {
        let oracle = FakeOracle::new(vec![
            Ok("I cannot produce JSON today".to_string()),
            Err(anyhow!("connection reset")),
            Ok(plan_with_citations(1)),
        ]);
        let out = select(&oracle, &[], "calm", GenMode::Adaptive, &test_audit()).await;
        assert!(out.is_ok());
    }

    #[tokio::test]
    async fn zero_survivors_is_a_hard_failure() {
        let oracle = FakeOracle::new(vec![
            Ok("no json here".to_string()),
            Ok("[1,2,3]".to_string()),
            Err(anyhow!("timeout")),
        ]);
        let err = select(&oracle, &[], "calm", GenMode::Adaptive, &test_audit())
            .await
            .expect_err("must fail hard");
        assert!(matches!(err, PlanError::NoCandidates));
    }

    #[tokio::test]
    async fn ties_keep_the_earliest_candidate() {
        let first = json!({"tasks": [{"id": "first", "title": "water"}]}).to_string();
        let second = json!({"tasks": [{"id": "second", "title": "water"}]}).to_string();
        let oracle = FakeOracle::new(vec![Ok(first), Ok(second.clone()), Ok(second)]);
        let out = select(&oracle, &[], "calm", GenMode::Adaptive, &test_audit())
            .await
            .expect("candidates survived");
        assert_eq!(out["tasks"][0]["id"], "first");
    }

    #[tokio::test]
    async fn scenario_bundles_are_applied_to_candidates() {
        let oracle = FakeOracle::new(vec![Ok(json!({"tasks": []}).to_string())]);
        let out = select(
            &oracle,
            &[],
            "hot weather, fans only",
            GenMode::Deterministic,
            &test_audit(),
        )
        .await
        .expect("candidate survived");
        assert_eq!(out["tasks"][0]["id"], "B-HEAT");
    }
}
