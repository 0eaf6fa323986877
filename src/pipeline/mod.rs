pub mod bundle;
pub mod classify;
pub mod extract;
pub mod lint;
pub mod normalize;
pub mod policy;
pub mod prompt;
pub mod retrieve;
pub mod score;
pub mod select;

use serde_json::Value;

use crate::{
    audit::{AuditEventKind, AuditLogger, AuditRecord},
    oracle::Oracle,
    pipeline::retrieve::{Retriever, domain_preference},
    types::{ActionPlan, Briefing, GenMode},
};

/// Request-level failure taxonomy. Client variants reject bad input up
/// front; everything else is a server-side failure of the pipeline itself.
#[derive(Debug)]
pub enum PlanError {
    /// `logs` was empty or whitespace-only.
    EmptyNotes,
    /// The briefing request carried no plan object.
    MissingPlan,
    /// Every generated candidate failed extraction or normalization.
    NoCandidates,
    /// The oracle failed on a path with no candidate-level recovery.
    Oracle(String),
    /// The selected, enforced candidate still failed the final schema gate.
    Schema(serde_json::Error),
}

impl std::fmt::Display for PlanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyNotes => write!(f, "missing 'logs': field notes must be non-empty"),
            Self::MissingPlan => write!(f, "missing 'plan': briefing needs a plan object"),
            Self::NoCandidates => write!(f, "no candidate produced parseable JSON"),
            Self::Oracle(e) => write!(f, "generation backend failed: {e}"),
            Self::Schema(e) => write!(f, "schema validation failed: {e}"),
        }
    }
}

impl std::error::Error for PlanError {}

impl PlanError {
    /// Client errors are the caller's to fix; the rest are ours.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::EmptyNotes | Self::MissingPlan)
    }
}

/// Turn free-text field notes into an enforced, linted ActionPlan, returned
/// as a JSON object with two advisory fields: `_matched_risks` (the scenario
/// tag) always, `_warnings` only when the safety linter fired.
pub async fn generate_plan<O: Oracle>(
    oracle: &O,
    retriever: &Retriever,
    notes: &str,
    mode: GenMode,
    top_k: usize,
    audit: &AuditLogger,
) -> Result<Value, PlanError> {
    if notes.trim().is_empty() {
        return Err(PlanError::EmptyNotes);
    }

    audit.record(AuditRecord {
        event: AuditEventKind::PlanRequested,
        mode: Some(mode),
        candidate: None,
        score: None,
        summary: Some(notes),
    });

    let tag = classify::classify(notes);
    let hits = retriever.topk(notes, top_k, domain_preference(tag));
    let blurbs = Retriever::blurbs(&hits);
    let cite_ids = Retriever::cite_ids(&hits);
    let messages = prompt::plan_messages(notes, &blurbs, &cite_ids);

    let mut selected = select::select(oracle, &messages, notes, mode, audit).await?;
    policy::enforce(&mut selected);

    // Final conforms-or-rejects gate. Unreachable in practice given total
    // normalization + enforcement, but never silently skipped. Round-tripping
    // through the typed plan also drops any stray extra fields.
    let plan: ActionPlan = serde_json::from_value(selected).map_err(PlanError::Schema)?;
    let mut out = serde_json::to_value(&plan).map_err(PlanError::Schema)?;

    let warnings = lint::lint(&out.to_string());
    if let Some(map) = out.as_object_mut() {
        if !warnings.is_empty() {
            audit.record(AuditRecord {
                event: AuditEventKind::LintWarning,
                mode: Some(mode),
                candidate: None,
                score: None,
                summary: Some(&warnings[0]),
            });
            map.insert("_warnings".to_string(), serde_json::json!(warnings));
        }
        map.insert(
            "_matched_risks".to_string(),
            Value::String(tag.as_str().to_string()),
        );
    }

    Ok(out)
}

/// Narrative ICS-201-style briefing for an already-built plan: one
/// deterministic oracle call, no retrieval, no scoring, no retries.
pub async fn generate_briefing<O: Oracle>(
    oracle: &O,
    plan: &Value,
    audit: &AuditLogger,
) -> Result<Briefing, PlanError> {
    if plan.is_null() || plan.as_object().is_none_or(|o| o.is_empty()) {
        return Err(PlanError::MissingPlan);
    }

    audit.record(AuditRecord {
        event: AuditEventKind::BriefingRequested,
        mode: Some(GenMode::Deterministic),
        candidate: None,
        score: None,
        summary: None,
    });

    let messages = prompt::briefing_messages(&plan.to_string());
    let text = oracle
        .complete(&messages, GenMode::Deterministic)
        .await
        .map_err(|e| PlanError::Oracle(e.to_string()))?;

    Ok(Briefing {
        briefing_text: text.trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use serde_json::json;

    use super::{PlanError, generate_briefing, generate_plan};
    use crate::{
        audit::AuditLogger,
        corpus::fallback_chunks,
        oracle::{Message, Oracle},
        pipeline::retrieve::Retriever,
        types::GenMode,
    };

    /// Always returns the same canned reply.
    struct CannedOracle(String);

    impl Oracle for CannedOracle {
        async fn complete(&self, _messages: &[Message], _mode: GenMode) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    struct FailingOracle;

    impl Oracle for FailingOracle {
        async fn complete(&self, _messages: &[Message], _mode: GenMode) -> Result<String> {
            anyhow::bail!("backend unreachable")
        }
    }

    fn test_audit() -> AuditLogger {
        AuditLogger::new(&std::env::temp_dir())
    }

    fn hall_reply() -> String {
        json!({
            "incident": {"name": "Community Hall", "location": "Ward 1"},
            "assumptions": [],
            "tasks": [
                {"title": "Set up safe water point", "priority": "high",
                 "owner_role": "water team", "timebox_minutes": 20,
                 "sphere_refs": ["sphere:wash safe water#demo-000"]},
            ],
            "comms": {"sms_updates": [], "pa_announcement": "Queue calmly."},
            "evidence": ["sphere:wash safe water#demo-000"],
        })
        .to_string()
    }

    #[tokio::test]
    async fn end_to_end_deterministic_hall_scenario() {
        let oracle = CannedOracle(hall_reply());
        let retriever = Retriever::new(fallback_chunks());
        let out = generate_plan(
            &oracle,
            &retriever,
            "50 people in a hall; low water; 2 elderly; hot weather; fans only.",
            GenMode::Deterministic,
            5,
            &test_audit(),
        )
        .await
        .expect("plan");

        assert_eq!(out["_matched_risks"], "heat");
        assert!(out.get("_warnings").is_none());

        let tasks = out["tasks"].as_array().expect("tasks");
        assert!(tasks.iter().any(|t| t["owner_role"] == "Operations"));
        assert!(tasks
            .iter()
            .any(|t| !t["evidence_refs"].as_array().unwrap().is_empty()));
        // Hot weather triggers the heat bundle at position 0.
        assert_eq!(tasks[0]["id"], "B-HEAT");

        let translations = out["translations"].as_object().expect("translations");
        assert!(translations.contains_key("hi"));
        assert!(translations.contains_key("te"));
    }

    #[tokio::test]
    async fn enforced_invariants_hold_on_output_tasks() {
        let oracle = CannedOracle(hall_reply());
        let retriever = Retriever::new(fallback_chunks());
        let out = generate_plan(&oracle, &retriever, "hot hall", GenMode::Deterministic, 5, &test_audit())
            .await
            .expect("plan");
        for task in out["tasks"].as_array().unwrap() {
            assert!(!task["evidence_refs"].as_array().unwrap().is_empty());
            let timebox = task["timebox_minutes"].as_i64().unwrap();
            assert!((0..=180).contains(&timebox));
            assert!(["P0", "P1", "P2"].contains(&task["priority"].as_str().unwrap()));
        }
    }

    #[tokio::test]
    async fn empty_notes_is_a_client_error() {
        let oracle = CannedOracle(hall_reply());
        let retriever = Retriever::new(fallback_chunks());
        let err = generate_plan(&oracle, &retriever, "   \n", GenMode::Deterministic, 5, &test_audit())
            .await
            .expect_err("must reject");
        assert!(matches!(err, PlanError::EmptyNotes));
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn dosing_text_in_plan_attaches_warning() {
        let reply = json!({
            "tasks": [{"title": "Distribute 500 mg tablets", "evidence_refs": ["s:1#a"]}],
        })
        .to_string();
        let oracle = CannedOracle(reply);
        let retriever = Retriever::new(fallback_chunks());
        let out = generate_plan(&oracle, &retriever, "medication queue", GenMode::Deterministic, 5, &test_audit())
            .await
            .expect("plan");
        let warnings = out["_warnings"].as_array().expect("warnings present");
        assert!(!warnings.is_empty());
        assert!(warnings[0].as_str().unwrap().contains("dosing"));
    }

    #[tokio::test]
    async fn oracle_failure_in_deterministic_mode_is_hard() {
        let retriever = Retriever::new(fallback_chunks());
        let err = generate_plan(&FailingOracle, &retriever, "hot hall", GenMode::Deterministic, 5, &test_audit())
            .await
            .expect_err("single candidate lost");
        assert!(matches!(err, PlanError::NoCandidates));
        assert!(!err.is_client_error());
    }

    #[tokio::test]
    async fn briefing_returns_markdown_text() {
        let oracle = CannedOracle("# Incident Overview\nAll stable.\n".to_string());
        let plan = json!({"incident": {"name": "x"}, "translations": {}});
        let briefing = generate_briefing(&oracle, &plan, &test_audit())
            .await
            .expect("briefing");
        assert!(briefing.briefing_text.starts_with("# Incident Overview"));
    }

    #[tokio::test]
    async fn briefing_without_plan_is_a_client_error() {
        let oracle = CannedOracle("text".to_string());
        let err = generate_briefing(&oracle, &serde_json::Value::Null, &test_audit())
            .await
            .expect_err("must reject");
        assert!(matches!(err, PlanError::MissingPlan));
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn briefing_oracle_failure_is_a_server_error() {
        let plan = json!({"incident": {"name": "x"}});
        let err = generate_briefing(&FailingOracle, &plan, &test_audit())
            .await
            .expect_err("must fail");
        assert!(matches!(err, PlanError::Oracle(_)));
        assert!(!err.is_client_error());
    }
}
