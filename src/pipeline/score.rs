use std::collections::BTreeSet;

use serde_json::Value;

// Topic families whose presence in the plan text counts toward coverage.
const TOPIC_FAMILIES: &[(&str, &[&str])] = &[
    ("wash", &["water", "wash", "hygiene", "latrine", "sanitation"]),
    ("shelter", &["shelter", "bedding", "tent", "dry"]),
    ("protection", &["protection", "safe space", "child", "vulnerab"]),
    ("triage", &["triage", "screening", "first aid"]),
];

const CITATION_WEIGHT: f64 = 0.8;
const ROLE_WEIGHT: f64 = 0.2;

/// Candidate quality: topic coverage outweighs evidence volume outweighs
/// role diversity (1.0 / 0.8 / 0.2, fixed heuristic weights).
/// Total over any Value shape; missing fields simply contribute zero.
pub fn score(plan: &Value) -> f64 {
    let text = plan.to_string().to_lowercase();

    let topics = TOPIC_FAMILIES
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .count() as f64;

    topics + CITATION_WEIGHT * citation_count(plan) as f64 + ROLE_WEIGHT * role_count(plan) as f64
}

/// Per-task citations plus the top-level evidence list.
fn citation_count(plan: &Value) -> usize {
    let task_refs: usize = tasks(plan)
        .iter()
        .map(|t| {
            t.get("evidence_refs")
                .and_then(Value::as_array)
                .map(Vec::len)
                .unwrap_or(0)
        })
        .sum();
    let top_level = plan
        .get("evidence")
        .and_then(Value::as_array)
        .map(Vec::len)
        .unwrap_or(0);
    task_refs + top_level
}

fn role_count(plan: &Value) -> usize {
    tasks(plan)
        .iter()
        .filter_map(|t| t.get("owner_role").and_then(Value::as_str))
        .collect::<BTreeSet<_>>()
        .len()
}

fn tasks(plan: &Value) -> Vec<&Value> {
    plan.get("tasks")
        .and_then(Value::as_array)
        .map(|list| list.iter().collect())
        .unwrap_or_default()
}
