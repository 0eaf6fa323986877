use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Sentinel appended by the policy enforcer when a task carries no citation.
pub const MISSING_EVIDENCE_TAG: &str = "assumption:missing-evidence";

pub const TIMEBOX_MAX_MINUTES: i64 = 180;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    P0,
    P1,
    P2,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::P0 => "P0",
            Self::P1 => "P1",
            Self::P2 => "P2",
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::P1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OwnerRole {
    Logistics,
    Operations,
    Planning,
    Volunteers,
}

impl OwnerRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Logistics => "Logistics",
            Self::Operations => "Operations",
            Self::Planning => "Planning",
            Self::Volunteers => "Volunteers",
        }
    }
}

impl Default for OwnerRole {
    fn default() -> Self {
        Self::Operations
    }
}

/// Coarse classification of field notes, used only to bias which guidance
/// domains are favored during retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioTag {
    Protection,
    Wash,
    Heat,
    Generic,
}

impl ScenarioTag {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Protection => "protection",
            Self::Wash => "wash",
            Self::Heat => "heat",
            Self::Generic => "generic",
        }
    }
}

/// Request-level sampling choice. Deterministic pins a seed and a low
/// temperature and generates one candidate; adaptive samples three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenMode {
    #[default]
    Deterministic,
    Adaptive,
}

impl GenMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deterministic => "deterministic",
            Self::Adaptive => "adaptive",
        }
    }

    pub fn candidate_count(self) -> usize {
        match self {
            Self::Deterministic => 1,
            Self::Adaptive => 3,
        }
    }
}

// ── Plan schema ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Incident {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Task {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub why: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub owner_role: OwnerRole,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default)]
    pub timebox_minutes: i64,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub risks: Vec<String>,
    #[serde(default)]
    pub evidence_refs: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Comms {
    #[serde(default)]
    pub sms_updates: Vec<String>,
    #[serde(default)]
    pub pa_announcement: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranslationSummary {
    #[serde(default)]
    pub summary: String,
}

/// One fully-repaired plan. Built fresh per request from oracle output and
/// never persisted; the serde round-trip out of `serde_json::Value` is the
/// final conforms-or-rejects schema gate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionPlan {
    #[serde(default)]
    pub incident: Incident,
    #[serde(default)]
    pub assumptions: Vec<String>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub comms: Comms,
    #[serde(default)]
    pub translations: BTreeMap<String, TranslationSummary>,
    #[serde(default)]
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Briefing {
    pub briefing_text: String,
}

#[cfg(test)]
mod tests {
    use super::{ActionPlan, OwnerRole, Priority};

    #[test]
    fn priority_serializes_as_bare_label() {
        let json = serde_json::to_string(&Priority::P0).expect("serialize");
        assert_eq!(json, "\"P0\"");
    }

    #[test]
    fn owner_role_default_is_operations() {
        assert_eq!(OwnerRole::default(), OwnerRole::Operations);
    }

    #[test]
    fn priority_default_is_p1() {
        assert_eq!(Priority::default(), Priority::P1);
    }

    #[test]
    fn action_plan_accepts_fully_defaulted_object() {
        let plan: ActionPlan = serde_json::from_str("{}").expect("deserialize");
        assert!(plan.tasks.is_empty());
        assert_eq!(plan.incident.name, "");
    }

    #[test]
    fn action_plan_rejects_unknown_priority_label() {
        let raw = r#"{"tasks":[{"id":"T-001","priority":"Urgent"}]}"#;
        assert!(serde_json::from_str::<ActionPlan>(raw).is_err());
    }
}
