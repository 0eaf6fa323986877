use serde_json::{Map, Value, json};

// Generic wrapper keys some models put the whole plan under.
const CONTAINER_KEYS: &[&str] = &["plan", "result", "data"];

// List-valued keys models use instead of `tasks`.
const TASK_LIST_ALIASES: &[&str] = &["action_items", "actions", "steps"];

// Exact (case-insensitive) role names and common aliases, checked before the
// substring heuristics below. First match wins.
const ROLE_ALIASES: &[(&str, &str)] = &[
    ("logistics", "Logistics"),
    ("operations", "Operations"),
    ("planning", "Planning"),
    ("volunteers", "Volunteers"),
    ("hygiene", "Operations"),
    ("wash", "Operations"),
    ("water", "Operations"),
    ("shelter", "Operations"),
    ("triage", "Operations"),
    ("medical", "Operations"),
    ("security", "Operations"),
    ("safety", "Operations"),
    ("supply", "Logistics"),
    ("supplies", "Logistics"),
    ("procurement", "Logistics"),
    ("transport", "Logistics"),
    ("comms", "Planning"),
    ("communication", "Planning"),
    ("documentation", "Planning"),
    ("coordination", "Planning"),
    ("volunteer", "Volunteers"),
];

// Substring heuristics per role bucket, evaluated in this order.
const OPERATIONS_HINTS: &[&str] = &["wash", "shelter", "triage", "hygiene", "medical", "security"];
const LOGISTICS_HINTS: &[&str] = &["supply", "suppl", "procure", "transport", "logist"];
const PLANNING_HINTS: &[&str] = &["plan", "coord", "comm", "docu"];

const PRIORITY_SYNONYMS: &[(&str, &str)] = &[
    ("p0", "P0"),
    ("p1", "P1"),
    ("p2", "P2"),
    ("high", "P0"),
    ("medium", "P1"),
    ("low", "P2"),
];

/// Best-effort repair of one candidate toward the ActionPlan shape. Never
/// fails for object input; `None` only when the top-level value is not an
/// object. Idempotent: defaults apply only to absent keys and every mapping
/// is a fixpoint on already-normalized values.
pub fn normalize(raw: Value) -> Option<Value> {
    let mut obj = match raw {
        Value::Object(map) => map,
        _ => return None,
    };

    obj = unwrap_container(obj);
    rename_task_alias(&mut obj);
    fill_toplevel_defaults(&mut obj);
    normalize_tasks(&mut obj);

    Some(Value::Object(obj))
}

/// Unwrap `{"plan": {...}}`-style wrappers one level. Only fires when the
/// object does not already look like a plan (no `tasks` key), which keeps
/// normalization a no-op on its own output.
fn unwrap_container(obj: Map<String, Value>) -> Map<String, Value> {
    if obj.contains_key("tasks") {
        return obj;
    }
    for key in CONTAINER_KEYS {
        if let Some(Value::Object(inner)) = obj.get(*key) {
            return inner.clone();
        }
    }
    obj
}

fn rename_task_alias(obj: &mut Map<String, Value>) {
    if obj.contains_key("tasks") {
        return;
    }
    for alias in TASK_LIST_ALIASES {
        if matches!(obj.get(*alias), Some(Value::Array(_))) {
            let list = obj.remove(*alias).unwrap_or(Value::Array(Vec::new()));
            obj.insert("tasks".to_string(), list);
            return;
        }
    }
}

fn fill_toplevel_defaults(obj: &mut Map<String, Value>) {
    set_default(
        obj,
        "incident",
        json!({"name": "Unknown Incident", "location": "Unknown"}),
    );
    set_default(obj, "assumptions", json!([]));
    set_default(obj, "tasks", json!([]));
    set_default(obj, "comms", json!({"sms_updates": [], "pa_announcement": ""}));
    set_default(
        obj,
        "translations",
        json!({"hi": {"summary": ""}, "te": {"summary": ""}}),
    );
    set_default(obj, "evidence", json!([]));
}

fn normalize_tasks(obj: &mut Map<String, Value>) {
    let tasks = match obj.get_mut("tasks") {
        Some(Value::Array(list)) => list,
        Some(other) => {
            *other = Value::Array(Vec::new());
            return;
        }
        None => return,
    };

    for (i, entry) in tasks.iter_mut().enumerate() {
        let placeholder_id = format!("T-{:03}", i + 1);
        match entry {
            Value::Object(task) => normalize_task(task, &placeholder_id),
            scalar => {
                let task = minimal_task(scalar, &placeholder_id);
                *scalar = task;
            }
        }
    }
}

fn normalize_task(task: &mut Map<String, Value>, placeholder_id: &str) {
    set_default(task, "id", Value::String(placeholder_id.to_string()));
    set_default(task, "title", Value::String("Untitled task".to_string()));
    set_default(task, "why", Value::String(String::new()));

    let priority = normalize_priority(task.get("priority"));
    task.insert("priority".to_string(), Value::String(priority.to_string()));

    let role = normalize_role(task.get("owner_role"));
    task.insert("owner_role".to_string(), Value::String(role.to_string()));

    // Legacy field name from the first schema revision.
    if !task.contains_key("evidence_refs")
        && matches!(task.get("sphere_refs"), Some(Value::Array(_)))
    {
        let refs = task.remove("sphere_refs").unwrap_or(Value::Array(Vec::new()));
        task.insert("evidence_refs".to_string(), refs);
    }

    set_default(task, "steps", json!([]));
    set_default(task, "resources", json!([]));
    set_default(task, "timebox_minutes", json!(0));
    set_default(task, "dependencies", json!([]));
    set_default(task, "risks", json!([]));
    set_default(task, "evidence_refs", json!([]));
}

/// A scalar task entry becomes a minimal task using the scalar as its title.
fn minimal_task(scalar: &Value, placeholder_id: &str) -> Value {
    let title = match scalar {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    json!({
        "id": placeholder_id,
        "title": title,
        "why": "",
        "priority": "P1",
        "owner_role": "Operations",
        "steps": [],
        "resources": [],
        "timebox_minutes": 0,
        "dependencies": [],
        "risks": [],
        "evidence_refs": [],
    })
}

/// Case-insensitive synonym lookup; P1 for anything unrecognized. Total.
fn normalize_priority(val: Option<&Value>) -> &'static str {
    let Some(Value::String(s)) = val else {
        return "P1";
    };
    let key = s.trim().to_lowercase();
    PRIORITY_SYNONYMS
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, canon)| *canon)
        .unwrap_or("P1")
}

/// Map arbitrary role strings onto the four fixed buckets: exact alias table
/// first, then ordered substring heuristics, Operations when unclear. Total.
fn normalize_role(val: Option<&Value>) -> &'static str {
    let Some(Value::String(s)) = val else {
        return "Operations";
    };
    let key = s.trim().to_lowercase();

    if let Some((_, canon)) = ROLE_ALIASES.iter().find(|(alias, _)| *alias == key) {
        return canon;
    }
    if OPERATIONS_HINTS.iter().any(|h| key.contains(h)) {
        return "Operations";
    }
    if LOGISTICS_HINTS.iter().any(|h| key.contains(h)) {
        return "Logistics";
    }
    if PLANNING_HINTS.iter().any(|h| key.contains(h)) {
        return "Planning";
    }
    if key.contains("volun") {
        return "Volunteers";
    }
    "Operations"
}

fn set_default(obj: &mut Map<String, Value>, key: &str, default: Value) {
    if !obj.contains_key(key) {
        obj.insert(key.to_string(), default);
    }
}
