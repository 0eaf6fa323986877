use serde_json::{Value, json};

use crate::types::{MISSING_EVIDENCE_TAG, TIMEBOX_MAX_MINUTES};

const ALLOWED_PRIORITIES: &[&str] = &["P0", "P1", "P2"];

/// Deterministic final rewrite guaranteeing the hard invariants independent
/// of model behavior: every task carries evidence or an explicit assumption
/// tag, timeboxes are bounded, priorities restricted. Pure and total. Runs
/// strictly after scoring so scores see the raw evidence density, not the
/// synthetic tag.
pub fn enforce(plan: &mut Value) {
    let Some(tasks) = plan.get_mut("tasks").and_then(Value::as_array_mut) else {
        return;
    };

    for task in tasks.iter_mut() {
        let Some(task) = task.as_object_mut() else {
            continue;
        };

        // Evidence or an explicit assumption, never neither.
        let refs = task
            .entry("evidence_refs".to_string())
            .or_insert_with(|| json!([]));
        if !refs.is_array() {
            *refs = json!([]);
        }
        if let Some(list) = refs.as_array_mut()
            && list.is_empty()
        {
            list.push(Value::String(MISSING_EVIDENCE_TAG.to_string()));
        }

        // as_f64 so a fractional minute count keeps its magnitude instead
        // of collapsing to zero.
        let timebox = task
            .get("timebox_minutes")
            .and_then(Value::as_f64)
            .map(|f| f as i64)
            .unwrap_or(0)
            .clamp(0, TIMEBOX_MAX_MINUTES);
        task.insert("timebox_minutes".to_string(), json!(timebox));

        let priority_ok = task
            .get("priority")
            .and_then(Value::as_str)
            .is_some_and(|p| ALLOWED_PRIORITIES.contains(&p));
        if !priority_ok {
            task.insert("priority".to_string(), Value::String("P1".to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::enforce;
    use crate::types::MISSING_EVIDENCE_TAG;
    use serde_json::{Value, json};

    #[test]
    fn empty_evidence_gets_assumption_sentinel() {
        let mut plan = json!({"tasks": [{"evidence_refs": []}]});
        enforce(&mut plan);
        assert_eq!(plan["tasks"][0]["evidence_refs"], json!([MISSING_EVIDENCE_TAG]));
    }

    #[test]
    fn present_evidence_is_left_alone() {
        let mut plan = json!({"tasks": [{"evidence_refs": ["sphere:x#1"]}]});
        enforce(&mut plan);
        assert_eq!(plan["tasks"][0]["evidence_refs"], json!(["sphere:x#1"]));
    }

    #[test]
    fn missing_or_mistyped_evidence_field_is_repaired() {
        let mut plan = json!({"tasks": [{}, {"evidence_refs": "nope"}]});
        enforce(&mut plan);
        for i in 0..2 {
            assert_eq!(
                plan["tasks"][i]["evidence_refs"],
                json!([MISSING_EVIDENCE_TAG])
            );
        }
    }

    #[test]
    fn timebox_is_clamped_into_bounds() {
        let mut plan = json!({"tasks": [
            {"timebox_minutes": -10},
            {"timebox_minutes": 999},
            {"timebox_minutes": 60},
            {"timebox_minutes": "soon"},
        ]});
        enforce(&mut plan);
        let got: Vec<i64> = (0..4)
            .map(|i| plan["tasks"][i]["timebox_minutes"].as_i64().unwrap())
            .collect();
        assert_eq!(got, vec![0, 180, 60, 0]);
    }

    #[test]
    fn fractional_timebox_keeps_its_magnitude() {
        let mut plan = json!({"tasks": [
            {"timebox_minutes": 30.5},
            {"timebox_minutes": 200.9},
        ]});
        enforce(&mut plan);
        assert_eq!(plan["tasks"][0]["timebox_minutes"], 30);
        assert_eq!(plan["tasks"][1]["timebox_minutes"], 180);
    }

    #[test]
    fn out_of_range_priority_is_coerced_to_p1() {
        let mut plan = json!({"tasks": [
            {"priority": "P9"},
            {"priority": 0},
            {"priority": "P0"},
        ]});
        enforce(&mut plan);
        assert_eq!(plan["tasks"][0]["priority"], "P1");
        assert_eq!(plan["tasks"][1]["priority"], "P1");
        assert_eq!(plan["tasks"][2]["priority"], "P0");
    }

    #[test]
    fn enforced_plan_satisfies_all_invariants() {
        let mut plan = json!({"tasks": [
            {"evidence_refs": [], "timebox_minutes": 500, "priority": "urgent"},
            {"evidence_refs": ["a"], "timebox_minutes": 15, "priority": "P2"},
        ]});
        enforce(&mut plan);
        for task in plan["tasks"].as_array().unwrap() {
            assert!(!task["evidence_refs"].as_array().unwrap().is_empty());
            let t = task["timebox_minutes"].as_i64().unwrap();
            assert!((0..=180).contains(&t));
            assert!(["P0", "P1", "P2"]
                .contains(&task["priority"].as_str().unwrap()));
        }
    }

    #[test]
    fn plan_without_tasks_is_untouched() {
        let mut plan = json!({"incident": {"name": "x"}});
        enforce(&mut plan);
        assert_eq!(plan, json!({"incident": {"name": "x"}}));
    }

    #[test]
    fn enforce_is_idempotent() {
        let mut plan = json!({"tasks": [{"evidence_refs": [], "timebox_minutes": 999}]});
        enforce(&mut plan);
        let once = plan.clone();
        enforce(&mut plan);
        assert_eq!(plan, once);
    }

    #[test]
    fn non_object_task_entries_are_skipped() {
        let mut plan = json!({"tasks": ["scalar"]});
        enforce(&mut plan);
        assert_eq!(plan["tasks"][0], Value::String("scalar".to_string()));
    }
}
