use serde_json::{Value, json};

/// One scenario-triggered mandatory task family: fires when any trigger
/// keyword appears in the notes and no existing task title already contains
/// the marker substring. The marker check is what makes re-running a no-op.
struct BundleFamily {
    triggers: &'static [&'static str],
    marker: &'static str,
    prepend: bool,
    build: fn() -> Value,
}

const FAMILIES: &[BundleFamily] = &[
    BundleFamily {
        triggers: &["heat", "heat index", "hot", "dizziness"],
        marker: "triage",
        prepend: true,
        build: heat_task,
    },
    BundleFamily {
        triggers: &["light", "dark", "night"],
        marker: "lighting",
        prepend: false,
        build: lighting_task,
    },
    BundleFamily {
        triggers: &["child", "unaccompanied"],
        marker: "safe space",
        prepend: false,
        build: child_safety_task,
    },
    BundleFamily {
        triggers: &["wheelchair", "ramp", "accessible", "access"],
        marker: "accessible route",
        prepend: false,
        build: accessibility_task,
    },
];

/// Inject scenario-mandated tasks into a normalized plan. Families are
/// checked independently (several may fire in one call) and idempotently.
pub fn ensure_bundles(notes: &str, plan: &mut Value) {
    let lower = notes.to_lowercase();
    let Some(tasks) = plan.get_mut("tasks").and_then(Value::as_array_mut) else {
        return;
    };

    for family in FAMILIES {
        if !family.triggers.iter().any(|t| lower.contains(t)) {
            continue;
        }
        if tasks.iter().any(|t| title_contains(t, family.marker)) {
            continue;
        }
        let task = (family.build)();
        if family.prepend {
            tasks.insert(0, task);
        } else {
            tasks.push(task);
        }
    }
}

fn title_contains(task: &Value, marker: &str) -> bool {
    task.get("title")
        .and_then(Value::as_str)
        .is_some_and(|t| t.to_lowercase().contains(marker))
}

// Bundle tasks are fixed templates, not retrieved guidance; they carry no
// citation and pick up the missing-evidence assumption tag from the policy
// enforcer instead.

fn heat_task() -> Value {
    json!({
        "id": "B-HEAT",
        "title": "Heat triage & dizziness screening",
        "why": "Heat stress reported; screen before it escalates",
        "priority": "P0",
        "owner_role": "Operations",
        "steps": [
            "Set up shaded screening point at entrance",
            "Screen elderly, children, pregnant persons first",
            "Move symptomatic people to the coolest area and give water",
        ],
        "resources": ["Shade tarp", "Drinking water", "Duty roster"],
        "timebox_minutes": 30,
        "dependencies": [],
        "risks": ["Screening queue forms in direct sun"],
        "evidence_refs": [],
    })
}

fn lighting_task() -> Value {
    json!({
        "id": "B-LIGHT",
        "title": "Restore lighting in shelter and walkways",
        "why": "Darkness raises injury and protection risk",
        "priority": "P0",
        "owner_role": "Logistics",
        "steps": [
            "Inventory working lamps and power sources",
            "Light latrine paths and entrances first",
            "Assign a volunteer to check lights each evening",
        ],
        "resources": ["Solar lamps", "Extension cords", "Batteries"],
        "timebox_minutes": 45,
        "dependencies": [],
        "risks": ["Cable trip hazards"],
        "evidence_refs": [],
    })
}

fn child_safety_task() -> Value {
    json!({
        "id": "B-CHILD",
        "title": "Open a child safe space with sign-in",
        "why": "Children present; unaccompanied minors need a supervised area",
        "priority": "P0",
        "owner_role": "Operations",
        "steps": [
            "Mark a visible corner away from exits",
            "Two vetted adults present at all times",
            "Register unaccompanied children and start family tracing",
        ],
        "resources": ["Floor mats", "Sign-in sheet", "ID wristbands"],
        "timebox_minutes": 40,
        "dependencies": [],
        "risks": ["Unverified adults attempting pickup"],
        "evidence_refs": [],
    })
}

fn accessibility_task() -> Value {
    json!({
        "id": "B-ACCESS",
        "title": "Clear an accessible route to services",
        "why": "Wheelchair users must reach water, latrines and food without help",
        "priority": "P0",
        "owner_role": "Operations",
        "steps": [
            "Walk the route from entrance to each service point",
            "Remove obstacles; place ramps over steps",
            "Mark the route and brief volunteers on it",
        ],
        "resources": ["Portable ramp", "Marking tape"],
        "timebox_minutes": 35,
        "dependencies": [],
        "risks": ["Route re-blocked by storage overflow"],
        "evidence_refs": [],
    })
}
