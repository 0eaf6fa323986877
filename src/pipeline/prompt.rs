use crate::oracle::Message;

// ── Plan prompts ──────────────────────────────────────────────────────────────

const PLAN_SYSTEM: &str = "You are ReliefBot, a disaster-relief planning assistant.\n\
Output ONLY a single JSON object with EXACTLY these keys:\n\
incident, assumptions, tasks, comms, translations, evidence.\n\
- Base every recommendation on the provided \"Context evidence\".\n\
- Cite evidence by including its tags (e.g. sphere:wash safe water#abcd-000).\n\
- If evidence is insufficient, add an explicit assumption instead.\n\
- No medical dosing or prescriptions; use advice-not-directive wording for health.\n";

const PLAN_SCHEMA: &str = "JSON schema (keys/shape):\n\
incident: {name: str, location: str}\n\
assumptions: [str]\n\
tasks: [{\n\
  id: str, title: str, why: str, priority: 'P0'|'P1'|'P2',\n\
  owner_role: 'Logistics'|'Operations'|'Planning'|'Volunteers',\n\
  steps: [str], resources: [str], timebox_minutes: int,\n\
  dependencies: [str], risks: [str], evidence_refs: [str]\n\
}]\n\
comms: {sms_updates: [str], pa_announcement: str}\n\
translations: {hi:{summary:str}, te:{summary:str}}\n\
evidence: [str]\n\
Rules:\n\
- Prefer fewer, high-impact tasks. Include dependencies if any.\n\
- Each task SHOULD carry a related evidence tag in evidence_refs OR an explicit assumption.\n";

// One worked example anchors the exact JSON shape.
const PLAN_EXAMPLE_USER: &str =
    "50 people in a hall; low water; 2 elderly; hot weather; fans only.";

const PLAN_EXAMPLE_ASSISTANT: &str = r#"{
  "incident":{"name":"Community Hall","location":"Ward 1"},
  "assumptions":["Fans available"],
  "tasks":[
    {"id":"T-001","title":"Set up safe water point","why":"Low water","priority":"P0","owner_role":"Logistics",
     "steps":["Table at entrance","Queue lines","Chlorinated water"],
     "resources":["Table","Buckets","Soap"],"timebox_minutes":20,"dependencies":[],"risks":["Crowding"],"evidence_refs":["sphere:wash safe water#demo-000"]}],
  "comms":{"sms_updates":["Water point open 20 min"],"pa_announcement":"Queue calmly, handwash before water."},
  "translations":{"hi":{"summary":"20 मिनट में पानी बिंदु खुलेगा।"},"te":{"summary":"నీటి పాయింట్ 20 నిమిషాల్లో తెరుస్తాం."}},
  "evidence":["sphere:wash safe water#demo-000"]
}"#;

/// Fixed role sequence for one plan request: system contract, schema
/// instructions, the worked example pair, then the live notes with retrieved
/// evidence. Pure data transformation; never parses the reply.
pub fn plan_messages(notes: &str, blurbs: &str, cite_ids: &[String]) -> Vec<Message> {
    vec![
        Message::system(PLAN_SYSTEM),
        Message::developer(PLAN_SCHEMA),
        Message::user(PLAN_EXAMPLE_USER),
        Message::assistant(PLAN_EXAMPLE_ASSISTANT),
        Message::user(plan_user_turn(notes, blurbs, cite_ids)),
    ]
}

fn plan_user_turn(notes: &str, blurbs: &str, cite_ids: &[String]) -> String {
    format!(
        "Free-text field notes:\n{notes}\n\n\
         Context evidence (tagged):\n{blurbs}\n\n\
         Constraints:\n\
         - Languages: EN, HI, TE\n\
         - Prioritize water safety, dry shelter, triage flow, vulnerable persons.\n\
         - Use evidence tags {} in 'evidence' and in each task's 'evidence_refs' where relevant.\n\
         - Output EXACTLY the six required keys.\n",
        cite_ids.join(", ")
    )
}

// ── Briefing prompts ──────────────────────────────────────────────────────────

const BRIEFING_SYSTEM: &str =
    "You are ReliefBot and write a concise ICS-201 style briefing in markdown.";

const BRIEFING_SECTIONS: &str = "Sections: 1. Incident Overview, 2. Task Summary, 3. Resources, \
                                 4. Comms, 5. Translations (HI/TE), 6. Evidence.";

pub fn briefing_messages(plan_json: &str) -> Vec<Message> {
    vec![
        Message::system(BRIEFING_SYSTEM),
        Message::developer(BRIEFING_SECTIONS),
        Message::user(format!(
            "Create a readable briefing based on this ActionPlan JSON:\n{plan_json}"
        )),
    ]
}
