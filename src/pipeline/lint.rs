use std::sync::OnceLock;

use regex::Regex;

// Dosing units, drug-administration and prescription vocabulary. The model
// is told not to give clinical advice; this is the last-line check on what
// actually came back.
const DISALLOWED_VOCAB: &str = r"(?i)\b(\d+\s*(?:mg|ml|mcg|iu)|dose|dosage|dosing|tablets?|capsules?|inject\w*|prescri\w*|syringe|antibiotic\w*|paracetamol|ibuprofen)\b";

pub const DOSING_WARNING: &str =
    "Plan text contains medication dosing or drug-administration language; \
     escalate to licensed medical personnel instead of acting on it.";

/// Scan the serialized plan for disallowed clinical vocabulary. Advisory
/// only: at most one warning, the plan is never modified, and the request
/// never fails because of a match.
pub fn lint(serialized_plan: &str) -> Vec<String> {
    if vocab_re().is_match(serialized_plan) {
        vec![DOSING_WARNING.to_string()]
    } else {
        Vec::new()
    }
}

// Compiled once; lint runs on every request.
fn vocab_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(DISALLOWED_VOCAB).expect("static regex"))
}
