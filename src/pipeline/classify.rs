use crate::types::ScenarioTag;

// Families are checked in this order; the first hit wins. Protection
// outranks wash outranks heat.
const PROTECTION_KEYWORDS: &[&str] = &[
    "child",
    "unaccompanied",
    "women",
    "girl",
    "abuse",
    "harass",
    "traffick",
    "separated family",
];

// No bare "water" here: nearly every relief note mentions water, and
// "water point"/"safe water" style phrases are the real WASH signal.
const WASH_KEYWORDS: &[&str] = &[
    "sanitation",
    "latrine",
    "toilet",
    "hygiene",
    "diarrhea",
    "diarrhoea",
    "handwash",
    "water point",
    "safe water",
    "drinking water",
];

const HEAT_KEYWORDS: &[&str] = &[
    "heat",
    "hot",
    "dizziness",
    "dizzy",
    "sunstroke",
    "heatstroke",
];

/// Map raw field notes to one scenario tag. Pure and total: case-insensitive
/// substring match, fixed family order, `Generic` when nothing matches.
pub fn classify(notes: &str) -> ScenarioTag {
    let lower = notes.to_lowercase();
    if has_any(&lower, PROTECTION_KEYWORDS) {
        return ScenarioTag::Protection;
    }
    if has_any(&lower, WASH_KEYWORDS) {
        return ScenarioTag::Wash;
    }
    if has_any(&lower, HEAT_KEYWORDS) {
        return ScenarioTag::Heat;
    }
    ScenarioTag::Generic
}

fn has_any(hay: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| hay.contains(n))
}
