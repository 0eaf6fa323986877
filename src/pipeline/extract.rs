/// Pull the first well-formed JSON object out of raw oracle text.
///
/// A fenced ```json block wins when present; otherwise the greedy span from
/// the first `{` to the last `}` is taken and must parse. Greediness assumes
/// at most one JSON object per reply; this is deliberately not a general
/// JSON-in-text extractor.
pub fn extract_json(raw: &str) -> Option<String> {
    if let Some(start) = raw.find("```json")
        && let Some(end) = raw[start + 7..].find("```")
    {
        let fenced = raw[start + 7..start + 7 + end].trim();
        if fenced.starts_with('{') && parses_as_object(fenced) {
            return Some(fenced.to_string());
        }
    }

    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    let span = raw[start..=end].trim();
    if parses_as_object(span) {
        Some(span.to_string())
    } else {
        None
    }
}

fn parses_as_object(text: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(text)
        .map(|v| v.is_object())
        .unwrap_or(false)
}
