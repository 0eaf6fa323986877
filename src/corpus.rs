use std::{
    collections::hash_map::DefaultHasher,
    fs,
    hash::{Hash, Hasher},
    path::Path,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const CHUNK_MAX_CHARS: usize = 700;
const CHUNK_OVERLAP_CHARS: usize = 80;

/// One indexed guidance passage. Built once at corpus-index time and never
/// mutated afterwards; the retriever owns the collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceChunk {
    pub id: String,
    pub domain: String,
    #[serde(alias = "source_title")]
    pub title: String,
    #[serde(alias = "chunk")]
    pub body: String,
}

impl EvidenceChunk {
    /// Stable citation tag, `domain:title#id`. Display and traceability only;
    /// never dereferenced back into the index.
    pub fn cite_id(&self) -> String {
        format!("{}:{}#{}", self.domain, self.title, self.id)
    }
}

/// Minimal built-in guidance so the pipeline never hard-fails on a missing
/// or empty index file.
pub fn fallback_chunks() -> Vec<EvidenceChunk> {
    vec![
        EvidenceChunk {
            id: "guide-001".to_string(),
            domain: "ics".to_string(),
            title: "ics 201 intro".to_string(),
            body: "ICS-201 brief: Situation, Objectives, Org, Resources, Safety, Comms."
                .to_string(),
        },
        EvidenceChunk {
            id: "guide-002".to_string(),
            domain: "sphere".to_string(),
            title: "wash minimums".to_string(),
            body: "Safe water point; handwashing at critical points; sanitation distance; \
                   queue management; chlorine guidance."
                .to_string(),
        },
    ]
}

/// Load the JSONL chunk index. Any failure (missing file, bad line) degrades
/// to skipping rather than erroring; an empty result falls back to the
/// built-in set at the call site.
pub fn load_chunks(path: &Path) -> Vec<EvidenceChunk> {
    let Ok(text) = fs::read_to_string(path) else {
        return Vec::new();
    };
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|l| serde_json::from_str::<EvidenceChunk>(l).ok())
        .collect()
}

/// Load the index or, when it is missing or empty, the fallback set.
pub fn load_or_fallback(path: &Path) -> Vec<EvidenceChunk> {
    let chunks = load_chunks(path);
    if chunks.is_empty() {
        fallback_chunks()
    } else {
        chunks
    }
}

// ── Ingest: corpus text files → chunk records ─────────────────────────────────

/// Walk `root` for `*.txt` guidance files and write a JSONL chunk index to
/// `out`. The domain of each chunk is the file's parent directory name, the
/// title its stem with underscores spaced out.
pub fn ingest_dir(root: &Path, out: &Path) -> Result<usize> {
    let mut files: Vec<_> = ignore::WalkBuilder::new(root)
        .standard_filters(false)
        .build()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.into_path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == "txt"))
        .collect();
    files.sort();

    let mut lines = Vec::new();
    for path in &files {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read `{}`", path.display()))?;
        let domain = path
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_else(|| "general".to_string());
        let title = path
            .file_stem()
            .map(|n| n.to_string_lossy().replace('_', " "))
            .unwrap_or_else(|| "untitled".to_string());
        let fid = file_id(path);

        for (n, body) in chunk_text(&text, CHUNK_MAX_CHARS, CHUNK_OVERLAP_CHARS)
            .into_iter()
            .enumerate()
        {
            let chunk = EvidenceChunk {
                id: format!("{fid}-{n:03}"),
                domain: domain.clone(),
                title: title.clone(),
                body,
            };
            lines.push(serde_json::to_string(&chunk)?);
        }
    }

    if let Some(parent) = out.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(out, lines.join("\n"))
        .with_context(|| format!("failed to write `{}`", out.display()))?;
    Ok(lines.len())
}

/// Split whitespace-collapsed text into windows of at most `max_chars`,
/// snapped back to the nearest sentence boundary when one is close enough,
/// with `overlap` characters carried into the next window.
pub fn chunk_text(text: &str, max_chars: usize, overlap: usize) -> Vec<String> {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let chars: Vec<char> = flat.chars().collect();
    let mut out = Vec::new();
    let mut i = 0usize;

    while i < chars.len() {
        let hard_end = (i + max_chars).min(chars.len());
        // Snap to the last ". " in the window unless that would cut off too much.
        let boundary = (i..hard_end.saturating_sub(1))
            .rev()
            .find(|&p| chars[p] == '.' && chars[p + 1] == ' ');
        let end = match boundary {
            Some(pos) if hard_end - pos <= 200 => pos + 1,
            _ => hard_end,
        };
        let piece: String = chars[i..end].iter().collect();
        let piece = piece.trim().to_string();
        if !piece.is_empty() {
            out.push(piece);
        }
        if end >= chars.len() {
            break;
        }
        // Overlap pulls the cursor back, but always move forward.
        i = end.saturating_sub(overlap).max(i + 1);
    }
    out
}

fn file_id(path: &Path) -> String {
    let mut hasher = DefaultHasher::new();
    path.to_string_lossy().hash(&mut hasher);
    format!("{:08x}", hasher.finish() as u32)
}

#[cfg(test)]
mod tests {
    use super::{EvidenceChunk, chunk_text, fallback_chunks, load_chunks};
    use std::path::Path;

    #[test]
    fn cite_id_joins_domain_title_and_id() {
        let chunk = EvidenceChunk {
            id: "abc-000".to_string(),
            domain: "sphere".to_string(),
            title: "wash safe water".to_string(),
            body: "x".to_string(),
        };
        assert_eq!(chunk.cite_id(), "sphere:wash safe water#abc-000");
    }

    #[test]
    fn fallback_set_has_two_entries() {
        let chunks = fallback_chunks();
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().any(|c| c.domain == "sphere"));
    }

    #[test]
    fn load_chunks_missing_file_is_empty_not_error() {
        assert!(load_chunks(Path::new("/no/such/index.jsonl")).is_empty());
    }

    #[test]
    fn chunk_record_accepts_legacy_field_names() {
        let raw = r#"{"id":"a-000","domain":"who","source_title":"heat","chunk":"body text"}"#;
        let chunk: EvidenceChunk = serde_json::from_str(raw).expect("parse");
        assert_eq!(chunk.title, "heat");
        assert_eq!(chunk.body, "body text");
    }

    #[test]
    fn chunk_text_short_input_is_single_chunk() {
        let chunks = chunk_text("one small note.", 700, 80);
        assert_eq!(chunks, vec!["one small note.".to_string()]);
    }

    #[test]
    fn chunk_text_always_makes_progress() {
        let text = "word ".repeat(2000);
        let chunks = chunk_text(&text, 100, 99);
        assert!(!chunks.is_empty());
        assert!(chunks.len() < 12_000, "cursor must advance every iteration");
    }

    #[test]
    fn chunk_text_snaps_to_sentence_boundary() {
        let text = format!("{}. {}", "a".repeat(650), "b".repeat(400));
        let chunks = chunk_text(&text, 700, 0);
        assert!(chunks[0].ends_with('.'), "first chunk: {}", chunks[0]);
    }

    #[test]
    fn chunk_text_collapses_whitespace() {
        let chunks = chunk_text("line one\n\n  line   two", 700, 80);
        assert_eq!(chunks, vec!["line one line two".to_string()]);
    }
}
