use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::Local;
use serde_json::json;

use crate::types::GenMode;

pub const AUDIT_FILE_NAME: &str = "RELIEF_LOG.jsonl";

const SUMMARY_LIMIT_CHARS: usize = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditEventKind {
    PlanRequested,
    CandidateGenerated,
    CandidateDropped,
    PlanSelected,
    LintWarning,
    BriefingRequested,
    Error,
}

impl AuditEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PlanRequested => "plan_requested",
            Self::CandidateGenerated => "candidate_generated",
            Self::CandidateDropped => "candidate_dropped",
            Self::PlanSelected => "plan_selected",
            Self::LintWarning => "lint_warning",
            Self::BriefingRequested => "briefing_requested",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuditRecord<'a> {
    pub event: AuditEventKind,
    pub mode: Option<GenMode>,
    pub candidate: Option<usize>,
    pub score: Option<f64>,
    pub summary: Option<&'a str>,
}

/// Append-only JSONL trail of request-level events. One logger per process;
/// every line carries the same run id so one invocation can be grepped out.
#[derive(Debug, Clone)]
pub struct AuditLogger {
    path: PathBuf,
    run_id: String,
}

impl AuditLogger {
    pub fn new(dir: &Path) -> Self {
        let path = dir.join(AUDIT_FILE_NAME);
        let run_id = format!("relief-{}", Local::now().format("%Y%m%d-%H%M%S"));
        Self { path, run_id }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, rec: AuditRecord<'_>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open `{}`", self.path.display()))?;

        let line = json!({
            "ts": Local::now().to_rfc3339(),
            "run_id": self.run_id,
            "event": rec.event.as_str(),
            "mode": rec.mode.map(GenMode::as_str),
            "candidate": rec.candidate,
            "score": rec.score,
            "summary": rec.summary.map(|s| truncate_chars(s, SUMMARY_LIMIT_CHARS)),
        });

        writeln!(file, "{}", line)?;
        Ok(())
    }

    /// Audit writes must never take down a request; failures go to stderr.
    pub fn record(&self, rec: AuditRecord<'_>) {
        if let Err(e) = self.write(rec) {
            eprintln!("[audit] {e}");
        }
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(13)).collect();
    out.push_str("…(truncated)");
    out
}
