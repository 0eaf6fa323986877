mod audit;
mod config;
mod corpus;
mod oracle;
mod pipeline;
mod types;

use std::{
    io::Read,
    path::{Path, PathBuf},
    process::ExitCode,
};

use audit::AuditLogger;
use config::Config;
use oracle::HttpOracle;
use pipeline::{PlanError, retrieve::Retriever};
use types::GenMode;

const EXIT_SERVER_ERROR: u8 = 1;
const EXIT_CLIENT_ERROR: u8 = 2;

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        usage();
        return ExitCode::from(EXIT_CLIENT_ERROR);
    };

    let (config, warnings) = Config::load();
    for warning in &warnings {
        eprintln!("[config] {warning}");
    }

    match command {
        "plan" => run_plan(&config, &args[1..]).await,
        "briefing" => run_briefing(&config, &args[1..]).await,
        "ingest" => run_ingest(&config, &args[1..]),
        "help" | "--help" | "-h" => {
            usage();
            ExitCode::SUCCESS
        }
        other => {
            eprintln!("unknown command `{other}`");
            usage();
            ExitCode::from(EXIT_CLIENT_ERROR)
        }
    }
}

fn usage() {
    eprintln!(
        "reliefbot <command>\n\
         \n\
         commands:\n\
         \x20 plan [--adaptive] [notes...]   field notes -> action plan (stdin when no notes)\n\
         \x20 briefing [file]                plan JSON -> ICS-201 briefing (stdin when no file)\n\
         \x20 ingest <dir> [--out <path>]    corpus .txt files -> JSONL chunk index\n\
         \x20 help                           show this message"
    );
}

// ── Commands ──────────────────────────────────────────────────────────────────

async fn run_plan(config: &Config, args: &[String]) -> ExitCode {
    let mut mode = GenMode::Deterministic;
    let mut notes_parts = Vec::new();
    for arg in args {
        match arg.as_str() {
            "--adaptive" => mode = GenMode::Adaptive,
            other => notes_parts.push(other.to_string()),
        }
    }
    let notes = if notes_parts.is_empty() {
        match read_stdin() {
            Ok(text) => text,
            Err(e) => {
                eprintln!("failed to read notes from stdin: {e}");
                return ExitCode::from(EXIT_CLIENT_ERROR);
            }
        }
    } else {
        notes_parts.join(" ")
    };

    let oracle = match HttpOracle::new(config) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("failed to build HTTP client: {e}");
            return ExitCode::from(EXIT_SERVER_ERROR);
        }
    };
    let retriever = Retriever::new(corpus::load_or_fallback(&config.index_path));
    let audit = AuditLogger::new(Path::new("."));

    match pipeline::generate_plan(&oracle, &retriever, &notes, mode, config.top_k, &audit).await {
        Ok(plan) => print_json(&plan),
        Err(e) => report(e),
    }
}

async fn run_briefing(config: &Config, args: &[String]) -> ExitCode {
    let raw = match args.first() {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                eprintln!("failed to read `{path}`: {e}");
                return ExitCode::from(EXIT_CLIENT_ERROR);
            }
        },
        None => match read_stdin() {
            Ok(text) => text,
            Err(e) => {
                eprintln!("failed to read plan from stdin: {e}");
                return ExitCode::from(EXIT_CLIENT_ERROR);
            }
        },
    };

    let parsed: serde_json::Value = match serde_json::from_str(&raw) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("briefing input is not valid JSON: {e}");
            return ExitCode::from(EXIT_CLIENT_ERROR);
        }
    };
    // Accept either a bare plan object or a request wrapper with a `plan` key.
    let plan = parsed.get("plan").cloned().unwrap_or(parsed);

    let oracle = match HttpOracle::new(config) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("failed to build HTTP client: {e}");
            return ExitCode::from(EXIT_SERVER_ERROR);
        }
    };
    let audit = AuditLogger::new(Path::new("."));

    match pipeline::generate_briefing(&oracle, &plan, &audit).await {
        Ok(briefing) => match serde_json::to_value(&briefing) {
            Ok(v) => print_json(&v),
            Err(e) => report(PlanError::Schema(e)),
        },
        Err(e) => report(e),
    }
}

fn run_ingest(config: &Config, args: &[String]) -> ExitCode {
    let Some(root) = args.first() else {
        eprintln!("ingest needs a corpus directory");
        return ExitCode::from(EXIT_CLIENT_ERROR);
    };
    let out = match args.get(1).map(String::as_str) {
        Some("--out") => match args.get(2) {
            Some(p) => PathBuf::from(p),
            None => {
                eprintln!("--out needs a path");
                return ExitCode::from(EXIT_CLIENT_ERROR);
            }
        },
        Some(other) => {
            eprintln!("unknown ingest option `{other}`");
            return ExitCode::from(EXIT_CLIENT_ERROR);
        }
        None => config.index_path.clone(),
    };

    match corpus::ingest_dir(Path::new(root), &out) {
        Ok(count) => {
            println!("wrote {count} chunks to {}", out.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("ingest failed: {e:#}");
            ExitCode::from(EXIT_SERVER_ERROR)
        }
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn read_stdin() -> std::io::Result<String> {
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn print_json(value: &serde_json::Value) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            println!("{text}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("failed to serialize output: {e}");
            ExitCode::from(EXIT_SERVER_ERROR)
        }
    }
}

fn report(err: PlanError) -> ExitCode {
    eprintln!("{err}");
    if err.is_client_error() {
        ExitCode::from(EXIT_CLIENT_ERROR)
    } else {
        ExitCode::from(EXIT_SERVER_ERROR)
    }
}
