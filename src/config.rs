use std::path::PathBuf;

pub const ENV_BASE_URL: &str = "RELIEF_BASE_URL";
pub const ENV_API_KEY: &str = "RELIEF_API_KEY";
pub const ENV_MODEL: &str = "RELIEF_MODEL";
pub const ENV_INDEX_PATH: &str = "RELIEF_INDEX_PATH";
pub const ENV_TOP_K: &str = "RELIEF_TOP_K";
pub const ENV_TIMEOUT_MS: &str = "RELIEF_TIMEOUT_MS";

pub const CONFIG_FILE_NAME: &str = "reliefbot.toml";

const DEFAULT_BASE_URL: &str = "http://localhost:11434/v1";
const DEFAULT_MODEL: &str = "gpt-oss-20b";
const DEFAULT_INDEX_PATH: &str = "data/index/chunks.jsonl";
const DEFAULT_TOP_K: usize = 5;
const DEFAULT_TIMEOUT_MS: u64 = 120_000;

/// Runtime settings, resolved from `reliefbot.toml` (when present) with
/// environment variables taking precedence. Unknown or malformed values are
/// reported as warnings instead of aborting startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub index_path: PathBuf,
    pub top_k: usize,
    pub timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            index_path: PathBuf::from(DEFAULT_INDEX_PATH),
            top_k: DEFAULT_TOP_K,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl Config {
    /// Resolve the effective config: defaults, then `reliefbot.toml` in the
    /// working directory, then environment overrides.
    pub fn load() -> (Self, Vec<String>) {
        let mut cfg = Self::default();
        let mut warnings = Vec::new();

        if let Ok(text) = std::fs::read_to_string(CONFIG_FILE_NAME) {
            match apply_toml(&mut cfg, &text) {
                Ok(mut w) => warnings.append(&mut w),
                Err(e) => warnings.push(format!("{CONFIG_FILE_NAME}: {e}")),
            }
        }

        apply_env(&mut cfg, &mut warnings);
        (cfg, warnings)
    }
}

fn apply_toml(cfg: &mut Config, text: &str) -> Result<Vec<String>, String> {
    let doc: toml::Value = toml::from_str(text).map_err(|e| format!("not valid TOML: {e}"))?;
    let Some(table) = doc.as_table() else {
        return Err("top level must be a table".to_string());
    };

    let mut warnings = Vec::new();
    for (key, val) in table {
        match key.as_str() {
            "base_url" => assign_str(&mut cfg.base_url, key, val, &mut warnings),
            "api_key" => {
                if let Some(s) = val.as_str() {
                    cfg.api_key = Some(s.to_string());
                } else {
                    warnings.push(format!("config key `{key}` must be a string"));
                }
            }
            "model" => assign_str(&mut cfg.model, key, val, &mut warnings),
            "index_path" => {
                if let Some(s) = val.as_str() {
                    cfg.index_path = PathBuf::from(s);
                } else {
                    warnings.push(format!("config key `{key}` must be a string"));
                }
            }
            "top_k" => match val.as_integer() {
                Some(n) if n > 0 => cfg.top_k = n as usize,
                _ => warnings.push(format!("config key `{key}` must be a positive integer")),
            },
            "timeout_ms" => match val.as_integer() {
                Some(n) if n > 0 => cfg.timeout_ms = n as u64,
                _ => warnings.push(format!("config key `{key}` must be a positive integer")),
            },
            other => warnings.push(format!("unknown config key `{other}` ignored")),
        }
    }
    Ok(warnings)
}

fn assign_str(slot: &mut String, key: &str, val: &toml::Value, warnings: &mut Vec<String>) {
    if let Some(s) = val.as_str() {
        *slot = s.to_string();
    } else {
        warnings.push(format!("config key `{key}` must be a string"));
    }
}

fn apply_env(cfg: &mut Config, warnings: &mut Vec<String>) {
    if let Some(v) = non_empty_env(ENV_BASE_URL) {
        cfg.base_url = v;
    }
    if let Some(v) = non_empty_env(ENV_API_KEY) {
        cfg.api_key = Some(v);
    }
    if let Some(v) = non_empty_env(ENV_MODEL) {
        cfg.model = v;
    }
    if let Some(v) = non_empty_env(ENV_INDEX_PATH) {
        cfg.index_path = PathBuf::from(v);
    }
    if let Some(v) = non_empty_env(ENV_TOP_K) {
        match v.parse::<usize>() {
            Ok(n) if n > 0 => cfg.top_k = n,
            _ => warnings.push(format!("{ENV_TOP_K} must be a positive integer, got `{v}`")),
        }
    }
    if let Some(v) = non_empty_env(ENV_TIMEOUT_MS) {
        match v.parse::<u64>() {
            Ok(n) if n > 0 => cfg.timeout_ms = n,
            _ => warnings.push(format!("{ENV_TIMEOUT_MS} must be a positive integer, got `{v}`")),
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::{Config, apply_toml};

    #[test]
    fn toml_overrides_known_keys() {
        let mut cfg = Config::default();
        let warnings = apply_toml(
            &mut cfg,
            "base_url = \"http://example:8000/v1\"\ntop_k = 3\n",
        )
        .expect("valid toml");
        assert!(warnings.is_empty());
        assert_eq!(cfg.base_url, "http://example:8000/v1");
        assert_eq!(cfg.top_k, 3);
    }

    #[test]
    fn toml_unknown_key_warns_but_keeps_defaults() {
        let mut cfg = Config::default();
        let warnings = apply_toml(&mut cfg, "colour = \"mauve\"\n").expect("valid toml");
        assert_eq!(warnings.len(), 1);
        assert_eq!(cfg.top_k, Config::default().top_k);
    }

    #[test]
    fn toml_wrong_type_warns() {
        let mut cfg = Config::default();
        let warnings = apply_toml(&mut cfg, "top_k = \"five\"\n").expect("valid toml");
        assert_eq!(warnings.len(), 1);
        assert_eq!(cfg.top_k, Config::default().top_k);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let mut cfg = Config::default();
        assert!(apply_toml(&mut cfg, "top_k = [").is_err());
    }
}
