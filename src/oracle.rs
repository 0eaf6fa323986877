use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::{config::Config, types::GenMode};

// ── Conversation message types ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    Developer,
    User,
    Assistant,
}

impl Role {
    fn wire_name(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Developer => "developer",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
    pub fn developer(content: impl Into<String>) -> Self {
        Self {
            role: Role::Developer,
            content: content.into(),
        }
    }
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// ── Sampling profiles ─────────────────────────────────────────────────────────

/// Deterministic mode pins a seed and a near-zero temperature so repeated
/// calls with identical input are expected to be byte-similar; adaptive mode
/// samples hotter to diversify candidates.
#[derive(Debug, Clone, Copy)]
struct Sampling {
    temperature: f32,
    top_p: Option<f32>,
    seed: Option<u64>,
}

const DETERMINISTIC_SAMPLING: Sampling = Sampling {
    temperature: 0.1,
    top_p: None,
    seed: Some(7),
};

const ADAPTIVE_SAMPLING: Sampling = Sampling {
    temperature: 0.9,
    top_p: Some(0.95),
    seed: None,
};

fn sampling_for(mode: GenMode) -> Sampling {
    match mode {
        GenMode::Deterministic => DETERMINISTIC_SAMPLING,
        GenMode::Adaptive => ADAPTIVE_SAMPLING,
    }
}

// ── Oracle boundary ───────────────────────────────────────────────────────────

/// Text-completion backend as seen by the pipeline. Implementations must not
/// panic; transport and backend failures come back as `Err`, which the plan
/// path treats exactly like unparsable output (the candidate is dropped) and
/// the briefing path surfaces as a server error.
pub trait Oracle {
    async fn complete(&self, messages: &[Message], mode: GenMode) -> Result<String>;
}

// ── OpenAI-compatible chat-completions wire types ─────────────────────────────

#[derive(Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiChoiceMessage,
}

#[derive(Deserialize)]
struct ApiChoiceMessage {
    content: Option<String>,
}

// ── HTTP backend ──────────────────────────────────────────────────────────────

pub fn build_http_client(timeout_ms: u64) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .timeout(std::time::Duration::from_millis(timeout_ms))
        .connect_timeout(std::time::Duration::from_secs(10));

    if let Ok(proxy_url) = std::env::var("HTTP_PROXY") {
        builder = builder.proxy(reqwest::Proxy::all(&proxy_url)?);
    }

    builder.build().map_err(Into::into)
}

#[derive(Debug, Clone)]
pub struct HttpOracle {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl HttpOracle {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: build_http_client(config.timeout_ms)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    fn build_request(&self, messages: &[Message], mode: GenMode) -> ApiRequest {
        let sampling = sampling_for(mode);
        ApiRequest {
            model: self.model.clone(),
            messages: messages
                .iter()
                .map(|m| ApiMessage {
                    role: m.role.wire_name(),
                    content: m.content.clone(),
                })
                .collect(),
            temperature: sampling.temperature,
            top_p: sampling.top_p,
            seed: sampling.seed,
            max_tokens: Some(2048),
        }
    }
}

impl Oracle for HttpOracle {
    async fn complete(&self, messages: &[Message], mode: GenMode) -> Result<String> {
        let body = self.build_request(messages, mode);

        let mut req = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body);
        if let Some(key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {key}"));
        }

        let resp = req.send().await.context("HTTP request failed")?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow!("API error {status}: {text}"));
        }

        let parsed: ApiResponse = resp.json().await.context("failed to parse API response")?;
        let text = parsed
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .unwrap_or_default()
            .to_string();

        if text.is_empty() {
            return Err(anyhow!("API returned empty content"));
        }
        Ok(text)
    }
}
