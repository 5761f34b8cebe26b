use crate::pipeline::completion::{
    DEFAULT_ENDPOINT, DEFAULT_MAX_ATTEMPTS, DEFAULT_MODEL, DEFAULT_RETRY_BASE_DELAY_MS,
    DEFAULT_TIMEOUT_SECS,
};
use crate::pipeline::summarize::DEFAULT_CONCURRENCY_CAP;
use crate::session::{DEFAULT_MAX_ENTRIES, DEFAULT_TTL_SECS};
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    pub endpoint: String,
    pub model: String,
    /// Resolved from the environment, never from the config file.
    #[serde(skip)]
    pub api_key: String,
    pub timeout_secs: u64,
    pub retry_max_attempts: u32,
    pub retry_base_delay_ms: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retry_max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Word budget per summarization chunk.
    pub chunk_words: usize,
    /// Word ceiling for the rendered question-answering prompt.
    pub answer_prompt_words: usize,
    /// Maximum concurrent completion requests per summarize call.
    pub concurrency_cap: usize,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            chunk_words: 400,
            answer_prompt_words: 4_000,
            concurrency_cap: DEFAULT_CONCURRENCY_CAP,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub max_entries: usize,
    pub ttl_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            ttl_secs: DEFAULT_TTL_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub completion: CompletionConfig,
    pub budgets: BudgetConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct PartialAppConfig {
    server: Option<ServerConfig>,
    completion: Option<CompletionConfig>,
    budgets: Option<BudgetConfig>,
    session: Option<SessionConfig>,
}

fn env_non_empty(var: &str) -> Option<String> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

fn env_or_string(var: &str, fallback: &str) -> String {
    env_non_empty(var).unwrap_or_else(|| fallback.to_string())
}

fn env_or_u64(var: &str, fallback: u64) -> u64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_u32(var: &str, fallback: u32) -> u32 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u32>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_usize(var: &str, fallback: usize) -> usize {
    match env::var(var) {
        Ok(v) => v.trim().parse::<usize>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_u16(var: &str, fallback: u16) -> u16 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u16>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn resolve_api_key() -> Option<String> {
    env_non_empty("DOCGIST_API_KEY")
        .or_else(|| env_non_empty("DEEPSEEK_API_KEY"))
        .or_else(|| env_non_empty("AI_API_KEY"))
}

fn validate(cfg: &AppConfig) -> Result<()> {
    if cfg.server.host.trim().is_empty() {
        return Err(anyhow!("invalid server host: cannot be empty"));
    }
    if !cfg.completion.endpoint.starts_with("http://")
        && !cfg.completion.endpoint.starts_with("https://")
    {
        return Err(anyhow!(
            "invalid completion endpoint: must be an http(s) URL"
        ));
    }
    if cfg.completion.model.trim().is_empty() {
        return Err(anyhow!("invalid completion model: cannot be empty"));
    }
    if cfg.completion.timeout_secs == 0 {
        return Err(anyhow!("invalid completion timeout: must be >= 1 second"));
    }
    if cfg.completion.retry_max_attempts == 0 {
        return Err(anyhow!("invalid retry attempts: must be >= 1"));
    }
    if cfg.budgets.chunk_words == 0 {
        return Err(anyhow!("invalid chunk word budget: must be >= 1"));
    }
    if cfg.budgets.answer_prompt_words == 0 {
        return Err(anyhow!("invalid answer prompt budget: must be >= 1"));
    }
    if cfg.budgets.concurrency_cap == 0 {
        return Err(anyhow!("invalid concurrency cap: must be >= 1"));
    }
    if cfg.session.max_entries == 0 {
        return Err(anyhow!("invalid session capacity: must be >= 1"));
    }
    if cfg.session.ttl_secs == 0 {
        return Err(anyhow!("invalid session ttl: must be >= 1 second"));
    }
    Ok(())
}

fn resolve_config_path() -> Option<PathBuf> {
    if let Some(custom) = env_non_empty("DOCGIST_CONFIG_PATH") {
        return Some(PathBuf::from(custom));
    }

    let home = dirs::home_dir()?;
    Some(home.join(".docgist").join("config.toml"))
}

fn merge_file_config(base: &mut AppConfig) -> Result<()> {
    let Some(path) = resolve_config_path() else {
        return Ok(());
    };
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(&path)?;
    let parsed: PartialAppConfig = toml::from_str(&raw)
        .map_err(|err| anyhow!("failed to parse config {}: {err}", path.display()))?;
    if let Some(server) = parsed.server {
        base.server = server;
    }
    if let Some(completion) = parsed.completion {
        base.completion = completion;
    }
    if let Some(budgets) = parsed.budgets {
        base.budgets = budgets;
    }
    if let Some(session) = parsed.session {
        base.session = session;
    }
    Ok(())
}

pub fn load_config() -> Result<AppConfig> {
    let mut cfg = AppConfig::default();
    merge_file_config(&mut cfg)?;

    cfg.server.host = env_or_string("DOCGIST_HOST", &cfg.server.host);
    cfg.server.port = env_or_u16("DOCGIST_PORT", cfg.server.port);
    cfg.completion.endpoint =
        env_or_string("DOCGIST_COMPLETION_ENDPOINT", &cfg.completion.endpoint);
    cfg.completion.model = env_or_string("DOCGIST_COMPLETION_MODEL", &cfg.completion.model);
    cfg.completion.api_key = resolve_api_key().unwrap_or_default();
    cfg.completion.timeout_secs = env_or_u64(
        "DOCGIST_COMPLETION_TIMEOUT_SECS",
        cfg.completion.timeout_secs,
    );
    cfg.completion.retry_max_attempts = env_or_u32(
        "DOCGIST_RETRY_MAX_ATTEMPTS",
        cfg.completion.retry_max_attempts,
    );
    cfg.completion.retry_base_delay_ms = env_or_u64(
        "DOCGIST_RETRY_BASE_DELAY_MS",
        cfg.completion.retry_base_delay_ms,
    );
    cfg.budgets.chunk_words = env_or_usize("DOCGIST_CHUNK_WORDS", cfg.budgets.chunk_words);
    cfg.budgets.answer_prompt_words = env_or_usize(
        "DOCGIST_ANSWER_PROMPT_WORDS",
        cfg.budgets.answer_prompt_words,
    );
    cfg.budgets.concurrency_cap =
        env_or_usize("DOCGIST_CONCURRENCY_CAP", cfg.budgets.concurrency_cap);
    cfg.session.max_entries = env_or_usize("DOCGIST_SESSION_MAX_ENTRIES", cfg.session.max_entries);
    cfg.session.ttl_secs = env_or_u64("DOCGIST_SESSION_TTL_SECS", cfg.session.ttl_secs);

    validate(&cfg)?;
    Ok(cfg)
}
