use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::conversation::trigger::{TriggerDetector, DEFAULT_TRIGGER_PHRASES};
use crate::ingest::{ChunkerConfig, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::validation::PhoneRegion;

pub const DEFAULT_CONFIG_PATHS: [&str; 2] = ["docent.toml", "config/docent.toml"];
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const MAX_LLM_RETRIES: u32 = 10;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub ingest: IngestConfig,
    pub retrieval: RetrievalConfig,
    pub llm: LlmConfig,
    pub lead: LeadConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Copy, Debug)]
pub struct IngestConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl IngestConfig {
    pub fn chunker(&self) -> ChunkerConfig {
        ChunkerConfig::new(self.chunk_size, self.chunk_overlap)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RetrievalConfig {
    pub top_k: usize,
    /// Rewrite follow-up questions into standalone ones before retrieval.
    pub condense_question: bool,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl LlmConfig {
    /// Configured base URL, or the provider's public default.
    pub fn effective_base_url(&self) -> Option<&str> {
        let configured =
            self.base_url.as_deref().map(str::trim).filter(|value| !value.is_empty());
        configured.or(match self.provider {
            LlmProvider::Ollama => Some(DEFAULT_OLLAMA_BASE_URL),
            LlmProvider::OpenAi => Some(DEFAULT_OPENAI_BASE_URL),
            LlmProvider::Extractive => None,
        })
    }
}

#[derive(Clone, Debug)]
pub struct LeadConfig {
    pub trigger_phrases: Vec<String>,
    pub phone_region: PhoneRegion,
}

impl LeadConfig {
    pub fn trigger_detector(&self) -> TriggerDetector {
        TriggerDetector::new(&self.trigger_phrases)
    }
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    Ollama,
    #[serde(rename = "openai")]
    OpenAi,
    /// Offline answers quoted from the best passage; no model is called.
    Extractive,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::OpenAi => "openai",
            Self::Extractive => "extractive",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub llm_base_url: Option<String>,
    pub top_k: Option<usize>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ingest: IngestConfig {
                chunk_size: DEFAULT_CHUNK_SIZE,
                chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            },
            retrieval: RetrievalConfig { top_k: 4, condense_question: true },
            llm: LlmConfig {
                provider: LlmProvider::Ollama,
                api_key: None,
                base_url: None,
                model: "llama3.1".to_string(),
                temperature: 0.7,
                max_tokens: 512,
                timeout_secs: 30,
                max_retries: 2,
            },
            lead: LeadConfig {
                trigger_phrases: DEFAULT_TRIGGER_PHRASES.iter().map(|p| p.to_string()).collect(),
                phone_region: PhoneRegion::US,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAi),
            "extractive" => Ok(Self::Extractive),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected ollama|openai|extractive)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch)?;
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATHS[0]));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) -> Result<(), ConfigError> {
        if let Some(ingest) = patch.ingest {
            if let Some(chunk_size) = ingest.chunk_size {
                self.ingest.chunk_size = chunk_size;
            }
            if let Some(chunk_overlap) = ingest.chunk_overlap {
                self.ingest.chunk_overlap = chunk_overlap;
            }
        }

        if let Some(retrieval) = patch.retrieval {
            if let Some(top_k) = retrieval.top_k {
                self.retrieval.top_k = top_k;
            }
            if let Some(condense_question) = retrieval.condense_question {
                self.retrieval.condense_question = condense_question;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(temperature) = llm.temperature {
                self.llm.temperature = temperature;
            }
            if let Some(max_tokens) = llm.max_tokens {
                self.llm.max_tokens = max_tokens;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = llm.max_retries {
                self.llm.max_retries = max_retries;
            }
        }

        if let Some(lead) = patch.lead {
            if let Some(trigger_phrases) = lead.trigger_phrases {
                self.lead.trigger_phrases = trigger_phrases;
            }
            if let Some(phone_region) = lead.phone_region {
                self.lead.phone_region = parse_region("lead.phone_region", &phone_region)?;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("DOCENT_INGEST_CHUNK_SIZE") {
            self.ingest.chunk_size = parse_usize("DOCENT_INGEST_CHUNK_SIZE", &value)?;
        }
        if let Some(value) = read_env("DOCENT_INGEST_CHUNK_OVERLAP") {
            self.ingest.chunk_overlap = parse_usize("DOCENT_INGEST_CHUNK_OVERLAP", &value)?;
        }

        if let Some(value) = read_env("DOCENT_RETRIEVAL_TOP_K") {
            self.retrieval.top_k = parse_usize("DOCENT_RETRIEVAL_TOP_K", &value)?;
        }
        if let Some(value) = read_env("DOCENT_RETRIEVAL_CONDENSE_QUESTION") {
            self.retrieval.condense_question =
                parse_bool("DOCENT_RETRIEVAL_CONDENSE_QUESTION", &value)?;
        }

        if let Some(value) = read_env("DOCENT_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("DOCENT_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("DOCENT_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("DOCENT_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("DOCENT_LLM_TEMPERATURE") {
            self.llm.temperature = parse_f32("DOCENT_LLM_TEMPERATURE", &value)?;
        }
        if let Some(value) = read_env("DOCENT_LLM_MAX_TOKENS") {
            self.llm.max_tokens = parse_u32("DOCENT_LLM_MAX_TOKENS", &value)?;
        }
        if let Some(value) = read_env("DOCENT_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("DOCENT_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("DOCENT_LLM_MAX_RETRIES") {
            self.llm.max_retries = parse_u32("DOCENT_LLM_MAX_RETRIES", &value)?;
        }

        if let Some(value) = read_env("DOCENT_LEAD_TRIGGER_PHRASES") {
            self.lead.trigger_phrases = value
                .split(',')
                .map(str::trim)
                .filter(|phrase| !phrase.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(value) = read_env("DOCENT_LEAD_PHONE_REGION") {
            self.lead.phone_region = parse_region("DOCENT_LEAD_PHONE_REGION", &value)?;
        }

        let log_level = read_env("DOCENT_LOGGING_LEVEL").or_else(|| read_env("DOCENT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("DOCENT_LOGGING_FORMAT").or_else(|| read_env("DOCENT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(llm_base_url) = overrides.llm_base_url {
            self.llm.base_url = Some(llm_base_url);
        }
        if let Some(top_k) = overrides.top_k {
            self.retrieval.top_k = top_k;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_ingest(&self.ingest)?;
        validate_retrieval(&self.retrieval)?;
        validate_llm(&self.llm)?;
        validate_lead(&self.lead)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// The file `load` would read for `explicit_path`, if any exists.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    DEFAULT_CONFIG_PATHS.into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_ingest(ingest: &IngestConfig) -> Result<(), ConfigError> {
    if ingest.chunk_size == 0 {
        return Err(ConfigError::Validation(
            "ingest.chunk_size must be greater than zero".to_string(),
        ));
    }

    if ingest.chunk_overlap >= ingest.chunk_size {
        return Err(ConfigError::Validation(format!(
            "ingest.chunk_overlap ({}) must be smaller than ingest.chunk_size ({})",
            ingest.chunk_overlap, ingest.chunk_size
        )));
    }

    Ok(())
}

fn validate_retrieval(retrieval: &RetrievalConfig) -> Result<(), ConfigError> {
    if retrieval.top_k == 0 || retrieval.top_k > 50 {
        return Err(ConfigError::Validation("retrieval.top_k must be in range 1..=50".to_string()));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if !(0.0..=2.0).contains(&llm.temperature) {
        return Err(ConfigError::Validation(
            "llm.temperature must be in range 0.0..=2.0".to_string(),
        ));
    }

    if llm.max_tokens == 0 {
        return Err(ConfigError::Validation(
            "llm.max_tokens must be greater than zero".to_string(),
        ));
    }

    if llm.max_retries > MAX_LLM_RETRIES {
        return Err(ConfigError::Validation(format!(
            "llm.max_retries must be in range 0..={MAX_LLM_RETRIES}"
        )));
    }

    if let Some(base_url) = &llm.base_url {
        let trimmed = base_url.trim();
        if !trimmed.is_empty()
            && !trimmed.starts_with("http://")
            && !trimmed.starts_with("https://")
        {
            return Err(ConfigError::Validation(
                "llm.base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    match llm.provider {
        LlmProvider::OpenAi => {
            let missing = llm
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.api_key is required for the openai provider (set DOCENT_LLM_API_KEY)"
                        .to_string(),
                ));
            }
        }
        LlmProvider::Ollama | LlmProvider::Extractive => {}
    }

    if llm.provider != LlmProvider::Extractive && llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    Ok(())
}

fn validate_lead(lead: &LeadConfig) -> Result<(), ConfigError> {
    if lead.trigger_detector().phrases().is_empty() {
        return Err(ConfigError::Validation(
            "lead.trigger_phrases must contain at least one non-blank phrase".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse::<usize>().map_err(|_| invalid_override(key, value))
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| invalid_override(key, value))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| invalid_override(key, value))
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.trim().parse::<f32>().map_err(|_| invalid_override(key, value))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.trim().parse::<bool>().map_err(|_| invalid_override(key, value))
}

fn parse_region(key: &str, value: &str) -> Result<PhoneRegion, ConfigError> {
    value.parse::<PhoneRegion>().map_err(|error| {
        ConfigError::Validation(format!("{key}: {error} (expected an ISO 3166 code such as US)"))
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    ingest: Option<IngestPatch>,
    retrieval: Option<RetrievalPatch>,
    llm: Option<LlmPatch>,
    lead: Option<LeadPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct IngestPatch {
    chunk_size: Option<usize>,
    chunk_overlap: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct RetrievalPatch {
    top_k: Option<usize>,
    condense_question: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct LeadPatch {
    trigger_phrases: Option<Vec<String>>,
    phone_region: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
