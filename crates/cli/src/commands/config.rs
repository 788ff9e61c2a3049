use std::env;
use std::fs;
use std::path::Path;

use docent_core::config::{resolve_config_path, AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

struct FieldSources<'a> {
    file_doc: Option<&'a Value>,
    file_path: Option<&'a Path>,
}

impl FieldSources<'_> {
    fn line(&self, key_path: &str, value: &str, env_keys: &[&str]) -> String {
        let source = field_source(key_path, env_keys, self.file_doc, self.file_path);
        format!("- {key_path} = {value} (source: {source})")
    }
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let sources =
        FieldSources { file_doc: config_file_doc.as_ref(), file_path: config_file_path.as_deref() };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(sources.line(
        "ingest.chunk_size",
        &config.ingest.chunk_size.to_string(),
        &["DOCENT_INGEST_CHUNK_SIZE"],
    ));
    lines.push(sources.line(
        "ingest.chunk_overlap",
        &config.ingest.chunk_overlap.to_string(),
        &["DOCENT_INGEST_CHUNK_OVERLAP"],
    ));

    lines.push(sources.line(
        "retrieval.top_k",
        &config.retrieval.top_k.to_string(),
        &["DOCENT_RETRIEVAL_TOP_K"],
    ));
    lines.push(sources.line(
        "retrieval.condense_question",
        &config.retrieval.condense_question.to_string(),
        &["DOCENT_RETRIEVAL_CONDENSE_QUESTION"],
    ));

    lines.push(sources.line(
        "llm.provider",
        config.llm.provider.as_str(),
        &["DOCENT_LLM_PROVIDER"],
    ));
    lines.push(sources.line("llm.model", &config.llm.model, &["DOCENT_LLM_MODEL"]));
    lines.push(sources.line(
        "llm.base_url",
        config.llm.effective_base_url().unwrap_or("<unset>"),
        &["DOCENT_LLM_BASE_URL"],
    ));
    let llm_api_key = match &config.llm.api_key {
        Some(key) => redact_key(key.expose_secret()),
        None => "<unset>".to_string(),
    };
    lines.push(sources.line("llm.api_key", &llm_api_key, &["DOCENT_LLM_API_KEY"]));
    lines.push(sources.line(
        "llm.temperature",
        &config.llm.temperature.to_string(),
        &["DOCENT_LLM_TEMPERATURE"],
    ));
    lines.push(sources.line(
        "llm.max_tokens",
        &config.llm.max_tokens.to_string(),
        &["DOCENT_LLM_MAX_TOKENS"],
    ));
    lines.push(sources.line(
        "llm.timeout_secs",
        &config.llm.timeout_secs.to_string(),
        &["DOCENT_LLM_TIMEOUT_SECS"],
    ));
    lines.push(sources.line(
        "llm.max_retries",
        &config.llm.max_retries.to_string(),
        &["DOCENT_LLM_MAX_RETRIES"],
    ));

    lines.push(sources.line(
        "lead.trigger_phrases",
        &config.lead.trigger_phrases.join(", "),
        &["DOCENT_LEAD_TRIGGER_PHRASES"],
    ));
    lines.push(sources.line(
        "lead.phone_region",
        &config.lead.phone_region.to_string(),
        &["DOCENT_LEAD_PHONE_REGION"],
    ));

    lines.push(sources.line(
        "logging.level",
        &config.logging.level,
        &["DOCENT_LOGGING_LEVEL", "DOCENT_LOG_LEVEL"],
    ));
    lines.push(sources.line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        &["DOCENT_LOGGING_FORMAT", "DOCENT_LOG_FORMAT"],
    ));

    lines.join("\n")
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    for env_key in env_keys {
        if env::var(env_key).map(|value| !value.trim().is_empty()).unwrap_or(false) {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

/// Keeps a short vendor prefix such as `sk-` so operators can tell keys apart.
fn redact_key(key: &str) -> String {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        if prefix.len() <= 4 {
            return format!("{prefix}-***");
        }
    }

    "<redacted>".to_string()
}
