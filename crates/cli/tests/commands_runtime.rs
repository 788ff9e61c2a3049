use std::env;
use std::fs;
use std::io::Cursor;
use std::sync::{Mutex, OnceLock};

use docent_cli::commands::validate::ValidateArgs;
use docent_cli::commands::{chat, config, doctor, validate};
use docent_core::config::{AppConfig, LlmProvider};
use serde_json::Value;

fn lead_args(phone: &str, email: &str, date: &str) -> ValidateArgs {
    ValidateArgs {
        name: "Jo Park".to_string(),
        phone: phone.to_string(),
        email: email.to_string(),
        date: date.to_string(),
        today: Some("2024-06-10".to_string()),
    }
}

#[test]
fn validate_normalizes_a_complete_lead() {
    with_env(&[], || {
        let result = validate::run(&lead_args("(201) 555-0123", "jo@example.com", "next monday"));
        assert_eq!(result.exit_code, 0, "expected valid lead: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "validate");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["lead"]["phone"], "+12015550123");
        assert_eq!(payload["lead"]["email"], "jo@example.com");
        assert_eq!(payload["lead"]["date"], "2024-06-17");
    });
}

#[test]
fn validate_reports_short_phone_before_email() {
    with_env(&[], || {
        let result = validate::run(&lead_args("555-0100", "not-an-email", "2024-07-01"));
        assert_eq!(result.exit_code, 1, "expected validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "validation");
        assert_eq!(payload["field"], "phone");
        assert!(payload["lead"].is_null());
    });
}

#[test]
fn validate_reports_missing_field_first() {
    with_env(&[], || {
        let result = validate::run(&lead_args("555-0100", "", "someday"));
        assert_eq!(result.exit_code, 1);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["field"], "email");
        assert_eq!(payload["reason"], "missing_field");
    });
}

#[test]
fn validate_rejects_malformed_reference_date() {
    with_env(&[], || {
        let mut args = lead_args("(201) 555-0123", "jo@example.com", "next monday");
        args.today = Some("10/06/2024".to_string());

        let result = validate::run(&args);
        assert_eq!(result.exit_code, 3, "expected unusable input code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "invalid_argument");
    });
}

#[test]
fn validate_returns_config_failure_for_bad_region() {
    with_env(&[("DOCENT_LEAD_PHONE_REGION", "Atlantis")], || {
        let result = validate::run(&lead_args("(201) 555-0123", "jo@example.com", "2024-07-01"));
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn config_redacts_api_key_and_attributes_env_sources() {
    with_env(
        &[
            ("DOCENT_LLM_PROVIDER", "openai"),
            ("DOCENT_LLM_API_KEY", "sk-live-very-secret"),
            ("DOCENT_RETRIEVAL_TOP_K", "6"),
        ],
        || {
            let output = config::run();
            assert!(output.contains("llm.api_key = sk-*** (source: env (DOCENT_LLM_API_KEY))"));
            assert!(output.contains("retrieval.top_k = 6 (source: env (DOCENT_RETRIEVAL_TOP_K))"));
            assert!(output.contains("llm.base_url = https://api.openai.com (source: default)"));
            assert!(!output.contains("very-secret"), "secret leaked: {output}");
        },
    );
}

#[test]
fn config_reports_validation_failure() {
    with_env(&[("DOCENT_LLM_PROVIDER", "openai")], || {
        let output = config::run();
        assert!(output.starts_with("config validation failed"), "{output}");
        assert!(output.contains("llm.api_key"));
    });
}

#[test]
fn doctor_passes_for_extractive_provider() {
    with_env(&[("DOCENT_LLM_PROVIDER", "extractive")], || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 0, "expected doctor pass: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["overall_status"], "pass");
        let checks = payload["checks"].as_array().expect("checks array");
        let llm = checks.iter().find(|check| check["name"] == "llm_provider").expect("llm check");
        assert_eq!(llm["status"], "pass");
    });
}

#[test]
fn doctor_skips_dependent_checks_when_config_fails() {
    with_env(&[("DOCENT_INGEST_CHUNK_OVERLAP", "5000")], || {
        let result = doctor::run(false);
        assert_eq!(result.exit_code, 4, "expected runtime failure code");
        assert!(result.output.contains("- [fail] config_validation"));
        assert!(result.output.contains("- [skip] llm_provider"));
    });
}

#[test]
fn chat_answers_then_captures_a_lead() {
    let dir = tempfile::tempdir().expect("temp dir");
    let doc = dir.path().join("handbook.txt");
    fs::write(&doc, "Refunds are processed within five business days.\n").expect("write doc");

    let mut config = AppConfig::default();
    config.llm.provider = LlmProvider::Extractive;

    let script = "how long do refunds take?\n\
                  please schedule a call\n\
                  Jo Park\n\
                  (201) 555-0123\n\
                  jo@example.com\n\
                  2030-01-15\n\
                  exit\n";
    let mut input = Cursor::new(script.as_bytes().to_vec());
    let mut output = Vec::new();

    let result = chat::run_with_io(&config, &[doc], &mut input, &mut output);
    assert_eq!(result.exit_code, 0, "expected chat success: {}", result.output);

    let transcript = String::from_utf8(output).expect("utf8 transcript");
    assert!(transcript.contains("Assistant: Refunds are processed within five business days."));
    assert!(transcript.contains("Please provide your information:"));
    assert!(transcript.contains("Information collected successfully! We'll contact you soon."));

    let payload = parse_payload(&result.output);
    assert_eq!(payload["status"], "ok");
    assert_eq!(payload["message"], "session ended after 1 answered question(s); lead captured");
}

#[test]
fn chat_reprompts_with_prefill_after_invalid_email() {
    let dir = tempfile::tempdir().expect("temp dir");
    let doc = dir.path().join("faq.txt");
    fs::write(&doc, "Support is available on weekdays.").expect("write doc");

    let mut config = AppConfig::default();
    config.llm.provider = LlmProvider::Extractive;

    // Blank lines on the second pass accept the prefilled values.
    let script = "contact me\n\
                  Jo Park\n\
                  (201) 555-0123\n\
                  jo-at-example\n\
                  2030-01-15\n\
                  \n\
                  \n\
                  jo@example.com\n\
                  2030-01-15\n";
    let mut input = Cursor::new(script.as_bytes().to_vec());
    let mut output = Vec::new();

    let result = chat::run_with_io(&config, &[doc], &mut input, &mut output);
    assert_eq!(result.exit_code, 0, "expected chat success: {}", result.output);

    let transcript = String::from_utf8(output).expect("utf8 transcript");
    assert!(transcript.contains("Phone Number [+12015550123]: "));
    assert!(transcript.contains("Information collected successfully!"));
}

#[test]
fn chat_fails_on_unreadable_document() {
    let dir = tempfile::tempdir().expect("temp dir");
    let missing = dir.path().join("missing.txt");

    let mut config = AppConfig::default();
    config.llm.provider = LlmProvider::Extractive;

    let mut input = Cursor::new(Vec::new());
    let mut output = Vec::new();
    let result = chat::run_with_io(&config, &[missing], &mut input, &mut output);
    assert_eq!(result.exit_code, 3, "expected unusable input code");

    let payload = parse_payload(&result.output);
    assert_eq!(payload["error_class"], "document_read");
}

#[test]
fn chat_fails_on_blank_documents() {
    let dir = tempfile::tempdir().expect("temp dir");
    let doc = dir.path().join("blank.txt");
    fs::write(&doc, "   \n").expect("write doc");

    let mut config = AppConfig::default();
    config.llm.provider = LlmProvider::Extractive;

    let mut input = Cursor::new(Vec::new());
    let mut output = Vec::new();
    let result = chat::run_with_io(&config, &[doc], &mut input, &mut output);
    assert_eq!(result.exit_code, 3);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["error_class"], "ingest");
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "DOCENT_INGEST_CHUNK_SIZE",
        "DOCENT_INGEST_CHUNK_OVERLAP",
        "DOCENT_RETRIEVAL_TOP_K",
        "DOCENT_RETRIEVAL_CONDENSE_QUESTION",
        "DOCENT_LLM_PROVIDER",
        "DOCENT_LLM_API_KEY",
        "DOCENT_LLM_BASE_URL",
        "DOCENT_LLM_MODEL",
        "DOCENT_LLM_TEMPERATURE",
        "DOCENT_LLM_MAX_TOKENS",
        "DOCENT_LLM_TIMEOUT_SECS",
        "DOCENT_LLM_MAX_RETRIES",
        "DOCENT_LEAD_TRIGGER_PHRASES",
        "DOCENT_LEAD_PHONE_REGION",
        "DOCENT_LOGGING_LEVEL",
        "DOCENT_LOGGING_FORMAT",
        "DOCENT_LOG_LEVEL",
        "DOCENT_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
