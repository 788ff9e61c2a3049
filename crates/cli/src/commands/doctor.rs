use std::sync::Arc;
use std::time::Instant;

use docent_agent::{client_from_config, LlmClient};
use docent_core::config::{AppConfig, LlmProvider, LoadOptions};
use docent_core::validation::{validate_phone, PhoneRegion};
use serde::Serialize;

use crate::commands::{CommandResult, EXIT_RUNTIME_FAILURE};

const READINESS_PROMPT: &str = "Reply with the single word OK.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let passed = report.overall_status == CheckStatus::Pass;
    let exit_code = if passed { 0 } else { EXIT_RUNTIME_FAILURE };

    if json_output {
        let output = serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
        return CommandResult { exit_code, output };
    }

    CommandResult { exit_code, output: render_human(&report) }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_phone_region(&config));
            checks.push(check_llm_provider(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(skipped("phone_region_metadata"));
            checks.push(skipped("llm_provider"));
        }
    }

    let all_pass = checks.iter().all(|check| check.status != CheckStatus::Fail);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn skipped(name: &'static str) -> DoctorCheck {
    DoctorCheck {
        name,
        status: CheckStatus::Skipped,
        details: "skipped because configuration did not load".to_string(),
    }
}

/// Only the US region has a known-good sample to probe with.
fn check_phone_region(config: &AppConfig) -> DoctorCheck {
    let region = config.lead.phone_region;
    if region != PhoneRegion::US {
        return DoctorCheck {
            name: "phone_region_metadata",
            status: CheckStatus::Pass,
            details: format!("region {region} configured"),
        };
    }

    match validate_phone("(201) 555-0123", region) {
        Ok(normalized) => DoctorCheck {
            name: "phone_region_metadata",
            status: CheckStatus::Pass,
            details: format!("sample number normalized to {normalized}"),
        },
        Err(error) => DoctorCheck {
            name: "phone_region_metadata",
            status: CheckStatus::Fail,
            details: format!("phone metadata rejected a known-good sample: {error}"),
        },
    }
}

fn check_llm_provider(config: &AppConfig) -> DoctorCheck {
    if config.llm.provider == LlmProvider::Extractive {
        return DoctorCheck {
            name: "llm_provider",
            status: CheckStatus::Pass,
            details: "extractive answers need no model".to_string(),
        };
    }

    let client = match client_from_config(&config.llm) {
        Ok(Some(client)) => client,
        Ok(None) => {
            return DoctorCheck {
                name: "llm_provider",
                status: CheckStatus::Skipped,
                details: "no model client configured".to_string(),
            }
        }
        Err(error) => {
            return DoctorCheck {
                name: "llm_provider",
                status: CheckStatus::Fail,
                details: format!("{error:#}"),
            }
        }
    };

    probe_llm(config, client)
}

fn probe_llm(config: &AppConfig, client: Arc<dyn LlmClient>) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "llm_provider",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let started = Instant::now();
    let target = format!(
        "{} model `{}` at {}",
        config.llm.provider.as_str(),
        config.llm.model,
        config.llm.effective_base_url().unwrap_or("<unset>")
    );
    match runtime.block_on(client.complete(READINESS_PROMPT)) {
        Ok(_) => DoctorCheck {
            name: "llm_provider",
            status: CheckStatus::Pass,
            details: format!("{target} answered in {}ms", started.elapsed().as_millis()),
        },
        Err(error) => DoctorCheck {
            name: "llm_provider",
            status: CheckStatus::Fail,
            details: format!("{target} did not answer: {error:#}"),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
