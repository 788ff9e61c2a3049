use chrono::NaiveDate;
use clap::Args;
use docent_core::clock::{Clock, SystemClock};
use docent_core::config::{AppConfig, LoadOptions};
use docent_core::domain::lead::{LeadForm, LeadRecord};
use docent_core::lead::{CaptureStep, LeadCapture};
use serde::Serialize;

use crate::commands::{
    CommandResult, EXIT_CONFIG_INVALID, EXIT_INPUT_UNUSABLE, EXIT_VALIDATION_FAILED,
};

const COMMAND: &str = "validate";

#[derive(Debug, Clone, Default, Args)]
pub struct ValidateArgs {
    #[arg(long, default_value = "")]
    pub name: String,
    #[arg(long, default_value = "")]
    pub phone: String,
    #[arg(long, default_value = "")]
    pub email: String,
    #[arg(long, default_value = "", help = "YYYY-MM-DD or a phrase like 'next monday'")]
    pub date: String,
    #[arg(long, help = "Resolve relative dates against this YYYY-MM-DD instead of today")]
    pub today: Option<String>,
}

#[derive(Debug, Serialize)]
struct ValidateOutcome<'a> {
    command: &'static str,
    status: &'static str,
    error_class: Option<&'static str>,
    message: &'a str,
    field: Option<&'static str>,
    reason: Option<&'static str>,
    lead: Option<&'a LeadRecord>,
}

pub fn run(args: &ValidateArgs) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "config_validation",
                error.to_string(),
                EXIT_CONFIG_INVALID,
            )
        }
    };

    let today = match args.today.as_deref() {
        Some(raw) => match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
            Ok(date) => date,
            Err(_) => {
                return CommandResult::failure(
                    COMMAND,
                    "invalid_argument",
                    format!("--today must be a YYYY-MM-DD date, got `{raw}`"),
                    EXIT_INPUT_UNUSABLE,
                )
            }
        },
        None => SystemClock.today(),
    };

    let form = LeadForm::new(&args.name, &args.phone, &args.email, &args.date);
    match LeadCapture::new(config.lead.phone_region, today).submit(&form) {
        CaptureStep::Complete(lead) => CommandResult::from_payload(
            0,
            &ValidateOutcome {
                command: COMMAND,
                status: "ok",
                error_class: None,
                message: "lead details are valid",
                field: None,
                reason: None,
                lead: Some(&lead),
            },
        ),
        CaptureStep::Collecting { error, .. } => CommandResult::from_payload(
            EXIT_VALIDATION_FAILED,
            &ValidateOutcome {
                command: COMMAND,
                status: "error",
                error_class: Some("validation"),
                message: error.user_message(),
                field: Some(error.field().key()),
                reason: Some(error.reason_code()),
                lead: None,
            },
        ),
    }
}
