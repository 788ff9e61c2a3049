use serde::{Deserialize, Serialize};

use crate::domain::lead::{LeadField, LeadRecord, PartialLead};

pub const LEAD_PROMPT_MESSAGE: &str = "Please provide your information:";
pub const LEAD_CONFIRMATION_MESSAGE: &str =
    "Information collected successfully! We'll contact you soon.";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptField {
    pub field: LeadField,
    pub label: String,
    /// Value that already validated on an earlier submission.
    pub prefill: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadPrompt {
    pub message: String,
    pub fields: Vec<PromptField>,
}

impl LeadPrompt {
    pub fn new(partial: &PartialLead) -> Self {
        let fields = LeadField::ALL
            .into_iter()
            .map(|field| PromptField {
                field,
                label: field.label().to_string(),
                prefill: partial.get(&field).cloned(),
            })
            .collect();
        Self { message: LEAD_PROMPT_MESSAGE.to_string(), fields }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reply {
    Answer(String),
    LeadPrompt(LeadPrompt),
    LeadCaptured { message: String, lead: LeadRecord },
}

impl Reply {
    pub fn text(&self) -> &str {
        match self {
            Self::Answer(answer) => answer,
            Self::LeadPrompt(prompt) => &prompt.message,
            Self::LeadCaptured { message, .. } => message,
        }
    }
}
