pub mod controller;
pub mod reply;
pub mod trigger;

pub use controller::{ConversationController, IngestOutcome, DEFAULT_TOP_K};
pub use reply::{LeadPrompt, PromptField, Reply, LEAD_CONFIRMATION_MESSAGE, LEAD_PROMPT_MESSAGE};
pub use trigger::{TriggerDetector, DEFAULT_TRIGGER_PHRASES};
