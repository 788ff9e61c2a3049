use serde::{Deserialize, Serialize};

pub const DEFAULT_TRIGGER_PHRASES: [&str; 4] = ["call me", "contact me", "schedule", "book"];

/// Substring match of lowercased utterances against contact-intent phrases.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerDetector {
    phrases: Vec<String>,
}

impl Default for TriggerDetector {
    fn default() -> Self {
        Self::new(DEFAULT_TRIGGER_PHRASES)
    }
}

impl TriggerDetector {
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let phrases = phrases
            .into_iter()
            .map(|phrase| phrase.as_ref().trim().to_lowercase())
            .filter(|phrase| !phrase.is_empty())
            .collect();
        Self { phrases }
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    /// First configured phrase found in `utterance`, in configuration order.
    pub fn detect(&self, utterance: &str) -> Option<&str> {
        let normalized = utterance.to_lowercase();
        self.phrases
            .iter()
            .find(|phrase| normalized.contains(phrase.as_str()))
            .map(String::as_str)
    }
}
