use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::document::IndexHandle;
use crate::domain::lead::{LeadRecord, PartialLead};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Speaker {
    User,
    Assistant,
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => f.write_str("User"),
            Self::Assistant => f.write_str("Assistant"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    speaker: Speaker,
    text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self { speaker: Speaker::User, text: text.into() }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self { speaker: Speaker::Assistant, text: text.into() }
    }

    pub fn speaker(&self) -> Speaker {
        self.speaker
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionMode {
    Answering,
    CapturingLead { partial: PartialLead },
}

/// State for one user's interaction.
///
/// Fields are private so the controller is the only writer: history only ever
/// grows, the index is set at most once, and a lead exists only when complete.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    index: Option<IndexHandle>,
    history: Vec<Turn>,
    mode: SessionMode,
    lead: Option<LeadRecord>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with_id(SessionId::generate())
    }

    pub fn with_id(id: SessionId) -> Self {
        Self { id, index: None, history: Vec::new(), mode: SessionMode::Answering, lead: None }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn index(&self) -> Option<&IndexHandle> {
        self.index.as_ref()
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn mode(&self) -> &SessionMode {
        &self.mode
    }

    pub fn is_capturing_lead(&self) -> bool {
        matches!(self.mode, SessionMode::CapturingLead { .. })
    }

    pub fn partial_lead(&self) -> Option<&PartialLead> {
        match &self.mode {
            SessionMode::CapturingLead { partial } => Some(partial),
            SessionMode::Answering => None,
        }
    }

    pub fn lead(&self) -> Option<&LeadRecord> {
        self.lead.as_ref()
    }

    /// History as `Speaker: text` lines, oldest first.
    pub fn transcript(&self) -> String {
        self.history
            .iter()
            .map(|turn| format!("{}: {}", turn.speaker(), turn.text()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Returns false and leaves the existing handle untouched if one is already set.
    pub(crate) fn attach_index(&mut self, index: IndexHandle) -> bool {
        if self.index.is_some() {
            return false;
        }
        self.index = Some(index);
        true
    }

    pub(crate) fn record_exchange(&mut self, question: &str, answer: &str) {
        self.history.push(Turn::user(question));
        self.history.push(Turn::assistant(answer));
    }

    /// Returns false if capture was already in progress.
    pub(crate) fn begin_lead_capture(&mut self) -> bool {
        if self.is_capturing_lead() {
            return false;
        }
        self.mode = SessionMode::CapturingLead { partial: PartialLead::new() };
        true
    }

    pub(crate) fn remember_partial(&mut self, validated: PartialLead) {
        if let SessionMode::CapturingLead { partial } = &mut self.mode {
            *partial = validated;
        }
    }

    pub(crate) fn complete_lead(&mut self, record: LeadRecord) {
        self.lead = Some(record);
        self.mode = SessionMode::Answering;
    }
}
