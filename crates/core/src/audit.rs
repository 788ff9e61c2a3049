use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::document::IndexHandle;
use crate::domain::lead::LeadField;
use crate::domain::session::SessionId;

/// Something that happened in a session, as handed to downstream systems.
///
/// Lead variants name fields and reason codes only, so a record built from
/// one can never carry a contact detail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    IndexBuilt { index: IndexHandle },
    IngestSkipped,
    Answered { passages: usize },
    AnswerFailed { error: String },
    CaptureStarted { trigger: String },
    LeadRejected { field: LeadField, reason: &'static str },
    LeadCaptured,
}

impl SessionEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::IndexBuilt { .. } => "ingest.index_built",
            Self::IngestSkipped => "ingest.skipped_already_indexed",
            Self::Answered { .. } => "conversation.answered",
            Self::AnswerFailed { .. } => "conversation.answer_failed",
            Self::CaptureStarted { .. } => "lead.capture_started",
            Self::LeadRejected { .. } => "lead.rejected",
            Self::LeadCaptured => "lead.captured",
        }
    }

    pub fn outcome(&self) -> AuditOutcome {
        match self {
            Self::IngestSkipped => AuditOutcome::Skipped,
            Self::AnswerFailed { .. } => AuditOutcome::Failed,
            Self::LeadRejected { .. } => AuditOutcome::Rejected,
            _ => AuditOutcome::Success,
        }
    }

    fn metadata(&self) -> BTreeMap<String, String> {
        let pairs: Vec<(&str, String)> = match self {
            Self::IndexBuilt { index } => vec![("index", index.as_str().to_string())],
            Self::IngestSkipped => Vec::new(),
            Self::Answered { passages } => vec![("passages", passages.to_string())],
            Self::AnswerFailed { error } => vec![("error", error.clone())],
            Self::CaptureStarted { trigger } => vec![("trigger", trigger.clone())],
            Self::LeadRejected { field, reason } => {
                vec![("field", field.key().to_string()), ("reason", reason.to_string())]
            }
            Self::LeadCaptured => {
                let fields = LeadField::ALL.iter().map(LeadField::key).collect::<Vec<_>>();
                vec![("fields", fields.join(","))]
            }
        };
        pairs.into_iter().map(|(key, value)| (key.to_string(), value)).collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Rejected,
    Failed,
    Skipped,
}

/// Serializable record of a [`SessionEvent`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub session_id: SessionId,
    pub correlation_id: String,
    pub event_type: String,
    pub outcome: AuditOutcome,
    pub metadata: BTreeMap<String, String>,
    pub recorded_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn record(
        session_id: SessionId,
        correlation_id: impl Into<String>,
        event: &SessionEvent,
    ) -> Self {
        Self {
            session_id,
            correlation_id: correlation_id.into(),
            event_type: event.event_type().to_string(),
            outcome: event.outcome(),
            metadata: event.metadata(),
            recorded_at: Utc::now(),
        }
    }
}

pub trait AuditSink: Send + Sync {
    fn emit(&self, event: AuditEvent);
}

/// Keeps events for the life of the process. Clones share one buffer.
#[derive(Clone, Default)]
pub struct InMemoryAuditSink {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl InMemoryAuditSink {
    pub fn events(&self) -> Vec<AuditEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn event_types(&self) -> Vec<String> {
        self.events().into_iter().map(|event| event.event_type).collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn emit(&self, event: AuditEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
