use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::audit::{AuditEvent, AuditSink, InMemoryAuditSink, SessionEvent};
use crate::clock::{Clock, SystemClock};
use crate::config::AppConfig;
use crate::conversation::reply::{LeadPrompt, Reply, LEAD_CONFIRMATION_MESSAGE};
use crate::conversation::trigger::TriggerDetector;
use crate::domain::document::{IndexHandle, SourceDocument};
use crate::domain::lead::LeadForm;
use crate::domain::session::{Session, Turn};
use crate::errors::ConversationError;
use crate::ingest::DocumentIndexer;
use crate::lead::{CaptureStep, LeadCapture};
use crate::services::{GenerationService, QueryRewriter, RetrievalService};
use crate::validation::PhoneRegion;

pub const DEFAULT_TOP_K: usize = 4;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IngestOutcome {
    Indexed(IndexHandle),
    /// The session already had an index; nothing was re-ingested.
    AlreadyIndexed(IndexHandle),
}

impl IngestOutcome {
    pub fn handle(&self) -> &IndexHandle {
        match self {
            Self::Indexed(handle) | Self::AlreadyIndexed(handle) => handle,
        }
    }
}

/// Routes each utterance to question answering or lead capture.
///
/// The controller holds no per-session state. Everything that changes between
/// turns lives in the [`Session`] passed to each call.
pub struct ConversationController<R, G> {
    retrieval: R,
    generation: G,
    rewriter: Option<Box<dyn QueryRewriter>>,
    indexer: DocumentIndexer,
    triggers: TriggerDetector,
    top_k: usize,
    phone_region: PhoneRegion,
    clock: Arc<dyn Clock>,
    audit: Arc<dyn AuditSink>,
}

impl<R, G> ConversationController<R, G>
where
    R: RetrievalService,
    G: GenerationService,
{
    pub fn new(retrieval: R, generation: G) -> Self {
        Self {
            retrieval,
            generation,
            rewriter: None,
            indexer: DocumentIndexer::default(),
            triggers: TriggerDetector::default(),
            top_k: DEFAULT_TOP_K,
            phone_region: PhoneRegion::default(),
            clock: Arc::new(SystemClock),
            audit: Arc::new(InMemoryAuditSink::default()),
        }
    }

    pub fn from_config(config: &AppConfig, retrieval: R, generation: G) -> Self {
        Self::new(retrieval, generation)
            .with_indexer(DocumentIndexer::new(config.ingest.chunker()))
            .with_triggers(config.lead.trigger_detector())
            .with_top_k(config.retrieval.top_k)
            .with_phone_region(config.lead.phone_region)
    }

    pub fn with_rewriter(mut self, rewriter: Box<dyn QueryRewriter>) -> Self {
        self.rewriter = Some(rewriter);
        self
    }

    pub fn with_indexer(mut self, indexer: DocumentIndexer) -> Self {
        self.indexer = indexer;
        self
    }

    pub fn with_triggers(mut self, triggers: TriggerDetector) -> Self {
        self.triggers = triggers;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn with_phone_region(mut self, phone_region: PhoneRegion) -> Self {
        self.phone_region = phone_region;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Builds the session index from `documents`, once per session.
    pub fn ingest<I>(
        &self,
        session: &mut Session,
        documents: I,
    ) -> Result<IngestOutcome, ConversationError>
    where
        I: IntoIterator<Item = SourceDocument>,
    {
        let correlation_id = new_correlation_id();
        if let Some(existing) = session.index() {
            debug!(
                event_name = "ingest.skipped_already_indexed",
                session_id = %session.id(),
                correlation_id = %correlation_id,
                "session already has an index; ignoring new documents"
            );
            self.audit.emit(AuditEvent::record(
                session.id().clone(),
                correlation_id,
                &SessionEvent::IngestSkipped,
            ));
            return Ok(IngestOutcome::AlreadyIndexed(existing.clone()));
        }

        let handle = self.indexer.ingest(&self.retrieval, documents)?;
        session.attach_index(handle.clone());
        self.audit.emit(AuditEvent::record(
            session.id().clone(),
            correlation_id,
            &SessionEvent::IndexBuilt { index: handle.clone() },
        ));
        Ok(IngestOutcome::Indexed(handle))
    }

    /// Handles one user utterance.
    ///
    /// A contact-intent phrase switches the session into lead capture before
    /// anything else, so that utterance is never answered. While capturing,
    /// every utterance gets the lead prompt back; details arrive through
    /// [`Self::submit_lead`].
    pub fn handle(
        &self,
        session: &mut Session,
        utterance: &str,
    ) -> Result<Reply, ConversationError> {
        let correlation_id = new_correlation_id();

        if let Some(phrase) = self.triggers.detect(utterance) {
            if session.begin_lead_capture() {
                info!(
                    event_name = "conversation.lead_capture_started",
                    session_id = %session.id(),
                    correlation_id = %correlation_id,
                    trigger = phrase,
                    "contact intent detected; collecting lead details"
                );
                self.audit.emit(AuditEvent::record(
                    session.id().clone(),
                    correlation_id.clone(),
                    &SessionEvent::CaptureStarted { trigger: phrase.to_string() },
                ));
            } else {
                debug!(
                    event_name = "conversation.retrigger_ignored",
                    session_id = %session.id(),
                    correlation_id = %correlation_id,
                    "lead capture already in progress"
                );
            }
        }

        if let Some(partial) = session.partial_lead() {
            return Ok(Reply::LeadPrompt(LeadPrompt::new(partial)));
        }

        self.answer(session, utterance, &correlation_id)
    }

    /// Validates a submitted lead form. Neither outcome touches history.
    pub fn submit_lead(
        &self,
        session: &mut Session,
        form: &LeadForm,
    ) -> Result<Reply, ConversationError> {
        if !session.is_capturing_lead() {
            return Err(ConversationError::NotCapturingLead);
        }

        let correlation_id = new_correlation_id();
        let capture = LeadCapture::new(self.phone_region, self.clock.today());
        match capture.submit(form) {
            CaptureStep::Complete(lead) => {
                session.complete_lead(lead.clone());
                info!(
                    event_name = "lead.captured",
                    session_id = %session.id(),
                    correlation_id = %correlation_id,
                    "lead details validated"
                );
                self.audit.emit(AuditEvent::record(
                    session.id().clone(),
                    correlation_id,
                    &SessionEvent::LeadCaptured,
                ));
                Ok(Reply::LeadCaptured { message: LEAD_CONFIRMATION_MESSAGE.to_string(), lead })
            }
            CaptureStep::Collecting { capture, error } => {
                session.remember_partial(capture.validated().clone());
                warn!(
                    event_name = "lead.rejected",
                    session_id = %session.id(),
                    correlation_id = %correlation_id,
                    field = %error.field(),
                    reason = error.reason_code(),
                    "lead details failed validation"
                );
                self.audit.emit(AuditEvent::record(
                    session.id().clone(),
                    correlation_id,
                    &SessionEvent::LeadRejected {
                        field: error.field(),
                        reason: error.reason_code(),
                    },
                ));
                Err(error.into())
            }
        }
    }

    fn answer(
        &self,
        session: &mut Session,
        utterance: &str,
        correlation_id: &str,
    ) -> Result<Reply, ConversationError> {
        let index = session.index().cloned().ok_or(ConversationError::NoDocumentsIndexed)?;
        let search_question = self.search_question(utterance, session.history());

        let result = self
            .retrieval
            .query(&index, &search_question, self.top_k)
            .map_err(ConversationError::from)
            .and_then(|passages| {
                self.generation
                    .answer(utterance, &passages, session.history())
                    .map(|answer| (answer, passages.len()))
                    .map_err(ConversationError::from)
            });

        let (answer, passage_count) = match result {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(
                    event_name = "conversation.answer_failed",
                    session_id = %session.id(),
                    correlation_id,
                    error = %error,
                    "question could not be answered"
                );
                self.audit.emit(AuditEvent::record(
                    session.id().clone(),
                    correlation_id,
                    &SessionEvent::AnswerFailed { error: error.to_string() },
                ));
                return Err(error);
            }
        };

        session.record_exchange(utterance, &answer);
        info!(
            event_name = "conversation.answered",
            session_id = %session.id(),
            correlation_id,
            passage_count,
            history_len = session.history().len(),
            "question answered"
        );
        self.audit.emit(AuditEvent::record(
            session.id().clone(),
            correlation_id,
            &SessionEvent::Answered { passages: passage_count },
        ));
        Ok(Reply::Answer(answer))
    }

    fn search_question(&self, utterance: &str, history: &[Turn]) -> String {
        let Some(rewriter) = self.rewriter.as_ref().filter(|_| !history.is_empty()) else {
            return utterance.to_string();
        };

        match rewriter.standalone_question(utterance, history) {
            Ok(rewritten) if !rewritten.trim().is_empty() => rewritten.trim().to_string(),
            Ok(_) => utterance.to_string(),
            Err(error) => {
                warn!(
                    event_name = "conversation.rewrite_failed",
                    error = %error,
                    "falling back to the original question for retrieval"
                );
                utterance.to_string()
            }
        }
    }
}

fn new_correlation_id() -> String {
    Uuid::new_v4().to_string()
}
