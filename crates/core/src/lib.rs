pub mod audit;
pub mod clock;
pub mod config;
pub mod conversation;
pub mod domain;
pub mod errors;
pub mod generation;
pub mod ingest;
pub mod lead;
pub mod retrieval;
pub mod services;
pub mod validation;

pub use audit::{AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink, SessionEvent};
pub use clock::{Clock, FixedClock, SystemClock};
pub use conversation::{
    ConversationController, IngestOutcome, LeadPrompt, PromptField, Reply, TriggerDetector,
};
pub use domain::document::{Chunk, IndexHandle, Passage, SourceDocument};
pub use domain::lead::{LeadField, LeadForm, LeadRecord, PartialLead};
pub use domain::session::{Session, SessionId, SessionMode, Speaker, Turn};
pub use errors::{
    ConversationError, GenerationError, IndexBuildError, IngestError, InterfaceError,
    RetrievalError, ValidationError,
};
pub use generation::ExtractiveGenerationService;
pub use ingest::{ChunkerConfig, DocumentIndexer};
pub use lead::{CaptureState, CaptureStep, LeadCapture};
pub use retrieval::KeywordRetrievalService;
pub use services::{GenerationService, QueryRewriter, RetrievalService};
