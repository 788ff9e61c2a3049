use thiserror::Error;

use crate::domain::lead::LeadField;
use crate::validation::{DateError, EmailError, PhoneError};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("index build failed: {0}")]
pub struct IndexBuildError(pub String);

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("retrieval failed: {0}")]
pub struct RetrievalError(pub String);

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("generation failed: {0}")]
pub struct GenerationError(pub String);

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IngestError {
    #[error("no ingestible documents were supplied")]
    EmptyInput,
    #[error(transparent)]
    IndexBuild(#[from] IndexBuildError),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("required field `{0}` is missing")]
    MissingField(LeadField),
    #[error("invalid phone: {0}")]
    InvalidPhone(#[source] PhoneError),
    #[error("invalid email: {0}")]
    InvalidEmail(#[source] EmailError),
    #[error("invalid date: {0}")]
    InvalidDate(#[source] DateError),
}

impl ValidationError {
    pub fn field(&self) -> LeadField {
        match self {
            Self::MissingField(field) => *field,
            Self::InvalidPhone(_) => LeadField::Phone,
            Self::InvalidEmail(_) => LeadField::Email,
            Self::InvalidDate(_) => LeadField::Date,
        }
    }

    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "missing_field",
            Self::InvalidPhone(reason) => reason.reason_code(),
            Self::InvalidEmail(reason) => reason.reason_code(),
            Self::InvalidDate(reason) => reason.reason_code(),
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "Please fill in all fields",
            Self::InvalidPhone(_) => "Please enter a valid phone number",
            Self::InvalidEmail(_) => "Please enter a valid email address",
            Self::InvalidDate(_) => "Please enter a valid date",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConversationError {
    #[error("no documents have been indexed for this session")]
    NoDocumentsIndexed,
    #[error("lead details were submitted while no lead capture is in progress")]
    NotCapturingLead,
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl ConversationError {
    /// Validation and routing failures leave the session ready for a retry.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NoDocumentsIndexed
                | Self::NotCapturingLead
                | Self::Validation(_)
                | Self::Ingest(IngestError::EmptyInput)
        )
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &str {
        match self {
            Self::BadRequest { message, .. } => message,
            Self::ServiceUnavailable { .. } => {
                "The assistant is temporarily unavailable. Please retry shortly."
            }
        }
    }
}

impl ConversationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ConversationError> for InterfaceError {
    fn from(value: ConversationError) -> Self {
        let bad_request = |message: &str| Self::BadRequest {
            message: message.to_owned(),
            correlation_id: "unassigned".to_owned(),
        };
        match value {
            ConversationError::Validation(error) => bad_request(error.user_message()),
            ConversationError::NoDocumentsIndexed => {
                bad_request("Please upload documents before asking questions.")
            }
            ConversationError::Ingest(IngestError::EmptyInput) => {
                bad_request("Please upload valid documents")
            }
            ConversationError::NotCapturingLead => {
                bad_request("Contact details are only collected after you ask to be contacted.")
            }
            ConversationError::Ingest(IngestError::IndexBuild(error)) => {
                Self::ServiceUnavailable {
                    message: error.to_string(),
                    correlation_id: "unassigned".to_owned(),
                }
            }
            ConversationError::Retrieval(error) => Self::ServiceUnavailable {
                message: error.to_string(),
                correlation_id: "unassigned".to_owned(),
            },
            ConversationError::Generation(error) => Self::ServiceUnavailable {
                message: error.to_string(),
                correlation_id: "unassigned".to_owned(),
            },
        }
    }
}
