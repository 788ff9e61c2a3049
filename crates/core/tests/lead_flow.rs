use std::sync::Arc;

use chrono::NaiveDate;
use docent_core::{
    AuditSink, ConversationController, ConversationError, ExtractiveGenerationService,
    FixedClock, InMemoryAuditSink, IngestError, IngestOutcome, KeywordRetrievalService,
    LeadField, LeadForm, Reply, Session, SourceDocument, Speaker, ValidationError,
};

type Controller = ConversationController<KeywordRetrievalService, ExtractiveGenerationService>;

fn controller(audit: Arc<InMemoryAuditSink>) -> Controller {
    let today = NaiveDate::from_ymd_opt(2024, 6, 10).expect("valid date");
    let sink: Arc<dyn AuditSink> = audit;
    ConversationController::new(
        KeywordRetrievalService::default(),
        ExtractiveGenerationService::default(),
    )
    .with_clock(Arc::new(FixedClock(today)))
    .with_audit_sink(sink)
}

fn handbook() -> Vec<SourceDocument> {
    vec![
        SourceDocument::new(
            "handbook.txt",
            "Refunds are processed within five business days of receiving the item.",
        ),
        SourceDocument::new("hours.txt", "The support desk is open weekdays from nine to five."),
    ]
}

#[test]
fn question_then_lead_capture_round_trip() {
    let audit = Arc::new(InMemoryAuditSink::default());
    let controller = controller(audit.clone());
    let mut session = Session::new();

    controller.ingest(&mut session, handbook()).expect("ingest");

    let reply = controller.handle(&mut session, "When is the support desk open?").expect("answer");
    assert!(matches!(&reply, Reply::Answer(text) if text.contains("weekdays")));
    assert_eq!(session.history().len(), 2);
    assert_eq!(session.history()[0].speaker(), Speaker::User);

    let reply = controller.handle(&mut session, "Can you call me tomorrow?").expect("prompt");
    let Reply::LeadPrompt(prompt) = reply else {
        panic!("expected lead prompt, got {reply:?}");
    };
    assert_eq!(prompt.fields.len(), 4);
    assert!(session.is_capturing_lead());

    let rejected = controller
        .submit_lead(&mut session, &LeadForm::new("Jo Park", "555-0100", "jo@example.com", "x"))
        .expect_err("short phone");
    assert!(matches!(
        rejected,
        ConversationError::Validation(ValidationError::InvalidPhone(_))
    ));
    assert!(session.is_capturing_lead());

    let captured = controller
        .submit_lead(
            &mut session,
            &LeadForm::new("Jo Park", "(201) 555-0123", "jo@example.com", "Next Friday"),
        )
        .expect("valid lead");
    let Reply::LeadCaptured { lead, .. } = captured else {
        panic!("expected captured lead");
    };
    assert_eq!(lead.phone(), "+12015550123");
    assert_eq!(lead.date(), "2024-06-14");
    assert!(!session.is_capturing_lead());

    // Lead details never enter the chat history.
    assert_eq!(session.history().len(), 2);
    assert!(!session.transcript().contains("jo@example.com"));

    let serialized = serde_json::to_string(&audit.events()).expect("audit json");
    assert!(!serialized.contains("jo@example.com"));
    assert!(!serialized.contains("+12015550123"));
    assert_eq!(
        audit.event_types(),
        vec![
            "ingest.index_built",
            "conversation.answered",
            "lead.capture_started",
            "lead.rejected",
            "lead.captured",
        ]
    );
}

#[test]
fn history_holds_only_answered_exchanges_around_a_capture() {
    let controller = controller(Arc::new(InMemoryAuditSink::default()));
    let mut session = Session::new();
    controller.ingest(&mut session, handbook()).expect("ingest");
    let index = session.index().cloned();

    let first = controller.handle(&mut session, "How are refunds processed?").expect("answer");
    controller.handle(&mut session, "Please schedule a call").expect("prompt");
    controller
        .submit_lead(&mut session, &LeadForm::new("Jo", "201-555-0123", "nope", "2024-07-01"))
        .expect_err("bad email");
    controller
        .submit_lead(
            &mut session,
            &LeadForm::new("Jo", "201-555-0123", "jo@example.com", "2024-07-01"),
        )
        .expect("valid lead");
    let second = controller.handle(&mut session, "When is support open?").expect("answer");

    let turns = session
        .history()
        .iter()
        .map(|turn| (turn.speaker(), turn.text().to_string()))
        .collect::<Vec<_>>();
    assert_eq!(
        turns,
        vec![
            (Speaker::User, "How are refunds processed?".to_string()),
            (Speaker::Assistant, first.text().to_string()),
            (Speaker::User, "When is support open?".to_string()),
            (Speaker::Assistant, second.text().to_string()),
        ]
    );

    let outcome = controller.ingest(&mut session, handbook()).expect("second ingest");
    assert!(matches!(outcome, IngestOutcome::AlreadyIndexed(_)));
    assert_eq!(session.index().cloned(), index);
}

#[test]
fn blank_corpus_is_rejected_before_indexing() {
    let controller = controller(Arc::new(InMemoryAuditSink::default()));
    let mut session = Session::new();

    let error = controller
        .ingest(&mut session, vec![SourceDocument::new("empty.txt", "  \n\t ")])
        .expect_err("blank corpus");
    assert!(matches!(error, ConversationError::Ingest(IngestError::EmptyInput)));
    assert!(session.index().is_none());
}

#[test]
fn missing_field_outranks_format_errors() {
    let controller = controller(Arc::new(InMemoryAuditSink::default()));
    let mut session = Session::new();
    controller.ingest(&mut session, handbook()).expect("ingest");
    controller.handle(&mut session, "please book a demo").expect("prompt");

    let error = controller
        .submit_lead(&mut session, &LeadForm::new("Jo", "bad", "bad", "   "))
        .expect_err("missing date");
    assert!(matches!(
        error,
        ConversationError::Validation(ValidationError::MissingField(LeadField::Date))
    ));
}

#[test]
fn reply_serializes_for_transport() {
    let controller = controller(Arc::new(InMemoryAuditSink::default()));
    let mut session = Session::new();
    controller.ingest(&mut session, handbook()).expect("ingest");

    let reply = controller.handle(&mut session, "schedule a visit").expect("prompt");
    let value = serde_json::to_value(&reply).expect("reply json");
    assert_eq!(value["LeadPrompt"]["message"], "Please provide your information:");
    assert_eq!(value["LeadPrompt"]["fields"][0]["label"], "Name");
}
