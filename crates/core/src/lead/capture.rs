use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::lead::{LeadField, LeadForm, LeadRecord, PartialLead};
use crate::errors::ValidationError;
use crate::validation::{format_iso_date, resolve_date, validate_email, validate_phone, PhoneRegion};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureState {
    Collecting,
    Complete,
}

/// Result of one form submission.
///
/// `Complete` consumes the machine; a later capture needs a fresh one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CaptureStep {
    Complete(LeadRecord),
    Collecting { capture: LeadCapture, error: ValidationError },
}

impl CaptureStep {
    pub fn state(&self) -> CaptureState {
        match self {
            Self::Complete(_) => CaptureState::Complete,
            Self::Collecting { .. } => CaptureState::Collecting,
        }
    }

    pub fn into_result(self) -> Result<LeadRecord, ValidationError> {
        match self {
            Self::Complete(record) => Ok(record),
            Self::Collecting { error, .. } => Err(error),
        }
    }
}

/// Single-shot form validation: all four fields arrive together.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeadCapture {
    region: PhoneRegion,
    today: NaiveDate,
    validated: PartialLead,
}

impl LeadCapture {
    pub fn new(region: PhoneRegion, today: NaiveDate) -> Self {
        Self { region, today, validated: PartialLead::new() }
    }

    pub fn state(&self) -> CaptureState {
        CaptureState::Collecting
    }

    /// Values that passed validation on the most recent submission.
    pub fn validated(&self) -> &PartialLead {
        &self.validated
    }

    pub fn submit(mut self, form: &LeadForm) -> CaptureStep {
        self.validated.clear();
        match self.validate(form) {
            Ok(record) => CaptureStep::Complete(record),
            Err(error) => CaptureStep::Collecting { capture: self, error },
        }
    }

    fn validate(&mut self, form: &LeadForm) -> Result<LeadRecord, ValidationError> {
        if let Some(field) = form.first_missing() {
            return Err(ValidationError::MissingField(field));
        }

        let name = form.name.trim().to_string();
        self.validated.insert(LeadField::Name, name.clone());

        let phone =
            validate_phone(&form.phone, self.region).map_err(ValidationError::InvalidPhone)?;
        self.validated.insert(LeadField::Phone, phone.clone());

        let email = validate_email(&form.email).map_err(ValidationError::InvalidEmail)?;
        self.validated.insert(LeadField::Email, email.clone());

        let date = resolve_date(&form.date, self.today)
            .map(format_iso_date)
            .map_err(ValidationError::InvalidDate)?;
        self.validated.insert(LeadField::Date, date.clone());

        Ok(LeadRecord::new(name, phone, email, date))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::domain::lead::{LeadField, LeadForm};
    use crate::errors::ValidationError;
    use crate::validation::{DateError, EmailError, PhoneRegion};

    use super::{CaptureState, CaptureStep, LeadCapture};

    fn capture() -> LeadCapture {
        LeadCapture::new(
            PhoneRegion::US,
            NaiveDate::from_ymd_opt(2024, 6, 10).expect("valid fixture date"),
        )
    }

    #[test]
    fn complete_form_yields_normalized_record() {
        let step = capture().submit(&LeadForm::new(
            " Jo ",
            "(201) 555-0123",
            "jo@Example.com",
            "next Friday",
        ));
        assert_eq!(step.state(), CaptureState::Complete);

        let record = step.into_result().expect("form should validate");
        assert_eq!(record.name(), "Jo");
        assert_eq!(record.phone(), "+12015550123");
        assert_eq!(record.email(), "jo@example.com");
        assert_eq!(record.date(), "2024-06-14");
    }

    #[test]
    fn missing_field_is_reported_before_any_validator_runs() {
        let step = capture().submit(&LeadForm::new("Jo", "not a phone", "", "2024-01-15"));
        let CaptureStep::Collecting { capture, error } = step else {
            panic!("expected collecting state");
        };

        assert_eq!(error, ValidationError::MissingField(LeadField::Email));
        assert!(capture.validated().is_empty());
    }

    #[test]
    fn invalid_email_short_circuits_date_and_keeps_prior_fields() {
        let step = capture().submit(&LeadForm::new(
            "Jo",
            "201-555-0123",
            "not-an-email",
            "not a date",
        ));
        let CaptureStep::Collecting { capture, error } = step else {
            panic!("expected collecting state");
        };

        assert!(matches!(error, ValidationError::InvalidEmail(EmailError::Malformed(_))));
        assert_eq!(capture.state(), CaptureState::Collecting);
        let fields = capture.validated().keys().copied().collect::<Vec<_>>();
        assert_eq!(fields, vec![LeadField::Name, LeadField::Phone]);
    }

    #[test]
    fn phone_is_checked_before_email() {
        let error = capture()
            .submit(&LeadForm::new("Jo", "555-0100", "not-an-email", "2024-01-15"))
            .into_result()
            .expect_err("short phone should fail");

        assert!(matches!(error, ValidationError::InvalidPhone(_)));
    }

    #[test]
    fn invalid_date_is_reported_last() {
        let error = capture()
            .submit(&LeadForm::new("Jo", "201-555-0123", "jo@example.com", "someday"))
            .into_result()
            .expect_err("free text date should fail");

        assert_eq!(error, ValidationError::InvalidDate(DateError::NotIsoFormat));
    }

    #[test]
    fn collecting_machine_accepts_a_corrected_resubmission() {
        let step = capture().submit(&LeadForm::new("Jo", "201-555-0123", "jo@", "2024-01-15"));
        let CaptureStep::Collecting { capture, .. } = step else {
            panic!("expected collecting state");
        };

        let record = capture
            .submit(&LeadForm::new("Jo", "201-555-0123", "jo@example.com", "2024-01-15"))
            .into_result()
            .expect("corrected form should validate");
        assert_eq!(record.date(), "2024-01-15");
    }
}
