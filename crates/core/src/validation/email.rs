use std::str::FromStr;

use email_address::EmailAddress;
use thiserror::Error;

const MAX_EMAIL_CHARS: usize = 254;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EmailError {
    #[error("email address is empty")]
    Empty,
    #[error("email address is longer than {MAX_EMAIL_CHARS} characters")]
    TooLong,
    #[error("email address must not contain whitespace or a display name")]
    UnexpectedCharacters,
    #[error("email address is malformed: {0}")]
    Malformed(String),
    #[error("email domain `{0}` is not a fully qualified domain name")]
    UnqualifiedDomain(String),
}

impl EmailError {
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::Empty => "email_empty",
            Self::TooLong => "email_too_long",
            Self::UnexpectedCharacters => "email_unexpected_characters",
            Self::Malformed(_) => "email_malformed",
            Self::UnqualifiedDomain(_) => "email_unqualified_domain",
        }
    }
}

/// Validates a bare `local@domain` address and lowercases the domain.
pub fn validate_email(raw: &str) -> Result<String, EmailError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EmailError::Empty);
    }
    if trimmed.chars().count() > MAX_EMAIL_CHARS {
        return Err(EmailError::TooLong);
    }
    if trimmed.chars().any(|character| character.is_whitespace() || matches!(character, '<' | '>'))
    {
        return Err(EmailError::UnexpectedCharacters);
    }

    let address = EmailAddress::from_str(trimmed)
        .map_err(|error| EmailError::Malformed(error.to_string()))?;
    let domain = address.domain();
    if !is_qualified_domain(domain) {
        return Err(EmailError::UnqualifiedDomain(domain.to_string()));
    }

    Ok(format!("{}@{}", address.local_part(), domain.to_ascii_lowercase()))
}

// Domain literals and single-label hosts are not deliverable addresses.
fn is_qualified_domain(domain: &str) -> bool {
    if domain.starts_with('[') {
        return false;
    }
    let labels = domain.split('.').collect::<Vec<_>>();
    if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
        return false;
    }
    labels.last().map(|tld| is_top_level_label(tld)).unwrap_or(false)
}

// Punycode TLDs (`xn--p1ai`) carry digits and hyphens after the ACE prefix.
fn is_top_level_label(tld: &str) -> bool {
    if let Some(encoded) = tld.get(..4).filter(|prefix| prefix.eq_ignore_ascii_case("xn--")) {
        let rest = &tld[encoded.len()..];
        return !rest.is_empty()
            && rest.chars().all(|character| character.is_ascii_alphanumeric() || character == '-');
    }
    tld.chars().count() >= 2 && tld.chars().all(char::is_alphabetic)
}
