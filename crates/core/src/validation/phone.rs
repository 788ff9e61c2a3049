use std::fmt;
use std::str::FromStr;

use phonenumber::{country, Mode};
use thiserror::Error;

const MAX_PHONE_INPUT_CHARS: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhoneRegion(country::Id);

impl PhoneRegion {
    pub const US: PhoneRegion = PhoneRegion(country::Id::US);
}

impl Default for PhoneRegion {
    fn default() -> Self {
        Self::US
    }
}

impl FromStr for PhoneRegion {
    type Err = PhoneError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value
            .trim()
            .to_ascii_uppercase()
            .parse::<country::Id>()
            .map(Self)
            .map_err(|_| PhoneError::UnknownRegion(value.trim().to_string()))
    }
}

impl fmt::Display for PhoneRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PhoneError {
    #[error("phone number is empty")]
    Empty,
    #[error("phone number is longer than {MAX_PHONE_INPUT_CHARS} characters")]
    TooLong,
    #[error("phone number contains unsupported characters")]
    UnsupportedCharacters,
    #[error("phone number could not be parsed: {0}")]
    Unparseable(String),
    #[error("phone number is not a valid number for region {region}")]
    NotValid { region: String },
    #[error("unknown phone region `{0}`")]
    UnknownRegion(String),
}

impl PhoneError {
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::Empty => "phone_empty",
            Self::TooLong => "phone_too_long",
            Self::UnsupportedCharacters => "phone_unsupported_characters",
            Self::Unparseable(_) => "phone_unparseable",
            Self::NotValid { .. } => "phone_not_valid",
            Self::UnknownRegion(_) => "phone_unknown_region",
        }
    }
}

/// Parses `raw` with `region` as the default and returns the E.164 form.
///
/// Numbers written with an explicit `+` country code are checked against
/// their own region's numbering plan, not the default one.
pub fn validate_phone(raw: &str, region: PhoneRegion) -> Result<String, PhoneError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PhoneError::Empty);
    }
    if trimmed.chars().count() > MAX_PHONE_INPUT_CHARS {
        return Err(PhoneError::TooLong);
    }
    if !trimmed.chars().all(is_phone_char) {
        return Err(PhoneError::UnsupportedCharacters);
    }

    let number = phonenumber::parse(Some(region.0), trimmed)
        .map_err(|error| PhoneError::Unparseable(error.to_string()))?;
    if !phonenumber::is_valid(&number) {
        return Err(PhoneError::NotValid { region: region.to_string() });
    }

    Ok(number.format().mode(Mode::E164).to_string())
}

// Letters stay allowed for vanity numbers such as 1-800-FLOWERS.
fn is_phone_char(character: char) -> bool {
    character.is_ascii_alphanumeric()
        || matches!(character, ' ' | '+' | '-' | '.' | '(' | ')' | '/' | '#' | '*')
}

#[cfg(test)]
mod tests {
    use super::{validate_phone, PhoneError, PhoneRegion};

    #[test]
    fn formats_us_number_as_e164() {
        let normalized = validate_phone("(201) 555-0123", PhoneRegion::US).expect("valid number");
        assert_eq!(normalized, "+12015550123");
    }

    #[test]
    fn accepts_international_prefix_and_dots() {
        let normalized = validate_phone("+1 201.555.0123", PhoneRegion::US).expect("valid number");
        assert_eq!(normalized, "+12015550123");
    }

    #[test]
    fn rejects_seven_digit_local_number() {
        assert!(validate_phone("555-0100", PhoneRegion::US).is_err());
    }

    #[test]
    fn rejects_words() {
        assert!(validate_phone("call me maybe", PhoneRegion::US).is_err());
    }

    #[test]
    fn empty_and_blank_are_typed_failures() {
        assert_eq!(validate_phone("", PhoneRegion::US), Err(PhoneError::Empty));
        assert_eq!(validate_phone("   ", PhoneRegion::US), Err(PhoneError::Empty));
    }

    #[test]
    fn non_ascii_digits_are_rejected_without_parsing() {
        assert_eq!(
            validate_phone("٢٠١٥٥٥٠١٢٣", PhoneRegion::US),
            Err(PhoneError::UnsupportedCharacters)
        );
        assert_eq!(
            validate_phone("201☎5550123", PhoneRegion::US),
            Err(PhoneError::UnsupportedCharacters)
        );
    }

    #[test]
    fn very_long_input_is_rejected() {
        let raw = "2".repeat(100_000);
        assert_eq!(validate_phone(&raw, PhoneRegion::US), Err(PhoneError::TooLong));
    }

    #[test]
    fn region_parses_case_insensitively() {
        let region: PhoneRegion = "us".parse().expect("known region");
        assert_eq!(region, PhoneRegion::US);
        assert_eq!(region.to_string(), "US");
        assert!("ZZZ".parse::<PhoneRegion>().is_err());
    }
}
