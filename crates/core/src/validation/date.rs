use chrono::{Datelike, Days, NaiveDate, Weekday};
use thiserror::Error;

const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Enumeration order decides ties when several weekday names appear.
const WEEKDAYS: [(&str, Weekday); 7] = [
    ("monday", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("saturday", Weekday::Sat),
    ("sunday", Weekday::Sun),
];

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DateError {
    #[error("date is empty")]
    Empty,
    #[error("relative date names no weekday")]
    MissingWeekday,
    #[error("date must be written as YYYY-MM-DD")]
    NotIsoFormat,
    #[error("`{0}` is not a calendar date")]
    NotACalendarDate(String),
    #[error("resolved date is out of range")]
    OutOfRange,
}

impl DateError {
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::Empty => "date_empty",
            Self::MissingWeekday => "date_missing_weekday",
            Self::NotIsoFormat => "date_not_iso_format",
            Self::NotACalendarDate(_) => "date_not_calendar_date",
            Self::OutOfRange => "date_out_of_range",
        }
    }
}

/// Resolves `raw` against `today`.
///
/// Text containing "next" is read as a relative weekday and always lands
/// strictly after `today`; anything else must be an ISO `YYYY-MM-DD` date.
pub fn resolve_date(raw: &str, today: NaiveDate) -> Result<NaiveDate, DateError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DateError::Empty);
    }

    let lowered = trimmed.to_lowercase();
    if lowered.contains("next") {
        return resolve_next_weekday(&lowered, today);
    }

    parse_iso_date(trimmed)
}

pub fn format_iso_date(date: NaiveDate) -> String {
    date.format(ISO_DATE_FORMAT).to_string()
}

fn resolve_next_weekday(lowered: &str, today: NaiveDate) -> Result<NaiveDate, DateError> {
    let target = WEEKDAYS
        .iter()
        .find(|(name, _)| lowered.contains(name))
        .map(|(_, weekday)| *weekday)
        .ok_or(DateError::MissingWeekday)?;

    let current_index = i64::from(today.weekday().num_days_from_monday());
    let target_index = i64::from(target.num_days_from_monday());
    let mut days_ahead = target_index - current_index;
    if days_ahead <= 0 {
        days_ahead += 7;
    }

    // days_ahead is in 1..=7 here.
    today.checked_add_days(Days::new(days_ahead.unsigned_abs())).ok_or(DateError::OutOfRange)
}

fn parse_iso_date(value: &str) -> Result<NaiveDate, DateError> {
    if !has_iso_shape(value) {
        return Err(DateError::NotIsoFormat);
    }
    NaiveDate::parse_from_str(value, ISO_DATE_FORMAT)
        .ok()
        .filter(|date| date.year() >= 1)
        .ok_or_else(|| DateError::NotACalendarDate(value.to_string()))
}

fn has_iso_shape(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(position, byte)| match position {
            4 | 7 => *byte == b'-',
            _ => byte.is_ascii_digit(),
        })
}
