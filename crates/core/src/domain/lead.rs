use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadField {
    Name,
    Phone,
    Email,
    Date,
}

impl LeadField {
    /// Form order. Validators run over a subset of this in the same order.
    pub const ALL: [LeadField; 4] =
        [LeadField::Name, LeadField::Phone, LeadField::Email, LeadField::Date];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Phone => "phone",
            Self::Email => "email",
            Self::Date => "date",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Phone => "Phone Number",
            Self::Email => "Email",
            Self::Date => "Preferred Date (YYYY-MM-DD or 'Next Monday')",
        }
    }
}

impl fmt::Display for LeadField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Raw values exactly as the presentation layer collected them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadForm {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub date: String,
}

impl LeadForm {
    pub fn new(
        name: impl Into<String>,
        phone: impl Into<String>,
        email: impl Into<String>,
        date: impl Into<String>,
    ) -> Self {
        Self { name: name.into(), phone: phone.into(), email: email.into(), date: date.into() }
    }

    pub fn value(&self, field: LeadField) -> &str {
        match field {
            LeadField::Name => &self.name,
            LeadField::Phone => &self.phone,
            LeadField::Email => &self.email,
            LeadField::Date => &self.date,
        }
    }

    pub fn first_missing(&self) -> Option<LeadField> {
        LeadField::ALL.into_iter().find(|field| self.value(*field).trim().is_empty())
    }
}

/// Field values that already passed validation during an unfinished capture.
pub type PartialLead = BTreeMap<LeadField, String>;

/// A fully validated contact record. Only the lead capture machine builds one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadRecord {
    name: String,
    phone: String,
    email: String,
    date: String,
}

impl LeadRecord {
    pub(crate) fn new(name: String, phone: String, email: String, date: String) -> Self {
        Self { name, phone, email, date }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// E.164 form, e.g. `+12015550123`.
    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// ISO 8601 calendar date, `YYYY-MM-DD`.
    pub fn date(&self) -> &str {
        &self.date
    }
}
