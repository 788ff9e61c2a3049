//! Field validators for lead capture.
//!
//! Each validator is a pure function over the raw string. It returns the
//! normalized value or a typed reason and never panics, whatever the input.

pub mod date;
pub mod email;
pub mod phone;

pub use date::{format_iso_date, resolve_date, DateError};
pub use email::{validate_email, EmailError};
pub use phone::{validate_phone, PhoneError, PhoneRegion};
