pub mod capture;

pub use capture::{CaptureState, CaptureStep, LeadCapture};
