pub mod document;
pub mod lead;
pub mod session;
