//! Terminal output for the packwright binary

pub mod error;
pub mod json;
