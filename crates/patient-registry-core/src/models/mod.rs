//! Domain models for the patient registry.

mod form;
mod locale;
mod patient;

pub use form::*;
pub use locale::*;
pub use patient::*;
