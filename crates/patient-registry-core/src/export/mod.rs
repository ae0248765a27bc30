//! Export of the patient listing.

mod roster;

pub use roster::*;
