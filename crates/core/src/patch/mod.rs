//! Patch manifest model and validation.

pub mod record;
pub mod validate;

pub use record::{Manifest, PatchRecord};
pub use validate::{ValidationReport, generate_report, validate_current, validate_records};
