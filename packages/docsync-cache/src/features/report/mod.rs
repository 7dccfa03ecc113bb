//! Integrity reporting

mod generator;

pub use generator::{EntryReport, IntegrityReport, ReportGenerator};
