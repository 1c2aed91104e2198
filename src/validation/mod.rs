//! Corpus integrity validation
//! Reports violations as data with one issue kind per corpus invariant

pub mod types;
pub mod validator;

pub use types::{
    CheckResult, CountScope, DetailedReport, DocumentCheck, IntegrityIssue, IssueKind,
    ReportSummary, ValidationReport,
};
pub use validator::{IntegrityValidator, ValidatorConfig};
