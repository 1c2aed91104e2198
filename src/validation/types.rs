//! Validation report type definitions

use serde::Serialize;
use std::fmt;

/// Which count disagreed with the manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CountScope {
    /// Number of documents vs `manifest.total`
    Documents,
    ThemeOverview,
    ThemeToStock,
    /// `manifest.total` vs the sum of its per-type counts
    ManifestTotal,
}

impl fmt::Display for CountScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Documents => "Document count",
            Self::ThemeOverview => "Theme overview count",
            Self::ThemeToStock => "Theme to stock count",
            Self::ManifestTotal => "Manifest total",
        };
        f.write_str(label)
    }
}

/// Discriminant of an [`IntegrityIssue`], one per corpus invariant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    CountMismatch,
    DuplicateDocId,
    MissingFields,
    InvalidType,
    DanglingTheme,
}

/// A single integrity violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityIssue {
    CountMismatch {
        scope: CountScope,
        expected: usize,
        actual: usize,
    },
    DuplicateDocId {
        doc_id: String,
        occurrences: usize,
    },
    MissingFields {
        doc_id: String,
        fields: Vec<&'static str>,
    },
    InvalidType {
        doc_id: String,
        doc_type: String,
    },
    DanglingTheme {
        doc_id: String,
        theme_id: String,
    },
}

impl IntegrityIssue {
    pub fn kind(&self) -> IssueKind {
        match self {
            Self::CountMismatch { .. } => IssueKind::CountMismatch,
            Self::DuplicateDocId { .. } => IssueKind::DuplicateDocId,
            Self::MissingFields { .. } => IssueKind::MissingFields,
            Self::InvalidType { .. } => IssueKind::InvalidType,
            Self::DanglingTheme { .. } => IssueKind::DanglingTheme,
        }
    }

    /// Document the issue is about, if it concerns a single document
    pub fn doc_id(&self) -> Option<&str> {
        match self {
            Self::CountMismatch { .. } => None,
            Self::DuplicateDocId { doc_id, .. }
            | Self::MissingFields { doc_id, .. }
            | Self::InvalidType { doc_id, .. }
            | Self::DanglingTheme { doc_id, .. } => Some(doc_id),
        }
    }
}

impl fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CountMismatch {
                scope,
                expected,
                actual,
            } => write!(f, "{} mismatch: expected {}, got {}", scope, expected, actual),
            Self::DuplicateDocId {
                doc_id,
                occurrences,
            } => write!(f, "Duplicate doc_id: {} appears {} times", doc_id, occurrences),
            Self::MissingFields { doc_id, fields } => write!(
                f,
                "Missing required fields in document {}: {}",
                doc_id,
                fields.join(", ")
            ),
            Self::InvalidType { doc_id, doc_type } => {
                write!(f, "Invalid document type: {} in document: {}", doc_type, doc_id)
            }
            Self::DanglingTheme { doc_id, theme_id } => write!(
                f,
                "Stock document {} references non-existent theme: {}",
                doc_id, theme_id
            ),
        }
    }
}

/// Outcome of a corpus validation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    /// Human-readable rendering of `issues`, same order
    pub errors: Vec<String>,
    pub issues: Vec<IntegrityIssue>,
}

impl ValidationReport {
    pub fn from_issues(issues: Vec<IntegrityIssue>) -> Self {
        Self {
            is_valid: issues.is_empty(),
            errors: issues.iter().map(|i| i.to_string()).collect(),
            issues,
        }
    }

    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues.iter().filter(|i| i.kind() == kind).count()
    }

    pub fn has(&self, kind: IssueKind) -> bool {
        self.count(kind) > 0
    }
}

/// Pass/fail with messages, used for the manifest and single documents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl CheckResult {
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentCheck {
    pub doc_id: String,
    #[serde(flatten)]
    pub result: CheckResult,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub total_documents: usize,
    pub valid_documents: usize,
    pub invalid_documents: usize,
    pub total_errors: usize,
}

/// Full breakdown: manifest, each document, then corpus-wide integrity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailedReport {
    pub summary: ReportSummary,
    pub manifest: CheckResult,
    pub documents: Vec<DocumentCheck>,
    pub integrity: ValidationReport,
}
