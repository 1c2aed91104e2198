//! Corpus integrity validator
//! Cross-checks a manifest against its document set; never fails

use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::types::{DocumentKind, Manifest, RagDocument};
use crate::validation::types::{
    CheckResult, CountScope, DetailedReport, DocumentCheck, IntegrityIssue, ReportSummary,
    ValidationReport,
};

/// Validator configuration
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Document and per-type counts against the manifest
    pub check_counts: bool,

    /// `doc_id` uniqueness
    pub check_unique_ids: bool,

    /// Required-field presence
    pub check_required_fields: bool,

    /// Type-enum membership
    pub check_types: bool,

    /// `theme_to_stock` documents reference an existing theme
    pub check_references: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            check_counts: true,
            check_unique_ids: true,
            check_required_fields: true,
            check_types: true,
            check_references: true,
        }
    }
}

/// Integrity validator for a loaded corpus
#[derive(Debug, Clone, Default)]
pub struct IntegrityValidator {
    config: ValidatorConfig,
}

impl IntegrityValidator {
    /// Create new validator with every check enabled
    pub fn new() -> Self {
        Self::with_config(ValidatorConfig::default())
    }

    pub fn with_config(config: ValidatorConfig) -> Self {
        Self { config }
    }

    /// Run every enabled check; each contributes independently
    pub fn validate(&self, manifest: &Manifest, documents: &[RagDocument]) -> ValidationReport {
        let mut issues = Vec::new();

        if self.config.check_counts {
            issues.extend(count_issues(manifest, documents));
        }
        if self.config.check_unique_ids {
            issues.extend(duplicate_issues(documents));
        }
        if self.config.check_required_fields {
            issues.extend(documents.iter().filter_map(|doc| {
                let fields = missing_fields(doc);
                (!fields.is_empty()).then(|| IntegrityIssue::MissingFields {
                    doc_id: doc.doc_id.clone(),
                    fields,
                })
            }));
        }
        if self.config.check_types {
            issues.extend(documents.iter().filter_map(|doc| match &doc.kind {
                DocumentKind::Unrecognized(raw) if !raw.is_empty() => {
                    Some(IntegrityIssue::InvalidType {
                        doc_id: doc.doc_id.clone(),
                        doc_type: raw.clone(),
                    })
                }
                _ => None,
            }));
        }
        if self.config.check_references {
            issues.extend(dangling_theme_issues(documents));
        }

        let report = ValidationReport::from_issues(issues);
        if report.is_valid {
            debug!(documents = documents.len(), "Corpus validation passed");
        } else {
            warn!(
                documents = documents.len(),
                errors = report.errors.len(),
                "Corpus validation found integrity issues"
            );
        }
        report
    }

    /// Manifest on its own: total equals the per-type sum, fields non-empty
    pub fn validate_manifest(&self, manifest: &Manifest) -> CheckResult {
        let mut errors = Vec::new();
        if manifest.declared_sum() != manifest.total {
            errors.push(format!(
                "Total {} does not match sum of theme_overview and theme_to_stock ({})",
                manifest.total,
                manifest.declared_sum()
            ));
        }
        if manifest.fields.is_empty() {
            errors.push("Fields must be a non-empty list".to_string());
        }
        CheckResult::from_errors(errors)
    }

    /// Shape of a single document
    pub fn validate_document(&self, doc: &RagDocument) -> CheckResult {
        let mut errors: Vec<String> = missing_fields(doc)
            .into_iter()
            .map(|field| format!("Missing {}", field))
            .collect();

        if let DocumentKind::Unrecognized(raw) = &doc.kind {
            if !raw.is_empty() {
                errors.push(format!("Invalid type: {}", raw));
            }
        }
        CheckResult::from_errors(errors)
    }

    /// Manifest, per-document and corpus-wide results with a summary
    pub fn detailed_report(&self, manifest: &Manifest, documents: &[RagDocument]) -> DetailedReport {
        let manifest_check = self.validate_manifest(manifest);
        let document_checks: Vec<DocumentCheck> = documents
            .iter()
            .map(|doc| DocumentCheck {
                doc_id: doc.doc_id.clone(),
                result: self.validate_document(doc),
            })
            .collect();

        let mut integrity_issues = count_issues(manifest, documents);
        integrity_issues.extend(duplicate_issues(documents));
        integrity_issues.extend(dangling_theme_issues(documents));
        let integrity = ValidationReport::from_issues(integrity_issues);

        let valid_documents = document_checks.iter().filter(|c| c.result.is_valid).count();
        let total_errors = manifest_check.errors.len()
            + document_checks.iter().map(|c| c.result.errors.len()).sum::<usize>()
            + integrity.errors.len();

        DetailedReport {
            summary: ReportSummary {
                total_documents: documents.len(),
                valid_documents,
                invalid_documents: documents.len() - valid_documents,
                total_errors,
            },
            manifest: manifest_check,
            documents: document_checks,
            integrity,
        }
    }
}

fn count_issues(manifest: &Manifest, documents: &[RagDocument]) -> Vec<IntegrityIssue> {
    let overview = documents.iter().filter(|d| d.is_theme_overview()).count();
    let to_stock = documents.iter().filter(|d| d.is_theme_to_stock()).count();

    [
        (CountScope::Documents, manifest.total, documents.len()),
        (CountScope::ThemeOverview, manifest.theme_overview, overview),
        (CountScope::ThemeToStock, manifest.theme_to_stock, to_stock),
        (CountScope::ManifestTotal, manifest.total, manifest.declared_sum()),
    ]
    .into_iter()
    .filter(|(_, expected, actual)| expected != actual)
    .map(|(scope, expected, actual)| IntegrityIssue::CountMismatch {
        scope,
        expected,
        actual,
    })
    .collect()
}

/// One issue per duplicated id, in first-seen order
fn duplicate_issues(documents: &[RagDocument]) -> Vec<IntegrityIssue> {
    let mut occurrences: HashMap<&str, usize> = HashMap::new();
    let mut order = Vec::new();
    for doc in documents.iter().filter(|d| !d.doc_id.is_empty()) {
        let count = occurrences.entry(doc.doc_id.as_str()).or_insert(0);
        if *count == 0 {
            order.push(doc.doc_id.as_str());
        }
        *count += 1;
    }

    order
        .into_iter()
        .filter_map(|doc_id| {
            let n = occurrences[doc_id];
            (n > 1).then(|| IntegrityIssue::DuplicateDocId {
                doc_id: doc_id.to_string(),
                occurrences: n,
            })
        })
        .collect()
}

fn dangling_theme_issues(documents: &[RagDocument]) -> Vec<IntegrityIssue> {
    let themes: HashSet<&str> = documents
        .iter()
        .filter(|d| d.is_theme_overview())
        .map(|d| d.theme_id.as_str())
        .collect();

    documents
        .iter()
        .filter(|d| d.is_theme_to_stock())
        // An empty theme_id is reported as a missing field instead
        .filter(|d| !d.theme_id.is_empty() && !themes.contains(d.theme_id.as_str()))
        .map(|d| IntegrityIssue::DanglingTheme {
            doc_id: d.doc_id.clone(),
            theme_id: d.theme_id.clone(),
        })
        .collect()
}

fn missing_fields(doc: &RagDocument) -> Vec<&'static str> {
    let mut missing = Vec::new();
    let mut require = |name: &'static str, value: &str| {
        if value.trim().is_empty() {
            missing.push(name);
        }
    };

    require("doc_id", &doc.doc_id);
    require("type", doc.kind.type_name());
    require("title", &doc.title);
    require("text", &doc.text);

    match &doc.kind {
        DocumentKind::ThemeOverview => {
            require("theme_id", &doc.theme_id);
            require("theme_name", &doc.theme_name);
        }
        DocumentKind::ThemeToStock { stock_name, .. } => {
            require("theme_id", &doc.theme_id);
            require("theme_name", &doc.theme_name);
            require("stock_name", stock_name);
        }
        DocumentKind::Unrecognized(_) => {}
    }
    missing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::types::IssueKind;

    fn corpus() -> (Manifest, Vec<RagDocument>) {
        let docs = vec![
            RagDocument::theme_overview("ov.ai", "theme.ai", "AI 伺服器", "AI 伺服器供應鏈"),
            RagDocument::theme_overview("ov.ev", "theme.ev", "電動車", "電動車產業鏈"),
            RagDocument::theme_to_stock("ts.ai.2330", "theme.ai", "AI 伺服器", "2330", "台積電", "先進製程"),
            RagDocument::theme_to_stock("ts.ai.2382", "theme.ai", "AI 伺服器", "2382", "廣達", "伺服器組裝"),
            RagDocument::theme_to_stock("ts.ev.2308", "theme.ev", "電動車", "2308", "台達電", "充電樁"),
        ];
        (Manifest::new(2, 3), docs)
    }

    #[test]
    fn test_consistent_corpus_is_valid() {
        let (manifest, docs) = corpus();
        let report = IntegrityValidator::new().validate(&manifest, &docs);
        assert!(report.is_valid);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_dangling_theme_yields_one_error() {
        let (manifest, mut docs) = corpus();
        docs[4].theme_id = "theme.missing".to_string();

        let report = IntegrityValidator::new().validate(&manifest, &docs);
        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("ts.ev.2308"));
        assert!(report.errors[0].contains("theme.missing"));
        assert_eq!(report.count(IssueKind::DanglingTheme), 1);
    }

    #[test]
    fn test_count_mismatch_only() {
        let (_, docs) = corpus();
        let manifest = Manifest::new(2, 4);
        let report = IntegrityValidator::new().validate(&manifest, &docs);
        assert!(report.issues.iter().all(|i| i.kind() == IssueKind::CountMismatch));
        assert_eq!(report.count(IssueKind::CountMismatch), 2);
    }

    #[test]
    fn test_manifest_total_must_equal_sum() {
        let (mut manifest, docs) = corpus();
        manifest.total = 6;
        let report = IntegrityValidator::new().validate(&manifest, &docs);
        assert!(report.issues.iter().all(|i| i.kind() == IssueKind::CountMismatch));
        assert!(report.issues.contains(&IntegrityIssue::CountMismatch {
            scope: CountScope::ManifestTotal,
            expected: 6,
            actual: 5,
        }));
    }

    #[test]
    fn test_duplicate_doc_id() {
        let (manifest, mut docs) = corpus();
        docs[3].doc_id = "ts.ai.2330".to_string();
        let report = IntegrityValidator::new().validate(&manifest, &docs);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(
            report.issues[0],
            IntegrityIssue::DuplicateDocId {
                doc_id: "ts.ai.2330".to_string(),
                occurrences: 2,
            }
        );
    }

    #[test]
    fn test_missing_fields_named_together() {
        let (manifest, mut docs) = corpus();
        docs[2].text.clear();
        docs[2].kind = DocumentKind::ThemeToStock {
            ticker: String::new(),
            stock_name: String::new(),
        };

        let report = IntegrityValidator::new().validate(&manifest, &docs);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(
            report.issues[0],
            IntegrityIssue::MissingFields {
                doc_id: "ts.ai.2330".to_string(),
                fields: vec!["text", "stock_name"],
            }
        );
    }

    #[test]
    fn test_empty_ticker_is_allowed() {
        let (manifest, mut docs) = corpus();
        docs[2].kind = DocumentKind::ThemeToStock {
            ticker: String::new(),
            stock_name: "台積電".to_string(),
        };
        assert!(IntegrityValidator::new().validate(&manifest, &docs).is_valid);
    }

    #[test]
    fn test_invalid_type_reported() {
        let (_, mut docs) = corpus();
        docs[4].kind = DocumentKind::Unrecognized("sector_map".to_string());
        // Manifest agrees with the recognized counts
        let manifest = Manifest {
            total: 5,
            ..Manifest::new(2, 2)
        };

        let report = IntegrityValidator::new().validate(&manifest, &docs);
        let kinds: Vec<_> = report.issues.iter().map(|i| i.kind()).collect();
        assert!(kinds.contains(&IssueKind::InvalidType));
        assert!(!kinds.contains(&IssueKind::MissingFields));
        assert!(!kinds.contains(&IssueKind::DanglingTheme));
    }

    fn kinds(report: &ValidationReport) -> HashSet<IssueKind> {
        report.issues.iter().map(|i| i.kind()).collect()
    }

    fn count_scopes(report: &ValidationReport) -> Vec<CountScope> {
        report
            .issues
            .iter()
            .filter_map(|i| match i {
                IntegrityIssue::CountMismatch { scope, .. } => Some(*scope),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_single_violation_kinds_with_fixed_manifest() {
        let validator = IntegrityValidator::new();
        let (manifest, base) = corpus();

        let mut docs = base.clone();
        docs[3].doc_id = "ts.ai.2330".to_string();
        assert_eq!(kinds(&validator.validate(&manifest, &docs)), HashSet::from([IssueKind::DuplicateDocId]));

        let mut docs = base.clone();
        docs[0].title.clear();
        assert_eq!(kinds(&validator.validate(&manifest, &docs)), HashSet::from([IssueKind::MissingFields]));

        let mut docs = base.clone();
        docs[3].theme_id = "theme.missing".to_string();
        assert_eq!(kinds(&validator.validate(&manifest, &docs)), HashSet::from([IssueKind::DanglingTheme]));

        let mut docs = base.clone();
        docs.remove(3);
        let report = validator.validate(&manifest, &docs);
        assert_eq!(kinds(&report), HashSet::from([IssueKind::CountMismatch]));
        assert_eq!(count_scopes(&report), vec![CountScope::Documents, CountScope::ThemeToStock]);
    }

    #[test]
    fn test_unknown_type_also_shifts_type_count() {
        let (manifest, mut docs) = corpus();
        docs[4].kind = DocumentKind::Unrecognized("sector_map".to_string());

        let report = IntegrityValidator::new().validate(&manifest, &docs);
        assert_eq!(
            kinds(&report),
            HashSet::from([IssueKind::InvalidType, IssueKind::CountMismatch])
        );
        assert_eq!(count_scopes(&report), vec![CountScope::ThemeToStock]);
        assert_eq!(report.count(IssueKind::InvalidType), 1);
    }

    #[test]
    fn test_appended_duplicate_also_shifts_counts() {
        let (manifest, mut docs) = corpus();
        docs.push(docs[2].clone());

        let report = IntegrityValidator::new().validate(&manifest, &docs);
        assert_eq!(
            kinds(&report),
            HashSet::from([IssueKind::DuplicateDocId, IssueKind::CountMismatch])
        );
        assert_eq!(count_scopes(&report), vec![CountScope::Documents, CountScope::ThemeToStock]);
        assert_eq!(report.count(IssueKind::DuplicateDocId), 1);
    }

    #[test]
    fn test_validate_document() {
        let validator = IntegrityValidator::new();
        let (_, docs) = corpus();
        assert!(validator.validate_document(&docs[0]).is_valid);

        let mut doc = docs[0].clone();
        doc.title.clear();
        doc.kind = DocumentKind::Unrecognized("other".to_string());
        let result = validator.validate_document(&doc);
        assert_eq!(result.errors, vec!["Missing title", "Invalid type: other"]);
    }

    #[test]
    fn test_validate_manifest() {
        let validator = IntegrityValidator::new();
        assert!(validator.validate_manifest(&Manifest::new(1, 1)).is_valid);

        let mut manifest = Manifest::new(1, 1);
        manifest.total = 3;
        manifest.fields.clear();
        assert_eq!(validator.validate_manifest(&manifest).errors.len(), 2);
    }

    #[test]
    fn test_detailed_report_summary() {
        let (manifest, mut docs) = corpus();
        docs[1].text.clear();
        let report = IntegrityValidator::new().detailed_report(&manifest, &docs);

        assert_eq!(report.summary.total_documents, 5);
        assert_eq!(report.summary.valid_documents, 4);
        assert_eq!(report.summary.invalid_documents, 1);
        assert_eq!(report.summary.total_errors, 1);
        assert!(report.manifest.is_valid);
        assert!(report.integrity.is_valid);
        assert!(!report.documents[1].result.is_valid);
    }

    #[test]
    fn test_disabled_checks_are_skipped() {
        let (_, docs) = corpus();
        let validator = IntegrityValidator::with_config(ValidatorConfig {
            check_counts: false,
            ..Default::default()
        });
        assert!(validator.validate(&Manifest::new(9, 9), &docs).is_valid);
    }
}
