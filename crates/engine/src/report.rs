use std::collections::BTreeMap;

use serde::Serialize;
use stratcat_core::BatchId;

use crate::config::SchemaVariant;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EntityCounts {
    pub imported: usize,
    pub skipped: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainStatus {
    /// The domain did not exist and was created.
    Imported,
    /// The domain existed and at least one entity was added.
    Merged,
    /// The domain existed and nothing new was added.
    Skipped,
    /// The domain's transaction was rolled back.
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct DomainReport {
    pub name: String,
    pub status: DomainStatus,
    pub counts: BTreeMap<&'static str, EntityCounts>,
    pub warnings: Vec<String>,
    pub error: Option<String>,
    #[serde(skip)]
    max_warnings: usize,
    #[serde(skip)]
    dropped_warnings: usize,
}

impl DomainReport {
    pub(crate) fn new(name: &str, variant: SchemaVariant, max_warnings: usize) -> Self {
        Self {
            name: name.to_string(),
            status: DomainStatus::Skipped,
            counts: variant
                .descriptors()
                .map(|d| (d.report_name, EntityCounts::default()))
                .collect(),
            warnings: Vec::new(),
            error: None,
            max_warnings,
            dropped_warnings: 0,
        }
    }

    /// Counts for one entity type; zero when the type was not part of the run.
    pub fn counts(&self, report_name: &str) -> EntityCounts {
        self.counts.get(report_name).copied().unwrap_or_default()
    }

    pub(crate) fn counts_mut(&mut self, report_name: &'static str) -> &mut EntityCounts {
        self.counts.entry(report_name).or_default()
    }

    pub fn total_imported(&self) -> usize {
        self.counts.values().map(|c| c.imported).sum()
    }

    pub fn total_skipped(&self) -> usize {
        self.counts.values().map(|c| c.skipped).sum()
    }

    pub fn total_errors(&self) -> usize {
        self.counts.values().map(|c| c.errors).sum()
    }

    pub(crate) fn warn(&mut self, message: String) {
        if self.warnings.len() < self.max_warnings {
            self.warnings.push(message);
        } else {
            self.dropped_warnings += 1;
        }
    }

    /// Mark the domain as rolled back. Nothing was persisted, so the
    /// per-type counts no longer describe the store and are cleared.
    pub(crate) fn fail(&mut self, message: String) {
        self.status = DomainStatus::Error;
        self.error = Some(message);
        for counts in self.counts.values_mut() {
            *counts = EntityCounts::default();
        }
    }

    pub(crate) fn finish(&mut self) {
        if self.dropped_warnings > 0 {
            self.warnings
                .push(format!("{} more warnings omitted", self.dropped_warnings));
            self.dropped_warnings = 0;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub merged: usize,
    pub skipped: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub batch_id: BatchId,
    pub domains: Vec<DomainReport>,
    pub summary: ImportSummary,
}

impl ImportReport {
    pub(crate) fn new(batch_id: BatchId) -> Self {
        Self {
            batch_id,
            domains: Vec::new(),
            summary: ImportSummary::default(),
        }
    }

    pub(crate) fn push(&mut self, domain: DomainReport) {
        match domain.status {
            DomainStatus::Imported => self.summary.imported += 1,
            DomainStatus::Merged => self.summary.merged += 1,
            DomainStatus::Skipped => self.summary.skipped += 1,
            DomainStatus::Error => self.summary.errors += 1,
        }
        self.domains.push(domain);
    }

    pub fn domain(&self, name: &str) -> Option<&DomainReport> {
        self.domains.iter().find(|d| d.name == name)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

// ============================================================================
// Validation
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// The import should not proceed as-is.
    Error,
    /// The item imports, with a reference dropped or a value defaulted.
    Warning,
    /// Narrates a skip decision.
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub severity: Severity,
    pub domain: Option<String>,
    pub entity_type: String,
    pub entity_name: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanCounts {
    pub to_import: usize,
    pub to_skip: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DomainValidation {
    pub name: String,
    pub exists: bool,
    pub will_skip: bool,
    pub has_errors: bool,
    pub counts: BTreeMap<&'static str, PlanCounts>,
}

impl DomainValidation {
    pub(crate) fn new(name: &str, exists: bool, variant: SchemaVariant) -> Self {
        Self {
            name: name.to_string(),
            exists,
            will_skip: false,
            has_errors: false,
            counts: variant
                .descriptors()
                .map(|d| (d.report_name, PlanCounts::default()))
                .collect(),
        }
    }

    pub fn counts(&self, report_name: &str) -> PlanCounts {
        self.counts.get(report_name).copied().unwrap_or_default()
    }

    pub fn total_to_import(&self) -> usize {
        self.counts.values().map(|c| c.to_import).sum()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub domains: Vec<DomainValidation>,
    pub issues: Vec<Issue>,
    /// Author names with no matching user; the import attributes them to the
    /// invoking user.
    pub unmatched_authors: Vec<String>,
}

impl ValidationReport {
    pub fn domain(&self, name: &str) -> Option<&DomainValidation> {
        self.domains.iter().find(|d| d.name == name)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Issue> {
        self.issues_with(Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Issue> {
        self.issues_with(Severity::Warning)
    }

    pub fn issues_with(&self, severity: Severity) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(move |i| i.severity == severity)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_past_the_cap_are_summarised() {
        let mut report = DomainReport::new("Finance", SchemaVariant::Simple, 2);
        for i in 0..5 {
            report.warn(format!("warning {i}"));
        }
        report.finish();
        assert_eq!(
            report.warnings,
            vec!["warning 0", "warning 1", "3 more warnings omitted"]
        );
    }

    #[test]
    fn failing_a_domain_clears_counts() {
        let mut report = DomainReport::new("Finance", SchemaVariant::Rich, 10);
        report.counts_mut("initiatives").imported = 3;
        report.fail("connection lost".into());
        assert_eq!(report.status, DomainStatus::Error);
        assert_eq!(report.total_imported(), 0);
        assert_eq!(report.error.as_deref(), Some("connection lost"));
    }

    #[test]
    fn summary_tracks_statuses() {
        let mut report = ImportReport::new(BatchId::new());
        let mut merged = DomainReport::new("A", SchemaVariant::Rich, 10);
        merged.status = DomainStatus::Merged;
        let mut failed = DomainReport::new("B", SchemaVariant::Rich, 10);
        failed.fail("boom".into());
        report.push(merged);
        report.push(failed);
        assert_eq!(
            report.summary,
            ImportSummary {
                imported: 0,
                merged: 1,
                skipped: 0,
                errors: 1
            }
        );
        assert!(report.domain("B").is_some());
    }
}
