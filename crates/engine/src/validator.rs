//! Read-only dry run of an import.

use std::collections::HashSet;

use stratcat_core::snapshot::{DomainSection, SNAPSHOT_VERSION};
use stratcat_core::{Actor, FieldValue, Snapshot, key};
use stratcat_storage::Datastore;

use crate::config::ImportConfig;
use crate::descriptor::{EntityDescriptor, EntityKind};
use crate::error::EngineError;
use crate::lookup::{ActorDirectory, Lookups, Ref, find_domain};
use crate::report::{DomainValidation, Issue, Severity, ValidationReport};
use crate::walk::{Sink, Walk, Written};

pub struct Validator<'s, S: Datastore + ?Sized> {
    store: &'s S,
    config: ImportConfig,
}

impl<'s, S: Datastore + ?Sized> Validator<'s, S> {
    pub fn new(store: &'s S, config: ImportConfig) -> Self {
        Self { store, config }
    }

    /// Classify every snapshot item the way an import would, without
    /// writing anything. Only store read failures are returned as errors.
    pub fn validate(&self, snapshot: &Snapshot, user: &Actor) -> Result<ValidationReport, EngineError> {
        let span = tracing::info_span!("validate", domains = snapshot.domains.len());
        let _guard = span.enter();

        let mut report = ValidationReport::default();
        check_metadata(snapshot, &mut report.issues);

        let actors = ActorDirectory::load(self.store)?;
        let mut seen_authors = HashSet::new();
        let mut seen_domains = HashSet::new();

        for section in &snapshot.domains {
            for author in section.author_names() {
                if actors.find(author).is_none() && seen_authors.insert(key::normalize(author)) {
                    report.unmatched_authors.push(author.to_string());
                }
            }

            let Some(name) = key::present(section.domain.name.as_deref()) else {
                report.issues.push(Issue {
                    severity: Severity::Error,
                    domain: None,
                    entity_type: "domains".to_string(),
                    entity_name: "(unnamed)".to_string(),
                    message: "domain has no name".to_string(),
                });
                continue;
            };
            if !seen_domains.insert(name.to_string()) {
                report.issues.push(Issue {
                    severity: Severity::Warning,
                    domain: Some(name.to_string()),
                    entity_type: "domains".to_string(),
                    entity_name: name.to_string(),
                    message: "domain appears more than once; later sections merge into the first"
                        .to_string(),
                });
            }

            let plan = self.validate_domain(section, name, &actors, user, &mut report.issues)?;
            report.domains.push(plan);
        }

        let valid = report.errors().next().is_none();
        report.valid = valid;
        tracing::info!(
            valid = report.valid,
            issues = report.issues.len(),
            unmatched_authors = report.unmatched_authors.len(),
            "validation finished"
        );
        Ok(report)
    }

    fn validate_domain(
        &self,
        section: &DomainSection,
        name: &str,
        actors: &ActorDirectory,
        user: &Actor,
        issues: &mut Vec<Issue>,
    ) -> Result<DomainValidation, EngineError> {
        let existing = find_domain(self.store, name)?;
        let mut plan = DomainValidation::new(name, existing.is_some(), self.config.variant);
        if existing.is_some() {
            issues.push(Issue {
                severity: Severity::Info,
                domain: Some(name.to_string()),
                entity_type: "domains".to_string(),
                entity_name: name.to_string(),
                message: "domain exists; new entities will be merged into it".to_string(),
            });
        }

        let lookups = Lookups::seed(self.store, existing, self.config.variant.descriptors())?;
        let mut dry_run = DryRun {
            domain: name,
            plan: &mut plan,
            issues,
            errors: 0,
        };
        let domain = existing.map_or(FieldValue::Null, FieldValue::from);
        Walk::new(&mut dry_run, lookups, actors, user, self.config.variant, domain).run(section)?;

        let has_errors = dry_run.errors > 0;
        plan.has_errors = has_errors;
        plan.will_skip = plan.exists && plan.total_to_import() == 0;
        Ok(plan)
    }
}

fn check_metadata(snapshot: &Snapshot, issues: &mut Vec<Issue>) {
    let meta = &snapshot.metadata;
    let mut warn = |entity_name: &str, message: String| {
        issues.push(Issue {
            severity: Severity::Warning,
            domain: None,
            entity_type: "metadata".to_string(),
            entity_name: entity_name.to_string(),
            message,
        });
    };

    match meta.version.as_deref() {
        Some(SNAPSHOT_VERSION) => {}
        Some(other) => warn(
            "version",
            format!("snapshot version '{other}' differs from supported '{SNAPSHOT_VERSION}'"),
        ),
        None => warn("version", "snapshot has no version".to_string()),
    }

    let mut actual = std::collections::BTreeMap::new();
    for section in &snapshot.domains {
        for (collection, size) in section.collection_sizes() {
            *actual.entry(collection).or_insert(0usize) += size;
        }
    }
    actual.insert("domains", snapshot.domains.len());
    for (collection, declared) in &meta.counts {
        let found = actual.get(collection.as_str()).copied().unwrap_or(0);
        if *declared != found {
            warn(
                collection.as_str(),
                format!("metadata declares {declared} but the snapshot contains {found}"),
            );
        }
    }
}

/// Sink that records what an import would do.
struct DryRun<'a> {
    domain: &'a str,
    plan: &'a mut DomainValidation,
    issues: &'a mut Vec<Issue>,
    errors: usize,
}

impl DryRun<'_> {
    fn issue(&mut self, severity: Severity, kind: EntityKind, label: &str, message: String) {
        self.issues.push(Issue {
            severity,
            domain: Some(self.domain.to_string()),
            entity_type: kind.report_name().to_string(),
            entity_name: label.to_string(),
            message,
        });
    }
}

impl Sink for DryRun<'_> {
    fn skipped(&mut self, kind: EntityKind, label: &str) {
        self.plan.counts.entry(kind.report_name()).or_default().to_skip += 1;
        self.issue(Severity::Info, kind, label, "already exists, will be skipped".to_string());
    }

    fn rejected(&mut self, kind: EntityKind, label: &str, reason: &str) {
        self.errors += 1;
        self.issue(Severity::Error, kind, label, reason.to_string());
    }

    fn warned(&mut self, kind: EntityKind, label: &str, message: &str) {
        self.issue(Severity::Warning, kind, label, message.to_string());
    }

    fn ignored(&mut self, collection: &str, count: usize) {
        self.issues.push(Issue {
            severity: Severity::Warning,
            domain: Some(self.domain.to_string()),
            entity_type: collection.to_string(),
            entity_name: format!("{count} items"),
            message: "ignored by the simple schema".to_string(),
        });
    }

    fn write(
        &mut self,
        descriptor: &'static EntityDescriptor,
        natural_key: &str,
        _label: &str,
        _columns: &[(&'static str, FieldValue)],
    ) -> Result<Written, EngineError> {
        self.plan
            .counts
            .entry(descriptor.report_name)
            .or_default()
            .to_import += 1;
        Ok(Written::Inserted(Ref::Planned(natural_key.to_string())))
    }
}
