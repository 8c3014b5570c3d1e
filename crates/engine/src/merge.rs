//! Applies a snapshot to the store, one domain per transaction.

use serde_json::Value;
use stratcat_core::snapshot::{DomainRecord, DomainSection};
use stratcat_core::{Actor, BatchId, FieldValue, RecordId, Snapshot, key};
use stratcat_storage::{Datastore, StorageError};

use crate::config::ImportConfig;
use crate::descriptor::{EntityDescriptor, EntityKind};
use crate::error::EngineError;
use crate::lookup::{ActorDirectory, Lookups, Ref, find_domain, find_named};
use crate::report::{DomainReport, DomainStatus, ImportReport};
use crate::walk::{Sink, Walk, Written};

pub struct MergeExecutor<'s, S: Datastore + ?Sized> {
    store: &'s mut S,
    config: ImportConfig,
}

impl<'s, S: Datastore + ?Sized> MergeExecutor<'s, S> {
    pub fn new(store: &'s mut S, config: ImportConfig) -> Self {
        Self { store, config }
    }

    /// Import every domain in snapshot order. Never fails as a whole: a
    /// domain that cannot be imported is reported with status `error` and
    /// leaves no rows behind, and the next domain starts fresh.
    pub fn import(&mut self, snapshot: &Snapshot, user: &Actor) -> ImportReport {
        let batch_id = BatchId::new();
        let span = tracing::info_span!("import", batch = %batch_id, domains = snapshot.domains.len());
        let _guard = span.enter();
        let mut report = ImportReport::new(batch_id);

        let actors = match ActorDirectory::load(&*self.store) {
            Ok(actors) => actors,
            Err(e) => {
                tracing::error!(error = %e, "failed to load users");
                for section in &snapshot.domains {
                    let mut domain = self.domain_report(section);
                    domain.fail(format!("failed to load users: {e}"));
                    domain.finish();
                    report.push(domain);
                }
                return report;
            }
        };

        for section in &snapshot.domains {
            let domain = self.import_domain(section, &actors, user);
            report.push(domain);
        }

        tracing::info!(
            imported = report.summary.imported,
            merged = report.summary.merged,
            skipped = report.summary.skipped,
            errors = report.summary.errors,
            "import finished"
        );
        report
    }

    fn domain_report(&self, section: &DomainSection) -> DomainReport {
        let name = key::present(section.domain.name.as_deref()).unwrap_or("(unnamed)");
        DomainReport::new(name, self.config.variant, self.config.max_warnings)
    }

    fn import_domain(
        &mut self,
        section: &DomainSection,
        actors: &ActorDirectory,
        user: &Actor,
    ) -> DomainReport {
        let mut report = self.domain_report(section);
        let Some(name) = key::present(section.domain.name.as_deref()) else {
            tracing::warn!("domain without a name");
            report.fail("domain has no name".to_string());
            report.finish();
            return report;
        };

        let span = tracing::info_span!("import_domain", domain = name);
        let _guard = span.enter();

        if let Err(e) = self.store.begin_transaction() {
            tracing::error!(error = %e, "failed to open transaction");
            report.fail(e.to_string());
            report.finish();
            return report;
        }

        let result = self
            .stage_domain(section, name, actors, user, &mut report)
            .and_then(|created| {
                self.store.commit()?;
                Ok(created)
            });

        match result {
            Ok(created) => {
                report.status = if created {
                    DomainStatus::Imported
                } else if report.total_imported() > 0 {
                    DomainStatus::Merged
                } else {
                    DomainStatus::Skipped
                };
                tracing::info!(
                    status = ?report.status,
                    imported = report.total_imported(),
                    skipped = report.total_skipped(),
                    errors = report.total_errors(),
                    "domain committed"
                );
            }
            Err(e) => {
                if let Err(rollback) = self.store.rollback() {
                    tracing::warn!(error = %rollback, "rollback failed");
                }
                tracing::error!(error = %e, "domain rolled back");
                report.fail(e.to_string());
            }
        }
        report.finish();
        report
    }

    /// Everything between BEGIN and COMMIT. Returns whether the domain row
    /// was created by this call.
    fn stage_domain(
        &mut self,
        section: &DomainSection,
        name: &str,
        actors: &ActorDirectory,
        user: &Actor,
        report: &mut DomainReport,
    ) -> Result<bool, EngineError> {
        let (domain, created) = match find_domain(&*self.store, name)? {
            Some(id) => (id, false),
            None => (self.insert_domain(&section.domain, name)?, true),
        };

        let lookups = Lookups::seed(&*self.store, Some(domain), self.config.variant.descriptors())?;
        let mut writer = Writer {
            store: &mut *self.store,
            report,
            config: &self.config,
            domain,
        };
        Walk::new(
            &mut writer,
            lookups,
            actors,
            user,
            self.config.variant,
            domain.into(),
        )
        .run(section)?;
        Ok(created)
    }

    fn insert_domain(&mut self, record: &DomainRecord, name: &str) -> Result<RecordId, EngineError> {
        let config = match &record.config {
            None | Some(Value::Null) => "{}".to_string(),
            Some(Value::String(raw)) => raw.clone(),
            Some(other) => other.to_string(),
        };
        let columns = vec![
            ("name", FieldValue::from(name)),
            (
                "display_name",
                key::present(record.display_name.as_deref()).unwrap_or(name).into(),
            ),
            (
                "domain_type",
                key::present(record.domain_type.as_deref()).unwrap_or("general").into(),
            ),
            ("hero_message", FieldValue::text_or_null(record.hero_message.as_deref())),
            ("subtitle", FieldValue::text_or_null(record.subtitle.as_deref())),
            ("config", config.into()),
            ("is_active", record.is_active.unwrap_or(true).into()),
        ];
        let (sql, params) = insert_statement("domains", &columns);
        let id = self
            .store
            .execute(&sql, &params)?
            .inserted_id
            .ok_or(EngineError::MissingInsertId { table: "domains" })?;
        tracing::debug!(domain_id = %id, "domain created");
        Ok(id)
    }
}

/// Sink that inserts rows and keeps the domain report.
struct Writer<'a, S: Datastore + ?Sized> {
    store: &'a mut S,
    report: &'a mut DomainReport,
    config: &'a ImportConfig,
    domain: RecordId,
}

impl<S: Datastore + ?Sized> Writer<'_, S> {
    fn item_error(&mut self, report_name: &'static str, label: &str, reason: &str) {
        self.report.counts_mut(report_name).errors += 1;
        self.report.warn(format!("{report_name} '{label}': {reason}"));
    }
}

impl<S: Datastore + ?Sized> Sink for Writer<'_, S> {
    fn skipped(&mut self, kind: EntityKind, label: &str) {
        tracing::debug!(entity = kind.report_name(), item = label, "already present");
        self.report.counts_mut(kind.report_name()).skipped += 1;
    }

    fn rejected(&mut self, kind: EntityKind, label: &str, reason: &str) {
        tracing::warn!(entity = kind.report_name(), item = label, reason, "item not imported");
        self.item_error(kind.report_name(), label, reason);
    }

    fn warned(&mut self, kind: EntityKind, label: &str, message: &str) {
        self.report
            .warn(format!("{} '{label}': {message}", kind.report_name()));
    }

    fn ignored(&mut self, collection: &str, count: usize) {
        self.report
            .warn(format!("{count} {collection} ignored by the simple schema"));
    }

    fn write(
        &mut self,
        descriptor: &'static EntityDescriptor,
        natural_key: &str,
        label: &str,
        columns: &[(&'static str, FieldValue)],
    ) -> Result<Written, EngineError> {
        let (sql, params) = insert_statement(descriptor.table, columns);
        match self.store.execute(&sql, &params) {
            Ok(outcome) => {
                let id = outcome.inserted_id.ok_or(EngineError::MissingInsertId {
                    table: descriptor.table,
                })?;
                self.report.counts_mut(descriptor.report_name).imported += 1;
                Ok(Written::Inserted(Ref::Stored(id)))
            }
            Err(StorageError::DuplicateKey { constraint })
                if duplicate_is_expected(self.config, descriptor, constraint.as_deref()) =>
            {
                // Another writer got there between seeding and now.
                tracing::debug!(entity = descriptor.report_name, item = label, "duplicate on insert");
                self.report.counts_mut(descriptor.report_name).skipped += 1;
                let existing = if descriptor.is_named() {
                    find_named(&*self.store, descriptor, Some(self.domain), natural_key)?
                        .map(Ref::Stored)
                } else {
                    None
                };
                Ok(Written::Skipped(existing))
            }
            Err(e) if e.is_item_level() => {
                tracing::warn!(entity = descriptor.report_name, item = label, error = %e, "insert failed");
                self.item_error(descriptor.report_name, label, &e.to_string());
                Ok(Written::Failed)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Whether a duplicate-key rejection means "this item already exists".
pub(crate) fn duplicate_is_expected(
    config: &ImportConfig,
    descriptor: &EntityDescriptor,
    constraint: Option<&str>,
) -> bool {
    if !config.verify_duplicate_constraint {
        return true;
    }
    match (descriptor.unique_constraint, constraint) {
        (Some(expected), Some(actual)) => expected.eq_ignore_ascii_case(actual.trim()),
        _ => false,
    }
}

fn insert_statement(
    table: &str,
    columns: &[(&'static str, FieldValue)],
) -> (String, Vec<FieldValue>) {
    let names: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        names.join(", "),
        placeholders.join(", ")
    );
    (sql, columns.iter().map(|(_, value)| value.clone()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_must_match_the_natural_key_constraint() {
        let config = ImportConfig::default();
        let tags = EntityKind::Tag.descriptor();
        assert!(duplicate_is_expected(&config, tags, Some("tags.name")));
        assert!(!duplicate_is_expected(&config, tags, Some("tags.id")));
        assert!(!duplicate_is_expected(&config, tags, None));

        let categories = EntityKind::Category.descriptor();
        assert!(!duplicate_is_expected(&config, categories, Some("categories.name")));
    }

    #[test]
    fn unverified_duplicates_are_always_skips() {
        let config = ImportConfig {
            verify_duplicate_constraint: false,
            ..ImportConfig::default()
        };
        let likes = EntityKind::Like.descriptor();
        assert!(duplicate_is_expected(&config, likes, None));
    }

    #[test]
    fn insert_statement_numbers_placeholders_in_column_order() {
        let (sql, params) = insert_statement(
            "tags",
            &[("name", "Fintech".into()), ("color", FieldValue::Null)],
        );
        assert_eq!(sql, "INSERT INTO tags (name, color) VALUES (?1, ?2)");
        assert_eq!(params, vec![FieldValue::Text("Fintech".into()), FieldValue::Null]);
    }
}
