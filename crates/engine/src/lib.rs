pub mod config;
pub mod descriptor;
pub mod error;
pub mod lookup;
pub mod merge;
pub mod report;
pub mod validator;
mod walk;

pub use config::{ImportConfig, SchemaVariant};
pub use descriptor::{DESCRIPTORS, EntityDescriptor, EntityKind};
pub use error::EngineError;
pub use merge::MergeExecutor;
pub use report::{
    DomainReport, DomainStatus, DomainValidation, EntityCounts, ImportReport, ImportSummary,
    Issue, PlanCounts, Severity, ValidationReport,
};
pub use validator::Validator;

use stratcat_core::{Actor, Snapshot};
use stratcat_storage::Datastore;

/// Owns a store and runs validations and imports against it.
pub struct Importer<S: Datastore> {
    store: S,
    config: ImportConfig,
}

impl<S: Datastore> Importer<S> {
    pub fn new(store: S, config: ImportConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn validate(&self, snapshot: &Snapshot, user: &Actor) -> Result<ValidationReport, EngineError> {
        Validator::new(&self.store, self.config.clone()).validate(snapshot, user)
    }

    pub fn import(&mut self, snapshot: &Snapshot, user: &Actor) -> ImportReport {
        MergeExecutor::new(&mut self.store, self.config.clone()).import(snapshot, user)
    }
}
