use stratcat_core::{Actor, FieldValue, RecordId, Snapshot};
use stratcat_engine::{
    EngineError, ImportConfig, ImportReport, MergeExecutor, ValidationReport, Validator,
};
use stratcat_storage::{Datastore, SqliteStore, StorageError};

/// In-memory store with two known users. `admin` runs every import.
pub struct TestStore {
    pub store: SqliteStore,
    pub admin: Actor,
    pub builder: Actor,
}

impl TestStore {
    pub fn new() -> Result<Self, StorageError> {
        Self::with_store(SqliteStore::open_in_memory()?)
    }

    pub fn with_store(mut store: SqliteStore) -> Result<Self, StorageError> {
        let admin = add_user(&mut store, "Alice Admin", "alice@example.com")?;
        let builder = add_user(&mut store, "Bob Builder", "bob@example.com")?;
        Ok(Self {
            store,
            admin,
            builder,
        })
    }

    pub fn import(&mut self, snapshot: &Snapshot) -> ImportReport {
        self.import_with(snapshot, ImportConfig::default())
    }

    pub fn import_with(&mut self, snapshot: &Snapshot, config: ImportConfig) -> ImportReport {
        crate::init_tracing();
        MergeExecutor::new(&mut self.store, config).import(snapshot, &self.admin)
    }

    /// Import on behalf of someone other than `admin`.
    pub fn import_as(&mut self, snapshot: &Snapshot, user: &Actor) -> ImportReport {
        crate::init_tracing();
        MergeExecutor::new(&mut self.store, ImportConfig::default()).import(snapshot, user)
    }

    pub fn validate(&self, snapshot: &Snapshot) -> Result<ValidationReport, EngineError> {
        self.validate_with(snapshot, ImportConfig::default())
    }

    pub fn validate_with(
        &self,
        snapshot: &Snapshot,
        config: ImportConfig,
    ) -> Result<ValidationReport, EngineError> {
        crate::init_tracing();
        Validator::new(&self.store, config).validate(snapshot, &self.admin)
    }

    pub fn count(&self, table: &str) -> Result<i64, StorageError> {
        count(&self.store, table)
    }

    /// First column of the first row, or `None` when nothing matches.
    pub fn scalar(&self, sql: &str, params: &[FieldValue]) -> Result<Option<FieldValue>, StorageError> {
        Ok(self
            .store
            .query_one(sql, params)?
            .and_then(|row| row.at(0).cloned()))
    }

    pub fn id_of(&self, table: &str, column: &str, value: &str) -> Result<Option<RecordId>, StorageError> {
        let sql = format!("SELECT id FROM {table} WHERE {column} = ?1");
        self.store
            .query_one(&sql, &[value.into()])?
            .map(|row| row.id("id"))
            .transpose()
    }
}

pub fn add_user<S: Datastore + ?Sized>(
    store: &mut S,
    name: &str,
    email: &str,
) -> Result<Actor, StorageError> {
    let outcome = store.execute(
        "INSERT INTO users (name, email) VALUES (?1, ?2)",
        &[name.into(), email.into()],
    )?;
    let id = outcome
        .inserted_id
        .ok_or_else(|| StorageError::NotFound(format!("id for user {name}")))?;
    Ok(Actor::new(id, name))
}

pub fn count<S: Datastore + ?Sized>(store: &S, table: &str) -> Result<i64, StorageError> {
    let sql = format!("SELECT COUNT(*) AS n FROM {table}");
    Ok(store
        .query_one(&sql, &[])?
        .and_then(|row| row.integer("n"))
        .unwrap_or(0))
}
