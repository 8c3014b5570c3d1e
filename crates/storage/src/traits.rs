use stratcat_core::{FieldValue, RecordId};

use crate::error::StorageError;

/// One result row, columns in select order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, FieldValue)>,
}

impl Row {
    pub fn new(columns: Vec<(String, FieldValue)>) -> Self {
        Self { columns }
    }

    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn at(&self, index: usize) -> Option<&FieldValue> {
        self.columns.get(index).map(|(_, value)| value)
    }

    pub fn text(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(FieldValue::as_text)
    }

    pub fn integer(&self, column: &str) -> Option<i64> {
        self.get(column).and_then(FieldValue::as_integer)
    }

    /// Read a non-null identity column.
    pub fn id(&self, column: &str) -> Result<RecordId, StorageError> {
        self.get(column)
            .and_then(FieldValue::as_record_id)
            .ok_or_else(|| StorageError::Serialization(format!("missing id column {column}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecOutcome {
    pub inserted_id: Option<RecordId>,
    pub affected_rows: usize,
}

/// The relational store as seen by the import pipeline.
///
/// Statements use `?N` positional parameters. At most one transaction is open
/// at a time; statements issued while it is open are staged in it.
pub trait Datastore {
    fn query(&self, sql: &str, params: &[FieldValue]) -> Result<Vec<Row>, StorageError>;

    fn execute(&mut self, sql: &str, params: &[FieldValue]) -> Result<ExecOutcome, StorageError>;

    fn begin_transaction(&mut self) -> Result<(), StorageError>;

    fn commit(&mut self) -> Result<(), StorageError>;

    fn rollback(&mut self) -> Result<(), StorageError>;

    /// Convenience for single-row lookups.
    fn query_one(&self, sql: &str, params: &[FieldValue]) -> Result<Option<Row>, StorageError> {
        Ok(self.query(sql, params)?.into_iter().next())
    }
}
