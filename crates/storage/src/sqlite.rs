use rusqlite::types::{Value, ValueRef};
use rusqlite::{Connection, ErrorCode, ffi};

use stratcat_core::{FieldValue, RecordId};

use crate::error::StorageError;
use crate::traits::{Datastore, ExecOutcome, Row};

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    fn exec_batch(&self, sql: &str) -> Result<(), StorageError> {
        self.conn
            .execute_batch(sql)
            .map_err(|e| StorageError::Transaction(format!("{sql}: {e}")))
    }
}

fn to_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Text(s) => Value::Text(s.clone()),
        FieldValue::Integer(n) => Value::Integer(*n),
        FieldValue::Float(f) => Value::Real(*f),
        FieldValue::Boolean(b) => Value::Integer(i64::from(*b)),
    }
}

fn from_value_ref(value: ValueRef<'_>, column: &str) -> Result<FieldValue, StorageError> {
    Ok(match value {
        ValueRef::Null => FieldValue::Null,
        ValueRef::Integer(n) => FieldValue::Integer(n),
        ValueRef::Real(f) => FieldValue::Float(f),
        ValueRef::Text(bytes) => FieldValue::Text(
            String::from_utf8(bytes.to_vec())
                .map_err(|e| StorageError::Serialization(format!("{column}: {e}")))?,
        ),
        ValueRef::Blob(_) => {
            return Err(StorageError::Serialization(format!(
                "{column}: blob columns are not supported"
            )));
        }
    })
}

/// Split constraint failures out of the generic sqlite error so callers can
/// tell a duplicate natural key apart from a broken reference.
fn classify(e: rusqlite::Error) -> StorageError {
    if let rusqlite::Error::SqliteFailure(err, msg) = &e {
        if err.code == ErrorCode::ConstraintViolation {
            let msg = msg.clone().unwrap_or_else(|| err.to_string());
            return match err.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    StorageError::DuplicateKey {
                        constraint: msg
                            .split_once("constraint failed: ")
                            .map(|(_, columns)| columns.trim().to_string()),
                    }
                }
                _ => StorageError::ConstraintViolation(msg),
            };
        }
    }
    StorageError::Sqlite(e)
}

fn is_insert(sql: &str) -> bool {
    sql.trim_start()
        .get(..6)
        .is_some_and(|head| head.eq_ignore_ascii_case("insert"))
}

impl Datastore for SqliteStore {
    fn query(&self, sql: &str, params: &[FieldValue]) -> Result<Vec<Row>, StorageError> {
        let mut stmt = self.conn.prepare(sql)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = stmt.query(rusqlite::params_from_iter(params.iter().map(to_value)))?;

        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            let mut columns = Vec::with_capacity(names.len());
            for (i, name) in names.iter().enumerate() {
                columns.push((name.clone(), from_value_ref(row.get_ref(i)?, name)?));
            }
            result.push(Row::new(columns));
        }
        Ok(result)
    }

    fn execute(&mut self, sql: &str, params: &[FieldValue]) -> Result<ExecOutcome, StorageError> {
        let affected_rows = self
            .conn
            .execute(sql, rusqlite::params_from_iter(params.iter().map(to_value)))
            .map_err(classify)?;
        let inserted_id = (affected_rows > 0 && is_insert(sql))
            .then(|| RecordId::from_i64(self.conn.last_insert_rowid()));
        Ok(ExecOutcome {
            inserted_id,
            affected_rows,
        })
    }

    fn begin_transaction(&mut self) -> Result<(), StorageError> {
        if self.in_transaction() {
            return Err(StorageError::Transaction(
                "a transaction is already open".into(),
            ));
        }
        self.exec_batch("BEGIN IMMEDIATE")
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        if !self.in_transaction() {
            return Err(StorageError::Transaction("no transaction is open".into()));
        }
        self.exec_batch("COMMIT")
    }

    fn rollback(&mut self) -> Result<(), StorageError> {
        if !self.in_transaction() {
            return Err(StorageError::Transaction("no transaction is open".into()));
        }
        tracing::debug!("rolling back open transaction");
        self.exec_batch("ROLLBACK")
    }
}
