use std::cell::RefCell;
use std::collections::HashMap;

use stratcat_core::FieldValue;
use stratcat_storage::{Datastore, ExecOutcome, Row, StorageError};

/// Wraps a store and injects failures by table.
///
/// `fail_nth_insert` makes the n-th INSERT into a table fail with a
/// connection error, which no import can isolate. `hide_first_reads` makes
/// the first n SELECTs from a table come back empty, as if another writer
/// inserted rows right after they were read.
pub struct FaultyStore<S> {
    inner: S,
    fail_insert: Option<(String, usize)>,
    inserts: HashMap<String, usize>,
    hidden_reads: RefCell<HashMap<String, usize>>,
}

impl<S: Datastore> FaultyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fail_insert: None,
            inserts: HashMap::new(),
            hidden_reads: RefCell::new(HashMap::new()),
        }
    }

    pub fn fail_nth_insert(mut self, table: &str, n: usize) -> Self {
        self.fail_insert = Some((table.to_string(), n));
        self
    }

    pub fn hide_first_reads(self, table: &str, n: usize) -> Self {
        self.hidden_reads.borrow_mut().insert(table.to_string(), n);
        self
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

/// The table named right after `keyword` (`FROM`, `INTO`).
fn table_after<'a>(sql: &'a str, keyword: &str) -> Option<&'a str> {
    let mut words = sql.split_whitespace();
    words.find(|w| w.eq_ignore_ascii_case(keyword))?;
    words.next()
}

impl<S: Datastore> Datastore for FaultyStore<S> {
    fn query(&self, sql: &str, params: &[FieldValue]) -> Result<Vec<Row>, StorageError> {
        if let Some(table) = table_after(sql, "FROM") {
            if let Some(remaining) = self.hidden_reads.borrow_mut().get_mut(table) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Ok(Vec::new());
                }
            }
        }
        self.inner.query(sql, params)
    }

    fn execute(&mut self, sql: &str, params: &[FieldValue]) -> Result<ExecOutcome, StorageError> {
        if let (Some(table), Some((target, n))) = (table_after(sql, "INTO"), &self.fail_insert) {
            if table == target {
                let seen = self.inserts.entry(table.to_string()).or_insert(0);
                *seen += 1;
                if *seen == *n {
                    return Err(StorageError::Connection(format!("dropped during insert into {table}")));
                }
            }
        }
        self.inner.execute(sql, params)
    }

    fn begin_transaction(&mut self) -> Result<(), StorageError> {
        self.inner.begin_transaction()
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        self.inner.commit()
    }

    fn rollback(&mut self) -> Result<(), StorageError> {
        self.inner.rollback()
    }
}
