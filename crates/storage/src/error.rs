use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// A UNIQUE or PRIMARY KEY rejection. `constraint` lists the offending
    /// columns as `table.column, table.column` when the engine reports them.
    #[error("duplicate key: {}", constraint.as_deref().unwrap_or("unknown constraint"))]
    DuplicateKey { constraint: Option<String> },

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("connection lost: {0}")]
    Connection(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("core error: {0}")]
    Core(#[from] stratcat_core::CoreError),
}

impl StorageError {
    /// Failures confined to the statement that raised them. Anything else
    /// leaves the surrounding transaction in doubt.
    pub fn is_item_level(&self) -> bool {
        matches!(
            self,
            Self::DuplicateKey { .. } | Self::ConstraintViolation(_) | Self::Serialization(_)
        )
    }
}
