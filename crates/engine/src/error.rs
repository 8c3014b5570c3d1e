use stratcat_core::CoreError;
use stratcat_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("insert into {table} returned no id")]
    MissingInsertId { table: &'static str },
}
