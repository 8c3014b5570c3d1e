pub mod enums;
pub mod error;
pub mod field_value;
pub mod ids;
pub mod key;
pub mod snapshot;

pub use error::CoreError;
pub use field_value::FieldValue;
pub use ids::*;
pub use snapshot::Snapshot;
