pub mod faulty;
pub mod fixtures;
pub mod store;

pub use faulty::FaultyStore;
pub use store::TestStore;

use std::sync::Once;

static TRACING: Once = Once::new();

/// Route engine logs to the test writer. Honours `RUST_LOG`; silent otherwise.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("off"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
