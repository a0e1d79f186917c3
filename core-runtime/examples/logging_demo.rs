//! Demonstrates logging setup for a sync worker process.
//!
//! Run with: `cargo run --example logging_demo -p core-runtime`

use core_runtime::logging::{init_logging, redact_if_sensitive, LogFormat, LoggingConfig};
use tracing::{debug, info, warn, Level};

fn main() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Pretty)
        .with_level(Level::DEBUG);

    init_logging(config).expect("Failed to initialize logging");

    info!("Sync worker starting");
    debug!(account_id = "acc-demo-1", "Resolved calendar account");
    info!(
        owner = %redact_if_sensitive("email", "ada@example.com"),
        "Syncing account"
    );
    warn!(deferred = 4, "Operation cap reached, deferring remainder to next cycle");
    info!("Sync worker finished");
}
