//! # Core Runtime Module
//!
//! Ambient runtime concerns for the calendar sync core: collaborator wiring
//! and logging setup.
//!
//! ## Components
//!
//! - **Configuration** (`config`): `CoreConfig` builder with fail-fast
//!   validation of required collaborators
//! - **Logging** (`logging`): `tracing-subscriber` setup with format and
//!   filter control, plus sensitive-field redaction helpers

pub mod config;
pub mod error;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder};
pub use error::{Error, Result};
pub use logging::{init_logging, LogFormat, LoggingConfig};
