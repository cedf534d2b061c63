//! apiprobe common library
//!
//! Domain types, the error taxonomy, test input generation, response schemas
//! and configuration shared by the client, the stub server and the scenarios.

pub mod config;
pub mod error;
pub mod payload;
pub mod schema;
pub mod types;

// Re-export commonly used types
pub use config::ProbeConfig;
pub use error::{body_snippet, Error, Result};
pub use payload::{PayloadClass, PayloadValue};
pub use schema::{Schema, ValidationError};
pub use types::*;

/// apiprobe version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
