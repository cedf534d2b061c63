//! In-process emulation of the Account and BookStore APIs
//!
//! Mirrors the remote status codes and error bodies closely enough for the
//! client contracts and scenarios to run without network access.

pub mod catalog;
pub mod error;
pub mod handlers;
pub mod server;
pub mod state;

pub use error::{StubError, StubResult};
pub use server::{router, StubServer};
pub use state::{StubOptions, StubState};
