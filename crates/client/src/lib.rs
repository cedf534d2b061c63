//! apiprobe client
//!
//! Typed access to the Account and BookStore APIs. Every operation encodes the
//! documented request shape and status table and surfaces deviations as a
//! classified [`apiprobe_common::Error`].

pub mod cleanup;
pub mod client;
pub mod contract;
pub mod request;
pub mod retry;
pub mod timeout;

pub use cleanup::{CleanupLedger, CleanupStats};
pub use client::{DomainClient, AUTHORIZED_PATH, BOOKS_PATH, BOOK_PATH, TOKEN_PATH, USER_PATH};
pub use contract::{Operation, Outcome};
pub use request::{ApiRequest, ApiResponse, RequestBody};
pub use retry::{retry, RetryPolicy};
pub use timeout::within;
