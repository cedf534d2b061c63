//! apiprobe scenario framework
//!
//! This crate drives the two products under test:
//! - Runs named API scenarios against the remote BookStore deployment or the
//!   in-process stub, each with its own provisioned and torn-down account
//! - Runs scenario groups concurrently on a bounded worker pool
//! - Describes UI flows as declarative YAML specs or page-object builders
//! - Controls Playwright through a generated Node script per spec
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Scenario Harness (Rust)                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ServerHandle                                               │
//! │    ├── Target::Stub   -> apiprobe-stub on 127.0.0.1:0       │
//! │    └── Target::Remote -> https://demoqa.com                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ScenarioRunner                                             │
//! │    ├── group "account"   ─┐  Semaphore(workers) + JoinSet   │
//! │    └── group "bookstore" ─┘  sequential within a group      │
//! │          └── ScenarioContext                                │
//! │                ├── provision(Fixture)                       │
//! │                ├── run(&mut ctx) -> E2eResult<()>           │
//! │                └── teardown() -> CleanupLedger              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  UiRunner                                                   │
//! │    ├── SignUpPage / SignInPage -> TestSpec                  │
//! │    ├── specs/*.yaml            -> TestSpec                  │
//! │    └── PlaywrightHandle::run_spec -> [StepResult]           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SuiteReport -> test-results/scenario-results.json          │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod context;
pub mod error;
pub mod pages;
pub mod playwright;
pub mod runner;
pub mod scenario;
pub mod scenarios;
pub mod server;
pub mod spec;
#[cfg(test)]
mod testing;
pub mod ui;

pub use context::{Fixture, ScenarioContext};
pub use error::{E2eError, E2eResult};
pub use runner::{CaseResult, ScenarioRunner, SuiteReport, Verdict};
pub use scenario::{Scenario, Selection};
pub use server::{ServerConfig, ServerHandle};
pub use spec::{TestSpec, TestStep};
pub use ui::UiRunner;
