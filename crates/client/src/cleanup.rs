//! Best-effort teardown accounting

use std::sync::atomic::{AtomicU64, Ordering};

use apiprobe_common::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Shared counter of teardown attempts and failures.
///
/// Teardown failures are logged and counted here, never propagated.
#[derive(Debug, Default)]
pub struct CleanupLedger {
    attempted: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupStats {
    pub attempted: u64,
    pub failed: u64,
}

impl CleanupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one teardown step, swallowing its error
    pub fn record<T>(&self, what: &str, result: Result<T>) {
        self.attempted.fetch_add(1, Ordering::Relaxed);
        match result {
            Ok(_) => debug!("cleanup {} ok", what),
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                warn!("cleanup {} failed: {}", what, e);
            }
        }
    }

    pub fn stats(&self) -> CleanupStats {
        CleanupStats {
            attempted: self.attempted.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apiprobe_common::Error;

    #[test]
    fn test_counts_failures_without_propagating() {
        let ledger = CleanupLedger::new();
        ledger.record("delete_account u-1", Ok(()));
        ledger.record::<()>(
            "delete_account u-2",
            Err(Error::NotFound {
                kind: "user".to_string(),
                id: "u-2".to_string(),
                status: 200,
            }),
        );
        assert_eq!(
            ledger.stats(),
            CleanupStats {
                attempted: 2,
                failed: 1
            }
        );
    }
}
