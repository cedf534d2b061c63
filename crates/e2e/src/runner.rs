//! Scenario runner: groups on a bounded worker pool, scenarios in order

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use apiprobe_client::{CleanupLedger, CleanupStats, DomainClient};
use apiprobe_common::{body_snippet, ProbeConfig};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::context::ScenarioContext;
use crate::error::{E2eError, E2eResult};
use crate::playwright::StepResult;
use crate::scenario::Scenario;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Passed,
    Failed,
    Skipped,
}

/// Result of one scenario or UI spec
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseResult {
    pub name: String,
    pub group: String,
    pub verdict: Verdict,
    pub duration_ms: u64,
    /// Status code behind the failure, when the remote side produced one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<StepResult>,
}

impl CaseResult {
    pub fn passed(name: &str, group: &str, duration_ms: u64) -> Self {
        Self {
            name: name.to_string(),
            group: group.to_string(),
            verdict: Verdict::Passed,
            duration_ms,
            status: None,
            error: None,
            steps: Vec::new(),
        }
    }

    pub fn failed(name: &str, group: &str, duration_ms: u64, err: &E2eError) -> Self {
        Self {
            verdict: Verdict::Failed,
            status: err.status(),
            error: Some(body_snippet(&err.to_string())),
            ..Self::passed(name, group, duration_ms)
        }
    }

    pub fn skipped(name: &str, group: &str, reason: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Skipped,
            error: Some(reason.into()),
            ..Self::passed(name, group, 0)
        }
    }

    pub fn success(&self) -> bool {
        self.verdict != Verdict::Failed
    }
}

/// Result of a whole run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuiteReport {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    #[serde(default)]
    pub cleanup: CleanupStats,
    pub results: Vec<CaseResult>,
}

impl SuiteReport {
    pub fn from_results(results: Vec<CaseResult>, duration_ms: u64) -> Self {
        let count = |v: Verdict| results.iter().filter(|r| r.verdict == v).count();
        Self {
            total: results.len(),
            passed: count(Verdict::Passed),
            failed: count(Verdict::Failed),
            skipped: count(Verdict::Skipped),
            duration_ms,
            cleanup: CleanupStats::default(),
            results,
        }
    }

    /// Fold another report into this one
    pub fn merge(&mut self, other: SuiteReport) {
        self.total += other.total;
        self.passed += other.passed;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.duration_ms += other.duration_ms;
        self.cleanup.attempted += other.cleanup.attempted;
        self.cleanup.failed += other.cleanup.failed;
        self.results.extend(other.results);
    }

    pub fn success(&self) -> bool {
        self.failed == 0
    }

    pub fn write(&self, path: &Path) -> E2eResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!("Results written to: {}", path.display());
        Ok(())
    }
}

/// Runs API scenarios against one target
pub struct ScenarioRunner {
    client: DomainClient,
    config: Arc<ProbeConfig>,
    ledger: Arc<CleanupLedger>,
    workers: usize,
}

impl ScenarioRunner {
    pub fn new(client: DomainClient, config: ProbeConfig) -> Self {
        let workers = config.runner.workers.max(1);
        Self {
            client,
            config: Arc::new(config),
            ledger: Arc::new(CleanupLedger::new()),
            workers,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn cleanup_stats(&self) -> CleanupStats {
        self.ledger.stats()
    }

    /// Run `scenarios`, each group on its own task
    pub async fn run(&self, scenarios: Vec<Scenario>) -> SuiteReport {
        let start = Instant::now();
        let groups = group_in_order(scenarios);
        info!(
            "Running {} scenario group(s) on {} worker(s)...",
            groups.len(),
            self.workers
        );

        let permits = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();
        for (index, (group, members)) in groups.iter().cloned().enumerate() {
            let permits = permits.clone();
            let client = self.client.clone();
            let config = self.config.clone();
            let ledger = self.ledger.clone();
            tasks.spawn(async move {
                let mut results = Vec::with_capacity(members.len());
                let Ok(_permit) = permits.acquire_owned().await else {
                    return (index, results);
                };
                debug!("group {} started", group);
                for scenario in members {
                    results.push(run_one(&client, &config, &ledger, scenario).await);
                }
                (index, results)
            });
        }

        let mut by_group: Vec<Option<Vec<CaseResult>>> = vec![None; groups.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, results)) => by_group[index] = Some(results),
                Err(e) => error!("scenario group task failed: {}", e),
            }
        }

        let mut results = Vec::new();
        for ((group, members), finished) in groups.iter().zip(by_group) {
            match finished {
                Some(r) => results.extend(r),
                None => results.extend(members.iter().map(|s| {
                    let err = E2eError::AssertionFailed(format!("group {} aborted", group));
                    CaseResult::failed(s.name, s.group, 0, &err)
                })),
            }
        }

        let mut report = SuiteReport::from_results(results, start.elapsed().as_millis() as u64);
        report.cleanup = self.ledger.stats();

        info!("");
        info!(
            "Scenario Results: {} passed, {} failed, {} skipped ({} ms)",
            report.passed, report.failed, report.skipped, report.duration_ms
        );
        if report.cleanup.failed > 0 {
            warn!(
                "{} of {} cleanup steps failed",
                report.cleanup.failed, report.cleanup.attempted
            );
        }
        report
    }
}

async fn run_one(
    client: &DomainClient,
    config: &Arc<ProbeConfig>,
    ledger: &Arc<CleanupLedger>,
    scenario: Scenario,
) -> CaseResult {
    let start = Instant::now();
    let provisioned =
        ScenarioContext::provision(client.clone(), config.clone(), ledger.clone(), scenario.fixture)
            .await;

    let outcome = match provisioned {
        Ok(mut ctx) => {
            let outcome = (scenario.run)(&mut ctx).await;
            ctx.teardown().await;
            outcome
        }
        Err(e) => Err(e),
    };

    let duration_ms = start.elapsed().as_millis() as u64;
    match outcome {
        Ok(()) => {
            info!("✓ {}::{} ({} ms)", scenario.group, scenario.name, duration_ms);
            CaseResult::passed(scenario.name, scenario.group, duration_ms)
        }
        Err(e) => {
            match e.status() {
                Some(status) => error!("✗ {}::{} - [{}] {}", scenario.group, scenario.name, status, e),
                None => error!("✗ {}::{} - {}", scenario.group, scenario.name, e),
            }
            CaseResult::failed(scenario.name, scenario.group, duration_ms, &e)
        }
    }
}

/// Group scenarios by group name, keeping first-seen order
fn group_in_order(scenarios: Vec<Scenario>) -> Vec<(&'static str, Vec<Scenario>)> {
    let mut groups: Vec<(&'static str, Vec<Scenario>)> = Vec::new();
    for scenario in scenarios {
        match groups.iter_mut().find(|(g, _)| *g == scenario.group) {
            Some((_, members)) => members.push(scenario),
            None => groups.push((scenario.group, vec![scenario])),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grouping_keeps_order() {
        let groups = group_in_order(crate::scenario::all());
        let names: Vec<_> = groups.iter().map(|(g, _)| *g).collect();
        assert_eq!(names, vec!["account", "bookstore"]);
        assert!(groups.iter().all(|(g, m)| m.iter().all(|s| s.group == *g)));
    }

    #[test]
    fn test_report_counts_and_merge() {
        let err = E2eError::AssertionFailed("boom".into());
        let mut report = SuiteReport::from_results(
            vec![
                CaseResult::passed("a", "account", 3),
                CaseResult::failed("b", "account", 4, &err),
            ],
            7,
        );
        assert_eq!((report.total, report.passed, report.failed), (2, 1, 1));
        assert!(!report.success());

        report.merge(SuiteReport::from_results(
            vec![CaseResult::skipped("ui", "ui", "no playwright")],
            0,
        ));
        assert_eq!((report.total, report.skipped), (3, 1));
        assert_eq!(report.results[1].error.as_deref(), Some("Assertion failed: boom"));
    }

    #[test]
    fn test_report_is_written_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/scenario-results.json");
        let report = SuiteReport::from_results(vec![CaseResult::passed("a", "g", 1)], 1);
        report.write(&path).unwrap();

        let back: SuiteReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back.passed, 1);
        assert_eq!(back.results[0].verdict, Verdict::Passed);
    }
}
