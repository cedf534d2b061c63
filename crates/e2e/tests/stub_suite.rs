//! The full scenario catalogue against the in-process stub

use std::time::Duration;

use apiprobe_client::DomainClient;
use apiprobe_common::ProbeConfig;
use apiprobe_e2e::scenario;
use apiprobe_e2e::{Selection, ScenarioRunner, ServerConfig, ServerHandle, Verdict};

async fn runner() -> (ServerHandle, ScenarioRunner) {
    let server = ServerHandle::spawn(ServerConfig::stub()).await.unwrap();
    let client = DomainClient::new(server.base_url(), Duration::from_secs(5)).unwrap();
    (server, ScenarioRunner::new(client, ProbeConfig::default()))
}

#[tokio::test]
async fn test_every_scenario_passes_against_stub() {
    let (server, runner) = runner().await;
    let report = runner.run(scenario::all()).await;

    let failures: Vec<_> = report
        .results
        .iter()
        .filter(|r| r.verdict == Verdict::Failed)
        .map(|r| format!("{}: {}", r.name, r.error.as_deref().unwrap_or("")))
        .collect();
    assert!(failures.is_empty(), "failed scenarios:\n{}", failures.join("\n"));
    assert_eq!(report.total, scenario::all().len());

    assert_eq!(report.cleanup.failed, 0);
    assert!(report.cleanup.attempted > 0);
    assert_eq!(runner.cleanup_stats(), report.cleanup);
    assert_eq!(server.stub().unwrap().user_count().await, 0, "accounts leaked");
    server.stop().await;
}

#[tokio::test]
async fn test_single_worker_runs_groups_in_order() {
    let (server, runner) = runner().await;
    let runner = runner.with_workers(1);
    let selection = Selection {
        tag: Some("smoke".to_string()),
        ..Selection::default()
    };
    let smoke: Vec<_> = scenario::all()
        .into_iter()
        .filter(|s| selection.matches(s))
        .collect();

    let report = runner.run(smoke.clone()).await;
    assert!(report.success());
    let names: Vec<_> = report.results.iter().map(|r| r.name.as_str()).collect();
    let expected: Vec<_> = smoke.iter().map(|s| s.name).collect();
    assert_eq!(names, expected);
    server.stop().await;
}

#[tokio::test]
async fn test_hostile_usernames_are_not_stored() {
    let (server, runner) = runner().await;
    let selection = Selection {
        name: Some("hostile".to_string()),
        ..Selection::default()
    };
    let picked: Vec<_> = scenario::all()
        .into_iter()
        .filter(|s| selection.matches(s))
        .collect();
    assert!(!picked.is_empty());

    let report = runner.run(picked).await;
    assert!(report.success());
    let stored = server.stub().unwrap().usernames().await;
    assert!(stored.iter().all(|u| !u.contains('<') && !u.contains('\'')));
    server.stop().await;
}

#[tokio::test]
async fn test_questionable_usernames_leave_nothing_behind() {
    let (server, runner) = runner().await;
    let selection = Selection {
        name: Some("questionable".to_string()),
        ..Selection::default()
    };
    let picked: Vec<_> = scenario::all()
        .into_iter()
        .filter(|s| selection.matches(s))
        .collect();
    assert_eq!(picked.len(), 1);

    let report = runner.run(picked).await;
    assert!(report.success(), "{:?}", report.results);
    // Everything but the empty name is stored, then torn down
    let expected = apiprobe_common::payload::invalid_usernames().len() as u64 - 1;
    assert_eq!(runner.cleanup_stats().attempted, expected);
    assert_eq!(runner.cleanup_stats().failed, 0);
    assert_eq!(server.stub().unwrap().user_count().await, 0);
    server.stop().await;
}
