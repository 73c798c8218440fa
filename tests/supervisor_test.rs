mod support;

use log_monitor::app::{MonitorOutcome, Supervisor};
use log_monitor::error::MonitorError;
use log_monitor::parser::Family;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use support::{
    gateway, log_source, PanickingPublisher, RecordingPublisher, ScriptEnd, ScriptedFactory,
};
use tokio::sync::watch;

#[tokio::test]
async fn test_attach_failure_is_isolated_from_healthy_sources() {
    let sources = vec![
        log_source("zkwork", Family::GpuRate, "zkwork_gpu", None),
        log_source("broken", Family::ProofRate, "cysic_proof_rate", None),
        log_source("oula_new", Family::KeywordColumn, "oula_total", Some("v2")),
    ];
    // "broken" has no script, so attaching it fails
    let factory = Arc::new(
        ScriptedFactory::default()
            .with(
                "zkwork",
                &["gpu[*]: (1m - 1)", "gpu[*]: (1m - 2)", "gpu[*]: (1m - 3)"],
                ScriptEnd::Exhausted,
            )
            .with(
                "oula_new",
                &["a total b 11", "noise", "a total b 12"],
                ScriptEnd::Exhausted,
            ),
    );
    let publisher = Arc::new(RecordingPublisher::default());
    let (_tx, rx) = watch::channel(false);

    let reports = Supervisor::new(sources, gateway(), factory, publisher.clone())
        .keep_alive(false)
        .run(rx)
        .await;

    assert_eq!(reports.len(), 3);
    let broken = reports.iter().find(|r| r.source == "broken").unwrap();
    assert!(matches!(
        broken.outcome,
        MonitorOutcome::Failed(MonitorError::TailAttach { .. })
    ));
    for healthy in reports.iter().filter(|r| r.source != "broken") {
        assert!(matches!(healthy.outcome, MonitorOutcome::Exhausted));
    }

    assert_eq!(publisher.values_for("zkwork_gpu"), vec![1.0, 2.0, 3.0]);
    assert_eq!(publisher.values_for("oula_total"), vec![11.0, 12.0]);
    assert!(publisher.values_for("cysic_proof_rate").is_empty());
}

#[tokio::test]
async fn test_each_source_pushes_under_its_own_grouping_key() {
    let sources = vec![
        log_source("oula", Family::KeywordColumn, "oula_total", Some("v1")),
        log_source("oula_new", Family::KeywordColumn, "oula_total", Some("v2")),
    ];
    let factory = Arc::new(
        ScriptedFactory::default()
            .with("oula", &["x total y 1"], ScriptEnd::Exhausted)
            .with("oula_new", &["x total y 2"], ScriptEnd::Exhausted),
    );
    let publisher = Arc::new(RecordingPublisher::default());
    let (_tx, rx) = watch::channel(false);

    Supervisor::new(sources, gateway(), factory, publisher.clone())
        .keep_alive(false)
        .run(rx)
        .await;

    let mut pushed: Vec<(String, String)> = publisher
        .attempts()
        .into_iter()
        .map(|(sample, target)| {
            let version = target
                .grouping
                .iter()
                .find(|(name, _)| name == "version")
                .map(|(_, value)| value.clone())
                .unwrap_or_default();
            (version, sample.value.to_string())
        })
        .collect();
    pushed.sort();
    assert_eq!(
        pushed,
        vec![
            ("v1".to_string(), "1".to_string()),
            ("v2".to_string(), "2".to_string())
        ]
    );
}

#[tokio::test]
async fn test_sources_without_path_are_not_started() {
    let mut unconfigured = log_source("cysic", Family::ProofRate, "cysic_proof_rate", None);
    unconfigured.path = PathBuf::new();
    let sources = vec![
        unconfigured,
        log_source("pool", Family::PoolRate, "pool_proof_rate", None),
    ];
    let factory = Arc::new(ScriptedFactory::default().with(
        "pool",
        &["proof rate 9/s"],
        ScriptEnd::Exhausted,
    ));
    let publisher = Arc::new(RecordingPublisher::default());
    let (_tx, rx) = watch::channel(false);

    let reports = Supervisor::new(sources, gateway(), factory, publisher.clone())
        .keep_alive(false)
        .run(rx)
        .await;

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].source, "pool");
}

#[tokio::test]
async fn test_shutdown_stops_all_running_monitors() {
    let sources = vec![
        log_source("zkwork", Family::GpuRate, "zkwork_gpu", None),
        log_source("pool", Family::PoolRate, "pool_proof_rate", None),
        log_source("broken", Family::ProofRate, "cysic_proof_rate", None),
    ];
    let factory = Arc::new(
        ScriptedFactory::default()
            .with("zkwork", &["gpu[*]: (1m - 4)"], ScriptEnd::Pending)
            .with("pool", &["proof rate 8/s"], ScriptEnd::Pending),
    );
    let publisher = Arc::new(RecordingPublisher::default());
    let (tx, rx) = watch::channel(false);

    let handle = tokio::spawn(
        Supervisor::new(sources, gateway(), factory, publisher.clone()).run(rx),
    );
    publisher.wait_for(2).await;
    tx.send(true).unwrap();

    let reports = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("supervisor stops after shutdown")
        .unwrap();
    assert_eq!(reports.len(), 3);
    assert_eq!(reports.iter().filter(|r| r.outcome.is_failed()).count(), 1);
    assert_eq!(
        reports
            .iter()
            .filter(|r| matches!(r.outcome, MonitorOutcome::Stopped))
            .count(),
        2
    );
}

#[tokio::test]
async fn test_keeps_running_after_monitors_end_until_shutdown() {
    let sources = vec![log_source("broken", Family::ProofRate, "cysic_proof_rate", None)];
    let factory = Arc::new(ScriptedFactory::default());
    let publisher = Arc::new(RecordingPublisher::default());
    let (tx, rx) = watch::channel(false);

    let handle = tokio::spawn(Supervisor::new(sources, gateway(), factory, publisher).run(rx));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!handle.is_finished());

    tx.send(true).unwrap();
    let reports = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("supervisor stops after shutdown")
        .unwrap();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].outcome.is_failed());
}

#[tokio::test]
async fn test_panicked_monitor_is_reported_against_its_source() {
    let sources = vec![
        log_source("zkwork", Family::GpuRate, "zkwork_gpu", None),
        log_source("cysic", Family::ProofRate, "cysic_proof_rate", None),
    ];
    let factory = Arc::new(
        ScriptedFactory::default()
            .with("zkwork", &["gpu[*]: (1m - 1)"], ScriptEnd::Exhausted)
            .with("cysic", &["1min-proof-rate: 2"], ScriptEnd::Exhausted),
    );
    let publisher = Arc::new(PanickingPublisher { metric: "zkwork_gpu" });
    let (_tx, rx) = watch::channel(false);

    let reports = Supervisor::new(sources, gateway(), factory, publisher)
        .keep_alive(false)
        .run(rx)
        .await;

    assert_eq!(reports.len(), 2);
    let panicked = reports.iter().find(|r| r.source == "zkwork").unwrap();
    assert!(matches!(
        panicked.outcome,
        MonitorOutcome::Failed(MonitorError::TaskAborted(_))
    ));
    let healthy = reports.iter().find(|r| r.source == "cysic").unwrap();
    assert!(matches!(healthy.outcome, MonitorOutcome::Exhausted));
    assert_eq!(healthy.stats.publishes_succeeded, 1);
}
