//! Startup orchestration tests.
//!
//! Run with: cargo test --test startup

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use casa::config::ServiceSection;
use casa::{ShutdownCoordinator, StartupOrchestrator};
use common::{config_with, environment, eventually, MockService, StartBehavior, StopBehavior};

#[tokio::test]
async fn test_unregistered_service_is_reported_unsupported() {
    let (env, logger) = environment(config_with(&[("Hue", true)]));

    let report = StartupOrchestrator::new().start_all(&env).await;

    assert_eq!(report.unsupported, vec!["Hue".to_string()]);
    assert!(report.started.is_empty());
    assert!(logger.contains("Unsupported service: Hue"));
    assert!(env.get_service("Hue").is_none());
}

#[tokio::test]
async fn test_disabled_service_is_never_started() {
    let (env, logger) = environment(config_with(&[("Alpha", false)]));
    let alpha = MockService::ok();
    env.register_service("Alpha", alpha.clone());

    let report = StartupOrchestrator::new().start_all(&env).await;

    assert_eq!(alpha.starts(), 0);
    assert_eq!(report.disabled, vec!["Alpha".to_string()]);
    assert_eq!(report.attempted(), 0);
    assert!(!logger.contains("Starting service: Alpha"));
}

#[tokio::test]
async fn test_failed_start_does_not_block_others() {
    let (env, logger) = environment(config_with(&[("Alpha", true), ("Beta", true)]));
    let alpha = MockService::new(StartBehavior::Fail("port in use"), StopBehavior::Succeed);
    let beta = MockService::ok();
    env.register_service("Alpha", alpha.clone());
    env.register_service("Beta", beta.clone());

    let report = StartupOrchestrator::new().start_all(&env).await;

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "Alpha");
    assert_eq!(report.started, vec!["Beta".to_string()]);
    assert_eq!(beta.starts(), 1);
    assert!(logger.contains("Failed starting service Alpha: port in use"));
    assert!(logger.contains("Service started: Beta"));
}

#[tokio::test]
async fn test_panicking_start_counts_as_failure() {
    let (env, _logger) = environment(config_with(&[("Alpha", true), ("Beta", true)]));
    env.register_service(
        "Alpha",
        MockService::new(StartBehavior::Panic, StopBehavior::Succeed),
    );
    let beta = MockService::ok();
    env.register_service("Beta", beta.clone());

    let report = StartupOrchestrator::new().start_all(&env).await;

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.started, vec!["Beta".to_string()]);
}

#[tokio::test]
async fn test_slow_start_times_out_and_next_service_starts() {
    let (env, logger) = environment(config_with(&[("Alpha", true), ("Beta", true)]));
    let alpha = MockService::new(
        StartBehavior::Delay(Duration::from_millis(500)),
        StopBehavior::Succeed,
    );
    let beta = MockService::ok();
    env.register_service("Alpha", alpha.clone());
    env.register_service("Beta", beta.clone());

    let started_at = Instant::now();
    let report = StartupOrchestrator::new()
        .with_timeout(Duration::from_millis(100))
        .start_all(&env)
        .await;

    assert!(started_at.elapsed() < Duration::from_millis(450));
    assert_eq!(report.timed_out, vec!["Alpha".to_string()]);
    assert_eq!(report.started, vec!["Beta".to_string()]);
    assert!(logger.contains("Timeout while starting service: Alpha"));
    assert!(!alpha.start_returned.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_late_completion_is_logged_and_ignored() {
    let (env, logger) = environment(config_with(&[("Alpha", true)]));
    let alpha = MockService::new(
        StartBehavior::Delay(Duration::from_millis(150)),
        StopBehavior::Succeed,
    );
    env.register_service("Alpha", alpha.clone());

    let report = StartupOrchestrator::new()
        .with_timeout(Duration::from_millis(50))
        .start_all(&env)
        .await;
    assert_eq!(report.timed_out, vec!["Alpha".to_string()]);

    let finished = eventually(Duration::from_secs(2), || {
        logger.contains("Alpha finished starting after the startup timeout")
    })
    .await;
    assert!(finished);
    assert!(alpha.start_returned.load(Ordering::SeqCst));
    assert!(!logger.contains("Service started: Alpha"));
}

#[tokio::test]
async fn test_abandoned_start_observes_shutdown() {
    let (env, _logger) = environment(config_with(&[("Alpha", true)]));
    let alpha = MockService::new(StartBehavior::UntilShutdown, StopBehavior::Succeed);
    env.register_service("Alpha", alpha.clone());

    let report = StartupOrchestrator::new()
        .with_timeout(Duration::from_millis(50))
        .start_all(&env)
        .await;
    assert_eq!(report.timed_out.len(), 1);

    let shutdown = ShutdownCoordinator::new().shutdown(&env).await;
    assert!(shutdown.is_clean());

    let observed = eventually(Duration::from_secs(2), || {
        alpha.saw_shutdown.load(Ordering::SeqCst)
    })
    .await;
    assert!(observed);
}

#[tokio::test]
async fn test_nothing_starts_after_shutdown_triggered() {
    let (env, logger) = environment(config_with(&[("Alpha", true), ("Beta", true)]));
    let alpha = MockService::ok();
    let beta = MockService::ok();
    env.register_service("Alpha", alpha.clone());
    env.register_service("Beta", beta.clone());

    env.shutdown().trigger();
    let report = StartupOrchestrator::new().start_all(&env).await;

    assert_eq!(report.attempted(), 0);
    assert_eq!(alpha.starts(), 0);
    assert_eq!(beta.starts(), 0);
    assert!(logger.contains("not starting remaining services"));
}

#[tokio::test]
async fn test_view_carries_section_and_mqtt() {
    let mut config = config_with(&[]);
    config.services.insert(
        "Alpha".to_string(),
        ServiceSection::new(true).with("BridgeIP", "10.0.0.2"),
    );
    let (env, _logger) = environment(config);
    let alpha = MockService::ok();
    env.register_service("Alpha", alpha.clone());

    StartupOrchestrator::new().start_all(&env).await;

    let view = alpha.view().expect("start was called");
    assert_eq!(view.service(), "Alpha");
    assert_eq!(view.get_str("BridgeIP"), Some("10.0.0.2"));
    assert_eq!(view.get_str("MQTT.Listen"), Some("tcp://127.0.0.1:18830"));
    assert!(alpha.has_logger.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_start_reads_current_snapshot() {
    let (env, _logger) = environment(config_with(&[("Alpha", false)]));
    let alpha = MockService::ok();
    env.register_service("Alpha", alpha.clone());

    let first = StartupOrchestrator::new().start_all(&env).await;
    assert_eq!(first.disabled.len(), 1);

    env.config_store().replace(config_with(&[("Alpha", true)]));
    let second = StartupOrchestrator::new().start_all(&env).await;

    assert_eq!(second.started, vec!["Alpha".to_string()]);
    assert_eq!(alpha.starts(), 1);
}

#[test]
fn test_concurrent_registration() {
    let (env, _logger) = environment(config_with(&[]));
    let env = Arc::new(env);

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let env = env.clone();
            std::thread::spawn(move || {
                for i in 0..25 {
                    env.register_service(format!("svc-{}-{}", worker, i), MockService::ok());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(env.all_services().len(), 200);
}
