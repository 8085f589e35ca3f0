use std::time::{SystemTime, UNIX_EPOCH};

use tiergate::error::GatewayError;
use tiergate::health::{HealthKey, HealthPolicy, HealthTracker, MemoryHealthStore};
use tiergate::routing::run_failover;

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_secs())
}

fn tracker() -> HealthTracker {
    HealthTracker::new(HealthPolicy::new(60, 3), MemoryHealthStore::default())
}

fn upstream_err() -> GatewayError {
    GatewayError::Upstream {
        status: 503,
        message: "unavailable".to_string(),
    }
}

#[tokio::test]
async fn test_preferred_endpoint_goes_first() {
    let tracker = tracker();
    let mut calls = Vec::new();

    let outcome = run_failover(3, 2, Some(2), &tracker, |endpoint, source| {
        calls.push((endpoint, source));
        async { Ok::<_, GatewayError>("ok") }
    })
    .await
    .expect("success");

    assert_eq!(calls, vec![(2, 0)]);
    assert_eq!(outcome.endpoint, 2);
    assert_eq!(outcome.source, 0);
    assert_eq!(outcome.attempts, 1);
}

#[tokio::test]
async fn test_no_preference_starts_at_priority_zero() {
    let tracker = tracker();
    let mut calls = Vec::new();

    let _ = run_failover(3, 2, None, &tracker, |endpoint, source| {
        calls.push((endpoint, source));
        async { Ok::<_, GatewayError>(()) }
    })
    .await
    .expect("success");

    assert_eq!(calls, vec![(0, 0)]);
}

#[tokio::test]
async fn test_total_outage_attempts_every_pair_once() {
    let tracker = tracker();
    let mut calls = Vec::new();

    let err = run_failover(3, 2, Some(1), &tracker, |endpoint, source| {
        calls.push((endpoint, source));
        async { Err::<(), _>(upstream_err()) }
    })
    .await
    .expect_err("exhaustion expected");

    assert!(matches!(err, GatewayError::Exhausted { attempts: 6 }));
    assert_eq!(calls.len(), 6);

    // Sources are exhausted in declared order within each endpoint, and no
    // endpoint is visited twice.
    assert_eq!(calls, vec![(1, 0), (1, 1), (2, 0), (2, 1), (0, 0), (0, 1)]);
}

#[tokio::test]
async fn test_sources_exhausted_before_next_tier() {
    let tracker = tracker();
    let mut calls = Vec::new();

    let outcome = run_failover(2, 2, None, &tracker, |endpoint, source| {
        calls.push((endpoint, source));
        let result = if (endpoint, source) == (0, 1) {
            Ok("backup source saved the cheap tier")
        } else {
            Err(upstream_err())
        };
        async move { result }
    })
    .await
    .expect("success on backup source");

    assert_eq!(calls, vec![(0, 0), (0, 1)]);
    assert_eq!(outcome.endpoint, 0);
    assert_eq!(outcome.source, 1);
    assert_eq!(outcome.attempts, 2);
}

#[tokio::test]
async fn test_cooled_endpoint_is_skipped() {
    let tracker = tracker();
    let now = unix_now();
    for source in 0..2 {
        for _ in 0..3 {
            tracker.record_failure(
                HealthKey {
                    endpoint: 0,
                    source,
                },
                now,
            );
        }
    }

    let mut calls = Vec::new();
    let _ = run_failover(3, 2, None, &tracker, |endpoint, source| {
        calls.push((endpoint, source));
        async { Ok::<_, GatewayError>(()) }
    })
    .await
    .expect("success");

    assert_eq!(calls, vec![(1, 0)]);
}

#[tokio::test]
async fn test_endpoint_with_one_healthy_source_is_still_primary() {
    let tracker = tracker();
    let now = unix_now();
    // Only the primary source of endpoint 0 is cooling; the endpoint itself
    // stays eligible through its backup source.
    for _ in 0..3 {
        tracker.record_failure(
            HealthKey {
                endpoint: 0,
                source: 0,
            },
            now,
        );
    }

    let mut calls = Vec::new();
    let _ = run_failover(2, 2, None, &tracker, |endpoint, source| {
        calls.push((endpoint, source));
        let result = if source == 1 {
            Ok(())
        } else {
            Err(upstream_err())
        };
        async move { result }
    })
    .await
    .expect("success");

    assert_eq!(calls, vec![(0, 0), (0, 1)]);
}

#[tokio::test]
async fn test_forced_scan_when_everything_is_cooling() {
    let tracker = tracker();
    let now = unix_now();
    for endpoint in 0..2 {
        for source in 0..2 {
            for _ in 0..3 {
                tracker.record_failure(HealthKey { endpoint, source }, now);
            }
        }
    }

    let mut calls = Vec::new();
    let outcome = run_failover(2, 2, None, &tracker, |endpoint, source| {
        calls.push((endpoint, source));
        async { Ok::<_, GatewayError>(()) }
    })
    .await
    .expect("forced scan still routes");

    // Everything looks unhealthy, so the walk degrades to plain priority
    // order instead of refusing to route.
    assert_eq!(calls, vec![(0, 0)]);
    assert_eq!(outcome.endpoint, 0);
}

#[tokio::test]
async fn test_success_resets_health_record() {
    let tracker = tracker();
    let key = HealthKey {
        endpoint: 0,
        source: 0,
    };
    let now = unix_now();
    for _ in 0..3 {
        tracker.record_failure(key, now);
    }
    assert!(!tracker.is_available(key, now));

    let _ = run_failover(1, 1, None, &tracker, |_, _| async {
        Ok::<_, GatewayError>(())
    })
    .await
    .expect("success");

    assert!(tracker.is_available(key, now));
}

#[tokio::test]
async fn test_empty_topology_is_exhausted_without_attempts() {
    let tracker = tracker();
    let err = run_failover(0, 2, None, &tracker, |_, _| async {
        Ok::<_, GatewayError>(())
    })
    .await
    .expect_err("no endpoints");
    assert!(matches!(err, GatewayError::Exhausted { attempts: 0 }));
}
