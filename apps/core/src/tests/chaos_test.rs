use super::*;
use crate::assistant::Role;
use crate::resilience::{
    BreakerConfig, CircuitBreaker, CircuitState, InMemoryBreakerStore, InMemoryRateWindowStore,
    RateLimiter,
};
use futures::future::join_all;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_chaos_concurrent_admission_never_exceeds_limit() {
    // 1. Setup
    let limiter = Arc::new(RateLimiter::with_parts(
        10,
        3600,
        Arc::new(InMemoryRateWindowStore::new()),
        test_clock(),
    ));

    // 2. Launch 50 concurrent checks for the same clinician
    let mut handles = vec![];
    for _ in 0..50 {
        let limiter = limiter.clone();
        handles.push(tokio::spawn(async move { limiter.check("doctor-7").await }));
    }
    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    // 3. Verify
    let admitted: Vec<usize> = results.iter().filter_map(|r| r.as_ref().ok().copied()).collect();
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(AppError::RateLimited { .. })))
        .count();
    assert_eq!(admitted.len(), 10, "Exactly the limit must be admitted");
    assert_eq!(rejected, 40);

    let mut remaining = admitted.clone();
    remaining.sort_unstable();
    assert_eq!(remaining, (0..10).collect::<Vec<_>>(), "Each slot is handed out once");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_chaos_half_open_admits_a_single_trial() {
    // 1. Setup: trip the breaker, then let the timeout lapse
    let clock = test_clock();
    let breaker = Arc::new(CircuitBreaker::with_parts(
        "chaos",
        BreakerConfig::new(1, 60),
        Arc::new(InMemoryBreakerStore::new()),
        clock.clone(),
    ));
    let tripped: Result<(), AppError> = breaker
        .call(|| async { Err(AppError::Provider("down".to_string())) })
        .await;
    assert!(tripped.is_err());
    assert_eq!(breaker.state().await.unwrap(), CircuitState::Open);
    clock.advance(chrono::Duration::seconds(61));

    // 2. Storm the half-open breaker
    let invocations = Arc::new(AtomicUsize::new(0));
    let mut handles = vec![];
    for _ in 0..20 {
        let breaker = breaker.clone();
        let invocations = invocations.clone();
        handles.push(tokio::spawn(async move {
            breaker
                .call(|| async move {
                    invocations.fetch_add(1, Ordering::SeqCst);
                    sleep(Duration::from_millis(100)).await;
                    Ok::<_, AppError>("trial ok")
                })
                .await
        }));
    }
    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    // 3. Verify
    assert_eq!(invocations.load(Ordering::SeqCst), 1, "Only one trial may reach the provider");
    let busy = results
        .iter()
        .filter(|r| matches!(r, Err(AppError::CircuitOpen { retry_after_secs: 1 })))
        .count();
    assert_eq!(busy, 19);

    // A second successful trial closes the circuit.
    let second: Result<&str, AppError> = breaker.call(|| async { Ok("trial ok") }).await;
    assert!(second.is_ok());
    assert_eq!(breaker.state().await.unwrap(), CircuitState::Closed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_chaos_concurrent_failures_open_the_circuit_once() {
    // 1. Setup
    let config = GatewayConfig {
        failure_threshold: 3,
        max_requests_per_hour: 100,
        ..enabled_config()
    };
    let h = harness(config, MockProvider::new(MockBehavior::Fail));

    // 2. Fire 20 concurrent interpretations from different clinicians
    let mut handles = vec![];
    for i in 0..20 {
        let gateway = h.gateway.clone();
        let mut request = note("Cough x3 weeks, no fever.");
        request.doctor_id = format!("doctor-{}", i);
        handles.push(tokio::spawn(async move {
            gateway.interpret_note(Role::Clinician, request).await
        }));
    }
    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    // 3. Verify: every call failed with a service error and the circuit ended open
    assert!(results.iter().all(|r| r
        .as_ref()
        .err()
        .is_some_and(AppError::is_ai_service_error)));
    let status = h.gateway.status().await.unwrap();
    assert_eq!(status.circuit_breaker.state, CircuitState::Open);

    // Once open, nothing reaches the provider.
    let before = h.provider.call_count();
    let rejected = h
        .gateway
        .interpret_note(Role::Clinician, note("Cough x3 weeks, no fever."))
        .await;
    assert!(matches!(rejected, Err(AppError::CircuitOpen { .. })));
    assert_eq!(h.provider.call_count(), before);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_chaos_gateway_rate_limit_under_load() {
    // 1. Setup
    let h = harness(enabled_config(), MockProvider::replying(STRUCTURED_REPLY));

    // 2. Same clinician, 30 concurrent notes against the default quota of 10
    let mut handles = vec![];
    for _ in 0..30 {
        let gateway = h.gateway.clone();
        handles.push(tokio::spawn(async move {
            gateway
                .interpret_note(Role::Clinician, note("Cough x3 weeks, no fever."))
                .await
        }));
    }
    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    // 3. Verify
    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    let limited = results
        .iter()
        .filter(|r| matches!(r, Err(AppError::RateLimited { .. })))
        .count();
    assert_eq!(succeeded, 10);
    assert_eq!(limited, 20);
    assert_eq!(h.provider.call_count(), 10);
}
