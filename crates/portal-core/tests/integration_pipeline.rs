#![allow(unused_crate_dependencies)]
#![allow(clippy::tests_outside_test_module, reason = "integration tests live in tests/ dir")]
#![allow(clippy::expect_used, reason = "integration test — panics are the assertion mechanism")]

use async_trait::async_trait;
use portal_core::{
    fingerprint, Pipeline, PipelineError, Request, Response, Transport, TransportError,
};
use portal_types::{PortalConfig, PortalMode, RetryConfig, SessionPhase, User};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const QUERY: &str = "query Files($first: Int) { file { hits(first: $first) { total } } }";

fn variables() -> Value {
    json!({"first": 20})
}

fn success_body() -> Value {
    json!({"data": {"file": {"hits": {"total": 42}}}})
}

fn fast_retry() -> RetryConfig {
    RetryConfig { base_delay_ms: 1, exponent_offset: 0, max_attempts: 3, ..Default::default() }
}

fn config_for(server: &MockServer, mode: PortalMode) -> PortalConfig {
    PortalConfig {
        api_base: server.uri(),
        mode,
        retry: fast_retry(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_open_mode_flow() {
    let server = MockServer::start().await;
    let pipeline =
        Pipeline::from_config(config_for(&server, PortalMode::Open)).expect("pipeline");
    let hash = fingerprint(QUERY, &variables());

    {
        let _guard = Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(query_param("hash", hash.as_str()))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
            .expect(1)
            .mount_as_scoped(&server)
            .await;

        let body = pipeline.execute_json(QUERY, &variables()).await;
        assert_eq!(body.expect("200 scenario"), success_body());
    }

    {
        let _guard = Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
            .expect(1)
            .mount_as_scoped(&server)
            .await;

        let err = pipeline.execute(QUERY, &variables()).await.expect_err("404 scenario");
        assert_eq!(err.status(), Some(404), "404 must fail on the first attempt");
        assert_eq!(err.body(), Some("Not Found"));
    }
}

#[tokio::test]
async fn test_transient_status_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .expect(1)
        .mount(&server)
        .await;

    let pipeline =
        Pipeline::from_config(config_for(&server, PortalMode::Open)).expect("pipeline");
    let response = pipeline.execute(QUERY, &variables()).await.expect("retried to success");
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_retry_budget_is_exhausted() {
    let server = MockServer::start().await;
    let _guard = Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(3)
        .mount_as_scoped(&server)
        .await;

    let pipeline =
        Pipeline::from_config(config_for(&server, PortalMode::Open)).expect("pipeline");
    let err = pipeline.execute(QUERY, &variables()).await.expect_err("exhausted");

    match &err {
        PipelineError::Exhausted { attempts, .. } => assert_eq!(*attempts, 3),
        other => panic!("expected Exhausted, got {:?}", other),
    }
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn test_slow_attempt_times_out_and_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(success_body())
                .set_delay(Duration::from_millis(500)),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = config_for(&server, PortalMode::Open);
    config.fetch_timeout_ms = 100;
    let pipeline = Pipeline::from_config(config).expect("pipeline");

    let response = pipeline.execute(QUERY, &variables()).await.expect("retried after timeout");
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_every_attempt_timing_out_exhausts_budget() {
    let server = MockServer::start().await;
    let _guard = Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .expect(2)
        .mount_as_scoped(&server)
        .await;

    let mut config = config_for(&server, PortalMode::Open);
    config.fetch_timeout_ms = 100;
    config.retry.max_attempts = 2;
    let pipeline = Pipeline::from_config(config).expect("pipeline");

    let err = pipeline.execute(QUERY, &variables()).await.expect_err("timed out");
    match err {
        PipelineError::Exhausted { attempts, last } => {
            assert_eq!(attempts, 2);
            let timeout = TransportError::Timeout { timeout_ms: 100 };
            assert!(
                matches!(&*last, PipelineError::Transport(e) if *e == timeout),
                "last failure should be a timeout, got {:?}",
                last
            );
        },
        other => panic!("expected Exhausted, got {:?}", other),
    }
}

#[tokio::test]
async fn test_explicit_hash_selects_partition() {
    let server = MockServer::start().await;
    let _guard = Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(query_param("hash", "partition-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .expect(1)
        .mount_as_scoped(&server)
        .await;

    let pipeline =
        Pipeline::from_config(config_for(&server, PortalMode::Open)).expect("pipeline");
    let response = pipeline
        .execute_with_hash(QUERY, &variables(), "partition-7")
        .await
        .expect("explicit partition");
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_empty_query_never_reaches_network() {
    let server = MockServer::start().await;
    let _guard = Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount_as_scoped(&server)
        .await;

    let pipeline =
        Pipeline::from_config(config_for(&server, PortalMode::Open)).expect("pipeline");
    let err = pipeline.execute("   ", &Value::Null).await.expect_err("empty query");
    assert!(matches!(err, PipelineError::EmptyQuery));
}

#[tokio::test]
async fn test_authenticated_mode_records_claims() {
    let server = MockServer::start().await;
    let mut config = config_for(&server, PortalMode::Authenticated);
    config.auth.token = Some("secret".to_string());

    let _guard = Mock::given(method("POST"))
        .and(header("X-Auth-Token", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {},
            "intersection": [true],
            "nih_projects": ["P1", "P2"],
            "fence_projects": [true]
        })))
        .expect(1)
        .mount_as_scoped(&server)
        .await;

    let pipeline = Pipeline::from_config(config).expect("pipeline");
    let session = pipeline.session();
    session.begin(User::new(json!({"username": "tester"})));

    pipeline.execute(QUERY, &variables()).await.expect("success");

    let snapshot = session.snapshot();
    assert_eq!(snapshot.phase, SessionPhase::Authenticated);
    let claims = snapshot.access_claims.as_ref().expect("claims");
    assert!(claims.intersection);
    assert!(claims.fence_projects);
    assert_eq!(claims.nih_projects, vec!["P1".to_string(), "P2".to_string()]);
    assert_eq!(snapshot.verdict(None).login_redirect(), None);
}

#[tokio::test]
async fn test_forbidden_forces_logout() {
    let server = MockServer::start().await;
    let _guard = Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
        .expect(2)
        .mount_as_scoped(&server)
        .await;

    let pipeline = Pipeline::from_config(config_for(&server, PortalMode::Authenticated))
        .expect("pipeline");
    let session = pipeline.session();

    // No user yet: an ordinary failure.
    let err = pipeline.execute(QUERY, &variables()).await.expect_err("403 without user");
    assert_eq!(err.status(), Some(403));
    assert_eq!(session.phase(), SessionPhase::Unauthenticated);

    session.begin(User::new(json!({"username": "tester"})));
    let phases = session.subscribe();

    let err = pipeline.execute(QUERY, &variables()).await.expect_err("403 with user");
    assert!(matches!(err, PipelineError::SessionRevoked));
    assert_eq!(session.phase(), SessionPhase::LoggedOut);
    assert!(!session.has_user());
    assert!(phases.has_changed().expect("sender alive"));
    assert_eq!(
        session.snapshot().verdict(None).login_redirect(),
        Some("/login?error=timeout")
    );
}

/// Transport that fails each query a fixed number of times before succeeding.
struct ScriptedTransport {
    failures: Mutex<HashMap<String, usize>>,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    fn failing(plan: &[(&str, usize)]) -> Self {
        let failures = plan.iter().map(|(query, n)| ((*query).to_string(), *n)).collect();
        Self { failures: Mutex::new(failures), calls: AtomicUsize::new(0) }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &Request) -> Result<Response, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let body: Value = serde_json::from_slice(&request.body).expect("json body");
        let query = body["query"].as_str().unwrap_or_default().to_string();

        let mut failures = self.failures.lock().expect("lock");
        match failures.get_mut(&query) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Ok(Response::new(503, "Service Unavailable"))
            },
            _ => Ok(Response::new(200, success_body().to_string())),
        }
    }
}

fn scripted_pipeline(transport: Arc<ScriptedTransport>) -> Pipeline {
    Pipeline::builder(PortalConfig::default())
        .with_transport(transport)
        .build()
        .expect("pipeline")
}

#[tokio::test(start_paused = true)]
async fn test_retry_now_skips_backoff() {
    let transport = Arc::new(ScriptedTransport::failing(&[(QUERY, 1)]));
    let pipeline = Arc::new(scripted_pipeline(Arc::clone(&transport)));
    let handle = pipeline.retry_handle();
    let started = tokio::time::Instant::now();

    let task = {
        let pipeline = Arc::clone(&pipeline);
        tokio::spawn(async move { pipeline.execute(QUERY, &variables()).await })
    };
    while !handle.is_pending() {
        tokio::task::yield_now().await;
    }

    assert!(handle.retry_now());
    let response = task.await.expect("task").expect("success after manual retry");
    assert_eq!(response.status, 200);
    assert_eq!(transport.calls(), 2);
    assert!(
        started.elapsed() < Duration::from_millis(1_600),
        "manual retry must not wait out the backoff delay"
    );
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_requests_back_off_independently() {
    const OTHER: &str = "query Cases { case { hits { total } } }";
    let transport = Arc::new(ScriptedTransport::failing(&[(QUERY, 1), (OTHER, 1)]));
    let pipeline = scripted_pipeline(Arc::clone(&transport));
    let started = tokio::time::Instant::now();

    let vars = variables();
    let (first, second) = futures::join!(
        pipeline.execute(QUERY, &vars),
        pipeline.execute(OTHER, &Value::Null)
    );

    assert_eq!(first.expect("first").status, 200);
    assert_eq!(second.expect("second").status, 200);
    assert_eq!(transport.calls(), 4);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(1_600));
    assert!(elapsed < Duration::from_millis(3_200), "backoffs ran in sequence: {:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn test_other_requests_proceed_while_one_waits() {
    const OTHER: &str = "query Projects { projects { name } }";
    let transport = Arc::new(ScriptedTransport::failing(&[(QUERY, 1)]));
    let pipeline = Arc::new(scripted_pipeline(Arc::clone(&transport)));
    let handle = pipeline.retry_handle();

    let waiting = {
        let pipeline = Arc::clone(&pipeline);
        tokio::spawn(async move { pipeline.execute(QUERY, &variables()).await })
    };
    while !handle.is_pending() {
        tokio::task::yield_now().await;
    }

    let response = pipeline.execute(OTHER, &Value::Null).await.expect("independent request");
    assert_eq!(response.status, 200);
    assert!(handle.is_pending(), "first request should still be backing off");

    let response = waiting.await.expect("task").expect("eventual success");
    assert_eq!(response.status, 200);
}
