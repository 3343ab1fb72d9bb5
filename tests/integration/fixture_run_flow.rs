use std::time::{Duration, Instant};

use oascheck::adapters::http::HttpDocumentSource;
use oascheck::cmd::fixture::load_fixture;
use oascheck::config::{ConfigInput, HarnessConfig};
use oascheck::domain::fixture::Fixture;
use oascheck::domain::report::ScenarioStatus;
use oascheck::engine::runner::{RunOptions, run_fixture, run_scenario};
use serde_json::json;

use crate::http_stub::{
    StubResponse, StubServer, fixture_path, operations_fixture_path, sample_document,
};

fn source(server: &StubServer) -> HttpDocumentSource {
    let config = HarnessConfig::resolve(&ConfigInput {
        server_url: server.url(),
        ..ConfigInput::default()
    })
    .expect("config");
    HttpDocumentSource::new(config).expect("client")
}

#[test]
fn shipped_fixture_passes_against_live_stub() {
    let server = StubServer::start(vec![
        (
            "GET",
            "/proxy",
            vec![StubResponse::json(200, &sample_document())],
        ),
        (
            "POST",
            "/user/testUser",
            vec![StubResponse::json(200, &json!({}))],
        ),
    ]);
    let fixture = load_fixture(&fixture_path()).expect("fixture");
    let options = RunOptions {
        jobs: 4,
        ..RunOptions::default()
    };

    let report = run_fixture(&source(&server), &fixture, &options);
    assert!(report.matched, "{report:#?}");
    assert_eq!(report.scenario_count, fixture.scenarios.len());
    assert_eq!(report.skipped_count, 1);
    assert!(
        report
            .scenarios
            .iter()
            .filter(|scenario| scenario.status == ScenarioStatus::Passed)
            .all(|scenario| scenario.http_status == Some(200))
    );

    let requests = server.requests();
    let proxy_fetches = requests.iter().filter(|request| request.path == "/proxy").count();
    assert_eq!(proxy_fetches, fixture.scenarios.len() - 1);
    assert!(
        requests
            .iter()
            .any(|request| request.method == "POST" && request.path == "/user/testUser")
    );
}

#[test]
fn delayed_propagation_polls_until_marker_appears() {
    let mut stale = sample_document();
    stale["paths"]["/user/{username}"]["put"]["responses"]["200"]
        .as_object_mut()
        .expect("response mapping")
        .remove("content");
    let server = StubServer::start(vec![
        (
            "GET",
            "/proxy",
            vec![
                StubResponse::json(200, &stale),
                StubResponse::json(200, &stale),
                StubResponse::json(200, &sample_document()),
            ],
        ),
        (
            "POST",
            "/user/testUser",
            vec![StubResponse::json(200, &json!({}))],
        ),
    ]);
    let mut fixture = load_fixture(&fixture_path()).expect("fixture");
    let scenario = fixture
        .scenarios
        .iter_mut()
        .find(|scenario| scenario.name == "delayed-propagation")
        .expect("delayed scenario");
    if let Some(wait) = scenario.wait.as_mut() {
        wait.interval_ms = 10;
    }

    let report = run_scenario(&source(&server), scenario);
    assert_eq!(report.status, ScenarioStatus::Passed, "{report:#?}");
    let requests = server.requests();
    assert_eq!(requests[0].method, "POST");
    assert_eq!(
        requests.iter().filter(|request| request.path == "/proxy").count(),
        3
    );
}

#[test]
fn propagation_that_never_happens_times_out() {
    let server = StubServer::start(vec![(
        "GET",
        "/proxy",
        vec![StubResponse::json(200, &json!({"paths": {}}))],
    )]);
    let fixture: Fixture = serde_json::from_value(json!({
        "version": "1",
        "scenarios": [{
            "name": "never",
            "wait": {
                "marker": {"path": "paths.'/user/{username}'", "has_key": "put"},
                "interval_ms": 20,
                "timeout_ms": 100
            },
            "expectations": [{"path": "paths", "has_size": 1}]
        }]
    }))
    .expect("fixture");

    let report = run_fixture(&source(&server), &fixture, &RunOptions::default());
    let scenario = &report.scenarios[0];
    assert_eq!(scenario.status, ScenarioStatus::Failed);
    assert_eq!(
        scenario.error.as_ref().map(|error| error.kind.as_str()),
        Some("timeout_waiting_for_propagation")
    );
    assert!(scenario.outcomes.is_empty());
}

#[test]
fn transport_failures_do_not_affect_other_scenarios() {
    let server = StubServer::start(vec![
        (
            "GET",
            "/proxy",
            vec![StubResponse::json(200, &json!({"openapi": "3.0.0"}))],
        ),
        (
            "GET",
            "/slow",
            vec![StubResponse::json(200, &json!({})).delayed(Duration::from_secs(3))],
        ),
        (
            "GET",
            "/broken",
            vec![StubResponse::raw(200, Some("application/json"), b"{\"a\":".to_vec())],
        ),
    ]);
    let config = HarnessConfig::resolve(&ConfigInput {
        server_url: server.url(),
        timeout_ms: 300,
        ..ConfigInput::default()
    })
    .expect("config");
    let source = HttpDocumentSource::new(config).expect("client");
    let fixture: Fixture = serde_json::from_value(json!({
        "version": "1",
        "scenarios": [
            {"name": "slow", "request": {"path": "/slow"}, "expectations": [{"path": "a", "equals": 1}]},
            {"name": "broken", "request": {"path": "/broken"}, "expectations": [{"path": "a", "equals": 1}]},
            {"name": "version", "expectations": [{"path": "openapi", "equals": "3.0.0"}]},
            {"name": "unauthorized", "request": {"path": "/missing"}, "expectations": [{"path": "a", "equals": 1}]}
        ]
    }))
    .expect("fixture");

    let report = run_fixture(&source, &fixture, &RunOptions { jobs: 2, ..RunOptions::default() });
    let kinds: Vec<_> = report
        .scenarios
        .iter()
        .map(|scenario| scenario.error.as_ref().map(|error| error.kind.clone()))
        .collect();
    assert_eq!(
        kinds,
        [
            Some("transport_error".to_string()),
            Some("malformed_document".to_string()),
            None,
            Some("unexpected_status".to_string()),
        ]
    );
    assert_eq!(report.scenarios[2].status, ScenarioStatus::Passed);
    assert_eq!(report.scenarios[3].http_status, Some(404));
    assert_eq!(report.failed_count, 3);
}

#[test]
fn operations_fixture_evaluates_post_response_bodies() {
    let reviews = json!({"security": [{"reviewoauth2": ["write:reviews"]}]});
    let user = json!({"security": [{"httpTestScheme": ["write:reviews"]}]});
    let server = StubServer::start(vec![
        ("POST", "/reviews", vec![StubResponse::json(200, &reviews)]),
        ("POST", "/user", vec![StubResponse::json(200, &user)]),
        ("POST", "/userCreateWithArray", vec![StubResponse::json(200, &user)]),
        ("POST", "/userCreateWithList", vec![StubResponse::json(200, &user)]),
        ("POST", "/user/testUser", vec![StubResponse::json(200, &user)]),
    ]);
    let fixture = load_fixture(&operations_fixture_path()).expect("fixture");

    let report = run_fixture(&source(&server), &fixture, &RunOptions::default());
    assert!(report.matched, "{report:#?}");
    assert_eq!(report.passed_count, 5);

    let requests = server.requests();
    assert_eq!(requests.len(), 5);
    assert!(requests.iter().all(|request| request.method == "POST"));
    assert!(!requests.iter().any(|request| request.path == "/proxy"));
}

#[test]
fn status_only_scenario_accepts_unauthorized_empty_body() {
    let server = StubServer::start(vec![(
        "POST",
        "/reviews",
        vec![StubResponse::raw(401, None, Vec::new())],
    )]);
    let fixture: Fixture = serde_json::from_value(json!({
        "version": "1",
        "scenarios": [{
            "name": "reviews-require-credentials",
            "request": {"method": "POST", "path": "/reviews"},
            "status": 401
        }]
    }))
    .expect("fixture");
    fixture.validate().expect("valid");

    let report = run_fixture(&source(&server), &fixture, &RunOptions::default());
    let scenario = &report.scenarios[0];
    assert_eq!(scenario.status, ScenarioStatus::Passed, "{report:#?}");
    assert_eq!(scenario.http_status, Some(401));
    assert_eq!(scenario.outcomes[0].predicate, "status");
}

#[test]
fn run_deadline_interrupts_marker_polling() {
    let server = StubServer::start(vec![(
        "GET",
        "/proxy",
        vec![StubResponse::json(200, &json!({"paths": {}}))],
    )]);
    let fixture: Fixture = serde_json::from_value(json!({
        "version": "1",
        "scenarios": [{
            "name": "never",
            "wait": {
                "marker": {"path": "paths.'/user/{username}'", "has_key": "put"},
                "interval_ms": 20,
                "timeout_ms": 5000
            },
            "expectations": [{"path": "paths", "has_size": 1}]
        }]
    }))
    .expect("fixture");
    let options = RunOptions {
        deadline: Some(Duration::from_millis(200)),
        ..RunOptions::default()
    };

    let started = Instant::now();
    let report = run_fixture(&source(&server), &fixture, &options);
    assert!(started.elapsed() < Duration::from_secs(3), "{:?}", started.elapsed());
    assert_eq!(report.scenarios[0].status, ScenarioStatus::Cancelled);
    assert!(!report.matched);
}
