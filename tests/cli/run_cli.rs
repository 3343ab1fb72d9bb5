use serde_json::{Value, json};

use crate::http_stub::{StubResponse, StubServer, fixture_path, sample_document};

#[test]
fn run_uses_server_url_from_environment() {
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

    let output = assert_cmd::cargo::cargo_bin_cmd!("oascheck")
        .arg("run")
        .arg("--fixture")
        .arg(fixture_path())
        .args(["--jobs", "2"])
        .env("OASCHECK_SERVER_URL", server.url())
        .env("OASCHECK_USER", "admin")
        .env("OASCHECK_PASSWORD", "secret")
        .output()
        .expect("run oascheck");
    assert_eq!(output.status.code(), Some(0), "{output:?}");
    let report: Value = serde_json::from_slice(&output.stdout).expect("report json");
    assert_eq!(report["matched"], true);
    assert!(
        server
            .requests()
            .iter()
            .all(|request| request.authorization.as_deref() == Some("Basic YWRtaW46c2VjcmV0"))
    );
}

#[test]
fn selected_scenario_failure_exits_two() {
    let server = StubServer::start(vec![(
        "GET",
        "/proxy",
        vec![StubResponse::json(200, &json!({"openapi": "3.1.0"}))],
    )]);

    let url = server.url();
    let output = assert_cmd::cargo::cargo_bin_cmd!("oascheck")
        .arg("run")
        .arg("--fixture")
        .arg(fixture_path())
        .args(["--server-url", url.as_str(), "--scenario", "version"])
        .output()
        .expect("run oascheck");
    assert_eq!(output.status.code(), Some(2));
    let report: Value = serde_json::from_slice(&output.stdout).expect("report json");
    assert_eq!(report["scenario_count"], 1);
    assert_eq!(report["scenarios"][0]["outcomes"][0]["reason"], "value_mismatch");
    assert_eq!(server.requests().len(), 1);
}

#[test]
fn unknown_scenario_exits_three() {
    assert_cmd::cargo::cargo_bin_cmd!("oascheck")
        .arg("run")
        .arg("--fixture")
        .arg(fixture_path())
        .args(["--scenario", "does-not-exist"])
        .assert()
        .code(3);
}

#[test]
fn log_filter_writes_scenario_events_to_stderr() {
    let server = StubServer::start(vec![(
        "GET",
        "/proxy",
        vec![StubResponse::json(200, &json!({"openapi": "3.0.0"}))],
    )]);

    let url = server.url();
    let output = assert_cmd::cargo::cargo_bin_cmd!("oascheck")
        .arg("run")
        .arg("--fixture")
        .arg(fixture_path())
        .args(["--server-url", url.as_str(), "--scenario", "version"])
        .env("OASCHECK_LOG", "info")
        .output()
        .expect("run oascheck");
    assert_eq!(output.status.code(), Some(0));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("scenario finished"), "{stderr}");
}
