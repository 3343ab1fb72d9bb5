use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::domain::error::ScenarioError;
use crate::domain::fetch::{DocumentSource, FetchRequest, FetchedDocument};
use crate::domain::fixture::{Fixture, RequestSpec, Scenario, WaitPolicy};
use crate::domain::report::{ExpectationOutcome, ExpectationReport, RunReport, ScenarioReport};
use crate::engine::r#assert::{evaluate_expectation, evaluate_expectations};
use crate::engine::normalize::normalize_document;

/// Fixture-wide execution options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Worker threads; `0` means available parallelism.
    pub jobs: usize,
    /// Scenarios still waiting when this elapses are reported as cancelled.
    pub deadline: Option<Duration>,
    /// Scenario names to run; empty runs all of them.
    pub scenarios: Vec<String>,
}

impl RunOptions {
    fn selects(&self, name: &str) -> bool {
        self.scenarios.is_empty() || self.scenarios.iter().any(|selected| selected == name)
    }

    fn worker_count(&self, scenario_count: usize) -> usize {
        let requested = if self.jobs == 0 {
            thread::available_parallelism().map_or(1, usize::from)
        } else {
            self.jobs
        };
        requested.clamp(1, scenario_count.max(1))
    }
}

/// One fetched response; `document` is absent for status-only scenarios.
#[derive(Debug, Clone, PartialEq)]
struct Snapshot {
    request: FetchRequest,
    status: u16,
    document: Option<Value>,
}

/// Time limits for one scenario attempt.
#[derive(Debug, Clone, Copy)]
struct Budget {
    started: Instant,
    deadline: Option<Instant>,
}

impl Budget {
    fn new(deadline: Option<Instant>) -> Self {
        Self {
            started: Instant::now(),
            deadline,
        }
    }

    fn check(&self) -> Result<(), ScenarioError> {
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(self.elapsed());
        }
        Ok(())
    }

    /// Sleeps for `duration`, or only until the deadline if that comes first.
    fn sleep(&self, duration: Duration) -> Result<(), ScenarioError> {
        let now = Instant::now();
        match self.deadline {
            Some(deadline) if now + duration >= deadline => {
                thread::sleep(deadline.saturating_duration_since(now));
                Err(self.elapsed())
            }
            _ => {
                thread::sleep(duration);
                Ok(())
            }
        }
    }

    fn elapsed(&self) -> ScenarioError {
        ScenarioError::DeadlineElapsed {
            elapsed_ms: millis(self.started.elapsed()),
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Runs every selected scenario, each against its own snapshot.
///
/// Report order follows fixture order regardless of completion order.
pub fn run_fixture<S>(source: &S, fixture: &Fixture, options: &RunOptions) -> RunReport
where
    S: DocumentSource + Sync + ?Sized,
{
    let selected: Vec<&Scenario> = fixture
        .scenarios
        .iter()
        .filter(|scenario| options.selects(&scenario.name))
        .collect();
    let deadline = options.deadline.map(|limit| Instant::now() + limit);
    let next = AtomicUsize::new(0);
    let workers = options.worker_count(selected.len());
    let mut slots: Vec<Option<ScenarioReport>> = selected.iter().map(|_| None).collect();

    thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                scope.spawn(|| {
                    let mut finished = Vec::new();
                    loop {
                        let index = next.fetch_add(1, Ordering::Relaxed);
                        let Some(scenario) = selected.get(index) else {
                            break;
                        };
                        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                            warn!(scenario = %scenario.name, "deadline elapsed, scenario cancelled");
                            finished.push((index, ScenarioReport::cancelled(&scenario.name)));
                            continue;
                        }
                        finished.push((index, run_isolated(source, scenario, deadline)));
                    }
                    finished
                })
            })
            .collect();

        for handle in handles {
            if let Ok(finished) = handle.join() {
                for (index, report) in finished {
                    slots[index] = Some(report);
                }
            }
        }
    });

    let reports = slots
        .into_iter()
        .zip(&selected)
        .map(|(slot, scenario)| slot.unwrap_or_else(|| ScenarioReport::cancelled(&scenario.name)))
        .collect();
    RunReport::new(fixture.version.clone(), reports)
}

/// Evaluates every selected scenario against an already-normalized document.
///
/// Requests, setup and waits are ignored; used when the document is read from
/// disk instead of fetched.
pub fn check_fixture(document: &Value, fixture: &Fixture, options: &RunOptions) -> RunReport {
    let reports = fixture
        .scenarios
        .iter()
        .filter(|scenario| options.selects(&scenario.name))
        .map(|scenario| evaluate_scenario(document, scenario))
        .collect();
    RunReport::new(fixture.version.clone(), reports)
}

/// Status-only scenarios have nothing to evaluate offline and are skipped.
pub fn evaluate_scenario(document: &Value, scenario: &Scenario) -> ScenarioReport {
    if scenario.disabled || !scenario.needs_document() {
        return ScenarioReport::skipped(&scenario.name);
    }
    ScenarioReport::evaluated(
        &scenario.name,
        None,
        evaluate_expectations(document, &scenario.expectations),
    )
}

fn run_isolated<S>(source: &S, scenario: &Scenario, deadline: Option<Instant>) -> ScenarioReport
where
    S: DocumentSource + ?Sized,
{
    match panic::catch_unwind(AssertUnwindSafe(|| {
        run_scenario_until(source, scenario, deadline)
    })) {
        Ok(report) => report,
        Err(payload) => ScenarioReport::errored(
            &scenario.name,
            &ScenarioError::Internal(panic_message(payload.as_ref())),
        ),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_string()
    }
}

/// Fetches one snapshot for `scenario` and evaluates all of its expectations.
pub fn run_scenario<S>(source: &S, scenario: &Scenario) -> ScenarioReport
where
    S: DocumentSource + ?Sized,
{
    run_scenario_until(source, scenario, None)
}

/// Like [`run_scenario`], but gives up once `deadline` passes.
///
/// Setup, delays and marker polling stop at the deadline and the scenario is
/// reported as cancelled. A request already in flight is bounded by the
/// source's own timeouts.
pub fn run_scenario_until<S>(
    source: &S,
    scenario: &Scenario,
    deadline: Option<Instant>,
) -> ScenarioReport
where
    S: DocumentSource + ?Sized,
{
    if scenario.disabled {
        debug!(scenario = %scenario.name, "scenario disabled");
        return ScenarioReport::skipped(&scenario.name);
    }

    let budget = Budget::new(deadline);
    let report = match fetch_snapshot(source, scenario, &budget) {
        Ok(snapshot) => {
            let expectations = match &snapshot.document {
                Some(document) => evaluate_expectations(document, &scenario.expectations),
                None => ExpectationReport::from_outcomes(vec![ExpectationOutcome::status_matched(
                    &format!("{} {}", snapshot.request.method, snapshot.request.path),
                    snapshot.status,
                )]),
            };
            ScenarioReport::evaluated(&scenario.name, Some(snapshot.status), expectations)
        }
        Err(error @ ScenarioError::DeadlineElapsed { .. }) => {
            warn!(scenario = %scenario.name, %error, "deadline elapsed, scenario cancelled");
            ScenarioReport::cancelled(&scenario.name)
        }
        Err(error) => {
            warn!(scenario = %scenario.name, kind = error.kind(), %error, "scenario aborted");
            ScenarioReport::errored(&scenario.name, &error)
        }
    };
    info!(
        scenario = %scenario.name,
        status = ?report.status,
        mismatches = report.mismatch_count,
        "scenario finished"
    );
    report
}

fn fetch_snapshot<S>(
    source: &S,
    scenario: &Scenario,
    budget: &Budget,
) -> Result<Snapshot, ScenarioError>
where
    S: DocumentSource + ?Sized,
{
    for setup in &scenario.setup {
        budget.check()?;
        let request = fetch_request(&setup.request)?;
        let response = source.fetch(&request)?;
        match setup.status {
            Some(expected) if expected != response.status => {
                return Err(unexpected_status(&request, expected, response.status));
            }
            None if !response.is_success() => {
                warn!(
                    method = %request.method,
                    path = %request.path,
                    status = response.status,
                    "setup request returned non-success status"
                );
            }
            _ => {}
        }
    }

    let wait = scenario.wait.as_ref();
    if let Some(delay) = wait.map(|wait| wait.delay_ms).filter(|delay| *delay > 0) {
        budget.sleep(Duration::from_millis(delay))?;
    }
    budget.check()?;

    let request = fetch_request(&scenario.request)?;
    match wait {
        Some(policy) if policy.marker.is_some() => {
            poll_until_propagated(source, request, scenario.status, policy, budget)
        }
        _ if !scenario.needs_document() => {
            let response = fetch_checked(source, &request, scenario.status)?;
            Ok(Snapshot {
                request,
                status: response.status,
                document: None,
            })
        }
        _ => {
            let (status, document) = fetch_document(source, &request, scenario.status)?;
            Ok(Snapshot {
                request,
                status,
                document: Some(document),
            })
        }
    }
}

/// Refetches until the wait marker passes, the wait times out or the run
/// deadline elapses.
fn poll_until_propagated<S>(
    source: &S,
    request: FetchRequest,
    expected_status: u16,
    policy: &WaitPolicy,
    budget: &Budget,
) -> Result<Snapshot, ScenarioError>
where
    S: DocumentSource + ?Sized,
{
    let interval = Duration::from_millis(policy.interval_ms.max(1));
    let timeout = Duration::from_millis(policy.timeout_ms);
    let started = Instant::now();
    let mut attempt = 0usize;

    loop {
        attempt += 1;
        let (status, document) = fetch_document(source, &request, expected_status)?;
        let Some(marker) = policy.marker.as_ref() else {
            return Ok(Snapshot {
                request,
                status,
                document: Some(document),
            });
        };
        let outcome = evaluate_expectation(&document, marker);
        if outcome.passed {
            debug!(attempt, marker = %marker.path, "propagation marker satisfied");
            return Ok(Snapshot {
                request,
                status,
                document: Some(document),
            });
        }

        let waited = started.elapsed();
        if waited + interval > timeout {
            return Err(ScenarioError::TimeoutWaitingForPropagation {
                waited_ms: millis(waited),
                marker: marker.path.to_string(),
                last: outcome
                    .message
                    .unwrap_or_else(|| "marker not satisfied".to_string()),
            });
        }
        debug!(attempt, marker = %marker.path, "propagation marker not yet satisfied");
        budget.sleep(interval)?;
    }
}

/// Fetches `request` and checks the status without reading the body as a document.
fn fetch_checked<S>(
    source: &S,
    request: &FetchRequest,
    expected_status: u16,
) -> Result<FetchedDocument, ScenarioError>
where
    S: DocumentSource + ?Sized,
{
    let response = source.fetch(request)?;
    if response.status != expected_status {
        return Err(unexpected_status(request, expected_status, response.status));
    }
    Ok(response)
}

fn fetch_document<S>(
    source: &S,
    request: &FetchRequest,
    expected_status: u16,
) -> Result<(u16, Value), ScenarioError>
where
    S: DocumentSource + ?Sized,
{
    let response = fetch_checked(source, request, expected_status)?;
    let document = normalize_document(&response.body, response.content_type.as_deref())?;
    Ok((response.status, document))
}

fn fetch_request(spec: &RequestSpec) -> Result<FetchRequest, ScenarioError> {
    let path = spec.render_path().map_err(ScenarioError::InvalidRequest)?;
    Ok(FetchRequest::new(spec.method, path))
}

fn unexpected_status(request: &FetchRequest, expected: u16, actual: u16) -> ScenarioError {
    ScenarioError::UnexpectedStatus {
        method: request.method.to_string(),
        path: request.path.clone(),
        expected,
        actual,
    }
}
