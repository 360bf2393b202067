// ABOUTME: Integration tests for the supervisor lifecycle against real sh workers.
// ABOUTME: Covers start/stop/restart, reaper classification and shutdown behaviour.

#![cfg(unix)]

use hoster_core::{
    RestartError, StartError, StopError, Supervisor, SupervisorEvent, SupervisorSettings,
    WorkerDirectory, WorkerState,
};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::sync::mpsc;

const ECHO_OK: &str = "exit 0\n";
const CRASH_WORKER: &str = "echo boom >&2\nexit 1\n";
const LONG_RUNNER: &str = "trap 'exit 3' TERM\nwhile true; do sleep 0.1; done\n";
const STUBBORN: &str = "trap '' TERM\nwhile true; do sleep 0.1; done\n";
const CHATTY: &str = "echo hello\necho warn >&2\nexit 0\n";

struct Harness {
    _dir: TempDir,
    supervisor: Supervisor,
    events: mpsc::Receiver<SupervisorEvent>,
}

fn settings() -> SupervisorSettings {
    SupervisorSettings {
        reap_interval: Duration::from_millis(50),
        stop_grace: Some(Duration::from_secs(5)),
        stop_poll_interval: Duration::from_millis(20),
        capture_limit: 64 * 1024,
        drain_timeout: Duration::from_secs(2),
    }
}

fn harness_with(settings: SupervisorSettings, interpreter: &str) -> Harness {
    let dir = TempDir::new().unwrap();
    for (name, body) in [
        ("echo_ok", ECHO_OK),
        ("crash_worker", CRASH_WORKER),
        ("long_runner", LONG_RUNNER),
        ("stubborn", STUBBORN),
        ("chatty", CHATTY),
    ] {
        std::fs::write(dir.path().join(format!("{name}.sh")), body).unwrap();
    }

    let workers = WorkerDirectory::new(dir.path())
        .with_extension("sh")
        .with_interpreter(interpreter);
    let (supervisor, events) = Supervisor::new(workers, settings);
    Harness {
        _dir: dir,
        supervisor,
        events,
    }
}

fn harness() -> Harness {
    harness_with(settings(), "sh")
}

async fn wait_for_state(supervisor: &Supervisor, name: &str, state: WorkerState) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if supervisor.registry().get(name).map(|s| s.state) == Some(state) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "{name} never reached {state}, last status: {:?}",
        supervisor.registry().get(name)
    );
}

fn drain_events(rx: &mut mpsc::Receiver<SupervisorEvent>) -> Vec<SupervisorEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn stop_of_never_started_worker_mutates_nothing() {
    let h = harness();
    let err = h.supervisor.stop("long_runner").await.unwrap_err();
    assert!(matches!(err, StopError::NeverStarted(_)));
    assert!(h.supervisor.status().is_empty());
}

#[tokio::test]
async fn started_worker_is_running_immediately() {
    let h = harness();
    h.supervisor.start("long_runner").unwrap();

    let status = h.supervisor.status();
    assert_eq!(status.len(), 1);
    assert_eq!(status[0].name, "long_runner");
    assert_eq!(status[0].state, WorkerState::Running);
    assert!(status[0].pid.is_some());
    assert!(status[0].started_at.is_some());

    h.supervisor.stop("long_runner").await.unwrap();
}

#[tokio::test]
async fn clean_exit_becomes_stopped() {
    let mut h = harness();
    let reaper = h.supervisor.reaper().spawn();

    h.supervisor.start("echo_ok").unwrap();
    wait_for_state(&h.supervisor, "echo_ok", WorkerState::Stopped).await;
    reaper.abort();

    let status = h.supervisor.registry().get("echo_ok").unwrap();
    assert_eq!(status.error_detail, None);
    assert_eq!(status.exit_code, Some(0));

    let events = drain_events(&mut h.events);
    assert!(events.contains(&SupervisorEvent::Exited {
        name: "echo_ok".to_string()
    }));
}

#[tokio::test]
async fn crash_becomes_errored_with_stderr() {
    let mut h = harness();
    let reaper = h.supervisor.reaper().spawn();

    h.supervisor.start("crash_worker").unwrap();
    wait_for_state(&h.supervisor, "crash_worker", WorkerState::Errored).await;
    reaper.abort();

    let status = h.supervisor.registry().get("crash_worker").unwrap();
    assert_eq!(status.error_detail.as_deref(), Some("boom"));

    let crashes: Vec<_> = drain_events(&mut h.events)
        .into_iter()
        .filter(|e| matches!(e, SupervisorEvent::Crashed { .. }))
        .collect();
    assert_eq!(crashes.len(), 1);
}

#[tokio::test]
async fn reaping_twice_does_not_reclassify() {
    let mut h = harness();
    let reaper = h.supervisor.reaper();
    h.supervisor.start("crash_worker").unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    let mut classified = 0;
    while classified == 0 && Instant::now() < deadline {
        classified = reaper.reap_once().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(classified, 1);
    assert_eq!(reaper.reap_once().await, 0);

    let crashes = drain_events(&mut h.events)
        .into_iter()
        .filter(|e| matches!(e, SupervisorEvent::Crashed { .. }))
        .count();
    assert_eq!(crashes, 1);
}

#[tokio::test]
async fn stop_racing_a_running_reaper_is_never_a_crash() {
    let fast = SupervisorSettings {
        reap_interval: Duration::from_millis(5),
        ..settings()
    };
    let mut h = harness_with(fast, "sh");
    let reaper = h.supervisor.reaper().spawn();

    for _ in 0..5 {
        h.supervisor.start("long_runner").unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        h.supervisor.stop("long_runner").await.unwrap();
    }
    tokio::time::sleep(Duration::from_millis(200)).await;
    reaper.abort();

    let status = h.supervisor.registry().get("long_runner").unwrap();
    assert_eq!(status.state, WorkerState::Stopped);
    assert_eq!(status.error_detail, None);

    let events = drain_events(&mut h.events);
    assert!(!events
        .iter()
        .any(|e| matches!(e, SupervisorEvent::Crashed { .. })));
    // A restart may replace a record before its exit is classified; that exit is skipped
    let terminated = events
        .iter()
        .filter(|e| matches!(e, SupervisorEvent::Terminated { .. }))
        .count();
    assert!((1..=5).contains(&terminated));
}

#[tokio::test]
async fn manual_stop_is_never_errored() {
    let mut h = harness();
    let reaper = h.supervisor.reaper();

    h.supervisor.start("long_runner").unwrap();
    assert_eq!(
        h.supervisor.registry().get("long_runner").unwrap().state,
        WorkerState::Running
    );

    h.supervisor.stop("long_runner").await.unwrap();
    let status = h.supervisor.registry().get("long_runner").unwrap();
    assert_eq!(status.state, WorkerState::Stopped);
    // Either the trap's exit 3 or death by signal, never a clean exit
    assert_ne!(status.exit_code, Some(0));

    assert_eq!(reaper.reap_once().await, 1);
    let status = h.supervisor.registry().get("long_runner").unwrap();
    assert_eq!(status.state, WorkerState::Stopped);
    assert_eq!(status.error_detail, None);

    let events = drain_events(&mut h.events);
    assert!(events.contains(&SupervisorEvent::Terminated {
        name: "long_runner".to_string()
    }));
    assert!(!events
        .iter()
        .any(|e| matches!(e, SupervisorEvent::Crashed { .. })));
}

#[tokio::test]
async fn stop_after_exit_is_not_running() {
    let h = harness();
    let reaper = h.supervisor.reaper().spawn();

    h.supervisor.start("echo_ok").unwrap();
    wait_for_state(&h.supervisor, "echo_ok", WorkerState::Stopped).await;
    reaper.abort();

    let err = h.supervisor.stop("echo_ok").await.unwrap_err();
    assert!(matches!(err, StopError::NotRunning(_)));
}

#[tokio::test]
async fn double_start_is_rejected() {
    let h = harness();
    h.supervisor.start("long_runner").unwrap();
    let pid = h.supervisor.registry().get("long_runner").unwrap().pid;

    let err = h.supervisor.start("long_runner").unwrap_err();
    assert!(matches!(err, StartError::AlreadyRunning { .. }));
    assert_eq!(h.supervisor.registry().get("long_runner").unwrap().pid, pid);

    h.supervisor.shutdown().await;
}

#[tokio::test]
async fn restart_missing_bot_reports_not_found() {
    let h = harness();
    let err = h.supervisor.restart("missing_bot").await.unwrap_err();
    assert!(matches!(
        err,
        RestartError::Start(StartError::NotFound { .. })
    ));
    assert!(h.supervisor.status().is_empty());
}

#[tokio::test]
async fn restart_replaces_running_process() {
    let h = harness();
    h.supervisor.start("long_runner").unwrap();
    let first_pid = h.supervisor.registry().get("long_runner").unwrap().pid;

    h.supervisor.restart("long_runner").await.unwrap();
    let status = h.supervisor.registry().get("long_runner").unwrap();
    assert_eq!(status.state, WorkerState::Running);
    assert_ne!(status.pid, first_pid);

    h.supervisor.shutdown().await;
}

#[tokio::test]
async fn restart_after_crash_runs_again() {
    let h = harness();
    let reaper = h.supervisor.reaper().spawn();

    h.supervisor.start("crash_worker").unwrap();
    wait_for_state(&h.supervisor, "crash_worker", WorkerState::Errored).await;

    h.supervisor.restart("crash_worker").await.unwrap();
    wait_for_state(&h.supervisor, "crash_worker", WorkerState::Errored).await;
    reaper.abort();
}

#[tokio::test]
async fn spawn_failure_is_recorded() {
    let h = harness_with(settings(), "/nonexistent/hoster-interpreter");

    let err = h.supervisor.start("echo_ok").unwrap_err();
    assert!(matches!(err, StartError::SpawnFailed { .. }));

    let status = h.supervisor.registry().get("echo_ok").unwrap();
    assert_eq!(status.state, WorkerState::FailedToStart);
    assert!(status.error_detail.is_some());
    assert_eq!(status.pid, None);

    let err = h.supervisor.stop("echo_ok").await.unwrap_err();
    assert!(matches!(err, StopError::NotRunning(_)));
}

#[tokio::test]
async fn stop_escalates_after_grace_period() {
    let h = harness_with(
        SupervisorSettings {
            stop_grace: Some(Duration::from_millis(300)),
            ..settings()
        },
        "sh",
    );
    h.supervisor.start("stubborn").unwrap();
    // Let the shell install its trap before signalling
    tokio::time::sleep(Duration::from_millis(200)).await;

    let started = Instant::now();
    h.supervisor.stop("stubborn").await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(300));

    let status = h.supervisor.registry().get("stubborn").unwrap();
    assert_eq!(status.state, WorkerState::Stopped);
}

#[tokio::test]
async fn shutdown_stops_every_live_worker() {
    let h = harness();
    let reaper = h.supervisor.reaper().spawn();
    h.supervisor.start("long_runner").unwrap();
    h.supervisor.start("echo_ok").unwrap();
    wait_for_state(&h.supervisor, "echo_ok", WorkerState::Stopped).await;
    reaper.abort();

    let stopped = h.supervisor.shutdown().await;
    assert_eq!(stopped, vec!["long_runner".to_string()]);
    assert!(h
        .supervisor
        .status()
        .iter()
        .all(|s| s.state == WorkerState::Stopped));
}

#[tokio::test]
async fn output_is_captured() {
    let h = harness();
    let reaper = h.supervisor.reaper().spawn();
    h.supervisor.start("chatty").unwrap();
    wait_for_state(&h.supervisor, "chatty", WorkerState::Stopped).await;
    reaper.abort();

    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let output = h.supervisor.output("chatty").unwrap();
        if output.stdout == "hello" {
            assert_eq!(output.stderr, "warn");
            break;
        }
        assert!(Instant::now() < deadline, "stdout never captured");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert!(h.supervisor.output("missing_bot").is_none());
}
