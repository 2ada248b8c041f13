//! Tests for the spawn strategy and process handles.

use std::time::Duration;

use hab_client::args::{Arg, Invocation, OptionMap};
use hab_client::exec::{ExecError, Execution, Executor, HabProcess};

use crate::support::FakeHab;

async fn spawn(hab: &FakeHab, directives: OptionMap) -> Execution {
    let inv = Invocation::marshal(vec![Arg::from("sup"), Arg::from("run"), directives.into()])
        .unwrap();
    Executor::new(hab.path()).run(&inv).await.unwrap()
}

async fn spawn_process(hab: &FakeHab, directives: OptionMap) -> HabProcess {
    spawn(hab, directives.spawn(true))
        .await
        .into_process()
        .expect("Expected a spawned process")
}

#[tokio::test]
async fn spawn_returns_live_handle() {
    let hab = FakeHab::echo_args();
    let process = spawn_process(&hab, OptionMap::new()).await;

    assert!(process.id().is_some());
    assert_eq!(process.capture(None).await.unwrap(), "sup run\n");
}

#[tokio::test]
async fn capture_is_memoized() {
    let hab = FakeHab::new(r#"echo call >> "$(dirname "$0")/calls"; cat"#);
    let process = spawn_process(&hab, OptionMap::new()).await;

    let (first, second) = tokio::join!(
        process.capture(Some("hello")),
        process.capture(Some("ignored"))
    );
    assert_eq!(first.unwrap(), "hello");
    assert_eq!(second.unwrap(), "hello");

    let third = process.capture(None).await.unwrap();
    assert_eq!(third, "hello");
    assert_eq!(hab.call_count(), 1);
}

#[tokio::test]
async fn capture_trimmed_strips_whitespace() {
    let hab = FakeHab::new("printf '\\n  core/redis  \\n'");
    let process = spawn_process(&hab, OptionMap::new()).await;

    assert_eq!(process.capture_trimmed(None).await.unwrap(), "core/redis");
}

#[tokio::test]
async fn capture_failure_keeps_partial_output() {
    let hab = FakeHab::new("echo partial; exit 4");
    let process = spawn_process(&hab, OptionMap::new()).await;

    let err = process.capture(None).await.unwrap_err();
    assert_eq!(err.output, "partial\n");
    assert_eq!(err.code, Some(4));

    // The failure is memoized too.
    let again = process.capture(None).await.unwrap_err();
    assert_eq!(again, err);
}

#[tokio::test]
async fn passthrough_implies_spawn_and_still_captures() {
    let hab = FakeHab::new("echo one; echo oops >&2; echo two");
    let result = spawn(&hab, OptionMap::new().passthrough(true)).await;

    let process = result.into_process().expect("passthrough should spawn");
    assert_eq!(process.capture(None).await.unwrap(), "one\ntwo\n");
}

#[tokio::test]
async fn wait_resolves_on_success() {
    let hab = FakeHab::new("echo ignored; exit 0");
    let result = spawn(&hab, OptionMap::new().spawn(true).wait(true)).await;

    assert!(matches!(result, Execution::Completed));
}

#[tokio::test]
async fn wait_fails_with_exit_code() {
    let hab = FakeHab::new("exit 5");
    let inv = Invocation::marshal(vec![
        Arg::from("sup"),
        OptionMap::new().spawn(true).wait(true).into(),
    ])
    .unwrap();

    let err = Executor::new(hab.path()).run(&inv).await.unwrap_err();
    assert!(matches!(err, ExecError::ExitStatus { code: Some(5) }));
    assert_eq!(err.code(), Some(5));
}

#[tokio::test]
async fn wait_with_passthrough_streams_and_completes() {
    let hab = FakeHab::new("echo starting; echo done");
    let result = spawn(&hab, OptionMap::new().passthrough(true).wait(true)).await;

    assert!(matches!(result, Execution::Completed));
}

#[tokio::test]
async fn spawn_launch_failure() {
    let inv = Invocation::marshal(vec![Arg::from("sup"), OptionMap::new().spawn(true).into()])
        .unwrap();

    let err = Executor::new("/nonexistent/bin/hab")
        .run(&inv)
        .await
        .unwrap_err();
    assert!(matches!(err, ExecError::NotFound(_)));
}

#[tokio::test]
async fn kill_stops_long_running_process() {
    let hab = FakeHab::new("exec sleep 30");
    let process = spawn_process(&hab, OptionMap::new()).await;

    process.kill().await.unwrap();
    let status = process.wait().await.unwrap();
    assert!(!status.success());
    assert_eq!(process.exit_status(), Some(status));
}

#[tokio::test]
async fn graceful_terminate_stops_process() {
    let hab = FakeHab::new("exec sleep 30");
    let process = spawn_process(&hab, OptionMap::new()).await;

    process
        .graceful_terminate(Duration::from_secs(5))
        .await
        .unwrap();
    let status = process.exit_status().expect("process should have exited");
    assert!(!status.success());

    // Terminating an exited process is a no-op.
    process.kill().await.unwrap();
}

#[tokio::test]
async fn undecodable_stderr_does_not_stop_draining() {
    let hab = FakeHab::new(
        r#"printf '\377\n' >&2
i=0
while [ $i -lt 2000 ]; do echo "warning line $i" >&2; i=$((i+1)); done
echo done"#,
    );
    let process = spawn_process(&hab, OptionMap::new()).await;

    assert_eq!(process.capture(None).await.unwrap(), "done\n");
}

#[tokio::test]
async fn passthrough_decodes_stdout_lossily() {
    let hab = FakeHab::new(r#"printf 'ok\n\377\n'; echo tail"#);
    let process = spawn(&hab, OptionMap::new().passthrough(true))
        .await
        .into_process()
        .unwrap();

    assert_eq!(process.capture(None).await.unwrap(), "ok\n\u{FFFD}\ntail\n");
}

#[tokio::test]
async fn passthrough_capture_matches_plain_capture() {
    let hab = FakeHab::new(r#"printf 'a\r\nb'"#);

    let plain = spawn_process(&hab, OptionMap::new()).await;
    assert_eq!(plain.capture(None).await.unwrap(), "a\r\nb");

    let streamed = spawn(&hab, OptionMap::new().passthrough(true))
        .await
        .into_process()
        .unwrap();
    assert_eq!(streamed.capture(None).await.unwrap(), "a\r\nb");
}
