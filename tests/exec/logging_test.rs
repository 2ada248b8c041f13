//! Tests for the log records written while running `hab`.

use hab_client::args::{Arg, Invocation, OptionMap};
use hab_client::exec::{Execution, Executor};

use crate::support::{FakeHab, LogCapture};

#[tokio::test]
async fn every_invocation_is_logged_at_debug() {
    let logs = LogCapture::default();
    let _guard = logs.install();
    let hab = FakeHab::echo_args();

    let inv = Invocation::marshal(vec![Arg::from("svc"), Arg::from("status")]).unwrap();
    Executor::new(hab.path()).run(&inv).await.unwrap();

    let debug = logs.lines_at("DEBUG");
    assert!(
        debug
            .iter()
            .any(|line| line.contains("Invoking hab") && line.contains("args=svc status")),
        "missing invocation record in {debug:?}"
    );
}

#[tokio::test]
async fn passthrough_logs_stdout_at_info_and_stderr_at_error() {
    let logs = LogCapture::default();
    let _guard = logs.install();
    let hab = FakeHab::new("echo loading; echo 'bad config' >&2; echo ready");

    let inv = Invocation::marshal(vec![
        Arg::from("sup"),
        OptionMap::new().passthrough(true).wait(true).into(),
    ])
    .unwrap();
    let result = Executor::new(hab.path()).run(&inv).await.unwrap();
    assert!(matches!(result, Execution::Completed));

    let info = logs.lines_at("INFO");
    assert!(info.iter().any(|line| line.ends_with("hab: loading")), "{info:?}");
    assert!(info.iter().any(|line| line.ends_with("hab: ready")), "{info:?}");

    let error = logs.lines_at("ERROR");
    assert!(error.iter().any(|line| line.ends_with("hab: bad config")), "{error:?}");
    assert!(!info.iter().any(|line| line.contains("bad config")));
}

#[tokio::test]
async fn passthrough_log_lines_drop_terminators() {
    let logs = LogCapture::default();
    let _guard = logs.install();
    let hab = FakeHab::new(r#"printf 'a\r\nb'; printf 'warn\377\n' >&2"#);

    let inv = Invocation::marshal(vec![
        Arg::from("sup"),
        OptionMap::new().passthrough(true).wait(true).into(),
    ])
    .unwrap();
    Executor::new(hab.path()).run(&inv).await.unwrap();

    let info = logs.lines_at("INFO");
    assert!(info.iter().any(|line| line.ends_with("hab: a")), "{info:?}");
    assert!(info.iter().any(|line| line.ends_with("hab: b")), "{info:?}");

    let error = logs.lines_at("ERROR");
    assert!(error.iter().any(|line| line.ends_with("hab: warn\u{FFFD}")), "{error:?}");
}
