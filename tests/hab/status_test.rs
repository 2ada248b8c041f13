//! Tests for `hab svc status` parsing through a fake binary.

use hab_client::config::HabConfig;
use hab_client::Hab;

use crate::support::FakeHab;

/// Fake binary that only answers `svc status`.
fn status_binary(output: &str) -> FakeHab {
    FakeHab::new(&format!(
        "[ \"$1 $2\" = \"svc status\" ] || exit 9\nprintf '{output}'"
    ))
}

#[tokio::test]
async fn header_only_is_empty() {
    let fake = status_binary("NAME  VERSION\\n");
    let hab = Hab::new(HabConfig::with_binary(fake.path())).unwrap();

    let rows = hab.status().await.expect("status should succeed");
    assert!(rows.is_empty());
}

#[tokio::test]
async fn no_output_is_empty() {
    let fake = status_binary("");
    let hab = Hab::new(HabConfig::with_binary(fake.path())).unwrap();

    assert_eq!(hab.status().await, Some(Vec::new()));
}

#[tokio::test]
async fn one_service_record() {
    let fake = status_binary("NAME  VERSION\\ncore/foo  1.2.3\\n");
    let hab = Hab::new(HabConfig::with_binary(fake.path())).unwrap();

    let rows = hab.status().await.expect("status should succeed");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("NAME"), Some("core/foo"));
    assert_eq!(rows[0].get("VERSION"), Some("1.2.3"));
    assert_eq!(rows[0].len(), 2);
}

#[tokio::test]
async fn failing_command_is_none() {
    let fake = FakeHab::new("echo 'supervisor not running' >&2; exit 1");
    let hab = Hab::new(HabConfig::with_binary(fake.path())).unwrap();

    assert!(hab.status().await.is_none());
}
