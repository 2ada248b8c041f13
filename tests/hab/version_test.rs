//! Tests for version querying, caching and range checks.

use hab_client::config::HabConfig;
use hab_client::{Hab, HabError};

use crate::support::FakeHab;

/// Fake binary that records each call and prints `line` for `--version`.
fn version_binary(line: &str) -> FakeHab {
    FakeHab::new(&format!(
        "echo call >> \"$(dirname \"$0\")/calls\"\n[ \"$1\" = \"--version\" ] || exit 9\necho '{line}'"
    ))
}

#[tokio::test]
async fn version_is_parsed() {
    let fake = version_binary("hab 1.6.1234/20230101000000");
    let hab = Hab::new(HabConfig::with_binary(fake.path())).unwrap();

    let version = hab.version().await.expect("version should parse");
    assert_eq!(version.version, "1.6.1234");
    assert_eq!(version.build, "20230101000000");
    assert!(hab.satisfies(">=1.6.0").await.unwrap());
    assert!(!hab.satisfies("<1.0.0").await.unwrap());
}

#[tokio::test]
async fn version_is_queried_once() {
    let fake = version_binary("hab 1.6.1234/20230101000000");
    let hab = Hab::new(HabConfig::with_binary(fake.path())).unwrap();

    let _ = hab.version().await;
    let _ = hab.version().await;
    let _ = hab.satisfies("^1").await.unwrap();
    assert_eq!(fake.call_count(), 1);
}

#[tokio::test]
async fn require_version_returns_self_for_chaining() {
    let fake = version_binary("hab 1.6.1234/20230101000000");
    let hab = Hab::new(HabConfig::with_binary(fake.path())).unwrap();

    let chained = hab.require_version(">=1.6.0").await.unwrap();
    assert!(std::ptr::eq(chained, &hab));
}

#[tokio::test]
async fn require_version_rejects_old_binary() {
    let fake = version_binary("hab 1.6.1234/20230101000000");
    let hab = Hab::new(HabConfig::with_binary(fake.path())).unwrap();

    let err = hab.require_version(">=2.0.0").await.unwrap_err();
    match &err {
        HabError::VersionRequirement { required, found } => {
            assert_eq!(required, ">=2.0.0");
            assert_eq!(found.as_deref(), Some("1.6.1234"));
        }
        other => panic!("Expected VersionRequirement, got {other:?}"),
    }
}

#[tokio::test]
async fn unrecognized_output_is_cached_as_unavailable() {
    let fake = version_binary("habitat dev build");
    let hab = Hab::new(HabConfig::with_binary(fake.path())).unwrap();

    assert!(hab.version().await.is_none());
    assert!(hab.version().await.is_none());
    assert!(!hab.satisfies(">=0.0.0").await.unwrap());
    assert_eq!(fake.call_count(), 1);
}

#[tokio::test]
async fn require_version_names_range_and_missing_version() {
    let fake = FakeHab::new("exit 1");
    let hab = Hab::new(HabConfig::with_binary(fake.path())).unwrap();

    let err = hab.require_version(">=1.6.0").await.unwrap_err();
    assert!(matches!(err, HabError::VersionRequirement { found: None, .. }));
    let message = err.to_string();
    assert!(message.contains(">=1.6.0"));
    assert!(message.contains("unavailable"));
}
