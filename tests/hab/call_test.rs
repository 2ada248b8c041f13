//! Tests for the polymorphic call surface and subcommand helpers.

use hab_client::config::HabConfig;
use hab_client::{Arg, Execution, Hab, HabError, OptionMap};
use serde_json::json;

use crate::support::FakeHab;

fn hab_for(fake: &FakeHab) -> Hab {
    Hab::new(HabConfig::with_binary(fake.path())).unwrap()
}

#[tokio::test]
async fn exec_json_runs_subcommand() {
    let fake = FakeHab::echo_args();
    let hab = hab_for(&fake);

    let result = hab
        .exec_json(vec![
            json!("pkg"),
            json!("install"),
            json!({"binlink": true, "channel": "stable", "url": null}),
            json!("core/hab"),
        ])
        .await
        .unwrap();
    assert_eq!(
        result.output(),
        Some("pkg install --binlink --channel stable core/hab")
    );
}

#[tokio::test]
async fn exec_json_null_on_error() {
    let fake = FakeHab::new("exit 1");
    let hab = hab_for(&fake);

    let result = hab
        .exec_json(vec![json!("svc"), json!("load"), json!({"$nullOnError": true})])
        .await
        .unwrap();
    assert!(matches!(result, Execution::Null));
}

#[tokio::test]
async fn exec_json_rejects_unsupported_argument() {
    let fake = FakeHab::echo_args();
    let hab = hab_for(&fake);

    let err = hab
        .exec_json(vec![json!("svc"), json!(["status"])])
        .await
        .unwrap_err();
    assert!(matches!(err, HabError::Marshal(_)));
    assert_eq!(err.to_string(), "Unsupported argument type: array");
}

#[tokio::test]
async fn exec_failure_surfaces_exec_error() {
    let fake = FakeHab::new("echo 'not allowed' >&2; exit 2");
    let hab = hab_for(&fake);

    let err = hab.exec(["origin", "key", "generate"]).await.unwrap_err();
    match err {
        HabError::Exec(exec) => {
            assert_eq!(exec.code(), Some(2));
            assert!(exec.to_string().contains("not allowed"));
        }
        other => panic!("Expected Exec error, got {other:?}"),
    }
}

#[tokio::test]
async fn subcommand_helpers_prepend_their_name() {
    let fake = FakeHab::echo_args();
    let hab = hab_for(&fake);

    let pkg = hab.pkg(["install", "core/hab"]).await.unwrap();
    assert_eq!(pkg.output(), Some("pkg install core/hab"));

    let svc = hab
        .svc([
            Arg::from("load"),
            Arg::from("core/redis"),
            OptionMap::new().set("strategy", "at-once").into(),
        ])
        .await
        .unwrap();
    assert_eq!(
        svc.output(),
        Some("svc load core/redis --strategy at-once")
    );

    let config = hab
        .config([Arg::from("apply"), Arg::from("redis.default"), Arg::from(1)])
        .await
        .unwrap();
    assert_eq!(config.output(), Some("config apply redis.default 1"));
}
