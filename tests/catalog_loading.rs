mod common;
use crate::common::builders::{CatalogDir, CatalogFileBuilder, ScriptConfigBuilder};
use crate::common::{fast_options, init_tracing, texts, with_timeout};

use std::time::Duration;

use scriptvisor::catalog::{Catalog, LaunchOverrides, SystemFacts};
use scriptvisor::config::{load_and_validate, load_optional};
use scriptvisor::errors::ScriptvisorError;
use scriptvisor::exec::{Engine, Outcome};

#[tokio::test]
async fn catalog_script_runs_relative_to_the_catalog() {
    init_tracing();
    let dir = CatalogDir::new();
    dir.script(
        "scripts/hello.sh",
        "echo \"$GREETING from $NAME root=$SCRIPTVISOR_IS_ROOT\"\npwd -P",
    );
    let path = dir.catalog(
        r#"
        [env]
        GREETING = "hello"

        [script.hello]
        label = "Say hello"
        program = "scripts/hello.sh"
        cwd = "scripts"
        env = { NAME = "catalog" }
        "#,
    );

    let catalog = Catalog::new(load_and_validate(&path).unwrap(), SystemFacts::default());
    let descriptor = catalog
        .descriptor_for("hello", &LaunchOverrides::default())
        .unwrap();
    assert_eq!(descriptor.label(), "Say hello");

    let engine = Engine::new(catalog.engine_options());
    let (lines, outcome) = with_timeout(engine.execute(descriptor).unwrap().collect()).await;

    assert_eq!(outcome, Outcome::Succeeded { exit_code: 0 });
    let scripts_dir = dir.path().join("scripts").canonicalize().unwrap();
    let scripts_dir = scripts_dir.to_string_lossy().into_owned();
    assert_eq!(
        texts(&lines),
        ["hello from catalog root=0", scripts_dir.as_str()]
    );
}

#[tokio::test]
async fn overrides_win_over_catalog_values() {
    init_tracing();
    let catalog = CatalogFileBuilder::new()
        .with_env("MODE", "global")
        .with_default_timeout("30s")
        .with_script(
            "mode",
            ScriptConfigBuilder::new("sh")
                .arg("-c")
                .arg("echo $MODE")
                .env("MODE", "entry")
                .timeout("10s")
                .build(),
        )
        .build_catalog();

    let entry_only = catalog
        .descriptor_for("mode", &LaunchOverrides::default())
        .unwrap();
    assert_eq!(entry_only.timeout(), Some(Duration::from_secs(10)));

    let overrides = LaunchOverrides {
        env: vec![("MODE".to_string(), "override".to_string())],
        timeout: Some(Duration::from_secs(2)),
    };
    let descriptor = catalog.descriptor_for("mode", &overrides).unwrap();
    assert_eq!(descriptor.timeout(), Some(Duration::from_secs(2)));

    let engine = Engine::new(fast_options());
    let (lines, _) = with_timeout(engine.execute(descriptor).unwrap().collect()).await;
    assert_eq!(texts(&lines), ["override"]);
}

#[tokio::test]
async fn quick_commands_run_through_the_shell() {
    init_tracing();
    let catalog = CatalogFileBuilder::new()
        .with_quick("pipeline", "printf 'b\\na\\n' | sort")
        .build_catalog();

    let descriptor = catalog
        .descriptor_for("pipeline", &LaunchOverrides::default())
        .unwrap();
    let engine = Engine::new(fast_options());
    let (lines, outcome) = with_timeout(engine.execute(descriptor).unwrap().collect()).await;

    assert!(outcome.is_success());
    assert_eq!(texts(&lines), ["a", "b"]);
}

#[test]
fn unknown_and_root_only_entries_are_refused() {
    let catalog = CatalogFileBuilder::new()
        .with_script(
            "kernel",
            ScriptConfigBuilder::new("/opt/kernel.sh")
                .label("Upgrade kernel")
                .requires_root()
                .build(),
        )
        .build_catalog();

    let err = catalog
        .descriptor_for("missing", &LaunchOverrides::default())
        .unwrap_err();
    assert!(matches!(err, ScriptvisorError::UnknownEntry(name) if name == "missing"));

    let err = catalog
        .descriptor_for("kernel", &LaunchOverrides::default())
        .unwrap_err();
    assert!(matches!(err, ScriptvisorError::RequiresRoot(label) if label == "Upgrade kernel"));

    let as_root = Catalog::new(
        CatalogFileBuilder::new()
            .with_script(
                "kernel",
                ScriptConfigBuilder::new("/opt/kernel.sh").requires_root().build(),
            )
            .build(),
        SystemFacts {
            is_root: true,
            ..SystemFacts::default()
        },
    );
    let descriptor = as_root
        .descriptor_for("kernel", &LaunchOverrides::default())
        .unwrap();
    assert_eq!(
        descriptor.environment().get("SCRIPTVISOR_IS_ROOT").map(String::as_str),
        Some("1")
    );
}

#[test]
fn engine_section_feeds_engine_options() {
    let dir = CatalogDir::new();
    let path = dir.catalog(
        r#"
        [engine]
        grace_period = "750ms"
        drain_timeout = "1s"
        event_buffer = 8

        [quick.noop]
        command = "true"
        "#,
    );

    let catalog = Catalog::new(load_and_validate(&path).unwrap(), SystemFacts::default());
    let options = catalog.engine_options();
    assert_eq!(options.supervisor.grace_period, Duration::from_millis(750));
    assert_eq!(options.supervisor.drain_timeout, Duration::from_secs(1));
    assert_eq!(options.event_buffer, 8);
}

#[test]
fn missing_catalog_is_optional_but_invalid_one_is_not() {
    let dir = CatalogDir::new();
    assert!(load_optional(dir.path().join("absent.toml")).unwrap().is_none());

    let path = dir.catalog("[script.broken]\nlabel = \"no program\"\n");
    assert!(load_optional(&path).is_err());
    assert!(load_and_validate(&path).is_err());
}
