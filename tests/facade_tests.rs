// Dispatch facade: defaulting, forwarding and the combined quality gate.

mod common;

use std::sync::Arc;

use kiln::config::SdkConfig;
use kiln::error::KilnError;
use kiln::sdk::python::{CHECK_SUCCESS, LINT_SUCCESS};
use kiln::sdk::{Language, Platform, SdkDispatch, SdkRegistry};

use common::StubRuntime;

fn dispatch(runtime: &Arc<StubRuntime>) -> SdkDispatch {
    let registry = Arc::new(SdkRegistry::with_builtin(
        runtime.clone(),
        &SdkConfig::default(),
    ));
    SdkDispatch::new(registry)
}

fn sample_project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("pyproject.toml"),
        "[project]\nname = \"demo\"\nversion = \"0.0.0\"\n",
    )
    .unwrap();
    std::fs::create_dir_all(dir.path().join("src/demo")).unwrap();
    dir
}

#[test]
fn language_defaults_to_python() {
    let runtime = Arc::new(StubRuntime::new());
    assert_eq!(dispatch(&runtime).language(), Language::Python);
}

#[tokio::test]
async fn quality_joins_reports_in_fixed_order() {
    let runtime = Arc::new(StubRuntime::new());
    let project = sample_project();

    let report = dispatch(&runtime)
        .quality(project.path(), None)
        .await
        .unwrap();

    assert_eq!(report, format!("{LINT_SUCCESS}\n{CHECK_SUCCESS}"));
    // Both sub-pipelines ran in their own containers
    assert!(runtime.ran_command(&["ruff", "check"]));
    assert!(runtime.ran_command(&["mypy", "--config-file=mypy.ini"]));
    assert_eq!(runtime.live_containers(), 0);
}

#[tokio::test]
async fn quality_fails_when_lint_fails() {
    let runtime = Arc::new(StubRuntime::new());
    runtime.on_command_failure(&["ruff", "check"], "E501 line too long\n", "");
    let project = sample_project();

    let err = dispatch(&runtime)
        .quality(project.path(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, KilnError::Tool(_)));
    assert!(err.to_string().contains("E501"));
}

#[tokio::test]
async fn quality_fails_when_check_fails() {
    let runtime = Arc::new(StubRuntime::new());
    runtime.on_command_failure(&["mypy"], "found 2 errors\n", "");
    let project = sample_project();

    let err = dispatch(&runtime)
        .quality(project.path(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, KilnError::Tool(_)));
}

#[tokio::test]
async fn default_platform_flows_to_engine() {
    let runtime = Arc::new(StubRuntime::new());
    let project = sample_project();

    dispatch(&runtime)
        .with_default_platform(Platform::new("linux/arm64"))
        .check(project.path(), None)
        .await
        .unwrap();

    assert_eq!(runtime.created_platforms(), vec!["linux/arm64".to_string()]);
}

#[tokio::test]
async fn explicit_platform_overrides_default() {
    let runtime = Arc::new(StubRuntime::new());
    let project = sample_project();

    dispatch(&runtime)
        .with_default_platform(Platform::new("linux/arm64"))
        .check(project.path(), Some(Platform::new("linux/amd64")))
        .await
        .unwrap();

    assert_eq!(runtime.created_platforms(), vec!["linux/amd64".to_string()]);
}

#[tokio::test]
async fn unregistered_handler_is_a_config_error() {
    let facade = SdkDispatch::new(Arc::new(SdkRegistry::new()));
    let project = sample_project();

    let err = facade.check(project.path(), None).await.unwrap_err();
    assert!(matches!(err, KilnError::Discovery(_)));
    assert_eq!(err.exit_code(), kiln::error::exit_codes::CONFIG_ERROR);
}
