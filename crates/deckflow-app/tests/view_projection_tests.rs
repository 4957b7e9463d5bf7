//! Integration tests for UI projection of run state.

mod common;

use common::{FakeBackend, reviewed_workflow, workflow};
use deckflow_app::project_view;
use deckflow_core::WorkflowStage;
use deckflow_ui::{ConsoleHeight, StageStatus};

#[tokio::test]
async fn view_projection_tests_fresh_run_is_idle_at_input() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let backend = FakeBackend::new();
    let workflow = workflow(&backend, dir.path());

    let view = project_view(&workflow);
    assert_eq!(view.stage, WorkflowStage::Input);
    assert_eq!(view.heading(), "STEP 2: Configuration");
    assert!(view.can_change_mode());
    assert!(!view.can_download());
    assert_eq!(view.console_height(), ConsoleHeight::Min);
}

#[tokio::test]
async fn view_projection_tests_review_exposes_content_and_session() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let backend = FakeBackend::new();
    let workflow = reviewed_workflow(&backend, dir.path()).await;

    let view = project_view(&workflow);
    assert_eq!(view.heading(), "STEP 3: Review & Edit");
    assert!(view.has_content);
    assert!(view.can_package());
    assert!(view.can_download());
    assert_eq!(view.file_count, 1);
    assert_eq!(view.activity, StageStatus::Healthy);
}

#[tokio::test]
async fn view_projection_tests_failed_validation_surfaces_console_and_alert() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let backend = FakeBackend::new();
    let mut workflow = workflow(&backend, dir.path());

    workflow
        .begin_analysis()
        .expect_err("analysis without inputs should fail");

    let view = project_view(&workflow);
    assert_eq!(view.pending_alerts, 1);
    assert_eq!(view.console_height(), ConsoleHeight::Mid);
}

#[tokio::test]
async fn view_projection_tests_expanded_console_survives_new_run() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let backend = FakeBackend::new();
    let mut workflow = reviewed_workflow(&backend, dir.path()).await;

    workflow.set_console_expanded(true);
    assert_eq!(project_view(&workflow).console_height(), ConsoleHeight::Max);

    workflow.start_new();
    assert_eq!(project_view(&workflow).console_height(), ConsoleHeight::Max);

    workflow.set_console_expanded(false);
    assert_eq!(project_view(&workflow).console_height(), ConsoleHeight::Min);
}
