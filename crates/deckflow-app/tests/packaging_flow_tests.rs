//! Integration tests for review edits, packaging and listing refresh.

mod common;

use common::{Call, FakeBackend, listing, packaging, reviewed_workflow, server_failure};
use deckflow_app::{FailureKind, project_view};
use deckflow_core::{ReviewView, WorkflowStage};

#[tokio::test]
async fn packaging_flow_tests_parse_error_blocks_packaging() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let backend = FakeBackend::new();
    let mut workflow = reviewed_workflow(&backend, dir.path()).await;
    let calls_before = backend.call_count();

    let valid = workflow
        .edit_content(r#"[{"word": "inu", "meaning": }]"#)
        .expect("edit should apply at review");
    assert!(!valid);

    let view = project_view(&workflow);
    assert!(view.content_error.is_some());
    assert!(!view.can_package());

    let error = workflow
        .package()
        .await
        .expect_err("broken content should not package");
    assert_eq!(error.kind(), FailureKind::Content);
    assert_eq!(workflow.state().stage(), WorkflowStage::Review);
    assert_eq!(backend.call_count(), calls_before);
}

#[tokio::test]
async fn packaging_flow_tests_view_switch_keeps_text() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let backend = FakeBackend::new();
    let mut workflow = reviewed_workflow(&backend, dir.path()).await;
    let before = workflow
        .state()
        .review()
        .expect("content should exist")
        .text()
        .to_string();

    workflow
        .set_review_view(ReviewView::Preview)
        .expect("view should switch");
    workflow
        .set_review_view(ReviewView::Source)
        .expect("view should switch back");

    let after = workflow.state().review().expect("content should exist").text();
    assert_eq!(before, after);
}

#[tokio::test]
async fn packaging_flow_tests_success_finishes_and_refreshes_listing() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let backend = FakeBackend::new();
    let mut workflow = reviewed_workflow(&backend, dir.path()).await;
    workflow
        .edit_content(r#"[{"word": "inu", "meaning": "dog"}]"#)
        .expect("edit should apply");

    backend.script_packaging(Ok(packaging(Some("s-1"))));
    backend.script_listing(Ok(listing(&["words.txt", "Japanese_N4.apkg"])));
    workflow.package().await.expect("packaging should succeed");

    assert_eq!(workflow.state().stage(), WorkflowStage::Finished);
    let calls = backend.calls();
    assert_eq!(
        calls[calls.len() - 2],
        Call::Package {
            session: Some("s-1".to_string()),
            cards: 1,
        }
    );
    assert_eq!(calls[calls.len() - 1], Call::ListFiles("s-1".to_string()));
    assert!(workflow.state().files().iter().any(|entry| entry.is_package));
    assert!(
        workflow
            .log()
            .entries()
            .iter()
            .any(|entry| entry.message == "Packaging complete: Deck created")
    );
    assert!(project_view(&workflow).can_start_new());
}

#[tokio::test]
async fn packaging_flow_tests_failure_stays_at_review() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let backend = FakeBackend::new();
    let mut workflow = reviewed_workflow(&backend, dir.path()).await;

    backend.script_packaging(Err(server_failure(500, "Packaging failed", None)));
    let error = workflow
        .package()
        .await
        .expect_err("packaging failure should surface");

    assert_eq!(error.kind(), FailureKind::Server);
    assert_eq!(workflow.state().stage(), WorkflowStage::Review);
    assert!(project_view(&workflow).can_package());
}

#[tokio::test]
async fn packaging_flow_tests_refresh_twice_yields_identical_listing() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let backend = FakeBackend::new();
    let mut workflow = reviewed_workflow(&backend, dir.path()).await;

    backend.script_listing(Ok(listing(&["words.txt", "Japanese_N4.apkg"])));
    backend.script_listing(Ok(listing(&["words.txt", "Japanese_N4.apkg"])));

    workflow.refresh_files().await.expect("first refresh should succeed");
    let first = workflow.state().files().to_vec();
    workflow.refresh_files().await.expect("second refresh should succeed");

    assert_eq!(first, workflow.state().files());
    assert_eq!(first.len(), 2);
}
