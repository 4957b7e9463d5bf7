//! Integration tests for stage transitions and run resets.

mod common;

use common::{
    FakeBackend, VOCAB_CARDS, extraction, generation, listing, packaging, page_file,
    reviewed_workflow, text_file, vocab_workflow, workflow,
};
use deckflow_app::{Action, FlowError};
use deckflow_core::{GenerationMode, WorkflowStage};

#[tokio::test]
async fn run_lifecycle_tests_mode_change_starts_a_clean_run() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let backend = FakeBackend::new();
    backend.script_extraction(Ok(extraction(0, Some("s-1"))));

    let mut workflow = workflow(&backend, dir.path());
    workflow.inputs_mut().source_files = vec![page_file("page1.pdf")];
    workflow.inputs_mut().vocab_file = Some(text_file("words.txt", "inu"));
    workflow.analyze().await.expect("analysis should run");
    assert!(workflow.state().session().is_some());
    let run_before = workflow.state().run_id();

    workflow
        .set_mode(GenerationMode::Grammar)
        .expect("mode should switch at input");

    let state = workflow.state();
    assert_eq!(state.mode(), GenerationMode::Grammar);
    assert!(state.session().is_none());
    assert!(state.inputs().source_files.is_empty());
    assert!(state.inputs().vocab_file.is_none());
    assert_ne!(state.run_id(), run_before);
    assert_eq!(state.settings().api_key, "sk-test-credential");
}

#[tokio::test]
async fn run_lifecycle_tests_mode_is_locked_outside_input() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let backend = FakeBackend::new();
    let mut workflow = reviewed_workflow(&backend, dir.path()).await;

    let error = workflow
        .set_mode(GenerationMode::Article)
        .expect_err("mode change at review should be rejected");
    assert!(matches!(
        error,
        FlowError::InvalidStage {
            stage: WorkflowStage::Review,
            ..
        }
    ));
    assert_eq!(workflow.state().mode(), GenerationMode::VocabList);
}

#[tokio::test]
async fn run_lifecycle_tests_start_new_from_finished_clears_session_and_inputs() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let backend = FakeBackend::new();
    let mut workflow = reviewed_workflow(&backend, dir.path()).await;
    backend.script_packaging(Ok(packaging(Some("s-1"))));
    backend.script_listing(Ok(listing(&["Japanese_N4.apkg"])));
    workflow.package().await.expect("packaging should succeed");
    assert_eq!(workflow.state().stage(), WorkflowStage::Finished);

    workflow.start_new();

    let state = workflow.state();
    assert_eq!(state.stage(), WorkflowStage::Input);
    assert!(state.session().is_none());
    assert!(state.files().is_empty());
    assert!(state.review().is_none());
    assert!(state.inputs().vocab_file.is_none());
    assert_eq!(state.mode(), GenerationMode::VocabList);
}

#[tokio::test]
async fn run_lifecycle_tests_discard_keeps_inputs_and_drops_session() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let backend = FakeBackend::new();
    let mut workflow = reviewed_workflow(&backend, dir.path()).await;

    workflow.discard_review().expect("discard should apply at review");

    let state = workflow.state();
    assert_eq!(state.stage(), WorkflowStage::Input);
    assert!(state.session().is_none());
    assert!(state.review().is_none());
    assert!(state.inputs().vocab_file.is_some());
}

#[tokio::test]
async fn run_lifecycle_tests_back_from_selection_keeps_session() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let backend = FakeBackend::new();
    backend.script_extraction(Ok(extraction(2, Some("s-7"))));

    let mut workflow = workflow(&backend, dir.path());
    workflow.inputs_mut().source_files = vec![page_file("page1.pdf")];
    workflow.inputs_mut().vocab_file = Some(text_file("words.txt", "inu"));
    workflow.analyze().await.expect("analysis should succeed");

    workflow.back_to_input().expect("back should apply at selection");

    let state = workflow.state();
    assert_eq!(state.stage(), WorkflowStage::Input);
    assert!(state.selection().is_empty());
    assert_eq!(state.session().map(|handle| handle.as_str()), Some("s-7"));
}

#[tokio::test]
async fn run_lifecycle_tests_response_after_reset_is_discarded() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let backend = FakeBackend::new();
    let mut workflow = vocab_workflow(&backend, dir.path());

    let plan = workflow.begin_generation().expect("generation should start");
    workflow.start_new();

    let error = workflow
        .complete_generation(&plan.ticket, Ok(generation(VOCAB_CARDS, Some("s-late"))))
        .expect_err("late response should be stale");

    assert!(matches!(error, FlowError::StaleResponse));
    let state = workflow.state();
    assert_eq!(state.stage(), WorkflowStage::Input);
    assert!(state.session().is_none());
    assert!(state.review().is_none());
}

#[tokio::test]
async fn run_lifecycle_tests_second_action_while_busy_is_rejected() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let backend = FakeBackend::new();
    let mut workflow = reviewed_workflow(&backend, dir.path()).await;

    let plan = workflow.begin_packaging().expect("packaging should start");
    let error = workflow
        .begin_refresh()
        .expect_err("refresh while packaging should be rejected");
    assert!(matches!(error, FlowError::ActionInFlight(Action::Package)));

    workflow
        .complete_packaging(&plan.ticket, Ok(packaging(None)))
        .expect("packaging should apply");
    assert_eq!(workflow.state().stage(), WorkflowStage::Finished);
    assert_eq!(
        workflow.state().session().map(|handle| handle.as_str()),
        Some("s-1")
    );
}
