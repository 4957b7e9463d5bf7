#![warn(missing_docs)]
//! # deckflow-app
//!
//! ## Purpose
//! Orchestrates the `deckflow` card-generation workflow: one run moves from
//! input through optional image selection, generation and review to a
//! packaged, downloadable deck.
//!
//! ## Responsibilities
//! - Own the stage machine and the run-state aggregate.
//! - Validate inputs before any request is issued.
//! - Drive extraction, generation, packaging and file retrieval against a
//!   [`BackendTransport`](deckflow_transport::BackendTransport).
//! - Classify failures, record them in the log and raise alerts.
//! - Project run state into [`UiState`] for the shell.
//!
//! ## Data flow
//! User inputs + settings -> validation -> extraction (article mode) ->
//! selection -> generation -> editable review text -> packaging -> session
//! file listing -> download -> delayed session cleanup.
//!
//! ## Ownership and lifetimes
//! The [`Workflow`] owns the run state. Network calls take owned request
//! values built by `begin_*` methods and hand their results back through
//! `complete_*` methods with a [`RunTicket`], so no state is borrowed across
//! an await point and responses of an abandoned run are discarded.
//!
//! ## Error model
//! Every coordinator returns [`FlowError`]. Failures are also written to the
//! shared [`LogSink`](deckflow_core::LogSink) after redaction.
//!
//! ## Security and privacy notes
//! - Credentials are forwarded only inside request settings blocks.
//! - Log messages pass through [`redact_sensitive`].

mod analysis;
mod error;
mod files;
mod generation;
mod packaging;
mod review;
mod workflow;

pub use analysis::{AnalysisPlan, ExtractionOutcome, run_extraction};
pub use error::{FailureKind, FlowError};
pub use files::{DownloadPlan, DownloadReceipt, RefreshPlan, sanitize_file_name};
pub use generation::GenerationPlan;
pub use packaging::PackagingPlan;
pub use review::ReviewDocument;
pub use workflow::{Action, RunState, RunTicket, Workflow, WorkflowConfig};

use deckflow_ui::UiState;

/// Build-time application version loaded from root `VERSION` file.
pub const APP_VERSION: &str = env!("DECKFLOW_VERSION");

/// Returns the app version sourced from root `VERSION`.
pub fn app_version() -> &'static str {
    APP_VERSION
}

const SECRET_KEYS: [&str; 6] = [
    "password",
    "token",
    "authorization",
    "bearer",
    "api_key",
    "apikey",
];

/// Redacts common secret markers in log-safe output.
///
/// `sk-` style keys are masked in place. An assignment such as `token=...`
/// or `Authorization: ...` truncates the rest of the line.
pub fn redact_sensitive(input: &str) -> String {
    let mut redacted = redact_prefixed_keys(input);
    for key in SECRET_KEYS {
        redacted = redact_key_value(&redacted, key);
    }
    redacted
}

fn redact_prefixed_keys(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(position) = rest.find("sk-") {
        let at_boundary = rest[..position]
            .chars()
            .next_back()
            .is_none_or(|previous| !previous.is_ascii_alphanumeric());
        output.push_str(&rest[..position + 3]);
        rest = &rest[position + 3..];
        if !at_boundary {
            continue;
        }

        let secret_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
            .unwrap_or(rest.len());
        if secret_len > 0 {
            output.push_str("<redacted>");
            rest = &rest[secret_len..];
        }
    }

    output.push_str(rest);
    output
}

fn redact_key_value(input: &str, key: &str) -> String {
    let lower = input.to_ascii_lowercase();
    for (position, _) in lower.match_indices(key) {
        let after = &lower[position + key.len()..];
        let trimmed = after.trim_start();
        let assigns = trimmed.starts_with('=') || trimmed.starts_with(':');
        let bearer_value =
            key == "bearer" && after.len() > trimmed.len() && !trimmed.is_empty();
        if assigns || bearer_value {
            let prefix = &input[..position];
            return format!("{prefix}{key}=<redacted>");
        }
    }

    input.to_string()
}

/// Projects run state into a UI snapshot.
pub fn project_view(workflow: &Workflow) -> UiState {
    let state = workflow.state();
    let mut view = UiState::new(app_version());
    view.mode = state.mode();
    view.stage = state.stage();
    view.review_view = state.review_view();
    view.activity = state.activity();
    view.asset_count = state.selection().len();
    view.selected_count = state.selection().selected_count();
    view.has_content = state.review().is_some();
    view.content_error = state
        .review()
        .and_then(ReviewDocument::parse_error)
        .map(str::to_string);
    view.session_present = state.session().is_some();
    view.file_count = state.files().len();
    view.pending_alerts = state.alerts().len();
    view.console_expanded = workflow.console_expanded();
    view
}
