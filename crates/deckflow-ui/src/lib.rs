#![warn(missing_docs)]
//! # deckflow-ui
//!
//! ## Purpose
//! Defines the UI-facing state model for `deckflow`.
//!
//! ## Responsibilities
//! - Decide which controls are enabled for the current stage and activity.
//! - Choose the console height.
//! - Queue blocking alerts until the shell shows them.
//! - Provide stage headings.
//!
//! ## Data flow
//! Workflow run state -> app projection fills [`UiState`] -> shell renders
//! controls, headings and drains [`AlertQueue`].
//!
//! ## Ownership and lifetimes
//! `UiState` owns plain counters and flags copied out of the run, so a shell
//! can hold it while the workflow keeps mutating.
//!
//! ## Error model
//! This crate favors explicit state over recoverable errors. Invalid actions
//! are prevented by the `can_*` gates.
//!
//! ## Security and privacy notes
//! UI state excludes credentials and card content; alerts carry only
//! user-facing messages.

use std::collections::VecDeque;

use deckflow_core::{GenerationMode, ReviewView, WorkflowStage};

/// Console panel height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsoleHeight {
    /// Collapsed to the latest lines.
    #[default]
    Min,
    /// Half height; used while working or after a failure.
    Mid,
    /// Expanded on request.
    Max,
}

/// Status of the most recent user action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StageStatus {
    /// Nothing has run yet.
    #[default]
    Idle,
    /// A request is outstanding.
    Running,
    /// Last action completed.
    Healthy,
    /// Last action failed.
    Degraded,
}

/// Blocking message the user must acknowledge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    /// Short title.
    pub title: String,
    /// Body text.
    pub message: String,
}

impl Alert {
    /// Alert for a credential failure reported by the backend.
    pub fn credential(detail: &str) -> Self {
        Self {
            title: "API Key Error".to_string(),
            message: format!("{detail}\n\nPlease check your API Key in Settings."),
        }
    }

    /// Alert for missing or invalid input.
    pub fn validation(reason: &str) -> Self {
        Self {
            title: "Cannot start".to_string(),
            message: reason.to_string(),
        }
    }
}

/// First-in, first-out queue of pending alerts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertQueue {
    pending: VecDeque<Alert>,
}

impl AlertQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an alert.
    pub fn push(&mut self, alert: Alert) {
        self.pending.push_back(alert);
    }

    /// Removes and returns every pending alert in order.
    pub fn drain(&mut self) -> Vec<Alert> {
        self.pending.drain(..).collect()
    }

    /// Number of pending alerts.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Aggregate UI state snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiState {
    /// App version string sourced from root `VERSION`.
    pub version: String,
    /// Active mode.
    pub mode: GenerationMode,
    /// Active stage.
    pub stage: WorkflowStage,
    /// Review sub-mode.
    pub review_view: ReviewView,
    /// Status of the latest action.
    pub activity: StageStatus,
    /// Total assets in the selection.
    pub asset_count: usize,
    /// Selected assets.
    pub selected_count: usize,
    /// Inline parse error of the review content.
    pub content_error: Option<String>,
    /// Whether review content exists.
    pub has_content: bool,
    /// Whether the run holds a session handle.
    pub session_present: bool,
    /// Number of files in the session listing.
    pub file_count: usize,
    /// User asked for the full-height console.
    pub console_expanded: bool,
    /// Alerts waiting for the shell.
    pub pending_alerts: usize,
}

impl UiState {
    /// Creates the state of a fresh run.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            mode: GenerationMode::default(),
            stage: WorkflowStage::Input,
            review_view: ReviewView::Source,
            activity: StageStatus::Idle,
            asset_count: 0,
            selected_count: 0,
            content_error: None,
            has_content: false,
            session_present: false,
            file_count: 0,
            console_expanded: false,
            pending_alerts: 0,
        }
    }

    fn is_busy(&self) -> bool {
        self.activity == StageStatus::Running
    }

    /// Mode selector is usable only at `input` while idle.
    pub fn can_change_mode(&self) -> bool {
        self.stage == WorkflowStage::Input && !self.is_busy()
    }

    /// Analyze/start is usable at `input` while idle.
    pub fn can_analyze(&self) -> bool {
        self.stage == WorkflowStage::Input && !self.is_busy()
    }

    /// Generate-from-selection needs one selected asset.
    pub fn can_generate(&self) -> bool {
        self.stage == WorkflowStage::Selection && self.selected_count > 0 && !self.is_busy()
    }

    /// Back from selection to input.
    pub fn can_go_back(&self) -> bool {
        self.stage == WorkflowStage::Selection && !self.is_busy()
    }

    /// Packaging needs parseable content.
    pub fn can_package(&self) -> bool {
        self.stage == WorkflowStage::Review
            && self.has_content
            && self.content_error.is_none()
            && !self.is_busy()
    }

    /// Discard from review.
    pub fn can_discard(&self) -> bool {
        self.stage == WorkflowStage::Review && !self.is_busy()
    }

    /// Downloads need a session handle.
    pub fn can_download(&self) -> bool {
        self.session_present && !self.is_busy()
    }

    /// Start-new from the finished stage.
    pub fn can_start_new(&self) -> bool {
        self.stage == WorkflowStage::Finished && !self.is_busy()
    }

    /// Console height for the current activity.
    pub fn console_height(&self) -> ConsoleHeight {
        if self.console_expanded {
            return ConsoleHeight::Max;
        }
        match self.activity {
            StageStatus::Running | StageStatus::Degraded => ConsoleHeight::Mid,
            StageStatus::Idle | StageStatus::Healthy => ConsoleHeight::Min,
        }
    }

    /// Heading of the active stage.
    pub fn heading(&self) -> &'static str {
        stage_heading(self.stage)
    }

    /// Selection counter text.
    pub fn selection_summary(&self) -> String {
        format!("{} of {} selected", self.selected_count, self.asset_count)
    }
}

/// Heading shown above the active stage.
pub fn stage_heading(stage: WorkflowStage) -> &'static str {
    match stage {
        WorkflowStage::Input => "STEP 2: Configuration",
        WorkflowStage::Selection => "STEP 2.5: Select Context",
        WorkflowStage::Processing => "Processing...",
        WorkflowStage::Review => "STEP 3: Review & Edit",
        WorkflowStage::Finished => "STEP 4: Download",
    }
}
