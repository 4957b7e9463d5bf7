//! Stage machine and the run-state aggregate it owns.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use deckflow_core::{
    Adoption, AssetId, DeckMetadata, GenerationMode, LogSink, ReviewView, SessionFileEntry,
    SessionHandle, SessionSlot, WorkflowStage,
};
use deckflow_ingest::{RunInputs, SourceFile};
use deckflow_selection::SelectionModel;
use deckflow_settings::{BackendConfig, Settings};
use deckflow_transport::BackendTransport;
use deckflow_ui::{Alert, AlertQueue, StageStatus};

use crate::{FlowError, ReviewDocument, app_version, redact_sensitive};

/// User action that issues backend requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Image extraction over the source files.
    Analyze,
    /// Card generation.
    Generate,
    /// Package build.
    Package,
    /// Session file listing.
    RefreshFiles,
    /// File download.
    Download,
}

impl Action {
    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Action::Analyze => "analysis",
            Action::Generate => "generation",
            Action::Package => "packaging",
            Action::RefreshFiles => "file listing",
            Action::Download => "download",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Proof that a request was issued by a given run.
///
/// A ticket from an abandoned run is rejected when its response is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunTicket {
    pub(crate) run_id: u64,
    pub(crate) action: Action,
}

impl RunTicket {
    /// Run that issued the request.
    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    /// Action the request belongs to.
    pub fn action(&self) -> Action {
        self.action
    }
}

/// Workflow tunables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowConfig {
    /// Directory downloads are written to.
    pub download_dir: PathBuf,
    /// Grace delay between a download and the session cleanup request.
    pub cleanup_delay: Duration,
    /// Card count requested by topic-driven generation.
    pub topic_card_count: u32,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("downloads"),
            cleanup_delay: Duration::from_secs(1),
            topic_card_count: 10,
        }
    }
}

/// Everything scoped to one run.
#[derive(Debug, Clone)]
pub struct RunState {
    pub(crate) run_id: u64,
    pub(crate) mode: GenerationMode,
    pub(crate) stage: WorkflowStage,
    pub(crate) review_view: ReviewView,
    pub(crate) inputs: RunInputs,
    pub(crate) metadata: DeckMetadata,
    pub(crate) settings: Settings,
    pub(crate) session: SessionSlot,
    pub(crate) selection: SelectionModel,
    pub(crate) review: Option<ReviewDocument>,
    pub(crate) files: Vec<SessionFileEntry>,
    pub(crate) in_flight: Option<Action>,
    pub(crate) resume_stage: WorkflowStage,
    pub(crate) activity: StageStatus,
    pub(crate) alerts: AlertQueue,
    pub(crate) cleanup_scheduled: HashSet<SessionHandle>,
}

impl RunState {
    fn new(run_id: u64, mode: GenerationMode, settings: Settings, metadata: DeckMetadata) -> Self {
        Self {
            run_id,
            mode,
            stage: WorkflowStage::Input,
            review_view: ReviewView::Source,
            inputs: RunInputs::default(),
            metadata,
            settings,
            session: SessionSlot::new(),
            selection: SelectionModel::new(),
            review: None,
            files: Vec::new(),
            in_flight: None,
            resume_stage: WorkflowStage::Input,
            activity: StageStatus::Idle,
            alerts: AlertQueue::new(),
            cleanup_scheduled: HashSet::new(),
        }
    }

    /// Current run id; changes whenever a new run begins.
    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    /// Active generation mode.
    pub fn mode(&self) -> GenerationMode {
        self.mode
    }

    /// Active stage.
    pub fn stage(&self) -> WorkflowStage {
        self.stage
    }

    /// Review sub-mode.
    pub fn review_view(&self) -> ReviewView {
        self.review_view
    }

    /// User inputs.
    pub fn inputs(&self) -> &RunInputs {
        &self.inputs
    }

    /// Deck metadata.
    pub fn metadata(&self) -> &DeckMetadata {
        &self.metadata
    }

    /// Generation settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Adopted session handle.
    pub fn session(&self) -> Option<&SessionHandle> {
        self.session.get()
    }

    /// Visual assets of the run.
    pub fn selection(&self) -> &SelectionModel {
        &self.selection
    }

    /// Editable generated content.
    pub fn review(&self) -> Option<&ReviewDocument> {
        self.review.as_ref()
    }

    /// Last fetched session file listing.
    pub fn files(&self) -> &[SessionFileEntry] {
        &self.files
    }

    /// Outstanding action, if any.
    pub fn in_flight(&self) -> Option<Action> {
        self.in_flight
    }

    /// Status of the latest action.
    pub fn activity(&self) -> StageStatus {
        self.activity
    }

    /// Alerts waiting for the shell.
    pub fn alerts(&self) -> &AlertQueue {
        &self.alerts
    }
}

/// Stage machine driving one run at a time against a backend.
pub struct Workflow {
    pub(crate) state: RunState,
    pub(crate) transport: Arc<dyn BackendTransport>,
    pub(crate) backend: BackendConfig,
    pub(crate) config: WorkflowConfig,
    pub(crate) log: LogSink,
    console_expanded: bool,
    next_run_id: u64,
}

impl fmt::Debug for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workflow")
            .field("run_id", &self.state.run_id)
            .field("mode", &self.state.mode)
            .field("stage", &self.state.stage)
            .field("in_flight", &self.state.in_flight)
            .finish()
    }
}

impl Workflow {
    /// Creates a workflow at `input` with an empty run.
    pub fn new(
        transport: Arc<dyn BackendTransport>,
        backend: BackendConfig,
        config: WorkflowConfig,
        log: LogSink,
    ) -> Self {
        log.info(format!("System initialized v{}", app_version()));
        Self {
            state: RunState::new(1, GenerationMode::default(), Settings::default(), DeckMetadata::default()),
            transport,
            backend,
            config,
            log,
            console_expanded: false,
            next_run_id: 2,
        }
    }

    /// Read-only view of the run.
    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Shared user-facing log.
    pub fn log(&self) -> &LogSink {
        &self.log
    }

    /// Workflow tunables.
    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Backend layout.
    pub fn backend(&self) -> &BackendConfig {
        &self.backend
    }

    /// Mutable user inputs.
    pub fn inputs_mut(&mut self) -> &mut RunInputs {
        &mut self.state.inputs
    }

    /// Mutable deck metadata.
    pub fn metadata_mut(&mut self) -> &mut DeckMetadata {
        &mut self.state.metadata
    }

    /// Mutable generation settings.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.state.settings
    }

    /// Removes and returns pending alerts.
    pub fn drain_alerts(&mut self) -> Vec<Alert> {
        self.state.alerts.drain()
    }

    /// Pins the console at full height regardless of activity.
    ///
    /// Survives run resets.
    pub fn set_console_expanded(&mut self, expanded: bool) {
        self.console_expanded = expanded;
    }

    /// Whether the console is pinned at full height.
    pub fn console_expanded(&self) -> bool {
        self.console_expanded
    }

    /// Clears the console. Only an explicit user action calls this.
    pub fn clear_log(&self) {
        self.log.clear();
    }

    /// Primary action at `input`: analysis in article mode, generation
    /// otherwise. Returns the stage reached.
    ///
    /// # Errors
    /// Returns the failure of the action that ran.
    pub async fn start(&mut self) -> Result<WorkflowStage, FlowError> {
        if self.state.mode.uses_extraction() {
            self.analyze().await?;
        } else {
            self.generate().await?;
        }
        Ok(self.state.stage)
    }

    /// Switches the generation mode, starting a new run.
    ///
    /// Selecting the active mode again is a no-op.
    ///
    /// # Errors
    /// Returns [`FlowError::InvalidStage`] outside the `input` stage.
    pub fn set_mode(&mut self, mode: GenerationMode) -> Result<(), FlowError> {
        if self.state.stage != WorkflowStage::Input {
            return Err(FlowError::InvalidStage {
                action: Action::Analyze,
                stage: self.state.stage,
            });
        }
        if mode == self.state.mode {
            return Ok(());
        }

        self.begin_new_run(mode, false);
        self.log.info(format!("Mode switched to {mode}"));
        Ok(())
    }

    /// Leaves selection for input, discarding extracted assets.
    ///
    /// The session handle is kept; re-analysis continues the same run.
    ///
    /// # Errors
    /// Returns [`FlowError::InvalidStage`] outside `selection`.
    pub fn back_to_input(&mut self) -> Result<(), FlowError> {
        self.require_stage(WorkflowStage::Selection, Action::Analyze)?;
        self.state.selection.clear();
        self.state.stage = WorkflowStage::Input;
        self.state.activity = StageStatus::Idle;
        self.log.info("Returned to input; extracted images discarded");
        Ok(())
    }

    /// Discards generated content and starts a new run, keeping inputs.
    ///
    /// # Errors
    /// Returns [`FlowError::InvalidStage`] outside `review`.
    pub fn discard_review(&mut self) -> Result<(), FlowError> {
        self.require_stage(WorkflowStage::Review, Action::Package)?;
        let mode = self.state.mode;
        self.begin_new_run(mode, true);
        self.log.info("Generated content discarded");
        Ok(())
    }

    /// Full reset to `input`, clearing inputs and the session handle.
    ///
    /// Any outstanding response becomes stale.
    pub fn start_new(&mut self) {
        let mode = self.state.mode;
        self.begin_new_run(mode, false);
        self.log.info("Started a new run");
    }

    /// Switches the review sub-mode; the text is untouched.
    ///
    /// # Errors
    /// Returns [`FlowError::InvalidStage`] outside `review`.
    pub fn set_review_view(&mut self, view: ReviewView) -> Result<(), FlowError> {
        self.require_stage(WorkflowStage::Review, Action::Package)?;
        self.state.review_view = view;
        Ok(())
    }

    /// Replaces the review text and re-validates it.
    ///
    /// Returns `true` when the new text parses.
    ///
    /// # Errors
    /// Returns [`FlowError::InvalidStage`] outside `review`.
    pub fn edit_content(&mut self, text: impl Into<String>) -> Result<bool, FlowError> {
        self.require_stage(WorkflowStage::Review, Action::Package)?;
        let document = self.state.review.get_or_insert_with(ReviewDocument::empty);
        Ok(document.edit(text))
    }

    /// Flips the selection flag of one asset.
    ///
    /// # Errors
    /// Returns [`FlowError::InvalidStage`] outside `selection` and
    /// [`FlowError::Selection`] for unknown ids.
    pub fn toggle_asset(&mut self, id: AssetId) -> Result<bool, FlowError> {
        self.require_stage(WorkflowStage::Selection, Action::Generate)?;
        Ok(self.state.selection.toggle(id)?)
    }

    /// Sets the selection flag of one asset.
    ///
    /// # Errors
    /// Returns [`FlowError::InvalidStage`] outside `selection` and
    /// [`FlowError::Selection`] for unknown ids.
    pub fn set_asset_selected(&mut self, id: AssetId, selected: bool) -> Result<(), FlowError> {
        self.require_stage(WorkflowStage::Selection, Action::Generate)?;
        Ok(self.state.selection.set_selected(id, selected)?)
    }

    /// Removes one asset for the rest of the run.
    ///
    /// # Errors
    /// Returns [`FlowError::InvalidStage`] outside `selection` and
    /// [`FlowError::Selection`] for unknown ids.
    pub fn delete_asset(&mut self, id: AssetId) -> Result<(), FlowError> {
        self.require_stage(WorkflowStage::Selection, Action::Generate)?;
        self.state.selection.delete(id)?;
        Ok(())
    }

    /// Adds a user-supplied image, selected.
    ///
    /// # Errors
    /// Returns [`FlowError::InvalidStage`] outside `selection`.
    pub fn add_user_asset(&mut self, file: &SourceFile) -> Result<AssetId, FlowError> {
        self.require_stage(WorkflowStage::Selection, Action::Generate)?;
        let id = self.state.selection.add_user_asset(file);
        self.log.info(format!("Added image {} as #{id}", file.name()));
        Ok(id)
    }

    pub(crate) fn require_stage(
        &self,
        expected: WorkflowStage,
        action: Action,
    ) -> Result<(), FlowError> {
        if self.state.stage != expected {
            return Err(FlowError::InvalidStage {
                action,
                stage: self.state.stage,
            });
        }
        Ok(())
    }

    pub(crate) fn require_idle(&self) -> Result<(), FlowError> {
        match self.state.in_flight {
            Some(action) => Err(FlowError::ActionInFlight(action)),
            None => Ok(()),
        }
    }

    pub(crate) fn issue_ticket(&mut self, action: Action) -> RunTicket {
        self.state.in_flight = Some(action);
        self.state.activity = StageStatus::Running;
        RunTicket {
            run_id: self.state.run_id,
            action,
        }
    }

    /// Accepts a response for `ticket`, clearing the in-flight marker.
    pub(crate) fn accept(&mut self, ticket: &RunTicket) -> Result<(), FlowError> {
        if ticket.run_id != self.state.run_id || self.state.in_flight != Some(ticket.action) {
            tracing::warn!(
                ticket_run = ticket.run_id,
                current_run = self.state.run_id,
                action = %ticket.action,
                "discarding stale response"
            );
            return Err(FlowError::StaleResponse);
        }
        self.state.in_flight = None;
        Ok(())
    }

    /// Offers a server-returned session handle to the run.
    pub(crate) fn adopt_session(&mut self, raw: Option<SessionHandle>) {
        let Some(candidate) = raw else {
            return;
        };
        match self.state.session.adopt(candidate) {
            Adoption::Assigned => {
                if let Some(session) = self.state.session.get() {
                    self.log.info(format!("Session ID: {session}"));
                }
            }
            Adoption::Unchanged => {}
            Adoption::Conflicting(other) => {
                self.log.warning(format!(
                    "Ignoring session {other}; run already uses {}",
                    self.state
                        .session
                        .get()
                        .map(SessionHandle::as_str)
                        .unwrap_or_default()
                ));
            }
        }
    }

    /// Logs a classified failure and raises an alert when it warrants one.
    pub(crate) fn report_failure(&mut self, context: &str, error: &FlowError) {
        self.state.activity = StageStatus::Degraded;

        match error {
            FlowError::Server(failure) | FlowError::Credential(failure) => {
                self.log.error(redact_sensitive(&format!(
                    "{context}: {}",
                    failure.message
                )));
                if let Some(details) = &failure.details {
                    self.log
                        .error(redact_sensitive(&format!("Details: {details}")));
                }
                if matches!(error, FlowError::Credential(_)) {
                    self.log.error(
                        "Credential error: the API key is missing or invalid. \
                         Please check your API Key in Settings.",
                    );
                }
            }
            FlowError::Transport(message) => {
                self.log.error(redact_sensitive(&format!(
                    "{context}: network error: {message}. Please check that the backend is running"
                )));
            }
            other => {
                self.log
                    .error(redact_sensitive(&format!("{context}: {other}")));
            }
        }

        if error.raises_alert() {
            let alert = match error {
                FlowError::Credential(failure) => Alert::credential(&redact_sensitive(
                    failure.details.as_deref().unwrap_or(&failure.message),
                )),
                other => Alert::validation(&other.to_string()),
            };
            self.state.alerts.push(alert);
        }
    }

    fn begin_new_run(&mut self, mode: GenerationMode, keep_inputs: bool) {
        let inputs = if keep_inputs {
            std::mem::take(&mut self.state.inputs)
        } else {
            RunInputs::default()
        };
        let settings = std::mem::take(&mut self.state.settings);
        let metadata = std::mem::take(&mut self.state.metadata);
        let alerts = std::mem::take(&mut self.state.alerts);

        let mut state = RunState::new(self.next_run_id, mode, settings, metadata);
        state.inputs = inputs;
        state.alerts = alerts;
        self.state = state;
        self.next_run_id += 1;
        tracing::info!(run = self.state.run_id, mode = %mode, "new run");
    }
}
