//! Serial image extraction over the run's source files.

use std::sync::Arc;

use deckflow_contract::{ExtractionRequest, ExtractionResponse, ExtractionSettings};
use deckflow_core::{GenerationMode, LogSink, SessionHandle, WorkflowStage};
use deckflow_ingest::{SourceFile, validate_inputs};
use deckflow_settings::resolve_credential;
use deckflow_transport::{BackendTransport, TransportError};
use deckflow_ui::StageStatus;

use crate::{Action, FlowError, RunTicket, Workflow};

/// Owned inputs of one extraction pass.
#[derive(Debug, Clone)]
pub struct AnalysisPlan {
    /// Ticket the result must be applied with.
    pub ticket: RunTicket,
    /// Source files in upload order.
    pub files: Vec<SourceFile>,
    /// Credential, model and target language only.
    pub settings: ExtractionSettings,
    /// Session known before the first request.
    pub session: Option<SessionHandle>,
}

/// What a finished extraction pass produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionOutcome {
    /// Responses of the files that succeeded, in file order.
    pub responses: Vec<ExtractionResponse>,
    /// First failure; files after it were not submitted.
    pub failure: Option<TransportError>,
}

/// Submits each file in order, awaiting one before starting the next.
///
/// The session returned by an earlier file is attached to every later
/// request. The first failure stops the loop.
pub async fn run_extraction(
    transport: &dyn BackendTransport,
    plan: &AnalysisPlan,
    log: &LogSink,
) -> ExtractionOutcome {
    let mut session = plan.session.clone();
    let mut responses = Vec::with_capacity(plan.files.len());

    log.info(format!("Analyzing {} source files...", plan.files.len()));
    for file in &plan.files {
        log.info(format!("Processing {}...", file.name()));
        let request = ExtractionRequest {
            file_name: file.name().to_string(),
            mime_type: file.mime_type().to_string(),
            bytes: file.bytes().to_vec(),
            settings: plan.settings.clone(),
            session_id: session.clone(),
        };

        match transport.extract(&request).await {
            Ok(response) => {
                log.info(format!(
                    "Extracted {} images from {}",
                    response.images.len(),
                    file.name()
                ));
                if session.is_none() {
                    session = response.session_id.clone();
                }
                responses.push(response);
            }
            Err(error) => {
                tracing::warn!(file = file.name(), error = %error, "extraction aborted");
                return ExtractionOutcome {
                    responses,
                    failure: Some(error),
                };
            }
        }
    }

    ExtractionOutcome {
        responses,
        failure: None,
    }
}

impl Workflow {
    /// Validates inputs and prepares extraction for article mode.
    ///
    /// # Errors
    /// Returns [`FlowError::InvalidStage`] outside `input` or in a mode
    /// without extraction, [`FlowError::ActionInFlight`] while busy and
    /// [`FlowError::Validation`] when inputs are incomplete.
    pub fn begin_analysis(&mut self) -> Result<AnalysisPlan, FlowError> {
        self.require_stage(WorkflowStage::Input, Action::Analyze)?;
        if !self.state.mode.uses_extraction() {
            return Err(FlowError::InvalidStage {
                action: Action::Analyze,
                stage: self.state.stage,
            });
        }
        self.require_idle()?;

        let credential = self.validated_credential(GenerationMode::Article)?;
        let plan = AnalysisPlan {
            ticket: self.issue_ticket(Action::Analyze),
            files: self.state.inputs.source_files.clone(),
            settings: ExtractionSettings::from_settings(&self.state.settings, credential),
            session: self.state.session.get().cloned(),
        };
        tracing::info!(run = plan.ticket.run_id, files = plan.files.len(), "analysis started");
        Ok(plan)
    }

    /// Applies an extraction pass.
    ///
    /// Returns the number of assets now in the selection.
    ///
    /// # Errors
    /// Returns [`FlowError::StaleResponse`] for an abandoned run, or the
    /// classified failure that stopped the pass.
    pub fn complete_analysis(
        &mut self,
        ticket: &RunTicket,
        outcome: ExtractionOutcome,
    ) -> Result<usize, FlowError> {
        self.accept(ticket)?;

        for response in &outcome.responses {
            self.adopt_session(response.session_id.clone());
        }

        if let Some(error) = outcome.failure {
            let error = FlowError::from_transport(error);
            self.report_failure("Analysis failed", &error);
            return Err(error);
        }

        self.state.selection.clear();
        let mut total_files = 0;
        for response in outcome.responses {
            total_files += 1;
            for image in response.images {
                let selected = image.initially_selected();
                let source = self.backend.resolve_locator(&image.src);
                self.state
                    .selection
                    .push_extracted(source, image.path, selected);
            }
        }

        let total = self.state.selection.len();
        self.log.info(format!(
            "Total: {total} images extracted from {total_files} files."
        ));
        if total == 0 {
            self.state.activity = StageStatus::Degraded;
            self.log.warning("No images extracted from files");
            return Ok(0);
        }

        self.state.stage = WorkflowStage::Selection;
        self.state.activity = StageStatus::Healthy;
        self.log.success(format!(
            "Analysis complete. Select the images to generate from ({total} found)."
        ));
        Ok(total)
    }

    /// Extracts images from every source file and enters `selection`.
    ///
    /// # Errors
    /// See [`Workflow::begin_analysis`] and [`Workflow::complete_analysis`].
    pub async fn analyze(&mut self) -> Result<usize, FlowError> {
        let plan = self.begin_analysis()?;
        let transport = Arc::clone(&self.transport);
        let log = self.log.clone();
        let outcome = run_extraction(transport.as_ref(), &plan, &log).await;
        self.complete_analysis(&plan.ticket, outcome)
    }

    /// Runs validation for `mode` and resolves the credential.
    ///
    /// A failure is logged and raises an alert before it is returned.
    pub(crate) fn validated_credential(
        &mut self,
        mode: GenerationMode,
    ) -> Result<String, FlowError> {
        let checked = validate_inputs(mode, &self.state.inputs, &self.state.settings)
            .map_err(FlowError::from)
            .and_then(|()| {
                resolve_credential(&self.state.settings)
                    .map_err(|error| FlowError::Validation(error.into()))
            });

        if let Err(error) = &checked {
            self.report_failure("Cannot start", error);
        }
        checked
    }
}
