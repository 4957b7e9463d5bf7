//! Card generation for every mode.

use std::sync::Arc;

use deckflow_contract::{
    GenerationRequest, GenerationResponse, GenerationSettings, ImageReference, ModePayload,
    TextFilePayload,
};
use deckflow_core::{GenerationMode, ReviewView, WorkflowStage};
use deckflow_ingest::SourceFile;
use deckflow_transport::TransportError;
use deckflow_ui::StageStatus;

use crate::{Action, FlowError, ReviewDocument, RunTicket, Workflow};

/// Owned generation request plus the ticket it was issued under.
#[derive(Debug, Clone)]
pub struct GenerationPlan {
    /// Ticket the result must be applied with.
    pub ticket: RunTicket,
    /// Request body for the mode's endpoint.
    pub request: GenerationRequest,
}

impl Workflow {
    /// Builds the generation request and enters `processing`.
    ///
    /// Article mode starts from `selection` with at least one selected asset;
    /// every other mode starts from `input`.
    ///
    /// # Errors
    /// Returns [`FlowError::InvalidStage`] from the wrong stage,
    /// [`FlowError::ActionInFlight`] while busy,
    /// [`FlowError::NothingSelected`] with an empty selection and
    /// [`FlowError::Validation`] when inputs are incomplete.
    pub fn begin_generation(&mut self) -> Result<GenerationPlan, FlowError> {
        let mode = self.state.mode;
        let expected = if mode.uses_extraction() {
            WorkflowStage::Selection
        } else {
            WorkflowStage::Input
        };
        self.require_stage(expected, Action::Generate)?;
        self.require_idle()?;

        if mode.uses_extraction() && !self.state.selection.can_generate() {
            self.log.warning("Select at least one image before generating");
            return Err(FlowError::NothingSelected);
        }

        let credential = self.validated_credential(mode)?;
        let payload = self.mode_payload(mode);
        let request = GenerationRequest::new(
            &self.state.metadata,
            self.state.session.get().cloned(),
            GenerationSettings::from_settings(&self.state.settings, credential),
            payload,
        );

        self.state.resume_stage = self.state.stage;
        self.state.stage = WorkflowStage::Processing;
        let ticket = self.issue_ticket(Action::Generate);
        self.log
            .info(format!("Starting [{}] pipeline...", mode.as_str().to_uppercase()));
        tracing::info!(run = ticket.run_id, mode = %mode, "generation started");
        Ok(GenerationPlan { ticket, request })
    }

    /// Applies a generation result.
    ///
    /// Success stores the cards as review text and moves to `review`. A
    /// failure returns to the stage generation started from.
    ///
    /// Returns the number of generated cards.
    ///
    /// # Errors
    /// Returns [`FlowError::StaleResponse`] for an abandoned run, or the
    /// classified failure.
    pub fn complete_generation(
        &mut self,
        ticket: &RunTicket,
        result: Result<GenerationResponse, TransportError>,
    ) -> Result<usize, FlowError> {
        self.accept(ticket)?;

        let response = match result {
            Ok(response) => response,
            Err(error) => {
                self.state.stage = self.state.resume_stage;
                let error = FlowError::from_transport(error);
                self.report_failure("Generation failed", &error);
                return Err(error);
            }
        };

        let document = match ReviewDocument::from_cards(&response.cards) {
            Ok(document) => document,
            Err(error) => {
                self.state.stage = self.state.resume_stage;
                self.report_failure("Generation failed", &error);
                return Err(error);
            }
        };

        self.adopt_session(response.session_id);
        let count = response.cards.len();
        self.state.review = Some(document);
        self.state.review_view = ReviewView::Source;
        self.state.stage = WorkflowStage::Review;
        self.state.activity = StageStatus::Healthy;
        if let Some(message) = response.message.filter(|message| !message.trim().is_empty()) {
            self.log.info(message);
        }
        self.log
            .success(format!("Generation complete. Generated {count} cards."));
        Ok(count)
    }

    /// Generates cards, enters `review` and refreshes the file listing.
    ///
    /// # Errors
    /// See [`Workflow::begin_generation`] and
    /// [`Workflow::complete_generation`]. A failed listing refresh is only
    /// logged.
    pub async fn generate(&mut self) -> Result<usize, FlowError> {
        let plan = self.begin_generation()?;
        let transport = Arc::clone(&self.transport);
        let result = transport.generate(&plan.request).await;
        let count = self.complete_generation(&plan.ticket, result)?;
        self.refresh_if_session().await;
        Ok(count)
    }

    fn mode_payload(&self, mode: GenerationMode) -> ModePayload {
        let inputs = &self.state.inputs;
        match mode {
            GenerationMode::Article => ModePayload::Article {
                images: self
                    .state
                    .selection
                    .selected()
                    .into_iter()
                    .map(ImageReference::from)
                    .collect(),
                vocab_list: text_payload(inputs.vocab_file.as_ref()),
            },
            GenerationMode::VocabList => ModePayload::VocabList {
                vocab_list: text_payload(inputs.vocab_file.as_ref()),
            },
            GenerationMode::Grammar => ModePayload::Grammar {
                grammar_file: inputs
                    .grammar_file
                    .as_ref()
                    .map(SourceFile::decoded_text)
                    .unwrap_or_default(),
            },
            GenerationMode::TopicDriven => ModePayload::TopicDriven {
                topic: inputs.topic.trim().to_string(),
                count: self.config.topic_card_count,
            },
        }
    }
}

fn text_payload(file: Option<&SourceFile>) -> TextFilePayload {
    match file {
        Some(file) => {
            let attachment = file.to_attachment();
            TextFilePayload {
                content: attachment.content,
                filename: attachment.filename,
            }
        }
        None => TextFilePayload {
            content: String::new(),
            filename: String::new(),
        },
    }
}
