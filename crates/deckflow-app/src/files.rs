//! Session file listing, downloads and delayed session cleanup.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use deckflow_contract::FileListing;
use deckflow_core::{LogSink, SessionHandle};
use deckflow_transport::{BackendTransport, DownloadedFile, TransportError};
use deckflow_ui::StageStatus;
use tokio::task::JoinHandle;

use crate::{Action, FlowError, RunTicket, Workflow, redact_sensitive};

/// Listing request bound to the session it was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshPlan {
    /// Ticket the result must be applied with.
    pub ticket: RunTicket,
    /// Session being listed.
    pub session: SessionHandle,
}

/// Download request bound to its run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadPlan {
    /// Ticket the result must be applied with.
    pub ticket: RunTicket,
    /// Session the file belongs to.
    pub session: SessionHandle,
    /// File inside the session; `None` downloads the whole session.
    pub relative_path: Option<String>,
    /// Name to save under, overriding the server's.
    pub display_name: Option<String>,
}

/// Where a download landed.
#[derive(Debug)]
pub struct DownloadReceipt {
    /// Written file.
    pub path: PathBuf,
    /// Bytes written.
    pub bytes_written: usize,
    /// Cleanup task, when this download scheduled one.
    pub cleanup: Option<JoinHandle<()>>,
}

impl Workflow {
    /// Prepares a listing of the run's session files.
    ///
    /// # Errors
    /// Returns [`FlowError::MissingSession`] without a session handle; the
    /// failure is logged once and no request is issued.
    pub fn begin_refresh(&mut self) -> Result<RefreshPlan, FlowError> {
        let session = self.require_session()?;
        self.require_idle()?;
        Ok(RefreshPlan {
            ticket: self.issue_ticket(Action::RefreshFiles),
            session,
        })
    }

    /// Replaces the listing wholesale with the backend's enumeration.
    ///
    /// Returns the number of listed files.
    ///
    /// # Errors
    /// Returns [`FlowError::StaleResponse`] when the run or session changed,
    /// or the classified failure.
    pub fn complete_refresh(
        &mut self,
        plan: &RefreshPlan,
        result: Result<FileListing, TransportError>,
    ) -> Result<usize, FlowError> {
        self.accept(&plan.ticket)?;
        if self.state.session.get() != Some(&plan.session) {
            tracing::warn!(session = %plan.session, "discarding listing of a replaced session");
            return Err(FlowError::StaleResponse);
        }

        match result {
            Ok(listing) => {
                self.state.files = listing.files;
                self.state.activity = StageStatus::Healthy;
                self.log
                    .info(format!("Found {} files in session", self.state.files.len()));
                Ok(self.state.files.len())
            }
            Err(error) => {
                let error = FlowError::from_transport(error);
                self.report_failure("Failed to list session files", &error);
                Err(error)
            }
        }
    }

    /// Lists the session's files.
    ///
    /// # Errors
    /// See [`Workflow::begin_refresh`] and [`Workflow::complete_refresh`].
    pub async fn refresh_files(&mut self) -> Result<usize, FlowError> {
        let plan = self.begin_refresh()?;
        let transport = Arc::clone(&self.transport);
        let result = transport.list_files(&plan.session).await;
        self.complete_refresh(&plan, result)
    }

    /// Refreshes the listing when the run holds a session.
    pub(crate) async fn refresh_if_session(&mut self) {
        if self.state.session.get().is_none() {
            return;
        }
        if let Err(error) = self.refresh_files().await {
            tracing::warn!(error = %error, "file listing refresh failed");
        }
    }

    /// Prepares a download of one session file or the whole session.
    ///
    /// # Errors
    /// Returns [`FlowError::MissingSession`] without a session handle; the
    /// failure is logged once and no request is issued.
    pub fn begin_download(
        &mut self,
        relative_path: Option<&str>,
        display_name: Option<&str>,
    ) -> Result<DownloadPlan, FlowError> {
        let session = self.require_session()?;
        self.require_idle()?;
        self.log.info("Preparing download...");
        Ok(DownloadPlan {
            ticket: self.issue_ticket(Action::Download),
            session,
            relative_path: relative_path.map(str::to_string),
            display_name: display_name.map(str::to_string),
        })
    }

    /// Writes a downloaded file and schedules the session cleanup.
    ///
    /// A failed download schedules no cleanup.
    ///
    /// # Errors
    /// Returns [`FlowError::StaleResponse`] for an abandoned run, the
    /// classified transport failure, or [`FlowError::Io`] when the file
    /// cannot be written.
    pub async fn complete_download(
        &mut self,
        plan: &DownloadPlan,
        result: Result<DownloadedFile, TransportError>,
    ) -> Result<DownloadReceipt, FlowError> {
        self.accept(&plan.ticket)?;

        let file = match result {
            Ok(file) => file,
            Err(error) => {
                let error = FlowError::from_transport(error);
                self.report_failure("Download failed", &error);
                return Err(error);
            }
        };

        let name = plan
            .display_name
            .as_deref()
            .and_then(sanitize_file_name)
            .or_else(|| file.suggested_name.as_deref().and_then(sanitize_file_name))
            .or_else(|| plan.relative_path.as_deref().and_then(sanitize_file_name))
            .unwrap_or_else(|| format!("{}.zip", plan.session));
        let path = self.config.download_dir.join(&name);

        let written = async {
            tokio::fs::create_dir_all(&self.config.download_dir).await?;
            tokio::fs::write(&path, &file.bytes).await
        }
        .await;
        if let Err(error) = written {
            let error = FlowError::Io(error);
            self.report_failure("Download failed", &error);
            return Err(error);
        }

        self.state.activity = StageStatus::Healthy;
        self.log.success(format!(
            "Saved {name} ({} bytes) to {}",
            file.bytes.len(),
            path.display()
        ));
        let cleanup = self.schedule_cleanup(&plan.session);
        Ok(DownloadReceipt {
            path,
            bytes_written: file.bytes.len(),
            cleanup,
        })
    }

    /// Downloads one session file, or the whole session when
    /// `relative_path` is `None`.
    ///
    /// # Errors
    /// See [`Workflow::begin_download`] and [`Workflow::complete_download`].
    pub async fn download(
        &mut self,
        relative_path: Option<&str>,
        display_name: Option<&str>,
    ) -> Result<DownloadReceipt, FlowError> {
        let plan = self.begin_download(relative_path, display_name)?;
        let transport = Arc::clone(&self.transport);
        let result = transport
            .download(&plan.session, plan.relative_path.as_deref())
            .await;
        self.complete_download(&plan, result).await
    }

    /// Spawns the delayed cleanup request once per session.
    fn schedule_cleanup(&mut self, session: &SessionHandle) -> Option<JoinHandle<()>> {
        if !self.state.cleanup_scheduled.insert(session.clone()) {
            tracing::debug!(session = %session, "cleanup already scheduled");
            return None;
        }

        let transport = Arc::clone(&self.transport);
        let log = self.log.clone();
        let delay = self.config.cleanup_delay;
        let session = session.clone();
        Some(tokio::spawn(async move {
            run_cleanup(transport, log, session, delay).await;
        }))
    }

    fn require_session(&mut self) -> Result<SessionHandle, FlowError> {
        match self.state.session.get() {
            Some(session) => Ok(session.clone()),
            None => {
                self.state.activity = StageStatus::Degraded;
                self.log.error(FlowError::MissingSession.to_string());
                Err(FlowError::MissingSession)
            }
        }
    }
}

async fn run_cleanup(
    transport: Arc<dyn BackendTransport>,
    log: LogSink,
    session: SessionHandle,
    delay: Duration,
) {
    tokio::time::sleep(delay).await;
    match transport.cleanup(&session).await {
        Ok(response) => {
            let message = response
                .message
                .unwrap_or_else(|| format!("Session {session} cleanup requested"));
            log.info(message);
        }
        Err(error) => {
            log.warning(redact_sensitive(&format!(
                "Cleanup of session {session} failed: {error}"
            )));
        }
    }
}

/// Reduces a server or user supplied name to a bare file name.
///
/// Returns `None` when nothing usable remains.
pub fn sanitize_file_name(raw: &str) -> Option<String> {
    let name = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim()
        .trim_matches('"');
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name.to_string())
}
