#![warn(missing_docs)]
//! # deckflow-transport
//!
//! ## Purpose
//! Carries workflow requests to the card backend over HTTP.
//!
//! ## Responsibilities
//! - Define the async [`BackendTransport`] seam the workflow is written against.
//! - Implement it with `reqwest` for the six backend endpoints.
//! - Turn connection failures, error statuses and bad bodies into
//!   [`TransportError`] values.
//!
//! ## Data flow
//! Workflow builds a request DTO -> [`BackendTransport`] method -> HTTP call ->
//! status check -> contract parser -> typed response or [`TransportError`].
//!
//! ## Ownership and lifetimes
//! Requests are borrowed for the duration of one call; responses and downloads
//! are owned values so callers can keep them after the connection closes.
//!
//! ## Error model
//! [`TransportError::Network`] means the request never completed.
//! [`TransportError::Server`] carries the backend's normalized failure.
//! [`TransportError::Malformed`] covers undecodable or incomplete bodies.
//! Nothing is retried.
//!
//! ## Security and privacy notes
//! Credentials travel only inside request bodies; URLs never carry them, so
//! error messages that echo a URL stay safe to log.

use async_trait::async_trait;
use deckflow_contract::{
    CleanupResponse, ContractError, ExtractionRequest, ExtractionResponse, FileListing,
    GenerationRequest, GenerationResponse, PackagingRequest, PackagingResponse, ServerFailure,
    parse_cleanup_response, parse_error_body, parse_extraction_response, parse_file_listing,
    parse_generation_response, parse_packaging_response,
};
use deckflow_core::SessionHandle;
use deckflow_settings::BackendConfig;
use percent_encoding::percent_decode_str;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use thiserror::Error;

/// File bytes returned by a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    /// File name from `Content-Disposition`, when the server sent one.
    pub suggested_name: Option<String>,
    /// Response content type.
    pub content_type: Option<String>,
    /// File content.
    pub bytes: Vec<u8>,
}

/// Async seam between the workflow and the card backend.
#[async_trait]
pub trait BackendTransport: Send + Sync {
    /// Submits one source file for image extraction.
    ///
    /// # Errors
    /// Returns [`TransportError`] when the call fails or the body is rejected.
    async fn extract(&self, request: &ExtractionRequest)
    -> Result<ExtractionResponse, TransportError>;

    /// Posts a generation request to its mode's endpoint.
    ///
    /// # Errors
    /// Returns [`TransportError`] when the call fails or the body is rejected.
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, TransportError>;

    /// Posts edited cards for packaging.
    ///
    /// # Errors
    /// Returns [`TransportError`] when the call fails or the body is rejected.
    async fn package(&self, request: &PackagingRequest)
    -> Result<PackagingResponse, TransportError>;

    /// Lists the files the backend holds for a session.
    ///
    /// # Errors
    /// Returns [`TransportError`] when the call fails or the body is rejected.
    async fn list_files(&self, session: &SessionHandle) -> Result<FileListing, TransportError>;

    /// Downloads the whole session archive or one relative path.
    ///
    /// # Errors
    /// Returns [`TransportError`] when the call fails.
    async fn download(
        &self,
        session: &SessionHandle,
        relative_path: Option<&str>,
    ) -> Result<DownloadedFile, TransportError>;

    /// Asks the backend to delete a session's files.
    ///
    /// # Errors
    /// Returns [`TransportError`] when the call fails or the body is rejected.
    async fn cleanup(&self, session: &SessionHandle) -> Result<CleanupResponse, TransportError>;
}

/// `reqwest` implementation of [`BackendTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    config: BackendConfig,
}

impl HttpTransport {
    /// Creates a transport for the given backend.
    ///
    /// No request timeout is configured; a hung backend is surfaced only when
    /// the connection fails.
    ///
    /// # Errors
    /// Returns [`TransportError::InvalidRequest`] when the HTTP client cannot
    /// be built.
    pub fn new(config: BackendConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("deckflow/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|error| TransportError::InvalidRequest(error.to_string()))?;
        Ok(Self { client, config })
    }

    /// Backend layout this transport talks to.
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, TransportError> {
        let response = request.send().await.map_err(network_error)?;
        read_text(response).await
    }
}

#[async_trait]
impl BackendTransport for HttpTransport {
    async fn extract(
        &self,
        request: &ExtractionRequest,
    ) -> Result<ExtractionResponse, TransportError> {
        let part = Part::bytes(request.bytes.clone())
            .file_name(request.file_name.clone())
            .mime_str(&request.mime_type)
            .map_err(|error| TransportError::InvalidRequest(error.to_string()))?;
        let mut form = Form::new()
            .part("file", part)
            .text("settings", request.settings_json()?);
        if let Some(session) = &request.session_id {
            form = form.text("sessionId", session.as_str().to_string());
        }

        let url = self.config.extraction_url();
        tracing::debug!(%url, file = %request.file_name, "posting extraction");
        let body = self.send(self.client.post(url).multipart(form)).await?;
        Ok(parse_extraction_response(&body)?)
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, TransportError> {
        let url = self.config.generation_url(request.mode());
        tracing::debug!(%url, mode = %request.mode(), "posting generation");
        let body = self.send(self.client.post(url).json(request)).await?;
        Ok(parse_generation_response(&body)?)
    }

    async fn package(
        &self,
        request: &PackagingRequest,
    ) -> Result<PackagingResponse, TransportError> {
        let url = self.config.packaging_url();
        tracing::debug!(%url, cards = request.cards.len(), "posting package");
        let body = self.send(self.client.post(url).json(request)).await?;
        Ok(parse_packaging_response(&body)?)
    }

    async fn list_files(&self, session: &SessionHandle) -> Result<FileListing, TransportError> {
        let body = self
            .send(self.client.get(self.config.file_list_url(session)))
            .await?;
        Ok(parse_file_listing(&body)?)
    }

    async fn download(
        &self,
        session: &SessionHandle,
        relative_path: Option<&str>,
    ) -> Result<DownloadedFile, TransportError> {
        let url = self.config.download_url(session, relative_path);
        tracing::debug!(%url, "downloading");
        let response = self.client.get(url).send().await.map_err(network_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(response).await);
        }

        let suggested_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(content_disposition_filename);
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(network_error)?.to_vec();

        Ok(DownloadedFile {
            suggested_name,
            content_type,
            bytes,
        })
    }

    async fn cleanup(&self, session: &SessionHandle) -> Result<CleanupResponse, TransportError> {
        let body = self
            .send(self.client.delete(self.config.cleanup_url(session)))
            .await?;
        Ok(parse_cleanup_response(&body)?)
    }
}

async fn read_text(response: reqwest::Response) -> Result<String, TransportError> {
    if !response.status().is_success() {
        return Err(status_error(response).await);
    }
    response.text().await.map_err(network_error)
}

async fn status_error(response: reqwest::Response) -> TransportError {
    let status = response.status();
    let raw = response.text().await.unwrap_or_default();
    TransportError::Server(parse_error_body(
        status.as_u16(),
        status.canonical_reason().unwrap_or_default(),
        &raw,
    ))
}

fn network_error(error: reqwest::Error) -> TransportError {
    let error = error.without_url();
    if error.is_connect() {
        TransportError::Network(format!("backend unreachable: {error}"))
    } else {
        TransportError::Network(error.to_string())
    }
}

/// Extracts the file name from a `Content-Disposition` header value.
///
/// `filename*` (RFC 5987, percent-encoded) wins over plain `filename`.
pub fn content_disposition_filename(header: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;

    for param in header.split(';').map(str::trim) {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                let encoded = value.trim().rsplit('\'').next().unwrap_or_default();
                extended = Some(
                    percent_decode_str(encoded)
                        .decode_utf8_lossy()
                        .into_owned(),
                );
            }
            "filename" => {
                plain = Some(value.trim().trim_matches('"').to_string());
            }
            _ => {}
        }
    }

    extended.or(plain).filter(|name| !name.trim().is_empty())
}

/// Transport failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Request did not complete.
    #[error("network error: {0}")]
    Network(String),
    /// Backend returned an error status or an explicit failure body.
    #[error("{0}")]
    Server(ServerFailure),
    /// Success response could not be decoded or lacks mandatory fields.
    #[error("malformed response: {0}")]
    Malformed(String),
    /// Request could not be built locally.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl From<ContractError> for TransportError {
    fn from(error: ContractError) -> Self {
        match error {
            ContractError::Decode(error) => TransportError::Malformed(error.to_string()),
            ContractError::Malformed(message) => TransportError::Malformed(message),
            ContractError::Rejected(failure) => TransportError::Server(failure),
        }
    }
}
