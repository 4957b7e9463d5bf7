//! Shared fixtures for workflow integration tests.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use deckflow_app::{Workflow, WorkflowConfig};
use deckflow_contract::{
    CleanupResponse, ExtractedImage, ExtractionRequest, ExtractionResponse, FileListing,
    GenerationRequest, GenerationResponse, PackagingRequest, PackagingResponse, ServerFailure,
};
use deckflow_core::{CardCollection, GenerationMode, LogSink, SessionFileEntry, SessionHandle};
use deckflow_ingest::SourceFile;
use deckflow_settings::BackendConfig;
use deckflow_transport::{BackendTransport, DownloadedFile, TransportError};

/// One recorded backend call.
#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Extract {
        file_name: String,
        session: Option<String>,
    },
    Generate {
        mode: GenerationMode,
        session: Option<String>,
        body: String,
    },
    Package {
        session: Option<String>,
        cards: usize,
    },
    ListFiles(String),
    Download {
        session: String,
        path: Option<String>,
    },
    Cleanup(String),
}

type Queue<T> = Mutex<VecDeque<Result<T, TransportError>>>;

/// Scripted in-memory backend that records every call.
#[allow(dead_code)]
#[derive(Default)]
pub struct FakeBackend {
    extractions: Queue<ExtractionResponse>,
    generations: Queue<GenerationResponse>,
    packagings: Queue<PackagingResponse>,
    listings: Queue<FileListing>,
    downloads: Queue<DownloadedFile>,
    cleanups: Queue<CleanupResponse>,
    calls: Mutex<Vec<Call>>,
}

#[allow(dead_code)]
impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script_extraction(&self, result: Result<ExtractionResponse, TransportError>) {
        push(&self.extractions, result);
    }

    pub fn script_generation(&self, result: Result<GenerationResponse, TransportError>) {
        push(&self.generations, result);
    }

    pub fn script_packaging(&self, result: Result<PackagingResponse, TransportError>) {
        push(&self.packagings, result);
    }

    pub fn script_listing(&self, result: Result<FileListing, TransportError>) {
        push(&self.listings, result);
    }

    pub fn script_download(&self, result: Result<DownloadedFile, TransportError>) {
        push(&self.downloads, result);
    }

    pub fn script_cleanup(&self, result: Result<CleanupResponse, TransportError>) {
        push(&self.cleanups, result);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("call log should lock").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("call log should lock").len()
    }

    fn record(&self, call: Call) {
        self.calls.lock().expect("call log should lock").push(call);
    }
}

fn push<T>(queue: &Queue<T>, result: Result<T, TransportError>) {
    queue
        .lock()
        .expect("script queue should lock")
        .push_back(result);
}

fn pop<T>(queue: &Queue<T>) -> Result<T, TransportError> {
    queue
        .lock()
        .expect("script queue should lock")
        .pop_front()
        .unwrap_or_else(|| Err(TransportError::Network("no scripted response".to_string())))
}

fn session_text(session: Option<&SessionHandle>) -> Option<String> {
    session.map(|handle| handle.as_str().to_string())
}

#[async_trait]
impl BackendTransport for FakeBackend {
    async fn extract(
        &self,
        request: &ExtractionRequest,
    ) -> Result<ExtractionResponse, TransportError> {
        self.record(Call::Extract {
            file_name: request.file_name.clone(),
            session: session_text(request.session_id.as_ref()),
        });
        pop(&self.extractions)
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, TransportError> {
        self.record(Call::Generate {
            mode: request.mode(),
            session: session_text(request.session_id.as_ref()),
            body: serde_json::to_string(request).expect("request should serialize"),
        });
        pop(&self.generations)
    }

    async fn package(
        &self,
        request: &PackagingRequest,
    ) -> Result<PackagingResponse, TransportError> {
        self.record(Call::Package {
            session: session_text(request.session_id.as_ref()),
            cards: request.cards.len(),
        });
        pop(&self.packagings)
    }

    async fn list_files(&self, session: &SessionHandle) -> Result<FileListing, TransportError> {
        self.record(Call::ListFiles(session.as_str().to_string()));
        pop(&self.listings)
    }

    async fn download(
        &self,
        session: &SessionHandle,
        relative_path: Option<&str>,
    ) -> Result<DownloadedFile, TransportError> {
        self.record(Call::Download {
            session: session.as_str().to_string(),
            path: relative_path.map(str::to_string),
        });
        pop(&self.downloads)
    }

    async fn cleanup(&self, session: &SessionHandle) -> Result<CleanupResponse, TransportError> {
        self.record(Call::Cleanup(session.as_str().to_string()));
        pop(&self.cleanups)
    }
}

/// Workflow over `backend` with a valid credential and a short cleanup delay.
#[allow(dead_code)]
pub fn workflow(backend: &Arc<FakeBackend>, download_dir: &Path) -> Workflow {
    let config = WorkflowConfig {
        download_dir: download_dir.to_path_buf(),
        cleanup_delay: Duration::from_millis(10),
        topic_card_count: 10,
    };
    let backend_config =
        BackendConfig::new("http://127.0.0.1:5000").expect("backend config should build");
    let mut workflow = Workflow::new(backend.clone(), backend_config, config, LogSink::new());
    workflow.settings_mut().api_key = "sk-test-credential".to_string();
    workflow
}

#[allow(dead_code)]
pub fn session(raw: &str) -> SessionHandle {
    SessionHandle::new(raw).expect("session fixture should be valid")
}

#[allow(dead_code)]
pub fn text_file(name: &str, content: &str) -> SourceFile {
    SourceFile::new(name, content.as_bytes().to_vec()).expect("file fixture should be valid")
}

#[allow(dead_code)]
pub fn page_file(name: &str) -> SourceFile {
    SourceFile::new(name, vec![0x25, 0x50, 0x44, 0x46]).expect("file fixture should be valid")
}

/// Extraction response with `count` relative image locators.
#[allow(dead_code)]
pub fn extraction(count: usize, session_id: Option<&str>) -> ExtractionResponse {
    ExtractionResponse {
        images: (0..count)
            .map(|index| ExtractedImage {
                src: format!("/static/page_{index}.png"),
                path: Some(format!("images/page_{index}.png")),
                selected: None,
            })
            .collect(),
        session_id: session_id.map(session),
    }
}

#[allow(dead_code)]
pub fn cards(raw: &str) -> CardCollection {
    CardCollection::parse(raw).expect("card fixture should parse")
}

#[allow(dead_code)]
pub fn generation(raw_cards: &str, session_id: Option<&str>) -> GenerationResponse {
    GenerationResponse {
        cards: cards(raw_cards),
        message: None,
        session_id: session_id.map(session),
    }
}

#[allow(dead_code)]
pub fn packaging(session_id: Option<&str>) -> PackagingResponse {
    PackagingResponse {
        message: Some("Deck created".to_string()),
        file_path: Some("Japanese_N4.apkg".to_string()),
        session_id: session_id.map(session),
    }
}

#[allow(dead_code)]
pub fn listing(names: &[&str]) -> FileListing {
    FileListing {
        files: names
            .iter()
            .map(|name| SessionFileEntry {
                name: (*name).to_string(),
                path: (*name).to_string(),
                size: 128,
                is_package: name.ends_with(".apkg"),
                original_name: None,
                extension: None,
            })
            .collect(),
    }
}

#[allow(dead_code)]
pub fn downloaded(suggested_name: Option<&str>, bytes: &[u8]) -> DownloadedFile {
    DownloadedFile {
        suggested_name: suggested_name.map(str::to_string),
        content_type: Some("application/octet-stream".to_string()),
        bytes: bytes.to_vec(),
    }
}

/// Backend failure with an HTTP status.
#[allow(dead_code)]
pub fn server_failure(status: u16, message: &str, details: Option<&str>) -> TransportError {
    let mut failure = ServerFailure::new(message, details.map(str::to_string));
    failure.status = Some(status);
    TransportError::Server(failure)
}

pub const VOCAB_CARDS: &str = r#"[
  {"word": "inu", "meaning": "dog", "example_1": "inu ga iru", "example_1_translation": "there is a dog"},
  {"word": "neko", "meaning": "cat"}
]"#;

/// Workflow in vocab-list mode with a vocabulary file loaded.
#[allow(dead_code)]
pub fn vocab_workflow(backend: &Arc<FakeBackend>, download_dir: &Path) -> Workflow {
    let mut workflow = workflow(backend, download_dir);
    workflow
        .set_mode(GenerationMode::VocabList)
        .expect("mode should switch at input");
    workflow.inputs_mut().vocab_file = Some(text_file("words.txt", "inu\nneko"));
    workflow
}

/// Drives a vocab-list run to `review` with session `s-1`.
#[allow(dead_code)]
pub async fn reviewed_workflow(backend: &Arc<FakeBackend>, download_dir: &Path) -> Workflow {
    let mut workflow = vocab_workflow(backend, download_dir);
    backend.script_generation(Ok(generation(VOCAB_CARDS, Some("s-1"))));
    backend.script_listing(Ok(listing(&["words.txt"])));
    workflow.generate().await.expect("generation should succeed");
    workflow
}
