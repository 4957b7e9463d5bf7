#![warn(missing_docs)]
//! # deckflow binary
//!
//! Command-line shell that drives one complete run: analysis or direct
//! generation, packaging, listing, download and session cleanup.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use deckflow_app::{
    DownloadReceipt, FlowError, Workflow, WorkflowConfig, project_view, redact_sensitive,
};
use deckflow_core::{AssetId, CoreError, GenerationMode, LogSink, NoteFlavor, WorkflowStage};
use deckflow_ingest::{IngestError, SourceFile};
use deckflow_settings::{
    AudioOptions, BASE_URL_ENV, BackendConfig, DEFAULT_BASE_URL, SettingsError, mask_credential,
};
use deckflow_transport::{HttpTransport, TransportError};
use thiserror::Error;
use time::OffsetDateTime;
use tracing_subscriber::EnvFilter;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "deckflow", version, about = "Turn study material into a flashcard deck")]
struct Cli {
    /// Generation mode: article, vocab-list, grammar or topic-driven.
    #[arg(long, default_value = "article")]
    mode: String,

    /// Article source files (PDF or images), in page order.
    #[arg(long = "source", value_name = "FILE")]
    sources: Vec<PathBuf>,

    /// Vocabulary list (.txt).
    #[arg(long, value_name = "FILE")]
    vocab: Option<PathBuf>,

    /// Grammar notes (.txt).
    #[arg(long, value_name = "FILE")]
    grammar: Option<PathBuf>,

    /// Topic for topic-driven generation.
    #[arg(long, default_value = "")]
    topic: String,

    /// Cards requested by topic-driven generation.
    #[arg(long, default_value_t = 10)]
    count: u32,

    /// Target deck name.
    #[arg(long, default_value = "Japanese_N4")]
    deck: String,

    /// Note-type name.
    #[arg(long, default_value = "Basic")]
    note: String,

    /// Preview flavor: basic or cloze.
    #[arg(long, default_value = "basic")]
    note_flavor: String,

    /// Free-text learning goal.
    #[arg(long, default_value = "")]
    goal: String,

    /// Deck tags.
    #[arg(long, default_value = "")]
    tags: String,

    /// Generation API key.
    #[arg(long, env = "DECKFLOW_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Backend base URL.
    #[arg(long, env = BASE_URL_ENV, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Origin relative image locators resolve against; defaults to the backend.
    #[arg(long)]
    page_origin: Option<String>,

    /// Generation model.
    #[arg(long, default_value = "gpt-4o-mini")]
    model: String,

    /// Target language.
    #[arg(long, default_value = "Chinese")]
    language: String,

    /// Source language.
    #[arg(long, default_value = "English")]
    source_language: String,

    /// Generate audio for cards.
    #[arg(long)]
    audio: bool,

    /// Voice used for audio.
    #[arg(long, default_value = "alloy")]
    voice: String,

    /// Directory downloads are written to.
    #[arg(long, default_value = "downloads")]
    output: PathBuf,

    /// Extracted image ids to leave out of generation.
    #[arg(long, value_delimiter = ',', value_name = "ID")]
    deselect: Vec<u32>,

    /// Extra images to add to the selection.
    #[arg(long = "add-image", value_name = "FILE")]
    add_images: Vec<PathBuf>,

    /// Replace the generated cards with the content of this file before
    /// packaging.
    #[arg(long, value_name = "FILE")]
    cards_file: Option<PathBuf>,

    /// Download each package file instead of the whole session archive.
    #[arg(long)]
    packages_only: bool,

    /// Delay before the session cleanup request, in milliseconds.
    #[arg(long, default_value_t = 1000)]
    cleanup_delay_ms: u64,

    /// Directory for a run log file.
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,
}

/// Binary-level failure.
#[derive(Debug, Error)]
enum CliError {
    #[error("{0}")]
    Core(#[from] CoreError),
    #[error("{0}")]
    Settings(#[from] SettingsError),
    #[error("{0}")]
    Ingest(#[from] IngestError),
    #[error("{0}")]
    Transport(#[from] TransportError),
    #[error("{0}")]
    Flow(#[from] FlowError),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Incomplete(String),
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let log_dir = cli.log_dir.clone();
    let log = LogSink::new();

    let outcome = run(cli, log.clone()).await;

    if let Some(dir) = log_dir {
        match write_run_log(&dir, &log) {
            Ok(path) => tracing::info!(path = %path.display(), "run log written"),
            Err(error) => eprintln!("unable to write run log: {error}"),
        }
    }

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("deckflow: {}", redact_sensitive(&error.to_string()));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, log: LogSink) -> Result<(), CliError> {
    let mode = GenerationMode::from_str(&cli.mode)?;
    let mut backend = BackendConfig::new(&cli.base_url)?;
    if let Some(origin) = &cli.page_origin {
        backend = backend.with_page_origin(origin)?;
    }
    let transport = Arc::new(HttpTransport::new(backend.clone())?);
    let config = WorkflowConfig {
        download_dir: cli.output.clone(),
        cleanup_delay: Duration::from_millis(cli.cleanup_delay_ms),
        topic_card_count: cli.count,
    };

    let mut workflow = Workflow::new(transport, backend, config, log);
    workflow.set_mode(mode)?;
    configure(&mut workflow, &cli)?;

    let started = workflow.start().await;
    report_alerts(&mut workflow);
    let stage = started?;
    announce(&workflow);

    if stage == WorkflowStage::Input {
        return Err(CliError::Incomplete(
            "no images were extracted from the source files".to_string(),
        ));
    }

    if stage == WorkflowStage::Selection {
        for raw in &cli.deselect {
            workflow.set_asset_selected(AssetId(*raw), false)?;
        }
        for path in &cli.add_images {
            let file = SourceFile::load(path)?;
            workflow.add_user_asset(&file)?;
        }
        println!("{}", project_view(&workflow).selection_summary());

        let generated = workflow.generate().await;
        report_alerts(&mut workflow);
        generated?;
        announce(&workflow);
    }

    if let Some(path) = &cli.cards_file {
        let text = tokio::fs::read_to_string(path).await?;
        if !workflow.edit_content(text)? {
            let reason = project_view(&workflow)
                .content_error
                .unwrap_or_else(|| "content does not parse".to_string());
            return Err(CliError::Incomplete(format!(
                "{} is not a valid card list: {reason}",
                path.display()
            )));
        }
    }

    let packaged = workflow.package().await;
    report_alerts(&mut workflow);
    packaged?;
    announce(&workflow);

    let receipts = download_all(&mut workflow, cli.packages_only).await?;
    for receipt in receipts {
        println!("{}", receipt.path.display());
        if let Some(cleanup) = receipt.cleanup {
            if let Err(error) = cleanup.await {
                tracing::warn!(error = %error, "cleanup task did not finish");
            }
        }
    }
    Ok(())
}

fn configure(workflow: &mut Workflow, cli: &Cli) -> Result<(), CliError> {
    let settings = workflow.settings_mut();
    settings.api_key = cli.api_key.clone().unwrap_or_default();
    settings.model = cli.model.clone();
    settings.target_language = cli.language.clone();
    settings.source_language = cli.source_language.clone();
    settings.audio = AudioOptions {
        enabled: cli.audio,
        voice: cli.voice.clone(),
    };
    tracing::info!(
        api_key = %mask_credential(&settings.api_key),
        model = %settings.model,
        language = %settings.target_language,
        "settings configured"
    );

    let metadata = workflow.metadata_mut();
    metadata.deck_name = cli.deck.clone();
    metadata.note_name = cli.note.clone();
    metadata.user_goal = cli.goal.clone();
    metadata.tags = cli.tags.clone();
    metadata.note_flavor = NoteFlavor::from_str(&cli.note_flavor)?;

    let inputs = workflow.inputs_mut();
    inputs.source_files = cli
        .sources
        .iter()
        .map(|path| SourceFile::load(path))
        .collect::<Result<Vec<_>, _>>()?;
    inputs.vocab_file = cli.vocab.as_deref().map(SourceFile::load).transpose()?;
    inputs.grammar_file = cli.grammar.as_deref().map(SourceFile::load).transpose()?;
    inputs.topic = cli.topic.clone();
    Ok(())
}

/// Prints alerts raised by the last step.
fn report_alerts(workflow: &mut Workflow) {
    for alert in workflow.drain_alerts() {
        eprintln!("[{}] {}", alert.title, alert.message);
    }
}

async fn download_all(
    workflow: &mut Workflow,
    packages_only: bool,
) -> Result<Vec<DownloadReceipt>, CliError> {
    if !packages_only {
        return Ok(vec![workflow.download(None, None).await?]);
    }

    let packages: Vec<(String, String)> = workflow
        .state()
        .files()
        .iter()
        .filter(|entry| entry.is_package)
        .map(|entry| (entry.path.clone(), entry.name.clone()))
        .collect();
    if packages.is_empty() {
        return Err(CliError::Incomplete(
            "the session holds no package files".to_string(),
        ));
    }

    let mut receipts = Vec::with_capacity(packages.len());
    for (path, name) in packages {
        receipts.push(workflow.download(Some(&path), Some(&name)).await?);
    }
    Ok(receipts)
}

fn announce(workflow: &Workflow) {
    let view = project_view(workflow);
    println!("== {} ==", view.heading());
}

fn write_run_log(dir: &Path, log: &LogSink) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}_log.txt", timestamp_compact_utc()));
    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    for entry in log.entries() {
        writeln!(file, "{entry}")?;
    }
    file.flush()?;
    Ok(path)
}

fn timestamp_compact_utc() -> String {
    let now = OffsetDateTime::now_utc();
    format!(
        "{:04}{:02}{:02}_{:02}{:02}{:02}",
        now.year(),
        now.month() as u8,
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    )
}
