//! Integration tests for loading run inputs from disk.

use std::io::Write;

use deckflow_core::GenerationMode;
use deckflow_ingest::{IngestError, RunInputs, SourceFile, ValidationFailure, validate_inputs};
use deckflow_settings::{Settings, SettingsError};

#[test]
fn input_loading_tests_reads_name_and_bytes() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let path = dir.path().join("n4_words.txt");
    let mut handle = std::fs::File::create(&path).expect("fixture file should be created");
    handle
        .write_all("taberu\nnomu\n".as_bytes())
        .expect("fixture should be written");

    let file = SourceFile::load(&path).expect("file should load");
    assert_eq!(file.name(), "n4_words.txt");
    assert_eq!(file.to_attachment().content, "taberu\nnomu\n");
}

#[test]
fn input_loading_tests_reports_missing_file() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let error = SourceFile::load(&dir.path().join("absent.pdf")).expect_err("load should fail");
    assert!(matches!(error, IngestError::Read { .. }));
}

#[test]
fn input_loading_tests_masked_credential_blocks_every_mode() {
    let settings = Settings {
        api_key: "sk-proj-ab***".to_string(),
        ..Settings::default()
    };
    let inputs = RunInputs {
        topic: "travel phrases".to_string(),
        ..RunInputs::default()
    };

    for mode in GenerationMode::ALL {
        assert_eq!(
            validate_inputs(mode, &inputs, &settings),
            Err(ValidationFailure::Credential(SettingsError::MaskedCredential))
        );
    }
}
