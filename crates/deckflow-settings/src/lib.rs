#![warn(missing_docs)]
//! # deckflow-settings
//!
//! ## Purpose
//! Holds generation settings, credential handling rules and the backend
//! endpoint layout for `deckflow`.
//!
//! ## Responsibilities
//! - Model the user's generation settings with their defaults.
//! - Reject empty or masked credentials before they reach the network.
//! - Normalize the backend base URL and build every endpoint URL.
//!
//! ## Data flow
//! The shell loads [`Settings`] and [`BackendConfig`] -> coordinators call
//! [`resolve_credential`] while building request payloads -> transports ask
//! [`BackendConfig`] for endpoint URLs.
//!
//! ## Ownership and lifetimes
//! Settings and URLs are owned values; coordinators clone what they forward so
//! request payloads never borrow from mutable run state.
//!
//! ## Error model
//! Credential and endpoint problems surface as [`SettingsError`] and are
//! treated as validation failures by the workflow.
//!
//! ## Security and privacy notes
//! A masked credential is a display-only redaction and is never forwarded.
//! This crate never logs credential values.
//!
//! ## Example
//! ```rust
//! use deckflow_settings::{Settings, resolve_credential};
//!
//! let mut settings = Settings::default();
//! settings.api_key = "sk-12345678***".to_string();
//! assert!(resolve_credential(&settings).is_err());
//! ```

use deckflow_core::{GenerationMode, SessionHandle};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Marker contained in a masked credential placeholder.
pub const MASK_MARKER: &str = "***";

/// Number of leading credential characters kept visible by [`mask_credential`].
pub const MASK_VISIBLE_PREFIX: usize = 10;

/// Environment variable holding the backend base URL.
pub const BASE_URL_ENV: &str = "DECKFLOW_API_BASE_URL";

/// Base URL used when neither a flag nor [`BASE_URL_ENV`] supplies one.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

/// Text-to-speech options forwarded to generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioOptions {
    /// Whether audio clips are generated for each card.
    pub enabled: bool,
    /// Voice name used by the speech backend.
    pub voice: String,
}

impl Default for AudioOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            voice: "alloy".to_string(),
        }
    }
}

/// User generation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// API credential forwarded to the backend.
    pub api_key: String,
    /// Generation model name.
    pub model: String,
    /// Language meanings are written in.
    pub target_language: String,
    /// Language of the study material.
    pub source_language: String,
    /// Audio options.
    pub audio: AudioOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            target_language: "Chinese".to_string(),
            source_language: "English".to_string(),
            audio: AudioOptions::default(),
        }
    }
}

/// Returns `true` when `credential` is a masked display placeholder.
pub fn is_masked_credential(credential: &str) -> bool {
    credential.contains(MASK_MARKER)
}

/// Produces the display-only redaction of a credential.
pub fn mask_credential(credential: &str) -> String {
    if credential.is_empty() {
        return String::new();
    }
    let visible: String = credential.chars().take(MASK_VISIBLE_PREFIX).collect();
    format!("{visible}{MASK_MARKER}")
}

/// Returns the credential that may be forwarded to the backend.
///
/// # Errors
/// Returns [`SettingsError::EmptyCredential`] for blank credentials and
/// [`SettingsError::MaskedCredential`] for masked placeholders.
pub fn resolve_credential(settings: &Settings) -> Result<String, SettingsError> {
    let credential = settings.api_key.trim();
    if credential.is_empty() {
        return Err(SettingsError::EmptyCredential);
    }
    if is_masked_credential(credential) {
        return Err(SettingsError::MaskedCredential);
    }
    Ok(credential.to_string())
}

/// Backend endpoint layout rooted at one base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    base_url: Url,
    page_origin: Url,
}

impl BackendConfig {
    /// Creates a config from a base URL, normalizing a missing scheme.
    ///
    /// # Errors
    /// Returns [`SettingsError::InvalidEndpoint`] when the URL is blank,
    /// unparseable or not `http`/`https`.
    pub fn new(base_url: &str) -> Result<Self, SettingsError> {
        let base_url = normalize_base_url(base_url)?;
        Ok(Self {
            page_origin: base_url.clone(),
            base_url,
        })
    }

    /// Overrides the origin used to resolve relative asset locators.
    ///
    /// # Errors
    /// Returns [`SettingsError::InvalidEndpoint`] for an invalid origin.
    pub fn with_page_origin(mut self, origin: &str) -> Result<Self, SettingsError> {
        self.page_origin = normalize_base_url(origin)?;
        Ok(self)
    }

    /// Normalized base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `POST` extraction endpoint.
    pub fn extraction_url(&self) -> Url {
        self.endpoint(&["api", "analyze", "images"])
    }

    /// `POST` generation endpoint of `mode`.
    pub fn generation_url(&self, mode: GenerationMode) -> Url {
        self.endpoint(&["api", "generate", mode.endpoint_segment()])
    }

    /// `POST` packaging endpoint.
    pub fn packaging_url(&self) -> Url {
        self.endpoint(&["api", "generate", "package"])
    }

    /// `GET` file listing endpoint of a session.
    pub fn file_list_url(&self, session: &SessionHandle) -> Url {
        self.endpoint(&["api", "files", "list", session.as_str()])
    }

    /// `GET` download endpoint of a session, optionally of one relative path.
    pub fn download_url(&self, session: &SessionHandle, relative_path: Option<&str>) -> Url {
        let mut segments = vec!["api", "files", "download", session.as_str()];
        if let Some(path) = relative_path {
            segments.extend(path.split(['/', '\\']).filter(|segment| !segment.is_empty()));
        }
        self.endpoint(&segments)
    }

    /// `DELETE` cleanup endpoint of a session.
    pub fn cleanup_url(&self, session: &SessionHandle) -> Url {
        self.endpoint(&["api", "files", "cleanup", session.as_str()])
    }

    /// Resolves an asset locator returned by extraction.
    ///
    /// Absolute `http(s)` and `data:` locators are returned unchanged; anything
    /// else is joined onto the page origin.
    pub fn resolve_locator(&self, locator: &str) -> String {
        if locator.starts_with("http://")
            || locator.starts_with("https://")
            || locator.starts_with("data:")
        {
            return locator.to_string();
        }
        match self.page_origin.join(locator) {
            Ok(url) => url.to_string(),
            Err(_) => locator.to_string(),
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            path.extend(segments);
        }
        url
    }
}

/// Normalizes a backend base URL.
///
/// Scheme-less hosts get `http://` when they contain `.internal` and
/// `https://` otherwise. Trailing slashes are dropped.
///
/// # Errors
/// Returns [`SettingsError::InvalidEndpoint`] when the result is not a valid
/// `http`/`https` URL.
pub fn normalize_base_url(raw: &str) -> Result<Url, SettingsError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(SettingsError::InvalidEndpoint(
            "base url is empty".to_string(),
        ));
    }

    let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else if trimmed.contains(".internal") {
        format!("http://{trimmed}")
    } else {
        format!("https://{trimmed}")
    };

    let parsed = Url::parse(&with_scheme)
        .map_err(|error| SettingsError::InvalidEndpoint(format!("invalid base url: {error}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(SettingsError::InvalidEndpoint(
            "base url must use http or https".to_string(),
        ));
    }

    Ok(parsed)
}

/// Errors produced by settings and endpoint handling.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SettingsError {
    /// Credential is blank.
    #[error("Please set your API key in Settings")]
    EmptyCredential,
    /// Credential is a masked display placeholder.
    #[error("The stored API key is masked; enter the full key in Settings")]
    MaskedCredential,
    /// Backend URL is unusable.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
}
