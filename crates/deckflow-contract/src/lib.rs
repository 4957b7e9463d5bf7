#![warn(missing_docs)]
//! # deckflow-contract
//!
//! ## Purpose
//! Defines the card backend's wire contract and the client-side rules for
//! reading its responses.
//!
//! ## Responsibilities
//! - Serialize extraction, generation and packaging request bodies.
//! - Parse success responses and enforce their mandatory fields.
//! - Normalize the backend's several error envelopes to one shape.
//! - Decide whether a failure is a credential problem.
//!
//! ## Data flow
//! Coordinators build request DTOs -> transport sends them -> raw response
//! text -> `parse_*_response` or [`parse_error_body`] -> [`classify_failure`].
//!
//! ## Ownership and lifetimes
//! Parsed values are owned structs so they outlive the transient response
//! buffer and can be moved into run state.
//!
//! ## Error model
//! Undecodable JSON, missing mandatory fields and explicit `success: false`
//! bodies return [`ContractError`].
//!
//! ## Security and privacy notes
//! Request DTOs carry the credential; their `Debug` output redacts it.
//!
//! ## Example
//! ```rust
//! use deckflow_contract::{FailureClass, classify_failure};
//!
//! assert_eq!(
//!     classify_failure(Some(500), "Generation failed", Some("Incorrect API key provided")),
//!     FailureClass::Credential
//! );
//! ```

mod failure;
mod request;
mod response;

pub use failure::{
    CREDENTIAL_VOCABULARY, FailureClass, ServerFailure, classify_failure, parse_error_body,
};
pub use request::{
    AudioSettings, ExtractionRequest, ExtractionSettings, GenerationRequest, GenerationSettings,
    ImageReference, ModePayload, PackagingRequest, TextFilePayload,
};
pub use response::{
    CleanupResponse, ExtractedImage, ExtractionResponse, FileListing, GenerationResponse,
    PackagingResponse, parse_cleanup_response, parse_extraction_response, parse_file_listing,
    parse_generation_response, parse_packaging_response,
};

use thiserror::Error;

/// Wire contract errors.
#[derive(Debug, Error)]
pub enum ContractError {
    /// JSON encode or decode failure.
    #[error("contract decode failure: {0}")]
    Decode(#[from] serde_json::Error),
    /// Success response missing a mandatory field.
    #[error("malformed response: {0}")]
    Malformed(String),
    /// Backend answered with an explicit failure body.
    #[error("{0}")]
    Rejected(ServerFailure),
}
