//! Error-body normalization and the credential-failure heuristic.

use std::fmt;

use serde_json::Value;

/// Lowercase fragments that mark a failure as a credential problem.
///
/// This list is the single place the heuristic is tuned.
pub const CREDENTIAL_VOCABULARY: &[&str] = &[
    "unauthorized",
    "forbidden",
    "api key",
    "api_key",
    "apikey",
    "invalid key",
    "incorrect key",
    "authentication",
    "401",
    "403",
];

const MAX_TEXT_DETAILS: usize = 200;

/// Coarse class of a server-reported failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Authentication or authorization failed; the user must fix settings.
    Credential,
    /// Any other server-reported failure.
    Server,
}

/// Classifies a failure by status code and message vocabulary.
///
/// Status `401`/`403` always classify as [`FailureClass::Credential`]; other
/// statuses do when the message or details contain a
/// [`CREDENTIAL_VOCABULARY`] fragment.
pub fn classify_failure(status: Option<u16>, message: &str, details: Option<&str>) -> FailureClass {
    if matches!(status, Some(401 | 403)) {
        return FailureClass::Credential;
    }

    let haystack = format!("{} {}", message, details.unwrap_or_default()).to_lowercase();
    if CREDENTIAL_VOCABULARY
        .iter()
        .any(|fragment| haystack.contains(fragment))
    {
        FailureClass::Credential
    } else {
        FailureClass::Server
    }
}

/// Normalized server-reported failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerFailure {
    /// HTTP status, when the failure came with one.
    pub status: Option<u16>,
    /// Primary message.
    pub message: String,
    /// Optional detail text.
    pub details: Option<String>,
}

impl ServerFailure {
    /// Creates a failure without status.
    pub fn new(message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
            details,
        }
    }

    /// Classifies this failure with [`classify_failure`].
    pub fn class(&self) -> FailureClass {
        classify_failure(self.status, &self.message, self.details.as_deref())
    }

    /// Reads `error`/`details` from a JSON object, whichever envelope holds them.
    pub(crate) fn from_json(status: Option<u16>, body: &Value, fallback: &str) -> Self {
        let (message, details) = match body.get("detail") {
            Some(Value::String(text)) => (Some(text.clone()), None),
            Some(detail @ Value::Object(_)) => (text_field(detail, "error"), text_field(detail, "details")),
            _ => (
                text_field(body, "error").or_else(|| text_field(body, "message")),
                text_field(body, "details"),
            ),
        };

        let message = message
            .or_else(|| details.clone())
            .unwrap_or_else(|| fallback.to_string());
        let details = details.filter(|details| *details != message);

        Self {
            status,
            message,
            details,
        }
    }
}

impl fmt::Display for ServerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.details {
            Some(details) => write!(f, "{} ({details})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Normalizes a non-success response body.
///
/// Accepts `{error, details}`, `{success:false, error, details}`,
/// `{detail:{error, details}}` and `{detail:"text"}`. A body that is not JSON
/// yields the message `"<status> <reason>"`.
pub fn parse_error_body(status: u16, reason: &str, raw: &str) -> ServerFailure {
    let status_line = format!("{status} {reason}").trim().to_string();

    match serde_json::from_str::<Value>(raw) {
        Ok(body @ Value::Object(_)) => ServerFailure::from_json(Some(status), &body, &status_line),
        _ => {
            let text = raw.trim();
            ServerFailure {
                status: Some(status),
                message: status_line,
                details: (!text.is_empty())
                    .then(|| text.chars().take(MAX_TEXT_DETAILS).collect()),
            }
        }
    }
}

fn text_field(body: &Value, name: &str) -> Option<String> {
    match body.get(name)? {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Null | Value::String(_) => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for error-body normalization.

    use super::*;

    #[test]
    fn reads_nested_detail_object() {
        let failure = parse_error_body(
            500,
            "Internal Server Error",
            r#"{"detail":{"error":"Generation failed","details":"rate limited"}}"#,
        );
        assert_eq!(failure.message, "Generation failed");
        assert_eq!(failure.details.as_deref(), Some("rate limited"));
        assert_eq!(failure.class(), FailureClass::Server);
    }

    #[test]
    fn reads_plain_detail_string() {
        let failure = parse_error_body(400, "Bad Request", r#"{"detail":"Topic is required"}"#);
        assert_eq!(failure.message, "Topic is required");
        assert_eq!(failure.details, None);
    }

    #[test]
    fn non_json_body_uses_status_line() {
        let failure = parse_error_body(502, "Bad Gateway", "<html>proxy</html>");
        assert_eq!(failure.message, "502 Bad Gateway");
        assert_eq!(failure.details.as_deref(), Some("<html>proxy</html>"));
    }

    #[test]
    fn status_codes_alone_classify_as_credential() {
        assert_eq!(classify_failure(Some(401), "x", None), FailureClass::Credential);
        assert_eq!(classify_failure(Some(403), "x", None), FailureClass::Credential);
        assert_eq!(classify_failure(Some(404), "Session not found", None), FailureClass::Server);
    }

    #[test]
    fn vocabulary_matches_case_insensitively() {
        assert_eq!(
            classify_failure(None, "Analysis failed", Some("Error code: 401 - Unauthorized")),
            FailureClass::Credential
        );
        assert_eq!(
            classify_failure(None, "Invalid API Key format", None),
            FailureClass::Credential
        );
        assert_eq!(classify_failure(None, "timeout", Some("upstream slow")), FailureClass::Server);
    }
}
