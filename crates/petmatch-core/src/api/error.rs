use std::collections::BTreeMap;
use std::fmt;

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Keys the backend uses for messages that are not tied to one form field.
/// Checked in this order before any field-level message.
const GENERAL_MESSAGE_KEYS: [&str; 3] = ["detail", "error", "non_field_errors"];

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = || general_message(body).unwrap_or_else(|| Self::truncate_body(body));
        match status.as_u16() {
            400 => ApiError::Validation(ValidationErrors::from_body(body)),
            401 => ApiError::Unauthorized(
                general_message(body).unwrap_or_else(|| "token may be expired".to_string()),
            ),
            403 => ApiError::AccessDenied(message()),
            404 => ApiError::NotFound(message()),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(Self::truncate_body(body)),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, Self::truncate_body(body))),
        }
    }

    /// True for 401-class failures (missing, invalid or expired credentials).
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    /// Message suitable for showing to the user, preferring the backend's own wording.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Validation(errors) => errors
                .first_message()
                .map(str::to_string)
                .unwrap_or_else(|| self.to_string()),
            ApiError::Unauthorized(detail)
            | ApiError::AccessDenied(detail)
            | ApiError::NotFound(detail) => detail.clone(),
            _ => self.to_string(),
        }
    }
}

/// Pull a `detail` or `error` string out of a JSON error body.
fn general_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["detail", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .map(str::to_string)
}

/// Field-level messages from a rejected form submission.
///
/// The backend answers 400 with either `{"field": ["msg", ...]}` maps,
/// `{"error": "msg"}`, or `{"detail": "msg"}`. All shapes land here keyed
/// by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single message for one field
    pub fn single(field: &str, message: &str) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: &str) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Messages reported for `field`, empty if none
    pub fn field(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// The message a form would show first: general messages win over field messages.
    pub fn first_message(&self) -> Option<&str> {
        GENERAL_MESSAGE_KEYS
            .iter()
            .filter_map(|key| self.fields.get(*key))
            .chain(self.fields.values())
            .find_map(|messages| messages.first())
            .map(String::as_str)
    }

    pub fn from_body(body: &str) -> Self {
        let mut errors = Self::new();
        match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(map)) => {
                for (field, value) in map {
                    match value {
                        Value::String(message) => errors.add(&field, &message),
                        Value::Array(items) => {
                            for item in items {
                                match item {
                                    Value::String(message) => errors.add(&field, &message),
                                    other => errors.add(&field, &other.to_string()),
                                }
                            }
                        }
                        other => errors.add(&field, &other.to_string()),
                    }
                }
            }
            Ok(Value::Array(items)) => {
                for item in items {
                    match item {
                        Value::String(message) => errors.add("non_field_errors", &message),
                        other => errors.add("non_field_errors", &other.to_string()),
                    }
                }
            }
            _ if body.trim().is_empty() => {}
            _ => errors.add("non_field_errors", &ApiError::truncate_body(body)),
        }
        errors
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fields.is_empty() {
            return write!(f, "request rejected");
        }
        let parts: Vec<String> = self
            .fields
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(", ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}
