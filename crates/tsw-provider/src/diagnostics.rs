//! Structured failure and warning records returned from every operation.

use serde::Serialize;

use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Classification of an error diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Transport,
    Remote,
    Unsupported,
    InvalidIdentity,
    InvalidData,
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    pub summary: String,
    pub detail: String,
}

/// Ordered diagnostics accumulated during one operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, summary: impl Into<String>, detail: impl Into<String>) {
        self.0.push(Diagnostic {
            severity: Severity::Error,
            kind: None,
            summary: summary.into(),
            detail: detail.into(),
        });
    }

    pub fn add_warning(&mut self, summary: impl Into<String>, detail: impl Into<String>) {
        self.0.push(Diagnostic {
            severity: Severity::Warning,
            kind: None,
            summary: summary.into(),
            detail: detail.into(),
        });
    }

    /// Record `err` as an error, prefixed with what was being attempted,
    /// e.g. `"Unable to get SSH key"`.
    pub fn push_error(&mut self, summary: &str, context: &str, err: &Error) {
        self.0.push(Diagnostic {
            severity: Severity::Error,
            kind: Some(err.kind()),
            summary: summary.to_string(),
            detail: format!("{context}, got error: {err}"),
        });
    }

    pub fn has_error(&self) -> bool {
        self.0.iter().any(|d| d.severity == Severity::Error)
    }

    /// Kind of the first classified error, if any.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.errors().find_map(|d| d.kind)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
