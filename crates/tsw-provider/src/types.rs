use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;
use crate::{Error, Result};

/// Lifecycle operations an orchestrator can issue against a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    Import,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Import => "import",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the orchestrator should do with its tracked state after an operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum StateChange {
    /// Keep whatever was tracked before.
    #[default]
    Unchanged,
    /// Replace tracked state with this value.
    Set(serde_json::Value),
    /// Stop tracking the entity.
    Remove,
}

/// Result of one lifecycle operation.
#[derive(Debug, Clone, Default)]
pub struct Response {
    pub state: StateChange,
    pub diagnostics: Diagnostics,
}

impl Response {
    pub fn set<T: Serialize>(state: &T) -> Self {
        let mut response = Self::default();
        response.set_state(state);
        response
    }

    pub fn remove() -> Self {
        Self {
            state: StateChange::Remove,
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn failed(diagnostics: Diagnostics) -> Self {
        Self {
            state: StateChange::Unchanged,
            diagnostics,
        }
    }

    /// Serialize `state` into the response. A serialization failure is
    /// recorded as a diagnostic and leaves the tracked state untouched.
    pub fn set_state<T: Serialize>(&mut self, state: &T) {
        match serde_json::to_value(state) {
            Ok(value) => self.state = StateChange::Set(value),
            Err(e) => self
                .diagnostics
                .add_error("Provider Error", format!("Unable to encode state: {e}")),
        }
    }

    pub fn has_error(&self) -> bool {
        self.diagnostics.has_error()
    }

    pub fn state_value(&self) -> Option<&serde_json::Value> {
        match &self.state {
            StateChange::Set(value) => Some(value),
            _ => None,
        }
    }
}

/// Decode orchestrator-supplied configuration or state.
pub(crate) fn decode<T: DeserializeOwned>(value: &serde_json::Value, what: &'static str) -> Result<T> {
    T::deserialize(value).map_err(|source| Error::InvalidData { what, source })
}

/// Identity of an entity already tracked by the orchestrator.
pub(crate) fn tracked_id(state: &serde_json::Value) -> Result<i64> {
    #[derive(Deserialize)]
    struct Tracked {
        id: i64,
    }

    decode::<Tracked>(state, "state").map(|t| t.id)
}

/// Parse an externally supplied identity, e.g. from an import request.
pub(crate) fn parse_id(raw: &str) -> Result<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| Error::InvalidIdentity(raw.to_string()))
}
