pub mod compute_instance;
pub mod config;
pub mod diagnostics;
pub mod readiness;
pub mod schema;
pub mod ssh_key;
pub mod types;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

pub use config::{ProviderConfig, Session};
pub use diagnostics::{Diagnostic, Diagnostics, ErrorKind, Severity};
pub use readiness::{PollConfig, PollOutcome};
pub use schema::Schema;
pub use types::{Operation, Response, StateChange};

pub const PROVIDER_NAME: &str = "teraswitch";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] tsw_api::Error),

    #[error("{operation} is not supported for {resource}")]
    Unsupported {
        resource: ResourceType,
        operation: Operation,
    },

    #[error("invalid id {0:?}: id should be numeric")]
    InvalidIdentity(String),

    #[error("invalid {what}: {source}")]
    InvalidData {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("timed out after {waited:?} waiting for {what}")]
    Timeout {
        what: String,
        waited: std::time::Duration,
    },

    #[error("missing configuration: {0}")]
    MissingConfig(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("unknown resource type: {0}")]
    UnknownResource(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Api(tsw_api::Error::NotFound { .. }) => ErrorKind::NotFound,
            Self::Api(tsw_api::Error::Transport(_)) => ErrorKind::Transport,
            Self::Api(tsw_api::Error::Remote { .. }) => ErrorKind::Remote,
            Self::Unsupported { .. } => ErrorKind::Unsupported,
            Self::InvalidIdentity(_) => ErrorKind::InvalidIdentity,
            Self::InvalidData { .. }
            | Self::MissingConfig(_)
            | Self::InvalidConfig(_)
            | Self::InvalidEndpoint { .. }
            | Self::UnknownResource(_) => ErrorKind::InvalidData,
            Self::Timeout { .. } => ErrorKind::Timeout,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api(e) if e.is_not_found())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Entity types this provider manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    #[serde(rename = "teraswitch_compute_instance")]
    ComputeInstance,
    #[serde(rename = "teraswitch_ssh_key")]
    SshKey,
}

impl ResourceType {
    pub const ALL: [Self; 2] = [Self::ComputeInstance, Self::SshKey];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ComputeInstance => "teraswitch_compute_instance",
            Self::SshKey => "teraswitch_ssh_key",
        }
    }

    /// Attribute layout of this type. Available without a session.
    pub fn schema(&self) -> Schema {
        match self {
            Self::ComputeInstance => compute_instance::schema(),
            Self::SshKey => ssh_key::schema(),
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "teraswitch_compute_instance" => Ok(Self::ComputeInstance),
            "teraswitch_ssh_key" => Ok(Self::SshKey),
            other => Err(Error::UnknownResource(other.to_string())),
        }
    }
}

/// Lifecycle contract every managed entity type implements.
///
/// Configuration and state cross this seam as JSON objects owned by the
/// orchestrator. Operations never fail the process: every failure ends up
/// as an error entry in [`Response::diagnostics`].
#[async_trait]
pub trait Resource: Send + Sync + 'static {
    fn resource_type(&self) -> ResourceType;

    fn schema(&self) -> Schema;

    /// Create the entity described by `config`. `cancel` aborts any wait
    /// after the remote call has been issued.
    async fn create(&self, config: &serde_json::Value, cancel: &CancellationToken) -> Response;

    /// Refresh `state` from the backend.
    async fn read(&self, state: &serde_json::Value) -> Response;

    async fn update(&self, config: &serde_json::Value, state: &serde_json::Value) -> Response;

    async fn delete(&self, state: &serde_json::Value) -> Response;

    /// Build full state from an externally supplied id alone.
    async fn import(&self, id: &str) -> Response;
}

/// Every resource type the provider serves, bound to one session.
#[derive(Clone)]
pub struct ResourceRegistry {
    resources: HashMap<ResourceType, Arc<dyn Resource>>,
}

impl ResourceRegistry {
    pub fn new(session: Arc<Session>) -> Self {
        let mut resources: HashMap<ResourceType, Arc<dyn Resource>> = HashMap::new();

        resources.insert(
            ResourceType::ComputeInstance,
            Arc::new(compute_instance::ComputeInstanceResource::new(session.clone())),
        );
        resources.insert(
            ResourceType::SshKey,
            Arc::new(ssh_key::SshKeyResource::new(session)),
        );

        tracing::debug!(count = resources.len(), "registered resource types");
        Self { resources }
    }

    pub fn get(&self, resource_type: ResourceType) -> Option<&Arc<dyn Resource>> {
        self.resources.get(&resource_type)
    }

    /// Look up a resource by its orchestrator-facing type name.
    pub fn lookup(&self, name: &str) -> Result<&Arc<dyn Resource>> {
        let resource_type = name.parse::<ResourceType>()?;
        self.get(resource_type)
            .ok_or_else(|| Error::UnknownResource(name.to_string()))
    }

    pub fn types(&self) -> Vec<ResourceType> {
        let mut types: Vec<_> = self.resources.keys().copied().collect();
        types.sort_by_key(|t| t.as_str());
        types
    }
}
