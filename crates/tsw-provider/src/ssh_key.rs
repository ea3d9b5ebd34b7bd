use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tsw_api::{CreateSshKeyRequest, SshKey};

use crate::diagnostics::Diagnostics;
use crate::schema::{Attribute, AttributeKind, Schema};
use crate::types::{decode, parse_id, tracked_id};
use crate::{Error, Operation, Resource, ResourceType, Response, Session};

/// Desired attributes of an SSH key. Both are fixed after creation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SshKeyConfig {
    pub ssh_key: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshKeyState {
    pub id: i64,
    pub project_id: i64,
    pub ssh_key: String,
    pub display_name: String,
}

impl From<&SshKey> for SshKeyState {
    fn from(key: &SshKey) -> Self {
        Self {
            id: key.id,
            project_id: key.project_id,
            ssh_key: key.key.clone(),
            display_name: key.display_name.clone(),
        }
    }
}

pub fn schema() -> Schema {
    Schema {
        description: "Creates and manages SSH keys for TeraSwitch servers.",
        attributes: vec![
            Attribute::computed("id", AttributeKind::Int64).describe("The ID of the SSH key"),
            Attribute::computed("project_id", AttributeKind::Int64)
                .describe("The ID of the project the SSH key belongs to"),
            Attribute::required("ssh_key", AttributeKind::String)
                .requires_replace()
                .describe("The OpenSSH format SSH public key"),
            Attribute::required("display_name", AttributeKind::String).requires_replace(),
        ],
    }
}

/// Manages public keys that can be installed on compute instances.
pub struct SshKeyResource {
    session: Arc<Session>,
}

impl SshKeyResource {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    fn unsupported(operation: Operation) -> Error {
        Error::Unsupported {
            resource: ResourceType::SshKey,
            operation,
        }
    }
}

#[async_trait]
impl Resource for SshKeyResource {
    fn resource_type(&self) -> ResourceType {
        ResourceType::SshKey
    }

    fn schema(&self) -> Schema {
        schema()
    }

    async fn create(&self, config: &serde_json::Value, _cancel: &CancellationToken) -> Response {
        let mut diags = Diagnostics::new();

        let config: SshKeyConfig = match decode(config, "ssh key configuration") {
            Ok(config) => config,
            Err(e) => {
                diags.push_error("Invalid Data", "Unable to read SSH key configuration", &e);
                return Response::failed(diags);
            }
        };

        let req = CreateSshKeyRequest {
            display_name: config.display_name,
            key: config.ssh_key,
        };
        match self.session.client().create_ssh_key(&req).await {
            Ok(key) => {
                info!(ssh_key_id = key.id, "created SSH key");
                Response::set(&SshKeyState::from(&key))
            }
            Err(e) => {
                diags.push_error("Client Error", "Unable to create SSH key", &Error::from(e));
                Response::failed(diags)
            }
        }
    }

    /// A key the backend no longer knows about is dropped from tracked
    /// state; it was most likely deleted outside the orchestrator.
    async fn read(&self, state: &serde_json::Value) -> Response {
        let mut diags = Diagnostics::new();

        let id = match tracked_id(state) {
            Ok(id) => id,
            Err(e) => {
                diags.push_error("Invalid Data", "Unable to read SSH key state", &e);
                return Response::failed(diags);
            }
        };

        match self.session.client().get_ssh_key(id).await {
            Ok(key) => Response::set(&SshKeyState::from(&key)),
            Err(e) if e.is_not_found() => {
                debug!(ssh_key_id = id, "SSH key no longer exists, removing from state");
                Response::remove()
            }
            Err(e) => {
                diags.push_error(
                    "Client Error",
                    &format!("Unable to get SSH key {id}"),
                    &Error::from(e),
                );
                Response::failed(diags)
            }
        }
    }

    async fn update(&self, config: &serde_json::Value, state: &serde_json::Value) -> Response {
        let mut diags = Diagnostics::new();
        diags.push_error(
            "Provider Error",
            "Unable to update SSH key",
            &Self::unsupported(Operation::Update),
        );

        let changed = self.schema().replacement_fields(state, config);
        if !changed.is_empty() {
            diags.add_warning(
                "Replacement Required",
                format!(
                    "SSH keys cannot be changed in place; changing {} requires replacing the key",
                    changed.join(", ")
                ),
            );
        }

        Response::failed(diags)
    }

    /// Only the backend's `success` flag is checked. The backend does not
    /// reliably purge deleted keys, so a key reported deleted may linger
    /// remotely while no longer being tracked.
    async fn delete(&self, state: &serde_json::Value) -> Response {
        let mut diags = Diagnostics::new();

        let id = match tracked_id(state) {
            Ok(id) => id,
            Err(e) => {
                diags.push_error("Invalid Data", "Unable to read SSH key state", &e);
                return Response::failed(diags);
            }
        };

        match self.session.client().delete_ssh_key(id).await {
            Ok(()) => {
                info!(ssh_key_id = id, "deleted SSH key");
                Response::remove()
            }
            Err(e) => {
                diags.push_error(
                    "Client Error",
                    &format!("Unable to delete SSH key {id}"),
                    &Error::from(e),
                );
                Response::failed(diags)
            }
        }
    }

    async fn import(&self, id: &str) -> Response {
        let mut diags = Diagnostics::new();

        let id = match parse_id(id) {
            Ok(id) => id,
            Err(e) => {
                diags.push_error("Invalid ID", "Unable to import SSH key", &e);
                return Response::failed(diags);
            }
        };

        match self.session.client().get_ssh_key(id).await {
            Ok(key) => Response::set(&SshKeyState::from(&key)),
            Err(e) => {
                diags.push_error(
                    "Client Error",
                    &format!("Unable to get SSH key {id}"),
                    &Error::from(e),
                );
                Response::failed(diags)
            }
        }
    }
}
