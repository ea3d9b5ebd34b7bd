use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, trace};
use tsw_api::{CreateInstanceRequest, Instance};

use crate::diagnostics::Diagnostics;
use crate::readiness::{self, PollOutcome};
use crate::schema::{Attribute, AttributeKind, Schema};
use crate::types::{decode, parse_id, tracked_id};
use crate::{Error, Operation, Resource, ResourceType, Response, Session};

/// Desired attributes of a compute instance.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ComputeInstanceConfig {
    pub display_name: String,
    pub region: String,
    pub tier_id: String,
    pub image_id: String,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    pub ssh_key_ids: Vec<i64>,
    /// Boot volume size in GB.
    pub boot_size: i64,
}

impl ComputeInstanceConfig {
    fn to_request(&self) -> CreateInstanceRequest {
        CreateInstanceRequest {
            display_name: self.display_name.clone(),
            region_id: self.region.clone(),
            tier_id: self.tier_id.clone(),
            image_id: self.image_id.clone(),
            ssh_key_ids: self.ssh_key_ids.clone(),
            boot_size: Some(self.boot_size),
            tags: self.tags.clone().unwrap_or_default(),
        }
    }
}

/// Tracked attributes of a compute instance.
///
/// `tags`, `ssh_key_ids` and `boot_size` are not reported back by the
/// instance endpoint, so they carry whatever was configured (and stay
/// empty for imported instances).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputeInstanceState {
    pub id: i64,
    pub project_id: i64,
    pub display_name: String,
    pub region: String,
    pub tier_id: String,
    pub image_id: String,
    pub tags: Option<Vec<String>>,
    pub ip_addresses: Vec<String>,
    pub ssh_key_ids: Vec<i64>,
    pub boot_size: Option<i64>,
}

impl ComputeInstanceState {
    fn from_config(config: ComputeInstanceConfig) -> Self {
        Self {
            display_name: config.display_name,
            region: config.region,
            tier_id: config.tier_id,
            image_id: config.image_id,
            tags: config.tags,
            ssh_key_ids: config.ssh_key_ids,
            boot_size: Some(config.boot_size),
            ..Self::default()
        }
    }

    fn from_remote(instance: &Instance) -> Self {
        let mut state = Self::default();
        state.apply_remote(instance);
        state
    }

    fn apply_remote(&mut self, instance: &Instance) {
        self.id = instance.id;
        self.project_id = instance.project_id;
        self.display_name = instance.display_name.clone();
        self.region = instance.region_id.clone();
        self.tier_id = instance.tier_id.clone();
        self.image_id = instance.image_id.clone();
        self.ip_addresses = instance.ip_addresses.clone();
    }
}

pub fn schema() -> Schema {
    Schema {
        description: "Creates and manages TeraSwitch Cloud Compute servers.",
        attributes: vec![
            Attribute::computed("id", AttributeKind::Int64).describe("The ID of the server"),
            Attribute::computed("project_id", AttributeKind::Int64)
                .describe("The ID of the project the server belongs to"),
            Attribute::required("display_name", AttributeKind::String)
                .describe("The display name of the server"),
            Attribute::required("region", AttributeKind::String)
                .describe("The region the server is located in"),
            Attribute::required("tier_id", AttributeKind::String),
            Attribute::required("image_id", AttributeKind::String),
            Attribute::optional("tags", AttributeKind::StringList),
            Attribute::computed("ip_addresses", AttributeKind::StringList)
                .describe("The IP addresses assigned to the server"),
            Attribute::required("ssh_key_ids", AttributeKind::Int64List),
            Attribute::required("boot_size", AttributeKind::Int64)
                .describe("The size of the boot volume in GB"),
        ],
    }
}

/// Manages TeraSwitch cloud compute servers.
pub struct ComputeInstanceResource {
    session: Arc<Session>,
}

impl ComputeInstanceResource {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    fn unsupported(operation: Operation) -> Response {
        let mut diags = Diagnostics::new();
        diags.push_error(
            "Provider Error",
            &format!("Unable to {operation} compute instance"),
            &Error::Unsupported {
                resource: ResourceType::ComputeInstance,
                operation,
            },
        );
        Response::failed(diags)
    }

    /// Wait for a new instance to report power on, then fold the latest
    /// remote view into `state`.
    async fn await_power_on(
        &self,
        mut state: ComputeInstanceState,
        cancel: &CancellationToken,
    ) -> Response {
        let id = state.id;
        let client = self.session.client();
        let poll = self.session.poll();
        let mut diags = Diagnostics::new();

        trace!(instance_id = id, "sent instance creation request, polling");

        let outcome = readiness::wait_until(
            poll,
            cancel,
            move || client.get_instance(id),
            Instance::is_powered_on,
        )
        .await;

        match outcome {
            Ok(PollOutcome::Ready(instance)) => {
                trace!(instance_id = id, "instance is reporting power state on");
                state.apply_remote(&instance);
                info!(instance_id = id, "created instance");
                Response::set(&state)
            }
            Ok(PollOutcome::Cancelled) => {
                diags.add_warning(
                    "Operation Cancelled",
                    format!(
                        "Instance {id} was created but the wait for it to power on was cancelled; \
                         its final state is unknown"
                    ),
                );
                Response::failed(diags)
            }
            Ok(PollOutcome::TimedOut) => {
                let err = Error::Timeout {
                    what: format!("instance {id} to power on"),
                    waited: poll.timeout.unwrap_or_default(),
                };
                diags.push_error(
                    "Client Error",
                    &format!("Instance {id} was created but did not become ready"),
                    &err,
                );
                Response::failed(diags)
            }
            Err(e) => {
                diags.push_error(
                    "Client Error",
                    &format!("Unable to get instance {id} while waiting for it to power on (it may still exist)"),
                    &Error::from(e),
                );
                Response::failed(diags)
            }
        }
    }
}

#[async_trait]
impl Resource for ComputeInstanceResource {
    fn resource_type(&self) -> ResourceType {
        ResourceType::ComputeInstance
    }

    fn schema(&self) -> Schema {
        schema()
    }

    /// Nothing is tracked unless the instance both gets created and
    /// reaches power on.
    async fn create(&self, config: &serde_json::Value, cancel: &CancellationToken) -> Response {
        let mut diags = Diagnostics::new();

        let config: ComputeInstanceConfig = match decode(config, "compute instance configuration") {
            Ok(config) => config,
            Err(e) => {
                diags.push_error("Invalid Data", "Unable to read compute instance configuration", &e);
                return Response::failed(diags);
            }
        };

        let req = config.to_request();
        let instance = match self.session.client().create_instance(&req).await {
            Ok(instance) => instance,
            Err(e) => {
                diags.push_error("Client Error", "Unable to create instance", &Error::from(e));
                return Response::failed(diags);
            }
        };

        let mut state = ComputeInstanceState::from_config(config);
        state.apply_remote(&instance);

        self.await_power_on(state, cancel).await
    }

    /// Unlike SSH keys, a missing instance is reported as an error rather
    /// than dropped from state.
    async fn read(&self, state: &serde_json::Value) -> Response {
        let mut diags = Diagnostics::new();

        let mut tracked: ComputeInstanceState = match tracked_id(state)
            .and_then(|_| decode(state, "compute instance state"))
        {
            Ok(tracked) => tracked,
            Err(e) => {
                diags.push_error("Invalid Data", "Unable to read compute instance state", &e);
                return Response::failed(diags);
            }
        };

        match self.session.client().get_instance(tracked.id).await {
            Ok(instance) => {
                tracked.apply_remote(&instance);
                Response::set(&tracked)
            }
            Err(e) => {
                diags.push_error(
                    "Client Error",
                    &format!("Unable to get instance {}", tracked.id),
                    &Error::from(e),
                );
                Response::failed(diags)
            }
        }
    }

    async fn update(&self, _config: &serde_json::Value, _state: &serde_json::Value) -> Response {
        Self::unsupported(Operation::Update)
    }

    async fn delete(&self, _state: &serde_json::Value) -> Response {
        Self::unsupported(Operation::Delete)
    }

    async fn import(&self, id: &str) -> Response {
        let mut diags = Diagnostics::new();

        let id = match parse_id(id) {
            Ok(id) => id,
            Err(e) => {
                diags.push_error("Invalid ID", "Unable to import compute instance", &e);
                return Response::failed(diags);
            }
        };

        match self.session.client().get_instance(id).await {
            Ok(instance) => Response::set(&ComputeInstanceState::from_remote(&instance)),
            Err(e) => {
                diags.push_error(
                    "Client Error",
                    &format!("Unable to get compute instance {id}"),
                    &Error::from(e),
                );
                Response::failed(diags)
            }
        }
    }
}
