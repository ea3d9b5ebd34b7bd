use serde::{Deserialize, Serialize};

pub const POWER_STATE_ON: &str = "On";
pub const POWER_STATE_OFF: &str = "off";

// ── Envelopes ────────────────────────────────────────────────────────

/// Bare `{success, message}` body. Returned by DELETE and by most error
/// responses.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Status {
    pub success: bool,
    pub message: String,
}

/// `{result}` envelope used by the read endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct ResultEnvelope<T> {
    pub result: Option<T>,
}

/// `{success, result, message}` envelope used by the create endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusEnvelope<T> {
    #[serde(default)]
    pub success: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub message: String,
}

// ── Instance types ───────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Instance {
    pub id: i64,
    pub object_type: String,
    pub power_state: String,
    pub ip_addresses: Vec<String>,
    pub tier: InstanceTier,
    pub project_id: i64,
    pub service_type: String,
    pub status: String,
    pub region_id: String,
    pub tier_id: String,
    pub image_id: String,
    pub display_name: String,
    pub region: Region,
    pub sku: String,
}

impl Instance {
    pub fn is_powered_on(&self) -> bool {
        self.power_state == POWER_STATE_ON
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceTier {
    pub id: String,
    pub memory: i64,
    pub vcpus: i64,
    pub transfer: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Region {
    pub id: String,
    pub name: String,
    pub country: String,
    pub city: String,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInstanceRequest {
    pub display_name: String,
    pub region_id: String,
    pub tier_id: String,
    pub image_id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ssh_key_ids: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boot_size: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

// ── SSH key types ────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SshKey {
    pub id: i64,
    pub project_id: i64,
    pub display_name: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSshKeyRequest {
    pub display_name: String,
    pub key: String,
}
