//! Typed Rust client for the TeraSwitch REST API.
//!
//! Covers the subset needed by the provider: instances (create, get)
//! and SSH keys (create, get, delete).
//!
//! The backend does not signal failure consistently. A 200 response may
//! still carry `success: false` or omit `result`, so transport status and
//! semantic success are checked separately.

mod types;

use std::fmt;

use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

pub use types::*;

pub const DEFAULT_BASE_URL: &str = "https://api.tsw.io";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("teraswitch api request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("teraswitch api {endpoint}: not found")]
    NotFound { endpoint: &'static str },

    #[error("teraswitch api {endpoint} returned {status}: {message}")]
    Remote {
        endpoint: &'static str,
        status: StatusCode,
        message: String,
    },
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

impl<T> ResultEnvelope<T> {
    /// A missing `result` on a 200 response is a failure.
    pub fn into_result(self, endpoint: &'static str) -> Result<T> {
        self.result.ok_or_else(|| Error::Remote {
            endpoint,
            status: StatusCode::OK,
            message: "response did not include a result".into(),
        })
    }
}

impl<T> StatusEnvelope<T> {
    /// Both `success` and `result` must be present for the call to count.
    pub fn into_result(self, endpoint: &'static str) -> Result<T> {
        match self.result {
            Some(result) if self.success => Ok(result),
            _ => Err(Error::Remote {
                endpoint,
                status: StatusCode::OK,
                message: non_empty_or(self.message, "request was not successful"),
            }),
        }
    }
}

impl Status {
    pub fn into_result(self, endpoint: &'static str) -> Result<()> {
        if self.success {
            return Ok(());
        }
        Err(Error::Remote {
            endpoint,
            status: StatusCode::OK,
            message: non_empty_or(self.message, "request was not successful"),
        })
    }
}

fn non_empty_or(message: String, fallback: &str) -> String {
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    }
}

/// Client for the TeraSwitch REST API.
#[derive(Clone)]
pub struct TswClient {
    base_url: String,
    token: String,
    http: reqwest::Client,
}

impl fmt::Debug for TswClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TswClient")
            .field("base_url", &self.base_url)
            .field("token", &"[redacted]")
            .finish()
    }
}

impl TswClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Replace the underlying HTTP client (timeouts, proxies, TLS roots).
    pub fn with_http(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn auth(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// Send one authenticated request and decode the 200 body as `T`.
    ///
    /// 404 maps to [`Error::NotFound`] whatever the body says. Any other
    /// non-200 status maps to [`Error::Remote`] carrying the body's
    /// `message` when it decodes, or the status text when it does not.
    /// Envelope checks are left to the caller.
    pub async fn execute<T, B>(
        &self,
        endpoint: &'static str,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        tracing::debug!(%method, path, endpoint, "teraswitch api request");

        let mut builder = self
            .http
            .request(method, self.url(path))
            .header("authorization", self.auth());
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound { endpoint });
        }
        let bytes = resp.bytes().await?;

        if status != StatusCode::OK {
            let message = match serde_json::from_slice::<Status>(&bytes) {
                Ok(body) => non_empty_or(body.message, &status.to_string()),
                Err(_) => status.to_string(),
            };
            return Err(Error::Remote {
                endpoint,
                status,
                message,
            });
        }

        serde_json::from_slice(&bytes).map_err(|e| Error::Remote {
            endpoint,
            status,
            message: format!("unable to decode response body: {e}"),
        })
    }

    // ── Instances ────────────────────────────────────────────────────

    pub async fn get_instance(&self, id: i64) -> Result<Instance> {
        self.execute::<ResultEnvelope<Instance>, ()>(
            "get instance",
            Method::GET,
            &format!("/v2/Instance/{id}"),
            None,
        )
        .await?
        .into_result("get instance")
    }

    pub async fn create_instance(&self, req: &CreateInstanceRequest) -> Result<Instance> {
        self.execute::<StatusEnvelope<Instance>, _>(
            "create instance",
            Method::POST,
            "/v2/Instance",
            Some(req),
        )
        .await?
        .into_result("create instance")
    }

    // ── SSH keys ─────────────────────────────────────────────────────

    pub async fn get_ssh_key(&self, id: i64) -> Result<SshKey> {
        self.execute::<ResultEnvelope<SshKey>, ()>(
            "get ssh key",
            Method::GET,
            &format!("/v1/SSHKey/{id}"),
            None,
        )
        .await?
        .into_result("get ssh key")
    }

    pub async fn create_ssh_key(&self, req: &CreateSshKeyRequest) -> Result<SshKey> {
        self.execute::<StatusEnvelope<SshKey>, _>(
            "create ssh key",
            Method::POST,
            "/v1/SSHKey",
            Some(req),
        )
        .await?
        .into_result("create ssh key")
    }

    /// The backend acknowledges deletes without guaranteeing removal, so
    /// only the returned `success` flag is checked.
    pub async fn delete_ssh_key(&self, id: i64) -> Result<()> {
        self.execute::<Status, ()>(
            "delete ssh key",
            Method::DELETE,
            &format!("/v1/SSHKey/{id}"),
            None,
        )
        .await?
        .into_result("delete ssh key")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_envelope_requires_success_flag() {
        let envelope: StatusEnvelope<SshKey> = serde_json::from_str(
            r#"{"success": false, "result": {"id": 7}, "message": "quota exceeded"}"#,
        )
        .unwrap();

        let err = envelope.into_result("create ssh key").unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
        assert!(matches!(err, Error::Remote { status, .. } if status == StatusCode::OK));
    }

    #[test]
    fn status_envelope_requires_result() {
        let envelope: StatusEnvelope<SshKey> =
            serde_json::from_str(r#"{"success": true, "message": ""}"#).unwrap();

        let err = envelope.into_result("create ssh key").unwrap_err();
        assert!(err.to_string().contains("request was not successful"));
    }

    #[test]
    fn result_envelope_without_result_is_remote_error() {
        let envelope: ResultEnvelope<Instance> = serde_json::from_str("{}").unwrap();
        let err = envelope.into_result("get instance").unwrap_err();
        assert!(matches!(err, Error::Remote { .. }));
    }

    #[test]
    fn instance_decodes_camel_case() {
        let instance: Instance = serde_json::from_str(
            r#"{
                "id": 42,
                "powerState": "On",
                "ipAddresses": ["10.0.0.1"],
                "projectId": 9,
                "regionId": "PIT1",
                "tierId": "c1",
                "imageId": "ubuntu-22.04",
                "displayName": "web",
                "tier": {"id": "c1", "memory": 4, "vcpus": 2, "transfer": 10}
            }"#,
        )
        .unwrap();

        assert_eq!(instance.id, 42);
        assert!(instance.is_powered_on());
        assert_eq!(instance.ip_addresses, vec!["10.0.0.1".to_string()]);
        assert_eq!(instance.tier.vcpus, 2);
        assert_eq!(instance.region_id, "PIT1");
    }

    #[test]
    fn create_instance_request_omits_empty_fields() {
        let req = CreateInstanceRequest {
            display_name: "web".into(),
            region_id: "PIT1".into(),
            tier_id: "c1".into(),
            image_id: "ubuntu".into(),
            ssh_key_ids: vec![],
            boot_size: None,
            tags: vec![],
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "displayName": "web",
                "regionId": "PIT1",
                "tierId": "c1",
                "imageId": "ubuntu",
            })
        );
    }

    #[test]
    fn debug_redacts_token() {
        let client = TswClient::new("https://api.tsw.io/", "secret-token");
        let debug = format!("{client:?}");
        assert!(!debug.contains("secret-token"));
        assert_eq!(client.base_url(), "https://api.tsw.io");
    }
}
