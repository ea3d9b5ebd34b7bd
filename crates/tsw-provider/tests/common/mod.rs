//! In-process stand-in for the TeraSwitch API.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tsw_provider::{ProviderConfig, ResourceRegistry, Session};

#[derive(Default)]
pub struct Mock {
    /// Instance queries answered with power state "off" before "On".
    /// `None` keeps instances off forever.
    pub power_on_after: Option<u32>,
    /// Answer instance queries with a 500.
    pub fail_instance_gets: bool,
    /// Answer SSH key creation with `200 {success: false, message}`.
    pub reject_key_create: Option<String>,

    pub requests: AtomicU32,
    pub instance_gets: AtomicU32,
    pub next_id: AtomicI64,
    pub instances: Mutex<HashMap<i64, Value>>,
    pub ssh_keys: Mutex<HashMap<i64, Value>>,
}

impl Mock {
    pub fn new() -> Self {
        Self {
            power_on_after: Some(0),
            next_id: AtomicI64::new(42),
            ..Self::default()
        }
    }

    pub fn seed_instance(&self, id: i64) {
        self.instances.lock().unwrap().insert(
            id,
            json!({
                "id": id,
                "objectType": "Instance",
                "projectId": 9,
                "displayName": "seeded",
                "regionId": "PIT1",
                "tierId": "c1",
                "imageId": "ubuntu-22.04",
                "ipAddresses": ["10.1.0.1"],
                "status": "Active",
            }),
        );
    }

    pub fn seed_ssh_key(&self, id: i64) {
        self.ssh_keys.lock().unwrap().insert(
            id,
            json!({
                "id": id,
                "projectId": 9,
                "displayName": "seeded",
                "key": "ssh-ed25519 SEEDED",
            }),
        );
    }

    pub fn has_ssh_key(&self, id: i64) -> bool {
        self.ssh_keys.lock().unwrap().contains_key(&id)
    }

    pub fn instance_gets(&self) -> u32 {
        self.instance_gets.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> u32 {
        self.requests.load(Ordering::SeqCst)
    }

    fn power_state(&self, gets: u32) -> &'static str {
        match self.power_on_after {
            Some(after) if gets > after => "On",
            _ => "off",
        }
    }
}

pub struct Backend {
    pub url: String,
    pub mock: Arc<Mock>,
}

impl Backend {
    pub async fn start(mock: Mock) -> Self {
        let mock = Arc::new(mock);
        let router = Router::new()
            .route("/v2/Instance", post(create_instance))
            .route("/v2/Instance/{id}", get(get_instance))
            .route("/v1/SSHKey", post(create_ssh_key))
            .route("/v1/SSHKey/{id}", get(get_ssh_key).delete(delete_ssh_key))
            .with_state(mock.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            url: format!("http://{addr}"),
            mock,
        }
    }

    pub fn session(&self) -> Arc<Session> {
        self.session_with(ProviderConfig::new("test-token"))
    }

    pub fn session_with(&self, config: ProviderConfig) -> Arc<Session> {
        let config = config
            .with_endpoint(self.url.clone())
            .with_poll_interval(Duration::from_millis(10));
        Arc::new(Session::new(config).unwrap())
    }

    pub fn registry(&self) -> ResourceRegistry {
        ResourceRegistry::new(self.session())
    }
}

async fn create_instance(State(mock): State<Arc<Mock>>, Json(body): Json<Value>) -> Response {
    mock.requests.fetch_add(1, Ordering::SeqCst);
    let id = mock.next_id.fetch_add(1, Ordering::SeqCst);
    let instance = json!({
        "id": id,
        "objectType": "Instance",
        "powerState": "off",
        "ipAddresses": [],
        "projectId": 9,
        "status": "Provisioning",
        "displayName": body["displayName"],
        "regionId": body["regionId"],
        "tierId": body["tierId"],
        "imageId": body["imageId"],
    });
    mock.instances.lock().unwrap().insert(id, instance.clone());
    Json(json!({"success": true, "result": instance, "message": ""})).into_response()
}

async fn get_instance(State(mock): State<Arc<Mock>>, Path(id): Path<i64>) -> Response {
    mock.requests.fetch_add(1, Ordering::SeqCst);
    let gets = mock.instance_gets.fetch_add(1, Ordering::SeqCst) + 1;

    if mock.fail_instance_gets {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"success": false, "message": "status backend unavailable"})),
        )
            .into_response();
    }

    let Some(mut instance) = mock.instances.lock().unwrap().get(&id).cloned() else {
        return (StatusCode::NOT_FOUND, Json(json!({"success": false, "message": "not found"})))
            .into_response();
    };

    let power_state = mock.power_state(gets);
    instance["powerState"] = json!(power_state);
    if power_state == "On" {
        instance["ipAddresses"] = json!(["203.0.113.10"]);
    }
    Json(json!({"result": instance})).into_response()
}

async fn create_ssh_key(State(mock): State<Arc<Mock>>, Json(body): Json<Value>) -> Response {
    mock.requests.fetch_add(1, Ordering::SeqCst);
    if let Some(message) = &mock.reject_key_create {
        return Json(json!({"success": false, "message": message})).into_response();
    }

    let id = mock.next_id.fetch_add(1, Ordering::SeqCst);
    let key = json!({
        "id": id,
        "projectId": 9,
        "displayName": body["displayName"],
        "key": body["key"],
    });
    mock.ssh_keys.lock().unwrap().insert(id, key.clone());
    Json(json!({"success": true, "result": key, "message": ""})).into_response()
}

async fn get_ssh_key(State(mock): State<Arc<Mock>>, Path(id): Path<i64>) -> Response {
    mock.requests.fetch_add(1, Ordering::SeqCst);
    if id == 500 {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    match mock.ssh_keys.lock().unwrap().get(&id).cloned() {
        Some(key) => Json(json!({"result": key})).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Acknowledges every delete without removing anything, as the real
/// backend is known to do.
async fn delete_ssh_key(State(mock): State<Arc<Mock>>, Path(_id): Path<i64>) -> Response {
    mock.requests.fetch_add(1, Ordering::SeqCst);
    Json(json!({"success": true, "message": ""})).into_response()
}
