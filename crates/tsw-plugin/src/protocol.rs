//! Newline-delimited JSON exchange with the orchestrator.
//!
//! Each input line is one [`Request`]; each gets exactly one reply line.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tsw_provider::schema::provider_schema;
use tsw_provider::{
    Diagnostics, Operation, ProviderConfig, ResourceRegistry, ResourceType, Response, Session,
    StateChange,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Op {
    Schema,
    Configure,
    Create,
    Read,
    Update,
    Delete,
    Import,
}

#[derive(Debug, Deserialize)]
pub struct Request {
    pub op: Op,
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub config: Value,
    #[serde(default)]
    pub state: Value,
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct Reply {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
    pub removed: bool,
    pub diagnostics: Diagnostics,
}

impl From<Response> for Reply {
    fn from(response: Response) -> Self {
        let (state, removed) = match response.state {
            StateChange::Set(value) => (Some(value), false),
            StateChange::Remove => (None, true),
            StateChange::Unchanged => (None, false),
        };
        Self {
            state,
            removed,
            diagnostics: response.diagnostics,
        }
    }
}

fn failure(summary: &str, detail: String) -> Value {
    let mut diagnostics = Diagnostics::new();
    diagnostics.add_error(summary, detail);
    reply_value(Reply {
        diagnostics,
        ..Reply::default()
    })
}

fn reply_value(reply: Reply) -> Value {
    serde_json::to_value(reply).unwrap_or_else(|e| {
        json!({
            "removed": false,
            "diagnostics": [{
                "severity": "error",
                "summary": "Provider Error",
                "detail": format!("Unable to encode reply: {e}"),
            }],
        })
    })
}

fn schemas() -> Value {
    let resources: serde_json::Map<String, Value> = ResourceType::ALL
        .into_iter()
        .map(|t| (t.to_string(), json!(t.schema())))
        .collect();
    json!({
        "provider": provider_schema(),
        "resources": resources,
    })
}

/// Provider state held across requests.
///
/// Resource operations need a session. It comes either from the
/// orchestrator's `configure` request or, failing that, from the process
/// environment at startup.
#[derive(Default)]
pub struct Plugin {
    registry: Option<ResourceRegistry>,
    configured: bool,
}

impl Plugin {
    /// Start with a session built from the environment. A `configure`
    /// request still replaces it.
    pub fn with_registry(registry: ResourceRegistry) -> Self {
        Self {
            registry: Some(registry),
            configured: false,
        }
    }

    fn configure(&mut self, block: &Value) -> Value {
        if self.configured {
            return failure("Invalid Request", "provider is already configured".into());
        }

        let session = ProviderConfig::from_value(block)
            .and_then(ProviderConfig::with_env_polling)
            .and_then(Session::new);
        match session {
            Ok(session) => {
                let registry = ResourceRegistry::new(Arc::new(session));
                tracing::info!(resources = ?registry.types(), "provider configured by orchestrator");
                self.registry = Some(registry);
                self.configured = true;
                reply_value(Reply::default())
            }
            Err(e) => {
                let mut diagnostics = Diagnostics::new();
                diagnostics.push_error("Provider Error", "Unable to configure provider", &e);
                reply_value(Reply {
                    diagnostics,
                    ..Reply::default()
                })
            }
        }
    }

    /// Dispatch one request to the resource it names.
    pub async fn handle(&mut self, request: Request, cancel: &CancellationToken) -> Value {
        let operation = match request.op {
            Op::Schema => return schemas(),
            Op::Configure => return self.configure(&request.config),
            Op::Create => Operation::Create,
            Op::Read => Operation::Read,
            Op::Update => Operation::Update,
            Op::Delete => Operation::Delete,
            Op::Import => Operation::Import,
        };

        let Some(registry) = &self.registry else {
            return failure(
                "Invalid Request",
                format!("{operation} request arrived before the provider was configured"),
            );
        };
        let Some(name) = request.resource.as_deref() else {
            return failure("Invalid Request", format!("{operation} request is missing \"resource\""));
        };
        let resource = match registry.lookup(name) {
            Ok(resource) => resource,
            Err(e) => return failure("Invalid Request", e.to_string()),
        };

        tracing::debug!(%operation, resource = name, "handling request");

        let response = match operation {
            Operation::Create => resource.create(&request.config, cancel).await,
            Operation::Read => resource.read(&request.state).await,
            Operation::Update => resource.update(&request.config, &request.state).await,
            Operation::Delete => resource.delete(&request.state).await,
            Operation::Import => match request.id.as_deref() {
                Some(id) => resource.import(id).await,
                None => return failure("Invalid Request", "import request is missing \"id\"".into()),
            },
        };

        if response.has_error() {
            tracing::warn!(%operation, resource = name, "operation failed");
        }
        reply_value(response.into())
    }
}

/// Serve requests until input ends or `cancel` fires. A cancellation that
/// arrives mid-operation lets that operation finish and reply first.
pub async fn serve<R, W>(
    plugin: &mut Plugin,
    reader: R,
    mut writer: W,
    cancel: &CancellationToken,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    loop {
        let line = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        let reply = match serde_json::from_str::<Request>(&line) {
            Ok(request) => plugin.handle(request, cancel).await,
            Err(e) => failure("Invalid Request", format!("Unable to parse request: {e}")),
        };

        let mut out = reply.to_string();
        out.push('\n');
        writer.write_all(out.as_bytes()).await?;
        writer.flush().await?;
    }
    Ok(())
}
