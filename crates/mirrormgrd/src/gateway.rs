//! External gateway clients.
//!
//! The topology, circuit inventory and flow programming services are
//! consumed through request/response HTTP calls against the controller
//! API, behind object-safe traits so the orchestration core can be tested
//! without a controller. The shared reqwest client carries the configured
//! timeout, so a hanging gateway only ever blocks the calling task.

use std::collections::HashSet;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::tables::paths;
use crate::types::FlowSet;

/// Result type alias for gateway calls.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors from external gateway calls.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request could not be completed (connect, timeout, decode).
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The gateway answered with a shape this daemon cannot use.
    #[error("unexpected response shape from {url}: {reason}")]
    Decode { url: String, reason: String },

    /// The flow programming gateway refused a flow set.
    #[error("flow install rejected by {url}: status={status} body={body}")]
    Rejected {
        url: String,
        status: u16,
        body: String,
    },
}

/// Switch and interface inventory.
#[async_trait]
pub trait TopologyGateway: Send + Sync {
    /// Returns the set of known switch identifiers.
    async fn switches(&self) -> GatewayResult<HashSet<String>>;

    /// Returns the set of known interface identifiers
    /// (`switch:port` composites).
    async fn interfaces(&self) -> GatewayResult<HashSet<String>>;
}

/// EVC inventory; existence check only.
#[async_trait]
pub trait CircuitGateway: Send + Sync {
    /// Returns the set of known circuit identifiers.
    async fn circuits(&self) -> GatewayResult<HashSet<String>>;
}

/// Per-switch flow fetch and install.
#[async_trait]
pub trait FlowGateway: Send + Sync {
    /// Fetches the current flow set of a switch.
    async fn fetch_flows(&self, switch: &str) -> GatewayResult<FlowSet>;

    /// Installs a flow set on a switch. A non-success response is a
    /// [`GatewayError::Rejected`] carrying the gateway's status and body.
    async fn install_flows(&self, switch: &str, flow_set: &FlowSet) -> GatewayResult<()>;
}

/// HTTP implementation of all three gateways against one controller API.
#[derive(Debug, Clone)]
pub struct ControllerApi {
    client: Client,
    base_url: String,
}

impl ControllerApi {
    /// Creates a new client. `base_url` is the controller API root
    /// (e.g. `http://127.0.0.1:8181/api/kytos`); trailing slashes are
    /// trimmed.
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get_json(&self, path: &str) -> GatewayResult<(String, Value)> {
        let url = self.url(path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| GatewayError::Request {
                url: url.clone(),
                source,
            })?;
        let value = response
            .json()
            .await
            .map_err(|source| GatewayError::Request {
                url: url.clone(),
                source,
            })?;
        Ok((url, value))
    }
}

#[async_trait]
impl TopologyGateway for ControllerApi {
    async fn switches(&self) -> GatewayResult<HashSet<String>> {
        let (url, value) = self.get_json(paths::SWITCHES).await?;
        let switches = value
            .get("switches")
            .and_then(Value::as_object)
            .ok_or_else(|| GatewayError::Decode {
                url,
                reason: "missing 'switches' object".to_string(),
            })?;
        Ok(switches.keys().cloned().collect())
    }

    async fn interfaces(&self) -> GatewayResult<HashSet<String>> {
        let (url, value) = self.get_json(paths::INTERFACES).await?;
        let interfaces = value
            .get("interfaces")
            .and_then(Value::as_object)
            .ok_or_else(|| GatewayError::Decode {
                url,
                reason: "missing 'interfaces' object".to_string(),
            })?;
        Ok(interfaces
            .values()
            .filter_map(|entry| entry.get("id"))
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect())
    }
}

#[async_trait]
impl CircuitGateway for ControllerApi {
    async fn circuits(&self) -> GatewayResult<HashSet<String>> {
        let (url, value) = self.get_json(paths::CIRCUITS).await?;
        let circuits = value.as_object().ok_or_else(|| GatewayError::Decode {
            url,
            reason: "expected a circuit-id map".to_string(),
        })?;
        Ok(circuits.keys().cloned().collect())
    }
}

#[async_trait]
impl FlowGateway for ControllerApi {
    async fn fetch_flows(&self, switch: &str) -> GatewayResult<FlowSet> {
        let path = format!("{}/{}", paths::FLOWS, switch);
        let (url, value) = self.get_json(&path).await?;
        let entry = value.get(switch).cloned().ok_or_else(|| GatewayError::Decode {
            url: url.clone(),
            reason: format!("missing entry for switch {switch}"),
        })?;
        serde_json::from_value(entry).map_err(|err| GatewayError::Decode {
            url,
            reason: err.to_string(),
        })
    }

    async fn install_flows(&self, switch: &str, flow_set: &FlowSet) -> GatewayResult<()> {
        let url = self.url(&format!("{}/{}", paths::FLOWS, switch));
        let response = self
            .client
            .post(&url)
            .json(flow_set)
            .send()
            .await
            .map_err(|source| GatewayError::Request {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if status.is_success() {
            debug!(%url, %status, flows = flow_set.len(), "flow set accepted");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(GatewayError::Rejected {
                url,
                status: status.as_u16(),
                body,
            })
        }
    }
}
