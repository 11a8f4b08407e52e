//! MirrorMgr - mirror lifecycle orchestration.
//!
//! Coordinates the external gateways, the flow transformation and the
//! registry/store pair:
//!
//! - `create_mirror`: validate against inventory, derive the
//!   (original, mirror) flow-set pair, install the mirror set, commit.
//! - `toggle_status`: strict-edge Enabled/Disabled state machine; the
//!   flow set matching the requested state is installed before the
//!   status flips.
//! - `list_enabled` / `list_all`: registry reads, no gateway calls.
//!
//! Every path installs through the flow programming gateway first and
//! commits (store upsert, then registry) only after the gateway accepted
//! the flow set; a rejected install leaves both unchanged. Operations on
//! the same mirror id are serialized through a per-id lock; operations on
//! different ids proceed in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, instrument, warn};

use crate::error::{MirrorError, MirrorResult};
use crate::flow;
use crate::gateway::{CircuitGateway, FlowGateway, TopologyGateway};
use crate::registry::MirrorRegistry;
use crate::store::MirrorStore;
use crate::types::{
    new_mirror_id, CreateMirrorRequest, MirrorKind, MirrorRecord, MirrorStatus,
};

/// Mirror lifecycle orchestrator.
pub struct MirrorMgr {
    registry: Arc<MirrorRegistry>,
    store: Arc<dyn MirrorStore>,
    topology: Arc<dyn TopologyGateway>,
    circuits: Arc<dyn CircuitGateway>,
    flows: Arc<dyn FlowGateway>,

    /// Per-mirror-id locks serializing mutations against each other.
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl MirrorMgr {
    /// Creates a new manager over the given collaborators.
    pub fn new(
        registry: Arc<MirrorRegistry>,
        store: Arc<dyn MirrorStore>,
        topology: Arc<dyn TopologyGateway>,
        circuits: Arc<dyn CircuitGateway>,
        flows: Arc<dyn FlowGateway>,
    ) -> Self {
        Self {
            registry,
            store,
            topology,
            circuits,
            flows,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Loads the registry from the store. Called once at startup.
    pub async fn load(&self) -> MirrorResult<()> {
        let records = self.store.find_all().await?;
        info!(count = records.len(), "loaded mirrors from store");
        self.registry.load(records);
        Ok(())
    }

    /// Creates a mirror, dispatching on the identifying field of the
    /// command. Returns the new mirror id.
    #[instrument(skip(self, command), fields(name = %command.name))]
    pub async fn create_mirror(&self, command: CreateMirrorRequest) -> MirrorResult<String> {
        if command.to_tag.is_some() {
            return Err(MirrorError::unsupported("to_tag"));
        }
        if command.r#match.is_some() {
            return Err(MirrorError::unsupported("match"));
        }

        if command.circuit_id.is_some() {
            self.create_evc_mirror(command).await
        } else if command.interface.is_some() {
            self.create_interface_mirror(command).await
        } else {
            Err(MirrorError::validation(
                "one of circuit_id or interface is required",
            ))
        }
    }

    async fn create_evc_mirror(&self, command: CreateMirrorRequest) -> MirrorResult<String> {
        let circuit_id = command
            .circuit_id
            .ok_or_else(|| MirrorError::validation("circuit_id is required"))?;
        let switch = command
            .switch
            .ok_or_else(|| MirrorError::validation("switch is required for EVC mirrors"))?;
        let target_port = parse_port_token(&command.target_port)?;
        let cookie = flow::circuit_cookie(&circuit_id)?;

        if !self.topology.switches().await?.contains(&switch) {
            return Err(MirrorError::not_found("switch", switch));
        }
        if !self.circuits.circuits().await?.contains(&circuit_id) {
            return Err(MirrorError::not_found("circuit", circuit_id));
        }

        let current = self.flows.fetch_flows(&switch).await?;
        let (original_flow, mirror_flow) = flow::mirror_by_circuit(&current, cookie, target_port)?;

        self.flows.install_flows(&switch, &mirror_flow).await?;

        self.commit_new(MirrorRecord {
            name: command.name,
            kind: MirrorKind::Evc,
            status: MirrorStatus::Enabled,
            switch,
            target_port,
            circuit_id: Some(circuit_id),
            interface: None,
            original_flow,
            mirror_flow,
            inserted_at: None,
            updated_at: None,
        })
        .await
    }

    async fn create_interface_mirror(&self, command: CreateMirrorRequest) -> MirrorResult<String> {
        let interface = command
            .interface
            .ok_or_else(|| MirrorError::validation("interface is required"))?;
        let target_port = parse_port_token(&command.target_port)?;
        let (switch, interface_port) = split_interface(&interface)?;

        if !self.topology.interfaces().await?.contains(&interface) {
            return Err(MirrorError::not_found("interface", interface));
        }

        let current = self.flows.fetch_flows(&switch).await?;
        let (original_flow, mirror_flow) =
            flow::mirror_by_interface(&current, interface_port, target_port)?;
        if mirror_flow.is_empty() {
            warn!(%interface, "no flows matched the interface, creating an empty mirror");
        }

        self.flows.install_flows(&switch, &mirror_flow).await?;

        self.commit_new(MirrorRecord {
            name: command.name,
            kind: MirrorKind::Interface,
            status: MirrorStatus::Enabled,
            switch,
            target_port,
            circuit_id: None,
            interface: Some(interface),
            original_flow,
            mirror_flow,
            inserted_at: None,
            updated_at: None,
        })
        .await
    }

    /// Allocates an id and commits a freshly created record: store upsert
    /// first, registry after.
    async fn commit_new(&self, record: MirrorRecord) -> MirrorResult<String> {
        let mirror_id = new_mirror_id();
        let stored = self.store.upsert(&mirror_id, record).await?;
        self.registry.commit(mirror_id.clone(), stored);
        info!(%mirror_id, "mirror created");
        Ok(mirror_id)
    }

    /// Enabled mirrors, keyed by id. Pure registry read.
    pub fn list_enabled(&self) -> HashMap<String, MirrorRecord> {
        self.registry.list_enabled()
    }

    /// All mirrors, keyed by id. Pure registry read.
    pub fn list_all(&self) -> HashMap<String, MirrorRecord> {
        self.registry.list_all()
    }

    /// Flips a mirror's status along a strict edge of the state machine:
    /// disabling installs `original_flow`, enabling installs
    /// `mirror_flow`. A request for the state the mirror is already in
    /// fails with an invalid-request error; a rejected install aborts the
    /// transition with status and store untouched.
    #[instrument(skip(self))]
    pub async fn toggle_status(
        &self,
        mirror_id: &str,
        requested_enabled: bool,
    ) -> MirrorResult<MirrorStatus> {
        let lock = self.lock_for(mirror_id)?;
        let _guard = lock.lock().await;

        let mut record = self
            .registry
            .get(mirror_id)
            .ok_or_else(|| MirrorError::not_found("mirror", mirror_id))?;

        let (flow_to_send, new_status) = match (record.status, requested_enabled) {
            (MirrorStatus::Enabled, false) => (&record.original_flow, MirrorStatus::Disabled),
            (MirrorStatus::Disabled, true) => (&record.mirror_flow, MirrorStatus::Enabled),
            _ => {
                return Err(MirrorError::validation(format!(
                    "nothing to do: mirror {mirror_id} is already {}",
                    record.status
                )))
            }
        };

        self.flows.install_flows(&record.switch, flow_to_send).await?;

        record.status = new_status;
        let stored = self.store.upsert(mirror_id, record).await?;
        self.registry.commit(mirror_id.to_string(), stored);
        info!(%mirror_id, status = %new_status, "mirror status changed");
        Ok(new_status)
    }

    /// Updates a mirror's name. No flow logic, no gateway calls.
    /// Returns the mirror's (unchanged) status.
    #[instrument(skip(self, name))]
    pub async fn rename(&self, mirror_id: &str, name: String) -> MirrorResult<MirrorStatus> {
        let lock = self.lock_for(mirror_id)?;
        let _guard = lock.lock().await;

        let mut record = self
            .registry
            .get(mirror_id)
            .ok_or_else(|| MirrorError::not_found("mirror", mirror_id))?;
        record.name = name;
        let status = record.status;

        let stored = self.store.upsert(mirror_id, record).await?;
        self.registry.commit(mirror_id.to_string(), stored);
        Ok(status)
    }

    /// Returns the lock serializing mutations of one mirror. Unknown ids
    /// are rejected here, before an entry is allocated, so the map only
    /// ever holds registered mirrors; ids are never deleted, so a
    /// registry hit cannot go stale between this check and the mutation.
    fn lock_for(&self, mirror_id: &str) -> MirrorResult<Arc<AsyncMutex<()>>> {
        if !self.registry.contains(mirror_id) {
            return Err(MirrorError::not_found("mirror", mirror_id));
        }
        Ok(self
            .locks
            .lock()
            .entry(mirror_id.to_string())
            .or_default()
            .clone())
    }

    #[cfg(test)]
    fn lock_count(&self) -> usize {
        self.locks.lock().len()
    }
}

/// Extracts the physical port number from a port token: the trailing
/// decimal component of either a `switch:port` composite
/// (`"00:00:...:01:2"` -> 2) or an interface name (`"s1-eth2"` -> 2).
fn parse_port_token(token: &str) -> MirrorResult<u32> {
    let tail = token.rsplit(':').next().unwrap_or(token);
    let port = match tail.parse::<u32>() {
        Ok(port) => port,
        Err(_) => {
            let digits: String = tail
                .chars()
                .rev()
                .take_while(|c| c.is_ascii_digit())
                .collect::<String>()
                .chars()
                .rev()
                .collect();
            digits.parse::<u32>().map_err(|_| {
                MirrorError::validation(format!("target_port has no port number: {token}"))
            })?
        }
    };
    if port == 0 {
        return Err(MirrorError::validation(format!(
            "target_port must be positive: {token}"
        )));
    }
    Ok(port)
}

/// Splits an interface id into its owning switch and port number,
/// validating the `switch:port` composite format up front.
fn split_interface(interface: &str) -> MirrorResult<(String, u32)> {
    let (switch, port) = interface.rsplit_once(':').ok_or_else(|| {
        MirrorError::validation(format!(
            "interface must be a switch:port composite: {interface}"
        ))
    })?;
    if switch.is_empty() {
        return Err(MirrorError::validation(format!(
            "interface has an empty switch component: {interface}"
        )));
    }
    let port = port.parse::<u32>().map_err(|_| {
        MirrorError::validation(format!("interface port is not a number: {interface}"))
    })?;
    Ok((switch.to_string(), port))
}
