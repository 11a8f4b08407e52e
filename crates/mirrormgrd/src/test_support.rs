//! Shared test doubles: static gateways, a recording flow gateway and
//! canned flow rules.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Map};

use crate::gateway::{
    CircuitGateway, FlowGateway, GatewayError, GatewayResult, TopologyGateway,
};
use crate::mirror_mgr::MirrorMgr;
use crate::registry::MirrorRegistry;
use crate::store::{MemoryMirrorStore, MirrorStore};
use crate::types::{FlowAction, FlowInstruction, FlowMatch, FlowRule, FlowSet, MirrorRecord};

/// Topology gateway answering from fixed sets.
pub(crate) struct StaticTopology {
    pub switches: HashSet<String>,
    pub interfaces: HashSet<String>,
}

#[async_trait]
impl TopologyGateway for StaticTopology {
    async fn switches(&self) -> GatewayResult<HashSet<String>> {
        Ok(self.switches.clone())
    }

    async fn interfaces(&self) -> GatewayResult<HashSet<String>> {
        Ok(self.interfaces.clone())
    }
}

/// Circuit gateway answering from a fixed set.
pub(crate) struct StaticCircuits {
    pub circuits: HashSet<String>,
}

#[async_trait]
impl CircuitGateway for StaticCircuits {
    async fn circuits(&self) -> GatewayResult<HashSet<String>> {
        Ok(self.circuits.clone())
    }
}

/// Flow gateway serving one canned flow set and recording every install.
#[derive(Default)]
pub(crate) struct RecordingFlowGateway {
    flows: FlowSet,
    reject: Mutex<Option<(u16, String)>>,
    installs: Mutex<Vec<(String, FlowSet)>>,
}

impl RecordingFlowGateway {
    pub fn with_flows(flows: FlowSet) -> Self {
        Self {
            flows,
            ..Default::default()
        }
    }

    /// Makes every subsequent install fail with the given status/body.
    pub fn set_reject(&self, status: u16, body: &str) {
        *self.reject.lock() = Some((status, body.to_string()));
    }

    pub fn install_count(&self) -> usize {
        self.installs.lock().len()
    }

    pub fn last_install(&self) -> Option<(String, FlowSet)> {
        self.installs.lock().last().cloned()
    }
}

#[async_trait]
impl FlowGateway for RecordingFlowGateway {
    async fn fetch_flows(&self, _switch: &str) -> GatewayResult<FlowSet> {
        Ok(self.flows.clone())
    }

    async fn install_flows(&self, switch: &str, flow_set: &FlowSet) -> GatewayResult<()> {
        self.installs
            .lock()
            .push((switch.to_string(), flow_set.clone()));
        if let Some((status, body)) = self.reject.lock().clone() {
            return Err(GatewayError::Rejected {
                url: format!("mock://flows/{switch}"),
                status,
                body,
            });
        }
        Ok(())
    }
}

/// A circuit-style rule: cookie-tagged, instruction-wrapped action list,
/// with all the transient runtime fields populated.
pub(crate) fn circuit_rule(cookie: u64, out_port: u32) -> FlowRule {
    FlowRule {
        cookie: Some(cookie),
        cookie_mask: Some(u64::MAX),
        r#match: Some(FlowMatch {
            in_port: Some(1),
            ..Default::default()
        }),
        actions: None,
        instructions: Some(vec![FlowInstruction {
            instruction_type: Some("apply_actions".to_string()),
            actions: vec![FlowAction::output(out_port)],
            extra: Map::new(),
        }]),
        priority: Some(20000),
        id: Some("f-1".to_string()),
        idle_timeout: Some(0),
        hard_timeout: Some(0),
        switch: Some("00:00:00:00:00:00:00:01".to_string()),
        stats: Some(json!({"bytes": 1024, "packets": 8})),
        extra: Map::new(),
    }
}

/// An interface-style rule: flat action list with an output to `out_port`
/// and an optional `in_port` match.
pub(crate) fn interface_rule(in_port: Option<u32>, out_port: u32) -> FlowRule {
    FlowRule {
        cookie: None,
        cookie_mask: None,
        r#match: in_port.map(|port| FlowMatch {
            in_port: Some(port),
            ..Default::default()
        }),
        actions: Some(vec![FlowAction::output(out_port)]),
        instructions: None,
        priority: Some(1000),
        id: Some("f-2".to_string()),
        idle_timeout: Some(0),
        hard_timeout: Some(0),
        switch: Some("00:00:00:00:00:00:00:01".to_string()),
        stats: Some(json!({"bytes": 0})),
        extra: Map::new(),
    }
}

/// A fully wired manager over static gateways and an in-memory store.
pub(crate) struct TestEnv {
    pub mgr: MirrorMgr,
    pub registry: Arc<MirrorRegistry>,
    pub store: Arc<MemoryMirrorStore>,
    pub flows: Arc<RecordingFlowGateway>,
}

impl TestEnv {
    pub fn new(
        switches: &[&str],
        interfaces: &[&str],
        circuits: &[&str],
        flows: FlowSet,
    ) -> Self {
        let to_set =
            |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<HashSet<_>>();

        let topology = Arc::new(StaticTopology {
            switches: to_set(switches),
            interfaces: to_set(interfaces),
        });
        let circuit_gw = Arc::new(StaticCircuits {
            circuits: to_set(circuits),
        });
        let flow_gw = Arc::new(RecordingFlowGateway::with_flows(flows));
        let registry = Arc::new(MirrorRegistry::new());
        let store = Arc::new(MemoryMirrorStore::new());

        let mgr = MirrorMgr::new(
            registry.clone(),
            store.clone(),
            topology,
            circuit_gw,
            flow_gw.clone(),
        );

        Self {
            mgr,
            registry,
            store,
            flows: flow_gw,
        }
    }

    pub async fn store_record(&self, mirror_id: &str) -> MirrorRecord {
        self.store
            .find_one(mirror_id)
            .await
            .unwrap()
            .expect("record in store")
    }

    pub async fn store_is_empty(&self) -> bool {
        self.store.find_all().await.unwrap().is_empty()
    }
}
