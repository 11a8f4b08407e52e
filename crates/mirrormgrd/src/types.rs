//! Type definitions for mirrormgrd.
//!
//! Flow rules are copied and augmented, never interpreted: every descriptor
//! keeps a flattened passthrough map so fields this daemon does not know
//! about round-trip losslessly through the store and the gateways.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::tables::MIRROR_ID_LEN;

/// A single action inside a flow rule.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowAction {
    /// Action discriminator (e.g. "output", "set_vlan").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_type: Option<String>,

    /// Target port for output actions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u32>,

    /// Fields this daemon does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FlowAction {
    /// Output action toward a physical port.
    pub fn output(port: u32) -> Self {
        Self {
            action_type: Some("output".to_string()),
            port: Some(port),
            extra: Map::new(),
        }
    }

    /// True if this action egresses traffic on the given port.
    pub fn targets_port(&self, port: u32) -> bool {
        self.port == Some(port)
    }
}

/// An instruction wrapping an action list (instruction-style flow rules).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowInstruction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instruction_type: Option<String>,

    pub actions: Vec<FlowAction>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Match portion of a flow rule. Only `in_port` is inspected; everything
/// else passes through untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowMatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_port: Option<u32>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A switch-level match+action forwarding rule as exchanged with the flow
/// programming gateway.
///
/// The named optional fields are the ones the transformation logic reads or
/// strips; anything else lands in `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowRule {
    /// Opaque numeric tag correlating rules with their owning circuit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookie: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookie_mask: Option<u64>,

    #[serde(rename = "match", skip_serializing_if = "Option::is_none")]
    pub r#match: Option<FlowMatch>,

    /// Flat action list (interface-style rules).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<FlowAction>>,

    /// Instruction list (circuit-style rules).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<Vec<FlowInstruction>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,

    /// Rule id assigned by the flow programming service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_timeout: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hard_timeout: Option<u32>,

    /// Owning switch as reported by the gateway.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub switch: Option<String>,

    /// Runtime statistics reported by the gateway.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An ordered sequence of flow rules, the unit exchanged with the flow
/// programming gateway (`{"flows": [...]}`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FlowSet {
    pub flows: Vec<FlowRule>,
}

impl FlowSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
}

/// What a mirror was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MirrorKind {
    #[serde(rename = "EVC")]
    Evc,
    #[serde(rename = "interface")]
    Interface,
}

/// Lifecycle state of a mirror. Determines which of the two flow sets is
/// currently believed installed on the switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MirrorStatus {
    Enabled,
    Disabled,
}

impl MirrorStatus {
    pub fn is_enabled(&self) -> bool {
        matches!(self, MirrorStatus::Enabled)
    }
}

impl std::fmt::Display for MirrorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MirrorStatus::Enabled => write!(f, "Enabled"),
            MirrorStatus::Disabled => write!(f, "Disabled"),
        }
    }
}

/// One mirror document, keyed externally by its mirror id.
///
/// `original_flow` and `mirror_flow` have the same cardinality and are
/// index-aligned; rule *i* in one corresponds to rule *i* in the other,
/// differing only by the appended output action toward `target_port`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirrorRecord {
    pub name: String,

    #[serde(rename = "type")]
    pub kind: MirrorKind,

    pub status: MirrorStatus,

    /// Switch owning the mirrored flows.
    pub switch: String,

    /// Physical port where mirrored traffic egresses.
    pub target_port: u32,

    /// Present iff `kind` is EVC.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub circuit_id: Option<String>,

    /// Present iff `kind` is interface (`switch:port` composite).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,

    /// Restorable pre-mirror state.
    pub original_flow: FlowSet,

    /// Active-when-enabled state.
    pub mirror_flow: FlowSet,

    /// Set once by the store on first upsert.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inserted_at: Option<DateTime<Utc>>,

    /// Refreshed by the store on every upsert.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Body of `POST /v1/`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMirrorRequest {
    pub name: String,

    /// Mirror an existing circuit (EVC kind). Requires `switch`.
    #[serde(default)]
    pub circuit_id: Option<String>,

    #[serde(default)]
    pub switch: Option<String>,

    /// Mirror a physical interface (`switch:port` composite).
    #[serde(default)]
    pub interface: Option<String>,

    /// Monitoring port token; the port number is its trailing decimal
    /// component ("00:00:...:01:2" or "s1-eth2").
    pub target_port: String,

    /// Unsupported selection feature, rejected if present.
    #[serde(default)]
    pub to_tag: Option<Value>,

    /// Unsupported selection feature, rejected if present.
    #[serde(default, rename = "match")]
    pub r#match: Option<Value>,
}

/// Body of `PATCH /v1/{mirror_id}`. Unknown attributes are rejected.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateMirrorRequest {
    #[serde(default)]
    pub enabled: Option<bool>,

    #[serde(default)]
    pub name: Option<String>,
}

/// Allocates a new globally-unique mirror id: the first 14 hex characters
/// of a v4 UUID.
pub fn new_mirror_id() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    hex[..MIRROR_ID_LEN].to_string()
}
