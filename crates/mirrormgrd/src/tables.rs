//! Key and constant definitions for mirrormgrd.

/// Store hash holding one JSON document per mirror, keyed by mirror id.
pub const MIRROR_TABLE_NAME: &str = "MIRROR_TABLE";

/// Length of mirror ids (hex characters taken from a v4 UUID).
pub const MIRROR_ID_LEN: usize = 14;

/// Length of the circuit identifiers accepted by the EVC path.
pub const CIRCUIT_ID_LEN: usize = 14;

/// Hex prefix concatenated with a circuit id to derive the cookie tagging
/// that circuit's flow rules.
pub const CIRCUIT_COOKIE_PREFIX: &str = "aa";

/// Gateway URL paths under the controller API base.
pub mod paths {
    /// Topology gateway: switch inventory.
    pub const SWITCHES: &str = "topology/v3/switches";

    /// Topology gateway: interface inventory.
    pub const INTERFACES: &str = "topology/v3/interfaces";

    /// Circuit gateway: EVC inventory.
    pub const CIRCUITS: &str = "mef_eline/v2/evc/";

    /// Flow programming gateway: per-switch flow sets (GET/POST under
    /// `{FLOWS}/{switch}`).
    pub const FLOWS: &str = "flow_manager/v2/flows";
}
