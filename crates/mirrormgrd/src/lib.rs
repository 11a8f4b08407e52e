//! mirrormgrd library.
//!
//! Traffic mirror manager for an SDN controller: derives mirror flow
//! rules from a circuit's or interface's installed flows, programs them
//! through the controller's flow-programming API, and keeps one durable
//! document per mirror so mirrors survive restarts.
//!
//! Module layout:
//!
//! - [`flow`] — pure flow-set rewriting (cookie derivation, runtime field
//!   stripping, mirror action injection)
//! - [`gateway`] — HTTP clients for the controller's topology, circuit
//!   and flow-programming APIs
//! - [`store`] — durable keyed record store with transient-error retry
//! - [`registry`] — authoritative in-memory mirror map
//! - [`mirror_mgr`] — orchestration: create, list, toggle, rename
//! - [`rest_api`] — axum HTTP surface

pub mod config;
pub mod error;
pub mod flow;
pub mod gateway;
pub mod mirror_mgr;
pub mod registry;
pub mod rest_api;
pub mod store;
pub mod tables;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::Config;
pub use error::{MirrorError, MirrorResult};
pub use mirror_mgr::MirrorMgr;
pub use registry::MirrorRegistry;
