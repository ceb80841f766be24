//! Network topology module.
//!
//! This module builds the single-segment bus: node roles, addresses and
//! display positions.

pub mod addressing;
pub mod builder;
pub mod types;

// Re-export key types and functions for easier access
pub use addressing::{AddressError, Ipv4AddressPool};
pub use builder::build_bus_topology;
pub use types::{Node, NodeId, Position, Role, Topology};
