//! Topology type definitions.
//!
//! Nodes on the bus, their roles and display decoration.

use std::fmt;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

/// Index of a node on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

/// What a node does in the scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Benign telemetry source, numbered from zero
    Sensor(u32),
    /// Jammer or flooder
    Attacker,
    /// Sink for all traffic
    Gateway,
}

impl Role {
    /// Human-readable label used in reports and topology listings
    pub fn description(&self) -> String {
        match self {
            Role::Sensor(index) => format!("Sensor-{}", index),
            Role::Attacker => "Attacker".to_string(),
            Role::Gateway => "Gateway".to_string(),
        }
    }

    /// RGB display color: sensors green, attacker magenta, gateway red
    pub fn color(&self) -> (u8, u8, u8) {
        match self {
            Role::Sensor(_) => (0, 255, 0),
            Role::Attacker => (255, 0, 255),
            Role::Gateway => (255, 0, 0),
        }
    }

    pub fn is_sensor(&self) -> bool {
        matches!(self, Role::Sensor(_))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

/// 2D position, used only for display
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A node attached to the shared medium
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub role: Role,
    pub address: Ipv4Addr,
    pub position: Position,
}

/// All nodes of one bus segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    pub nodes: Vec<Node>,
    pub network: Ipv4Addr,
    pub prefix_len: u8,
}

impl Topology {
    pub fn sensors(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.role.is_sensor())
    }

    pub fn sensor_count(&self) -> usize {
        self.sensors().count()
    }

    /// The attacker node; every built topology has exactly one
    pub fn attacker(&self) -> Option<&Node> {
        self.nodes.iter().find(|n| n.role == Role::Attacker)
    }

    /// The gateway node; every built topology has exactly one
    pub fn gateway(&self) -> Option<&Node> {
        self.nodes.iter().find(|n| n.role == Role::Gateway)
    }

    pub fn node_by_address(&self, address: Ipv4Addr) -> Option<&Node> {
        self.nodes.iter().find(|n| n.address == address)
    }
}
