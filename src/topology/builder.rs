//! Bus topology construction.
//!
//! Lays out `N` sensors, one attacker and one gateway on a single segment:
//! nodes `0..N` are sensors, node `N` is the attacker and node `N + 1` the
//! gateway. Nodes are placed left to right along the x axis.

use log::{debug, info};

use crate::config::NetworkConfig;

use super::addressing::{AddressError, Ipv4AddressPool};
use super::types::{Node, NodeId, Position, Role, Topology};

/// Build the bus topology and assign every node an address
pub fn build_bus_topology(sensor_count: u32, network: &NetworkConfig) -> Result<Topology, AddressError> {
    let mut pool = Ipv4AddressPool::new(network.base_address, network.prefix_len)?;

    let roles = (0..sensor_count)
        .map(Role::Sensor)
        .chain([Role::Attacker, Role::Gateway]);

    let mut nodes = Vec::with_capacity(sensor_count as usize + 2);
    for (index, role) in roles.enumerate() {
        let address = pool.assign()?;
        let node = Node {
            id: NodeId(index),
            role,
            address,
            position: Position {
                x: index as f64 * network.spacing,
                y: 0.0,
            },
        };
        debug!("{} {} at {} (x = {})", node.id, role, address, node.position.x);
        nodes.push(node);
    }

    info!(
        "Built bus topology: {} sensors, attacker, gateway on {}/{}",
        sensor_count,
        pool.network(),
        pool.prefix_len()
    );

    Ok(Topology {
        nodes,
        network: pool.network(),
        prefix_len: pool.prefix_len(),
    })
}
