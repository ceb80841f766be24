//! Traffic and attack model.
//!
//! Benign sensors and the attacker are both [`TrafficSource`]s aimed at the
//! gateway's sink; [`plan_sources`] derives one per sending node from the
//! scenario configuration.

pub mod attack;
pub mod source;

pub use attack::{AttackMode, AttackParams};
pub use source::{EmissionSchedule, TrafficConfig, TrafficError, TrafficSource};

use std::net::SocketAddrV4;

use log::{debug, info};

use crate::config::Config;
use crate::topology::{Role, Topology};

/// Errors raised while planning the sources of a scenario
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlanError {
    #[error("topology has no {0} node")]
    MissingNode(&'static str),
    #[error("invalid traffic for {node}: {source}")]
    InvalidTraffic {
        node: String,
        #[source]
        source: TrafficError,
    },
}

/// Build every traffic source of the scenario, sensors first.
///
/// `attack` is the resolved attacker, or `None` for a benign-only run.
pub fn plan_sources(
    topology: &Topology,
    config: &Config,
    attack: Option<&AttackMode>,
) -> Result<Vec<TrafficSource>, PlanError> {
    let gateway = topology.gateway().ok_or(PlanError::MissingNode("gateway"))?;
    let sink = SocketAddrV4::new(gateway.address, config.sink.port);

    let mut sources = Vec::with_capacity(topology.nodes.len());

    for node in topology.sensors() {
        let Role::Sensor(index) = node.role else {
            continue;
        };
        let source = TrafficSource::new(node, sink, config.sensor_traffic(index)).map_err(|source| {
            PlanError::InvalidTraffic {
                node: node.role.description(),
                source,
            }
        })?;
        debug!(
            "{} sends {}B at {} from {:?} to {:?}",
            node.role,
            source.config.payload_size,
            source.config.rate,
            source.start(),
            source.stop()
        );
        sources.push(source);
    }

    if let Some(mode) = attack {
        let node = topology.attacker().ok_or(PlanError::MissingNode("attacker"))?;
        let source = TrafficSource::new(node, sink, mode.traffic()).map_err(|source| PlanError::InvalidTraffic {
            node: node.role.description(),
            source,
        })?;
        info!(
            "Attacker configured as {}: {}B at {} during [{:?}, {:?})",
            mode.name(),
            source.config.payload_size,
            source.config.rate,
            source.start(),
            source.stop()
        );
        sources.push(source);
    } else {
        info!("No attacker traffic scheduled (benign baseline)");
    }

    Ok(sources)
}
