//! Simulation substrate.
//!
//! The run controller drives the network through the [`Substrate`] trait:
//! install a sink and traffic sources, schedule their start/stop, advance
//! the clock, then read back per-flow counters. [`BusSubstrate`] is the
//! in-process implementation: a discrete-event scheduler, a carrier-sense
//! shared medium, and flow accounting.

pub mod bus;
pub mod flow_monitor;
pub mod medium;
pub mod scheduler;

pub use bus::BusSubstrate;
pub use flow_monitor::{FiveTuple, FlowId, FlowMonitor, FlowStats, PROTOCOL_UDP};
pub use medium::{Backoff, MediumConfig, MediumStats};
pub use scheduler::Scheduler;

use std::net::Ipv4Addr;
use std::time::Duration;

use crate::topology::NodeId;
use crate::traffic::TrafficSource;

/// Handle of an installed traffic source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(pub usize);

/// Application lifecycle events the run controller can schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledEvent {
    StartSource(SourceId),
    StopSource(SourceId),
    StartSink,
    StopSink,
}

/// Datagram totals seen by the sink application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkStats {
    pub node: NodeId,
    pub port: u16,
    pub received_packets: u64,
    pub received_bytes: u64,
}

/// Substrate errors raised while installing applications
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubstrateError {
    #[error("{0} is not attached to the medium")]
    UnknownNode(NodeId),
    #[error("no node on the segment owns address {0}")]
    NoRouteToHost(Ipv4Addr),
    #[error("a sink is already installed on {0}")]
    SinkAlreadyInstalled(NodeId),
}

/// What the run controller needs from a network simulator
pub trait Substrate {
    /// Bind the sink to `node` on `port`; it stays passive until started
    fn install_sink(&mut self, node: NodeId, port: u16) -> Result<(), SubstrateError>;

    /// Attach a traffic source to its sender node; it stays idle until started
    fn install_source(&mut self, source: TrafficSource) -> Result<SourceId, SubstrateError>;

    /// Schedule a lifecycle event at absolute simulated time `at`
    fn schedule(&mut self, event: ScheduledEvent, at: Duration);

    /// Process every event up to and including `end`
    fn advance_to(&mut self, end: Duration);

    /// Halt: discard pending events and deactivate all applications
    fn stop(&mut self);

    fn now(&self) -> Duration;

    /// Per-flow counters, ordered by flow id
    fn flow_stats(&self) -> Vec<(FlowId, FlowStats)>;

    /// Map a flow id to its five-tuple
    fn classify(&self, flow: FlowId) -> Option<FiveTuple>;

    fn sink_stats(&self) -> Option<SinkStats>;
}
