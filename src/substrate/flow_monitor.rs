//! Per-flow accounting.
//!
//! Flows are identified by their five-tuple and numbered from 1 in order of
//! first transmission. Transmit counters are updated when the sending node
//! hands a datagram to its device; receive counters, delay and jitter when
//! the datagram reaches the destination node. Byte counts are IP-level.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const PROTOCOL_UDP: u8 = 17;

/// Flow identity, unique within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FlowId(pub u32);

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "flow-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FiveTuple {
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
    pub protocol: u8,
    pub source_port: u16,
    pub destination_port: u16,
}

impl fmt::Display for FiveTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} -> {}:{} ({})",
            self.source, self.source_port, self.destination, self.destination_port, self.protocol
        )
    }
}

/// Raw counters of one flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlowStats {
    pub tx_packets: u64,
    pub rx_packets: u64,
    pub tx_bytes: u64,
    pub rx_bytes: u64,
    pub delay_sum: Duration,
    pub jitter_sum: Duration,
    pub last_delay: Duration,
}

/// Classifier plus counters for every flow of a run
#[derive(Debug, Default)]
pub struct FlowMonitor {
    classifier: HashMap<FiveTuple, FlowId>,
    tuples: BTreeMap<FlowId, FiveTuple>,
    flows: BTreeMap<FlowId, FlowStats>,
}

impl FlowMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flow id of `tuple`, allocating the next id on first sight
    pub fn classify(&mut self, tuple: FiveTuple) -> FlowId {
        if let Some(id) = self.classifier.get(&tuple) {
            return *id;
        }
        let id = FlowId(self.classifier.len() as u32 + 1);
        self.classifier.insert(tuple, id);
        self.tuples.insert(id, tuple);
        log::debug!("New {}: {}", id, tuple);
        id
    }

    pub fn find_flow(&self, id: FlowId) -> Option<FiveTuple> {
        self.tuples.get(&id).copied()
    }

    pub fn record_tx(&mut self, flow: FlowId, bytes: u64) {
        let stats = self.flows.entry(flow).or_default();
        stats.tx_packets += 1;
        stats.tx_bytes += bytes;
    }

    pub fn record_rx(&mut self, flow: FlowId, bytes: u64, sent_at: Duration, now: Duration) {
        let delay = now.saturating_sub(sent_at);
        let stats = self.flows.entry(flow).or_default();
        if stats.rx_packets > 0 {
            stats.jitter_sum += if stats.last_delay > delay {
                stats.last_delay - delay
            } else {
                delay - stats.last_delay
            };
        }
        stats.delay_sum += delay;
        stats.last_delay = delay;
        stats.rx_packets += 1;
        stats.rx_bytes += bytes;
    }

    /// All flows in id order
    pub fn all_stats(&self) -> Vec<(FlowId, FlowStats)> {
        self.flows.iter().map(|(id, stats)| (*id, *stats)).collect()
    }
}
