//! Core data types for flow analysis.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::substrate::FlowId;

/// Counters of one flow as recorded by the substrate, frozen at run end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowRecord {
    pub flow_id: FlowId,
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
    pub destination_port: u16,
    /// Role of the sending node, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub tx_packets: u64,
    pub rx_packets: u64,
    pub tx_bytes: u64,
    pub rx_bytes: u64,
    /// Sum of one-way delays of received packets, seconds
    pub delay_sum: f64,
    /// Sum of delay variations between consecutive received packets, seconds
    pub jitter_sum: f64,
}

/// Per-flow view derived while computing the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowSummary {
    pub flow_id: FlowId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub source: Ipv4Addr,
    pub tx_packets: u64,
    pub rx_packets: u64,
    /// Bits per second over the whole run
    pub throughput_bps: f64,
    pub delivery_ratio: f64,
}

/// Aggregate quality-of-service metrics of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    /// Flows that matched the sink port
    pub flow_count: usize,
    pub tx_packets: u64,
    pub rx_packets: u64,
    pub tx_bytes: u64,
    pub rx_bytes: u64,
    pub aggregate_throughput_bps: f64,
    /// In [0, 1]
    pub packet_delivery_ratio: f64,
    pub average_delay_s: f64,
    pub average_jitter_s: f64,
    /// In [0, 1]
    pub packet_loss_ratio: f64,
    pub goodput_bps: f64,
    /// Not modeled by the substrate
    pub energy_joules: Option<f64>,
    /// Not modeled by the substrate
    pub collisions: Option<u64>,
    /// Every node shares one segment
    pub hop_count: u32,
    /// Jain's index over per-flow throughput, in [0, 1]
    pub fairness_index: f64,
    pub flows: Vec<FlowSummary>,
}

impl Default for MetricsReport {
    fn default() -> Self {
        Self {
            flow_count: 0,
            tx_packets: 0,
            rx_packets: 0,
            tx_bytes: 0,
            rx_bytes: 0,
            aggregate_throughput_bps: 0.0,
            packet_delivery_ratio: 0.0,
            average_delay_s: 0.0,
            average_jitter_s: 0.0,
            packet_loss_ratio: 0.0,
            goodput_bps: 0.0,
            energy_joules: None,
            collisions: None,
            hop_count: 1,
            fairness_index: 0.0,
            flows: Vec::new(),
        }
    }
}

/// Metadata describing the scenario a report came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub generated_at: String,
    pub sensor_count: u32,
    pub attack_mode: String,
    /// Attack window in seconds, absent for benign runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attack_window_s: Option<(f64, f64)>,
    pub sim_duration_s: f64,
    pub seed: u64,
}

/// Everything written to the JSON report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullReport {
    pub metadata: ReportMetadata,
    pub metrics: MetricsReport,
    pub flow_records: Vec<FlowRecord>,
}

/// Benign baseline next to the attacked run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub baseline: MetricsReport,
    pub attacked: MetricsReport,
    pub attack_mode: String,
}

impl ComparisonReport {
    /// Attacked minus baseline PDR, in percentage points
    pub fn pdr_delta_pct(&self) -> f64 {
        (self.attacked.packet_delivery_ratio - self.baseline.packet_delivery_ratio) * 100.0
    }

    pub fn delay_delta_s(&self) -> f64 {
        self.attacked.average_delay_s - self.baseline.average_delay_s
    }

    pub fn jitter_delta_s(&self) -> f64 {
        self.attacked.average_jitter_s - self.baseline.average_jitter_s
    }

    pub fn throughput_delta_bps(&self) -> f64 {
        self.attacked.aggregate_throughput_bps - self.baseline.aggregate_throughput_bps
    }
}
