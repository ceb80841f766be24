//! Metrics engine.
//!
//! Turns the frozen flow records of a run into one [`MetricsReport`]. Pure
//! and deterministic: the same records always give the same report. Every
//! ratio with an empty denominator resolves to zero.

use std::time::Duration;

use log::warn;

use super::types::{FlowRecord, FlowSummary, MetricsReport};

/// Compute aggregate metrics over the flows addressed to `sink_port`
pub fn compute_report(records: &[FlowRecord], sink_port: u16, sim_duration: Duration) -> MetricsReport {
    let seconds = sim_duration.as_secs_f64();
    let throughput = |rx_bytes: u64| {
        if seconds > 0.0 {
            rx_bytes as f64 * 8.0 / seconds
        } else {
            0.0
        }
    };

    let mut report = MetricsReport::default();
    let mut delay_sum = 0.0;
    let mut jitter_sum = 0.0;
    let mut throughputs = Vec::new();

    for record in records.iter().filter(|r| r.destination_port == sink_port) {
        let flow_throughput = throughput(record.rx_bytes);
        throughputs.push(flow_throughput);

        report.tx_packets += record.tx_packets;
        report.rx_packets += record.rx_packets;
        report.tx_bytes += record.tx_bytes;
        report.rx_bytes += record.rx_bytes;
        delay_sum += record.delay_sum;
        jitter_sum += record.jitter_sum;

        report.flows.push(FlowSummary {
            flow_id: record.flow_id,
            label: record.label.clone(),
            source: record.source,
            tx_packets: record.tx_packets,
            rx_packets: record.rx_packets,
            throughput_bps: flow_throughput,
            delivery_ratio: ratio(record.rx_packets as f64, record.tx_packets as f64),
        });
    }

    report.flow_count = report.flows.len();
    if report.flow_count == 0 {
        warn!(
            "No flow records addressed to port {}; all metrics are zero",
            sink_port
        );
    }

    let tx = report.tx_packets as f64;
    let rx = report.rx_packets as f64;
    report.aggregate_throughput_bps = throughput(report.rx_bytes);
    report.packet_delivery_ratio = ratio(rx, tx);
    report.average_delay_s = ratio(delay_sum, rx);
    report.average_jitter_s = ratio(jitter_sum, rx);
    report.packet_loss_ratio = ratio(
        report.tx_packets.saturating_sub(report.rx_packets) as f64,
        tx,
    );
    report.goodput_bps = report.aggregate_throughput_bps;
    report.fairness_index = jain_fairness(&throughputs);

    report
}

/// Jain's fairness index `(Σx)² / (n·Σx²)`.
///
/// Zero for an empty list or when every value is zero.
///
/// ```
/// use bussim::analysis::metrics::jain_fairness;
///
/// assert_eq!(jain_fairness(&[]), 0.0);
/// assert!((jain_fairness(&[3.0, 3.0, 3.0]) - 1.0).abs() < 1e-12);
/// assert!((jain_fairness(&[1.0, 0.0, 0.0, 0.0]) - 0.25).abs() < 1e-12);
/// ```
pub fn jain_fairness(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sum: f64 = values.iter().sum();
    let sum_sq: f64 = values.iter().map(|x| x * x).sum();
    if sum_sq <= 0.0 {
        return 0.0;
    }
    let index = (sum * sum) / (values.len() as f64 * sum_sq);
    index.clamp(0.0, 1.0)
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::substrate::FlowId;
    use proptest::prelude::*;
    use std::net::Ipv4Addr;

    const PORT: u16 = 50000;

    fn record(id: u32, port: u16, tx: u64, rx: u64) -> FlowRecord {
        FlowRecord {
            flow_id: FlowId(id),
            source: Ipv4Addr::new(10, 1, 1, id as u8),
            destination: Ipv4Addr::new(10, 1, 1, 7),
            destination_port: port,
            label: None,
            tx_packets: tx,
            rx_packets: rx,
            tx_bytes: tx * 92,
            rx_bytes: rx * 92,
            delay_sum: rx as f64 * 0.001,
            jitter_sum: rx.saturating_sub(1) as f64 * 0.0001,
        }
    }

    #[test]
    fn test_empty_records() {
        let report = compute_report(&[], PORT, Duration::from_secs(60));
        assert_eq!(report, MetricsReport::default());
        assert_eq!(report.hop_count, 1);
        assert_eq!(report.energy_joules, None);
        assert_eq!(report.collisions, None);
    }

    #[test]
    fn test_no_transmissions_means_zero_ratios() {
        let report = compute_report(&[record(1, PORT, 0, 0)], PORT, Duration::from_secs(60));
        assert_eq!(report.flow_count, 1);
        assert_eq!(report.packet_delivery_ratio, 0.0);
        assert_eq!(report.average_delay_s, 0.0);
        assert_eq!(report.average_jitter_s, 0.0);
        assert_eq!(report.packet_loss_ratio, 0.0);
        assert_eq!(report.fairness_index, 0.0);
    }

    #[test]
    fn test_other_ports_are_ignored() {
        let records = vec![record(1, PORT, 10, 10), record(2, 9, 1000, 0)];
        let report = compute_report(&records, PORT, Duration::from_secs(10));
        assert_eq!(report.flow_count, 1);
        assert_eq!(report.tx_packets, 10);
        assert_eq!(report.packet_delivery_ratio, 1.0);
        assert_eq!(report.packet_loss_ratio, 0.0);
    }

    #[test]
    fn test_aggregates() {
        let records = vec![record(1, PORT, 12, 12), record(2, PORT, 12, 6)];
        let report = compute_report(&records, PORT, Duration::from_secs(60));

        assert_eq!(report.tx_packets, 24);
        assert_eq!(report.rx_packets, 18);
        assert!((report.packet_delivery_ratio - 0.75).abs() < 1e-12);
        assert!((report.packet_loss_ratio - 0.25).abs() < 1e-12);
        assert!((report.average_delay_s - 0.001).abs() < 1e-12);
        // (11 + 5) * 0.1ms over 18 packets
        assert!((report.average_jitter_s - 0.0016 / 18.0).abs() < 1e-12);
        // 18 * 92 bytes * 8 / 60s
        assert!((report.aggregate_throughput_bps - 220.8).abs() < 1e-9);
        assert_eq!(report.goodput_bps, report.aggregate_throughput_bps);
        // Throughputs 2:1 give (3)^2 / (2 * 5) = 0.9
        assert!((report.fairness_index - 0.9).abs() < 1e-12);
        assert_eq!(report.flows[1].delivery_ratio, 0.5);
    }

    #[test]
    fn test_aggregate_throughput_uses_total_bytes() {
        // Per-flow throughputs of 1, 184 and 185 bytes over 3s do not sum to this exactly
        let records: Vec<FlowRecord> = [1u64, 184, 185]
            .iter()
            .enumerate()
            .map(|(i, rx)| FlowRecord {
                rx_bytes: *rx,
                ..record(i as u32 + 1, PORT, 1, 1)
            })
            .collect();
        let report = compute_report(&records, PORT, Duration::from_secs(3));
        assert_eq!(report.rx_bytes, 370);
        assert_eq!(report.aggregate_throughput_bps, 370.0 * 8.0 / 3.0);
        assert_eq!(report.goodput_bps, report.aggregate_throughput_bps);
    }

    #[test]
    fn test_zero_duration_gives_zero_throughput() {
        let report = compute_report(&[record(1, PORT, 5, 5)], PORT, Duration::ZERO);
        assert_eq!(report.aggregate_throughput_bps, 0.0);
        assert_eq!(report.packet_delivery_ratio, 1.0);
    }

    fn arb_records() -> impl Strategy<Value = Vec<FlowRecord>> {
        prop::collection::vec(
            (0u64..10_000, 0u64..10_000, prop::bool::ANY),
            0..12,
        )
        .prop_map(|flows| {
            flows
                .into_iter()
                .enumerate()
                .map(|(i, (tx, rx, on_port))| {
                    let port = if on_port { PORT } else { PORT + 1 };
                    record(i as u32 + 1, port, tx.max(rx), rx.min(tx.max(rx)))
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_ratios_are_bounded(records in arb_records(), secs in 1u64..120) {
            let report = compute_report(&records, PORT, Duration::from_secs(secs));
            prop_assert!((0.0..=1.0).contains(&report.packet_delivery_ratio));
            prop_assert!((0.0..=1.0).contains(&report.fairness_index));
            if report.tx_packets > 0 {
                prop_assert!((report.packet_loss_ratio - (1.0 - report.packet_delivery_ratio)).abs() < 1e-9);
            } else {
                prop_assert_eq!(report.packet_loss_ratio, 0.0);
            }
        }

        #[test]
        fn prop_aggregate_is_sum_of_flows(records in arb_records(), secs in 1u64..120) {
            let report = compute_report(&records, PORT, Duration::from_secs(secs));
            let sum: f64 = report.flows.iter().map(|f| f.throughput_bps).sum();
            prop_assert!((report.aggregate_throughput_bps - sum).abs() <= 1e-6 * sum.max(1.0));
        }

        #[test]
        fn prop_compute_is_idempotent(records in arb_records()) {
            let first = compute_report(&records, PORT, Duration::from_secs(60));
            let second = compute_report(&records, PORT, Duration::from_secs(60));
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_equal_shares_are_fair(value in 1.0f64..1e9, n in 1usize..50) {
            let values = vec![value; n];
            prop_assert!((jain_fairness(&values) - 1.0).abs() < 1e-9);
        }

        #[test]
        fn prop_single_dominant_flow(value in 1.0f64..1e9, n in 1usize..50) {
            let mut values = vec![0.0; n];
            values[0] = value;
            prop_assert!((jain_fairness(&values) - 1.0 / n as f64).abs() < 1e-9);
        }
    }
}
