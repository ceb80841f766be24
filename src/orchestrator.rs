//! Run controller.
//!
//! This module coordinates one simulation run: topology, traffic plan,
//! substrate provisioning, scheduling, clock advance and metric collection.
//! Comparisons run the benign baseline and the attacked scenario side by side.

use color_eyre::eyre::{eyre, Result, WrapErr};
use log::{debug, info};

use crate::analysis::{
    compute_report, report::format_flow_table, ComparisonReport, FlowRecord, FullReport, MetricsReport,
    ReportMetadata,
};
use crate::config::{AttackKind, Config};
use crate::substrate::{BusSubstrate, MediumConfig, MediumStats, ScheduledEvent, SinkStats, Substrate};
use crate::topology::{build_bus_topology, Topology};
use crate::traffic::{plan_sources, AttackMode, TrafficSource};

/// Everything a finished run leaves behind
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub topology: Topology,
    pub attack: Option<AttackMode>,
    pub flow_records: Vec<FlowRecord>,
    pub sink: Option<SinkStats>,
    pub medium: MediumStats,
    pub report: MetricsReport,
}

/// Run one scenario to completion and compute its metrics
pub fn run_scenario(config: &Config) -> Result<RunOutcome> {
    config.validate().wrap_err("Configuration rejected")?;

    let topology = build_bus_topology(config.sensors.count, &config.network)
        .wrap_err("Failed to build bus topology")?;
    info!(
        "Built bus topology with {} sensors on {}/{}",
        topology.sensor_count(),
        topology.network,
        topology.prefix_len
    );

    let attack = config.attack_mode()?;
    let sources = plan_sources(&topology, config, attack.as_ref())
        .wrap_err("Failed to plan traffic sources")?;

    let mut substrate = BusSubstrate::provision(
        &topology,
        MediumConfig::from(&config.network),
        config.general.seed,
    );
    drive(&mut substrate, &topology, config, sources)?;

    let flow_records = collect_flow_records(&substrate, &topology);
    let report = compute_report(&flow_records, config.sink.port, config.general.sim_duration);
    let medium = substrate.medium_stats();

    info!(
        "Run finished at {:?}: {} flows, {} events, {} frames, {} queue drops, {} retry drops",
        substrate.now(),
        flow_records.len(),
        substrate.events_processed(),
        medium.frames_sent,
        medium.queue_drops,
        medium.retry_drops
    );
    debug!("Per-flow results:\n{}", format_flow_table(&report));

    Ok(RunOutcome {
        topology,
        attack,
        flow_records,
        sink: substrate.sink_stats(),
        medium,
        report,
    })
}

/// Install the sink and sources on `substrate`, then run the clock to the end
pub fn drive<S: Substrate>(
    substrate: &mut S,
    topology: &Topology,
    config: &Config,
    sources: Vec<TrafficSource>,
) -> Result<()> {
    let gateway = topology
        .gateway()
        .ok_or_else(|| eyre!("Topology has no gateway node"))?;
    let end = config.run_end();

    substrate
        .install_sink(gateway.id, config.sink.port)
        .wrap_err("Failed to install sink")?;
    substrate.schedule(ScheduledEvent::StartSink, std::time::Duration::ZERO);
    substrate.schedule(ScheduledEvent::StopSink, end);

    let count = sources.len();
    for source in sources {
        let label = source.role.description();
        let (start, stop) = (source.start(), source.stop());
        let id = substrate
            .install_source(source)
            .wrap_err_with(|| format!("Failed to install source for {}", label))?;
        substrate.schedule(ScheduledEvent::StartSource(id), start);
        substrate.schedule(ScheduledEvent::StopSource(id), stop);
    }
    info!("Installed {} traffic sources, running until {:?}", count, end);

    substrate.advance_to(end);
    substrate.stop();
    Ok(())
}

/// Join the substrate's flow counters with the classifier and node labels
pub fn collect_flow_records<S: Substrate>(substrate: &S, topology: &Topology) -> Vec<FlowRecord> {
    substrate
        .flow_stats()
        .into_iter()
        .filter_map(|(flow_id, stats)| {
            let Some(tuple) = substrate.classify(flow_id) else {
                log::warn!("{} has counters but no five-tuple, skipping", flow_id);
                return None;
            };
            let label = topology
                .node_by_address(tuple.source)
                .map(|node| node.role.description());
            Some(FlowRecord {
                flow_id,
                source: tuple.source,
                destination: tuple.destination,
                destination_port: tuple.destination_port,
                label,
                tx_packets: stats.tx_packets,
                rx_packets: stats.rx_packets,
                tx_bytes: stats.tx_bytes,
                rx_bytes: stats.rx_bytes,
                delay_sum: stats.delay_sum.as_secs_f64(),
                jitter_sum: stats.jitter_sum.as_secs_f64(),
            })
        })
        .collect()
}

/// Wrap a finished run with metadata for the JSON and text reports
pub fn build_full_report(config: &Config, outcome: &RunOutcome) -> FullReport {
    let attack_mode = outcome
        .attack
        .as_ref()
        .map(|mode| mode.name().to_string())
        .unwrap_or_else(|| AttackKind::None.to_string());
    let attack_window_s = outcome.attack.as_ref().map(|mode| {
        let (start, stop) = mode.params().window();
        (start.as_secs_f64(), stop.as_secs_f64())
    });

    FullReport {
        metadata: ReportMetadata {
            generated_at: chrono::Utc::now().to_rfc3339(),
            sensor_count: config.sensors.count,
            attack_mode,
            attack_window_s,
            sim_duration_s: config.general.sim_duration.as_secs_f64(),
            seed: config.general.seed,
        },
        metrics: outcome.report.clone(),
        flow_records: outcome.flow_records.clone(),
    }
}

/// Run the benign baseline and the attacked scenario in parallel
pub fn run_comparison(config: &Config) -> Result<ComparisonReport> {
    let mut baseline_config = config.clone();
    baseline_config.attack.mode = AttackKind::None;

    let (baseline, attacked) = rayon::join(
        || run_scenario(&baseline_config),
        || run_scenario(config),
    );
    let baseline = baseline.wrap_err("Baseline run failed")?;
    let attacked = attacked.wrap_err("Attacked run failed")?;

    let attack_mode = attacked
        .attack
        .as_ref()
        .map(|mode| mode.name().to_string())
        .unwrap_or_else(|| AttackKind::None.to_string());

    Ok(ComparisonReport {
        baseline: baseline.report,
        attacked: attacked.report,
        attack_mode,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn short_config() -> Config {
        let mut config = Config::default();
        config.general.sim_duration = Duration::from_secs(12);
        config.sensors.count = 3;
        config.attack.start = Some(Duration::from_secs(3));
        config.attack.stop = Some(Duration::from_secs(9));
        config
    }

    #[test]
    fn test_flow_records_are_labeled() {
        let outcome = run_scenario(&short_config()).unwrap();
        assert_eq!(outcome.flow_records.len(), 4);
        assert_eq!(outcome.flow_records[0].flow_id.0, 1);

        let labels: Vec<String> = outcome
            .flow_records
            .iter()
            .filter_map(|r| r.label.clone())
            .collect();
        assert!(labels.contains(&"Sensor-0".to_string()));
        assert!(labels.contains(&"Attacker".to_string()));

        let gateway = outcome.topology.gateway().unwrap().address;
        assert!(outcome.flow_records.iter().all(|r| r.destination == gateway));
        let sink = outcome.sink.unwrap();
        assert_eq!(sink.received_packets, outcome.report.rx_packets);
    }

    #[test]
    fn test_invalid_config_produces_no_report() {
        let mut config = short_config();
        config.attack.start = Some(Duration::from_secs(9));
        config.attack.stop = Some(Duration::from_secs(3));
        let err = run_scenario(&config).unwrap_err();
        assert!(format!("{:?}", err).contains("inverted"));
    }

    #[test]
    fn test_full_report_metadata() {
        let config = short_config();
        let outcome = run_scenario(&config).unwrap();
        let full = build_full_report(&config, &outcome);
        assert_eq!(full.metadata.sensor_count, 3);
        assert_eq!(full.metadata.attack_mode, "jammer");
        assert_eq!(full.metadata.attack_window_s, Some((3.0, 9.0)));
        assert_eq!(full.metrics, outcome.report);
    }

    #[test]
    fn test_comparison_uses_benign_baseline() {
        let comparison = run_comparison(&short_config()).unwrap();
        assert_eq!(comparison.attack_mode, "jammer");
        assert_eq!(comparison.baseline.flow_count, 3);
        assert_eq!(comparison.attacked.flow_count, 4);
        assert!(comparison.baseline.packet_delivery_ratio > 0.99);
    }
}
