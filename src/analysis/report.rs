//! Report generation for simulation runs.
//!
//! Generates the ten-line metrics block printed at run end, a JSON report,
//! a per-flow table and the benign/attack comparison.

use std::fs;
use std::path::Path;

use color_eyre::eyre::{Context, Result};

use super::types::*;

const UNMEASURED: &str = "n/a (unmeasured)";

/// The ten labeled metric lines, preceded by the header
pub fn format_metrics(report: &MetricsReport) -> String {
    let energy = report
        .energy_joules
        .map(|joules| format!("{} J", joules))
        .unwrap_or_else(|| UNMEASURED.to_string());
    let collisions = report
        .collisions
        .map(|count| count.to_string())
        .unwrap_or_else(|| UNMEASURED.to_string());

    let lines = [
        "==== Performance Metrics ====".to_string(),
        format!("1. Aggregate Throughput: {:.2} bps", report.aggregate_throughput_bps),
        format!("2. Packet Delivery Ratio: {:.2} %", report.packet_delivery_ratio * 100.0),
        format!("3. Average End-to-End Delay: {:.6} s", report.average_delay_s),
        format!("4. Average Jitter: {:.6} s", report.average_jitter_s),
        format!("5. Packet Loss Ratio: {:.2} %", report.packet_loss_ratio * 100.0),
        format!("6. Goodput: {:.2} bps", report.goodput_bps),
        format!("7. Energy Consumption: {}", energy),
        format!("8. Collision Count: {}", collisions),
        format!("9. Average Hop Count: {}", report.hop_count),
        format!("10. Fairness Index: {:.4}", report.fairness_index),
    ];
    lines.join("\n")
}

/// Per-flow breakdown, one row per flow that reached the metrics engine
pub fn format_flow_table(report: &MetricsReport) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push(format!(
        "{:<8} {:<12} {:<15} {:>10} {:>10} {:>14} {:>8}",
        "Flow", "Source", "Address", "Tx", "Rx", "Throughput", "PDR"
    ));
    lines.push("-".repeat(83));
    for flow in &report.flows {
        lines.push(format!(
            "{:<8} {:<12} {:<15} {:>10} {:>10} {:>10.1} bps {:>7.2}%",
            flow.flow_id.0,
            flow.label.as_deref().unwrap_or("-"),
            flow.source.to_string(),
            flow.tx_packets,
            flow.rx_packets,
            flow.throughput_bps,
            flow.delivery_ratio * 100.0
        ));
    }
    lines.join("\n")
}

/// Generate JSON report
pub fn generate_json_report(report: &FullReport, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report to JSON")?;

    fs::write(output_path, json)
        .with_context(|| format!("Failed to write JSON report to {}", output_path.display()))?;

    log::info!("JSON report written to {}", output_path.display());
    Ok(())
}

/// Generate human-readable text report
pub fn generate_text_report(report: &FullReport, output_path: &Path) -> Result<()> {
    let mut lines: Vec<String> = Vec::new();

    lines.push("=".repeat(83));
    lines.push("                         BUS SIMULATION REPORT".to_string());
    lines.push("=".repeat(83));
    lines.push(String::new());

    let meta = &report.metadata;
    lines.push(format!("Generated: {}", meta.generated_at));
    lines.push(format!("Sensors: {}", meta.sensor_count));
    lines.push(format!("Attack: {}", meta.attack_mode));
    if let Some((start, stop)) = meta.attack_window_s {
        lines.push(format!("Attack Window: {:.3}s - {:.3}s", start, stop));
    }
    lines.push(format!("Simulated Duration: {:.3}s", meta.sim_duration_s));
    lines.push(format!("Seed: {}", meta.seed));
    lines.push(String::new());

    lines.push(format_metrics(&report.metrics));
    lines.push(String::new());

    if !report.metrics.flows.is_empty() {
        lines.push(format_flow_table(&report.metrics));
        lines.push(String::new());
    }

    lines.push("=".repeat(83));

    let content = lines.join("\n");
    fs::write(output_path, content)
        .with_context(|| format!("Failed to write text report to {}", output_path.display()))?;

    log::info!("Text report written to {}", output_path.display());
    Ok(())
}

/// Side-by-side view of the baseline and attacked runs
pub fn format_comparison(comparison: &ComparisonReport) -> String {
    let base = &comparison.baseline;
    let attacked = &comparison.attacked;
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!("==== Impact of {} ====", comparison.attack_mode));
    lines.push(format!("{:<26} {:>16} {:>16} {:>16}", "Metric", "Baseline", "Attacked", "Delta"));
    lines.push(format!(
        "{:<26} {:>16.2} {:>16.2} {:>+16.2}",
        "Packet Delivery Ratio (%)",
        base.packet_delivery_ratio * 100.0,
        attacked.packet_delivery_ratio * 100.0,
        comparison.pdr_delta_pct()
    ));
    lines.push(format!(
        "{:<26} {:>16.6} {:>16.6} {:>+16.6}",
        "Average Delay (s)",
        base.average_delay_s,
        attacked.average_delay_s,
        comparison.delay_delta_s()
    ));
    lines.push(format!(
        "{:<26} {:>16.6} {:>16.6} {:>+16.6}",
        "Average Jitter (s)",
        base.average_jitter_s,
        attacked.average_jitter_s,
        comparison.jitter_delta_s()
    ));
    lines.push(format!(
        "{:<26} {:>16.2} {:>16.2} {:>+16.2}",
        "Throughput (bps)",
        base.aggregate_throughput_bps,
        attacked.aggregate_throughput_bps,
        comparison.throughput_delta_bps()
    ));
    lines.push(format!(
        "{:<26} {:>16.4} {:>16.4} {:>+16.4}",
        "Fairness Index",
        base.fairness_index,
        attacked.fairness_index,
        attacked.fairness_index - base.fairness_index
    ));
    lines.join("\n")
}

/// Print the metrics block to stdout
pub fn print_summary(report: &MetricsReport) {
    println!("\n{}\n", format_metrics(report));
}

/// Print both reports followed by the delta table
pub fn print_comparison(comparison: &ComparisonReport) {
    println!("\n--- Baseline (no attacker) ---");
    println!("{}", format_metrics(&comparison.baseline));
    println!("\n--- With {} ---", comparison.attack_mode);
    println!("{}", format_metrics(&comparison.attacked));
    println!("\n{}\n", format_comparison(comparison));
}
