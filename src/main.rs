use clap::{Args as ClapArgs, Parser, Subcommand};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use env_logger::Env;
use log::info;
use std::path::PathBuf;
use std::time::Duration;

use bussim::analysis::report::{
    format_flow_table, generate_json_report, generate_text_report, print_comparison, print_summary,
};
use bussim::config::AttackKind;
use bussim::config_loader::{apply_overrides, load_or_default, CliOverrides};
use bussim::orchestrator::{build_full_report, run_comparison, run_scenario};
use bussim::topology::build_bus_topology;
use bussim::utils::parse_duration;

/// Denial-of-service impact simulator for shared-medium sensor networks
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log filter (overrides RUST_LOG and the configuration file's log_level)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one scenario and print its metrics
    Run {
        #[command(flatten)]
        scenario: ScenarioArgs,

        /// Write the full report as JSON
        #[arg(long)]
        json: Option<PathBuf>,

        /// Write the full report as text
        #[arg(long)]
        text: Option<PathBuf>,

        /// Also print the per-flow table
        #[arg(long)]
        flows: bool,
    },
    /// Run the scenario with and without its attacker and compare
    Compare {
        #[command(flatten)]
        scenario: ScenarioArgs,
    },
    /// Print the node table without running
    Topology {
        #[command(flatten)]
        scenario: ScenarioArgs,
    },
}

#[derive(ClapArgs, Debug, Clone, Default)]
struct ScenarioArgs {
    /// Path to the scenario configuration YAML file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of benign sensors
    #[arg(long)]
    sensors: Option<u32>,

    /// Simulated duration (e.g. "60s", "2m")
    #[arg(long, value_parser = parse_duration_arg)]
    sim_duration: Option<Duration>,

    /// Attacker variant
    #[arg(long, value_enum)]
    attack: Option<AttackKind>,

    /// Attack window start
    #[arg(long, value_parser = parse_duration_arg)]
    attack_start: Option<Duration>,

    /// Attack window stop
    #[arg(long, value_parser = parse_duration_arg)]
    attack_stop: Option<Duration>,

    /// Seed for the medium's random backoff
    #[arg(long)]
    seed: Option<u64>,
}

impl ScenarioArgs {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            sensors: self.sensors,
            sim_duration: self.sim_duration,
            attack: self.attack,
            attack_start: self.attack_start,
            attack_stop: self.attack_stop,
            seed: self.seed,
        }
    }

    fn load(&self) -> Result<bussim::config::Config> {
        let mut config = load_or_default(self.config.as_deref())?;
        apply_overrides(&mut config, &self.overrides())?;
        Ok(config)
    }
}

fn parse_duration_arg(value: &str) -> Result<Duration, String> {
    parse_duration(value).map_err(|e| e.to_string())
}

/// Peek at the configuration's log level before logging is initialized
fn configured_log_level(args: &Args) -> Option<String> {
    let scenario = match &args.command {
        Command::Run { scenario, .. } | Command::Compare { scenario } | Command::Topology { scenario } => scenario,
    };
    let path = scenario.config.as_ref()?;
    let content = std::fs::read_to_string(path).ok()?;
    let config: bussim::config::Config = serde_yaml::from_str(&content).ok()?;
    config.general.log_level
}

/// Filter to apply on top of the environment: the CLI flag wins, then RUST_LOG,
/// then the configuration file
fn log_filter(
    cli: Option<String>,
    rust_log_set: bool,
    configured: impl FnOnce() -> Option<String>,
) -> Option<String> {
    if cli.is_some() {
        return cli;
    }
    if rust_log_set {
        return None;
    }
    configured()
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    let args = Args::parse();

    // Initialize logging with default filter level of "info"
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    let rust_log_set = std::env::var_os("RUST_LOG").is_some();
    if let Some(level) = log_filter(args.log_level.clone(), rust_log_set, || configured_log_level(&args)) {
        builder.parse_filters(&level);
    }
    builder.init();

    info!("Starting bussim v{}", env!("CARGO_PKG_VERSION"));

    match args.command {
        Command::Run {
            scenario,
            json,
            text,
            flows,
        } => {
            let config = scenario.load()?;
            let outcome = run_scenario(&config)?;
            print_summary(&outcome.report);
            if flows {
                println!("{}\n", format_flow_table(&outcome.report));
            }

            if json.is_some() || text.is_some() {
                let full = build_full_report(&config, &outcome);
                if let Some(path) = json {
                    generate_json_report(&full, &path)?;
                }
                if let Some(path) = text {
                    generate_text_report(&full, &path)?;
                }
            }
        }
        Command::Compare { scenario } => {
            let config = scenario.load()?;
            if config.attack.mode == AttackKind::None {
                log::warn!("No attacker configured; both runs will be benign");
            }
            let comparison = run_comparison(&config).wrap_err("Comparison failed")?;
            print_comparison(&comparison);
        }
        Command::Topology { scenario } => {
            let config = scenario.load()?;
            let topology = build_bus_topology(config.sensors.count, &config.network)
                .wrap_err("Failed to build bus topology")?;
            println!(
                "Bus segment {}/{} ({} nodes)",
                topology.network,
                topology.prefix_len,
                topology.nodes.len()
            );
            println!(
                "{:<8} {:<12} {:<15} {:>8} {:>8}  {}",
                "Node", "Role", "Address", "X", "Y", "Color"
            );
            for node in &topology.nodes {
                let (r, g, b) = node.role.color();
                println!(
                    "{:<8} {:<12} {:<15} {:>8.1} {:>8.1}  #{:02x}{:02x}{:02x}",
                    node.id.0,
                    node.role.description(),
                    node.address.to_string(),
                    node.position.x,
                    node.position.y,
                    r,
                    g,
                    b
                );
            }
        }
    }

    Ok(())
}
