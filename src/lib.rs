//! # Bussim - Denial-of-service impact simulator for shared-medium sensor networks
//!
//! This library simulates a single-segment bus network in which benign
//! sensors send periodic telemetry to a gateway while one attacker node
//! injects high-rate traffic, then measures how the attack degrades
//! quality of service.
//!
//! ## Overview
//!
//! A run builds the bus topology (N sensors, one attacker, one gateway),
//! derives an on/off traffic source per sending node, plays them out on a
//! discrete-event model of a carrier-sense medium, and reduces the per-flow
//! counters into a metrics report: throughput, packet delivery ratio, delay,
//! jitter, loss, goodput and Jain's fairness index.
//!
//! ## Architecture
//!
//! - `config`: Scenario configuration structures and validation
//! - `config_loader`: YAML loading and CLI overrides
//! - `topology`: Node roles, addressing and positions
//! - `traffic`: Sensor and attacker traffic sources
//! - `substrate`: Event scheduler, shared medium and flow accounting
//! - `analysis`: Metrics engine and report rendering
//! - `orchestrator`: Run controller and benign/attack comparison
//! - `utils`: Duration and data rate parsing, validation helpers
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use bussim::{config_loader, orchestrator};
//! use bussim::analysis::report::print_summary;
//! use std::path::Path;
//!
//! let config = config_loader::load_config(Path::new("scenario.yaml"))?;
//! let outcome = orchestrator::run_scenario(&config)?;
//! print_summary(&outcome.report);
//! # Ok::<(), color_eyre::eyre::Report>(())
//! ```
//!
//! ## Configuration Format
//!
//! ```yaml
//! general:
//!   sim_duration: "60s"
//!   seed: 1
//!
//! network:
//!   bandwidth: "100Mbps"
//!   delay: "6560ns"
//!
//! sensors:
//!   count: 5
//!   active: "100ms"
//!   idle: "5s"
//!   payload_size: 64
//!   rate: "8kbps"
//!
//! attack:
//!   mode: jammer        # jammer/flooder/none
//!   start: "5s"
//!   stop: "55s"
//! ```
//!
//! ## Error Handling
//!
//! Domain errors are typed (`ValidationError`, `TrafficError`,
//! `AddressError`, `ParseError`); application-level functions return
//! `color_eyre::Result` with context attached.

pub mod config;
pub mod config_loader;

pub mod analysis;
pub mod orchestrator;
pub mod substrate;
pub mod topology;
pub mod traffic;
pub mod utils;
