use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::time::Duration;

use crate::traffic::{AttackMode, AttackParams, TrafficConfig};
use crate::utils::DataRate;

/// Attacker variant selected in the configuration
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AttackKind {
    /// No attacker traffic (benign baseline)
    None,
    /// Large packets at very high rate, saturating the channel
    #[default]
    Jammer,
    /// Small packets at high rate, exhausting per-packet capacity
    Flooder,
}

impl std::fmt::Display for AttackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttackKind::None => write!(f, "none"),
            AttackKind::Jammer => write!(f, "jammer"),
            AttackKind::Flooder => write!(f, "flooder"),
        }
    }
}

/// Complete scenario configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub sink: SinkConfig,
    #[serde(default)]
    pub sensors: SensorConfig,
    #[serde(default)]
    pub attack: AttackConfig,
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        // Validate general settings
        if self.general.sim_duration.is_zero() {
            return Err(ValidationError::InvalidGeneral(
                "sim_duration must be greater than zero".to_string(),
            ));
        }
        if self
            .general
            .sim_duration
            .checked_add(self.general.stop_margin)
            .is_none()
        {
            return Err(ValidationError::InvalidGeneral(format!(
                "sim_duration {:?} plus stop_margin {:?} overflows",
                self.general.sim_duration, self.general.stop_margin
            )));
        }

        // Validate the medium
        if self.network.bandwidth.is_zero() {
            return Err(ValidationError::InvalidNetwork(
                "bandwidth must be greater than zero".to_string(),
            ));
        }
        if self.network.queue_capacity == 0 {
            return Err(ValidationError::InvalidNetwork(
                "queue_capacity must be at least one packet".to_string(),
            ));
        }
        if !(self.network.spacing.is_finite() && self.network.spacing >= 0.0) {
            return Err(ValidationError::InvalidNetwork(format!(
                "spacing must be a non-negative number, got {}",
                self.network.spacing
            )));
        }
        crate::utils::validate_topology_size(
            self.sensors.count,
            self.network.base_address,
            self.network.prefix_len,
        )
        .map_err(ValidationError::InvalidNetwork)?;

        // Validate sensor traffic shape
        if self.sensors.payload_size == 0 {
            return Err(ValidationError::InvalidSensors(
                "payload_size must be greater than zero".to_string(),
            ));
        }
        if self.sensors.rate.is_zero() {
            return Err(ValidationError::InvalidSensors(
                "rate must be greater than zero".to_string(),
            ));
        }
        if self.sensors.active.is_zero() {
            return Err(ValidationError::InvalidSensors(
                "active duration must be greater than zero".to_string(),
            ));
        }
        if self.sensors.count > 0 {
            let last = self.sensors.count - 1;
            match self.checked_sensor_start(last) {
                None => {
                    return Err(ValidationError::InvalidSensors(format!(
                        "start {:?} plus {} x stagger {:?} overflows",
                        self.sensors.start, last, self.sensors.stagger
                    )));
                }
                Some(start) if start >= self.general.sim_duration => {
                    return Err(ValidationError::InvalidSensors(format!(
                        "last sensor would start at {:?}, after the run ends at {:?}",
                        start, self.general.sim_duration
                    )));
                }
                Some(_) => {}
            }
        }

        // Validate attacker settings
        if self.attack.mode != AttackKind::None {
            if self.attack.payload_size == Some(0) {
                return Err(ValidationError::InvalidAttack(
                    "payload_size must be greater than zero".to_string(),
                ));
            }
            if self.attack.rate.is_some_and(DataRate::is_zero) {
                return Err(ValidationError::InvalidAttack(
                    "rate must be greater than zero".to_string(),
                ));
            }
            if let Some(mode) = self.attack_mode_unchecked() {
                let (start, stop) = mode.params().window();
                crate::utils::validate_attack_window(start, stop, self.general.sim_duration)
                    .map_err(ValidationError::InvalidAttack)?;
            } else if let Some((start, stop)) = self.attack_window() {
                if start > stop {
                    return Err(ValidationError::InvalidAttack(format!(
                        "attack window is inverted: start {:?} is after stop {:?}",
                        start, stop
                    )));
                }
            }
        }

        Ok(())
    }

    /// Start time of sensor `index`, staggered to avoid synchronized bursts
    pub fn sensor_start(&self, index: u32) -> Duration {
        self.sensors
            .start
            .saturating_add(self.sensors.stagger.saturating_mul(index))
    }

    fn checked_sensor_start(&self, index: u32) -> Option<Duration> {
        self.sensors
            .stagger
            .checked_mul(index)
            .and_then(|offset| self.sensors.start.checked_add(offset))
    }

    /// Traffic parameters for sensor `index`
    pub fn sensor_traffic(&self, index: u32) -> TrafficConfig {
        TrafficConfig {
            active: self.sensors.active,
            idle: self.sensors.idle,
            payload_size: self.sensors.payload_size,
            rate: self.sensors.rate,
            start: self.sensor_start(index),
            stop: self.general.sim_duration,
        }
    }

    /// Effective attack window after defaults are applied, if an attacker is configured
    pub fn attack_window(&self) -> Option<(Duration, Duration)> {
        let sim = self.general.sim_duration;
        let defaults = match self.attack.mode {
            AttackKind::None => return None,
            AttackKind::Jammer => AttackMode::jammer(sim),
            AttackKind::Flooder => AttackMode::flooder(sim),
        };
        let (default_start, default_stop) = defaults.params().window();
        Some((
            self.attack.start.unwrap_or(default_start),
            self.attack.stop.unwrap_or(default_stop),
        ))
    }

    /// Resolve the attacker into its tagged variant.
    ///
    /// Returns `None` for a benign-only run: either no attacker is configured
    /// or its window has zero duration.
    pub fn attack_mode(&self) -> Result<Option<AttackMode>, ValidationError> {
        if let Some((start, stop)) = self.attack_window() {
            if start > stop {
                return Err(ValidationError::InvalidAttack(format!(
                    "attack window is inverted: start {:?} is after stop {:?}",
                    start, stop
                )));
            }
        }
        Ok(self.attack_mode_unchecked())
    }

    fn attack_mode_unchecked(&self) -> Option<AttackMode> {
        let (start, stop) = self.attack_window()?;
        if start >= stop {
            return None;
        }

        let sim = self.general.sim_duration;
        let mut mode = match self.attack.mode {
            AttackKind::None => return None,
            AttackKind::Jammer => AttackMode::jammer(sim),
            AttackKind::Flooder => AttackMode::flooder(sim),
        };

        let params: &mut AttackParams = mode.params_mut();
        if let Some(payload_size) = self.attack.payload_size {
            params.payload_size = payload_size;
        }
        if let Some(rate) = self.attack.rate {
            params.rate = rate;
        }
        params.start = start;
        params.stop = stop;

        Some(mode)
    }

    /// Absolute simulated time at which the run controller halts the clock
    pub fn run_end(&self) -> Duration {
        self.general.sim_duration.saturating_add(self.general.stop_margin)
    }
}

/// Run-wide settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct GeneralConfig {
    /// Simulated run length; also the throughput denominator
    #[serde(with = "humantime_serde")]
    pub sim_duration: Duration,
    /// Extra simulated time after `sim_duration` so in-flight packets land
    #[serde(with = "humantime_serde")]
    pub stop_margin: Duration,
    /// Seed for the medium's random backoff
    pub seed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

/// Shared medium and addressing
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    pub bandwidth: DataRate,
    #[serde(with = "humantime_serde")]
    pub delay: Duration,
    /// Transmit queue length of every device, in packets
    pub queue_capacity: usize,
    pub base_address: Ipv4Addr,
    pub prefix_len: u8,
    /// Distance between neighbouring nodes on the x axis
    pub spacing: f64,
}

/// Gateway sink settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SinkConfig {
    pub port: u16,
}

/// Benign sensor population and traffic shape
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SensorConfig {
    pub count: u32,
    #[serde(with = "humantime_serde")]
    pub active: Duration,
    #[serde(with = "humantime_serde")]
    pub idle: Duration,
    pub payload_size: u32,
    pub rate: DataRate,
    /// Start time of the first sensor
    #[serde(with = "humantime_serde")]
    pub start: Duration,
    /// Added to the start time for each following sensor
    #[serde(with = "humantime_serde")]
    pub stagger: Duration,
}

/// Attacker selection; unset fields fall back to the mode's defaults
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct AttackConfig {
    pub mode: AttackKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<DataRate>,
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub start: Option<Duration>,
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub stop: Option<Duration>,
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid general configuration: {0}")]
    InvalidGeneral(String),
    #[error("Invalid network configuration: {0}")]
    InvalidNetwork(String),
    #[error("Invalid sensor configuration: {0}")]
    InvalidSensors(String),
    #[error("Invalid attack configuration: {0}")]
    InvalidAttack(String),
}

/// Default implementations
impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            sim_duration: Duration::from_secs(60),
            stop_margin: Duration::from_secs(1),
            seed: 1,
            log_level: None,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bandwidth: DataRate::from_mbps(100),
            delay: Duration::from_nanos(6560),
            queue_capacity: 100,
            base_address: Ipv4Addr::new(10, 1, 1, 0),
            prefix_len: 24,
            spacing: 10.0,
        }
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self { port: 50000 }
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            count: 5,
            active: Duration::from_millis(100),
            idle: Duration::from_secs(5),
            payload_size: 64,
            rate: DataRate::from_kbps(8),
            start: Duration::from_secs(1),
            stagger: Duration::from_millis(200),
        }
    }
}
