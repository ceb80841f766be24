//! On/off traffic sources.
//!
//! A [`TrafficSource`] alternates active and idle intervals, starting with
//! an active one, and emits fixed-size datagrams at a constant rate while
//! active. Sensors and attackers are both sources; only their parameters
//! differ. Emission times are a pure function of the parameters, so the
//! substrate can pull them lazily from an [`EmissionSchedule`].

use std::net::SocketAddrV4;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::topology::{Node, NodeId, Role};
use crate::utils::DataRate;

/// Declarative traffic parameters of one source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficConfig {
    #[serde(with = "humantime_serde")]
    pub active: Duration,
    /// Zero means the source never pauses inside its window
    #[serde(with = "humantime_serde")]
    pub idle: Duration,
    pub payload_size: u32,
    pub rate: DataRate,
    #[serde(with = "humantime_serde")]
    pub start: Duration,
    #[serde(with = "humantime_serde")]
    pub stop: Duration,
}

impl TrafficConfig {
    /// Reject parameters that cannot be scheduled
    pub fn validate(&self) -> Result<(), TrafficError> {
        if self.rate.is_zero() {
            return Err(TrafficError::NonPositiveRate);
        }
        if self.payload_size == 0 {
            return Err(TrafficError::EmptyPayload);
        }
        if self.start >= self.stop {
            return Err(TrafficError::InvertedWindow {
                start: self.start,
                stop: self.stop,
            });
        }
        if self.active.is_zero() {
            return Err(TrafficError::NoActivePhase);
        }
        Ok(())
    }

    /// Time between two datagrams while active
    pub fn send_interval(&self) -> Duration {
        self.rate.transmission_time(self.payload_size as u64)
    }

    /// True when the duty cycle degenerates to always-on
    pub fn is_continuous(&self) -> bool {
        self.idle.is_zero()
    }
}

/// Traffic parameter errors, detected before anything is scheduled
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrafficError {
    #[error("send rate must be greater than zero")]
    NonPositiveRate,
    #[error("payload size must be greater than zero")]
    EmptyPayload,
    #[error("active window is empty or inverted: start {start:?}, stop {stop:?}")]
    InvertedWindow { start: Duration, stop: Duration },
    #[error("active duration must be greater than zero")]
    NoActivePhase,
}

/// A source bound to one sender node and one destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficSource {
    pub node: NodeId,
    /// Label for reporting only; behavior depends on `config` alone
    pub role: Role,
    pub destination: SocketAddrV4,
    pub config: TrafficConfig,
}

impl TrafficSource {
    pub fn new(node: &Node, destination: SocketAddrV4, config: TrafficConfig) -> Result<Self, TrafficError> {
        config.validate()?;
        Ok(Self {
            node: node.id,
            role: node.role,
            destination,
            config,
        })
    }

    pub fn start(&self) -> Duration {
        self.config.start
    }

    pub fn stop(&self) -> Duration {
        self.config.stop
    }

    /// Every emission time of this source, in increasing order
    pub fn emissions(&self) -> EmissionSchedule {
        EmissionSchedule::new(self.config)
    }
}

/// Iterator over the emission times of a source.
///
/// Within an active interval beginning at `t0` datagrams leave at
/// `t0 + k * interval` for `k >= 1`, strictly before the interval ends and
/// strictly before `stop`.
#[derive(Debug, Clone)]
pub struct EmissionSchedule {
    config: TrafficConfig,
    interval: Duration,
    cycle_start: Duration,
    next: Duration,
}

impl EmissionSchedule {
    fn new(config: TrafficConfig) -> Self {
        let interval = config.send_interval();
        Self {
            config,
            interval,
            cycle_start: config.start,
            next: config.start.saturating_add(interval),
        }
    }

    fn active_end(&self) -> Duration {
        if self.config.is_continuous() {
            self.config.stop
        } else {
            self.cycle_start.saturating_add(self.config.active).min(self.config.stop)
        }
    }
}

impl Iterator for EmissionSchedule {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        // An unvalidated config with no active phase would never emit
        if self.config.active.is_zero() || self.interval.is_zero() {
            return None;
        }

        while self.cycle_start < self.config.stop {
            if self.next < self.active_end() {
                let emission = self.next;
                self.next = self.next.saturating_add(self.interval);
                return Some(emission);
            }
            if self.config.is_continuous() {
                break;
            }
            self.cycle_start = self
                .cycle_start
                .saturating_add(self.config.active + self.config.idle);
            self.next = self.cycle_start.saturating_add(self.interval);
        }

        self.cycle_start = self.config.stop;
        None
    }
}
