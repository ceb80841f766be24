//! Attacker profiles.
//!
//! The attacker is an ordinary [`TrafficSource`](super::TrafficSource) with
//! an always-on duty cycle inside its window. Jamming and flooding are
//! alternative profiles, never active together.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::source::TrafficConfig;
use crate::utils::DataRate;

/// Parameters shared by both attacker profiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackParams {
    pub payload_size: u32,
    pub rate: DataRate,
    #[serde(with = "humantime_serde")]
    pub start: Duration,
    #[serde(with = "humantime_serde")]
    pub stop: Duration,
}

impl AttackParams {
    pub fn window(&self) -> (Duration, Duration) {
        (self.start, self.stop)
    }
}

/// The attacker's behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum AttackMode {
    /// Large packets at a very high rate, saturating the channel
    Jammer(AttackParams),
    /// Small packets at a high rate, exhausting per-packet capacity
    Flooder(AttackParams),
}

impl AttackMode {
    /// 1400-byte packets at 50Mb/s from 5s until 5s before the end
    pub fn jammer(sim_duration: Duration) -> Self {
        AttackMode::Jammer(AttackParams {
            payload_size: 1400,
            rate: DataRate::from_mbps(50),
            start: Duration::from_secs(5),
            stop: sim_duration.saturating_sub(Duration::from_secs(5)),
        })
    }

    /// 32-byte packets at 10Mb/s from 8s until 8s before the end
    pub fn flooder(sim_duration: Duration) -> Self {
        AttackMode::Flooder(AttackParams {
            payload_size: 32,
            rate: DataRate::from_mbps(10),
            start: Duration::from_secs(8),
            stop: sim_duration.saturating_sub(Duration::from_secs(8)),
        })
    }

    pub fn params(&self) -> &AttackParams {
        match self {
            AttackMode::Jammer(params) | AttackMode::Flooder(params) => params,
        }
    }

    pub fn params_mut(&mut self) -> &mut AttackParams {
        match self {
            AttackMode::Jammer(params) | AttackMode::Flooder(params) => params,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AttackMode::Jammer(_) => "jammer",
            AttackMode::Flooder(_) => "flooder",
        }
    }

    /// Traffic parameters of the attacker source: continuously active in its window
    pub fn traffic(&self) -> TrafficConfig {
        let params = self.params();
        TrafficConfig {
            active: params.stop.saturating_sub(params.start),
            idle: Duration::ZERO,
            payload_size: params.payload_size,
            rate: params.rate,
            start: params.start,
            stop: params.stop,
        }
    }
}
