//! Configuration validation utilities.
//!
//! This module provides validation functions for configuration
//! parameters and consistency checks.

use std::net::Ipv4Addr;
use std::time::Duration;

use crate::topology::addressing::host_capacity;

/// Validate that the bus topology fits in the configured subnet
///
/// The bus holds `sensor_count` sensors plus one attacker and one gateway,
/// each needing a host address.
///
/// # Examples
/// ```
/// use std::net::Ipv4Addr;
/// use bussim::utils::validation::validate_topology_size;
///
/// let base = Ipv4Addr::new(10, 1, 1, 0);
/// assert!(validate_topology_size(5, base, 24).is_ok());
/// assert!(validate_topology_size(253, base, 24).is_err()); // 255 nodes do not fit in a /24
/// assert!(validate_topology_size(1, base, 31).is_err());
/// ```
pub fn validate_topology_size(sensor_count: u32, base: Ipv4Addr, prefix_len: u8) -> Result<(), String> {
    if !(1..=30).contains(&prefix_len) {
        return Err(format!("prefix_len must be between 1 and 30, got {}", prefix_len));
    }

    let mask = u32::MAX << (32 - prefix_len);
    if u32::from(base) & !mask != 0 {
        log::warn!(
            "base_address {} has host bits set for /{}; addresses are assigned from the network {}",
            base,
            prefix_len,
            Ipv4Addr::from(u32::from(base) & mask)
        );
    }

    let required = sensor_count as u64 + 2;
    let available = host_capacity(prefix_len);
    if required > available {
        return Err(format!(
            "{} nodes ({} sensors, attacker, gateway) do not fit in a /{} subnet with {} host addresses",
            required, sensor_count, prefix_len, available
        ));
    }

    Ok(())
}

/// Validate an attacker window against the run length
///
/// The window must start before the run ends. A window that is not a strict
/// subset of the run (starting at zero or stopping at or after the end) is
/// accepted with a warning, since no pre- or post-attack baseline will be
/// observable.
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use bussim::utils::validation::validate_attack_window;
///
/// let sim = Duration::from_secs(60);
/// assert!(validate_attack_window(Duration::from_secs(5), Duration::from_secs(55), sim).is_ok());
/// assert!(validate_attack_window(Duration::from_secs(70), Duration::from_secs(80), sim).is_err());
/// ```
pub fn validate_attack_window(start: Duration, stop: Duration, sim_duration: Duration) -> Result<(), String> {
    if start >= stop {
        return Err(format!(
            "attack window start {:?} must be before stop {:?}",
            start, stop
        ));
    }

    if start >= sim_duration {
        return Err(format!(
            "attack window starts at {:?}, at or after the end of the run ({:?})",
            start, sim_duration
        ));
    }

    if start.is_zero() || stop >= sim_duration {
        log::warn!(
            "Attack window [{:?}, {:?}) is not a strict subset of the run [0, {:?}); \
             pre-attack or post-attack baselines will not be observable",
            start,
            stop,
            sim_duration
        );
    }

    Ok(())
}
