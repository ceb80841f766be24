//! Carrier-sense shared medium.
//!
//! One channel is shared by every device on the segment. A frame occupies
//! the channel for its serialization time plus the propagation delay; a
//! device that senses a busy channel backs off a random number of slots and
//! tries again. Collisions are not modeled, carrier sense is perfect.

use std::collections::VecDeque;
use std::time::Duration;

use rand::Rng;

use crate::config::NetworkConfig;
use crate::utils::DataRate;

/// Ethernet header and trailer added to every IP packet on the wire
pub const FRAME_OVERHEAD_BYTES: u64 = 18;

/// Physical parameters of the medium
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediumConfig {
    pub bandwidth: DataRate,
    pub delay: Duration,
    /// Transmit queue length of each device, in packets
    pub queue_capacity: usize,
}

impl From<&NetworkConfig> for MediumConfig {
    fn from(network: &NetworkConfig) -> Self {
        Self {
            bandwidth: network.bandwidth,
            delay: network.delay,
            queue_capacity: network.queue_capacity,
        }
    }
}

impl MediumConfig {
    /// Time the channel is held by a frame carrying `ip_bytes`
    pub fn serialization_time(&self, ip_bytes: u64) -> Duration {
        self.bandwidth.transmission_time(ip_bytes + FRAME_OVERHEAD_BYTES)
    }
}

/// Truncated binary exponential backoff
#[derive(Debug, Clone)]
pub struct Backoff {
    pub slot_time: Duration,
    pub min_slots: u32,
    pub max_slots: u32,
    /// Cap on the exponent of the contention window
    pub ceiling: u32,
    pub max_retries: u32,
    retries: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            slot_time: Duration::from_micros(1),
            min_slots: 1,
            max_slots: 1000,
            ceiling: 10,
            max_retries: 1000,
            retries: 0,
        }
    }
}

impl Backoff {
    pub fn max_retries_reached(&self) -> bool {
        self.retries >= self.max_retries
    }

    pub fn reset(&mut self) {
        self.retries = 0;
    }

    /// Draw the next wait and count the retry
    pub fn next_delay<R: Rng>(&mut self, rng: &mut R) -> Duration {
        let exponent = self.retries.min(self.ceiling);
        let window = ((1u32 << exponent) - 1).min(self.max_slots);
        let upper = window.max(self.min_slots);
        let slots = rng.gen_range(self.min_slots..=upper);
        self.retries += 1;
        self.slot_time * slots
    }
}

/// State of the shared channel, seen through carrier sense
#[derive(Debug, Clone, Default)]
pub struct Channel {
    busy_until: Duration,
}

impl Channel {
    pub fn is_idle(&self, now: Duration) -> bool {
        now >= self.busy_until
    }

    /// Occupy the channel from `now` for `hold`
    pub fn occupy(&mut self, now: Duration, hold: Duration) {
        self.busy_until = now + hold;
    }

    pub fn busy_until(&self) -> Duration {
        self.busy_until
    }
}

/// What a device is doing with the head of its queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Ready,
    /// A retry is already scheduled
    Backoff,
    Transmitting,
}

/// Network interface of one node: a DropTail queue plus backoff state
#[derive(Debug)]
pub struct Device<P> {
    queue: VecDeque<P>,
    capacity: usize,
    pub state: DeviceState,
    pub backoff: Backoff,
}

impl<P> Device<P> {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            state: DeviceState::Ready,
            backoff: Backoff::default(),
        }
    }

    /// Append to the queue; a full queue hands the packet back
    pub fn enqueue(&mut self, packet: P) -> Result<(), P> {
        if self.queue.len() >= self.capacity {
            return Err(packet);
        }
        self.queue.push_back(packet);
        Ok(())
    }

    pub fn dequeue(&mut self) -> Option<P> {
        self.queue.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Medium-level counters for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MediumStats {
    pub frames_sent: u64,
    pub backoffs: u64,
    pub queue_drops: u64,
    pub retry_drops: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_serialization_time_includes_frame_overhead() {
        let medium = MediumConfig::from(&NetworkConfig::default());
        // 1428 IP bytes + 18 = 1446 bytes at 100Mbps
        assert_eq!(medium.serialization_time(1428), Duration::from_nanos(115_680));
    }

    #[test]
    fn test_backoff_window_grows_and_caps() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut backoff = Backoff::default();

        // First retry: window clamps up to the minimum of one slot
        assert_eq!(backoff.next_delay(&mut rng), Duration::from_micros(1));
        assert_eq!(backoff.retries, 1);

        for _ in 0..50 {
            let delay = backoff.next_delay(&mut rng);
            assert!(delay >= Duration::from_micros(1));
            assert!(delay <= Duration::from_micros(1000));
        }
        assert!(!backoff.max_retries_reached());

        backoff.reset();
        assert_eq!(backoff.retries, 0);
    }

    #[test]
    fn test_backoff_gives_up() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut backoff = Backoff {
            max_retries: 3,
            ..Backoff::default()
        };
        for _ in 0..3 {
            backoff.next_delay(&mut rng);
        }
        assert!(backoff.max_retries_reached());
    }

    #[test]
    fn test_channel_carrier_sense() {
        let mut channel = Channel::default();
        assert!(channel.is_idle(Duration::ZERO));
        channel.occupy(Duration::from_micros(10), Duration::from_micros(5));
        assert!(!channel.is_idle(Duration::from_micros(14)));
        assert!(channel.is_idle(Duration::from_micros(15)));
        assert_eq!(channel.busy_until(), Duration::from_micros(15));
    }

    #[test]
    fn test_droptail_queue() {
        let mut device = Device::new(2);
        assert!(device.enqueue(1).is_ok());
        assert!(device.enqueue(2).is_ok());
        assert_eq!(device.enqueue(3), Err(3));
        assert_eq!(device.dequeue(), Some(1));
        assert!(device.enqueue(4).is_ok());
    }
}
