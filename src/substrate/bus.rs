//! In-process bus segment.
//!
//! Every node owns one [`Device`] on a single shared [`Channel`]. Sources
//! hand datagrams to their node's device, the device contends for the
//! channel with carrier sense and backoff, and the frame reaches the
//! destination node after its serialization time plus the propagation
//! delay. The flow monitor observes datagrams at the IP layer on both ends.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::time::Duration;

use log::{debug, info, trace, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::flow_monitor::{FiveTuple, FlowId, FlowMonitor, FlowStats, PROTOCOL_UDP};
use super::medium::{Channel, Device, DeviceState, MediumConfig, MediumStats};
use super::scheduler::Scheduler;
use super::{ScheduledEvent, SinkStats, SourceId, Substrate, SubstrateError};
use crate::topology::{NodeId, Topology};
use crate::traffic::{EmissionSchedule, TrafficSource};

/// IPv4 plus UDP headers
pub const IP_UDP_OVERHEAD_BYTES: u64 = 28;

/// First ephemeral port handed to a sending socket
pub const EPHEMERAL_PORT: u16 = 49153;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Packet {
    flow: FlowId,
    destination: Ipv4Addr,
    destination_port: u16,
    payload_bytes: u64,
    sent_at: Duration,
}

impl Packet {
    fn ip_bytes(&self) -> u64 {
        self.payload_bytes + IP_UDP_OVERHEAD_BYTES
    }
}

#[derive(Debug, Clone, Copy)]
enum Event {
    Control(ScheduledEvent),
    /// Next datagram of a source; stale generations are ignored
    Emit { source: SourceId, generation: u64 },
    /// Device retries the head of its queue
    Attempt(NodeId),
    TransmitComplete(NodeId),
    Deliver(Packet),
}

#[derive(Debug)]
struct InstalledSource {
    source: TrafficSource,
    tuple: FiveTuple,
    schedule: EmissionSchedule,
    active: bool,
    generation: u64,
}

#[derive(Debug)]
struct Sink {
    node: NodeId,
    port: u16,
    active: bool,
    received_packets: u64,
    received_bytes: u64,
}

/// Discrete-event simulation of one CSMA bus segment
pub struct BusSubstrate {
    scheduler: Scheduler<Event>,
    medium: MediumConfig,
    channel: Channel,
    devices: Vec<Device<Packet>>,
    addresses: Vec<Ipv4Addr>,
    by_address: HashMap<Ipv4Addr, NodeId>,
    sources: Vec<InstalledSource>,
    sink: Option<Sink>,
    monitor: FlowMonitor,
    stats: MediumStats,
    rng: StdRng,
}

impl BusSubstrate {
    /// Attach every node of `topology` to a fresh medium
    pub fn provision(topology: &Topology, medium: MediumConfig, seed: u64) -> Self {
        let addresses: Vec<Ipv4Addr> = topology.nodes.iter().map(|n| n.address).collect();
        let by_address = topology.nodes.iter().map(|n| (n.address, n.id)).collect();
        let devices = topology
            .nodes
            .iter()
            .map(|_| Device::new(medium.queue_capacity))
            .collect();

        info!(
            "Provisioned bus with {} nodes at {}, delay {:?}, queue {} packets",
            topology.nodes.len(),
            medium.bandwidth,
            medium.delay,
            medium.queue_capacity
        );

        Self {
            scheduler: Scheduler::new(),
            medium,
            channel: Channel::default(),
            devices,
            addresses,
            by_address,
            sources: Vec::new(),
            sink: None,
            monitor: FlowMonitor::new(),
            stats: MediumStats::default(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn medium_stats(&self) -> MediumStats {
        self.stats
    }

    pub fn events_processed(&self) -> u64 {
        self.scheduler.processed()
    }

    fn handle(&mut self, event: Event) {
        match event {
            Event::Control(control) => self.handle_control(control),
            Event::Emit { source, generation } => self.emit(source, generation),
            Event::Attempt(node) => self.try_transmit(node),
            Event::TransmitComplete(node) => self.transmit_complete(node),
            Event::Deliver(packet) => self.deliver(packet),
        }
    }

    fn handle_control(&mut self, control: ScheduledEvent) {
        let now = self.scheduler.now();
        match control {
            ScheduledEvent::StartSource(id) => {
                let Some(installed) = self.sources.get_mut(id.0) else {
                    warn!("Ignoring start of unknown source {:?}", id);
                    return;
                };
                if installed.active {
                    return;
                }
                installed.active = true;
                installed.generation += 1;
                let generation = installed.generation;
                debug!("{} starts at {:?}", installed.source.role, now);
                if let Some(at) = next_emission(&mut installed.schedule, now) {
                    self.scheduler.schedule_at(at, Event::Emit { source: id, generation });
                }
            }
            ScheduledEvent::StopSource(id) => {
                if let Some(installed) = self.sources.get_mut(id.0) {
                    if installed.active {
                        debug!("{} stops at {:?}", installed.source.role, now);
                    }
                    installed.active = false;
                }
            }
            ScheduledEvent::StartSink => {
                if let Some(sink) = self.sink.as_mut() {
                    sink.active = true;
                }
            }
            ScheduledEvent::StopSink => {
                if let Some(sink) = self.sink.as_mut() {
                    sink.active = false;
                }
            }
        }
    }

    fn emit(&mut self, id: SourceId, generation: u64) {
        let now = self.scheduler.now();
        let Some(installed) = self.sources.get_mut(id.0) else {
            return;
        };
        if !installed.active || installed.generation != generation {
            return;
        }

        let node = installed.source.node;
        let packet = Packet {
            flow: self.monitor.classify(installed.tuple),
            destination: *installed.source.destination.ip(),
            destination_port: installed.source.destination.port(),
            payload_bytes: installed.source.config.payload_size as u64,
            sent_at: now,
        };
        if let Some(at) = next_emission(&mut installed.schedule, now) {
            self.scheduler.schedule_at(at, Event::Emit { source: id, generation });
        }

        self.monitor.record_tx(packet.flow, packet.ip_bytes());

        let device = &mut self.devices[node.0];
        if device.enqueue(packet).is_err() {
            self.stats.queue_drops += 1;
            trace!("{} queue full, dropped datagram of {}", node, packet.flow);
            return;
        }
        if device.state == DeviceState::Ready {
            self.try_transmit(node);
        }
    }

    /// Transmit the head of the queue if the channel is idle, otherwise back off
    fn try_transmit(&mut self, node: NodeId) {
        let now = self.scheduler.now();
        let device = &mut self.devices[node.0];

        if device.is_empty() {
            device.state = DeviceState::Ready;
            return;
        }

        if !self.channel.is_idle(now) {
            if device.backoff.max_retries_reached() {
                device.dequeue();
                device.backoff.reset();
                self.stats.retry_drops += 1;
                trace!("{} gave up on a frame after repeated backoff", node);
                device.state = DeviceState::Backoff;
                self.scheduler.schedule_in(Duration::ZERO, Event::Attempt(node));
                return;
            }
            let wait = device.backoff.next_delay(&mut self.rng);
            device.state = DeviceState::Backoff;
            self.stats.backoffs += 1;
            self.scheduler.schedule_in(wait, Event::Attempt(node));
            return;
        }

        let Some(packet) = device.dequeue() else {
            device.state = DeviceState::Ready;
            return;
        };
        device.state = DeviceState::Transmitting;
        device.backoff.reset();

        let serialization = self.medium.serialization_time(packet.ip_bytes());
        self.channel.occupy(now, serialization + self.medium.delay);
        self.stats.frames_sent += 1;

        self.scheduler
            .schedule_in(serialization, Event::TransmitComplete(node));
        self.scheduler
            .schedule_in(serialization + self.medium.delay, Event::Deliver(packet));
    }

    fn transmit_complete(&mut self, node: NodeId) {
        // Next frame waits for the tail of this one to clear the medium
        let device = &mut self.devices[node.0];
        device.state = DeviceState::Backoff;
        self.scheduler
            .schedule_at(self.channel.busy_until(), Event::Attempt(node));
    }

    fn deliver(&mut self, packet: Packet) {
        let now = self.scheduler.now();
        let Some(&node) = self.by_address.get(&packet.destination) else {
            trace!("No node owns {}, frame discarded", packet.destination);
            return;
        };

        self.monitor
            .record_rx(packet.flow, packet.ip_bytes(), packet.sent_at, now);

        if let Some(sink) = self.sink.as_mut() {
            if sink.active && sink.node == node && sink.port == packet.destination_port {
                sink.received_packets += 1;
                sink.received_bytes += packet.payload_bytes;
            }
        }
    }
}

/// First emission of `schedule` at or after `now`
fn next_emission(schedule: &mut EmissionSchedule, now: Duration) -> Option<Duration> {
    schedule.find(|t| *t >= now)
}

impl Substrate for BusSubstrate {
    fn install_sink(&mut self, node: NodeId, port: u16) -> Result<(), SubstrateError> {
        if node.0 >= self.devices.len() {
            return Err(SubstrateError::UnknownNode(node));
        }
        if let Some(existing) = &self.sink {
            return Err(SubstrateError::SinkAlreadyInstalled(existing.node));
        }
        debug!("Sink installed on {} port {}", node, port);
        self.sink = Some(Sink {
            node,
            port,
            active: false,
            received_packets: 0,
            received_bytes: 0,
        });
        Ok(())
    }

    fn install_source(&mut self, source: TrafficSource) -> Result<SourceId, SubstrateError> {
        let Some(&address) = self.addresses.get(source.node.0) else {
            return Err(SubstrateError::UnknownNode(source.node));
        };
        let destination = *source.destination.ip();
        if !self.by_address.contains_key(&destination) {
            return Err(SubstrateError::NoRouteToHost(destination));
        }

        let id = SourceId(self.sources.len());
        let tuple = FiveTuple {
            source: address,
            destination,
            protocol: PROTOCOL_UDP,
            source_port: EPHEMERAL_PORT,
            destination_port: source.destination.port(),
        };
        self.sources.push(InstalledSource {
            schedule: source.emissions(),
            source,
            tuple,
            active: false,
            generation: 0,
        });
        Ok(id)
    }

    fn schedule(&mut self, event: ScheduledEvent, at: Duration) {
        self.scheduler.schedule_at(at, Event::Control(event));
    }

    fn advance_to(&mut self, end: Duration) {
        while let Some(event) = self.scheduler.pop_until(end) {
            self.handle(event);
        }
        self.scheduler.advance_clock(end);
        debug!(
            "Advanced to {:?} after {} events",
            self.scheduler.now(),
            self.scheduler.processed()
        );
    }

    fn stop(&mut self) {
        let discarded = self.scheduler.clear();
        for installed in &mut self.sources {
            installed.active = false;
        }
        if let Some(sink) = self.sink.as_mut() {
            sink.active = false;
        }
        debug!("Simulation stopped, {} pending events discarded", discarded);
    }

    fn now(&self) -> Duration {
        self.scheduler.now()
    }

    fn flow_stats(&self) -> Vec<(FlowId, FlowStats)> {
        self.monitor.all_stats()
    }

    fn classify(&self, flow: FlowId) -> Option<FiveTuple> {
        self.monitor.find_flow(flow)
    }

    fn sink_stats(&self) -> Option<SinkStats> {
        self.sink.as_ref().map(|sink| SinkStats {
            node: sink.node,
            port: sink.port,
            received_packets: sink.received_packets,
            received_bytes: sink.received_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkConfig;
    use crate::topology::build_bus_topology;
    use crate::traffic::TrafficConfig;
    use crate::utils::DataRate;
    use std::net::SocketAddrV4;

    fn bus(sensors: u32, queue_capacity: usize) -> (Topology, BusSubstrate) {
        let network = NetworkConfig {
            queue_capacity,
            ..NetworkConfig::default()
        };
        let topology = build_bus_topology(sensors, &network).unwrap();
        let substrate = BusSubstrate::provision(&topology, MediumConfig::from(&network), 1);
        (topology, substrate)
    }

    fn source(topology: &Topology, node: usize, config: TrafficConfig) -> TrafficSource {
        let gateway = topology.gateway().unwrap();
        let sink = SocketAddrV4::new(gateway.address, 50000);
        TrafficSource::new(&topology.nodes[node], sink, config).unwrap()
    }

    fn one_shot(start_ms: u64) -> TrafficConfig {
        // 64B at 512kbps: one datagram 1ms after start, window of 1.5ms
        TrafficConfig {
            active: Duration::from_secs(1),
            idle: Duration::ZERO,
            payload_size: 64,
            rate: DataRate::from_kbps(512),
            start: Duration::from_millis(start_ms),
            stop: Duration::from_micros(start_ms * 1000 + 1500),
        }
    }

    fn run(substrate: &mut BusSubstrate, sources: Vec<TrafficSource>, end: Duration) {
        let gateway = substrate.addresses.len() - 1;
        substrate.install_sink(NodeId(gateway), 50000).unwrap();
        substrate.schedule(ScheduledEvent::StartSink, Duration::ZERO);
        for source in sources {
            let (start, stop) = (source.start(), source.stop());
            let id = substrate.install_source(source).unwrap();
            substrate.schedule(ScheduledEvent::StartSource(id), start);
            substrate.schedule(ScheduledEvent::StopSource(id), stop);
        }
        substrate.schedule(ScheduledEvent::StopSink, end);
        substrate.advance_to(end);
        substrate.stop();
    }

    #[test]
    fn test_single_datagram_delay() {
        let (topology, mut substrate) = bus(1, 100);
        let sources = vec![source(&topology, 0, one_shot(10))];
        run(&mut substrate, sources, Duration::from_secs(1));

        let flows = substrate.flow_stats();
        assert_eq!(flows.len(), 1);
        let (id, stats) = flows[0];
        assert_eq!(id, FlowId(1));
        assert_eq!(stats.tx_packets, 1);
        assert_eq!(stats.rx_packets, 1);
        assert_eq!(stats.tx_bytes, 92);
        // 110 bytes on the wire at 100Mbps plus 6560ns propagation
        assert_eq!(stats.delay_sum, Duration::from_nanos(8_800 + 6_560));
        assert_eq!(stats.jitter_sum, Duration::ZERO);

        let tuple = substrate.classify(id).unwrap();
        assert_eq!(tuple.source, topology.nodes[0].address);
        assert_eq!(tuple.destination, topology.gateway().unwrap().address);
        assert_eq!(tuple.source_port, EPHEMERAL_PORT);
        assert_eq!(tuple.destination_port, 50000);
        assert_eq!(tuple.protocol, PROTOCOL_UDP);

        let sink = substrate.sink_stats().unwrap();
        assert_eq!(sink.received_packets, 1);
        assert_eq!(sink.received_bytes, 64);
    }

    #[test]
    fn test_contending_senders_back_off() {
        let (topology, mut substrate) = bus(3, 100);
        let sources = (0..3).map(|i| source(&topology, i, one_shot(10))).collect();
        run(&mut substrate, sources, Duration::from_secs(1));

        let flows = substrate.flow_stats();
        assert_eq!(flows.len(), 3);
        assert!(flows.iter().all(|(_, s)| s.rx_packets == 1));
        let stats = substrate.medium_stats();
        assert_eq!(stats.frames_sent, 3);
        assert!(stats.backoffs >= 2);
        // Only the first sender found the channel idle
        let delays: Vec<Duration> = flows.iter().map(|(_, s)| s.delay_sum).collect();
        assert_eq!(delays.iter().filter(|d| **d == Duration::from_nanos(15_360)).count(), 1);
    }

    #[test]
    fn test_overloaded_queue_drops() {
        let (topology, mut substrate) = bus(1, 10);
        // 1400B at 200Mbps offers twice the link rate
        let config = TrafficConfig {
            active: Duration::from_secs(1),
            idle: Duration::ZERO,
            payload_size: 1400,
            rate: DataRate::from_mbps(200),
            start: Duration::ZERO,
            stop: Duration::from_millis(50),
        };
        let sources = vec![source(&topology, 0, config)];
        run(&mut substrate, sources, Duration::from_secs(1));

        let (_, stats) = substrate.flow_stats()[0];
        assert!(stats.rx_packets < stats.tx_packets);
        assert_eq!(
            stats.tx_packets - stats.rx_packets,
            substrate.medium_stats().queue_drops
        );
        assert_eq!(substrate.medium_stats().retry_drops, 0);
    }

    #[test]
    fn test_exhausted_backoff_drops_frame() {
        let (topology, mut substrate) = bus(3, 100);
        for device in &mut substrate.devices {
            device.backoff.max_retries = 0;
        }
        let sources = (0..3).map(|i| source(&topology, i, one_shot(10))).collect();
        run(&mut substrate, sources, Duration::from_secs(1));

        // The first sender takes the channel, the other two give up at once
        let stats = substrate.medium_stats();
        assert_eq!(stats.frames_sent, 1);
        assert_eq!(stats.retry_drops, 2);
        assert_eq!(stats.backoffs, 0);
        let delivered: u64 = substrate.flow_stats().iter().map(|(_, s)| s.rx_packets).sum();
        assert_eq!(delivered, 1);
    }

    #[test]
    fn test_inactive_sink_counts_nothing() {
        let (topology, mut substrate) = bus(1, 100);
        let src = source(&topology, 0, one_shot(10));
        substrate.install_sink(NodeId(2), 50000).unwrap();
        let id = substrate.install_source(src).unwrap();
        substrate.schedule(ScheduledEvent::StartSource(id), Duration::from_millis(10));
        substrate.advance_to(Duration::from_secs(1));

        // Flow monitor still sees the datagram arrive at the gateway
        assert_eq!(substrate.flow_stats()[0].1.rx_packets, 1);
        assert_eq!(substrate.sink_stats().unwrap().received_packets, 0);
    }

    #[test]
    fn test_stop_discards_pending_events() {
        let (topology, mut substrate) = bus(1, 100);
        let id = substrate
            .install_source(source(&topology, 0, one_shot(10)))
            .unwrap();
        substrate.schedule(ScheduledEvent::StartSource(id), Duration::from_millis(10));
        substrate.advance_to(Duration::from_millis(5));
        substrate.stop();
        substrate.advance_to(Duration::from_secs(1));

        assert!(substrate.flow_stats().is_empty());
        assert_eq!(substrate.now(), Duration::from_secs(1));
    }

    #[test]
    fn test_install_errors() {
        let (topology, mut substrate) = bus(1, 100);
        assert_eq!(
            substrate.install_sink(NodeId(99), 50000),
            Err(SubstrateError::UnknownNode(NodeId(99)))
        );
        substrate.install_sink(NodeId(2), 50000).unwrap();
        assert_eq!(
            substrate.install_sink(NodeId(2), 50001),
            Err(SubstrateError::SinkAlreadyInstalled(NodeId(2)))
        );

        let mut stray = source(&topology, 0, one_shot(10));
        stray.destination = SocketAddrV4::new(Ipv4Addr::new(192, 168, 0, 1), 50000);
        assert_eq!(
            substrate.install_source(stray),
            Err(SubstrateError::NoRouteToHost(Ipv4Addr::new(192, 168, 0, 1)))
        );
    }
}
