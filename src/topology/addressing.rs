//! IPv4 address assignment for the bus segment.
//!
//! Addresses are handed out sequentially from the first host address of
//! the configured network, in node order.

use std::net::Ipv4Addr;

/// Address allocation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("Invalid prefix length /{0} (must be 1-30)")]
    InvalidPrefix(u8),
    #[error("Address pool {network}/{prefix_len} exhausted after {assigned} assignments")]
    Exhausted {
        network: Ipv4Addr,
        prefix_len: u8,
        assigned: u64,
    },
}

/// Number of usable host addresses in a subnet of the given prefix length
pub fn host_capacity(prefix_len: u8) -> u64 {
    if prefix_len > 30 {
        return 0;
    }
    (1u64 << (32 - prefix_len as u32)) - 2
}

/// Sequential allocator over one subnet
#[derive(Debug, Clone)]
pub struct Ipv4AddressPool {
    network: u32,
    prefix_len: u8,
    assigned: u64,
}

impl Ipv4AddressPool {
    pub fn new(base: Ipv4Addr, prefix_len: u8) -> Result<Self, AddressError> {
        if !(1..=30).contains(&prefix_len) {
            return Err(AddressError::InvalidPrefix(prefix_len));
        }
        let mask = u32::MAX << (32 - prefix_len as u32);
        Ok(Self {
            network: u32::from(base) & mask,
            prefix_len,
            assigned: 0,
        })
    }

    pub fn network(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.network)
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Assign the next free host address
    pub fn assign(&mut self) -> Result<Ipv4Addr, AddressError> {
        if self.assigned >= host_capacity(self.prefix_len) {
            return Err(AddressError::Exhausted {
                network: self.network(),
                prefix_len: self.prefix_len,
                assigned: self.assigned,
            });
        }
        self.assigned += 1;
        let address = Ipv4Addr::from(self.network + self.assigned as u32);
        log::trace!("Assigned address {} from {}/{}", address, self.network(), self.prefix_len);
        Ok(address)
    }
}
