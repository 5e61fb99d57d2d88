//! The system bus (`spec.md` §4.3): address-routed read/write dispatch to
//! registered slave ports.
//!
//! Ports are kept address-sorted so lookup is a binary search, and
//! `attach` rejects overlapping ranges up front rather than letting a
//! misconfigured port silently shadow another at access time.

use itertools::Itertools;

use crate::error::{BusError, ConfigError};
use crate::peripheral::BusDevice;

struct Port {
    name: &'static str,
    base: u32,
    size: u32,
    target: Box<dyn BusDevice>,
}

impl Port {
    fn end(&self) -> u32 {
        self.base + self.size
    }

    fn contains(&self, addr: u32, width: u32) -> bool {
        addr >= self.base && addr.saturating_add(width) <= self.end()
    }
}

/// The address-decoded interconnect between a hart and its memories and
/// peripherals.
#[derive(Default)]
pub struct SystemBus {
    ports: Vec<Port>,
}

impl SystemBus {
    pub fn new() -> Self {
        Self { ports: Vec::new() }
    }

    /// Register a slave port covering `[base, base + size)`. Ports must be
    /// non-overlapping and `size` must be nonzero; on success the port list
    /// stays address-sorted.
    pub fn attach(
        &mut self,
        name: &'static str,
        base: u32,
        size: u32,
        target: Box<dyn BusDevice>,
    ) -> Result<(), ConfigError> {
        if size == 0 {
            return Err(ConfigError::BadPortSize { base });
        }
        let end = base.checked_add(size).ok_or(ConfigError::BadPortSize { base })?;

        if self.ports.iter().any(|p| p.base < end && base < p.end()) {
            return Err(ConfigError::Overlap { base, size });
        }

        self.ports.push(Port {
            name,
            base,
            size,
            target,
        });
        self.ports.sort_by_key(|p| p.base);

        // Sanity check: the list stays non-overlapping once sorted. A
        // consecutive pair overlapping here would mean the check above is
        // wrong, not that the caller did anything invalid.
        debug_assert!(self
            .ports
            .iter()
            .tuple_windows()
            .all(|(a, b)| a.end() <= b.base));
        Ok(())
    }

    fn port_for(&self, addr: u32, width: u32) -> Result<&Port, BusError> {
        self.ports
            .iter()
            .find(|p| p.contains(addr, width))
            .ok_or(BusError::UnmappedAccess { addr, width })
    }

    fn port_for_mut(&mut self, addr: u32, width: u32) -> Result<&mut Port, BusError> {
        self.ports
            .iter_mut()
            .find(|p| p.contains(addr, width))
            .ok_or(BusError::UnmappedAccess { addr, width })
    }

    /// Read `width` (1, 2, or 4) bytes at `addr`, delegating to the owning
    /// port. Faults on an unmapped address, a cross-port access, or a
    /// misaligned address.
    pub fn read(&self, addr: u32, width: u32) -> Result<u32, BusError> {
        check_alignment(addr, width)?;
        let port = self.port_for(addr, width)?;
        port.target.read(addr - port.base, width)
    }

    /// Write `value`'s low `width` bytes at `addr`, delegating to the
    /// owning port.
    pub fn write(&mut self, addr: u32, width: u32, value: u32) -> Result<(), BusError> {
        check_alignment(addr, width)?;
        let port = self.port_for_mut(addr, width)?;
        port.target.write(addr - port.base, width, value)
    }

    /// Look up the port name owning `addr`, for diagnostics.
    pub fn port_name_at(&self, addr: u32) -> Option<&'static str> {
        self.ports.iter().find(|p| addr >= p.base && addr < p.end()).map(|p| p.name)
    }

    /// Copy `bytes` verbatim starting at `addr`, for use by a loader.
    /// Skips alignment checking, since a loader writes arbitrary byte
    /// counts; the whole span must still fit within a single port.
    pub fn load_bytes(&mut self, addr: u32, bytes: &[u8]) -> Result<(), BusError> {
        let width = bytes.len() as u32;
        let port = self
            .ports
            .iter_mut()
            .find(|p| p.contains(addr, width))
            .ok_or(BusError::UnmappedAccess { addr, width })?;
        port.target.load_bytes(addr - port.base, bytes)
    }
}

fn check_alignment(addr: u32, width: u32) -> Result<(), BusError> {
    if addr % width != 0 {
        Err(BusError::MisalignedAccess { addr, width })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryRegion;

    fn bus_with_one_region(base: u32, size: u32) -> SystemBus {
        let mut bus = SystemBus::new();
        bus.attach("ram", base, size, Box::new(MemoryRegion::new(base, size)))
            .unwrap();
        bus
    }

    #[test]
    fn read_after_write_round_trips() {
        let mut bus = bus_with_one_region(0x1000_0000, 64);
        bus.write(0x1000_0004, 4, 0xAABBCCDD).unwrap();
        assert_eq!(bus.read(0x1000_0004, 4).unwrap(), 0xAABBCCDD);
    }

    #[test]
    fn unmapped_address_faults() {
        let bus = bus_with_one_region(0x1000_0000, 64);
        let err = bus.read(0x2000_0000, 4).unwrap_err();
        assert!(matches!(err, BusError::UnmappedAccess { .. }));
    }

    #[test]
    fn misaligned_address_faults() {
        let bus = bus_with_one_region(0x1000_0000, 64);
        let err = bus.read(0x1000_0001, 4).unwrap_err();
        assert!(matches!(err, BusError::MisalignedAccess { .. }));
    }

    #[test]
    fn cross_port_access_faults() {
        let mut bus = SystemBus::new();
        bus.attach("low", 0, 4, Box::new(MemoryRegion::new(0, 4)))
            .unwrap();
        bus.attach("high", 4, 4, Box::new(MemoryRegion::new(4, 4)))
            .unwrap();
        // A 4-byte access at address 2 would straddle both ports.
        let err = bus.read(2, 4).unwrap_err();
        assert!(matches!(err, BusError::UnmappedAccess { .. }));
    }

    #[test]
    fn overlapping_ports_are_rejected() {
        let mut bus = SystemBus::new();
        bus.attach("a", 0, 16, Box::new(MemoryRegion::new(0, 16)))
            .unwrap();
        let err = bus
            .attach("b", 8, 16, Box::new(MemoryRegion::new(8, 16)))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Overlap { .. }));
    }

    #[test]
    fn zero_size_port_is_rejected() {
        let mut bus = SystemBus::new();
        let err = bus
            .attach("z", 0, 0, Box::new(MemoryRegion::new(0, 0)))
            .unwrap_err();
        assert!(matches!(err, ConfigError::BadPortSize { .. }));
    }
}
