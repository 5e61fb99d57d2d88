//! Loading a program image into memory before the hart starts (`spec.md` §6).
//!
//! Two entry points: a raw binary dropped at a fixed base address, and an
//! ELF32 file whose `PT_LOAD` segments are copied to their physical
//! addresses, mirroring `riscvemu`'s `elf_utils`. Both go through the bus's
//! backdoor `load_bytes` path rather than `SystemBus::write`, since a loader
//! writes arbitrary byte counts that need not be width-aligned.

use elf::abi::PT_LOAD;
use elf::endian::AnyEndian;
use elf::ElfBytes;
use thiserror::Error;

use crate::bus::SystemBus;
use crate::error::BusError;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse ELF file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: elf::ParseError,
    },
    #[error("segment at physical address 0x{addr:08x} does not fit any bus port")]
    SegmentOutOfRange {
        addr: u32,
        #[source]
        source: BusError,
    },
}

/// Write `bytes` starting at `base`, through the bus's backdoor load path.
pub fn load_raw_binary(bus: &mut SystemBus, base: u32, bytes: &[u8]) -> Result<(), LoaderError> {
    bus.load_bytes(base, bytes)
        .map_err(|source| LoaderError::SegmentOutOfRange { addr: base, source })
}

/// Parse an ELF32 little-endian RISC-V file, copy each `PT_LOAD` segment's
/// bytes to its physical address, and return the entry point so the caller
/// can set the hart's reset vector.
pub fn load_elf(bus: &mut SystemBus, path: &str) -> Result<u32, LoaderError> {
    let file_data = std::fs::read(path).map_err(|source| LoaderError::Io {
        path: path.to_string(),
        source,
    })?;

    let file = ElfBytes::<AnyEndian>::minimal_parse(&file_data).map_err(|source| LoaderError::Parse {
        path: path.to_string(),
        source,
    })?;

    let segments = file.segments().ok_or_else(|| LoaderError::Parse {
        path: path.to_string(),
        source: elf::ParseError::BadOffset(0),
    })?;

    for segment in segments.iter().filter(|s| s.p_type == PT_LOAD) {
        let data = file.segment_data(&segment).map_err(|source| LoaderError::Parse {
            path: path.to_string(),
            source,
        })?;
        load_raw_binary(bus, segment.p_paddr as u32, data)?;
    }

    Ok(file.ehdr.e_entry as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryRegion;

    fn bus_with_region(base: u32, size: u32) -> SystemBus {
        let mut bus = SystemBus::new();
        bus.attach("ram", base, size, Box::new(MemoryRegion::new(base, size)))
            .unwrap();
        bus
    }

    #[test]
    fn raw_binary_loads_at_base() {
        let mut bus = bus_with_region(0x1000_0000, 64);
        load_raw_binary(&mut bus, 0x1000_0000, &[0xDE, 0xAD, 0xBE, 0xEF]).unwrap();
        assert_eq!(bus.read(0x1000_0000, 4).unwrap(), 0xEFBEADDE);
    }

    #[test]
    fn raw_binary_out_of_range_errors() {
        let mut bus = bus_with_region(0x1000_0000, 4);
        let err = load_raw_binary(&mut bus, 0x1000_0000, &[0u8; 16]).unwrap_err();
        assert!(matches!(err, LoaderError::SegmentOutOfRange { .. }));
    }
}
