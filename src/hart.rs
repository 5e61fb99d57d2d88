//! The hart: fetch/decode/execute/halt loop (`spec.md` §4.7).
//!
//! A single RISC-V hardware thread, running RV32I only, with no privilege
//! levels. `step()` performs one fetch-decode-execute cycle and polls the
//! shared halt flag; `run()` steps until the hart leaves `Running`. Both
//! terminal states (`Halted`, `Faulted`) are stable: stepping again is a
//! no-op.

use std::cell::Cell;
use std::rc::Rc;

use log::{debug, trace};

use crate::bus::SystemBus;
use crate::decode::decode;
use crate::error::{BusError, HartFault};
use crate::execute::execute;
use crate::registers::RegisterFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HartState {
    Running,
    Halted,
    /// Carries the fault that ended execution and the PC it occurred at.
    Faulted { fault: HartFault, pc: u32 },
}

pub struct Hart {
    registers: RegisterFile,
    pc: u32,
    bus: SystemBus,
    halt: Rc<Cell<bool>>,
    state: HartState,
}

impl Hart {
    /// Build a hart with its program counter at `reset_vector`, using
    /// `bus` for all memory and peripheral traffic, and `halt` as the
    /// shared flag a SimControl peripheral on that bus can assert.
    pub fn new(bus: SystemBus, reset_vector: u32, halt: Rc<Cell<bool>>) -> Self {
        Self {
            registers: RegisterFile::new(),
            pc: reset_vector,
            bus,
            halt,
            state: HartState::Running,
        }
    }

    pub fn state(&self) -> HartState {
        self.state
    }

    pub fn pc(&self) -> u32 {
        self.pc
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    pub fn bus(&self) -> &SystemBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut SystemBus {
        &mut self.bus
    }

    /// Fetch, decode, and execute one instruction, then poll the halt flag.
    /// A no-op if the hart is already `Halted` or `Faulted`.
    pub fn step(&mut self) {
        if self.state != HartState::Running {
            return;
        }

        if let Err(fault) = self.try_step() {
            debug!("hart faulted at pc=0x{:08x}: {fault}", self.pc);
            self.state = HartState::Faulted { fault, pc: self.pc };
            return;
        }

        if self.halt.get() {
            debug!("hart halted at pc=0x{:08x}", self.pc);
            self.state = HartState::Halted;
        }
    }

    fn try_step(&mut self) -> Result<(), HartFault> {
        let word = self.bus.read(self.pc, 4).map_err(|err| match err {
            BusError::MisalignedAccess { .. } => HartFault::MisalignedFetch {
                pc: self.pc,
                target: self.pc,
            },
            BusError::UnmappedAccess { .. } => HartFault::Bus(err),
        })?;
        let instr = decode(word, self.pc)?;
        trace!("pc=0x{:08x} word=0x{word:08x} instr={instr:?}", self.pc);
        execute(instr, &mut self.registers, &mut self.pc, &mut self.bus)
    }

    /// Step until the hart leaves `Running`.
    pub fn run(&mut self) -> HartState {
        while self.state == HartState::Running {
            self.step();
        }
        self.state
    }

    /// Step until the hart leaves `Running` or `max_steps` instructions
    /// have retired, whichever comes first. A host-side policy choice
    /// (`spec.md` §5), not part of the core contract.
    pub fn run_bounded(&mut self, max_steps: u64) -> HartState {
        for _ in 0..max_steps {
            if self.state != HartState::Running {
                break;
            }
            self.step();
        }
        self.state
    }
}
