//! The SimControl peripheral (`spec.md` §4.6): one `CONTROL` register that
//! lets guest software halt the simulation.

use std::cell::Cell;
use std::rc::Rc;

use crate::error::BusError;
use crate::peripheral::{BusDevice, RegisterBank, Trigger};

/// Offset of the single `CONTROL` register within SimControl's window.
pub const CONTROL_OFFSET: u32 = 0;

pub struct SimControl {
    bank: RegisterBank,
    halt: Rc<Cell<bool>>,
}

impl SimControl {
    /// Build a SimControl peripheral that asserts `halt` when guest
    /// software writes a value with bit 0 set to `CONTROL`.
    pub fn new(halt: Rc<Cell<bool>>) -> Self {
        let mut bank = RegisterBank::new();
        let control = bank.declare(CONTROL_OFFSET);
        let halt_handle = halt.clone();
        bank.add_trigger(
            control,
            Trigger::new(
                |new, _old| new & 1 == 1,
                move |_new, _old| halt_handle.set(true),
            ),
        );
        Self { bank, halt }
    }

    pub fn halt_flag(&self) -> Rc<Cell<bool>> {
        self.halt.clone()
    }
}

impl BusDevice for SimControl {
    fn read(&self, offset: u32, width: u32) -> Result<u32, BusError> {
        self.bank.read(offset, width)
    }

    fn write(&mut self, offset: u32, width: u32, value: u32) -> Result<(), BusError> {
        self.bank.write(offset, width, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writing_bit_zero_asserts_halt() {
        let halt = Rc::new(Cell::new(false));
        let mut sim_control = SimControl::new(halt.clone());
        assert!(!halt.get());
        sim_control.write(CONTROL_OFFSET, 4, 1).unwrap();
        assert!(halt.get());
    }

    #[test]
    fn writing_with_bit_zero_clear_does_not_halt() {
        let halt = Rc::new(Cell::new(false));
        let mut sim_control = SimControl::new(halt.clone());
        sim_control.write(CONTROL_OFFSET, 4, 0b10).unwrap();
        assert!(!halt.get());
    }
}
