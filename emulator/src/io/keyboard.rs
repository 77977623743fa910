use std::sync::Arc;

use common::constants::{KBDR, KBSR, KBSR_READY};

use crate::EmulatorState;
use crate::io::{Console, MMIOHandler};

use log::trace;

// Keyboard status and data registers. Only a read of KBSR has a side effect:
// it polls the console (never blocking) and latches any character into KBDR.
// KBDR itself is ordinary memory.
pub struct Keyboard {
    console: Arc<dyn Console>,
}

impl Keyboard {
    pub const ADDRS: &'static [u16] = &[KBSR];

    pub fn new(console: Arc<dyn Console>) -> Self {
        Keyboard{console}
    }

    fn kbsr_read(&mut self, state: &mut EmulatorState) -> u16 {
        match self.console.poll_input() {
            Some(ch) => {
                trace!("Keyboard: latched {ch:#04x}");
                state.mem_write_word(KBSR, KBSR_READY);
                state.mem_write_word(KBDR, ch as u16);
            }
            None => state.mem_write_word(KBSR, 0),
        }
        state.mem_read_word(KBSR)
    }
}

impl MMIOHandler for Keyboard {
    fn default_addrs(&self) -> &[u16] {
        Self::ADDRS
    }

    fn read_word(&mut self, state: &mut EmulatorState, addr: u16) -> u16 {
        match addr {
            KBSR => self.kbsr_read(state),
            _ => panic!("Keyboard doesn't handle address {addr:#06x}"),
        }
    }

    fn write_word(&mut self, state: &mut EmulatorState, addr: u16, val: u16) {
        match addr {
            KBSR => state.mem_write_word(addr, val),
            _ => panic!("Keyboard doesn't handle address {addr:#06x}"),
        }
    }
}
