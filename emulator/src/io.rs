pub mod console;
pub mod keyboard;

use crate::EmulatorState;

pub use console::Console;

// A device living at one or more reserved addresses. Handlers get the plain
// state so they can back their registers with ordinary memory.
pub trait MMIOHandler: Send {
    fn default_addrs(&self) -> &[u16] {
        &[]
    }

    fn read_word(&mut self, state: &mut EmulatorState, addr: u16) -> u16;
    fn write_word(&mut self, state: &mut EmulatorState, addr: u16, val: u16);
}
