use common::asm::{NUM_REGS, Reg};
use common::constants::MEM_SIZE;

use log::trace;

// Condition codes. Exactly one is set at any time; the values line up
// with the n/z/p bits of a BR instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cond {
    Pos = 1 << 0,
    #[default]
    Zero = 1 << 1,
    Neg = 1 << 2,
}

impl Cond {
    pub fn of(val: u16) -> Cond {
        if val == 0 {
            Cond::Zero
        } else if val >> 15 != 0 {
            Cond::Neg
        } else {
            Cond::Pos
        }
    }

    pub fn to_raw(self) -> u16 {
        self as u16
    }
}

// This is separate so a mutable borrow can be passed to the MMIO handlers.
// Everything here is plain storage; device side effects live in Emulator.
pub struct EmulatorState {
    num_ins: usize,
    mem: Vec<u16>,
    regs: [u16; NUM_REGS],
    pc: u16,
    cond: Cond,
}

impl EmulatorState {
    pub fn new() -> Self {
        EmulatorState {
            num_ins: 0usize,
            mem: vec![0; MEM_SIZE],
            regs: [0; NUM_REGS],
            pc: 0,
            cond: Cond::default(),
        }
    }

    pub fn inc_ins(&mut self) {
        self.num_ins += 1;
    }

    pub fn num_ins(&self) -> usize {
        self.num_ins
    }

    pub fn mem_read_word(&self, addr: u16) -> u16 {
        self.mem[addr as usize]
    }

    pub fn mem_write_word(&mut self, addr: u16, val: u16) {
        trace!("Mem: writing {val:#06x} to {addr:#06x}");
        self.mem[addr as usize] = val;
    }

    pub fn reg_write_word(&mut self, reg: Reg, val: u16) {
        trace!("Reg: writing {val:#06x} to {reg}");
        self.regs[reg.index()] = val;
    }

    pub fn reg_read_word(&self, reg: Reg) -> u16 {
        self.regs[reg.index()]
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn set_pc(&mut self, pc: u16) {
        trace!("Reg: writing {pc:#06x} to pc");
        self.pc = pc;
    }

    pub fn cond(&self) -> Cond {
        self.cond
    }

    pub fn set_cond(&mut self, cond: Cond) {
        self.cond = cond;
    }

    // Set the condition codes from the value now in reg.
    pub fn update_flags(&mut self, reg: Reg) {
        self.cond = Cond::of(self.reg_read_word(reg));
    }
}

impl Default for EmulatorState {
    fn default() -> Self {
        Self::new()
    }
}
