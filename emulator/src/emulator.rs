use common::asm::*;
use common::constants::*;
use common::decoder::decode;
use common::mem::ReadU16;
use crate::MMIOHandler;
use crate::io::Console;
use crate::io::console::StdConsole;
use crate::io::keyboard::Keyboard;
use crate::{Cond, EmulatorState, ExecError, LoadError};

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;
use std::sync::{Arc, Mutex};

use delegate::delegate;
use derive_more::IsVariant;
use log::{debug, trace, warn};


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecRet {
    Ok,
    Halt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, IsVariant)]
pub enum RunState {
    #[default]
    Running,
    Halted,
}


pub struct Emulator {
    state: EmulatorState,
    mmio_handlers: HashMap<u16, Arc<Mutex<dyn MMIOHandler>>>,
    console: Arc<dyn Console>,
    run_state: RunState,
}

impl Emulator {
    pub fn new() -> Emulator {
        Self::with_console(Arc::new(StdConsole::default()))
    }

    pub fn with_console(console: Arc<dyn Console>) -> Emulator {
        let mut emu = Emulator {
            state: EmulatorState::new(),
            mmio_handlers: HashMap::new(),
            console: console.clone(),
            run_state: RunState::default(),
        };
        emu.set_mmio_handler(Keyboard::new(console));
        emu
    }

    delegate! {
        to self.state {
            pub fn reg_read_word(&self, reg: Reg) -> u16;
            pub fn reg_write_word(&mut self, reg: Reg, val: u16);
            pub fn pc(&self) -> u16;
            pub fn cond(&self) -> Cond;
            pub fn num_ins(&self) -> usize;
        }
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    // Run from the conventional start address until a halt.
    pub fn run(&mut self) -> Result<(), ExecError> {
        self.run_at(PC_START)
    }

    pub fn run_at(&mut self, pc: u16) -> Result<(), ExecError> {
        self.state.set_pc(pc);
        self.state.set_cond(Cond::Zero);
        self.run_state = RunState::Running;

        while self.run_ins()? != ExecRet::Halt {}

        debug!("Halted at {:#06x} after {} instructions", self.state.pc(), self.state.num_ins());
        Ok(())
    }

    // Fetch, increment PC, decode and execute one instruction. Nothing is
    // fetched once halted.
    pub fn run_ins(&mut self) -> Result<ExecRet, ExecError> {
        if self.run_state.is_halted() {
            return Ok(ExecRet::Halt);
        }

        let pc = self.state.pc();
        let word = self.state.mem_read_word(pc);
        self.state.set_pc(pc.wrapping_add(1));
        self.state.inc_ins();

        let Some(ins) = decode(word) else {
            return Err(ExecError::IllegalOpcode{op: Opcode::of(word), ins: word, pc});
        };
        debug!("PC: {pc:#06x}: {}", ins.display_with_pc(pc));

        self.exec(&ins)
    }

    // The first word is the origin, the rest are stored from there on. A
    // short or odd-length image loads whatever whole words it has.
    pub fn load_image(&mut self, mut reader: impl Read) -> Result<(), LoadError> {
        let origin = match reader.read_u16() {
            Ok(origin) => origin,
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                warn!("Image has no origin, nothing loaded");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let mut loaded = 0usize;
        for addr in origin..=u16::MAX {
            match reader.read_u16() {
                Ok(word) => self.state.mem_write_word(addr, word),
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }
            loaded += 1;
        }

        debug!("Loaded {loaded} words at {origin:#06x}");
        Ok(())
    }

    pub fn load_image_file(&mut self, path: impl AsRef<Path>) -> Result<(), LoadError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| LoadError::Open{path: path.to_path_buf(), source})?;
        self.load_image(BufReader::new(file))
    }

    pub fn set_mmio_handler(&mut self, handler: impl MMIOHandler + 'static) {
        let handler = Arc::new(Mutex::new(handler));
        let addrs = handler.lock().unwrap().default_addrs().to_vec();
        for addr in addrs {
            self.register_handler(handler.clone(), addr);
        }
    }

    fn register_handler(&mut self, handler: Arc<Mutex<dyn MMIOHandler>>, addr: u16) {
        let prev = self.mmio_handlers.insert(addr, handler);
        assert!(prev.is_none(), "Duplicate MMIOHandler for {addr:#06x}");
    }


    ///////////////////////////////////////////////////////////////////////////


    pub fn mem_read_word(&mut self, addr: u16) -> u16 {
        if let Some(handler) = self.mmio_handlers.get_mut(&addr) {
            return handler.lock().unwrap().read_word(&mut self.state, addr);
        }
        self.state.mem_read_word(addr)
    }

    pub fn mem_write_word(&mut self, addr: u16, val: u16) {
        if let Some(handler) = self.mmio_handlers.get_mut(&addr) {
            handler.lock().unwrap().write_word(&mut self.state, addr, val);
            return;
        }
        self.state.mem_write_word(addr, val)
    }

    pub fn get_state(&self) -> &EmulatorState {
        &self.state
    }

    pub fn get_state_mut(&mut self) -> &mut EmulatorState {
        &mut self.state
    }

    fn set_reg_with_flags(&mut self, reg: Reg, val: u16) {
        self.state.reg_write_word(reg, val);
        self.state.update_flags(reg);
    }


    ///////////////////////////////////////////////////////////////////////////
    // Execute
    ///////////////////////////////////////////////////////////////////////////
    // All PC-relative addressing uses the incremented PC.

    fn exec_br_ins(&mut self, ins: &BrIns) {
        if ins.mask() & self.state.cond().to_raw() != 0 {
            let pc = self.state.pc().wrapping_add_signed(ins.offset);
            self.state.set_pc(pc);
        }
    }

    fn exec_alu_ins(&mut self, ins: &AluIns) {
        let lhs = self.state.reg_read_word(ins.sr1);
        let rhs = match ins.src {
            AluSrc::Reg(sr2) => self.state.reg_read_word(sr2),
            AluSrc::Imm(imm) => imm as u16,
        };
        let res = match ins.op {
            AluOpcode::Add => lhs.wrapping_add(rhs),
            AluOpcode::And => lhs & rhs,
        };
        self.set_reg_with_flags(ins.dr, res);
    }

    fn exec_pc_rel_ins(&mut self, ins: &PcRelIns) {
        let addr = self.state.pc().wrapping_add_signed(ins.offset);
        match ins.op {
            PcRelOpcode::Ld => {
                let val = self.mem_read_word(addr);
                self.set_reg_with_flags(ins.reg, val);
            }
            PcRelOpcode::St => {
                let val = self.state.reg_read_word(ins.reg);
                self.mem_write_word(addr, val);
            }
            PcRelOpcode::Ldi => {
                let ptr = self.mem_read_word(addr);
                let val = self.mem_read_word(ptr);
                self.set_reg_with_flags(ins.reg, val);
            }
            PcRelOpcode::Sti => {
                let ptr = self.mem_read_word(addr);
                let val = self.state.reg_read_word(ins.reg);
                self.mem_write_word(ptr, val);
            }
            PcRelOpcode::Lea => self.set_reg_with_flags(ins.reg, addr),
        }
    }

    fn exec_base_ins(&mut self, ins: &BaseIns) {
        let addr = self.state.reg_read_word(ins.base).wrapping_add_signed(ins.offset);
        match ins.op {
            BaseOpcode::Ldr => {
                let val = self.mem_read_word(addr);
                self.set_reg_with_flags(ins.reg, val);
            }
            BaseOpcode::Str => {
                let val = self.state.reg_read_word(ins.reg);
                self.mem_write_word(addr, val);
            }
        }
    }

    fn exec_jsr_ins(&mut self, ins: &JsrIns) {
        let pc = self.state.pc();
        // R7 is written before the base register is read, so jsrr r7 lands
        // on the following instruction.
        self.state.reg_write_word(Reg::R7, pc);
        let new_pc = match ins.target {
            JsrTarget::Offset(off) => pc.wrapping_add_signed(off),
            JsrTarget::Reg(base) => self.state.reg_read_word(base),
        };
        trace!("PC: {pc:#06x}: JSR to {new_pc:#06x}");
        self.state.set_pc(new_pc);
    }

    fn exec_not_ins(&mut self, ins: &NotIns) {
        let val = !self.state.reg_read_word(ins.sr);
        self.set_reg_with_flags(ins.dr, val);
    }

    fn exec_jmp_ins(&mut self, ins: &JmpIns) {
        let new_pc = self.state.reg_read_word(ins.base);
        trace!("PC: {:#06x}: JMP to {new_pc:#06x}", self.state.pc());
        self.state.set_pc(new_pc);
    }

    fn exec_trap_ins(&mut self, ins: &TrapIns) -> Result<ExecRet, ExecError> {
        let pc = self.state.pc().wrapping_sub(1);
        let Some(vector) = ins.trap_vector() else {
            return Err(ExecError::UnknownTrap{vector: ins.vector, pc});
        };

        match vector {
            TrapVector::Getc => self.trap_getc(pc)?,
            TrapVector::Out => self.trap_out(),
            TrapVector::Puts => self.trap_puts(),
            TrapVector::In => self.trap_in(pc)?,
            TrapVector::Putsp => self.trap_putsp(),
            TrapVector::Halt => {
                self.trap_halt();
                return Ok(ExecRet::Halt);
            }
        }
        Ok(ExecRet::Ok)
    }

    fn exec(&mut self, ins: &Ins) -> Result<ExecRet, ExecError> {
        match ins {
            Ins::Br(ins) => self.exec_br_ins(ins),
            Ins::Alu(ins) => self.exec_alu_ins(ins),
            Ins::PcRel(ins) => self.exec_pc_rel_ins(ins),
            Ins::Base(ins) => self.exec_base_ins(ins),
            Ins::Jsr(ins) => self.exec_jsr_ins(ins),
            Ins::Not(ins) => self.exec_not_ins(ins),
            Ins::Jmp(ins) => self.exec_jmp_ins(ins),
            Ins::Trap(ins) => return self.exec_trap_ins(ins),
        }

        Ok(ExecRet::Ok)
    }


    ///////////////////////////////////////////////////////////////////////////
    // Traps
    ///////////////////////////////////////////////////////////////////////////

    // Words from start up to (not including) a zero word. Stops at the top of
    // memory rather than wrapping if there's no terminator.
    fn string_words(&self, start: u16) -> impl Iterator<Item = u16> + '_ {
        (start..=u16::MAX)
            .map(|addr| self.state.mem_read_word(addr))
            .take_while(|word| *word != 0)
    }

    fn trap_getc(&mut self, pc: u16) -> Result<(), ExecError> {
        let ch = self.console.read_input().ok_or(ExecError::InputClosed{pc})?;
        self.state.reg_write_word(Reg::R0, ch as u16);
        Ok(())
    }

    fn trap_out(&mut self) {
        let ch = self.state.reg_read_word(Reg::R0) as u8;
        self.console.write(ch);
        self.console.flush();
    }

    fn trap_puts(&mut self) {
        let start = self.state.reg_read_word(Reg::R0);
        for word in self.string_words(start) {
            self.console.write(word as u8);
        }
        self.console.flush();
    }

    fn trap_in(&mut self, pc: u16) -> Result<(), ExecError> {
        self.console.write_all(b"Enter a character: ");
        self.console.flush();
        let ch = self.console.read_input().ok_or(ExecError::InputClosed{pc})?;
        self.console.write(ch);
        self.console.flush();
        self.set_reg_with_flags(Reg::R0, ch as u16);
        Ok(())
    }

    // Two characters per word, low byte first.
    fn trap_putsp(&mut self) {
        let start = self.state.reg_read_word(Reg::R0);
        for word in self.string_words(start) {
            let [low, high] = word.to_le_bytes();
            self.console.write(low);
            if high != 0 {
                self.console.write(high);
            }
        }
        self.console.flush();
    }

    fn trap_halt(&mut self) {
        self.console.write_all(b"HALT\n");
        self.console.flush();
        self.run_state = RunState::Halted;
    }
}

impl Default for Emulator {
    fn default() -> Self {
        Self::new()
    }
}
