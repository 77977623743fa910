use common::asm::*;
use common::constants::{KBDR, KBSR, KBSR_READY, PC_START};

use emu_lib::io::console::StdConsole;
use emu_lib::{Emulator, ExecError, RunState};
use common::mem::to_image;

use std::io::Cursor;
use std::sync::Arc;

use crate::{load, load_at, run_with};

#[test]
fn poll_and_echo() {
    let (_, console) = run_with(&[
    // poll:
        pc_rel(PcRelOpcode::Ldi, Reg::R1, 6),   // r1 = KBSR
        br(false, true, true, -2),              // brzp poll
        pc_rel(PcRelOpcode::Ldi, Reg::R0, 5),   // r0 = KBDR
        trap(TrapVector::Out),
        add_imm(Reg::R2, Reg::R0, -10),
        br(true, false, true, -6),              // brnp poll
        trap(TrapVector::Halt),
    ], &[KBSR, KBDR], b"hi\n");
    assert_eq!(console.take_output_string(), "hi\nHALT\n");
    assert_eq!(console.input_len(), 0);
}

#[test]
fn status_read_without_input() {
    let (mut emu, console) = load(&[]);
    emu.get_state_mut().mem_write_word(KBSR, KBSR_READY);
    assert_eq!(emu.mem_read_word(KBSR), 0);
    assert_eq!(emu.get_state().mem_read_word(KBSR), 0);
    assert_eq!(emu.get_state().mem_read_word(KBDR), 0);
    assert!(console.is_out_empty());
}

#[test]
fn status_read_latches_character() {
    let (mut emu, console) = load(&[]);
    console.write_input(b"xy");

    assert_eq!(emu.mem_read_word(KBSR), KBSR_READY);
    assert_eq!(emu.get_state().mem_read_word(KBDR), b'x' as u16);
    assert_eq!(console.input_len(), 1);

    // Reading the data register doesn't poll.
    assert_eq!(emu.mem_read_word(KBDR), b'x' as u16);
    assert_eq!(emu.mem_read_word(KBDR), b'x' as u16);
    assert_eq!(console.input_len(), 1);

    assert_eq!(emu.mem_read_word(KBSR), KBSR_READY);
    assert_eq!(emu.mem_read_word(KBDR), b'y' as u16);
    assert_eq!(emu.mem_read_word(KBSR), 0);
    assert_eq!(emu.mem_read_word(KBDR), b'y' as u16);
}

#[test]
fn plain_memory_doesnt_poll() {
    let (mut emu, console) = load_at(PC_START, &[
        pc_rel(PcRelOpcode::Ld, Reg::R0, 2),
        base(BaseOpcode::Ldr, Reg::R1, Reg::R2, 0),
        trap(TrapVector::Halt),
    ], &[0x1111], b"a");
    emu.reg_write_word(Reg::R2, KBSR - 1);
    emu.run().unwrap();
    assert_eq!(emu.reg_read_word(Reg::R0), 0x1111);
    assert_eq!(console.input_len(), 1);
}

#[test]
fn ldr_from_status_polls() {
    let (mut emu, console) = load(&[
        base(BaseOpcode::Ldr, Reg::R1, Reg::R2, 0),
        base(BaseOpcode::Ldr, Reg::R3, Reg::R2, 2),
        trap(TrapVector::Halt),
    ]);
    console.write_input(b"!");
    emu.reg_write_word(Reg::R2, KBSR);
    emu.run().unwrap();
    assert_eq!(emu.reg_read_word(Reg::R1), KBSR_READY);
    assert_eq!(emu.reg_read_word(Reg::R3), b'!' as u16);
    assert_eq!(console.input_len(), 0);
}

#[test]
fn status_write_is_plain_store() {
    let (mut emu, console) = load(&[
        pc_rel(PcRelOpcode::Sti, Reg::R0, 1),
        trap(TrapVector::Halt),
    ]);
    emu.get_state_mut().mem_write_word(PC_START + 2, KBSR);
    console.write_input(b"a");
    emu.reg_write_word(Reg::R0, 0x1234);
    emu.run().unwrap();
    assert_eq!(emu.get_state().mem_read_word(KBSR), 0x1234);
    assert_eq!(console.input_len(), 1);
}


fn load_from_stream(prog: &[Ins], data: &[u16], input: &[u8]) -> Emulator {
    let console = StdConsole::from_reader(Cursor::new(input.to_vec()));
    let mut words = assemble(prog);
    words.extend_from_slice(data);

    let mut emu = Emulator::with_console(Arc::new(console));
    emu.load_image(to_image(PC_START, &words).as_slice()).unwrap();
    emu
}

#[test]
fn stream_input_getc() {
    let mut emu = load_from_stream(&[
        trap(TrapVector::Getc),
        add_reg(Reg::R1, Reg::R0, Reg::R1),
        trap(TrapVector::Getc),
        trap(TrapVector::Halt),
    ], &[], b"ab");
    emu.run().unwrap();
    assert_eq!(emu.reg_read_word(Reg::R1), b'a' as u16);
    assert_eq!(emu.reg_read_word(Reg::R0), b'b' as u16);
}

#[test]
fn stream_input_closed_at_end() {
    let mut emu = load_from_stream(&[
        trap(TrapVector::Getc),
        trap(TrapVector::Getc),
        trap(TrapVector::Halt),
    ], &[], b"a");
    let err = emu.run().unwrap_err();
    assert!(matches!(err, ExecError::InputClosed{pc} if pc == PC_START + 1), "{err}");
}

#[test]
fn stream_input_keyboard_poll() {
    let mut emu = load_from_stream(&[
    // poll:
        pc_rel(PcRelOpcode::Ldi, Reg::R1, 3),   // r1 = KBSR
        br(false, true, true, -2),              // brzp poll
        pc_rel(PcRelOpcode::Ldi, Reg::R0, 2),   // r0 = KBDR
        trap(TrapVector::Halt),
    ], &[KBSR, KBDR], b"k");
    emu.run().unwrap();
    assert_eq!(emu.run_state(), RunState::Halted);
    assert_eq!(emu.reg_read_word(Reg::R0), b'k' as u16);
}
