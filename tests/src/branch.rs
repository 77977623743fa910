use common::asm::*;
use common::constants::PC_START;
use emu_lib::Cond;

use crate::{check_flags, load, run};

fn flag_setup(cond: Cond) -> Ins {
    match cond {
        Cond::Zero => and_imm(Reg::R0, Reg::R0, 0),
        Cond::Pos => add_imm(Reg::R0, Reg::R0, 1),
        Cond::Neg => add_imm(Reg::R0, Reg::R0, -1),
    }
}

#[test]
fn gating() {
    for cond in [Cond::Neg, Cond::Zero, Cond::Pos] {
        for mask in 0u16..8 {
            let (n, z, p) = (mask & 0b100 != 0, mask & 0b010 != 0, mask & 0b001 != 0);
            let emu = run(&[
                flag_setup(cond),
                br(n, z, p, 1),
                trap(TrapVector::Halt), // not taken
                trap(TrapVector::Halt), // taken
            ]);

            let taken = mask & cond.to_raw() != 0;
            let exp_pc = if taken { PC_START + 4 } else { PC_START + 3 };
            assert_eq!(emu.pc(), exp_pc, "cond {cond:?} mask {mask:#05b}");
            check_flags(&emu, cond);
        }
    }
}

#[test]
fn backward() {
    // Count r1 down from 5, adding 3 to r0 each time.
    let emu = run(&[
        and_imm(Reg::R0, Reg::R0, 0),
        and_imm(Reg::R1, Reg::R1, 0),
        add_imm(Reg::R1, Reg::R1, 5),

    // loop:
        add_imm(Reg::R0, Reg::R0, 3),
        add_imm(Reg::R1, Reg::R1, -1),
        br(false, false, true, -3),

        trap(TrapVector::Halt),
    ]);
    assert_eq!(emu.reg_read_word(Reg::R0), 15);
    assert_eq!(emu.reg_read_word(Reg::R1), 0);
}

#[test]
fn unconditional() {
    let emu = run(&[
        br(true, true, true, 1),
        add_imm(Reg::R0, Reg::R0, 1), // skipped
        trap(TrapVector::Halt),
    ]);
    assert_eq!(emu.reg_read_word(Reg::R0), 0);
}

#[test]
fn offset_is_from_incremented_pc() {
    // br with offset 0 falls through to the next instruction either way.
    let emu = run(&[
        br(true, true, true, 0),
        add_imm(Reg::R0, Reg::R0, 1),
        trap(TrapVector::Halt),
    ]);
    assert_eq!(emu.reg_read_word(Reg::R0), 1);
}

#[test]
fn wraps_around_memory() {
    // At 0x0000 with a negative offset, the target wraps to the top of memory.
    let (mut emu, _) = load(&[]);
    emu.get_state_mut().mem_write_word(0x0000, br(true, true, true, -3).encode());
    emu.get_state_mut().mem_write_word(0xfffe, trap(TrapVector::Halt).encode());
    emu.run_at(0x0000).unwrap();
    assert_eq!(emu.pc(), 0xffff);
}
