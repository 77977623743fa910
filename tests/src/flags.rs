use common::asm::*;
use emu_lib::Cond;

use crate::{check_flags, load, run};

#[test]
fn add_sets_flags() {
    let emu = run(&[add_imm(Reg::R0, Reg::R0, 0), trap(TrapVector::Halt)]);
    check_flags(&emu, Cond::Zero);

    let emu = run(&[add_imm(Reg::R0, Reg::R0, 15), trap(TrapVector::Halt)]);
    check_flags(&emu, Cond::Pos);

    let emu = run(&[add_imm(Reg::R0, Reg::R0, -16), trap(TrapVector::Halt)]);
    assert_eq!(emu.reg_read_word(Reg::R0), 0xfff0);
    check_flags(&emu, Cond::Neg);
}

#[test]
fn add_imm_from_zero_is_sign_extended_imm() {
    for imm in -16i16..=15 {
        let emu = run(&[add_imm(Reg::R3, Reg::R0, imm), trap(TrapVector::Halt)]);
        assert_eq!(emu.reg_read_word(Reg::R3), imm as u16, "imm {imm}");
        check_flags(&emu, Cond::of(imm as u16));
    }
}

#[test]
fn add_wraps() {
    let (mut emu, _) = load(&[add_reg(Reg::R2, Reg::R0, Reg::R1), trap(TrapVector::Halt)]);
    emu.reg_write_word(Reg::R0, 0x7fff);
    emu.reg_write_word(Reg::R1, 0x0001);
    emu.run().unwrap();
    assert_eq!(emu.reg_read_word(Reg::R2), 0x8000);
    check_flags(&emu, Cond::Neg);

    let (mut emu, _) = load(&[add_reg(Reg::R2, Reg::R0, Reg::R1), trap(TrapVector::Halt)]);
    emu.reg_write_word(Reg::R0, 0xffff);
    emu.reg_write_word(Reg::R1, 0x0001);
    emu.run().unwrap();
    assert_eq!(emu.reg_read_word(Reg::R2), 0);
    check_flags(&emu, Cond::Zero);
}

#[test]
fn and() {
    let (mut emu, _) = load(&[
        and_reg(Reg::R2, Reg::R0, Reg::R1),
        and_imm(Reg::R3, Reg::R0, -2),
        trap(TrapVector::Halt),
    ]);
    emu.reg_write_word(Reg::R0, 0xf0f1);
    emu.reg_write_word(Reg::R1, 0x0ff0);
    emu.run().unwrap();
    assert_eq!(emu.reg_read_word(Reg::R2), 0x00f0);
    assert_eq!(emu.reg_read_word(Reg::R3), 0xf0f0);
    check_flags(&emu, Cond::Neg);

    let emu = run(&[add_imm(Reg::R0, Reg::R0, 7), and_imm(Reg::R0, Reg::R0, 8), trap(TrapVector::Halt)]);
    assert_eq!(emu.reg_read_word(Reg::R0), 0);
    check_flags(&emu, Cond::Zero);
}

#[test]
fn not() {
    let emu = run(&[common::asm::not(Reg::R1, Reg::R0), trap(TrapVector::Halt)]);
    assert_eq!(emu.reg_read_word(Reg::R1), 0xffff);
    check_flags(&emu, Cond::Neg);

    let (mut emu, _) = load(&[common::asm::not(Reg::R1, Reg::R0), trap(TrapVector::Halt)]);
    emu.reg_write_word(Reg::R0, 0xffff);
    emu.run().unwrap();
    assert_eq!(emu.reg_read_word(Reg::R1), 0);
    check_flags(&emu, Cond::Zero);

    let (mut emu, _) = load(&[common::asm::not(Reg::R0, Reg::R0), trap(TrapVector::Halt)]);
    emu.reg_write_word(Reg::R0, 0x8000);
    emu.run().unwrap();
    assert_eq!(emu.reg_read_word(Reg::R0), 0x7fff);
    check_flags(&emu, Cond::Pos);
}

#[test]
fn lea_sets_flags() {
    let emu = run(&[pc_rel(PcRelOpcode::Lea, Reg::R4, 5), trap(TrapVector::Halt)]);
    check_flags(&emu, Cond::Pos);
}

#[test]
fn stores_keep_flags() {
    let emu = run(&[
        add_imm(Reg::R0, Reg::R0, -1),
        pc_rel(PcRelOpcode::St, Reg::R1, 4),
        base(BaseOpcode::Str, Reg::R1, Reg::R0, 0),
        br(false, false, false, 0),
        Ins::Jsr(JsrIns{target: JsrTarget::Offset(0)}),
        trap(TrapVector::Halt),
    ]);
    check_flags(&emu, Cond::Neg);
}

#[test]
fn initial_flags_are_zero() {
    let (mut emu, _) = load(&[trap(TrapVector::Halt)]);
    emu.get_state_mut().set_cond(Cond::Neg);
    emu.run().unwrap();
    check_flags(&emu, Cond::Zero);
}
