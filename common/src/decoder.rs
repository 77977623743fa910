use crate::misc::{field_mask, sign_extend};

use super::asm::*;

fn dr(ins: u16) -> Reg {
    Reg::from_field(ins >> DR_SHIFT)
}

fn sr1(ins: u16) -> Reg {
    Reg::from_field(ins >> SR1_SHIFT)
}

fn offset(ins: u16, bits: u32) -> i16 {
    sign_extend(ins & field_mask(bits), bits) as i16
}


fn decode_br_ins(ins: u16) -> Ins {
    Ins::Br(BrIns{
        n: (ins >> BrIns::N_SHIFT) & 0x1 != 0,
        z: (ins >> BrIns::Z_SHIFT) & 0x1 != 0,
        p: (ins >> BrIns::P_SHIFT) & 0x1 != 0,
        offset: offset(ins, BrIns::OFFSET_BITS),
    })
}

fn decode_alu_ins(op: AluOpcode, ins: u16) -> Ins {
    let src = if ins & AluIns::IMM_FLAG != 0 {
        AluSrc::Imm(offset(ins, AluIns::IMM_BITS))
    } else {
        AluSrc::Reg(Reg::from_field(ins))
    };
    Ins::Alu(AluIns{op, dr: dr(ins), sr1: sr1(ins), src})
}

fn decode_pc_rel_ins(op: PcRelOpcode, ins: u16) -> Ins {
    Ins::PcRel(PcRelIns{op, reg: dr(ins), offset: offset(ins, PcRelIns::OFFSET_BITS)})
}

fn decode_base_ins(op: BaseOpcode, ins: u16) -> Ins {
    Ins::Base(BaseIns{op, reg: dr(ins), base: sr1(ins), offset: offset(ins, BaseIns::OFFSET_BITS)})
}

fn decode_jsr_ins(ins: u16) -> Ins {
    let target = if ins & JsrIns::LONG_FLAG != 0 {
        JsrTarget::Offset(offset(ins, JsrIns::OFFSET_BITS))
    } else {
        JsrTarget::Reg(sr1(ins))
    };
    Ins::Jsr(JsrIns{target})
}

fn decode_trap_ins(ins: u16) -> Ins {
    Ins::Trap(TrapIns{vector: (ins & TrapIns::VECTOR_MASK) as u8})
}


// Returns None for the two opcodes with no instruction behind them.
pub fn decode(ins: u16) -> Option<Ins> {
    let decoded = match Opcode::of(ins) {
        Opcode::Br => decode_br_ins(ins),
        Opcode::Add => decode_alu_ins(AluOpcode::Add, ins),
        Opcode::Ld => decode_pc_rel_ins(PcRelOpcode::Ld, ins),
        Opcode::St => decode_pc_rel_ins(PcRelOpcode::St, ins),
        Opcode::Jsr => decode_jsr_ins(ins),
        Opcode::And => decode_alu_ins(AluOpcode::And, ins),
        Opcode::Ldr => decode_base_ins(BaseOpcode::Ldr, ins),
        Opcode::Str => decode_base_ins(BaseOpcode::Str, ins),
        Opcode::Not => Ins::Not(NotIns{dr: dr(ins), sr: sr1(ins)}),
        Opcode::Ldi => decode_pc_rel_ins(PcRelOpcode::Ldi, ins),
        Opcode::Sti => decode_pc_rel_ins(PcRelOpcode::Sti, ins),
        Opcode::Jmp => Ins::Jmp(JmpIns{base: sr1(ins)}),
        Opcode::Lea => decode_pc_rel_ins(PcRelOpcode::Lea, ins),
        Opcode::Trap => decode_trap_ins(ins),
        Opcode::Rti | Opcode::Res => return None,
    };
    Some(decoded)
}
