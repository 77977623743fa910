use crate::misc::{field_mask, sign_extend};

use std::fmt;

use delegate::delegate;
use derive_more::{IsVariant, Unwrap};
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;


#[derive(Debug, Clone, Copy, FromPrimitive, ToPrimitive, PartialEq, Eq)]
pub enum Opcode {
    Br = 0,
    Add,
    Ld,
    St,
    Jsr,
    And,
    Ldr,
    Str,
    Rti, // Unused
    Not,
    Ldi,
    Sti,
    Jmp,
    Res, // Reserved
    Lea,
    Trap,
}

impl Opcode {
    pub const NUM_BITS: u32 = 4;
    pub const SHIFT: u32 = u16::BITS - Self::NUM_BITS;

    pub fn of(ins: u16) -> Opcode {
        let Some(op) = Opcode::from_u16(ins >> Self::SHIFT) else {
            unreachable!("every 4-bit value is an opcode");
        };
        op
    }

    fn bits(self) -> u16 {
        (self as u16) << Self::SHIFT
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", format!("{:?}", self).to_lowercase())
    }
}


////////////////////////////////////////////////////////////////////////////////


#[derive(Debug, Clone, Copy, FromPrimitive, ToPrimitive, PartialEq, Eq, Hash)]
pub enum Reg {
    R0 = 0,
    R1,
    R2,
    R3,
    R4,
    R5,
    R6,
    R7,
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", format!("{:?}", self).to_lowercase())
    }
}

pub const NUM_REGS: usize = 8;

impl Reg {
    pub const NUM_BITS: u32 = 3;
    pub const MASK: u16 = (1u16 << Self::NUM_BITS) - 1;

    pub const ALL: [Reg; NUM_REGS] = [
        Reg::R0, Reg::R1, Reg::R2, Reg::R3, Reg::R4, Reg::R5, Reg::R6, Reg::R7,
    ];

    // Only the low 3 bits are used, so any field value names a register.
    pub fn from_field(bits: u16) -> Reg {
        Self::ALL[(bits & Self::MASK) as usize]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    fn field(self) -> u16 {
        self as u16
    }
}

// Register field positions shared by most formats.
pub const DR_SHIFT: u32 = 9;
pub const SR1_SHIFT: u32 = 6;


fn encode_offset(offset: i16, bits: u32) -> u16 {
    let enc = (offset as u16) & field_mask(bits);
    debug_assert_eq!(sign_extend(enc, bits) as i16, offset, "offset {offset} doesn't fit in {bits} bits");
    enc
}

fn fmt_target(f: &mut fmt::Formatter, pc: u16, offset: i16) -> fmt::Result {
    // Offsets are relative to the already incremented PC.
    write!(f, "{:#06x}", pc.wrapping_add(1).wrapping_add_signed(offset))
}


////////////////////////////////////////////////////////////////////////////////


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrIns {
    pub n: bool,
    pub z: bool,
    pub p: bool,
    pub offset: i16,
}

impl BrIns {
    pub const N_SHIFT: u32 = 11;
    pub const Z_SHIFT: u32 = 10;
    pub const P_SHIFT: u32 = 9;
    pub const OFFSET_BITS: u32 = 9;

    // Same bit layout as the condition register.
    pub fn mask(&self) -> u16 {
        ((self.n as u16) << 2) | ((self.z as u16) << 1) | (self.p as u16)
    }

    pub fn encode(&self) -> u16 {
        Opcode::Br.bits()
            | ((self.n as u16) << Self::N_SHIFT)
            | ((self.z as u16) << Self::Z_SHIFT)
            | ((self.p as u16) << Self::P_SHIFT)
            | encode_offset(self.offset, Self::OFFSET_BITS)
    }

    fn fmt_mnemonic(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "br")?;
        if self.n {
            write!(f, "n")?;
        }
        if self.z {
            write!(f, "z")?;
        }
        if self.p {
            write!(f, "p")?;
        }
        write!(f, "\t")
    }

    pub fn fmt_with_pc(&self, f: &mut fmt::Formatter, pc: u16) -> fmt::Result {
        self.fmt_mnemonic(f)?;
        fmt_target(f, pc, self.offset)
    }
}

impl fmt::Display for BrIns {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.fmt_mnemonic(f)?;
        write!(f, "#{}", self.offset)
    }
}

////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOpcode {
    Add,
    And,
}

impl AluOpcode {
    fn opcode(self) -> Opcode {
        match self {
            AluOpcode::Add => Opcode::Add,
            AluOpcode::And => Opcode::And,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluSrc {
    Reg(Reg),
    Imm(i16), // 5 bits, sign extended
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AluIns {
    pub op: AluOpcode,
    pub dr: Reg,
    pub sr1: Reg,
    pub src: AluSrc,
}

impl AluIns {
    pub const IMM_FLAG: u16 = 0x1 << 5;
    pub const IMM_BITS: u32 = 5;

    pub fn encode(&self) -> u16 {
        let src = match self.src {
            AluSrc::Reg(sr2) => sr2.field(),
            AluSrc::Imm(imm) => Self::IMM_FLAG | encode_offset(imm, Self::IMM_BITS),
        };
        self.op.opcode().bits()
            | (self.dr.field() << DR_SHIFT)
            | (self.sr1.field() << SR1_SHIFT)
            | src
    }

    pub fn fmt_with_pc(&self, f: &mut fmt::Formatter, _pc: u16) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for AluIns {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}\t{}, {}, ", self.op.opcode(), self.dr, self.sr1)?;
        match self.src {
            AluSrc::Reg(sr2) => write!(f, "{sr2}"),
            AluSrc::Imm(imm) => write!(f, "#{imm}"),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PcRelOpcode {
    Ld,
    St,
    Ldi,
    Sti,
    Lea,
}

impl PcRelOpcode {
    fn opcode(self) -> Opcode {
        match self {
            PcRelOpcode::Ld => Opcode::Ld,
            PcRelOpcode::St => Opcode::St,
            PcRelOpcode::Ldi => Opcode::Ldi,
            PcRelOpcode::Sti => Opcode::Sti,
            PcRelOpcode::Lea => Opcode::Lea,
        }
    }
}

// Loads, stores and lea addressed by a 9 bit offset from the PC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcRelIns {
    pub op: PcRelOpcode,
    pub reg: Reg, // Destination for loads and lea, source for stores.
    pub offset: i16,
}

impl PcRelIns {
    pub const OFFSET_BITS: u32 = 9;

    pub fn encode(&self) -> u16 {
        self.op.opcode().bits()
            | (self.reg.field() << DR_SHIFT)
            | encode_offset(self.offset, Self::OFFSET_BITS)
    }

    pub fn fmt_with_pc(&self, f: &mut fmt::Formatter, pc: u16) -> fmt::Result {
        write!(f, "{}\t{}, ", self.op.opcode(), self.reg)?;
        fmt_target(f, pc, self.offset)
    }
}

impl fmt::Display for PcRelIns {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}\t{}, #{}", self.op.opcode(), self.reg, self.offset)
    }
}

////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseOpcode {
    Ldr,
    Str,
}

impl BaseOpcode {
    fn opcode(self) -> Opcode {
        match self {
            BaseOpcode::Ldr => Opcode::Ldr,
            BaseOpcode::Str => Opcode::Str,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseIns {
    pub op: BaseOpcode,
    pub reg: Reg,
    pub base: Reg,
    pub offset: i16,
}

impl BaseIns {
    pub const OFFSET_BITS: u32 = 6;

    pub fn encode(&self) -> u16 {
        self.op.opcode().bits()
            | (self.reg.field() << DR_SHIFT)
            | (self.base.field() << SR1_SHIFT)
            | encode_offset(self.offset, Self::OFFSET_BITS)
    }

    pub fn fmt_with_pc(&self, f: &mut fmt::Formatter, _pc: u16) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for BaseIns {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}\t{}, {}, #{}", self.op.opcode(), self.reg, self.base, self.offset)
    }
}

////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsrTarget {
    Offset(i16), // jsr, 11 bits
    Reg(Reg),    // jsrr
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsrIns {
    pub target: JsrTarget,
}

impl JsrIns {
    pub const LONG_FLAG: u16 = 0x1 << 11;
    pub const OFFSET_BITS: u32 = 11;

    pub fn encode(&self) -> u16 {
        let target = match self.target {
            JsrTarget::Offset(off) => Self::LONG_FLAG | encode_offset(off, Self::OFFSET_BITS),
            JsrTarget::Reg(base) => base.field() << SR1_SHIFT,
        };
        Opcode::Jsr.bits() | target
    }

    pub fn fmt_with_pc(&self, f: &mut fmt::Formatter, pc: u16) -> fmt::Result {
        match self.target {
            JsrTarget::Offset(off) => {
                write!(f, "jsr\t")?;
                fmt_target(f, pc, off)
            }
            JsrTarget::Reg(_) => fmt::Display::fmt(self, f),
        }
    }
}

impl fmt::Display for JsrIns {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.target {
            JsrTarget::Offset(off) => write!(f, "jsr\t#{off}"),
            JsrTarget::Reg(base) => write!(f, "jsrr\t{base}"),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotIns {
    pub dr: Reg,
    pub sr: Reg,
}

impl NotIns {
    // The low six bits are all set in the canonical encoding.
    const LOW_BITS: u16 = 0x3f;

    pub fn encode(&self) -> u16 {
        Opcode::Not.bits() | (self.dr.field() << DR_SHIFT) | (self.sr.field() << SR1_SHIFT) | Self::LOW_BITS
    }

    pub fn fmt_with_pc(&self, f: &mut fmt::Formatter, _pc: u16) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for NotIns {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "not\t{}, {}", self.dr, self.sr)
    }
}

////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JmpIns {
    pub base: Reg,
}

impl JmpIns {
    pub fn encode(&self) -> u16 {
        Opcode::Jmp.bits() | (self.base.field() << SR1_SHIFT)
    }

    pub fn fmt_with_pc(&self, f: &mut fmt::Formatter, _pc: u16) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for JmpIns {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.base {
            Reg::R7 => write!(f, "ret"),
            base => write!(f, "jmp\t{base}"),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, Copy, FromPrimitive, ToPrimitive, PartialEq, Eq)]
pub enum TrapVector {
    Getc = 0x20,
    Out,
    Puts,
    In,
    Putsp,
    Halt,
}

impl fmt::Display for TrapVector {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", format!("{:?}", self).to_lowercase())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrapIns {
    pub vector: u8,
}

impl TrapIns {
    pub const VECTOR_MASK: u16 = 0xff;

    pub fn new(vector: TrapVector) -> TrapIns {
        TrapIns{vector: vector as u8}
    }

    pub fn trap_vector(&self) -> Option<TrapVector> {
        TrapVector::from_u8(self.vector)
    }

    pub fn encode(&self) -> u16 {
        Opcode::Trap.bits() | self.vector as u16
    }

    pub fn fmt_with_pc(&self, f: &mut fmt::Formatter, _pc: u16) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for TrapIns {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.trap_vector() {
            Some(vec) => write!(f, "{vec}"),
            None => write!(f, "trap\t{:#04x}", self.vector),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, Copy, PartialEq, Eq, IsVariant, Unwrap)]
pub enum Ins {
    Br(BrIns),
    Alu(AluIns),
    PcRel(PcRelIns),
    Base(BaseIns),
    Jsr(JsrIns),
    Not(NotIns),
    Jmp(JmpIns),
    Trap(TrapIns),
}

impl Ins {
    delegate! {
        to match self {
            Ins::Br(x) => x,
            Ins::Alu(x) => x,
            Ins::PcRel(x) => x,
            Ins::Base(x) => x,
            Ins::Jsr(x) => x,
            Ins::Not(x) => x,
            Ins::Jmp(x) => x,
            Ins::Trap(x) => x,
        } {
            pub fn encode(&self) -> u16;
            pub fn fmt_with_pc(&self, f: &mut fmt::Formatter, pc: u16) -> fmt::Result;
        }
    }

    pub fn display_with_pc(&self, pc: u16) -> InsWithPc<'_> {
        InsWithPc(self, pc)
    }
}

impl fmt::Display for Ins {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Ins::Br(ins) => write!(f, "{ins}"),
            Ins::Alu(ins) => write!(f, "{ins}"),
            Ins::PcRel(ins) => write!(f, "{ins}"),
            Ins::Base(ins) => write!(f, "{ins}"),
            Ins::Jsr(ins) => write!(f, "{ins}"),
            Ins::Not(ins) => write!(f, "{ins}"),
            Ins::Jmp(ins) => write!(f, "{ins}"),
            Ins::Trap(ins) => write!(f, "{ins}"),
        }
    }
}

// Just for formatting, like Path::Display()
pub struct InsWithPc<'a>(&'a Ins, u16);

impl fmt::Display for InsWithPc<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt_with_pc(f, self.1)
    }
}


////////////////////////////////////////////////////////////////////////////////
// Shorthands for building programs. Only compiled for tests and for crates
// that enable the `prog-builders` feature.

#[cfg(any(test, feature = "prog-builders"))]
mod builders {
    use super::*;

    pub fn add_imm(dr: Reg, sr1: Reg, imm: i16) -> Ins {
        Ins::Alu(AluIns{op: AluOpcode::Add, dr, sr1, src: AluSrc::Imm(imm)})
    }

    pub fn add_reg(dr: Reg, sr1: Reg, sr2: Reg) -> Ins {
        Ins::Alu(AluIns{op: AluOpcode::Add, dr, sr1, src: AluSrc::Reg(sr2)})
    }

    pub fn and_imm(dr: Reg, sr1: Reg, imm: i16) -> Ins {
        Ins::Alu(AluIns{op: AluOpcode::And, dr, sr1, src: AluSrc::Imm(imm)})
    }

    pub fn and_reg(dr: Reg, sr1: Reg, sr2: Reg) -> Ins {
        Ins::Alu(AluIns{op: AluOpcode::And, dr, sr1, src: AluSrc::Reg(sr2)})
    }

    pub fn br(n: bool, z: bool, p: bool, offset: i16) -> Ins {
        Ins::Br(BrIns{n, z, p, offset})
    }

    pub fn pc_rel(op: PcRelOpcode, reg: Reg, offset: i16) -> Ins {
        Ins::PcRel(PcRelIns{op, reg, offset})
    }

    pub fn base(op: BaseOpcode, reg: Reg, base: Reg, offset: i16) -> Ins {
        Ins::Base(BaseIns{op, reg, base, offset})
    }

    pub fn not(dr: Reg, sr: Reg) -> Ins {
        Ins::Not(NotIns{dr, sr})
    }

    pub fn trap(vector: TrapVector) -> Ins {
        Ins::Trap(TrapIns::new(vector))
    }

    pub fn assemble(prog: &[Ins]) -> Vec<u16> {
        prog.iter().map(Ins::encode).collect()
    }
}

#[cfg(any(test, feature = "prog-builders"))]
pub use builders::*;
