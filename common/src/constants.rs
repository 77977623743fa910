
pub const WORD_SIZE: u16 = 2; // Bytes, in an image file

pub const MEM_SIZE: usize = (u16::MAX as usize) + 1; // Words
pub const PC_START: u16 = 0x3000;

// Memory-mapped keyboard registers
pub const KBSR: u16 = 0xfe00;
pub const KBDR: u16 = 0xfe02;
pub const KBSR_READY: u16 = 0x1 << 15;
