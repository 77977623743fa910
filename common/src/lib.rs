pub mod asm;
pub mod constants;
pub mod decoder;
pub mod mem;
pub mod misc;
