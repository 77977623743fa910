use crate::constants::WORD_SIZE;

use std::io::{self, Read, Write};

// Images store words big-endian.

pub trait ReadU16 {
    fn read_u16(&mut self) -> io::Result<u16>;
}

impl<T: Read> ReadU16 for T {
    fn read_u16(&mut self) -> io::Result<u16> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }
}

////////////////////////////////////////////////////////////////////////////////

pub trait WriteU16 {
    fn write_u16(&mut self, val: u16) -> io::Result<()>;
}

impl<T: Write> WriteU16 for T {
    fn write_u16(&mut self, val: u16) -> io::Result<()> {
        self.write_all(&val.to_be_bytes())
    }
}

////////////////////////////////////////////////////////////////////////////////

// Serialize an origin and its words in image format.
pub fn to_image(origin: u16, words: &[u16]) -> Vec<u8> {
    let mut out = Vec::with_capacity((words.len() + 1) * WORD_SIZE as usize);
    for word in std::iter::once(&origin).chain(words) {
        out.extend_from_slice(&word.to_be_bytes());
    }
    out
}
