use std::io;
use std::path::PathBuf;

use common::asm::Opcode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to load image {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read image: {0}")]
    Io(#[from] io::Error),
}

// Faults that stop execution. None of these can be resumed.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("illegal instruction {ins:#06x} ({op}) at {pc:#06x}")]
    IllegalOpcode { op: Opcode, ins: u16, pc: u16 },

    #[error("undefined trap vector {vector:#04x} at {pc:#06x}")]
    UnknownTrap { vector: u8, pc: u16 },

    #[error("console input closed during trap at {pc:#06x}")]
    InputClosed { pc: u16 },
}
