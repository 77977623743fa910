pub mod emulator;
pub mod emulator_state;
pub mod error;
pub mod io;

pub use emulator::{Emulator, ExecRet, RunState};
pub use emulator_state::{Cond, EmulatorState};
pub use error::{ExecError, LoadError};
pub use io::MMIOHandler;
