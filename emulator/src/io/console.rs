use std::collections::VecDeque;
use std::io::{IsTerminal, Read, Write, stdin, stdout};
use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use log::{error, trace};

// Character source and sink behind the keyboard device and the trap routines.
pub trait Console: Send + Sync {
    fn write(&self, val: u8);
    fn flush(&self) {}

    // Must return immediately whether or not a character is waiting.
    fn poll_input(&self) -> Option<u8>;

    // Blocks until a character arrives. None means the source is closed.
    fn read_input(&self) -> Option<u8>;

    fn write_all(&self, vals: &[u8]) {
        for val in vals {
            self.write(*val);
        }
    }
}

////////////////////////////////////////////////////////////////////////////////

enum StdInput {
    // Key events from the controlling terminal, through crossterm.
    Terminal,
    // Raw bytes fed by a reader thread. The sender drops at end of stream.
    Stream(Mutex<Receiver<u8>>),
}

// Output goes to stdout. Input comes from the terminal when stdin is one,
// otherwise straight from stdin, so redirected and piped input work.
pub struct StdConsole {
    input: StdInput,
}

impl StdConsole {
    pub fn new() -> Self {
        if stdin().is_terminal() {
            StdConsole{input: StdInput::Terminal}
        } else {
            Self::from_reader(stdin())
        }
    }

    pub fn from_reader(reader: impl Read + Send + 'static) -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            for byte in reader.bytes() {
                match byte {
                    Ok(byte) => {
                        if tx.send(byte).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Console: input read failed: {e}");
                        break;
                    }
                }
            }
            trace!("Console: end of input");
        });
        StdConsole{input: StdInput::Stream(Mutex::new(rx))}
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.input, StdInput::Terminal)
    }

    fn key_to_byte(event: Event) -> Option<u8> {
        let Event::Key(KeyEvent{code, kind: KeyEventKind::Press, ..}) = event else {
            return None;
        };
        match code {
            KeyCode::Char(c) if c.is_ascii() => Some(c as u8),
            KeyCode::Enter => Some(b'\n'),
            KeyCode::Tab => Some(b'\t'),
            KeyCode::Backspace => Some(0x08),
            KeyCode::Esc => Some(0x1b),
            _ => None,
        }
    }

    fn poll_key() -> Option<u8> {
        loop {
            match event::poll(Duration::ZERO) {
                Ok(true) => (),
                Ok(false) => return None,
                Err(e) => {
                    error!("Console: poll failed: {e}");
                    return None;
                }
            }
            // Skip events that don't map to a character, without waiting.
            if let Some(ch) = Self::read_event()? {
                return Some(ch);
            }
        }
    }

    fn read_key() -> Option<u8> {
        loop {
            if let Some(ch) = Self::read_event()? {
                return Some(ch);
            }
        }
    }

    // Outer None means the terminal failed, inner None an event with no character.
    fn read_event() -> Option<Option<u8>> {
        match event::read() {
            Ok(ev) => Some(Self::key_to_byte(ev)),
            Err(e) => {
                error!("Console: read failed: {e}");
                None
            }
        }
    }
}

impl Default for StdConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for StdConsole {
    fn write(&self, val: u8) {
        if let Err(e) = stdout().lock().write_all(&[val]) {
            error!("Console: write failed: {e}");
        }
    }

    fn flush(&self) {
        if let Err(e) = stdout().lock().flush() {
            error!("Console: flush failed: {e}");
        }
    }

    fn poll_input(&self) -> Option<u8> {
        match &self.input {
            StdInput::Terminal => Self::poll_key(),
            StdInput::Stream(rx) => rx.lock().unwrap().try_recv().ok(),
        }
    }

    fn read_input(&self) -> Option<u8> {
        match &self.input {
            StdInput::Terminal => Self::read_key(),
            StdInput::Stream(rx) => rx.lock().unwrap().recv().ok(),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////

// Scripted input and captured output. An empty input queue counts as closed.
#[derive(Default)]
pub struct PipeConsole {
    out_buf: Mutex<VecDeque<u8>>,
    in_buf: Mutex<VecDeque<u8>>,
}

impl PipeConsole {
    pub fn take_output(&self) -> VecDeque<u8> {
        std::mem::take(&mut self.out_buf.lock().unwrap())
    }

    pub fn take_output_string(&self) -> String {
        let out: Vec<u8> = self.take_output().into();
        String::from_utf8_lossy(&out).into_owned()
    }

    pub fn is_out_empty(&self) -> bool {
        self.out_buf.lock().unwrap().is_empty()
    }

    pub fn push_input(&self, val: u8) {
        self.in_buf.lock().unwrap().push_back(val);
    }

    pub fn write_input(&self, vals: &[u8]) {
        for val in vals.iter() {
            self.push_input(*val);
        }
    }

    pub fn input_len(&self) -> usize {
        self.in_buf.lock().unwrap().len()
    }
}

impl Console for PipeConsole {
    fn write(&self, val: u8) {
        self.out_buf.lock().unwrap().push_back(val);
    }

    fn poll_input(&self) -> Option<u8> {
        self.in_buf.lock().unwrap().pop_front()
    }

    fn read_input(&self) -> Option<u8> {
        self.in_buf.lock().unwrap().pop_front()
    }
}
