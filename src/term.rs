/*!
## Terminal adapter

The machine talks to the outside world through `Console`: `mes` and
`bench` write lines, `input` pulls raw bytes with one of three newline
modes. `StdConsole` binds the trait to the process streams;
`MockConsole` serves scripted bytes and records output for tests.

*/

use crate::lang::Error;
use std::collections::VecDeque;
use std::io::{Read, Write};

type Result<T> = std::result::Result<T, Error>;

/// Input modes of the `input` command.
pub const INPUT_RAW: i32 = 0;
pub const INPUT_LF: i32 = 1;
pub const INPUT_CRLF: i32 = 2;

pub trait Console {
    fn write_line(&mut self, s: &str) -> Result<()>;

    /// Reads up to `len` bytes. Mode 0 reads bytes as they come, mode 1
    /// stops at `\n`, mode 2 stops at `\r\n` or `\n`; terminators are
    /// not stored.
    fn read_input(&mut self, len: usize, mode: i32) -> Result<Vec<u8>>;
}

trait ByteSource {
    fn next_byte(&mut self) -> Result<Option<u8>>;
    fn unread_byte(&mut self, b: u8);
}

fn read_with_mode(source: &mut dyn ByteSource, len: usize, mode: i32) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(len);
    while buf.len() < len {
        let b = match source.next_byte()? {
            Some(b) => b,
            None => break,
        };
        if mode == INPUT_LF && b == b'\n' {
            break;
        }
        if mode == INPUT_CRLF {
            if b == b'\r' {
                match source.next_byte()? {
                    Some(b'\n') => break,
                    Some(other) => source.unread_byte(other),
                    None => {}
                }
            } else if b == b'\n' {
                break;
            }
        }
        buf.push(b);
    }
    Ok(buf)
}

/// Console over the process stdin/stdout.
#[derive(Debug, Default)]
pub struct StdConsole {
    pending: Option<u8>,
}

impl StdConsole {
    pub fn new() -> StdConsole {
        StdConsole::default()
    }
}

struct StdinSource<'a> {
    lock: std::io::StdinLock<'a>,
    pending: &'a mut Option<u8>,
}

impl<'a> ByteSource for StdinSource<'a> {
    fn next_byte(&mut self) -> Result<Option<u8>> {
        if let Some(b) = self.pending.take() {
            return Ok(Some(b));
        }
        let mut one = [0u8; 1];
        match self.lock.read(&mut one) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(one[0])),
            Err(e) => Err(e.into()),
        }
    }

    fn unread_byte(&mut self, b: u8) {
        *self.pending = Some(b);
    }
}

impl Console for StdConsole {
    fn write_line(&mut self, s: &str) -> Result<()> {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        writeln!(lock, "{}", s)?;
        lock.flush()?;
        Ok(())
    }

    fn read_input(&mut self, len: usize, mode: i32) -> Result<Vec<u8>> {
        let stdin = std::io::stdin();
        let mut source = StdinSource {
            lock: stdin.lock(),
            pending: &mut self.pending,
        };
        read_with_mode(&mut source, len, mode)
    }
}

/// Console for tests: input is scripted, output is captured.
#[derive(Debug, Default)]
pub struct MockConsole {
    input: VecDeque<u8>,
    pub output: String,
}

impl MockConsole {
    pub fn new() -> MockConsole {
        MockConsole::default()
    }

    pub fn with_input(input: &str) -> MockConsole {
        MockConsole {
            input: input.bytes().collect(),
            output: String::new(),
        }
    }
}

impl ByteSource for VecDeque<u8> {
    fn next_byte(&mut self) -> Result<Option<u8>> {
        Ok(self.pop_front())
    }

    fn unread_byte(&mut self, b: u8) {
        self.push_front(b);
    }
}

impl Console for MockConsole {
    fn write_line(&mut self, s: &str) -> Result<()> {
        self.output.push_str(s);
        self.output.push('\n');
        Ok(())
    }

    fn read_input(&mut self, len: usize, mode: i32) -> Result<Vec<u8>> {
        read_with_mode(&mut self.input, len, mode)
    }
}
