use std::error;
use std::fmt;
use std::io;

/// Things that can go wrong while building a machine from a ROM image.
/// All of these abort startup; none of them are recoverable.
#[derive(Debug)]
pub enum LoadError {
    /// the ROM image had no bytes in it
    Empty,
    /// the ROM image would run past the end of RAM when loaded at 0x200
    TooLarge { len: usize, max: usize },
    /// the ROM image couldn't be read at all
    Io(io::Error),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Empty => write!(f, "ROM image is empty"),
            LoadError::TooLarge { len, max } => {
                write!(f, "ROM image is {} bytes but at most {} fit at 0x200", len, max)
            }
            LoadError::Io(e) => write!(f, "can't read ROM image: {}", e),
        }
    }
}

impl error::Error for LoadError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            LoadError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for LoadError {
    fn from(e: io::Error) -> Self {
        LoadError::Io(e)
    }
}

/// Fatal conditions hit while executing. Each one sets the machine's halted
/// flag before being returned, so the state stays inspectable afterwards.
/// NB. return-with-empty-stack is deliberately *not* here; it's a warning
/// no-op (plenty of period ROMs rely on it being tolerated).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecError {
    /// the program counter ran off the end of RAM mid-fetch
    PcOutOfBounds { pc: u16 },
    /// fetched a word that decodes to no CHIP-8 instruction
    UnknownOpcode { addr: u16, word: u16 },
    /// a 17th nested call
    StackOverflow { addr: u16 },
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecError::PcOutOfBounds { pc } => {
                write!(f, "fetch at {:#06x} runs past the end of memory", pc)
            }
            ExecError::UnknownOpcode { addr, word } => {
                write!(f, "unknown opcode {:#06x} at {:#06x}", word, addr)
            }
            ExecError::StackOverflow { addr } => {
                write!(f, "call stack overflow at {:#06x}", addr)
            }
        }
    }
}

impl error::Error for ExecError {}

/// Top-level error for the binary and the run loop.
#[derive(Debug)]
pub enum Chip8Error {
    Load(LoadError),
    Exec(ExecError),
    Io(io::Error),
}

impl fmt::Display for Chip8Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chip8Error::Load(e) => e.fmt(f),
            Chip8Error::Exec(e) => e.fmt(f),
            Chip8Error::Io(e) => e.fmt(f),
        }
    }
}

impl error::Error for Chip8Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Chip8Error::Load(e) => Some(e),
            Chip8Error::Exec(e) => Some(e),
            Chip8Error::Io(e) => Some(e),
        }
    }
}

impl From<LoadError> for Chip8Error {
    fn from(e: LoadError) -> Self {
        Chip8Error::Load(e)
    }
}

impl From<ExecError> for Chip8Error {
    fn from(e: ExecError) -> Self {
        Chip8Error::Exec(e)
    }
}

impl From<io::Error> for Chip8Error {
    fn from(e: io::Error) -> Self {
        Chip8Error::Io(e)
    }
}
