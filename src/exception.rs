//! Exception constants

use std::convert::From;
use std::io;
use thiserror::Error;

/// Faults raised inside the virtual machine.
///
/// Discriminants are the ANS Forth throw codes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
#[repr(i16)]
pub enum Exception {
    #[error("Stack overflow")]
    StackOverflow = -3,
    #[error("Stack underflow")]
    StackUnderflow = -4,
    #[error("Return stack overflow")]
    ReturnStackOverflow = -5,
    #[error("Return stack underflow")]
    ReturnStackUnderflow = -6,
    #[error("Dictionary overflow")]
    DictionaryOverflow = -8,
    #[error("Invalid memory address")]
    InvalidMemoryAddress = -9,
    #[error("Division by zero")]
    DivisionByZero = -10,
    #[error("Result out of range")]
    ResultOutOfRange = -11,
    #[error("Undefined word")]
    UndefinedWord = -13,
    #[error("Interpreting a compile only word")]
    InterpretingACompileOnlyWord = -14,
    #[error("Parsed string overflow")]
    ParsedStringOverflow = -18,
    #[error("Definition name too long")]
    DefinitionNameTooLong = -19,
    #[error("Control structure mismatch")]
    ControlStructureMismatch = -22,
    #[error("Invalid numeric argument")]
    InvalidNumericArgument = -24,
    #[error("Compiler nesting")]
    CompilerNesting = -29,
    #[error("File I/O exception")]
    FileIOException = -37,
    #[error("Unexpected end of file")]
    UnexpectedEndOfFile = -39,
    #[error("Exception in sending or receiving a character")]
    ExceptionInSendingOrReceivingACharacter = -57,
}

impl Exception {
    /// ANS Forth throw code, always negative.
    pub fn code(self) -> isize {
        self as i16 as isize
    }

    /// Description of the exception
    pub fn description(self) -> String {
        self.to_string()
    }
}

impl From<Exception> for isize {
    fn from(e: Exception) -> Self {
        e.code()
    }
}

/// Errors reported to the host program.
#[derive(Debug, Error)]
pub enum Error {
    /// The call faulted and poisoned the environment.
    #[error("{0}")]
    Fault(#[from] Exception),
    /// An earlier fault poisoned the environment.
    #[error("environment poisoned by an earlier fault: {0}")]
    Poisoned(Exception),
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Negative status code for hosts that speak in integers.
    pub fn status(&self) -> isize {
        match self {
            Error::Fault(e) | Error::Poisoned(e) => e.code(),
            Error::InvalidConfig(_) => -1,
            Error::Io(_) => Exception::FileIOException.code(),
        }
    }
}
