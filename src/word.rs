use crate::vm::VM;
use crate::exception::Exception;
use crate::memory::{packed_len, Cell};
use std::fmt;

/// Executes even while compiling.
pub const IMMEDIATE: Cell = 0x8000;
/// Excluded from lookup.
pub const HIDDEN: Cell = 0x4000;
/// Name length part of a record header.
pub const NAME_MASK: Cell = 0x00ff;
/// Longest definition name, in bytes.
pub const MAX_NAME_LEN: usize = 31;

/// Native action of a primitive.
pub type Action<'io> = fn(&mut VM<'io>) -> Result<(), Exception>;

/// Entry of the primitive dispatch table. Its opcode is its index.
pub struct Primitive<'io> {
    pub action: Action<'io>,
}

/// Decoded view of a word record in core memory.
///
/// Layout: link, header (flags and name length), packed name, code field,
/// body.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Word {
    pub nfa: usize,
    pub link: Cell,
    pub header: Cell,
}

impl Word {
    pub fn new(nfa: usize, link: Cell, header: Cell) -> Word {
        Word { nfa, link, header }
    }

    pub fn name_len(&self) -> usize {
        (self.header & NAME_MASK) as usize
    }

    pub fn is_immediate(&self) -> bool {
        self.header & IMMEDIATE != 0
    }

    pub fn is_hidden(&self) -> bool {
        self.header & HIDDEN != 0
    }

    /// First cell of the packed name.
    pub fn name_addr(&self) -> usize {
        self.nfa + 2
    }

    /// Execution token: the code field.
    pub fn xt(&self) -> usize {
        self.name_addr() + packed_len(self.name_len())
    }

    pub fn dfa(&self) -> usize {
        self.xt() + 1
    }
}

impl fmt::Debug for Word {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Word at {} imm {}, hidden {}, xt {}",
            self.nfa,
            self.is_immediate(),
            self.is_hidden(),
            self.xt()
        )
    }
}
