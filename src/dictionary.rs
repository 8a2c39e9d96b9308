//! Word records and dictionary space

use crate::exception::Exception;
use crate::memory::{packed_len, Cell};
use crate::vm::VM;
use crate::word::{Word, HIDDEN, IMMEDIATE, MAX_NAME_LEN, NAME_MASK};
use log::{debug, log_enabled, Level};

impl<'io> VM<'io> {
    /// Decode the record at `nfa`.
    pub fn word_at(&self, nfa: usize) -> Result<Word, Exception> {
        let link = self.memory.get(nfa)?;
        let header = self.memory.get(nfa + 1)?;
        Ok(Word::new(nfa, link, header))
    }

    pub fn word_name(&self, word: &Word) -> Result<Vec<u8>, Exception> {
        (0..word.name_len())
            .map(|i| self.memory.get_byte(word.name_addr(), i))
            .collect()
    }

    fn name_matches(&self, word: &Word, name: &[u8]) -> Result<bool, Exception> {
        if word.name_len() != name.len() {
            return Ok(false);
        }
        for (i, c) in name.iter().enumerate() {
            if !self.memory.get_byte(word.name_addr(), i)?.eq_ignore_ascii_case(c) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Find the newest visible word named `name`, ignoring ASCII case.
    pub fn find(&self, name: &[u8]) -> Result<Option<Word>, Exception> {
        let mut nfa = self.regs.latest as usize;
        let mut steps = 0;
        while nfa != 0 {
            let word = self.word_at(nfa)?;
            if !word.is_hidden() && self.name_matches(&word, name)? {
                return Ok(Some(word));
            }
            steps += 1;
            if steps > self.memory.len() {
                // Link chain loops.
                return Err(Exception::InvalidMemoryAddress);
            }
            nfa = word.link as usize;
        }
        Ok(None)
    }

    /// Visit every word, newest first.
    pub fn word_list(&self) -> Result<Vec<Word>, Exception> {
        let mut words = Vec::new();
        let mut nfa = self.regs.latest as usize;
        while nfa != 0 {
            let word = self.word_at(nfa)?;
            words.push(word);
            if words.len() > self.memory.len() {
                return Err(Exception::InvalidMemoryAddress);
            }
            nfa = word.link as usize;
        }
        Ok(words)
    }

    pub fn here(&self) -> usize {
        self.regs.here as usize
    }

    /// Free dictionary cells.
    pub fn unused(&self) -> usize {
        (self.regs.s0 as usize).saturating_sub(self.here())
    }

    /// Append `v` to the dictionary.
    pub fn compile_cell(&mut self, v: Cell) -> Result<(), Exception> {
        if self.unused() == 0 {
            return Err(Exception::DictionaryOverflow);
        }
        self.memory.put(self.here(), v)?;
        self.regs.here += 1;
        Ok(())
    }

    /// Append a counted string packed two bytes per cell.
    pub fn compile_string(&mut self, bytes: &[u8]) -> Result<(), Exception> {
        if bytes.len() > Cell::MAX as usize || self.unused() < 1 + packed_len(bytes.len()) {
            return Err(Exception::DictionaryOverflow);
        }
        self.compile_cell(bytes.len() as Cell)?;
        self.memory.put_bytes(self.here(), bytes)?;
        self.regs.here += packed_len(bytes.len()) as Cell;
        Ok(())
    }

    /// Move `here` by `n` cells, which may be negative.
    pub fn allot_cells(&mut self, n: i16) -> Result<(), Exception> {
        let here = self.here() as isize + n as isize;
        if here > self.regs.s0 as isize {
            return Err(Exception::DictionaryOverflow);
        }
        if here < crate::memory::DICTIONARY_START as isize {
            return Err(Exception::InvalidMemoryAddress);
        }
        self.regs.here = here as Cell;
        Ok(())
    }

    /// Append a record for `name` with `code` in its code field and make it
    /// the newest word.
    ///
    /// Nothing is written unless the whole record fits.
    pub fn create_record(&mut self, name: &[u8], code: Cell, flags: Cell) -> Result<Word, Exception> {
        if name.is_empty() {
            return Err(Exception::UnexpectedEndOfFile);
        }
        if name.len() > MAX_NAME_LEN {
            return Err(Exception::DefinitionNameTooLong);
        }
        if self.unused() < 3 + packed_len(name.len()) {
            return Err(Exception::DictionaryOverflow);
        }
        if log_enabled!(Level::Debug) {
            if let Ok(Some(old)) = self.find(name) {
                debug!(
                    "redefined {} (previous record at {})",
                    String::from_utf8_lossy(name),
                    old.nfa
                );
            }
        }
        let nfa = self.here();
        let header = (flags & (IMMEDIATE | HIDDEN)) | (name.len() as Cell & NAME_MASK);
        let latest = self.regs.latest;
        self.compile_cell(latest)?;
        self.compile_cell(header)?;
        self.memory.put_bytes(self.here(), name)?;
        self.regs.here += packed_len(name.len()) as Cell;
        self.compile_cell(code)?;
        self.regs.latest = nfa as Cell;
        Ok(Word::new(nfa, latest, header))
    }

    pub fn set_immediate(&mut self) -> Result<(), Exception> {
        self.set_flags(self.regs.latest as usize, IMMEDIATE, 0)
    }

    /// Make the record at `nfa` visible to lookup.
    pub fn reveal(&mut self, nfa: usize) -> Result<(), Exception> {
        self.set_flags(nfa, 0, HIDDEN)
    }

    fn set_flags(&mut self, nfa: usize, set: Cell, clear: Cell) -> Result<(), Exception> {
        if nfa == 0 {
            return Err(Exception::InvalidMemoryAddress);
        }
        let header = self.memory.get(nfa + 1)?;
        self.memory.put(nfa + 1, (header | set) & !clear)
    }
}
