//! Core image serialization

use crate::exception::Error;
use crate::memory::CELL_SIZE;
use crate::registers::Registers;
use crate::vm::VM;
use log::trace;
use std::io::Write;

impl<'io> VM<'io> {
    /// Bytes written by `dump`.
    pub fn dump_len(&self) -> usize {
        (Registers::COUNT + self.memory.len()) * CELL_SIZE
    }

    /// Write the register block followed by every cell of core memory, in
    /// native byte order, to `sink`.
    ///
    /// A poisoned machine refuses to dump.
    pub fn dump<W: Write>(&self, mut sink: W) -> Result<(), Error> {
        self.check_poisoned()?;
        let mut image = Vec::with_capacity(self.dump_len());
        let registers = self.regs.to_cells();
        for c in registers.iter().chain(self.memory.cells()) {
            image.extend_from_slice(&c.to_ne_bytes());
        }
        sink.write_all(&image)?;
        sink.flush()?;
        trace!("dumped {} bytes", image.len());
        Ok(())
    }
}
