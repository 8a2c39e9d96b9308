use crate::exception::Exception;
use std::mem;

/// Machine word.
pub type Cell = u16;

/// Size of a cell in bytes.
pub const CELL_SIZE: usize = mem::size_of::<Cell>();

/// Cells below this offset are reserved. Cell 0 is the "none" sentinel.
pub const DICTIONARY_START: usize = 256;

/// Largest core addressable by a cell.
pub const MAX_CORE_SIZE: usize = Cell::MAX as usize;

/// Core memory: a fixed arena of cells addressed by offset.
///
/// Every read and write is bounds checked, an offset outside the arena is an
/// `InvalidMemoryAddress` fault.
pub struct Memory {
    cells: Vec<Cell>,
}

impl Memory {
    pub fn new(size: usize) -> Memory {
        Memory {
            cells: vec![0; size],
        }
    }

    /// Capacity in cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Does memory contain offset `pos`?
    pub fn has(&self, pos: usize) -> bool {
        pos < self.cells.len()
    }

    pub fn get(&self, pos: usize) -> Result<Cell, Exception> {
        self.cells
            .get(pos)
            .copied()
            .ok_or(Exception::InvalidMemoryAddress)
    }

    pub fn put(&mut self, pos: usize, v: Cell) -> Result<(), Exception> {
        match self.cells.get_mut(pos) {
            Some(c) => {
                *c = v;
                Ok(())
            }
            None => Err(Exception::InvalidMemoryAddress),
        }
    }

    /// Byte `i` of a string packed two bytes per cell starting at `pos`.
    pub fn get_byte(&self, pos: usize, i: usize) -> Result<u8, Exception> {
        let c = self.get(pos + i / 2)?;
        Ok(if i % 2 == 0 { c as u8 } else { (c >> 8) as u8 })
    }

    /// Pack `bytes` two per cell starting at `pos`.
    pub fn put_bytes(&mut self, pos: usize, bytes: &[u8]) -> Result<(), Exception> {
        for (i, pair) in bytes.chunks(2).enumerate() {
            let lo = pair[0] as Cell;
            let hi = pair.get(1).map_or(0, |b| *b as Cell);
            self.put(pos + i, lo | (hi << 8))?;
        }
        Ok(())
    }

    /// Read-only view of the whole arena.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }
}

/// Cells needed to hold `len` packed bytes.
pub fn packed_len(len: usize) -> usize {
    (len + 1) / 2
}
