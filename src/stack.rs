use crate::exception::Exception;
use crate::memory::{Cell, Memory};

/// A stack living in a reserved range `[base, limit)` of core memory.
///
/// The stack pointer is borrowed from the register set. Bounds are checked
/// before any cell is written, so a full or empty stack never touches the
/// neighbouring regions and leaves the pointer unchanged.
pub struct Stack<'a> {
    memory: &'a mut Memory,
    pointer: &'a mut Cell,
    base: Cell,
    limit: Cell,
    overflow: Exception,
    underflow: Exception,
}

impl<'a> Stack<'a> {
    pub fn new(
        memory: &'a mut Memory,
        pointer: &'a mut Cell,
        base: Cell,
        limit: Cell,
        overflow: Exception,
        underflow: Exception,
    ) -> Stack<'a> {
        Stack {
            memory,
            pointer,
            base,
            limit,
            overflow,
            underflow,
        }
    }

    pub fn len(&self) -> usize {
        self.pointer.saturating_sub(self.base) as usize
    }

    pub fn is_empty(&self) -> bool {
        *self.pointer <= self.base
    }

    pub fn capacity(&self) -> usize {
        (self.limit - self.base) as usize
    }

    pub fn push(&mut self, v: Cell) -> Result<(), Exception> {
        if *self.pointer >= self.limit {
            return Err(self.overflow);
        }
        self.memory.put(*self.pointer as usize, v)?;
        *self.pointer += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Cell, Exception> {
        if self.is_empty() {
            return Err(self.underflow);
        }
        let v = self.memory.get(*self.pointer as usize - 1)?;
        *self.pointer -= 1;
        Ok(v)
    }

    pub fn peek(&self) -> Result<Cell, Exception> {
        self.pick(0)
    }

    /// The `n`-th item below the top, 0 being the top.
    pub fn pick(&self, n: usize) -> Result<Cell, Exception> {
        if n >= self.len() {
            return Err(self.underflow);
        }
        self.memory.get(*self.pointer as usize - 1 - n)
    }

    /// Overwrite the `n`-th item below the top.
    pub fn set(&mut self, n: usize, v: Cell) -> Result<(), Exception> {
        if n >= self.len() {
            return Err(self.underflow);
        }
        self.memory.put(*self.pointer as usize - 1 - n, v)
    }

    /// Fail unless at least `n` items are present.
    pub fn require(&self, n: usize) -> Result<(), Exception> {
        if self.len() < n {
            Err(self.underflow)
        } else {
            Ok(())
        }
    }

    /// Contents from bottom to top.
    pub fn to_vec(&self) -> Vec<Cell> {
        let base = self.base as usize;
        self.memory.cells()[base..base + self.len()].to_vec()
    }
}
