//! Environment configuration

use crate::exception::Error;
use crate::memory::{DICTIONARY_START, MAX_CORE_SIZE};

/// Size of core memory and its stacks, in cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub core_size: usize,
    pub data_stack_size: usize,
    pub return_stack_size: usize,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            core_size: 32 * 1024,
            data_stack_size: 64,
            return_stack_size: 128,
        }
    }
}

/// Region boundaries derived from a `Config`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub s0: usize,
    pub r0: usize,
    pub r_limit: usize,
}

impl Config {
    pub fn with_core_size(mut self, cells: usize) -> Config {
        self.core_size = cells;
        self
    }

    pub fn with_data_stack_size(mut self, cells: usize) -> Config {
        self.data_stack_size = cells;
        self
    }

    pub fn with_return_stack_size(mut self, cells: usize) -> Config {
        self.return_stack_size = cells;
        self
    }

    /// Lay out dictionary, data stack and return stack, low to high.
    pub fn layout(&self) -> Result<Layout, Error> {
        if self.core_size > MAX_CORE_SIZE {
            return Err(Error::InvalidConfig("core size exceeds cell range"));
        }
        if self.data_stack_size == 0 || self.return_stack_size == 0 {
            return Err(Error::InvalidConfig("stacks must hold at least one cell"));
        }
        let stacks = self.data_stack_size + self.return_stack_size;
        if DICTIONARY_START + stacks >= self.core_size {
            return Err(Error::InvalidConfig("core too small for its stacks"));
        }
        let r0 = self.core_size - self.return_stack_size;
        Ok(Layout {
            s0: r0 - self.data_stack_size,
            r0,
            r_limit: self.core_size,
        })
    }
}
