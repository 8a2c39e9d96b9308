use crate::memory::Cell;

/// Outer interpreter state.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum State {
    Interpret,
    Compile,
}

/// Register set of a virtual machine.
///
/// All pointers are offsets into core memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registers {
    /// Next cell to execute, 0 outside a compiled body.
    pub ip: Cell,
    /// Execution token of the word being executed.
    pub w: Cell,
    /// Next free slot of the data stack.
    pub sp: Cell,
    /// Next free slot of the return stack.
    pub rp: Cell,
    /// Next free cell of the dictionary.
    pub here: Cell,
    pub base: Cell,
    pub state: State,
    /// Newest word record.
    pub latest: Cell,
    /// Record under definition, 0 if none.
    pub defining: Cell,
    pub fault: bool,
    pub s0: Cell,
    pub s_limit: Cell,
    pub r0: Cell,
    pub r_limit: Cell,
}

impl Registers {
    /// Cells in the serialized register block.
    pub const COUNT: usize = 14;

    pub fn to_cells(&self) -> [Cell; Registers::COUNT] {
        [
            self.ip,
            self.w,
            self.sp,
            self.rp,
            self.here,
            self.base,
            match self.state {
                State::Interpret => 0,
                State::Compile => 1,
            },
            self.latest,
            self.defining,
            self.fault as Cell,
            self.s0,
            self.s_limit,
            self.r0,
            self.r_limit,
        ]
    }

    pub fn is_compiling(&self) -> bool {
        self.state == State::Compile
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_cells_order() {
        let regs = Registers {
            ip: 1,
            w: 2,
            sp: 3,
            rp: 4,
            here: 5,
            base: 10,
            state: State::Compile,
            latest: 7,
            defining: 8,
            fault: true,
            s0: 11,
            s_limit: 12,
            r0: 13,
            r_limit: 14,
        };
        assert_eq!(
            regs.to_cells(),
            [1, 2, 3, 4, 5, 10, 1, 7, 8, 1, 11, 12, 13, 14]
        );
        assert!(regs.is_compiling());
    }
}
