use crate::exception::Exception;
use crate::memory::Cell;
use crate::vm::VM;

pub trait Environment {
    /// Add environment queries.
    fn add_environment(&mut self) -> Result<(), Exception>;

    /// Run-time: ( -- n )
    ///
    /// Largest signed value a cell holds.
    fn max_n(&mut self) -> Result<(), Exception>;

    /// Run-time: ( -- u )
    ///
    /// Largest unsigned value a cell holds.
    fn max_u(&mut self) -> Result<(), Exception>;
}

impl<'io> Environment for VM<'io> {
    fn add_environment(&mut self) -> Result<(), Exception> {
        self.add_primitive("max-n", VM::max_n)?;
        self.add_primitive("max-u", VM::max_u)?;
        Ok(())
    }

    fn max_n(&mut self) -> Result<(), Exception> {
        self.s_stack().push(i16::max_value() as Cell)
    }

    fn max_u(&mut self) -> Result<(), Exception> {
        self.s_stack().push(Cell::max_value())
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::vm::VM;
    use std::io;

    #[test]
    fn test_max_n() {
        let vm = &mut VM::new(Config::default(), io::empty(), io::sink()).unwrap();
        vm.evaluate("max-n dup 1+ +").unwrap();
        assert_eq!(vm.last_error(), None);
        assert_eq!(vm.data_stack(), &[0xffff]);
    }

    #[test]
    fn test_max_u() {
        let vm = &mut VM::new(Config::default(), io::empty(), io::sink()).unwrap();
        vm.evaluate("max-u 1+").unwrap();
        assert_eq!(vm.data_stack(), &[0]);
    }
}
