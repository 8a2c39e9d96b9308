use crate::exception::Exception;
use crate::output::format_signed;
use crate::vm::VM;

pub trait Tools {
    /// Add programming-tools primitives.
    fn add_tools(&mut self) -> Result<(), Exception>;

    /// Run-time: ( -- )
    ///
    /// Display values on the data stack.
    fn dot_s(&mut self) -> Result<(), Exception>;

    /// Run-time: ( -- )
    ///
    /// List definition names in word list.
    fn words(&mut self) -> Result<(), Exception>;
}

impl<'io> Tools for VM<'io> {
    fn add_tools(&mut self) -> Result<(), Exception> {
        self.add_primitive("words", VM::words)?;
        self.add_primitive(".s", VM::dot_s)?;
        Ok(())
    }

    fn words(&mut self) -> Result<(), Exception> {
        let mut text = Vec::new();
        for w in self.word_list()? {
            if !w.is_hidden() {
                text.extend(self.word_name(&w)?);
                text.push(b' ');
            }
        }
        text.push(b'\n');
        self.write_bytes(&text)
    }

    fn dot_s(&mut self) -> Result<(), Exception> {
        let base = self.regs.base;
        let mut text = format!("<{}> ", self.data_stack().len());
        for v in self.data_stack() {
            text.push_str(&format_signed(*v, base));
            text.push(' ');
        }
        self.write_bytes(text.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::vm::VM;
    use std::io;

    #[test]
    fn test_dot_s() {
        let mut out = Vec::new();
        {
            let vm = &mut VM::new(Config::default(), io::empty(), &mut out).unwrap();
            vm.evaluate("1 -2 3 .s").unwrap();
            assert_eq!(vm.data_stack(), &[1, 0xfffe, 3]);
        }
        assert_eq!(out, b"<3> 1 -2 3 ".to_vec());
    }

    #[test]
    fn test_words_newest_first() {
        let mut out = Vec::new();
        {
            let vm = &mut VM::new(Config::default(), io::empty(), &mut out).unwrap();
            vm.evaluate(": zzz ; words").unwrap();
        }
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("zzz max-u max-n .s words "));
        assert!(text.contains(" dup "));
        assert!(text.ends_with("exit \n"));
    }
}
