use crate::exception::Exception;
use crate::memory::Cell;
use crate::vm::VM;

/// Format `n` in radix `base`, upper case digits, with a leading minus
/// when `negative`.
pub fn format_number(n: u32, negative: bool, base: Cell) -> String {
    let base = base as u32;
    let mut digits = Vec::new();
    let mut n = n;
    loop {
        let d = std::char::from_digit(n % base, base).unwrap_or('?');
        digits.push(d.to_ascii_uppercase());
        n /= base;
        if n == 0 {
            break;
        }
    }
    if negative {
        digits.push('-');
    }
    digits.iter().rev().collect()
}

/// Format `v` as a signed number in `base`.
pub fn format_signed(v: Cell, base: Cell) -> String {
    let n = v as i16 as i32;
    format_number(n.unsigned_abs(), n < 0, base)
}

/// Words writing to the output sink.
pub trait Output {
    fn add_output(&mut self) -> Result<(), Exception>;

    /// Run-time: ( x -- )
    ///
    /// Write the low byte of `x`.
    fn emit(&mut self) -> Result<(), Exception>;

    /// Run-time: ( n -- )
    ///
    /// Display `n` as a signed number in the current radix, then a space.
    fn dot(&mut self) -> Result<(), Exception>;

    /// Run-time: ( u -- )
    fn u_dot(&mut self) -> Result<(), Exception>;

    fn cr(&mut self) -> Result<(), Exception>;

    fn space(&mut self) -> Result<(), Exception>;

    /// Run-time: ( n -- )
    ///
    /// Write `n` spaces, nothing if `n` is not positive.
    fn spaces(&mut self) -> Result<(), Exception>;

    /// Compilation: ( "ccc<quote>" -- )
    ///
    /// Display `ccc` at run time, or at once when interpreting.
    fn dot_quote(&mut self) -> Result<(), Exception>;
}

impl<'io> Output for VM<'io> {
    fn add_output(&mut self) -> Result<(), Exception> {
        self.add_primitive("emit", VM::emit)?;
        self.add_primitive(".", VM::dot)?;
        self.add_primitive("u.", VM::u_dot)?;
        self.add_primitive("cr", VM::cr)?;
        self.add_primitive("space", VM::space)?;
        self.add_primitive("spaces", VM::spaces)?;
        self.add_immediate(".\"", VM::dot_quote)?;
        Ok(())
    }

    fn emit(&mut self) -> Result<(), Exception> {
        let c = self.s_stack().pop()?;
        self.write_bytes(&[c as u8])
    }

    fn dot(&mut self) -> Result<(), Exception> {
        let v = self.s_stack().pop()?;
        let s = format_signed(v, self.regs.base);
        self.write_bytes(s.as_bytes())?;
        self.write_bytes(b" ")
    }

    fn u_dot(&mut self) -> Result<(), Exception> {
        let v = self.s_stack().pop()?;
        let s = format_number(v as u32, false, self.regs.base);
        self.write_bytes(s.as_bytes())?;
        self.write_bytes(b" ")
    }

    fn cr(&mut self) -> Result<(), Exception> {
        self.write_bytes(b"\n")
    }

    fn space(&mut self) -> Result<(), Exception> {
        self.write_bytes(b" ")
    }

    fn spaces(&mut self) -> Result<(), Exception> {
        let n = self.s_stack().pop()? as i16;
        if n > 0 {
            self.write_bytes(&vec![b' '; n as usize])?;
        }
        Ok(())
    }

    fn dot_quote(&mut self) -> Result<(), Exception> {
        let text = self.parse(b'"')?;
        if self.regs.is_compiling() {
            let p_dot_quote = self.references.idx_dot_quote;
            self.compile_cell(p_dot_quote)?;
            self.compile_string(&text)
        } else {
            self.write_bytes(&text)
        }
    }
}
