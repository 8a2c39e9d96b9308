//! Core word set: stack, arithmetic, logic, memory and radix primitives

use crate::exception::Exception;
use crate::memory::Cell;
use crate::vm::{flag, VM};

impl<'io> VM<'io> {
    pub(crate) fn add_core(&mut self) -> Result<(), Exception> {
        // Stack
        self.add_primitive("dup", VM::dup)?;
        self.add_primitive("drop", VM::p_drop)?;
        self.add_primitive("swap", VM::swap)?;
        self.add_primitive("over", VM::over)?;
        self.add_primitive("rot", VM::rot)?;
        self.add_primitive("-rot", VM::minus_rot)?;
        self.add_primitive("nip", VM::nip)?;
        self.add_primitive("tuck", VM::tuck)?;
        self.add_primitive("pick", VM::pick)?;
        self.add_primitive("?dup", VM::question_dup)?;
        self.add_primitive("2dup", VM::two_dup)?;
        self.add_primitive("2drop", VM::two_drop)?;
        self.add_primitive("2swap", VM::two_swap)?;
        self.add_primitive("2over", VM::two_over)?;
        self.add_primitive("depth", VM::depth)?;

        // Return stack
        self.add_primitive(">r", VM::to_r)?;
        self.add_primitive("r>", VM::r_from)?;
        self.add_primitive("r@", VM::r_fetch)?;
        self.add_primitive("i", VM::r_fetch)?;
        self.add_primitive("j", VM::j)?;
        self.add_primitive("unloop", VM::unloop)?;

        // Arithmetic and logic
        self.add_primitive("+", VM::plus)?;
        self.add_primitive("-", VM::minus)?;
        self.add_primitive("*", VM::star)?;
        self.add_primitive("/", VM::slash)?;
        self.add_primitive("mod", VM::p_mod)?;
        self.add_primitive("/mod", VM::slash_mod)?;
        self.add_primitive("negate", VM::negate)?;
        self.add_primitive("abs", VM::abs)?;
        self.add_primitive("1+", VM::one_plus)?;
        self.add_primitive("1-", VM::one_minus)?;
        self.add_primitive("2*", VM::two_star)?;
        self.add_primitive("2/", VM::two_slash)?;
        self.add_primitive("min", VM::min)?;
        self.add_primitive("max", VM::max)?;
        self.add_primitive("and", VM::and)?;
        self.add_primitive("or", VM::or)?;
        self.add_primitive("xor", VM::xor)?;
        self.add_primitive("invert", VM::invert)?;
        self.add_primitive("lshift", VM::lshift)?;
        self.add_primitive("rshift", VM::rshift)?;

        // Comparison
        self.add_primitive("=", VM::equals)?;
        self.add_primitive("<>", VM::not_equals)?;
        self.add_primitive("<", VM::less_than)?;
        self.add_primitive(">", VM::greater_than)?;
        self.add_primitive("u<", VM::u_less_than)?;
        self.add_primitive("u>", VM::u_greater_than)?;
        self.add_primitive("0=", VM::zero_equals)?;
        self.add_primitive("0<", VM::zero_less)?;
        self.add_primitive("0>", VM::zero_greater)?;
        self.add_primitive("0<>", VM::zero_not_equals)?;

        // Memory
        self.add_primitive("@", VM::fetch)?;
        self.add_primitive("!", VM::store)?;
        self.add_primitive("+!", VM::plus_store)?;
        self.add_primitive(",", VM::comma)?;
        self.add_primitive("here", VM::p_here)?;
        self.add_primitive("allot", VM::allot)?;
        self.add_primitive("cells", VM::noop)?;
        self.add_primitive("cell+", VM::one_plus)?;

        // Radix
        self.add_primitive("decimal", VM::decimal)?;
        self.add_primitive("hex", VM::hex)?;
        self.add_primitive("base!", VM::base_store)?;
        self.add_primitive("base@", VM::base_fetch)?;

        self.add_primitive("execute", VM::execute)?;
        self.add_primitive("key", VM::key)?;
        Ok(())
    }

    fn unary(&mut self, f: fn(Cell) -> Cell) -> Result<(), Exception> {
        let mut s = self.s_stack();
        let t = s.peek()?;
        s.set(0, f(t))
    }

    /// ( n t -- f(n, t) )
    fn binary(&mut self, f: fn(Cell, Cell) -> Result<Cell, Exception>) -> Result<(), Exception> {
        let mut s = self.s_stack();
        s.require(2)?;
        let t = s.pick(0)?;
        let n = s.pick(1)?;
        let v = f(n, t)?;
        s.pop()?;
        s.set(0, v)
    }

    pub fn noop(&mut self) -> Result<(), Exception> {
        Ok(())
    }

    // Stack

    pub fn dup(&mut self) -> Result<(), Exception> {
        let mut s = self.s_stack();
        let t = s.peek()?;
        s.push(t)
    }

    pub fn p_drop(&mut self) -> Result<(), Exception> {
        self.s_stack().pop().map(|_| ())
    }

    pub fn swap(&mut self) -> Result<(), Exception> {
        let mut s = self.s_stack();
        s.require(2)?;
        let t = s.pick(0)?;
        let n = s.pick(1)?;
        s.set(0, n)?;
        s.set(1, t)
    }

    pub fn over(&mut self) -> Result<(), Exception> {
        let mut s = self.s_stack();
        let n = s.pick(1)?;
        s.push(n)
    }

    /// ( x1 x2 x3 -- x2 x3 x1 )
    pub fn rot(&mut self) -> Result<(), Exception> {
        let mut s = self.s_stack();
        s.require(3)?;
        let (x3, x2, x1) = (s.pick(0)?, s.pick(1)?, s.pick(2)?);
        s.set(2, x2)?;
        s.set(1, x3)?;
        s.set(0, x1)
    }

    /// ( x1 x2 x3 -- x3 x1 x2 )
    pub fn minus_rot(&mut self) -> Result<(), Exception> {
        let mut s = self.s_stack();
        s.require(3)?;
        let (x3, x2, x1) = (s.pick(0)?, s.pick(1)?, s.pick(2)?);
        s.set(2, x3)?;
        s.set(1, x1)?;
        s.set(0, x2)
    }

    pub fn nip(&mut self) -> Result<(), Exception> {
        let mut s = self.s_stack();
        s.require(2)?;
        let t = s.pop()?;
        s.set(0, t)
    }

    /// ( x1 x2 -- x2 x1 x2 )
    pub fn tuck(&mut self) -> Result<(), Exception> {
        let mut s = self.s_stack();
        s.require(2)?;
        let t = s.pick(0)?;
        let n = s.pick(1)?;
        s.push(t)?;
        s.set(1, n)?;
        s.set(2, t)
    }

    /// ( xu ... x0 u -- xu ... x0 xu )
    pub fn pick(&mut self) -> Result<(), Exception> {
        let mut s = self.s_stack();
        let u = s.peek()? as usize;
        let x = s.pick(u + 1)?;
        s.set(0, x)
    }

    pub fn question_dup(&mut self) -> Result<(), Exception> {
        let mut s = self.s_stack();
        let t = s.peek()?;
        if t != 0 {
            s.push(t)?;
        }
        Ok(())
    }

    pub fn two_dup(&mut self) -> Result<(), Exception> {
        let mut s = self.s_stack();
        s.require(2)?;
        if s.capacity() - s.len() < 2 {
            return Err(Exception::StackOverflow);
        }
        let t = s.pick(0)?;
        let n = s.pick(1)?;
        s.push(n)?;
        s.push(t)
    }

    pub fn two_drop(&mut self) -> Result<(), Exception> {
        let mut s = self.s_stack();
        s.require(2)?;
        s.pop()?;
        s.pop().map(|_| ())
    }

    /// ( x1 x2 x3 x4 -- x3 x4 x1 x2 )
    pub fn two_swap(&mut self) -> Result<(), Exception> {
        let mut s = self.s_stack();
        s.require(4)?;
        let (x4, x3, x2, x1) = (s.pick(0)?, s.pick(1)?, s.pick(2)?, s.pick(3)?);
        s.set(3, x3)?;
        s.set(2, x4)?;
        s.set(1, x1)?;
        s.set(0, x2)
    }

    /// ( x1 x2 x3 x4 -- x1 x2 x3 x4 x1 x2 )
    pub fn two_over(&mut self) -> Result<(), Exception> {
        let mut s = self.s_stack();
        s.require(4)?;
        if s.capacity() - s.len() < 2 {
            return Err(Exception::StackOverflow);
        }
        let x2 = s.pick(2)?;
        let x1 = s.pick(3)?;
        s.push(x1)?;
        s.push(x2)
    }

    pub fn depth(&mut self) -> Result<(), Exception> {
        let mut s = self.s_stack();
        let n = s.len() as Cell;
        s.push(n)
    }

    // Return stack

    pub fn to_r(&mut self) -> Result<(), Exception> {
        let v = self.s_stack().peek()?;
        self.r_stack().push(v)?;
        self.s_stack().pop().map(|_| ())
    }

    pub fn r_from(&mut self) -> Result<(), Exception> {
        let v = self.r_stack().peek()?;
        self.s_stack().push(v)?;
        self.r_stack().pop().map(|_| ())
    }

    pub fn r_fetch(&mut self) -> Result<(), Exception> {
        let v = self.r_stack().peek()?;
        self.s_stack().push(v)
    }

    /// Index of the enclosing loop.
    pub fn j(&mut self) -> Result<(), Exception> {
        let v = self.r_stack().pick(2)?;
        self.s_stack().push(v)
    }

    pub fn unloop(&mut self) -> Result<(), Exception> {
        let mut r = self.r_stack();
        r.require(2)?;
        r.pop()?;
        r.pop().map(|_| ())
    }

    // Arithmetic and logic

    pub fn plus(&mut self) -> Result<(), Exception> {
        self.binary(|n, t| Ok(n.wrapping_add(t)))
    }

    pub fn minus(&mut self) -> Result<(), Exception> {
        self.binary(|n, t| Ok(n.wrapping_sub(t)))
    }

    pub fn star(&mut self) -> Result<(), Exception> {
        self.binary(|n, t| Ok(n.wrapping_mul(t)))
    }

    /// Signed division, truncating toward zero.
    pub fn slash(&mut self) -> Result<(), Exception> {
        self.binary(|n, t| {
            if t == 0 {
                return Err(Exception::DivisionByZero);
            }
            (n as i16)
                .checked_div(t as i16)
                .map(|q| q as Cell)
                .ok_or(Exception::ResultOutOfRange)
        })
    }

    pub fn p_mod(&mut self) -> Result<(), Exception> {
        self.binary(|n, t| {
            if t == 0 {
                return Err(Exception::DivisionByZero);
            }
            (n as i16)
                .checked_rem(t as i16)
                .map(|r| r as Cell)
                .ok_or(Exception::ResultOutOfRange)
        })
    }

    /// ( n t -- rem quot )
    pub fn slash_mod(&mut self) -> Result<(), Exception> {
        let mut s = self.s_stack();
        s.require(2)?;
        let t = s.pick(0)? as i16;
        let n = s.pick(1)? as i16;
        if t == 0 {
            return Err(Exception::DivisionByZero);
        }
        match (n.checked_rem(t), n.checked_div(t)) {
            (Some(r), Some(q)) => {
                s.set(1, r as Cell)?;
                s.set(0, q as Cell)
            }
            _ => Err(Exception::ResultOutOfRange),
        }
    }

    pub fn negate(&mut self) -> Result<(), Exception> {
        self.unary(|t| t.wrapping_neg())
    }

    pub fn abs(&mut self) -> Result<(), Exception> {
        self.unary(|t| (t as i16).wrapping_abs() as Cell)
    }

    pub fn one_plus(&mut self) -> Result<(), Exception> {
        self.unary(|t| t.wrapping_add(1))
    }

    pub fn one_minus(&mut self) -> Result<(), Exception> {
        self.unary(|t| t.wrapping_sub(1))
    }

    pub fn two_star(&mut self) -> Result<(), Exception> {
        self.unary(|t| t << 1)
    }

    pub fn two_slash(&mut self) -> Result<(), Exception> {
        self.unary(|t| ((t as i16) >> 1) as Cell)
    }

    pub fn min(&mut self) -> Result<(), Exception> {
        self.binary(|n, t| Ok(if (n as i16) < (t as i16) { n } else { t }))
    }

    pub fn max(&mut self) -> Result<(), Exception> {
        self.binary(|n, t| Ok(if (n as i16) > (t as i16) { n } else { t }))
    }

    pub fn and(&mut self) -> Result<(), Exception> {
        self.binary(|n, t| Ok(n & t))
    }

    pub fn or(&mut self) -> Result<(), Exception> {
        self.binary(|n, t| Ok(n | t))
    }

    pub fn xor(&mut self) -> Result<(), Exception> {
        self.binary(|n, t| Ok(n ^ t))
    }

    pub fn invert(&mut self) -> Result<(), Exception> {
        self.unary(|t| !t)
    }

    pub fn lshift(&mut self) -> Result<(), Exception> {
        self.binary(|n, t| Ok(n.checked_shl(t as u32).unwrap_or(0)))
    }

    pub fn rshift(&mut self) -> Result<(), Exception> {
        self.binary(|n, t| Ok(n.checked_shr(t as u32).unwrap_or(0)))
    }

    // Comparison

    pub fn equals(&mut self) -> Result<(), Exception> {
        self.binary(|n, t| Ok(flag(n == t)))
    }

    pub fn not_equals(&mut self) -> Result<(), Exception> {
        self.binary(|n, t| Ok(flag(n != t)))
    }

    pub fn less_than(&mut self) -> Result<(), Exception> {
        self.binary(|n, t| Ok(flag((n as i16) < (t as i16))))
    }

    pub fn greater_than(&mut self) -> Result<(), Exception> {
        self.binary(|n, t| Ok(flag((n as i16) > (t as i16))))
    }

    pub fn u_less_than(&mut self) -> Result<(), Exception> {
        self.binary(|n, t| Ok(flag(n < t)))
    }

    pub fn u_greater_than(&mut self) -> Result<(), Exception> {
        self.binary(|n, t| Ok(flag(n > t)))
    }

    pub fn zero_equals(&mut self) -> Result<(), Exception> {
        self.unary(|t| flag(t == 0))
    }

    pub fn zero_less(&mut self) -> Result<(), Exception> {
        self.unary(|t| flag((t as i16) < 0))
    }

    pub fn zero_greater(&mut self) -> Result<(), Exception> {
        self.unary(|t| flag((t as i16) > 0))
    }

    pub fn zero_not_equals(&mut self) -> Result<(), Exception> {
        self.unary(|t| flag(t != 0))
    }

    // Memory

    pub fn fetch(&mut self) -> Result<(), Exception> {
        let addr = self.s_stack().peek()?;
        let v = self.memory.get(addr as usize)?;
        self.s_stack().set(0, v)
    }

    /// ( x addr -- )
    pub fn store(&mut self) -> Result<(), Exception> {
        let s = self.s_stack();
        s.require(2)?;
        let addr = s.pick(0)?;
        let x = s.pick(1)?;
        self.memory.put(addr as usize, x)?;
        self.two_drop()
    }

    /// ( n addr -- )
    pub fn plus_store(&mut self) -> Result<(), Exception> {
        let s = self.s_stack();
        s.require(2)?;
        let addr = s.pick(0)?;
        let n = s.pick(1)?;
        let v = self.memory.get(addr as usize)?;
        self.memory.put(addr as usize, v.wrapping_add(n))?;
        self.two_drop()
    }

    pub fn comma(&mut self) -> Result<(), Exception> {
        let v = self.s_stack().peek()?;
        self.compile_cell(v)?;
        self.p_drop()
    }

    pub fn p_here(&mut self) -> Result<(), Exception> {
        let here = self.regs.here;
        self.s_stack().push(here)
    }

    /// ( n -- ) Reserve `n` cells of dictionary space. `n` may be negative.
    pub fn allot(&mut self) -> Result<(), Exception> {
        let n = self.s_stack().peek()?;
        self.allot_cells(n as i16)?;
        self.p_drop()
    }

    // Radix

    pub fn decimal(&mut self) -> Result<(), Exception> {
        self.regs.base = 10;
        Ok(())
    }

    pub fn hex(&mut self) -> Result<(), Exception> {
        self.regs.base = 16;
        Ok(())
    }

    pub fn base_store(&mut self) -> Result<(), Exception> {
        let base = self.s_stack().peek()?;
        if base < 2 || base > 36 {
            return Err(Exception::InvalidNumericArgument);
        }
        self.regs.base = base;
        self.p_drop()
    }

    pub fn base_fetch(&mut self) -> Result<(), Exception> {
        let base = self.regs.base;
        self.s_stack().push(base)
    }

    /// ( xt -- ) Run the word `xt` to completion.
    pub fn execute(&mut self) -> Result<(), Exception> {
        let xt = self.s_stack().pop()?;
        self.execute_word(xt)
    }

    /// ( -- c ) Next input byte, `0xffff` at end of input.
    pub fn key(&mut self) -> Result<(), Exception> {
        let c = self.input.read_byte()?.map_or(Cell::MAX, |b| b as Cell);
        self.s_stack().push(c)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::exception::{Error, Exception};
    use crate::memory::Cell;
    use crate::vm::VM;
    use std::io;

    fn vm() -> VM<'static> {
        VM::new(Config::default(), io::empty(), io::sink()).unwrap()
    }

    fn eval(text: &str) -> Vec<Cell> {
        let vm = &mut vm();
        vm.evaluate(text).unwrap();
        vm.data_stack().to_vec()
    }

    fn fault(text: &str) -> Exception {
        match vm().evaluate(text) {
            Err(Error::Fault(e)) => e,
            other => panic!("expected a fault, got {:?}", other),
        }
    }

    #[test]
    fn test_stack_words() {
        assert_eq!(eval("1 dup"), vec![1, 1]);
        assert_eq!(eval("1 2 drop"), vec![1]);
        assert_eq!(eval("1 2 swap"), vec![2, 1]);
        assert_eq!(eval("1 2 over"), vec![1, 2, 1]);
        assert_eq!(eval("1 2 3 rot"), vec![2, 3, 1]);
        assert_eq!(eval("1 2 3 -rot"), vec![3, 1, 2]);
        assert_eq!(eval("1 2 nip"), vec![2]);
        assert_eq!(eval("1 2 tuck"), vec![2, 1, 2]);
        assert_eq!(eval("10 20 30 2 pick"), vec![10, 20, 30, 10]);
        assert_eq!(eval("0 ?dup 5 ?dup"), vec![0, 5, 5]);
        assert_eq!(eval("1 2 2dup"), vec![1, 2, 1, 2]);
        assert_eq!(eval("1 2 3 2drop"), vec![1]);
        assert_eq!(eval("1 2 3 4 2swap"), vec![3, 4, 1, 2]);
        assert_eq!(eval("1 2 3 4 2over"), vec![1, 2, 3, 4, 1, 2]);
        assert_eq!(eval("7 7 depth"), vec![7, 7, 2]);
    }

    #[test]
    fn test_stack_underflow() {
        assert_eq!(fault("drop"), Exception::StackUnderflow);
        assert_eq!(fault("1 swap"), Exception::StackUnderflow);
        assert_eq!(fault("1 2 rot"), Exception::StackUnderflow);
        assert_eq!(fault("1 +"), Exception::StackUnderflow);
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("2 3 +"), vec![5]);
        assert_eq!(eval("2 3 -"), vec![0xffff]);
        assert_eq!(eval("6 7 *"), vec![42]);
        assert_eq!(eval("-7 2 /"), vec![(-3i16) as Cell]);
        assert_eq!(eval("-7 2 mod"), vec![(-1i16) as Cell]);
        assert_eq!(eval("7 2 /mod"), vec![1, 3]);
        assert_eq!(eval("5 negate"), vec![(-5i16) as Cell]);
        assert_eq!(eval("-5 abs"), vec![5]);
        assert_eq!(eval("65535 1+"), vec![0]);
        assert_eq!(eval("0 1-"), vec![0xffff]);
        assert_eq!(eval("3 2* -4 2/"), vec![6, (-2i16) as Cell]);
        assert_eq!(eval("-1 3 min -1 3 max"), vec![0xffff, 3]);
        assert_eq!(eval("12 10 and 12 10 or 12 10 xor 0 invert"), vec![8, 14, 6, 0xffff]);
        assert_eq!(eval("1 4 lshift 256 8 rshift 1 16 lshift"), vec![16, 1, 0]);
    }

    #[test]
    fn test_division_faults() {
        assert_eq!(fault("1 0 /"), Exception::DivisionByZero);
        assert_eq!(fault("1 0 mod"), Exception::DivisionByZero);
        assert_eq!(fault("-32768 -1 /"), Exception::ResultOutOfRange);
    }

    #[test]
    fn test_comparison() {
        assert_eq!(eval("1 1 = 1 2 = 1 2 <>"), vec![0xffff, 0, 0xffff]);
        assert_eq!(eval("-1 0 < -1 0 u< 2 1 >"), vec![0xffff, 0, 0xffff]);
        assert_eq!(eval("-1 0 u>"), vec![0xffff]);
        assert_eq!(eval("0 0= -3 0< 3 0> 0 0<>"), vec![0xffff, 0xffff, 0xffff, 0]);
    }

    #[test]
    fn test_memory_words() {
        assert_eq!(eval("here 5 , @"), vec![5]);
        assert_eq!(eval("here 1 allot 9 over ! @"), vec![9]);
        assert_eq!(eval("here 1 allot 9 over ! 3 over +! @"), vec![12]);
        assert_eq!(eval("here 2 allot here swap -"), vec![2]);
        assert_eq!(eval("3 cells 3 cell+"), vec![3, 4]);
        assert_eq!(fault("65535 @"), Exception::InvalidMemoryAddress);
    }

    #[test]
    fn test_return_stack_words() {
        assert_eq!(eval("1 >r 2 r@ r>"), vec![2, 1, 1]);
        assert_eq!(fault("r>"), Exception::ReturnStackUnderflow);
    }

    #[test]
    fn test_radix() {
        assert_eq!(eval("hex ff decimal 10"), vec![255, 10]);
        assert_eq!(eval("2 base! 101 base@ decimal"), vec![5, 2]);
        assert_eq!(fault("1 base!"), Exception::InvalidNumericArgument);
        assert_eq!(fault("37 base!"), Exception::InvalidNumericArgument);
    }

    #[test]
    fn test_key() {
        let vm = &mut vm();
        vm.evaluate("key a").unwrap();
        assert_eq!(vm.data_stack(), &[b'a' as Cell]);
        vm.evaluate("key").unwrap();
        assert_eq!(vm.data_stack(), &[b'a' as Cell, 0xffff]);
    }

    #[test]
    fn test_execute_runtime_outside_definition() {
        assert_eq!(fault("3 execute"), Exception::InterpretingACompileOnlyWord);
        assert_eq!(fault("0 execute"), Exception::InvalidMemoryAddress);
    }
}
