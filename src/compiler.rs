use crate::exception::Exception;
use crate::memory::Cell;
use crate::registers::State;
use crate::vm::VM;
use crate::word::HIDDEN;
use log::debug;

// Tags of control-flow entries on the data stack while compiling.
const COLON_SYS: Cell = 0xfc00;
const ORIG: Cell = 0xfc01;
const DEST: Cell = 0xfc02;
const DO_SYS: Cell = 0xfc03;

/// Defining words, the compiler and control structures.
pub trait Compiler {
    fn add_compiler(&mut self) -> Result<(), Exception>;

    /// Compilation: ( "name" -- colon-sys )
    ///
    /// Begin a hidden definition of `name` and enter compile state.
    fn colon(&mut self) -> Result<(), Exception>;

    /// Compilation: ( colon-sys -- )
    ///
    /// Compile `exit`, reveal the definition and return to interpret state.
    fn semicolon(&mut self) -> Result<(), Exception>;

    /// Make the newest definition immediate.
    fn immediate(&mut self) -> Result<(), Exception>;

    /// ( "name" -- ) Name the data field that follows, which pushes its
    /// address when executed.
    fn create(&mut self) -> Result<(), Exception>;

    fn variable(&mut self) -> Result<(), Exception>;

    /// ( x "name" -- )
    fn constant(&mut self) -> Result<(), Exception>;

    /// ( "name" -- xt )
    fn tick(&mut self) -> Result<(), Exception>;

    /// Compilation: ( "name" -- )
    fn bracket_tick(&mut self) -> Result<(), Exception>;

    fn left_bracket(&mut self) -> Result<(), Exception>;

    fn right_bracket(&mut self) -> Result<(), Exception>;

    /// Compilation: ( x -- )
    fn literal(&mut self) -> Result<(), Exception>;

    /// Compile a call to the definition being compiled.
    fn recurse(&mut self) -> Result<(), Exception>;

    /// ( "name" -- char )
    fn char(&mut self) -> Result<(), Exception>;

    fn bracket_char(&mut self) -> Result<(), Exception>;

    fn imm_paren(&mut self) -> Result<(), Exception>;

    fn imm_backslash(&mut self) -> Result<(), Exception>;

    /// Compilation: ( -- orig )
    fn imm_if(&mut self) -> Result<(), Exception>;

    /// Compilation: ( orig1 -- orig2 )
    fn imm_else(&mut self) -> Result<(), Exception>;

    /// Compilation: ( orig -- )
    fn imm_then(&mut self) -> Result<(), Exception>;

    /// Compilation: ( -- dest )
    fn imm_begin(&mut self) -> Result<(), Exception>;

    /// Compilation: ( dest -- )
    fn imm_until(&mut self) -> Result<(), Exception>;

    fn imm_again(&mut self) -> Result<(), Exception>;

    /// Compilation: ( dest -- orig dest )
    fn imm_while(&mut self) -> Result<(), Exception>;

    /// Compilation: ( orig dest -- )
    fn imm_repeat(&mut self) -> Result<(), Exception>;

    /// Compilation: ( -- do-sys )
    fn imm_do(&mut self) -> Result<(), Exception>;

    /// Compilation: ( do-sys -- )
    fn imm_loop(&mut self) -> Result<(), Exception>;

    fn imm_plus_loop(&mut self) -> Result<(), Exception>;
}

impl<'io> VM<'io> {
    fn require_compiling(&self) -> Result<(), Exception> {
        if self.regs.is_compiling() {
            Ok(())
        } else {
            Err(Exception::InterpretingACompileOnlyWord)
        }
    }

    fn push_control(&mut self, addr: Cell, tag: Cell) -> Result<(), Exception> {
        let mut s = self.s_stack();
        if s.capacity() - s.len() < 2 {
            return Err(Exception::StackOverflow);
        }
        s.push(addr)?;
        s.push(tag)
    }

    fn pop_control(&mut self, tag: Cell) -> Result<Cell, Exception> {
        let mut s = self.s_stack();
        if s.len() < 2 || s.peek()? != tag {
            return Err(Exception::ControlStructureMismatch);
        }
        s.pop()?;
        s.pop()
    }

    /// Compile an unresolved offset and push its address.
    fn mark_forward(&mut self) -> Result<(), Exception> {
        let orig = self.regs.here;
        self.compile_cell(0)?;
        self.push_control(orig, ORIG)
    }

    /// Point the offset at `orig` to `here`.
    fn resolve_forward(&mut self, orig: Cell) -> Result<(), Exception> {
        let offset = self.regs.here.wrapping_sub(orig);
        self.memory.put(orig as usize, offset)
    }

    fn compile_backward(&mut self, dest: Cell) -> Result<(), Exception> {
        let offset = dest.wrapping_sub(self.regs.here);
        self.compile_cell(offset)
    }

    fn find_parsed(&mut self) -> Result<Cell, Exception> {
        let name = self.parse_name()?;
        match self.find(&name)? {
            Some(word) => Ok(word.xt() as Cell),
            None => Err(Exception::UndefinedWord),
        }
    }
}

impl<'io> Compiler for VM<'io> {
    fn add_compiler(&mut self) -> Result<(), Exception> {
        self.add_immediate(":", VM::colon)?;
        self.add_immediate(";", VM::semicolon)?;
        self.add_primitive("immediate", VM::immediate)?;
        self.add_primitive("create", VM::create)?;
        self.add_primitive("variable", VM::variable)?;
        self.add_primitive("constant", VM::constant)?;
        self.add_primitive("'", VM::tick)?;
        self.add_immediate("[']", VM::bracket_tick)?;
        self.add_immediate("[", VM::left_bracket)?;
        self.add_immediate("]", VM::right_bracket)?;
        self.add_immediate("literal", VM::literal)?;
        self.add_immediate("recurse", VM::recurse)?;
        self.add_primitive("char", VM::char)?;
        self.add_immediate("[char]", VM::bracket_char)?;
        self.add_immediate("(", VM::imm_paren)?;
        self.add_immediate("\\", VM::imm_backslash)?;
        self.add_immediate("if", VM::imm_if)?;
        self.add_immediate("else", VM::imm_else)?;
        self.add_immediate("then", VM::imm_then)?;
        self.add_immediate("begin", VM::imm_begin)?;
        self.add_immediate("until", VM::imm_until)?;
        self.add_immediate("again", VM::imm_again)?;
        self.add_immediate("while", VM::imm_while)?;
        self.add_immediate("repeat", VM::imm_repeat)?;
        self.add_immediate("do", VM::imm_do)?;
        self.add_immediate("loop", VM::imm_loop)?;
        self.add_immediate("+loop", VM::imm_plus_loop)?;
        Ok(())
    }

    fn colon(&mut self) -> Result<(), Exception> {
        if self.regs.is_compiling() || self.regs.defining != 0 {
            return Err(Exception::CompilerNesting);
        }
        let name = self.parse_name()?;
        let nest = self.references.idx_nest;
        let word = self.create_record(&name, nest, HIDDEN)?;
        self.push_control(word.nfa as Cell, COLON_SYS)?;
        self.regs.defining = word.nfa as Cell;
        self.regs.state = State::Compile;
        debug!("defining {}", String::from_utf8_lossy(&name));
        Ok(())
    }

    fn semicolon(&mut self) -> Result<(), Exception> {
        if !self.regs.is_compiling() || self.regs.defining == 0 {
            return Err(Exception::CompilerNesting);
        }
        let nfa = self.pop_control(COLON_SYS)?;
        if nfa != self.regs.defining {
            return Err(Exception::ControlStructureMismatch);
        }
        let exit = self.references.idx_exit;
        self.compile_cell(exit)?;
        self.reveal(nfa as usize)?;
        self.regs.defining = 0;
        self.regs.state = State::Interpret;
        debug!(
            "defined {} ({} cells)",
            String::from_utf8_lossy(&self.word_name(&self.word_at(nfa as usize)?)?),
            self.regs.here.wrapping_sub(nfa)
        );
        Ok(())
    }

    fn immediate(&mut self) -> Result<(), Exception> {
        self.set_immediate()
    }

    fn create(&mut self) -> Result<(), Exception> {
        let name = self.parse_name()?;
        let var = self.references.idx_var;
        self.create_record(&name, var, 0)?;
        Ok(())
    }

    fn variable(&mut self) -> Result<(), Exception> {
        self.create()?;
        self.compile_cell(0)
    }

    fn constant(&mut self) -> Result<(), Exception> {
        let v = self.s_stack().pop()?;
        let name = self.parse_name()?;
        let constant = self.references.idx_const;
        self.create_record(&name, constant, 0)?;
        self.compile_cell(v)
    }

    fn tick(&mut self) -> Result<(), Exception> {
        let xt = self.find_parsed()?;
        self.s_stack().push(xt)
    }

    fn bracket_tick(&mut self) -> Result<(), Exception> {
        self.require_compiling()?;
        let xt = self.find_parsed()?;
        self.compile_integer(xt)
    }

    fn left_bracket(&mut self) -> Result<(), Exception> {
        if !self.regs.is_compiling() {
            return Err(Exception::CompilerNesting);
        }
        self.regs.state = State::Interpret;
        Ok(())
    }

    fn right_bracket(&mut self) -> Result<(), Exception> {
        if self.regs.is_compiling() {
            return Err(Exception::CompilerNesting);
        }
        self.regs.state = State::Compile;
        Ok(())
    }

    fn literal(&mut self) -> Result<(), Exception> {
        self.require_compiling()?;
        let v = self.s_stack().pop()?;
        self.compile_integer(v)
    }

    fn recurse(&mut self) -> Result<(), Exception> {
        self.require_compiling()?;
        if self.regs.defining == 0 {
            return Err(Exception::CompilerNesting);
        }
        let xt = self.word_at(self.regs.defining as usize)?.xt();
        self.compile_cell(xt as Cell)
    }

    fn char(&mut self) -> Result<(), Exception> {
        let name = self.parse_name()?;
        self.s_stack().push(name[0] as Cell)
    }

    fn bracket_char(&mut self) -> Result<(), Exception> {
        self.require_compiling()?;
        let name = self.parse_name()?;
        self.compile_integer(name[0] as Cell)
    }

    fn imm_paren(&mut self) -> Result<(), Exception> {
        self.parse(b')').map(|_| ())
    }

    fn imm_backslash(&mut self) -> Result<(), Exception> {
        self.parse(b'\n').map(|_| ())
    }

    fn imm_if(&mut self) -> Result<(), Exception> {
        self.require_compiling()?;
        let zero_branch = self.references.idx_zero_branch;
        self.compile_cell(zero_branch)?;
        self.mark_forward()
    }

    fn imm_else(&mut self) -> Result<(), Exception> {
        self.require_compiling()?;
        let orig = self.pop_control(ORIG)?;
        let branch = self.references.idx_branch;
        self.compile_cell(branch)?;
        self.mark_forward()?;
        self.resolve_forward(orig)
    }

    fn imm_then(&mut self) -> Result<(), Exception> {
        self.require_compiling()?;
        let orig = self.pop_control(ORIG)?;
        self.resolve_forward(orig)
    }

    fn imm_begin(&mut self) -> Result<(), Exception> {
        self.require_compiling()?;
        let here = self.regs.here;
        self.push_control(here, DEST)
    }

    fn imm_until(&mut self) -> Result<(), Exception> {
        self.require_compiling()?;
        let dest = self.pop_control(DEST)?;
        let zero_branch = self.references.idx_zero_branch;
        self.compile_cell(zero_branch)?;
        self.compile_backward(dest)
    }

    fn imm_again(&mut self) -> Result<(), Exception> {
        self.require_compiling()?;
        let dest = self.pop_control(DEST)?;
        let branch = self.references.idx_branch;
        self.compile_cell(branch)?;
        self.compile_backward(dest)
    }

    fn imm_while(&mut self) -> Result<(), Exception> {
        self.require_compiling()?;
        let dest = self.pop_control(DEST)?;
        let zero_branch = self.references.idx_zero_branch;
        self.compile_cell(zero_branch)?;
        self.mark_forward()?;
        self.push_control(dest, DEST)
    }

    fn imm_repeat(&mut self) -> Result<(), Exception> {
        self.require_compiling()?;
        let dest = self.pop_control(DEST)?;
        let branch = self.references.idx_branch;
        self.compile_cell(branch)?;
        self.compile_backward(dest)?;
        let orig = self.pop_control(ORIG)?;
        self.resolve_forward(orig)
    }

    fn imm_do(&mut self) -> Result<(), Exception> {
        self.require_compiling()?;
        let p_do = self.references.idx_do;
        self.compile_cell(p_do)?;
        let here = self.regs.here;
        self.push_control(here, DO_SYS)
    }

    fn imm_loop(&mut self) -> Result<(), Exception> {
        self.require_compiling()?;
        let dest = self.pop_control(DO_SYS)?;
        let p_loop = self.references.idx_loop;
        self.compile_cell(p_loop)?;
        self.compile_backward(dest)
    }

    fn imm_plus_loop(&mut self) -> Result<(), Exception> {
        self.require_compiling()?;
        let dest = self.pop_control(DO_SYS)?;
        let p_plus_loop = self.references.idx_plus_loop;
        self.compile_cell(p_plus_loop)?;
        self.compile_backward(dest)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::exception::{Error, Exception};
    use crate::memory::Cell;
    use crate::registers::State;
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
    fn test_colon_definition() {
        let vm = &mut vm();
        vm.evaluate(": square dup * ;").unwrap();
        assert_eq!(vm.registers().state, State::Interpret);
        assert_eq!(vm.registers().defining, 0);
        assert!(vm.data_stack().is_empty());
        vm.evaluate("3 square").unwrap();
        assert_eq!(vm.data_stack(), &[9]);
        assert!(vm.return_stack().is_empty());
    }

    #[test]
    fn test_nested_calls() {
        assert_eq!(eval(": a 1+ ; : b a a ; : c b b ; 0 c"), vec![4]);
    }

    #[test]
    fn test_if_else_then() {
        assert_eq!(eval(": sgn 0< if -1 else 1 then ; -5 sgn 5 sgn"), vec![0xffff, 1]);
        assert_eq!(eval(": t if 7 then ; 0 t 1 t"), vec![7]);
    }

    #[test]
    fn test_recurse() {
        assert_eq!(eval(": fact dup 1 > if dup 1- recurse * then ; 5 fact"), vec![120]);
    }

    #[test]
    fn test_begin_loops() {
        assert_eq!(eval(": cd 10 begin 1- dup 0= until ; cd"), vec![0]);
        assert_eq!(eval(": w 0 begin dup 5 < while 1+ repeat ; w"), vec![5]);
        assert_eq!(eval(": ag 0 begin 1+ dup 3 = if exit then again ; ag"), vec![3]);
    }

    #[test]
    fn test_do_loops() {
        assert_eq!(eval(": sum 0 10 0 do i + loop ; sum"), vec![45]);
        assert_eq!(eval(": ev 0 10 0 do i + 2 +loop ; ev"), vec![20]);
        assert_eq!(eval(": down 0 0 10 do i + -1 +loop ; down"), vec![55]);
        assert_eq!(eval(": nest 0 3 0 do 2 0 do j + loop loop ; nest"), vec![6]);
        let vm = &mut vm();
        vm.evaluate(": early 10 0 do i 3 = if unloop exit then loop 99 ; early").unwrap();
        assert!(vm.data_stack().is_empty());
        assert!(vm.return_stack().is_empty());
    }

    #[test]
    fn test_variable_constant_create() {
        assert_eq!(eval("variable x 5 x ! x @"), vec![5]);
        assert_eq!(eval("42 constant answer answer"), vec![42]);
        assert_eq!(eval("create buf 3 allot here buf -"), vec![3]);
    }

    #[test]
    fn test_tick_and_execute() {
        assert_eq!(eval("3 ' dup execute"), vec![3, 3]);
        assert_eq!(eval(": t ['] dup execute ; 4 t"), vec![4, 4]);
        assert_eq!(eval(": sq dup * ; 5 ' sq execute"), vec![25]);
        assert_eq!(fault("' nothing"), Exception::UndefinedWord);
    }

    #[test]
    fn test_literal_and_brackets() {
        assert_eq!(eval(": l [ 2 3 + ] literal ; l"), vec![5]);
        assert_eq!(eval("char abc : c [char] x ; c"), vec![97, 120]);
        assert_eq!(eval("1 ( 2 ) 3 \\ 4"), vec![1, 3]);
    }

    #[test]
    fn test_immediate_runs_while_compiling() {
        let mut out = Vec::new();
        {
            let vm = &mut VM::new(Config::default(), io::empty(), &mut out).unwrap();
            vm.evaluate(": noisy 65 emit ; immediate : quiet noisy ;").unwrap();
            vm.evaluate("quiet").unwrap();
        }
        assert_eq!(out, b"A".to_vec());
    }

    #[test]
    fn test_shadowing_keeps_old_binding() {
        assert_eq!(eval(": x 1 ; : y x ; : x 2 ; y x"), vec![1, 2]);
    }

    #[test]
    fn test_definition_hidden_until_finished() {
        assert_eq!(fault(": selfref selfref ;"), Exception::UndefinedWord);
    }

    #[test]
    fn test_compiler_nesting() {
        assert_eq!(fault(": a : b ;"), Exception::CompilerNesting);
        assert_eq!(fault(";"), Exception::CompilerNesting);
        assert_eq!(fault(": a [ : b"), Exception::CompilerNesting);
        assert_eq!(fault("["), Exception::CompilerNesting);
        assert_eq!(fault(": a ] ;"), Exception::CompilerNesting);
        assert_eq!(fault(": a [ ] ] ;"), Exception::CompilerNesting);
    }

    #[test]
    fn test_semicolon_after_negative_allot() {
        log::set_max_level(log::LevelFilter::Debug);
        let vm = &mut vm();
        vm.evaluate(": a [ -6 allot ] ;").unwrap();
        assert_eq!(vm.registers().state, State::Interpret);
        assert_eq!(vm.registers().defining, 0);
    }

    #[test]
    fn test_control_structure_mismatch() {
        assert_eq!(fault(": bad then ;"), Exception::ControlStructureMismatch);
        assert_eq!(fault(": bad if ;"), Exception::ControlStructureMismatch);
        assert_eq!(fault(": bad begin then ;"), Exception::ControlStructureMismatch);
        assert_eq!(fault(": bad do until ;"), Exception::ControlStructureMismatch);
    }

    #[test]
    fn test_compile_only_words() {
        assert_eq!(fault("1 if"), Exception::InterpretingACompileOnlyWord);
        assert_eq!(fault("1 literal"), Exception::InterpretingACompileOnlyWord);
        assert_eq!(fault("recurse"), Exception::InterpretingACompileOnlyWord);
    }

    #[test]
    fn test_missing_name() {
        assert_eq!(fault(":"), Exception::UnexpectedEndOfFile);
        assert_eq!(fault("variable"), Exception::UnexpectedEndOfFile);
        assert_eq!(fault(&format!(": {} ;", "x".repeat(32))), Exception::DefinitionNameTooLong);
    }
}
