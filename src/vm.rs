use crate::compiler::Compiler;
use crate::config::Config;
use crate::env::Environment;
use crate::exception::{Error, Exception};
use crate::input::Source;
use crate::memory::{packed_len, Cell, Memory, DICTIONARY_START};
use crate::output::Output;
use crate::parser::parse_number;
use crate::registers::{Registers, State};
use crate::stack::Stack;
use crate::tools::Tools;
use crate::word::{Action, Primitive, Word};
use log::{error, trace};
use std::io::{BufReader, Read, Write};
use std::mem;

/// Longest token the outer interpreter accepts, in bytes.
pub const MAX_TOKEN_LEN: usize = 255;

pub const TRUE: Cell = Cell::MAX;
pub const FALSE: Cell = 0;

pub fn flag(b: bool) -> Cell {
    if b {
        TRUE
    } else {
        FALSE
    }
}

/// Opcodes of the runtimes compiled by the interpreter and compiler words.
#[derive(Debug, Default, Clone, Copy)]
pub struct References {
    pub idx_nest: Cell,
    pub idx_var: Cell,
    pub idx_const: Cell,
    pub idx_lit: Cell,
    pub idx_branch: Cell,
    pub idx_zero_branch: Cell,
    pub idx_do: Cell,
    pub idx_loop: Cell,
    pub idx_plus_loop: Cell,
    pub idx_dot_quote: Cell,
    pub idx_exit: Cell,
}

impl References {
    /// Runtimes only valid in the code field of a record.
    pub fn is_code_field(&self, op: Cell) -> bool {
        op == self.idx_nest || op == self.idx_var || op == self.idx_const
    }
}

/// A Forth virtual machine.
///
/// Each instance owns its core memory, registers and I/O handles. Nothing is
/// shared between instances, so several may run side by side in one process.
pub struct VM<'io> {
    pub(crate) memory: Memory,
    pub(crate) regs: Registers,
    primitives: Vec<Primitive<'io>>,
    pub(crate) references: References,
    pub(crate) input: Source<'io>,
    output: Box<dyn Write + 'io>,
    pub(crate) last_token: Vec<u8>,
    last_error: Option<Exception>,
}

impl<'io> VM<'io> {
    /// Create a virtual machine reading from `input` and writing to `output`.
    pub fn new<R, W>(config: Config, input: R, output: W) -> Result<VM<'io>, Error>
    where
        R: Read + 'io,
        W: Write + 'io,
    {
        let layout = config.layout()?;
        let mut vm = VM {
            memory: Memory::new(config.core_size),
            regs: Registers {
                ip: 0,
                w: 0,
                sp: layout.s0 as Cell,
                rp: layout.r0 as Cell,
                here: DICTIONARY_START as Cell,
                base: 10,
                state: State::Interpret,
                latest: 0,
                defining: 0,
                fault: false,
                s0: layout.s0 as Cell,
                s_limit: layout.r0 as Cell,
                r0: layout.r0 as Cell,
                r_limit: layout.r_limit as Cell,
            },
            primitives: Vec::with_capacity(DICTIONARY_START),
            references: References::default(),
            input: Source::Reader(Box::new(BufReader::new(input))),
            output: Box::new(output),
            last_token: Vec::with_capacity(64),
            last_error: None,
        };
        vm.add_builtins()
            .map_err(|_| Error::InvalidConfig("core too small for the built-in dictionary"))?;
        trace!(
            "created vm: {} cells, dictionary at {}",
            vm.memory.len(),
            vm.regs.here
        );
        Ok(vm)
    }

    fn add_builtins(&mut self) -> Result<(), Exception> {
        self.add_runtimes()?;
        self.add_core()?;
        self.add_compiler()?;
        self.add_output()?;
        self.add_tools()?;
        self.add_environment()?;
        Ok(())
    }

    fn add_runtimes(&mut self) -> Result<(), Exception> {
        self.references.idx_nest = self.add_runtime("nest", VM::nest)?;
        self.references.idx_var = self.add_runtime("var", VM::p_var)?;
        self.references.idx_const = self.add_runtime("const", VM::p_const)?;
        self.references.idx_lit = self.add_runtime("lit", VM::lit)?;
        self.references.idx_branch = self.add_runtime("branch", VM::branch)?;
        self.references.idx_zero_branch = self.add_runtime("0branch", VM::zero_branch)?;
        self.references.idx_do = self.add_runtime("(do)", VM::p_do)?;
        self.references.idx_loop = self.add_runtime("(loop)", VM::p_loop)?;
        self.references.idx_plus_loop = self.add_runtime("(+loop)", VM::p_plus_loop)?;
        self.references.idx_dot_quote = self.add_runtime("(.\")", VM::p_dot_quote)?;
        self.references.idx_exit = self.add_primitive("exit", VM::exit)?;
        Ok(())
    }

    /// Append `action` to the dispatch table without a dictionary record.
    fn add_runtime(&mut self, name: &'static str, action: Action<'io>) -> Result<Cell, Exception> {
        let op = self.primitives.len();
        if op >= DICTIONARY_START {
            return Err(Exception::DictionaryOverflow);
        }
        self.primitives.push(Primitive { action });
        trace!("opcode {} is {}", op, name);
        Ok(op as Cell)
    }

    /// Register a native word `name` and return its opcode.
    pub fn add_primitive(&mut self, name: &'static str, action: Action<'io>) -> Result<Cell, Exception> {
        let op = self.add_runtime(name, action)?;
        self.create_record(name.as_bytes(), op, 0)?;
        Ok(op)
    }

    pub fn add_immediate(&mut self, name: &'static str, action: Action<'io>) -> Result<Cell, Exception> {
        let op = self.add_primitive(name, action)?;
        self.set_immediate()?;
        Ok(op)
    }

    // Host interface

    /// Replace the input source with a stream.
    pub fn set_file_input<R: Read + 'io>(&mut self, input: R) {
        trace!("input switched to stream");
        self.input = Source::Reader(Box::new(BufReader::new(input)));
    }

    /// Replace the output sink.
    pub fn set_file_output<W: Write + 'io>(&mut self, output: W) {
        trace!("output switched");
        self.output = Box::new(output);
    }

    /// Replace the input source with a copy of `text`.
    pub fn set_string_input(&mut self, text: &str) {
        trace!("input switched to {} bytes of text", text.len());
        self.input = Source::text(text);
    }

    /// Interpret the current input source until it is exhausted.
    ///
    /// The first fault poisons the machine: every later call returns
    /// `Error::Poisoned` without executing anything.
    pub fn run(&mut self) -> Result<(), Error> {
        self.check_poisoned()?;
        let result = self.interpret();
        let result = result.and(self.flush());
        result.map_err(|e| Error::Fault(self.fault(e)))
    }

    /// Interpret `text`.
    pub fn evaluate(&mut self, text: &str) -> Result<(), Error> {
        self.check_poisoned()?;
        self.set_string_input(text);
        self.run()
    }

    pub fn is_poisoned(&self) -> bool {
        self.regs.fault
    }

    /// The fault that poisoned the machine.
    pub fn last_error(&self) -> Option<Exception> {
        self.last_error
    }

    /// The token being interpreted when the last fault occurred.
    pub fn last_token(&self) -> &[u8] {
        &self.last_token
    }

    pub fn registers(&self) -> &Registers {
        &self.regs
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Data stack contents, bottom first.
    pub fn data_stack(&self) -> &[Cell] {
        let (s0, sp) = (self.regs.s0 as usize, self.regs.sp as usize);
        &self.memory.cells()[s0..sp.max(s0)]
    }

    /// Return stack contents, bottom first.
    pub fn return_stack(&self) -> &[Cell] {
        let (r0, rp) = (self.regs.r0 as usize, self.regs.rp as usize);
        &self.memory.cells()[r0..rp.max(r0)]
    }

    pub fn s_stack(&mut self) -> Stack<'_> {
        let (base, limit) = (self.regs.s0, self.regs.s_limit);
        Stack::new(
            &mut self.memory,
            &mut self.regs.sp,
            base,
            limit,
            Exception::StackOverflow,
            Exception::StackUnderflow,
        )
    }

    pub fn r_stack(&mut self) -> Stack<'_> {
        let (base, limit) = (self.regs.r0, self.regs.r_limit);
        Stack::new(
            &mut self.memory,
            &mut self.regs.rp,
            base,
            limit,
            Exception::ReturnStackOverflow,
            Exception::ReturnStackUnderflow,
        )
    }

    pub(crate) fn check_poisoned(&self) -> Result<(), Error> {
        match self.last_error {
            Some(e) if self.regs.fault => Err(Error::Poisoned(e)),
            _ => Ok(()),
        }
    }

    /// Poison the machine. Registers, stacks and memory stay as they are.
    fn fault(&mut self, e: Exception) -> Exception {
        self.regs.fault = true;
        self.last_error = Some(e);
        error!(
            "{} ({}) at `{}`, machine poisoned",
            e,
            e.code(),
            String::from_utf8_lossy(&self.last_token)
        );
        e
    }

    // Output

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Exception> {
        self.output
            .write_all(bytes)
            .map_err(|_| Exception::ExceptionInSendingOrReceivingACharacter)
    }

    fn flush(&mut self) -> Result<(), Exception> {
        self.output
            .flush()
            .map_err(|_| Exception::ExceptionInSendingOrReceivingACharacter)
    }

    // Parser

    /// Read the next whitespace delimited token into `last_token`.
    ///
    /// Leaves `last_token` empty at end of input.
    pub fn parse_word(&mut self) -> Result<(), Exception> {
        self.last_token.clear();
        while let Some(b) = self.input.read_byte()? {
            if b.is_ascii_whitespace() {
                if !self.last_token.is_empty() {
                    break;
                }
            } else if self.last_token.len() >= MAX_TOKEN_LEN {
                return Err(Exception::ParsedStringOverflow);
            } else {
                self.last_token.push(b);
            }
        }
        Ok(())
    }

    /// Consume input up to and including `delimiter`, return what precedes it.
    pub fn parse(&mut self, delimiter: u8) -> Result<Vec<u8>, Exception> {
        let mut text = Vec::new();
        while let Some(b) = self.input.read_byte()? {
            if b == delimiter {
                break;
            }
            text.push(b);
        }
        Ok(text)
    }

    /// Parse a name for a definition. End of input is a fault.
    pub fn parse_name(&mut self) -> Result<Vec<u8>, Exception> {
        self.parse_word()?;
        if self.last_token.is_empty() {
            return Err(Exception::UnexpectedEndOfFile);
        }
        Ok(self.last_token.clone())
    }

    // Outer interpreter

    fn interpret(&mut self) -> Result<(), Exception> {
        loop {
            self.parse_word()?;
            if self.last_token.is_empty() {
                return Ok(());
            }
            let token = mem::take(&mut self.last_token);
            let result = self.interpret_token(&token);
            if self.last_token.is_empty() {
                self.last_token = token;
            }
            result?;
        }
    }

    fn interpret_token(&mut self, token: &[u8]) -> Result<(), Exception> {
        match self.find(token)? {
            Some(word) => {
                if !self.regs.is_compiling() || word.is_immediate() {
                    self.execute_word(word.xt() as Cell)?;
                    self.run_inner()
                } else {
                    self.compile_word(word)
                }
            }
            None => match parse_number(token, self.regs.base) {
                Some(n) => {
                    if self.regs.is_compiling() {
                        self.compile_integer(n)
                    } else {
                        self.s_stack().push(n)
                    }
                }
                None => Err(Exception::UndefinedWord),
            },
        }
    }

    /// Compile a reference to `word`: its opcode if it is a primitive,
    /// otherwise its execution token.
    pub fn compile_word(&mut self, word: Word) -> Result<(), Exception> {
        let code = self.memory.get(word.xt())?;
        if self.references.is_code_field(code) {
            self.compile_cell(word.xt() as Cell)
        } else {
            self.compile_cell(code)
        }
    }

    pub fn compile_integer(&mut self, n: Cell) -> Result<(), Exception> {
        let lit = self.references.idx_lit;
        self.compile_cell(lit)?;
        self.compile_cell(n)
    }

    // Inner interpreter

    /// Execute opcode or execution token `xt`.
    pub fn execute_word(&mut self, xt: Cell) -> Result<(), Exception> {
        let op = if (xt as usize) < self.primitives.len() {
            if self.references.is_code_field(xt) {
                return Err(Exception::InvalidMemoryAddress);
            }
            xt
        } else {
            self.regs.w = xt;
            self.memory.get(xt as usize)?
        };
        let action = self
            .primitives
            .get(op as usize)
            .map(|p| p.action)
            .ok_or(Exception::InvalidMemoryAddress)?;
        action(self)
    }

    /// Run compiled code until the outermost definition returns.
    pub fn run_inner(&mut self) -> Result<(), Exception> {
        while self.regs.ip != 0 {
            let xt = self.memory.get(self.regs.ip as usize)?;
            self.regs.ip = self.regs.ip.wrapping_add(1);
            self.execute_word(xt)?;
        }
        Ok(())
    }

    /// Inline operand following the current instruction.
    pub(crate) fn operand(&mut self) -> Result<Cell, Exception> {
        let ip = self.regs.ip;
        if ip == 0 {
            return Err(Exception::InterpretingACompileOnlyWord);
        }
        let v = self.memory.get(ip as usize)?;
        self.regs.ip = ip.wrapping_add(1);
        Ok(v)
    }

    // Runtimes

    pub fn nest(&mut self) -> Result<(), Exception> {
        let ip = self.regs.ip;
        self.r_stack().push(ip)?;
        self.regs.ip = self.regs.w.wrapping_add(1);
        Ok(())
    }

    pub fn p_var(&mut self) -> Result<(), Exception> {
        let dfa = self.regs.w.wrapping_add(1);
        self.s_stack().push(dfa)
    }

    pub fn p_const(&mut self) -> Result<(), Exception> {
        let v = self.memory.get(self.regs.w as usize + 1)?;
        self.s_stack().push(v)
    }

    pub fn lit(&mut self) -> Result<(), Exception> {
        let v = self.operand()?;
        self.s_stack().push(v)
    }

    /// Return from the current definition.
    pub fn exit(&mut self) -> Result<(), Exception> {
        let ip = self.r_stack().pop()?;
        self.regs.ip = ip;
        Ok(())
    }

    /// Add the offset stored at `ip` to `ip`.
    pub fn branch(&mut self) -> Result<(), Exception> {
        let ip = self.regs.ip;
        if ip == 0 {
            return Err(Exception::InterpretingACompileOnlyWord);
        }
        let offset = self.memory.get(ip as usize)?;
        self.regs.ip = ip.wrapping_add(offset);
        Ok(())
    }

    pub fn zero_branch(&mut self) -> Result<(), Exception> {
        if self.regs.ip == 0 {
            return Err(Exception::InterpretingACompileOnlyWord);
        }
        if self.s_stack().pop()? == 0 {
            self.branch()
        } else {
            self.regs.ip = self.regs.ip.wrapping_add(1);
            Ok(())
        }
    }

    /// ( limit index -- ) ( R: -- limit index )
    pub fn p_do(&mut self) -> Result<(), Exception> {
        if self.regs.ip == 0 {
            return Err(Exception::InterpretingACompileOnlyWord);
        }
        let mut s = self.s_stack();
        s.require(2)?;
        let index = s.pop()?;
        let limit = s.pop()?;
        let mut r = self.r_stack();
        if r.capacity() - r.len() < 2 {
            return Err(Exception::ReturnStackOverflow);
        }
        r.push(limit)?;
        r.push(index)
    }

    pub fn p_loop(&mut self) -> Result<(), Exception> {
        self.step_loop(1)
    }

    pub fn p_plus_loop(&mut self) -> Result<(), Exception> {
        if self.regs.ip == 0 {
            return Err(Exception::InterpretingACompileOnlyWord);
        }
        let n = self.s_stack().pop()?;
        self.step_loop(n)
    }

    /// Advance the loop index by `n`. Leave the loop when the index crosses
    /// the boundary between `limit - 1` and `limit`, otherwise branch back.
    fn step_loop(&mut self, n: Cell) -> Result<(), Exception> {
        if self.regs.ip == 0 {
            return Err(Exception::InterpretingACompileOnlyWord);
        }
        let mut r = self.r_stack();
        r.require(2)?;
        let index = r.pick(0)?;
        let limit = r.pick(1)?;
        let diff = index.wrapping_sub(limit) as i16;
        let step = n as i16;
        let crossed = (diff ^ diff.wrapping_add(step)) < 0 && (diff ^ step) < 0;
        if crossed {
            r.pop()?;
            r.pop()?;
            self.regs.ip = self.regs.ip.wrapping_add(1);
            Ok(())
        } else {
            r.set(0, index.wrapping_add(n))?;
            self.branch()
        }
    }

    /// Print the counted string compiled after the instruction.
    pub fn p_dot_quote(&mut self) -> Result<(), Exception> {
        let len = self.operand()? as usize;
        let start = self.regs.ip as usize;
        let bytes = (0..len)
            .map(|i| self.memory.get_byte(start, i))
            .collect::<Result<Vec<u8>, Exception>>()?;
        self.regs.ip = self.regs.ip.wrapping_add(packed_len(len) as Cell);
        self.write_bytes(&bytes)
    }
}
