//! The Rofflang virtual machine (VM).
//!
//! This module contains the definition of the runtime VM,
//!     the tokenizer and copy-mode reader that read from its input stack,
//!     and the main loop that is used to run roff documents.
//!
//! The main loop reads one token at a time.
//! A control character at the beginning of a line starts a request line:
//!     the name that follows is looked up and the corresponding request or macro is invoked.
//! Every other token is handed to the formatter environment through the hooks of
//!     the [RoffState] trait.

use crate::command;
use crate::command::BuiltIn;
use crate::command::Command;
use crate::error;
use crate::error::{Diagnostic, Severity, Warning};
use crate::input;
use crate::input::{EnvironmentSnapshot, Frame, Location, Raw, Source};
use crate::node::Node;
use crate::parse;
use crate::prelude as rl;
use crate::register;
use crate::roffmacro::{ArgList, Invocation, Macro, MacroIterator};
use crate::token::code;
use crate::token::{Name, NameInterner, Token};
use roffcraft_stdext::algorithms::spellcheck;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub mod copymode;
mod interpolate;
mod state;
pub mod tokenizer;

pub use state::{Collision, InputTrap, InterpreterState};

/// Units used to convert scale indicators in number expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Units {
    /// Basic units per inch.
    pub resolution: i32,
    /// Scaled points per point.
    pub size_scale: i32,
    /// Current point size in scaled points.
    pub point_size: i32,
    /// Current vertical spacing in basic units.
    pub line_spacing: i32,
}

impl Default for Units {
    fn default() -> Self {
        Units {
            resolution: 72000,
            size_scale: 1000,
            point_size: 10000,
            line_spacing: 12000,
        }
    }
}

impl Units {
    /// Width of an em in basic units.
    pub fn em(&self) -> i32 {
        let em = self.point_size as i64 * self.resolution as i64 / (72 * self.size_scale as i64);
        em as i32
    }
}

/// Implementations of this trait may be used as the state in a Rofflang VM.
///
/// The trait has no required methods.
/// Its methods are the points where the formatter environment plugs into the interpreter:
///     the VM calls the handlers with every token it does not consume itself,
///     and queries the environment for the values that escapes and requests need.
///
/// | input | handler | default |
/// | --- | --- | --- |
/// | a formattable token, like `a` or `\h'1m'` | [output_handler](RoffState::output_handler) | do nothing
/// | the newline ending a text line | [newline_handler](RoffState::newline_handler) | do nothing
/// | a blank line, when no `blm` macro is set | [blank_line_handler](RoffState::blank_line_handler) | do nothing
/// | a transparent line, `\!` | [transparent_handler](RoffState::transparent_handler) | do nothing
pub trait RoffState: Sized {
    /// Units for number expressions.
    fn units(&self) -> Units {
        Units::default()
    }

    fn output_handler(token: Token, vm: &mut VM<Self>) -> rl::Result<()> {
        _ = (token, vm);
        Ok(())
    }

    fn newline_handler(vm: &mut VM<Self>) -> rl::Result<()> {
        _ = vm;
        Ok(())
    }

    fn blank_line_handler(vm: &mut VM<Self>) -> rl::Result<()> {
        _ = vm;
        Ok(())
    }

    /// Handler for the rest of a line that started with `\!`, read in copy mode.
    ///
    /// The line includes its terminating newline.
    fn transparent_handler(line: Macro, vm: &mut VM<Self>) -> rl::Result<()> {
        _ = (line, vm);
        Ok(())
    }

    /// Hook invoked after a diagnostic has been written to the terminal.
    fn diagnostic_hook(diagnostic: &Diagnostic, vm: &mut VM<Self>) {
        _ = (diagnostic, vm);
    }

    /// The environment state saved while a diversion is reread.
    fn environment_snapshot(&self) -> EnvironmentSnapshot {
        EnvironmentSnapshot {
            point_size: self.units().point_size,
            ..Default::default()
        }
    }

    /// Current horizontal position on the output line, for `\k`.
    fn horizontal_position(&self) -> i32 {
        0
    }

    /// Width of the provided tokens in basic units, for `\w`.
    ///
    /// The default treats every character as half an em wide.
    fn width_hook(tokens: &[Token], vm: &VM<Self>) -> i32 {
        let half_em = vm.state.units().em() / 2;
        tokens
            .iter()
            .filter(|token| matches!(token, Token::Char(_) | Token::Special(_) | Token::Indexed(_)))
            .count() as i32
            * half_em
    }

    fn page_number(&self) -> i32 {
        1
    }

    /// Whether the `n` condition is true.
    fn nroff_mode(&self) -> bool {
        false
    }
}

impl RoffState for () {}

/// File system operations that the VM may need to perform.
///
/// These operations are extracted to a trait so that they be mocked out in unit testing.
pub trait FileSystem {
    /// Read the entire contents of a file.
    ///
    /// This is implemented by [std::fs::read].
    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>>;
}

struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}

/// The Rofflang virtual machine.
pub struct VM<S> {
    /// The state of the formatter environment and of the standard library requests.
    pub state: S,

    /// Requests, macros, strings and diversions.
    pub commands: command::Map<S>,

    pub registers: register::Registers<S>,

    pub file_system: Box<dyn FileSystem>,

    /// Where diagnostics and the output of requests like `tm` are written.
    pub terminal_out: Rc<RefCell<dyn std::io::Write>>,

    /// Directory relative file names are resolved against.
    pub working_directory: Option<PathBuf>,

    /// Lookup function for environment variables, used by `\V`.
    pub env_var: fn(&str) -> Option<String>,

    /// Program name that prefixes diagnostics.
    pub program_name: String,

    /// Whether diagnostics are written to [VM::terminal_out].
    ///
    /// When false they only reach [RoffState::diagnostic_hook].
    pub diagnostics_on_terminal: bool,

    internal: Internal,
}

struct Internal {
    input: input::Stack,
    names: NameInterner,
    token: Token,
    interp: InterpreterState,
    num_warnings: usize,
    num_errors: usize,
    // Nonzero while evaluating `\B`, which must not report anything.
    diagnostics_suppressed: usize,
}

fn real_env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

impl<S: Default + RoffState> VM<S> {
    /// Create a new VM.
    pub fn new(initial_built_ins: HashMap<&str, BuiltIn<S>>) -> Box<VM<S>> {
        let mut names = NameInterner::default();
        let initial_built_ins = initial_built_ins
            .into_iter()
            .map(|(key, value)| (names.get_or_intern(key), value))
            .collect();
        let mut vm = Box::new(VM {
            state: Default::default(),
            commands: command::Map::new(initial_built_ins),
            registers: Default::default(),
            file_system: Box::new(RealFileSystem {}),
            terminal_out: Rc::new(RefCell::new(std::io::stderr())),
            working_directory: match std::env::current_dir() {
                Ok(path_buf) => Some(path_buf),
                Err(err) => {
                    tracing::warn!(%err, "failed to determine the working directory");
                    None
                }
            },
            env_var: real_env_var,
            program_name: "roffcraft".into(),
            diagnostics_on_terminal: true,
            internal: Internal {
                input: Default::default(),
                names,
                token: Token::Empty,
                interp: Default::default(),
                num_warnings: 0,
                num_errors: 0,
                diagnostics_suppressed: 0,
            },
        });
        vm.define_built_in_registers();
        vm
    }
}

impl<S: RoffState> VM<S> {
    fn define_built_in_registers(&mut self) {
        let built_ins: [(&str, register::ComputedFn<S>); 11] = [
            (".$", |vm| vm.internal.input.nargs().to_string()),
            (".c", |vm| current_line(vm).to_string()),
            ("c.", |vm| current_line(vm).to_string()),
            (".F", |vm| {
                vm.location()
                    .map(|location| location.file.to_string())
                    .unwrap_or_default()
            }),
            (".C", |vm| (vm.internal.interp.compatible as i32).to_string()),
            (".warn", |vm| vm.internal.interp.warning_mask.0.to_string()),
            (".slimit", |vm| vm.internal.input.limit().to_string()),
            (".br", |vm| (vm.internal.input.break_flag() as i32).to_string()),
            (".g", |_| "1".into()),
            (".H", |_| "1".into()),
            (".V", |_| "1".into()),
        ];
        for (name, f) in built_ins {
            self.define_computed_register(name, f);
        }
    }

    /// Define a read-only register whose value is computed from the VM.
    pub fn define_computed_register(&mut self, name: &str, f: register::ComputedFn<S>) {
        let name = self.intern(name);
        self.registers.define_computed(name, f);
    }

    /// Add a named in-memory source to the top of the input stack.
    pub fn push_source<T: Into<Vec<u8>>>(&mut self, name: &str, contents: T) -> rl::Result<()> {
        tracing::debug!(name, "push source");
        self.push_input(Source::File(input::FileIterator::new(name, contents)))
    }

    /// Read a file and add it to the top of the input stack.
    ///
    /// A file that cannot be read is a fatal error.
    pub fn push_file(&mut self, path: &str) -> rl::Result<()> {
        match self.read_file(path) {
            Ok(contents) => self.push_source(path, contents),
            Err(source) => Err(self.fatal(error::FileError {
                path: path.into(),
                source,
            })),
        }
    }

    /// Read a file through the VM's file system, resolving relative paths against the
    ///     working directory.
    pub fn read_file(&self, path: &str) -> std::io::Result<Vec<u8>> {
        let mut full_path = PathBuf::from(path);
        if full_path.is_relative() {
            if let Some(working_directory) = &self.working_directory {
                full_path = working_directory.join(full_path);
            }
        }
        tracing::debug!(path = %full_path.display(), "read file");
        self.file_system.read(&full_path)
    }

    /// Run the VM.
    ///
    /// It is assumed that the VM has been preloaded with input using the
    ///     [VM::push_source] or [VM::push_file] methods.
    /// When the input is exhausted the end macro, if one was set with `em`, is run.
    pub fn run(&mut self) -> rl::Result<()> {
        self.next_token()?;
        loop {
            self.process_input_stack()?;
            if self.internal.interp.end_macro_run {
                break;
            }
            self.internal.interp.end_macro_run = true;
            let Some(end_macro) = self.internal.interp.end_macro else {
                break;
            };
            tracing::debug!(name = self.name_str(end_macro), "run end macro");
            self.internal.input.clear();
            while self.internal.input.level() > 0 {
                self.internal.input.remove_boundary()?;
            }
            self.spring_trap(end_macro)?;
            self.next_token()?;
        }
        tracing::debug!(
            warnings = self.internal.num_warnings,
            errors = self.internal.num_errors,
            "run finished"
        );
        Ok(())
    }

    /// The main loop: process tokens until the input stack reads end of input.
    ///
    /// The loop is re-entrant.
    /// The `while` request runs a nested loop over each iteration of its body,
    ///     and traps sprung inside that loop are not held back by the request's postponement.
    pub fn process_input_stack(&mut self) -> rl::Result<()> {
        let postpone_depth = std::mem::take(&mut self.internal.interp.postpone_depth);
        let result = self.process_tokens();
        self.internal.interp.postpone_depth = postpone_depth;
        result
    }

    fn process_tokens(&mut self) -> rl::Result<()> {
        let mut trap_bol_stack: Vec<bool> = vec![];
        let mut bol = true;
        loop {
            let mut suppress_next = false;
            let token = self.internal.token.clone();
            match token {
                Token::Eof => return Ok(()),
                Token::Char(c) if bol && self.internal.interp.is_control_char(c) => {
                    let break_flag = c == self.internal.interp.control_char();
                    self.next_token()?;
                    while self.internal.token.is_white_space() {
                        self.next_token()?;
                    }
                    match parse::get_name(self)? {
                        None => parse::skip_line(self)?,
                        Some(name) => self.interpolate_macro(name, break_flag)?,
                    }
                    suppress_next = true;
                }
                Token::Space if bol && !self.internal.interp.prev_line_interrupted => {
                    let mut spaces = 0_i32;
                    while self.internal.token.is_space() {
                        spaces += 1;
                        self.next_token()?;
                    }
                    if self.internal.token.is_line_end() {
                        self.blank_line()?;
                    } else {
                        let first = std::mem::take(&mut self.internal.token);
                        self.push_token(first)?;
                        self.leading_spaces(spaces)?;
                        bol = false;
                    }
                }
                Token::Newline => {
                    if bol && !self.internal.interp.prev_line_interrupted {
                        self.blank_line()?;
                    } else {
                        let was_interrupted = self.internal.interp.interrupted;
                        if was_interrupted {
                            self.internal.interp.interrupted = false;
                            self.internal.interp.prev_line_interrupted = true;
                        } else {
                            self.internal.interp.prev_line_interrupted = false;
                            S::newline_handler(self)?;
                        }
                        bol = true;
                        self.input_line_finished(was_interrupted)?;
                    }
                }
                Token::BeginTrap => {
                    trap_bol_stack.push(bol);
                    bol = true;
                }
                Token::EndTrap => match trap_bol_stack.pop() {
                    Some(b) => bol = b,
                    None => self.error("spurious end trap token detected"),
                },
                Token::Transparent => {
                    if bol {
                        let line = self.read_transparent_line()?;
                        S::transparent_handler(line, self)?;
                    }
                }
                Token::Interrupt => {
                    self.internal.interp.interrupted = true;
                    bol = false;
                }
                Token::MarkInput(name) => {
                    let position = self.state.horizontal_position();
                    self.registers.set_value(name, position);
                    bol = false;
                }
                Token::Empty | Token::LeftBrace | Token::RightBrace => {
                    bol = false;
                }
                token => {
                    S::output_handler(token, self)?;
                    bol = false;
                }
            }
            if !suppress_next {
                self.next_token()?;
            }
        }
    }

    fn blank_line(&mut self) -> rl::Result<()> {
        match self.internal.interp.blank_line_macro {
            Some(name) => self.spring_trap(name),
            None => S::blank_line_handler(self),
        }
    }

    fn leading_spaces(&mut self, spaces: i32) -> rl::Result<()> {
        match self.internal.interp.leading_space_macro {
            Some(name) => {
                let lsn = self.intern("lsn");
                let lss = self.intern("lss");
                let space_width = self.state.units().em() / 3;
                self.registers.set_value(lsn, spaces);
                self.registers.set_value(lss, spaces * space_width);
                self.spring_trap(name)
            }
            None => {
                for _ in 0..spaces {
                    S::output_handler(Token::Space, self)?;
                }
                Ok(())
            }
        }
    }

    fn input_line_finished(&mut self, was_interrupted: bool) -> rl::Result<()> {
        let Some(mut trap) = self.internal.interp.input_trap else {
            return Ok(());
        };
        if trap.continued && was_interrupted {
            return Ok(());
        }
        trap.lines -= 1;
        if trap.lines > 0 {
            self.internal.interp.input_trap = Some(trap);
            return Ok(());
        }
        self.internal.interp.input_trap = None;
        self.spring_trap(trap.macro_name)
    }

    fn read_transparent_line(&mut self) -> rl::Result<Macro> {
        let mut line = Macro::new();
        loop {
            match copymode::get_copy(self, false, false)? {
                copymode::CopyChar::Eof => break,
                copymode::CopyChar::Node(node) => line.append_node(node),
                copymode::CopyChar::Byte(b) => {
                    line.append_byte(b);
                    if b == b'\n' {
                        break;
                    }
                }
            }
        }
        Ok(line)
    }

    /// Invoke the request or macro called `name`.
    ///
    /// The current token is the one after the name.
    /// Undefined names are diagnosed and then defined as empty macros.
    pub fn interpolate_macro(&mut self, name: Name, break_flag: bool) -> rl::Result<()> {
        let cmd = match self.commands.get(name) {
            Some(cmd) => cmd.clone(),
            None => {
                self.undefined_macro_diagnostic(name);
                let cmd = Command::new_macro(Macro::new());
                self.commands.insert(name, cmd.clone());
                cmd
            }
        };
        match cmd {
            Command::Request(f) => {
                tracing::debug!(request = self.name_str(name), "run request");
                self.postpone_traps();
                let result = f(name, self);
                self.unpostpone_traps()?;
                result
            }
            Command::Macro(m) => {
                let m = m.borrow().clone();
                self.invoke_macro(name, &m, break_flag)
            }
        }
    }

    fn undefined_macro_diagnostic(&mut self, name: Name) {
        let s = self.name_str(name).to_string();
        if !self.internal.interp.compatible && s.len() > 2 {
            let prefix = s.get(..2).and_then(|prefix| self.internal.names.get(prefix));
            if let Some(prefix) = prefix {
                if self.commands.contains(prefix) {
                    let prefix = self.name_str(prefix).to_string();
                    self.warning(
                        Warning::Space,
                        format!("macro '{s}' not defined (possibly missing space after '{prefix}')"),
                    );
                    return;
                }
            }
        }
        let notes = self.did_you_mean(&s);
        self.warning_with_notes(Warning::Mac, format!("macro '{s}' not defined"), notes);
    }

    fn did_you_mean(&self, s: &str) -> Vec<String> {
        let dictionary: Vec<&str> = self
            .commands
            .iter()
            .filter_map(|(name, _)| self.internal.names.resolve(name))
            .collect();
        spellcheck::find_close_words(dictionary, s, 1)
            .into_iter()
            .take(3)
            .map(|close| format!("did you mean '{}'?", close.word))
            .collect()
    }

    /// Invoke a macro: decode its arguments from the rest of the line and push its body.
    pub fn invoke_macro(&mut self, name: Name, m: &Macro, break_flag: bool) -> rl::Result<()> {
        let args = parse::decode_args(self)?;
        tracing::debug!(name = self.name_str(name), nargs = args.len(), "invoke macro");
        let iter = MacroIterator::new_macro(name, m, args, break_flag, Invocation::Macro);
        self.push_input(Source::Macro(iter))?;
        self.next_token()
    }

    /// Spring the trap macro `name`.
    ///
    /// The macro is pushed between begin and end trap markers so that the run loop
    ///     processes it as if it started at the beginning of a line.
    /// While traps are postponed the trap is recorded instead, replacing any trap
    ///     recorded earlier.
    pub fn spring_trap(&mut self, name: Name) -> rl::Result<()> {
        if self.internal.interp.postpone_depth > 0 {
            tracing::debug!(name = self.name_str(name), "postpone trap");
            self.internal.interp.postponed_trap = Some(name);
            return Ok(());
        }
        let m = match self.commands.get(name) {
            Some(Command::Macro(m)) => m.borrow().clone(),
            Some(Command::Request(_)) => {
                let s = self.name_str(name).to_string();
                self.error(format!("cannot invoke request '{s}' as a trap"));
                return Ok(());
            }
            None => {
                let s = self.name_str(name).to_string();
                self.warning(Warning::Mac, format!("trap macro '{s}' not defined"));
                return Ok(());
            }
        };
        tracing::debug!(name = self.name_str(name), "spring trap");
        self.push_input(Source::temporary_bytes(&[code::END_TRAP]))?;
        let iter = MacroIterator::new_macro(name, &m, ArgList::default(), true, Invocation::Trap);
        self.push_input(Source::Macro(iter))?;
        self.push_input(Source::temporary_bytes(&[code::BEGIN_TRAP]))
    }

    /// Postpone traps until the matching call to [VM::unpostpone_traps].
    ///
    /// Calls nest.
    pub fn postpone_traps(&mut self) {
        self.internal.interp.postpone_depth += 1;
    }

    /// Undo one call to [VM::postpone_traps].
    ///
    /// When the outermost postponement ends, the last trap sprung in the meantime is run:
    ///     it is pushed in front of the current token, which becomes the next token again.
    pub fn unpostpone_traps(&mut self) -> rl::Result<()> {
        let interp = &mut self.internal.interp;
        interp.postpone_depth = interp.postpone_depth.saturating_sub(1);
        if interp.postpone_depth > 0 {
            return Ok(());
        }
        let Some(name) = interp.postponed_trap.take() else {
            return Ok(());
        };
        // The current token has already been read from the input after the trap point,
        // so it goes back underneath the trap.
        let token = std::mem::take(&mut self.internal.token);
        if !token.is_eof() {
            self.push_token(token)?;
        }
        self.spring_trap(name)?;
        self.next_token()
    }

    /// Whether two macros replay as the same token sequence.
    ///
    /// Both macros are run through the tokenizer on an isolated input stack,
    ///     so interpolations inside them are performed.
    pub fn macros_equal(&mut self, a: &Macro, b: &Macro) -> rl::Result<bool> {
        let a = self.replay(a)?;
        let b = self.replay(b)?;
        Ok(a == b)
    }

    fn replay(&mut self, m: &Macro) -> rl::Result<Vec<Token>> {
        let limit = self.internal.input.limit();
        let saved_input = std::mem::replace(&mut self.internal.input, input::Stack::new(limit));
        let saved_token = std::mem::take(&mut self.internal.token);
        let result = self.collect_tokens(m);
        self.internal.input = saved_input;
        self.internal.token = saved_token;
        result
    }

    fn collect_tokens(&mut self, m: &Macro) -> rl::Result<Vec<Token>> {
        self.push_input(Source::Macro(MacroIterator::new_string(None, m, Invocation::String)))?;
        let mut tokens = vec![];
        loop {
            self.next_token()?;
            if self.internal.token.is_eof() {
                return Ok(tokens);
            }
            tokens.push(self.internal.token.clone());
        }
    }
}

fn current_line<S>(vm: &VM<S>) -> usize {
    vm.internal
        .input
        .location()
        .map(|location| location.line)
        .unwrap_or(0)
}

/// Input and token access.
impl<S: RoffState> VM<S> {
    /// The current token.
    #[inline]
    pub fn token(&self) -> &Token {
        &self.internal.token
    }

    /// Replace the current token.
    pub fn set_token(&mut self, token: Token) {
        self.internal.token = token;
    }

    /// Read the next token into the current token.
    pub fn next_token(&mut self) -> rl::Result<()> {
        let token = tokenizer::next(self)?;
        self.internal.token = token;
        Ok(())
    }

    /// Read the next raw element of the input stack.
    ///
    /// Bytes that are not valid input are dropped with an `input` warning.
    pub fn get_raw(&mut self) -> Option<Raw> {
        loop {
            match self.internal.input.get() {
                Some(Raw::Invalid(c)) => self.invalid_input(c),
                raw => return raw,
            }
        }
    }

    /// Return the next raw element of the input stack without consuming it.
    pub fn peek_raw(&mut self) -> Option<Raw> {
        loop {
            match self.internal.input.peek() {
                Some(Raw::Invalid(c)) => {
                    self.internal.input.get();
                    self.invalid_input(c);
                }
                raw => return raw,
            }
        }
    }

    fn invalid_input(&mut self, c: u8) {
        self.warning(
            Warning::Input,
            format!("invalid input character code {c}"),
        );
    }

    /// Push a source onto the input stack.
    ///
    /// Exceeding the stack limit is a fatal error.
    pub fn push_input(&mut self, source: Source) -> rl::Result<()> {
        let state = &self.state;
        match self
            .internal
            .input
            .push(source, || state.environment_snapshot())
        {
            Ok(()) => Ok(()),
            Err(err) => Err(self.fatal(err)),
        }
    }

    /// Add a loop boundary, which input reads do not cross.
    pub fn add_boundary(&mut self) -> rl::Result<()> {
        match self.internal.input.add_boundary() {
            Ok(()) => Ok(()),
            Err(err) => Err(self.fatal(err)),
        }
    }

    /// Add a return boundary, which marks that a `return` unwound through a loop.
    pub fn add_return_boundary(&mut self) -> rl::Result<()> {
        match self.internal.input.add_return_boundary() {
            Ok(()) => Ok(()),
            Err(err) => Err(self.fatal(err)),
        }
    }

    /// Remove the top-most boundary.
    pub fn remove_boundary(&mut self) -> rl::Result<()> {
        match self.internal.input.remove_boundary() {
            Ok(()) => Ok(()),
            Err(err) => Err(self.fatal(err)),
        }
    }

    /// Push text that is read before the rest of the input.
    pub fn push_text(&mut self, text: &str) -> rl::Result<()> {
        self.push_input(Source::temporary(text))
    }

    /// Push text from outside the document, like the value of an environment variable.
    ///
    /// Bytes that would be read as control codes are dropped with an `input` warning,
    ///     the same way they are dropped from input files.
    pub fn push_external_text(&mut self, text: &str) -> rl::Result<()> {
        let bytes = self.filter_external_input(text.as_bytes());
        self.push_input(Source::temporary_bytes(&bytes))
    }

    /// Remove the bytes of external input that are not valid input characters.
    ///
    /// An `input` warning is reported for each byte removed.
    pub fn filter_external_input(&mut self, bytes: &[u8]) -> Vec<u8> {
        let mut valid = Vec::with_capacity(bytes.len());
        for &c in bytes {
            if code::is_invalid_input(c) {
                self.invalid_input(c);
            } else {
                valid.push(c);
            }
        }
        valid
    }

    /// Push a token so that it is the next token read.
    pub fn push_token(&mut self, token: Token) -> rl::Result<()> {
        let mut m = Macro::new();
        m.append_node(Node::from_token(token));
        self.push_input(Source::Temporary(m.cursor()))
    }

    #[inline]
    pub fn input_stack(&self) -> &input::Stack {
        &self.internal.input
    }

    #[inline]
    pub fn input_stack_mut(&mut self) -> &mut input::Stack {
        &mut self.internal.input
    }

    #[inline]
    pub fn interp(&self) -> &InterpreterState {
        &self.internal.interp
    }

    #[inline]
    pub fn interp_mut(&mut self) -> &mut InterpreterState {
        &mut self.internal.interp
    }

    pub fn intern(&mut self, s: &str) -> Name {
        self.internal.names.get_or_intern(s)
    }

    /// The string for a name; empty for names this VM did not create.
    pub fn name_str(&self, name: Name) -> &str {
        self.internal.names.resolve(name).unwrap_or_default()
    }

    pub fn names(&self) -> &NameInterner {
        &self.internal.names
    }

    /// Location of the innermost source that has one.
    pub fn location(&self) -> Option<Location> {
        self.internal.input.location()
    }

    /// The input stack as a list of frames, innermost first.
    pub fn backtrace(&self) -> Vec<Frame> {
        self.internal.input.backtrace(&self.internal.names)
    }
}

/// Diagnostics.
impl<S: RoffState> VM<S> {
    /// Report a warning, if its category is enabled.
    pub fn warning<T: Into<String>>(&mut self, warning: Warning, message: T) {
        self.warning_with_notes(warning, message, vec![]);
    }

    pub fn warning_with_notes<T: Into<String>>(
        &mut self,
        warning: Warning,
        message: T,
        notes: Vec<String>,
    ) {
        if !self.internal.interp.warning_mask.is_enabled(warning) {
            return;
        }
        self.report(Severity::Warning(warning), message.into(), notes);
    }

    /// Report an error. Errors cannot be masked.
    pub fn error<T: Into<String>>(&mut self, message: T) {
        self.report(Severity::Error, message.into(), vec![]);
    }

    /// Report an error found while reading in copy mode.
    ///
    /// While the body of `ig` is being skipped this is an `ig` warning instead.
    pub fn copy_mode_error<T: Into<String>>(&mut self, message: T) {
        if self.internal.interp.ignoring {
            self.warning(Warning::Ig, message);
        } else {
            self.error(message);
        }
    }

    fn report(&mut self, severity: Severity, message: String, notes: Vec<String>) {
        if self.internal.diagnostics_suppressed > 0 {
            return;
        }
        let diagnostic = Diagnostic {
            severity,
            message,
            location: self.location(),
            notes,
        };
        if diagnostic.is_error() {
            self.internal.num_errors += 1;
        } else {
            self.internal.num_warnings += 1;
        }
        tracing::debug!(text = diagnostic.message.as_str(), "diagnostic");
        if self.diagnostics_on_terminal {
            let text = error::display::format_diagnostic(&self.program_name, &diagnostic);
            let mut out = self.terminal_out.borrow_mut();
            _ = writeln!(out, "{text}");
            if self.internal.interp.backtrace_on_diagnostics {
                for frame in self.backtrace() {
                    _ = writeln!(out, "  {frame}");
                }
            }
        }
        S::diagnostic_hook(&diagnostic, self);
    }

    /// Suppress all diagnostics until the matching call to [VM::unsuppress_diagnostics].
    pub fn suppress_diagnostics(&mut self) {
        self.internal.diagnostics_suppressed += 1;
    }

    pub fn unsuppress_diagnostics(&mut self) {
        self.internal.diagnostics_suppressed = self.internal.diagnostics_suppressed.saturating_sub(1);
    }

    /// Number of warnings and errors reported so far.
    pub fn diagnostic_counts(&self) -> (usize, usize) {
        (self.internal.num_warnings, self.internal.num_errors)
    }

    /// Build a fatal error located at the current input position.
    pub fn fatal<E: error::RoffError>(&self, err: E) -> Box<error::Error> {
        error::Error::new(err, self.location(), self.backtrace())
    }
}

/// Helper trait for implementing the component pattern in Rofflang.
///
/// The component pattern is the way requests that need state keep it.
/// The state needed by a group of requests, like the diversion stack used by `di` and `da`,
///     is isolated in a _component_, which is a concrete Rust type defined in the same
///     module as the requests.
/// Any VM state type that contains the component implements this trait,
///     and the requests use the trait to reach the component.
/// Different states can include the same component and thus reuse the same requests.
///
/// The trait requires [RoffState] so that requests with a `HasComponent` bound
///     don't need to list that bound as well.
pub trait HasComponent<C>: RoffState {
    /// Return a immutable reference to the component.
    fn component(&self) -> &C;

    /// Return a mutable reference to the component.
    fn component_mut(&mut self) -> &mut C;
}

/// This macro is for implementing the [HasComponent] trait in the common case when the state
///     is a struct and the component is a direct field of the struct.
///
/// ```
/// # mod mylibrary1{
/// #   pub struct Component;
/// # }
/// # mod mylibrary2{
/// #   pub struct Component;
/// # }
/// # use rofflang::vm::implement_has_component;
/// # use rofflang::traits::*;
/// #
/// struct MyState {
///     component_1: mylibrary1::Component,
///     component_2: mylibrary2::Component,
/// }
///
/// impl RoffState for MyState {}
///
/// implement_has_component![
///     MyState,
///     (mylibrary1::Component, component_1),
///     (mylibrary2::Component, component_2),
/// ];
/// ```
#[macro_export]
macro_rules! implement_has_component {
    ( $type: path, $component: path, $field: ident ) => {
        implement_has_component![$type, ($component, $field),];
    };
    ( $type: path, $(($component: path, $field: ident),)+) => {
        $(
            impl ::rofflang::vm::HasComponent<$component> for $type {
                #[inline]
                fn component(&self) -> &$component {
                    &self.$field
                }
                #[inline]
                fn component_mut(&mut self) -> &mut $component {
                    &mut self.$field
                }
            }
        )*
    };
}

pub use implement_has_component;
