//! Macro definition requests
//!
//! The bodies of macros are read in copy mode until the terminator line,
//!     which by default is `..`.
//! Given a terminator name `xx` the body ends at the line `.xx`,
//!     and `xx` is then invoked like any other macro.

use rofflang::command;
use rofflang::error::Warning;
use rofflang::parse;
use rofflang::prelude as rl;
use rofflang::roffmacro::Macro;
use rofflang::token::{code, Name, Token};
use rofflang::traits::*;
use rofflang::vm::copymode::{self, CopyChar};
use rofflang::vm::VM;

pub const DE_DOC: &str = "Define a macro";
pub const DE1_DOC: &str = "Define a macro that runs with compatibility mode off";
pub const AM_DOC: &str = "Append to a macro";
pub const AM1_DOC: &str = "Append to a macro; the appended part runs with compatibility mode off";
pub const DEI_DOC: &str = "Define a macro whose name and terminator are given by strings";
pub const AMI_DOC: &str = "Append to a macro whose name and terminator are given by strings";
pub const IG_DOC: &str = "Ignore input lines up to the terminator";
pub const RM_DOC: &str = "Remove requests, macros or strings";
pub const RN_DOC: &str = "Rename a request, macro or string";
pub const ALS_DOC: &str = "Create an alias for a request, macro or string";

/// Get the `de` request.
pub fn get_de<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(de_fn).with_doc(DE_DOC)
}

/// Get the `de1` request.
pub fn get_de1<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(de1_fn).with_doc(DE1_DOC)
}

/// Get the `am` request.
pub fn get_am<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(am_fn).with_doc(AM_DOC)
}

/// Get the `am1` request.
pub fn get_am1<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(am1_fn).with_doc(AM1_DOC)
}

/// Get the `dei` request.
pub fn get_dei<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(dei_fn).with_doc(DEI_DOC)
}

/// Get the `ami` request.
pub fn get_ami<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(ami_fn).with_doc(AMI_DOC)
}

/// Get the `ig` request.
pub fn get_ig<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(ig_fn).with_doc(IG_DOC)
}

/// Get the `rm` request.
pub fn get_rm<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(rm_fn).with_doc(RM_DOC)
}

/// Get the `rn` request.
pub fn get_rn<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(rn_fn).with_doc(RN_DOC)
}

/// Get the `als` request.
pub fn get_als<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(als_fn).with_doc(ALS_DOC)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Define,
    Append,
    Ignore,
}

fn de_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    define(vm, Mode::Define, false)
}

fn de1_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    define(vm, Mode::Define, true)
}

fn am_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    define(vm, Mode::Append, false)
}

fn am1_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    define(vm, Mode::Append, true)
}

fn dei_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    define_indirect(vm, Mode::Define)
}

fn ami_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    define_indirect(vm, Mode::Append)
}

fn ig_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    vm.interp_mut().ignoring = true;
    let result = define(vm, Mode::Ignore, false);
    vm.interp_mut().ignoring = false;
    result
}

/// Read the name and optional terminator, then the body of the definition.
fn define<S: RoffState>(vm: &mut VM<S>, mode: Mode, groff_mode: bool) -> rl::Result<()> {
    let name = if mode == Mode::Ignore {
        None
    } else {
        match parse::get_required_name(vm)? {
            None => return parse::skip_line(vm),
            Some(name) => Some(name),
        }
    };
    let term = match parse::get_name(vm)? {
        None => ".".to_string(),
        Some(term) => vm.name_str(term).to_string(),
    };
    while !vm.token().is_line_end() {
        vm.next_token()?;
    }
    let mut body = match (mode, name) {
        (Mode::Append, Some(name)) => vm
            .commands
            .get_macro(name)
            .unwrap_or_else(|| Macro::with_location(vm.location())),
        _ => Macro::with_location(vm.location()),
    };
    if groff_mode {
        body.append_byte(code::PUSH_GROFF_MODE);
    }
    let keep = mode != Mode::Ignore;
    let mut bol = true;
    let mut pending: Option<CopyChar> = None;
    loop {
        let c = match pending.take() {
            Some(c) => c,
            None => copymode::get_copy(vm, true, false)?,
        };
        let c = match c {
            CopyChar::Eof => {
                let message = match name {
                    Some(name) => {
                        format!("end of input while defining macro '{}'", vm.name_str(name))
                    }
                    None => "end of input while ignoring input lines".to_string(),
                };
                vm.error(message);
                return vm.next_token();
            }
            CopyChar::Node(node) => {
                if keep {
                    body.append_node(node);
                }
                bol = false;
                continue;
            }
            CopyChar::Byte(c) => c,
        };
        if bol && c == b'.' {
            match match_terminator(vm, term.as_bytes())? {
                Terminator::Matched(token) => {
                    if let Some(name) = name {
                        if groff_mode {
                            body.append_byte(code::POP_MODE);
                        }
                        tracing::debug!(name = vm.name_str(name), len = body.len(), "define macro");
                        vm.commands.update_macro(name, body);
                    }
                    vm.set_token(token);
                    if term == "." {
                        return parse::skip_line(vm);
                    }
                    vm.interp_mut().ignoring = false;
                    let term = vm.intern(&term);
                    return vm.interpolate_macro(term, true);
                }
                Terminator::Unmatched { prefix, next } => {
                    if keep {
                        body.append_byte(b'.');
                        for &b in &term.as_bytes()[..prefix] {
                            body.append_byte(b);
                        }
                    }
                    bol = false;
                    pending = Some(next);
                    continue;
                }
            }
        }
        if keep {
            body.append_byte(c);
        }
        bol = c == b'\n';
    }
}

enum Terminator {
    /// The terminator matched; the token is the one that followed it.
    Matched(Token),
    /// The first `prefix` bytes of the terminator matched and `next` did not.
    Unmatched { prefix: usize, next: CopyChar },
}

/// Match the rest of a line that started with `.` against the terminator name.
///
/// Spaces and tabs after the dot are skipped.
/// The terminator must be followed by a space or a newline,
///     except for two-character terminators in compatibility mode.
fn match_terminator<S: RoffState>(vm: &mut VM<S>, term: &[u8]) -> rl::Result<Terminator> {
    let mut d = copymode::get_copy(vm, false, false)?;
    while matches!(d, CopyChar::Byte(b' ' | b'\t')) {
        d = copymode::get_copy(vm, false, false)?;
    }
    let mut i = 0;
    while i < term.len() {
        if d != CopyChar::Byte(term[i]) {
            return Ok(Terminator::Unmatched { prefix: i, next: d });
        }
        i += 1;
        if i < term.len() {
            d = copymode::get_copy(vm, false, false)?;
        }
    }
    if vm.interp().compatible && i == 2 {
        return Ok(Terminator::Matched(Token::Space));
    }
    d = copymode::get_copy(vm, false, false)?;
    match d {
        CopyChar::Byte(b'\n') => Ok(Terminator::Matched(Token::Newline)),
        CopyChar::Byte(b' ') => Ok(Terminator::Matched(Token::Space)),
        CopyChar::Eof => Ok(Terminator::Matched(Token::Eof)),
        next => Ok(Terminator::Unmatched { prefix: i, next }),
    }
}

/// `dei` and `ami`: the arguments name strings holding the macro name and terminator.
fn define_indirect<S: RoffState>(vm: &mut VM<S>, mode: Mode) -> rl::Result<()> {
    let Some(name) = parse::get_required_name(vm)? else {
        return parse::skip_line(vm);
    };
    let term = parse::get_name(vm)?;
    while !vm.token().is_line_end() {
        vm.next_token()?;
    }
    let mut line = String::from(" ");
    line.push_str(&string_value(vm, name));
    if let Some(term) = term {
        line.push(' ');
        line.push_str(&string_value(vm, term));
    }
    line.push('\n');
    vm.push_text(&line)?;
    vm.next_token()?;
    define(vm, mode, false)
}

fn string_value<S: RoffState>(vm: &mut VM<S>, name: Name) -> String {
    match vm.commands.get_macro(name) {
        Some(m) => m.text(),
        None => {
            let s = vm.name_str(name).to_string();
            vm.warning(Warning::Mac, format!("string '{s}' not defined"));
            String::new()
        }
    }
}

fn rm_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    while let Some(name) = parse::get_name(vm)? {
        vm.commands.remove(name);
    }
    parse::skip_line(vm)
}

fn rn_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    let Some(old) = parse::get_required_name(vm)? else {
        return parse::skip_line(vm);
    };
    if let Some(new) = parse::get_required_name(vm)? {
        if !vm.commands.rename(old, new) {
            let s = vm.name_str(old).to_string();
            vm.warning(Warning::Mac, format!("cannot rename undefined request or macro '{s}'"));
        }
    }
    parse::skip_line(vm)
}

fn als_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    let Some(new) = parse::get_required_name(vm)? else {
        return parse::skip_line(vm);
    };
    if let Some(old) = parse::get_required_name(vm)? {
        if !vm.commands.alias(new, old) {
            let s = vm.name_str(old).to_string();
            vm.warning(Warning::Mac, format!("macro '{s}' not defined"));
        }
    }
    parse::skip_line(vm)
}
