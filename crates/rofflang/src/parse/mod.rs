//! Parsing of request arguments.
//!
//! Requests read their own arguments from the VM.
//! Most arguments are read token by token starting from the current token:
//!     names with [get_name], numbers with the functions in [number].
//! Arguments that are stored rather than interpreted, like the value of a string or the
//!     arguments of a macro call, are read in copy mode ([crate::vm::copymode]).

pub mod delimiter;
pub mod number;

pub use delimiter::EscapeCategory;
pub use number::{get_integer, get_number, get_number_relative, Scale};

use crate::error::Warning;
use crate::prelude as rl;
use crate::roffmacro::{Arg, ArgList, Macro};
use crate::token::Name;
use crate::vm::copymode::{self, CopyChar};
use crate::vm::{RoffState, VM};

/// Skip space tokens.
pub fn skip_spaces<S: RoffState>(vm: &mut VM<S>) -> rl::Result<()> {
    while vm.token().is_space() {
        vm.next_token()?;
    }
    Ok(())
}

/// Skip to the start of the next line.
///
/// After this the current token is the first token of the next line.
pub fn skip_line<S: RoffState>(vm: &mut VM<S>) -> rl::Result<()> {
    loop {
        if vm.token().is_eof() {
            return Ok(());
        }
        if vm.token().is_newline() {
            return vm.next_token();
        }
        vm.next_token()?;
    }
}

/// Skip spaces and return whether an argument follows on the line.
pub fn has_arg<S: RoffState>(vm: &mut VM<S>) -> rl::Result<bool> {
    skip_spaces(vm)?;
    Ok(!vm.token().is_line_end())
}

/// Read a name.
///
/// In compatibility mode names have at most two characters, and the token after a
///     two-character name is treated as a space, so `.de xxyy` defines `xx`.
/// Otherwise a name runs until the first token that is not an ordinary character.
/// Returns [None] if there is no name.
pub fn get_name<S: RoffState>(vm: &mut VM<S>) -> rl::Result<Option<Name>> {
    if !vm.interp().compatible {
        return get_long_name(vm, false);
    }
    skip_spaces(vm)?;
    let Some(first) = vm.token().ch() else {
        return Ok(None);
    };
    let mut name = vec![first];
    vm.next_token()?;
    if let Some(second) = vm.token().ch() {
        name.push(second);
        vm.set_token(crate::token::Token::Space);
    }
    let name = String::from_utf8_lossy(&name).into_owned();
    Ok(Some(vm.intern(&name)))
}

/// Read a name of any length.
///
/// If `required` is true a missing name is an error.
pub fn get_long_name<S: RoffState>(vm: &mut VM<S>, required: bool) -> rl::Result<Option<Name>> {
    skip_spaces(vm)?;
    let mut name = vec![];
    while let Some(c) = vm.token().ch() {
        name.push(c);
        vm.next_token()?;
    }
    if name.is_empty() {
        if required {
            vm.error("missing name");
        }
        return Ok(None);
    }
    let name = String::from_utf8_lossy(&name).into_owned();
    Ok(Some(vm.intern(&name)))
}

/// Read a name that must be present.
pub fn get_required_name<S: RoffState>(vm: &mut VM<S>) -> rl::Result<Option<Name>> {
    if vm.interp().compatible {
        let name = get_name(vm)?;
        if name.is_none() {
            vm.error("missing name");
        }
        Ok(name)
    } else {
        get_long_name(vm, true)
    }
}

/// Read the rest of the line in copy mode.
///
/// Leading spaces are skipped and, if `strip_quote` is true, one leading double quote.
/// The newline is consumed but not included.
/// After this the current token is the first token of the next line.
pub fn read_rest_of_line<S: RoffState>(vm: &mut VM<S>, strip_quote: bool) -> rl::Result<Macro> {
    let mut m = Macro::new();
    if !vm.token().is_line_end() {
        let mut c = copymode::get_copy(vm, false, false)?;
        while c == CopyChar::Byte(b' ') {
            c = copymode::get_copy(vm, false, false)?;
        }
        if strip_quote && c == CopyChar::Byte(b'"') {
            c = copymode::get_copy(vm, false, false)?;
        }
        loop {
            match c {
                CopyChar::Eof | CopyChar::Byte(b'\n') => break,
                CopyChar::Byte(b) => m.append_byte(b),
                CopyChar::Node(node) => m.append_node(node),
            }
            c = copymode::get_copy(vm, false, false)?;
        }
    }
    vm.next_token()?;
    Ok(m)
}

/// Read the arguments of a macro call from the rest of the line, in copy mode.
///
/// Arguments are separated by spaces.
/// An argument that starts with a double quote runs to the next double quote read at the
///     same input level, and `""` inside it is a literal quote.
pub fn decode_args<S: RoffState>(vm: &mut VM<S>) -> rl::Result<ArgList> {
    let mut args = ArgList::default();
    if vm.token().is_line_end() {
        return Ok(args);
    }
    let mut c = copymode::get_copy(vm, false, false)?;
    loop {
        while c == CopyChar::Byte(b' ') {
            c = copymode::get_copy(vm, false, false)?;
        }
        if matches!(c, CopyChar::Eof | CopyChar::Byte(b'\n')) {
            break;
        }
        let mut arg = Arg::default();
        let mut quote_level = None;
        let mut tab_warning_done = false;
        if c == CopyChar::Byte(b'"') {
            quote_level = Some(vm.input_stack().level());
            arg.quoted = true;
            c = copymode::get_copy(vm, false, false)?;
        }
        loop {
            match c {
                CopyChar::Eof | CopyChar::Byte(b'\n') => break,
                CopyChar::Byte(b' ') if quote_level.is_none() => break,
                CopyChar::Byte(b'"')
                    if quote_level.is_some()
                        && (vm.interp().compatible
                            || Some(vm.input_stack().level()) == quote_level) =>
                {
                    c = copymode::get_copy(vm, false, false)?;
                    if c == CopyChar::Byte(b'"') {
                        arg.value.append_byte(b'"');
                        c = copymode::get_copy(vm, false, false)?;
                    } else {
                        break;
                    }
                }
                CopyChar::Byte(b) => {
                    if b == b'\t' && quote_level.is_none() && !tab_warning_done {
                        vm.warning(Warning::Tab, "tab character in unquoted macro argument");
                        tab_warning_done = true;
                    }
                    arg.value.append_byte(b);
                    c = copymode::get_copy(vm, false, false)?;
                }
                CopyChar::Node(node) => {
                    arg.value.append_node(node);
                    c = copymode::get_copy(vm, false, false)?;
                }
            }
        }
        arg.space_follows = c == CopyChar::Byte(b' ');
        args.push(arg);
    }
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Token;
    use std::collections::HashMap;

    fn new_vm(input: &str) -> Box<VM<()>> {
        let mut vm = VM::<()>::new(HashMap::new());
        vm.terminal_out = std::rc::Rc::new(std::cell::RefCell::new(std::io::sink()));
        vm.push_source("test", input).unwrap();
        vm.next_token().unwrap();
        vm
    }

    fn args(input: &str) -> Vec<String> {
        let mut vm = new_vm(input);
        decode_args(&mut vm)
            .unwrap()
            .iter()
            .map(|arg| arg.value.text())
            .collect()
    }

    #[test]
    fn long_name() {
        let mut vm = new_vm("  abc def");
        let name = get_name(&mut vm).unwrap().unwrap();
        assert_eq!(vm.name_str(name), "abc");
        assert_eq!(vm.token(), &Token::Space);
    }

    #[test]
    fn compatible_name_has_two_characters() {
        let mut vm = new_vm("abcd");
        vm.interp_mut().compatible = true;
        let name = get_name(&mut vm).unwrap().unwrap();
        assert_eq!(vm.name_str(name), "ab");
        assert_eq!(vm.token(), &Token::Space);
        vm.next_token().unwrap();
        assert_eq!(vm.token(), &Token::Char(b'c'));
    }

    #[test]
    fn missing_name() {
        let mut vm = new_vm("\n");
        assert_eq!(get_name(&mut vm).unwrap(), None);
    }

    #[test]
    fn skip_line_moves_to_next_line() {
        let mut vm = new_vm("rest of line\nnext");
        skip_line(&mut vm).unwrap();
        assert_eq!(vm.token(), &Token::Char(b'n'));
    }

    #[test]
    fn has_arg_skips_spaces() {
        let mut vm = new_vm("   x");
        assert!(has_arg(&mut vm).unwrap());
        let mut vm = new_vm("   \n");
        assert!(!has_arg(&mut vm).unwrap());
    }

    #[test]
    fn rest_of_line() {
        let mut vm = new_vm(" \"  quoted text\nnext");
        let m = read_rest_of_line(&mut vm, true).unwrap();
        assert_eq!(m.text(), "  quoted text");
        assert_eq!(vm.token(), &Token::Char(b'n'));
    }

    #[test]
    fn unquoted_args() {
        assert_eq!(args(" a  b c\n"), vec!["a", "b", "c"]);
    }

    #[test]
    fn quoted_args() {
        assert_eq!(args(" \"a b\" c\n"), vec!["a b", "c"]);
    }

    #[test]
    fn doubled_quote_is_literal() {
        assert_eq!(args(" \"say \"\"hi\"\"\"\n"), vec!["say \"hi\""]);
    }

    #[test]
    fn empty_quoted_arg() {
        assert_eq!(args(" \"\" x\n"), vec!["", "x"]);
    }

    #[test]
    fn no_args() {
        assert!(args("\n").is_empty());
    }

    #[test]
    fn space_follows() {
        let mut vm = new_vm(" a b\n");
        let args = decode_args(&mut vm).unwrap();
        assert!(args.get(1).unwrap().space_follows);
        assert!(!args.get(2).unwrap().space_follows);
    }
}
