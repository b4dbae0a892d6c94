//! The copy-mode reader.
//!
//! Macro bodies, string values and macro arguments are read in _copy mode_:
//!     most escape sequences are stored rather than interpreted.
//! Interpolations (`\$`, `\*`, `\n`, `\g`, `\V`) are still performed,
//!     comments are dropped, `\\` is reduced to the escape character,
//!     and a few escapes are replaced by control codes from [crate::token::code]
//!     so that the tokenizer can recognize them when the body is read again,
//!     even if the escape character has changed in the meantime.
//!
//! This module also reads escape names (`x`, `(xx`, `[name]`),
//!     which are always read in copy mode.

use super::interpolate;
use super::{RoffState, VM};
use crate::input::Raw;
use crate::node::Node;
use crate::prelude as rl;
use crate::roffmacro::{Arg, ArgList};
use crate::token::code;
use crate::token::Name;

/// One element read in copy mode.
#[derive(Debug, Clone, PartialEq)]
pub enum CopyChar {
    Byte(u8),
    Node(Node),
    Eof,
}

/// Read the next element in copy mode.
///
/// When `defining` is true an escaped newline is kept as [code::ESCAPE_NEWLINE];
///     otherwise it is dropped.
/// When `handle_escape_e` is true `\E` is interpreted as the escape character.
pub fn get_copy<S: RoffState>(
    vm: &mut VM<S>,
    defining: bool,
    handle_escape_e: bool,
) -> rl::Result<CopyChar> {
    loop {
        let c = match vm.get_raw() {
            None => return Ok(CopyChar::Eof),
            Some(Raw::Node(node)) => return Ok(CopyChar::Node(node)),
            Some(Raw::Byte(c)) | Some(Raw::Invalid(c)) => c,
        };
        match c {
            code::PUSH_GROFF_MODE => {
                vm.interp_mut().push_compatible(false);
                continue;
            }
            code::PUSH_COMPAT_MODE => {
                vm.interp_mut().push_compatible(true);
                continue;
            }
            code::POP_MODE => {
                vm.interp_mut().pop_compatible();
                continue;
            }
            code::ESCAPE_NEWLINE => {
                if defining {
                    return Ok(CopyChar::Byte(code::ESCAPE_NEWLINE));
                }
                continue;
            }
            code::ESCAPE_UNINTERPRETED if handle_escape_e => {}
            c if Some(c) != vm.interp().escape_char() => return Ok(CopyChar::Byte(c)),
            _ => {}
        }
        if let Some(c) = escape(vm, defining, handle_escape_e)? {
            return Ok(c);
        }
    }
}

/// Handle the element after an escape character.
///
/// Returns [None] when the escape was an interpolation or a `\#` comment,
///     in which case reading continues.
fn escape<S: RoffState>(
    vm: &mut VM<S>,
    defining: bool,
    handle_escape_e: bool,
) -> rl::Result<Option<CopyChar>> {
    let escape_char = vm.interp().escape_char().unwrap_or(b'\\');
    loop {
        let c = match vm.peek_raw() {
            None | Some(Raw::Node(_)) => return Ok(Some(CopyChar::Byte(escape_char))),
            Some(Raw::Byte(c)) | Some(Raw::Invalid(c)) => c,
        };
        let translated = match c {
            b'"' => {
                vm.get_raw();
                return skip_comment(vm).map(|c| Some(c));
            }
            b'#' => {
                vm.get_raw();
                return match skip_comment(vm)? {
                    CopyChar::Eof => Ok(Some(CopyChar::Eof)),
                    _ => Ok(None),
                };
            }
            b'$' => {
                vm.get_raw();
                if let Some(name) = read_escape_name_bytes(vm, ReadMode::NoArgs)? {
                    interpolate::argument(vm, &name.0)?;
                }
                return Ok(None);
            }
            b'*' => {
                vm.get_raw();
                interpolate::read_and_interpolate_string(vm)?;
                return Ok(None);
            }
            b'n' => {
                vm.get_raw();
                if let Some((name, increment)) = read_increment_and_escape_name(vm)? {
                    interpolate::register(vm, name, increment)?;
                }
                return Ok(None);
            }
            b'g' => {
                vm.get_raw();
                if let Some(name) = read_escape_name(vm, ReadMode::NoArgs)? {
                    interpolate::register_format(vm, name)?;
                }
                return Ok(None);
            }
            b'V' => {
                vm.get_raw();
                if let Some(name) = read_escape_name(vm, ReadMode::NoArgs)? {
                    interpolate::environment_variable(vm, name)?;
                }
                return Ok(None);
            }
            b'E' => {
                vm.get_raw();
                if handle_escape_e {
                    continue;
                }
                code::ESCAPE_UNINTERPRETED
            }
            b'\n' => {
                vm.get_raw();
                if defining {
                    code::ESCAPE_NEWLINE
                } else {
                    return Ok(None);
                }
            }
            b'a' => 0x01,
            b't' => b'\t',
            b'e' => code::ESCAPE_PRINTABLE,
            b' ' => code::ESCAPE_SPACE,
            b'~' => code::ESCAPE_TILDE,
            b':' => code::ESCAPE_COLON,
            b'|' => code::ESCAPE_BAR,
            b'^' => code::ESCAPE_CIRCUMFLEX,
            b'{' => code::ESCAPE_LEFT_BRACE,
            b'}' => code::ESCAPE_RIGHT_BRACE,
            b'`' => code::ESCAPE_LEFT_QUOTE,
            b'\'' => code::ESCAPE_RIGHT_QUOTE,
            b'-' => code::ESCAPE_HYPHEN,
            b'_' => code::ESCAPE_UNDERSCORE,
            b'c' => code::ESCAPE_INTERRUPT,
            b'!' => code::ESCAPE_BANG,
            b'?' => code::ESCAPE_QUESTION,
            b'&' => code::ESCAPE_AMPERSAND,
            b')' => code::ESCAPE_RIGHT_PARENTHESIS,
            b'%' => code::ESCAPE_PERCENT,
            b'.' => b'.',
            c if c == escape_char => escape_char,
            _ => return Ok(Some(CopyChar::Byte(escape_char))),
        };
        if c != b'E' && c != b'\n' {
            vm.get_raw();
        }
        return Ok(Some(CopyChar::Byte(translated)));
    }
}

/// Skip raw input up to the end of the line.
///
/// Returns the newline, or [CopyChar::Eof] if the input ended first.
fn skip_comment<S: RoffState>(vm: &mut VM<S>) -> rl::Result<CopyChar> {
    loop {
        match vm.get_raw() {
            None => return Ok(CopyChar::Eof),
            Some(Raw::Byte(b'\n')) => return Ok(CopyChar::Byte(b'\n')),
            Some(_) => {}
        }
    }
}

/// How a long escape name `[...]` is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    NoArgs,
    /// A space ends the name and starts arguments, as in `\*[name arg1 arg2]`.
    WithArgs,
    /// The empty name `[]` is allowed, as in `\f[]`.
    AllowEmpty,
}

/// Human readable description of a byte, used in diagnostics.
pub fn char_description(c: u8) -> String {
    match c {
        b'\n' => "a newline character".into(),
        b'\t' => "a tab character".into(),
        b' ' => "a space character".into(),
        0x01 => "a leader character".into(),
        0x08 => "a backspace character".into(),
        c if code::is_invalid_input(c) => format!("character code {c}"),
        0x21..=0x7e => format!("character '{}'", c as char),
        c => format!("character code {c}"),
    }
}

/// Read one character of an escape name.
///
/// Returns [None] after reporting a diagnostic if the character cannot be part of a name.
/// A newline that ends the name early is pushed back.
fn get_char_for_escape_name<S: RoffState>(
    vm: &mut VM<S>,
    allow_space: bool,
) -> rl::Result<Option<u8>> {
    let c = match get_copy(vm, false, true)? {
        CopyChar::Eof => {
            vm.copy_mode_error("end of input in escape name");
            return Ok(None);
        }
        CopyChar::Node(_) => {
            vm.copy_mode_error("a node is not allowed in an escape name");
            return Ok(None);
        }
        CopyChar::Byte(c) => c,
    };
    let allowed = match c {
        b'\n' => {
            vm.push_text("\n")?;
            false
        }
        b' ' => allow_space,
        b'\t' | 0x01 | 0x08 => false,
        c => !code::is_invalid_input(c),
    };
    if !allowed {
        let description = char_description(c);
        vm.copy_mode_error(format!("{description} is not allowed in an escape name"));
        return Ok(None);
    }
    Ok(Some(c))
}

/// Name bytes plus whether arguments follow.
struct EscapeName(Vec<u8>, bool);

fn read_escape_name_bytes<S: RoffState>(
    vm: &mut VM<S>,
    mode: ReadMode,
) -> rl::Result<Option<EscapeName>> {
    let Some(c) = get_char_for_escape_name(vm, false)? else {
        return Ok(None);
    };
    if c == b'(' {
        return Ok(read_two_char_escape_name_bytes(vm)?.map(|name| EscapeName(name, false)));
    }
    if c == b'[' && !vm.interp().compatible {
        return read_long_escape_name_bytes(vm, mode);
    }
    Ok(Some(EscapeName(vec![c], false)))
}

fn read_two_char_escape_name_bytes<S: RoffState>(vm: &mut VM<S>) -> rl::Result<Option<Vec<u8>>> {
    let Some(first) = get_char_for_escape_name(vm, false)? else {
        return Ok(None);
    };
    let Some(second) = get_char_for_escape_name(vm, false)? else {
        return Ok(None);
    };
    Ok(Some(vec![first, second]))
}

fn read_long_escape_name_bytes<S: RoffState>(
    vm: &mut VM<S>,
    mode: ReadMode,
) -> rl::Result<Option<EscapeName>> {
    let start_level = vm.input_stack().level();
    let mut name = vec![];
    let mut has_args = false;
    loop {
        let Some(c) = get_char_for_escape_name(vm, mode == ReadMode::WithArgs)? else {
            return Ok(None);
        };
        if c == b']' && vm.input_stack().level() == start_level {
            break;
        }
        if mode == ReadMode::WithArgs && c == b' ' {
            has_args = true;
            break;
        }
        name.push(c);
    }
    if name.is_empty() && mode != ReadMode::AllowEmpty {
        vm.copy_mode_error("empty escape name");
        return Ok(None);
    }
    Ok(Some(EscapeName(name, has_args)))
}

fn intern_bytes<S: RoffState>(vm: &mut VM<S>, name: &[u8]) -> Name {
    let name = String::from_utf8_lossy(name);
    vm.intern(&name)
}

/// Read an escape name: a single character, `(xx` or `[name]`.
///
/// Returns [None] after reporting a diagnostic if the name is malformed;
///     a partial name is never returned.
pub fn read_escape_name<S: RoffState>(
    vm: &mut VM<S>,
    mode: ReadMode,
) -> rl::Result<Option<Name>> {
    Ok(read_escape_name_bytes(vm, mode)?.map(|name| intern_bytes(vm, &name.0)))
}

/// Read an escape name that may be followed by arguments, as in `\*[name arg]`.
///
/// The boolean is true if arguments follow the name.
pub fn read_escape_name_with_args<S: RoffState>(
    vm: &mut VM<S>,
) -> rl::Result<Option<(Name, bool)>> {
    Ok(read_escape_name_bytes(vm, ReadMode::WithArgs)?
        .map(|EscapeName(name, has_args)| (intern_bytes(vm, &name), has_args)))
}

/// Read the two characters of a name after `(`.
pub fn read_two_char_escape_name<S: RoffState>(vm: &mut VM<S>) -> rl::Result<Option<Name>> {
    Ok(read_two_char_escape_name_bytes(vm)?.map(|name| intern_bytes(vm, &name)))
}

/// Read the rest of a long name after `[`.
pub fn read_long_escape_name<S: RoffState>(
    vm: &mut VM<S>,
    mode: ReadMode,
) -> rl::Result<Option<(Name, bool)>> {
    Ok(read_long_escape_name_bytes(vm, mode)?
        .map(|EscapeName(name, has_args)| (intern_bytes(vm, &name), has_args)))
}

/// Read the name of a `\n` escape, which may start with an auto-increment sign.
///
/// Returns the name and the increment direction: `1` for `\n+x`, `-1` for `\n-x`
///     and `0` otherwise.
pub fn read_increment_and_escape_name<S: RoffState>(
    vm: &mut VM<S>,
) -> rl::Result<Option<(Name, i32)>> {
    let Some(c) = get_char_for_escape_name(vm, false)? else {
        return Ok(None);
    };
    let (name, increment) = match c {
        b'(' => (read_two_char_escape_name_bytes(vm)?, 0),
        b'+' => (read_escape_name_bytes(vm, ReadMode::NoArgs)?.map(|n| n.0), 1),
        b'-' => (read_escape_name_bytes(vm, ReadMode::NoArgs)?.map(|n| n.0), -1),
        b'[' if !vm.interp().compatible => (
            read_long_escape_name_bytes(vm, ReadMode::NoArgs)?.map(|n| n.0),
            0,
        ),
        c => (Some(vec![c]), 0),
    };
    Ok(name.map(|name| (intern_bytes(vm, &name), increment)))
}

/// Read the arguments of `\*[name args]` up to the closing bracket, in copy mode.
pub fn decode_string_args<S: RoffState>(vm: &mut VM<S>) -> rl::Result<ArgList> {
    let mut args = ArgList::default();
    let mut c = get_copy(vm, false, false)?;
    loop {
        while c == CopyChar::Byte(b' ') {
            c = get_copy(vm, false, false)?;
        }
        match c {
            CopyChar::Eof => {
                vm.error("missing ']'");
                break;
            }
            CopyChar::Byte(b'\n') => {
                vm.error("missing ']'");
                vm.push_text("\n")?;
                break;
            }
            CopyChar::Byte(b']') => break,
            _ => {}
        }
        let mut arg = Arg::default();
        let mut quote_level = None;
        if c == CopyChar::Byte(b'"') {
            quote_level = Some(vm.input_stack().level());
            arg.quoted = true;
            c = get_copy(vm, false, false)?;
        }
        loop {
            match c {
                CopyChar::Eof | CopyChar::Byte(b'\n') => break,
                CopyChar::Byte(b']' | b' ') if quote_level.is_none() => break,
                CopyChar::Byte(b'"') if Some(vm.input_stack().level()) == quote_level => {
                    c = get_copy(vm, false, false)?;
                    if c == CopyChar::Byte(b'"') {
                        arg.value.append_byte(b'"');
                        c = get_copy(vm, false, false)?;
                    } else {
                        break;
                    }
                }
                CopyChar::Byte(b) => {
                    arg.value.append_byte(b);
                    c = get_copy(vm, false, false)?;
                }
                CopyChar::Node(node) => {
                    arg.value.append_node(node);
                    c = get_copy(vm, false, false)?;
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
    use std::collections::HashMap;

    fn new_vm(input: &str) -> Box<VM<()>> {
        let mut vm = VM::<()>::new(HashMap::new());
        vm.terminal_out = std::rc::Rc::new(std::cell::RefCell::new(std::io::sink()));
        vm.push_source("test", input).unwrap();
        vm
    }

    fn copy_all(vm: &mut VM<()>, defining: bool) -> Vec<u8> {
        let mut bytes = vec![];
        loop {
            match get_copy(vm, defining, false).unwrap() {
                CopyChar::Eof => return bytes,
                CopyChar::Byte(b) => bytes.push(b),
                CopyChar::Node(_) => bytes.push(0),
            }
        }
    }

    macro_rules! copy_mode_tests {
        ($( ($name: ident, $input: expr, $want: expr), )+) => {
            $(
                #[test]
                fn $name() {
                    let mut vm = new_vm($input);
                    let got = copy_all(&mut vm, true);
                    let want: &[u8] = $want;
                    assert_eq!(got, want);
                }
            )+
        };
    }

    copy_mode_tests!(
        (plain_text, "abc\n", b"abc\n"),
        (double_escape_is_reduced, "a\\\\b", b"a\\b"),
        (comment_keeps_newline, "a\\\" comment\nb", b"a\nb"),
        (hash_comment_drops_newline, "a\\# comment\nb", b"ab"),
        (escaped_newline_is_kept_when_defining, "a\\\nb", &[b'a', code::ESCAPE_NEWLINE, b'b']),
        (tab_escape, "\\t", b"\t"),
        (leader_escape, "\\a", &[0x01]),
        (escaped_space, "\\ ", &[code::ESCAPE_SPACE]),
        (printable_escape, "\\e", &[code::ESCAPE_PRINTABLE]),
        (uninterpreted_escape, "\\E", &[code::ESCAPE_UNINTERPRETED]),
        (escaped_period, "\\.", b"."),
        (other_escapes_are_kept, "\\fB", b"\\fB"),
        (escape_at_end, "a\\", b"a\\"),
    );

    #[test]
    fn escaped_newline_is_dropped_when_not_defining() {
        let mut vm = new_vm("a\\\nb");
        assert_eq!(copy_all(&mut vm, false), b"ab");
    }

    #[test]
    fn string_interpolation() {
        let mut vm = new_vm("<\\*[x]>");
        let x = vm.intern("x");
        vm.commands
            .insert(x, crate::command::Command::new_macro(crate::roffmacro::Macro::from_text("hello")));
        assert_eq!(copy_all(&mut vm, true), b"<hello>");
    }

    #[test]
    fn environment_variable_bytes_are_filtered() {
        let mut vm = new_vm("<\\V[x]>");
        vm.env_var = |_| Some("a\u{0102}b".to_string());
        assert_eq!(copy_all(&mut vm, true), &[b'<', b'a', 0xC4, b'b', b'>']);
    }

    #[test]
    fn register_interpolation_with_increment() {
        let mut vm = new_vm("\\n+a \\na");
        let a = vm.intern("a");
        let register = vm.registers.get_or_create(a);
        register.value = 1;
        register.increment = 2;
        assert_eq!(copy_all(&mut vm, true), b"3 3");
    }

    #[test]
    fn compatibility_markers() {
        let mut vm = new_vm("");
        vm.push_input(crate::input::Source::temporary_bytes(&[
            code::PUSH_COMPAT_MODE,
            b'a',
        ]))
        .unwrap();
        assert_eq!(get_copy(&mut vm, false, false).unwrap(), CopyChar::Byte(b'a'));
        assert!(vm.interp().compatible);
    }

    #[test]
    fn escape_names() {
        let mut vm = new_vm("x(ab[long]");
        let x = read_escape_name(&mut vm, ReadMode::NoArgs).unwrap().unwrap();
        assert_eq!(vm.name_str(x), "x");
        let ab = read_escape_name(&mut vm, ReadMode::NoArgs).unwrap().unwrap();
        assert_eq!(vm.name_str(ab), "ab");
        let long = read_escape_name(&mut vm, ReadMode::NoArgs).unwrap().unwrap();
        assert_eq!(vm.name_str(long), "long");
    }

    #[test]
    fn compatible_bracket_is_a_name() {
        let mut vm = new_vm("[x]");
        vm.interp_mut().compatible = true;
        let name = read_escape_name(&mut vm, ReadMode::NoArgs).unwrap().unwrap();
        assert_eq!(vm.name_str(name), "[");
    }

    #[test]
    fn name_with_args() {
        let mut vm = new_vm("[name a b]");
        let (name, has_args) = read_escape_name_with_args(&mut vm).unwrap().unwrap();
        assert_eq!(vm.name_str(name), "name");
        assert!(has_args);
        let args = decode_string_args(&mut vm).unwrap();
        assert_eq!(args.len(), 2);
        assert_eq!(args.get(2).unwrap().value.text(), "b");
    }

    #[test]
    fn end_of_input_in_name_is_error() {
        let mut vm = new_vm("(a");
        assert_eq!(read_escape_name(&mut vm, ReadMode::NoArgs).unwrap(), None);
        assert_eq!(vm.diagnostic_counts(), (0, 1));
    }

    #[test]
    fn newline_in_name_is_pushed_back() {
        let mut vm = new_vm("[ab\nc");
        assert_eq!(read_escape_name(&mut vm, ReadMode::NoArgs).unwrap(), None);
        assert_eq!(get_copy(&mut vm, false, false).unwrap(), CopyChar::Byte(b'\n'));
        assert_eq!(get_copy(&mut vm, false, false).unwrap(), CopyChar::Byte(b'c'));
    }

    #[test]
    fn empty_name() {
        let mut vm = new_vm("[][]");
        assert_eq!(read_escape_name(&mut vm, ReadMode::NoArgs).unwrap(), None);
        let empty = read_escape_name(&mut vm, ReadMode::AllowEmpty).unwrap().unwrap();
        assert_eq!(vm.name_str(empty), "");
    }

    #[test]
    fn increment_names() {
        let mut vm = new_vm("+a-(bc[d]e");
        let mut got = vec![];
        for _ in 0..4 {
            let (name, increment) = read_increment_and_escape_name(&mut vm).unwrap().unwrap();
            got.push((vm.name_str(name).to_string(), increment));
        }
        assert_eq!(
            got,
            vec![
                ("a".to_string(), 1),
                ("bc".to_string(), -1),
                ("d".to_string(), 0),
                ("e".to_string(), 0)
            ]
        );
    }

    #[test]
    fn missing_closing_bracket_in_string_args() {
        let mut vm = new_vm(" a b\nnext");
        let args = decode_string_args(&mut vm).unwrap();
        assert_eq!(args.len(), 2);
        assert_eq!(vm.diagnostic_counts(), (0, 1));
        assert_eq!(get_copy(&mut vm, false, false).unwrap(), CopyChar::Byte(b'\n'));
    }
}
