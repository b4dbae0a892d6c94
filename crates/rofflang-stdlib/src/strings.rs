//! String requests
//!
//! Strings live in the same namespace as macros.
//! A string is simply a macro whose value was given on a single request line.

use rofflang::command::{self, Command};
use rofflang::error::Warning;
use rofflang::parse;
use rofflang::prelude as rl;
use rofflang::roffmacro::Macro;
use rofflang::input::Raw;
use rofflang::token::{code, Name};
use rofflang::traits::*;
use rofflang::vm::VM;

pub const DS_DOC: &str = "Define a string";
pub const DS1_DOC: &str = "Define a string that is read with compatibility mode off";
pub const AS_DOC: &str = "Append to a string";
pub const AS1_DOC: &str = "Append to a string; the appended part is read with compatibility mode off";
pub const CHOP_DOC: &str = "Remove the last element of a string or macro";
pub const LENGTH_DOC: &str = "Set a register to the length of the rest of the line";
pub const SUBSTRING_DOC: &str = "Replace a string by the elements between two indices";

/// Get the `ds` request.
pub fn get_ds<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(ds_fn).with_doc(DS_DOC)
}

/// Get the `ds1` request.
pub fn get_ds1<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(ds1_fn).with_doc(DS1_DOC)
}

/// Get the `as` request.
pub fn get_as<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(as_fn).with_doc(AS_DOC)
}

/// Get the `as1` request.
pub fn get_as1<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(as1_fn).with_doc(AS1_DOC)
}

/// Get the `chop` request.
pub fn get_chop<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(chop_fn).with_doc(CHOP_DOC)
}

/// Get the `length` request.
pub fn get_length<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(length_fn).with_doc(LENGTH_DOC)
}

/// Get the `substring` request.
pub fn get_substring<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(substring_fn).with_doc(SUBSTRING_DOC)
}

fn ds_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    define_string(vm, false, false)
}

fn ds1_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    define_string(vm, false, true)
}

fn as_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    define_string(vm, true, false)
}

fn as1_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    define_string(vm, true, true)
}

fn define_string<S: RoffState>(vm: &mut VM<S>, append: bool, groff_mode: bool) -> rl::Result<()> {
    let Some(name) = parse::get_required_name(vm)? else {
        return parse::skip_line(vm);
    };
    if !vm.token().is_space() && !vm.token().is_line_end() {
        vm.error("bad string definition");
        return parse::skip_line(vm);
    }
    let value = parse::read_rest_of_line(vm, true)?;
    let mut m = if append {
        vm.commands.get_macro(name).unwrap_or_default()
    } else {
        Macro::new()
    };
    if groff_mode {
        m.append_byte(code::PUSH_GROFF_MODE);
    }
    m.append_macro(&value);
    if groff_mode {
        m.append_byte(code::POP_MODE);
    }
    vm.commands.update_macro(name, m);
    Ok(())
}

fn is_mode_code(b: u8) -> bool {
    matches!(
        b,
        code::PUSH_GROFF_MODE | code::PUSH_COMPAT_MODE | code::POP_MODE
    )
}

fn chop_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    let Some(name) = parse::get_required_name(vm)? else {
        return parse::skip_line(vm);
    };
    match vm.commands.get(name) {
        None => {
            let s = vm.name_str(name).to_string();
            vm.warning(Warning::Mac, format!("cannot chop undefined macro '{s}'"));
            vm.commands.insert_macro(name, Macro::new());
        }
        Some(Command::Request(_)) => vm.error("cannot chop request"),
        Some(Command::Macro(_)) => {
            let mut m = vm.commands.get_macro(name).unwrap_or_default();
            // Empty `am1` requests leave pairs of mode codes at the end.
            let mut have_restore = false;
            loop {
                if m.bytes().last() != Some(&code::POP_MODE) {
                    break;
                }
                have_restore = true;
                m.chop();
                if !matches!(
                    m.bytes().last(),
                    Some(&(code::PUSH_GROFF_MODE | code::PUSH_COMPAT_MODE))
                ) {
                    break;
                }
                have_restore = false;
                m.chop();
                if m.is_empty() {
                    break;
                }
            }
            if m.is_empty() {
                vm.error("cannot chop empty macro");
            } else {
                m.chop();
                if have_restore {
                    m.append_byte(code::POP_MODE);
                }
                vm.commands.update_macro(name, m);
            }
        }
    }
    parse::skip_line(vm)
}

fn length_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    let Some(name) = parse::get_required_name(vm)? else {
        return parse::skip_line(vm);
    };
    let value = parse::read_rest_of_line(vm, true)?;
    let len = value.bytes().iter().filter(|b| !is_mode_code(**b)).count();
    vm.registers.set_value(name, len as i32);
    Ok(())
}

fn substring_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    let Some(name) = parse::get_required_name(vm)? else {
        return parse::skip_line(vm);
    };
    let m = match vm.commands.get(name) {
        Some(Command::Macro(_)) => vm.commands.get_macro(name).unwrap_or_default(),
        Some(Command::Request(_)) => {
            vm.error("cannot extract substring of request");
            return parse::skip_line(vm);
        }
        None => {
            let s = vm.name_str(name).to_string();
            vm.warning(Warning::Mac, format!("string '{s}' not defined"));
            return parse::skip_line(vm);
        }
    };
    parse::skip_spaces(vm)?;
    let Some(mut start) = parse::get_integer(vm)? else {
        return parse::skip_line(vm);
    };
    let mut end = -1;
    if parse::has_arg(vm)? {
        if let Some(n) = parse::get_integer(vm)? {
            end = n;
        }
    }
    let real_len = m.bytes().iter().filter(|b| !is_mode_code(**b)).count() as i32;
    if start < 0 {
        start += real_len;
    }
    if end < 0 {
        end += real_len;
    }
    if start > end {
        std::mem::swap(&mut start, &mut end);
    }
    let result = if start >= real_len || end < 0 {
        vm.warning(
            Warning::Range,
            "start and end index of substring out of range",
        );
        Macro::new()
    } else {
        if start < 0 {
            vm.warning(
                Warning::Range,
                "start index of substring out of range, set to 0",
            );
            start = 0;
        }
        if end >= real_len {
            vm.warning(
                Warning::Range,
                "end index of substring out of range, set to string length",
            );
            end = real_len - 1;
        }
        extract(&m, start as usize, end as usize)
    };
    vm.commands.update_macro(name, result);
    parse::skip_line(vm)
}

/// The elements with indices in `[start, end]`, not counting mode codes.
fn extract(m: &Macro, start: usize, end: usize) -> Macro {
    let mut result = Macro::new();
    let mut cursor = m.cursor();
    let mut i = 0_usize;
    while let Some(raw) = cursor.get() {
        if let Raw::Byte(b) = raw {
            if is_mode_code(b) {
                continue;
            }
        }
        if i > end {
            break;
        }
        if i >= start {
            result.append(raw);
        }
        i += 1;
    }
    result
}
