//! Interpolation escapes: `\$`, `\*`, `\n`, `\g` and `\V`.
//!
//! Each of these pushes a source onto the input stack and returns.
//! The caller, the tokenizer or the copy-mode reader, then simply continues reading,
//!     so the interpolated text is read as if it had been in the input.

use super::copymode;
use super::{RoffState, VM};
use crate::command::Command;
use crate::error::Warning;
use crate::input::Source;
use crate::prelude as rl;
use crate::roffmacro::{Invocation, Macro, MacroIterator};
use crate::token::Name;

/// Interpolate a macro argument, `\$n`, `\$*`, `\$@` or `\$^`.
pub(crate) fn argument<S: RoffState>(vm: &mut VM<S>, name: &[u8]) -> rl::Result<()> {
    if name.is_empty() {
        vm.copy_mode_error("missing argument name");
        return Ok(());
    }
    let stack = vm.input_stack();
    let m = if name.iter().all(u8::is_ascii_digit) {
        let n = std::str::from_utf8(name)
            .ok()
            .and_then(|n| n.parse::<usize>().ok())
            .unwrap_or(usize::MAX);
        if n == 0 {
            match stack.macro_name() {
                Some(macro_name) => Macro::from_text(vm.name_str(macro_name)),
                None => Macro::new(),
            }
        } else {
            stack.get_arg(n).unwrap_or_default()
        }
    } else {
        let Some(args) = stack.args() else {
            return Ok(());
        };
        let mut m = Macro::new();
        match name {
            b"*" => {
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        m.append_byte(b' ');
                    }
                    m.append_macro(&arg.value);
                }
            }
            b"@" => {
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        m.append_byte(b' ');
                    }
                    m.append_byte(b'"');
                    m.append_macro(&arg.value);
                    m.append_byte(b'"');
                }
            }
            b"^" => {
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        m.append_byte(b' ');
                    }
                    m.append_byte(b'"');
                    let mut cursor = arg.value.cursor();
                    while let Some(raw) = cursor.get() {
                        if raw == crate::input::Raw::Byte(b'"') {
                            m.append_byte(b'"');
                        }
                        m.append(raw);
                    }
                    m.append_byte(b'"');
                }
            }
            _ => {
                let name = String::from_utf8_lossy(name).into_owned();
                vm.copy_mode_error(format!("bad argument name '{name}'"));
                return Ok(());
            }
        }
        m
    };
    if m.is_empty() {
        return Ok(());
    }
    vm.push_input(Source::Macro(MacroIterator::new_string(
        None,
        &m,
        Invocation::Argument,
    )))
}

/// Read the name after `\*` and interpolate the string, with arguments if given.
pub(crate) fn read_and_interpolate_string<S: RoffState>(vm: &mut VM<S>) -> rl::Result<()> {
    let Some((name, has_args)) = copymode::read_escape_name_with_args(vm)? else {
        return Ok(());
    };
    let Some(m) = lookup_string(vm, name) else {
        if has_args {
            // Arguments are still read so that they do not appear in the output.
            copymode::decode_string_args(vm)?;
        }
        return Ok(());
    };
    if has_args {
        let args = copymode::decode_string_args(vm)?;
        let iter = MacroIterator::new_macro(name, &m, args, false, Invocation::Macro);
        return vm.push_input(Source::Macro(iter));
    }
    let invocation = if m.is_diversion() {
        Invocation::Diversion
    } else {
        Invocation::String
    };
    vm.push_input(Source::Macro(MacroIterator::new_string(
        Some(name),
        &m,
        invocation,
    )))
}

fn lookup_string<S: RoffState>(vm: &mut VM<S>, name: Name) -> Option<Macro> {
    match vm.commands.get(name) {
        Some(Command::Macro(m)) => Some(m.borrow().clone()),
        Some(Command::Request(_)) => {
            let s = vm.name_str(name).to_string();
            vm.error(format!("cannot interpolate request '{s}'"));
            None
        }
        None => {
            let s = vm.name_str(name).to_string();
            vm.warning(Warning::Mac, format!("string '{s}' not defined"));
            vm.commands.insert(name, Command::new_macro(Macro::new()));
            None
        }
    }
}

/// Interpolate a register, `\nx`, applying the auto-increment first.
pub(crate) fn register<S: RoffState>(vm: &mut VM<S>, name: Name, increment: i32) -> rl::Result<()> {
    if let Some(f) = vm.registers.computed(name) {
        let value = f(vm);
        return vm.push_text(&value);
    }
    let value = match vm.registers.get_mut(name) {
        Some(register) => {
            match increment {
                1 => register.value = register.value.saturating_add(register.increment),
                -1 => register.value = register.value.saturating_sub(register.increment),
                _ => {}
            }
            register.formatted()
        }
        None => {
            let s = vm.name_str(name).to_string();
            vm.warning(Warning::Reg, format!("register '{s}' not defined"));
            vm.registers.set_value(name, 0);
            "0".to_string()
        }
    };
    vm.push_text(&value)
}

/// Interpolate the format of a register, `\gx`.
///
/// Undefined and read-only registers interpolate nothing.
pub(crate) fn register_format<S: RoffState>(vm: &mut VM<S>, name: Name) -> rl::Result<()> {
    let Some(register) = vm.registers.get(name) else {
        return Ok(());
    };
    let spec = register.format.spec();
    vm.push_text(&spec)
}

/// Interpolate an environment variable, `\Vx`.
pub(crate) fn environment_variable<S: RoffState>(vm: &mut VM<S>, name: Name) -> rl::Result<()> {
    match (vm.env_var)(vm.name_str(name)) {
        Some(value) => vm.push_external_text(&value),
        None => Ok(()),
    }
}
