//! Number register requests

use rofflang::command;
use rofflang::error::Warning;
use rofflang::parse::{self, Scale};
use rofflang::prelude as rl;
use rofflang::register::Format;
use rofflang::token::Name;
use rofflang::traits::*;
use rofflang::vm::VM;

pub const NR_DOC: &str = "Set a number register and optionally its auto-increment";
pub const RR_DOC: &str = "Remove number registers";
pub const RNN_DOC: &str = "Rename a number register";
pub const AF_DOC: &str = "Set the output format of a number register";

/// Get the `nr` request.
pub fn get_nr<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(nr_fn).with_doc(NR_DOC)
}

/// Get the `rr` request.
pub fn get_rr<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(rr_fn).with_doc(RR_DOC)
}

/// Get the `rnn` request.
pub fn get_rnn<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(rnn_fn).with_doc(RNN_DOC)
}

/// Get the `af` request.
pub fn get_af<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(af_fn).with_doc(AF_DOC)
}

fn nr_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    let Some(name) = parse::get_required_name(vm)? else {
        return parse::skip_line(vm);
    };
    if vm.registers.computed(name).is_some() {
        let s = vm.name_str(name).to_string();
        vm.error(format!("cannot write read-only register '{s}'"));
        return parse::skip_line(vm);
    }
    parse::skip_spaces(vm)?;
    let prev = vm.registers.value(name).unwrap_or(0);
    if let Some(value) = parse::get_number_relative(vm, Scale::BASIC, prev)? {
        tracing::trace!(name = vm.name_str(name), value, "set register");
        vm.registers.set_value(name, value);
        if vm.token().is_space() && parse::has_arg(vm)? {
            if let Some(increment) = parse::get_number(vm, Scale::BASIC)? {
                vm.registers.get_or_create(name).increment = increment;
            }
        }
    }
    parse::skip_line(vm)
}

fn rr_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    while let Some(name) = parse::get_name(vm)? {
        vm.registers.remove(name);
    }
    parse::skip_line(vm)
}

fn rnn_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    let Some(old) = parse::get_required_name(vm)? else {
        return parse::skip_line(vm);
    };
    if let Some(new) = parse::get_required_name(vm)? {
        if !vm.registers.rename(old, new) {
            let s = vm.name_str(old).to_string();
            vm.warning(Warning::Reg, format!("cannot rename undefined register '{s}'"));
        }
    }
    parse::skip_line(vm)
}

fn af_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    let Some(name) = parse::get_required_name(vm)? else {
        return parse::skip_line(vm);
    };
    parse::skip_spaces(vm)?;
    let mut spec = String::new();
    while let Some(c) = vm.token().ch() {
        spec.push(c as char);
        vm.next_token()?;
    }
    if spec.is_empty() {
        vm.warning(Warning::Missing, "missing register format");
        return parse::skip_line(vm);
    }
    match Format::parse(&spec) {
        None => vm.error(format!("bad register format '{spec}'")),
        Some(format) => vm.registers.get_or_create(name).format = format,
    }
    parse::skip_line(vm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rofflang_testing::*;
    use std::collections::HashMap;

    fn built_ins() -> HashMap<&'static str, command::BuiltIn<State>> {
        HashMap::from([
            ("nr", get_nr()),
            ("rr", get_rr()),
            ("rnn", get_rnn()),
            ("af", get_af()),
        ])
    }

    test_suite![
        output_equality_tests(
            (set, ".nr a 5\n\\n[a]\n", "5\n"),
            (expression, ".nr a 1+2*3\n\\na\n", "9\n"),
            (relative_add, ".nr a 5\n.nr a +3\n\\na\n", "8\n"),
            (relative_subtract, ".nr a 5\n.nr a -7\n\\na\n", "-2\n"),
            (relative_to_undefined, ".nr a +3\n\\na\n", "3\n"),
            (
                auto_increment,
                ".nr a 0 2\n\\n+a \\n+a \\n-a \\na\n",
                "2 4 2 2\n"
            ),
            (undefined_is_zero, "\\n[zz]\n", "0\n"),
            (remove, ".nr a 5\n.nr b 6\n.rr a b\n\\na\\nb\n", "00\n"),
            (rename, ".nr a 5\n.rnn a b\n\\na\\nb\n", "05\n"),
            (format_zero_padded, ".nr a 7\n.af a 001\n\\na\n", "007\n"),
            (format_roman, ".nr a 14\n.af a i\n\\na\n", "xiv\n"),
            (format_upper_roman, ".nr a 4\n.af a I\n\\na\n", "IV\n"),
            (format_alpha, ".nr a 28\n.af a a\n\\na\n", "ab\n"),
            (format_query, ".nr a 1\n.af a 01\n\\g[a]\n", "01\n"),
        ),
        diagnostic_tests(
            (read_only, ".nr .$ 3\n", 0, 1),
            (missing_value, ".nr a\n", 1, 0),
            (bad_format, ".af a x\n", 0, 1),
            (missing_format, ".af a\n", 1, 0),
            (rename_undefined, ".rnn a b\n", 1, 0),
        ),
    ];
}
