//! Requests that set traps
//!
//! A trap names a macro that the run loop springs when some input event happens:
//!     the end of input (`em`), a blank line (`blm`), a line that starts with spaces (`lsm`)
//!     or a number of text lines having been read (`it` and `itc`).
//! Traps sprung while a request is running are postponed until the request finishes.

use rofflang::command;
use rofflang::error::Warning;
use rofflang::parse;
use rofflang::prelude as rl;
use rofflang::token::Name;
use rofflang::traits::*;
use rofflang::vm::{InputTrap, VM};

pub const EM_DOC: &str = "Set the macro run at the end of input";
pub const BLM_DOC: &str = "Set the macro run instead of outputting a blank line";
pub const LSM_DOC: &str = "Set the macro run for lines that begin with spaces";
pub const IT_DOC: &str = "Run a macro after the given number of text lines";
pub const ITC_DOC: &str = "Like `it`, but lines ended with `\\c` are not counted";

/// Get the `em` request.
pub fn get_em<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(em_fn).with_doc(EM_DOC)
}

/// Get the `blm` request.
pub fn get_blm<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(blm_fn).with_doc(BLM_DOC)
}

/// Get the `lsm` request.
pub fn get_lsm<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(lsm_fn).with_doc(LSM_DOC)
}

/// Get the `it` request.
pub fn get_it<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(it_fn).with_doc(IT_DOC)
}

/// Get the `itc` request.
pub fn get_itc<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(itc_fn).with_doc(ITC_DOC)
}

fn em_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    vm.interp_mut().end_macro = parse::get_name(vm)?;
    parse::skip_line(vm)
}

fn blm_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    vm.interp_mut().blank_line_macro = parse::get_name(vm)?;
    parse::skip_line(vm)
}

fn lsm_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    vm.interp_mut().leading_space_macro = parse::get_name(vm)?;
    parse::skip_line(vm)
}

fn it_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    set_input_trap(vm, false)
}

fn itc_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    set_input_trap(vm, true)
}

/// Any earlier input trap is removed, so `it` without arguments clears the trap.
fn set_input_trap<S: RoffState>(vm: &mut VM<S>, continued: bool) -> rl::Result<()> {
    vm.interp_mut().input_trap = None;
    if !parse::has_arg(vm)? {
        return parse::skip_line(vm);
    }
    let Some(lines) = parse::get_integer(vm)? else {
        return parse::skip_line(vm);
    };
    if lines <= 0 {
        vm.warning(
            Warning::Range,
            format!("number of lines for input trap must be greater than zero, got {lines}"),
        );
        return parse::skip_line(vm);
    }
    if let Some(macro_name) = parse::get_name(vm)? {
        tracing::debug!(lines, continued, "set input trap");
        vm.interp_mut().input_trap = Some(InputTrap {
            lines,
            macro_name,
            continued,
        });
    }
    parse::skip_line(vm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::def;
    use crate::registers;
    use rofflang_testing::*;
    use std::collections::HashMap;

    fn built_ins() -> HashMap<&'static str, command::BuiltIn<State>> {
        HashMap::from([
            ("em", get_em()),
            ("blm", get_blm()),
            ("lsm", get_lsm()),
            ("it", get_it()),
            ("itc", get_itc()),
            ("de", def::get_de()),
            ("nr", registers::get_nr()),
        ])
    }

    test_suite![
        output_equality_tests(
            (end_macro, ".de E\nend\n..\n.em E\na\n", "a\nend\n"),
            (end_macro_cleared, ".de E\nend\n..\n.em E\n.em\na\n", "a\n"),
            (
                end_macro_runs_once,
                ".de E\nend\n.em E\n..\n.em E\na\n",
                "a\nend\n"
            ),
            (
                blank_line_macro,
                ".de B\nblank\n..\n.blm B\na\n\nb\n",
                "a\nblank\nb\n"
            ),
            (
                blank_line_macro_cleared,
                ".de B\nblank\n..\n.blm B\n.blm\na\n\nb\n",
                "a\n\nb\n"
            ),
            (
                leading_space_macro,
                ".de L\n[\\\\n[lsn]]\n..\n.lsm L\n  x\n",
                "[2]\nx\n"
            ),
            (
                input_trap,
                ".de T\ntrap\n..\n.it 2 T\na\nb\nc\n",
                "a\nb\ntrap\nc\n"
            ),
            (
                input_trap_counts_only_text_lines,
                ".de T\ntrap\n..\n.it 1 T\n.nr x 1\na\nb\n",
                "a\ntrap\nb\n"
            ),
            (
                input_trap_cleared,
                ".de T\ntrap\n..\n.it 1 T\n.it\na\nb\n",
                "a\nb\n"
            ),
            (
                input_trap_continued_lines,
                ".de T\ntrap\n..\n.itc 1 T\na\\c\nb\nc\n",
                "ab\ntrap\nc\n"
            ),
        ),
        diagnostic_tests(
            (input_trap_zero_lines, ".de T\n..\n.it 0 T\n", 1, 0),
            (end_macro_undefined, ".em X\na\n", 1, 0),
        ),
    ];
}
