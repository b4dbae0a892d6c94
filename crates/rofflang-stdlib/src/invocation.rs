//! Requests that control macro invocation and inspect the interpreter
//!
//! This covers leaving macros early (`return`), the argument list (`shift`),
//!     running a request in groff mode (`do`), the input stack limit (`slimit`)
//!     and the debugging requests `backtrace` and `pm`.

use rofflang::command::{self, Command};
use rofflang::error::Warning;
use rofflang::input::Source;
use rofflang::parse;
use rofflang::prelude as rl;
use rofflang::roffmacro::{Invocation, MacroIterator};
use rofflang::token::Name;
use rofflang::traits::*;
use rofflang::vm::VM;

pub const RETURN_DOC: &str = "Leave the current macro; with an argument, leave its caller too";
pub const SHIFT_DOC: &str = "Shift the arguments of the current macro";
pub const DO_DOC: &str = "Run a request or macro with compatibility mode off";
pub const SLIMIT_DOC: &str = "Set the maximum depth of the input stack; zero or less means no limit";
pub const BACKTRACE_DOC: &str = "Write the input stack to the terminal";
pub const PM_DOC: &str = "Write the names and sizes of all macros to the terminal";

/// Get the `return` request.
pub fn get_return<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(return_fn).with_doc(RETURN_DOC)
}

/// Get the `shift` request.
pub fn get_shift<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(shift_fn).with_doc(SHIFT_DOC)
}

/// Get the `do` request.
pub fn get_do<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(do_fn).with_doc(DO_DOC)
}

/// Get the `slimit` request.
pub fn get_slimit<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(slimit_fn).with_doc(SLIMIT_DOC)
}

/// Get the `backtrace` request.
pub fn get_backtrace<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(backtrace_fn).with_doc(BACKTRACE_DOC)
}

/// Get the `pm` request.
pub fn get_pm<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(pm_fn).with_doc(PM_DOC)
}

fn return_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    let twice = parse::has_arg(vm)?;
    vm.input_stack_mut().pop_macro();
    if twice {
        vm.input_stack_mut().pop_macro();
    }
    vm.next_token()
}

fn shift_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    let n = if parse::has_arg(vm)? {
        parse::get_integer(vm)?.unwrap_or(1)
    } else {
        1
    };
    if n < 0 {
        vm.warning(Warning::Range, "negative argument to shift");
    } else {
        vm.input_stack_mut().shift(n as usize);
    }
    parse::skip_line(vm)
}

fn do_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    vm.interp_mut().push_compatible(false);
    let result = do_invoke(vm);
    if result.is_err() {
        vm.interp_mut().pop_compatible();
    }
    result
}

/// Find and invoke the command named by `do`.
///
/// Compatibility mode is restored before the body of a macro is read,
///     but only after a request has finished.
fn do_invoke<S: RoffState>(vm: &mut VM<S>) -> rl::Result<()> {
    let Some(name) = parse::get_name(vm)? else {
        vm.interp_mut().pop_compatible();
        return parse::skip_line(vm);
    };
    match vm.commands.get(name) {
        Some(Command::Macro(m)) => {
            let m = m.borrow().clone();
            let args = parse::decode_args(vm)?;
            let iter = MacroIterator::new_macro(name, &m, args, true, Invocation::Macro);
            vm.push_input(Source::Macro(iter))?;
            vm.interp_mut().pop_compatible();
            vm.next_token()
        }
        _ => {
            vm.interpolate_macro(name, true)?;
            vm.interp_mut().pop_compatible();
            Ok(())
        }
    }
}

fn slimit_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    parse::skip_spaces(vm)?;
    if let Some(n) = parse::get_integer(vm)? {
        vm.input_stack_mut().set_limit(n.max(0) as usize);
    }
    parse::skip_line(vm)
}

fn backtrace_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    let frames = vm.backtrace();
    {
        let mut out = vm.terminal_out.borrow_mut();
        for frame in frames {
            _ = writeln!(out, "{frame}");
        }
    }
    parse::skip_line(vm)
}

fn pm_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    let total_only = parse::has_arg(vm)?;
    let mut sizes: Vec<(String, usize)> = vm
        .commands
        .iter()
        .filter_map(|(name, cmd)| match cmd {
            Command::Macro(m) => Some((vm.name_str(name).to_string(), m.borrow().len())),
            Command::Request(_) => None,
        })
        .collect();
    sizes.sort();
    let total: usize = sizes.iter().map(|(_, len)| len).sum();
    {
        let mut out = vm.terminal_out.borrow_mut();
        if !total_only {
            for (name, len) in &sizes {
                _ = writeln!(out, "{name}\t{len}");
            }
        }
        _ = writeln!(out, "total\t{total}");
    }
    parse::skip_line(vm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::def;
    use crate::io;
    use crate::loops;
    use crate::registers;
    use crate::strings;
    use rofflang_testing::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    fn built_ins() -> HashMap<&'static str, command::BuiltIn<State>> {
        HashMap::from([
            ("return", get_return()),
            ("shift", get_shift()),
            ("do", get_do()),
            ("slimit", get_slimit()),
            ("backtrace", get_backtrace()),
            ("pm", get_pm()),
            ("de", def::get_de()),
            ("ds", strings::get_ds()),
            ("nr", registers::get_nr()),
            ("tm", io::get_tm()),
            ("while", loops::get_while()),
            ("if", crate::conditional::get_if()),
        ])
    }

    test_suite![
        output_equality_tests(
            (
                return_from_macro,
                ".de m\na\n.return\nb\n..\n.m\nc\n",
                "a\nc\n"
            ),
            (
                return_from_nested_macro,
                ".de inner\ni\n.return\nnot\n..\n.de outer\n.inner\no\n..\n.outer\n",
                "i\no\n"
            ),
            (
                return_with_argument_leaves_caller,
                ".de inner\ni\n.return 1\nnot\n..\n.de outer\n.inner\nnot\n..\n.outer\nafter\n",
                "i\nafter\n"
            ),
            (
                return_from_loop_in_macro,
                ".de m\n.nr i 0 1\n.while 1 \\{\\\n\\\\n+[i]\n.if \\\\n[i]=3 .return\n.\\}\n..\n.m\nx\n",
                "1\n2\n3\nx\n"
            ),
            (
                shift_one,
                ".de m\n.shift\n\\\\$1\n..\n.m a b c\n",
                "b\n"
            ),
            (
                shift_many,
                ".de m\n.shift 2\n\\\\$1 \\\\n[.$]\n..\n.m a b c\n",
                "c 1\n"
            ),
            (
                shift_past_end,
                ".de m\n.shift 5\n[\\\\$1]\\\\n[.$]\n..\n.m a b c\n",
                "[]0\n"
            ),
            (
                stack_limit,
                ".slimit 0\n.nr i 0 1\n.de r\n.if \\\\n+[i]<50 .r\n..\n.r\n\\n[i]\n",
                "50\n"
            ),
        ),
        terminal_output_tests(
            (
                print_macros,
                ".de m\nab\n..\n.ds x abc\n.pm\n",
                "m\t3\nx\t3\ntotal\t6\n"
            ),
            (print_macros_total, ".de m\nab\n..\n.pm t\n", "total\t3\n"),
            (
                backtrace_in_file,
                ".backtrace\n",
                "file 'testing.roff' at testing.roff:1\n"
            ),
        ),
        diagnostic_tests(
            (shift_negative, ".de m\n.shift -1\n..\n.m\n", 1, 0),
            (do_undefined, ".do undefined\n", 1, 0),
        ),
        failure_tests((
            stack_limit_exceeded,
            ".slimit 5\n.de r\n.r\n..\n.r\n"
        ),),
    ];

    test_suite![
        options(
            TestOption::BuiltIns(built_ins),
            TestOption::Compatible(true),
        ),
        output_equality_tests(
            (
                do_macro_body_runs_in_compatibility_mode,
                ".do de mac\nbody \\\\n(.C\n..\n.do mac\n",
                "body 1\n"
            ),
            (
                do_long_request_name,
                ".do nr abc 5\n.do ds s \\n[abc]\n\\*s\n",
                "5\n"
            ),
        ),
        terminal_output_tests((
            do_request_runs_in_groff_mode,
            ".do ds xyz abc\n.do tm \\*[xyz] \\n[.C]\n",
            "abc 0\n"
        ),),
    ];

    #[test]
    fn backtrace_in_macro() {
        let mut vm = VM::<State>::new(built_ins());
        let terminal = Rc::new(RefCell::new(Vec::<u8>::new()));
        vm.terminal_out = terminal.clone();
        vm.push_source("doc.roff", ".de m\n.backtrace\n..\n.m\n")
            .unwrap();
        vm.run().unwrap();
        let got = String::from_utf8(terminal.borrow().clone()).unwrap();
        let lines: Vec<&str> = got.lines().collect();
        assert_eq!(lines.len(), 2, "{got}");
        assert!(lines[0].starts_with("macro 'm'"), "{got}");
        assert_eq!(lines[1], "file 'doc.roff' at doc.roff:4");
    }
}
