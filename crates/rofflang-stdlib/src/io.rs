//! Requests that read files or write to the terminal

use rofflang::command;
use rofflang::error::AbortError;
use rofflang::input::FileIterator;
use rofflang::parse;
use rofflang::prelude as rl;
use rofflang::roffmacro::Macro;
use rofflang::token::{code, Name};
use rofflang::traits::*;
use rofflang::vm::VM;

pub const SO_DOC: &str = "Read input from a file, then continue with the current input";
pub const NX_DOC: &str = "Stop reading the current file and continue with another one";
pub const LF_DOC: &str = "Change the line number and file name used in diagnostics";
pub const EX_DOC: &str = "Stop processing after running the end macro";
pub const AB_DOC: &str = "Write a message to the terminal and stop with a failure";
pub const TM_DOC: &str = "Write the rest of the line to the terminal";
pub const TM1_DOC: &str = "Like `tm`, but a leading double quote is removed";
pub const TMC_DOC: &str = "Like `tm1`, without a trailing newline";

/// Get the `so` request.
pub fn get_so<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(so_fn).with_doc(SO_DOC)
}

/// Get the `nx` request.
pub fn get_nx<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(nx_fn).with_doc(NX_DOC)
}

/// Get the `lf` request.
pub fn get_lf<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(lf_fn).with_doc(LF_DOC)
}

/// Get the `ex` request.
pub fn get_ex<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(ex_fn).with_doc(EX_DOC)
}

/// Get the `ab` request.
pub fn get_ab<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(ab_fn).with_doc(AB_DOC)
}

/// Get the `tm` request.
pub fn get_tm<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(tm_fn).with_doc(TM_DOC)
}

/// Get the `tm1` request.
pub fn get_tm1<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(tm1_fn).with_doc(TM1_DOC)
}

/// Get the `tmc` request.
pub fn get_tmc<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(tmc_fn).with_doc(TMC_DOC)
}

/// Read a file name argument and move to the end of the request line.
fn read_file_name<S: RoffState>(vm: &mut VM<S>, required: bool) -> rl::Result<Option<String>> {
    let name = parse::get_long_name(vm, required)?.map(|name| vm.name_str(name).to_string());
    while !vm.token().is_line_end() {
        vm.next_token()?;
    }
    Ok(name)
}

fn so_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    if let Some(path) = read_file_name(vm, true)? {
        match vm.read_file(&path) {
            Ok(contents) => vm.push_source(&path, contents)?,
            Err(err) => vm.error(format!("cannot open '{path}': {err}")),
        }
    }
    vm.next_token()
}

fn nx_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    match read_file_name(vm, false)? {
        None => vm.input_stack_mut().end_file(),
        Some(path) => match vm.read_file(&path) {
            Ok(contents) => {
                let file = FileIterator::new(&path, contents);
                if let Err(err) = vm.input_stack_mut().next_file(file) {
                    return Err(vm.fatal(err));
                }
            }
            Err(err) => vm.error(format!("cannot open '{path}': {err}")),
        },
    }
    vm.next_token()
}

fn lf_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    parse::skip_spaces(vm)?;
    let Some(line) = parse::get_integer(vm)? else {
        return parse::skip_line(vm);
    };
    let name = read_file_name(vm, false)?;
    // The line count advances when the next line is read.
    let line = (line.max(1) - 1) as usize;
    vm.input_stack_mut().set_location(name.as_deref(), line);
    vm.next_token()
}

fn ex_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    tracing::debug!("exit requested");
    vm.interp_mut().exiting = true;
    vm.input_stack_mut().clear();
    vm.next_token()
}

fn ab_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    let line = parse::read_rest_of_line(vm, true)?;
    let mut message = printable(&line);
    if message.is_empty() {
        message = "User Abort.".to_string();
    }
    Err(vm.fatal(AbortError { message }))
}

fn tm_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    write_to_terminal(vm, false, true)
}

fn tm1_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    write_to_terminal(vm, true, true)
}

fn tmc_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    write_to_terminal(vm, true, false)
}

fn write_to_terminal<S: RoffState>(
    vm: &mut VM<S>,
    strip_quote: bool,
    newline: bool,
) -> rl::Result<()> {
    let line = parse::read_rest_of_line(vm, strip_quote)?;
    let mut text = printable(&line);
    if newline {
        text.push('\n');
    }
    let mut out = vm.terminal_out.borrow_mut();
    _ = out.write_all(text.as_bytes());
    _ = out.flush();
    Ok(())
}

/// The text of a line read in copy mode, with control codes written as escape sequences.
///
/// Nodes are dropped.
pub fn printable(m: &Macro) -> String {
    let mut bytes = Vec::with_capacity(m.len());
    for &b in m.bytes() {
        if b == 0 {
            continue;
        }
        match code::asciify(b) {
            Some(s) => bytes.extend_from_slice(s.as_bytes()),
            None => bytes.push(b),
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditional;
    use crate::def;
    use crate::loops;
    use crate::registers;
    use crate::testing::InMemoryFileSystem;
    use crate::traps;
    use rofflang_testing::*;
    use std::collections::HashMap;

    fn built_ins() -> HashMap<&'static str, command::BuiltIn<State>> {
        HashMap::from([
            ("so", get_so()),
            ("nx", get_nx()),
            ("lf", get_lf()),
            ("ex", get_ex()),
            ("ab", get_ab()),
            ("tm", get_tm()),
            ("tm1", get_tm1()),
            ("tmc", get_tmc()),
            ("de", def::get_de()),
            ("if", conditional::get_if()),
            ("em", traps::get_em()),
            ("nr", registers::get_nr()),
            ("while", loops::get_while()),
        ])
    }

    fn custom_vm_initialization(vm: &mut VM<State>) {
        let mut file_system = InMemoryFileSystem::new(vm.working_directory.clone().unwrap_or_default());
        file_system.add_string_file("file1.roff", "content1\n");
        file_system.add_string_file("macros.roff", ".de m\nfrom macro\n..\n");
        file_system.add_string_file("nested.roff", "a\n.so file1.roff\nb\n");
        file_system.add_string_file("location.roff", "\\n[.F]:\\n[.c]\n");
        vm.file_system = Box::new(file_system);
    }

    test_suite![
        options(
            TestOption::BuiltIns(built_ins),
            TestOption::CustomVMInitialization(custom_vm_initialization),
        ),
        output_equality_tests(
            (source, "before\n.so file1.roff\nafter\n", "before\ncontent1\nafter\n"),
            (source_macros, ".so macros.roff\n.m\n", "from macro\n"),
            (source_nested, ".so nested.roff\nc\n", "a\ncontent1\nb\nc\n"),
            (source_location, ".so location.roff\n", "location.roff:1\n"),
            (next_file, "a\n.nx file1.roff\nnot read\n", "a\ncontent1\n"),
            (next_file_without_name, "a\n.nx\nnot read\n", "a\n"),
            (line_number, ".lf 10\n\\n[.c]\n", "10\n"),
            (
                line_number_and_file,
                ".lf 20 other.roff\n\\n[.F]:\\n[.c]\n",
                "other.roff:20\n"
            ),
            (exit, "a\n.ex\nb\n", "a\n"),
            (
                exit_runs_end_macro,
                ".de E\nend\n..\n.em E\na\n.ex\nb\n",
                "a\nend\n"
            ),
            (
                exit_from_loop,
                ".nr i 0 1\n.while 1 \\{\\\n\\n+[i]\n.if \\n[i]=2 .ex\n.\\}\nb\n",
                "1\n2\n"
            ),
            (tm_does_not_output, ".tm message\nafter\n", "after\n"),
        ),
        terminal_output_tests(
            (tm, ".tm hello world\n", "hello world\n"),
            (tm_leading_spaces, ".tm    x\n", "x\n"),
            (tm_keeps_quote, ".tm \"quoted\n", "\"quoted\n"),
            (tm1_strips_quote, ".tm1 \"  quoted\n", "  quoted\n"),
            (tmc_no_newline, ".tmc a\n.tmc b\n", "ab"),
            (tm_interpolates, ".nr a 3\n.tm a is \\n[a]\n", "a is 3\n"),
            (tm_control_codes, ".tm a\\-b\\&c\n", "a\\-b\\&c\n"),
        ),
        diagnostic_tests(
            (source_missing_file, ".so missing.roff\nafter\n", 0, 1),
            (source_missing_name, ".so\n", 0, 1),
            (next_file_missing, ".nx missing.roff\n", 0, 1),
        ),
        failure_tests(
            (abort, ".ab\n"),
            (abort_with_message, ".ab stopping here\nnot reached\n"),
        ),
    ];
}
