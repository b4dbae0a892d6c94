//! The `while` loop and its `break` and `continue` requests

use crate::conditional;
use rofflang::command;
use rofflang::input::{Raw, Source};
use rofflang::node::Node;
use rofflang::parse;
use rofflang::prelude as rl;
use rofflang::roffmacro::{Invocation, Macro, MacroIterator};
use rofflang::token::{code, Name};
use rofflang::traits::*;
use rofflang::vm::VM;

pub const WHILE_DOC: &str = "Repeat the rest of the line while a condition holds";
pub const BREAK_DOC: &str = "Leave the innermost while loop";
pub const CONTINUE_DOC: &str = "Start the next iteration of the innermost while loop";

/// Get the `while` request.
pub fn get_while<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(while_fn).with_doc(WHILE_DOC)
}

/// Get the `break` request.
pub fn get_break<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(break_fn).with_doc(BREAK_DOC)
}

/// Get the `continue` request.
pub fn get_continue<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(continue_fn).with_doc(CONTINUE_DOC)
}

fn while_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    if vm.token().is_line_end() {
        return parse::skip_line(vm);
    }
    let Some(body) = read_body(vm)? else {
        vm.error("unbalanced brace escape sequences");
        return vm.next_token();
    };
    vm.interp_mut().loop_depth += 1;
    vm.add_boundary()?;
    let result = run_loop(vm, &body);
    vm.interp_mut().loop_depth -= 1;
    result?;
    vm.remove_boundary()?;
    vm.next_token()
}

/// Capture the condition and body of the loop.
///
/// The body starts with the token after the request name, stored as a node,
///     and runs to the first newline outside `\{ \}` braces.
/// Returns [None] if the braces are unbalanced.
fn read_body<S: RoffState>(vm: &mut VM<S>) -> rl::Result<Option<Macro>> {
    let mut body = Macro::with_location(vm.location());
    body.append_node(Node::from_token(vm.token().clone()));
    let mut level: i32 = 0;
    let mut escaped = false;
    loop {
        let c = match vm.get_raw() {
            None => break,
            Some(Raw::Node(node)) => {
                escaped = false;
                body.append_node(node);
                continue;
            }
            Some(Raw::Byte(c)) | Some(Raw::Invalid(c)) => c,
        };
        if escaped {
            match c {
                b'{' => level += 1,
                b'}' => level -= 1,
                _ => {}
            }
            escaped = false;
            body.append_byte(c);
            continue;
        }
        match c {
            code::ESCAPE_LEFT_BRACE => level += 1,
            code::ESCAPE_RIGHT_BRACE => level -= 1,
            c if Some(c) == vm.interp().escape_char() => escaped = true,
            _ => {}
        }
        body.append_byte(c);
        if c == b'\n' && level <= 0 {
            break;
        }
    }
    Ok(if level == 0 { Some(body) } else { None })
}

fn run_loop<S: RoffState>(vm: &mut VM<S>, body: &Macro) -> rl::Result<()> {
    loop {
        vm.push_input(Source::Macro(MacroIterator::new_string(
            None,
            body,
            Invocation::WhileBody,
        )))?;
        vm.next_token()?;
        if !conditional::if_request(vm)? {
            drain(vm);
            return Ok(());
        }
        vm.process_input_stack()?;
        let interp = vm.interp_mut();
        if interp.loop_break || interp.exiting {
            interp.loop_break = false;
            return Ok(());
        }
        if vm.input_stack().is_return_boundary() {
            return Ok(());
        }
    }
}

/// Discard the rest of the input up to the innermost boundary.
fn drain<S: RoffState>(vm: &mut VM<S>) {
    while vm.get_raw().is_some() {}
}

fn break_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    leave_iteration(vm, true)
}

fn continue_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    leave_iteration(vm, false)
}

fn leave_iteration<S: RoffState>(vm: &mut VM<S>, break_loop: bool) -> rl::Result<()> {
    if vm.interp().loop_depth == 0 {
        vm.error("no while loop");
        return parse::skip_line(vm);
    }
    if break_loop {
        vm.interp_mut().loop_break = true;
    }
    drain(vm);
    vm.next_token()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditional;
    use crate::def;
    use crate::invocation;
    use crate::registers;
    use rofflang_testing::*;
    use std::collections::HashMap;

    fn built_ins() -> HashMap<&'static str, command::BuiltIn<State>> {
        HashMap::from([
            ("while", get_while()),
            ("break", get_break()),
            ("continue", get_continue()),
            ("if", conditional::get_if()),
            ("nr", registers::get_nr()),
            ("de", def::get_de()),
            ("return", invocation::get_return()),
        ])
    }

    test_suite![
        output_equality_tests(
            (
                count_to_three,
                ".nr i 0 1\n.while \\n[i]<3 \\{\\\n\\n+[i]\n.\\}\n",
                "1\n2\n3\n"
            ),
            (
                single_line_body,
                ".nr i 0\n.while \\n[i]<2 .nr i +1\n\\n[i]\n",
                "2\n"
            ),
            (false_condition, ".while 0 x\ny\n", "y\n"),
            (
                break_and_continue,
                concat!(
                    ".nr i 0 1\n",
                    ".while \\n+[i]<5 \\{\\\n",
                    ".if \\n[i]=2 .continue\n",
                    ".if \\n[i]=4 .break\n",
                    "\\n[i]\n",
                    ".\\}\n",
                    "done\n",
                ),
                "1\n3\ndone\n"
            ),
            (
                nested_loops,
                concat!(
                    ".nr i 0 1\n",
                    ".while \\n+[i]<3 \\{\\\n",
                    ".nr j 0 1\n",
                    ".while \\n+[j]<3 \\{\\\n",
                    "\\n[i]\\n[j]\n",
                    ".\\}\n",
                    ".\\}\n",
                ),
                "11\n12\n21\n22\n"
            ),
            (
                break_leaves_inner_loop_only,
                concat!(
                    ".nr i 0 1\n",
                    ".while \\n+[i]<3 \\{\\\n",
                    ".while 1 .break\n",
                    "\\n[i]\n",
                    ".\\}\n",
                ),
                "1\n2\n"
            ),
            (
                break_from_macro,
                concat!(
                    ".de stop\n",
                    ".break\n",
                    "..\n",
                    ".nr i 0 1\n",
                    ".while 1 \\{\\\n",
                    "\\n+[i]\n",
                    ".if \\n[i]=2 .stop\n",
                    ".\\}\n",
                    "end\n",
                ),
                "1\n2\nend\n"
            ),
            (
                return_leaves_loop_and_macro,
                concat!(
                    ".de m\n",
                    ".nr i 0 1\n",
                    ".while 1 \\{\\\n",
                    "\\\\n+[i]\n",
                    ".if \\\\n[i]=2 .return\n",
                    ".\\}\n",
                    "not reached\n",
                    "..\n",
                    ".m\n",
                    "after\n",
                ),
                "1\n2\nafter\n"
            ),
        ),
        diagnostic_tests(
            (break_outside_loop, ".break\nx\n", 0, 1),
            (continue_outside_loop, ".continue\n", 0, 1),
            (unbalanced_braces, ".while 0 \\{\\{ x\n", 0, 1),
        ),
    ];
}
