//! Conditional requests (`if`, `ie`, `el`, `nop`)
//!
//! The condition grammar and the helpers that take or skip the conditional input
//!     are public because the `while` request shares them.

use rofflang::command;
use rofflang::error::Warning;
use rofflang::input::Raw;
use rofflang::parse::{self, delimiter::Rules, EscapeCategory, Scale};
use rofflang::prelude as rl;
use rofflang::token::{code, Name, Token};
use rofflang::traits::*;
use rofflang::vm::VM;

pub const IF_DOC: &str = "Process the rest of the line if a condition holds";
pub const IE_DOC: &str = "Like `if`, and remember the result for the matching `el`";
pub const EL_DOC: &str = "Process the rest of the line if the matching `ie` condition failed";
pub const NOP_DOC: &str = "Process the rest of the line as ordinary input";

/// Get the `if` request.
pub fn get_if<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(if_fn).with_doc(IF_DOC)
}

/// Get the `ie` request.
pub fn get_ie<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(ie_fn).with_doc(IE_DOC)
}

/// Get the `el` request.
pub fn get_el<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(el_fn).with_doc(EL_DOC)
}

/// Get the `nop` request.
pub fn get_nop<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(nop_fn).with_doc(NOP_DOC)
}

fn if_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    if_request(vm)?;
    Ok(())
}

fn ie_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    let result = if_request(vm)?;
    vm.interp_mut().if_else_stack.push(result);
    Ok(())
}

fn el_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    match vm.interp_mut().if_else_stack.pop() {
        None => {
            vm.warning(Warning::El, "unbalanced 'el' request");
            skip_alternative(vm)
        }
        Some(true) => skip_alternative(vm),
        Some(false) => begin_alternative(vm),
    }
}

fn nop_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    parse::skip_spaces(vm)
}

/// Evaluate a condition and then take or skip the rest of the conditional input.
///
/// Returns the value of the condition.
pub fn if_request<S: RoffState>(vm: &mut VM<S>) -> rl::Result<bool> {
    match evaluate_condition(vm)? {
        Some(true) => {
            begin_alternative(vm)?;
            Ok(true)
        }
        Some(false) | None => {
            skip_alternative(vm)?;
            Ok(false)
        }
    }
}

/// Read and evaluate a condition.
///
/// The conditions are:
///
/// - `!c`: the negation of the condition `c`.
/// - `t`, `n`: whether the formatter is troff or nroff.
/// - `o`, `e`: whether the current page number is odd or even.
/// - `v`: always false.
/// - `d name`, `r name`: whether a request, macro or string, or a register, is defined.
/// - `c glyph`: whether a glyph exists. Only ordinary characters exist.
/// - `m color`, `F font`, `S style`: only the `default` colour exists.
/// - `'abc'def'`: whether the two delimited inputs produce the same output.
/// - a number expression: true if positive.
///
/// Returns [None] if the condition is malformed.
/// In this case a diagnostic has been reported and the conditional input must be skipped
///     regardless of any negation.
pub fn evaluate_condition<S: RoffState>(vm: &mut VM<S>) -> rl::Result<Option<bool>> {
    parse::skip_spaces(vm)?;
    let mut invert = false;
    while vm.token().ch() == Some(b'!') {
        vm.next_token()?;
        invert = !invert;
    }
    let result = match vm.token().clone() {
        Token::Char(c @ (b't' | b'n' | b'o' | b'e' | b'v')) => {
            vm.next_token()?;
            match c {
                b't' => !vm.state.nroff_mode(),
                b'n' => vm.state.nroff_mode(),
                b'o' => vm.state.page_number() % 2 != 0,
                b'e' => vm.state.page_number() % 2 == 0,
                _ => false,
            }
        }
        Token::Char(c @ (b'd' | b'r')) => {
            vm.next_token()?;
            let Some(name) = parse::get_required_name(vm)? else {
                return Ok(None);
            };
            if c == b'd' {
                vm.commands.contains(name)
            } else {
                vm.registers.is_defined(name)
            }
        }
        Token::Char(b'm' | b'F' | b'S') => {
            vm.next_token()?;
            let Some(name) = parse::get_long_name(vm, true)? else {
                return Ok(None);
            };
            vm.name_str(name) == "default"
        }
        Token::Char(b'c') => {
            vm.next_token()?;
            parse::skip_spaces(vm)?;
            // Without a glyph table only ordinary characters are known to exist.
            let exists = match vm.token() {
                Token::Char(_) => true,
                Token::Special(_) | Token::Indexed(_) => false,
                _ => {
                    vm.error("missing or invalid character in 'c' condition");
                    return Ok(None);
                }
            };
            vm.next_token()?;
            exists
        }
        Token::Space => false,
        token if Rules::get(EscapeCategory::NumericExpression, vm.interp().compatible)
            .accepts(&token) =>
        {
            match compare_output(vm, token)? {
                None => return Ok(None),
                Some(equal) => equal,
            }
        }
        _ => match parse::get_number(vm, Scale::BASIC)? {
            None => return Ok(None),
            Some(n) => n > 0,
        },
    };
    Ok(Some(result != invert))
}

/// Compare the output of the two inputs in `'abc'def'`.
///
/// The current token is the opening delimiter.
/// The closing delimiters must be at the same input level as the opening one,
///     except in compatibility mode.
fn compare_output<S: RoffState>(vm: &mut VM<S>, delimiter: Token) -> rl::Result<Option<bool>> {
    let level = vm.input_stack().level();
    let compatible = vm.interp().compatible;
    let mut parts: [Vec<Token>; 2] = Default::default();
    for part in &mut parts {
        loop {
            vm.next_token()?;
            if vm.token().is_line_end() {
                vm.warning(Warning::Delim, "missing closing delimiter");
                return Ok(None);
            }
            if *vm.token() == delimiter && (compatible || vm.input_stack().level() == level) {
                break;
            }
            if !matches!(vm.token(), Token::Empty | Token::Dummy) {
                part.push(vm.token().clone());
            }
        }
    }
    vm.next_token()?;
    let [first, second] = parts;
    Ok(Some(first == second))
}

/// Start processing the conditional input.
///
/// Spaces and `\{` are skipped; the rest is left to the run loop.
/// An empty conditional input is consumed so that it is not taken as a blank line.
pub fn begin_alternative<S: RoffState>(vm: &mut VM<S>) -> rl::Result<()> {
    while matches!(vm.token(), Token::Space | Token::LeftBrace) {
        vm.next_token()?;
    }
    if vm.token().is_newline() {
        vm.next_token()?;
    }
    Ok(())
}

/// Skip the conditional input.
///
/// The input is read raw up to the first newline outside `\{ \}` braces.
/// Comments are skipped so that braces inside them are not counted.
/// The nesting level can become negative, as in `.if 0 \{\` followed by `.\}\}`;
///     this is not an error.
pub fn skip_alternative<S: RoffState>(vm: &mut VM<S>) -> rl::Result<()> {
    if vm.token().is_line_end() {
        return parse::skip_line(vm);
    }
    let mut level: i32 = if *vm.token() == Token::LeftBrace { 1 } else { 0 };
    loop {
        let c = match vm.get_raw() {
            None => break,
            Some(Raw::Node(_)) => continue,
            Some(Raw::Byte(c)) | Some(Raw::Invalid(c)) => c,
        };
        let mut line_ended = c == b'\n';
        match c {
            code::ESCAPE_LEFT_BRACE => level += 1,
            code::ESCAPE_RIGHT_BRACE => level -= 1,
            c if Some(c) == vm.interp().escape_char() => match vm.get_raw() {
                Some(Raw::Byte(b'{')) => level += 1,
                Some(Raw::Byte(b'}')) => level -= 1,
                Some(Raw::Byte(b'"')) => loop {
                    match vm.get_raw() {
                        None => break,
                        Some(Raw::Byte(b'\n')) => {
                            line_ended = true;
                            break;
                        }
                        Some(_) => {}
                    }
                },
                _ => {}
            },
            _ => {}
        }
        if line_ended && level <= 0 {
            break;
        }
    }
    vm.next_token()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers;
    use crate::strings;
    use rofflang_testing::*;
    use std::collections::HashMap;

    fn built_ins() -> HashMap<&'static str, command::BuiltIn<State>> {
        HashMap::from([
            ("if", get_if()),
            ("ie", get_ie()),
            ("el", get_el()),
            ("nop", get_nop()),
            ("ds", strings::get_ds()),
            ("nr", registers::get_nr()),
        ])
    }

    test_suite![
        output_equality_tests(
            (if_true, ".if 1 yes\n", "yes\n"),
            (if_false, ".if 0 no\nafter\n", "after\n"),
            (if_negative_is_false, ".if -3 no\n", ""),
            (if_expression, ".if 2>1 yes\n", "yes\n"),
            (if_register, ".nr a 1\n.if \\n[a] yes\n", "yes\n"),
            (if_not, ".if !0 yes\n", "yes\n"),
            (if_double_not, ".if !!1 yes\n", "yes\n"),
            (if_troff, ".if t yes\n.if n no\n", "yes\n"),
            (if_page_parity, ".if o odd\n.if e even\n", "odd\n"),
            (if_vroff, ".if v no\n", ""),
            (if_defined, ".ds s x\n.if d s yes\n.if d t no\n", "yes\n"),
            (if_request_defined, ".if d if yes\n", "yes\n"),
            (if_register_defined, ".nr a 0\n.if r a yes\n.if r b no\n", "yes\n"),
            (if_builtin_register_defined, ".if r .slimit yes\n", "yes\n"),
            (if_character_exists, ".if c a yes\n", "yes\n"),
            (if_special_character_missing, ".if c \\[foo] no\n", ""),
            (if_indexed_character_missing, ".if c \\N'65' no\n.if !c \\(bu yes\n", "yes\n"),
            (if_default_font, ".if F default yes\n.if S italic no\n", "yes\n"),
            (if_default_color, ".if m default yes\n.if m red no\n", "yes\n"),
            (if_string_equal, ".if 'abc'abc' yes\n", "yes\n"),
            (if_string_not_equal, ".if 'abc'abd' no\n", ""),
            (if_string_equal_after_interpolation, ".ds s abc\n.if '\\*s'abc' yes\n", "yes\n"),
            (if_string_other_delimiter, ".if @a b@a b@ yes\n", "yes\n"),
            (if_string_not, ".if !'a'b' yes\n", "yes\n"),
            (if_request_body, ".if 1 .ds s x\n\\*s\n", "x\n"),
            (if_nested, ".if 1 .if 1 yes\n", "yes\n"),
            (if_nested_false, ".if 1 .if 0 no\nafter\n", "after\n"),
            (
                if_brace_block_true,
                ".if 1 \\{\\\na\nb\n.\\}\nc\n",
                "a\nb\nc\n"
            ),
            (
                if_brace_block_false,
                ".if 0 \\{\\\na\nb\n.\\}\nc\n",
                "c\n"
            ),
            (
                if_nested_brace_blocks_false,
                ".if 0 \\{\\\n.if 1 \\{\\\na\n.\\}\nb\n.\\}\nc\n",
                "c\n"
            ),
            (
                if_closing_braces_on_one_line,
                ".if 0 \\{\\\n.if 0 \\{\\\na\n.\\}\\}\nc\n",
                "c\n"
            ),
            (
                if_false_skips_brace_in_comment,
                ".if 0 a \\\" \\{\nb\n",
                "b\n"
            ),
            (if_false_skips_continuation, ".if 0 a\\\nb\nc\n", "c\n"),
            (if_empty_body, ".if 1\nx\n", "x\n"),
            (if_false_at_end_of_line, ".if 0\nx\n", "x\n"),
            (ie_true, ".ie 1 a\n.el b\n", "a\n"),
            (ie_false, ".ie 0 a\n.el b\n", "b\n"),
            (
                ie_nested,
                ".ie 1 \\{\\\n.ie 0 a\n.el b\n.\\}\n.el c\n",
                "b\n"
            ),
            (el_brace_block, ".ie 1 a\n.el \\{\\\nb\n.\\}\nc\n", "a\nc\n"),
            (nop, ".nop text\n", "text\n"),
        ),
        diagnostic_tests(
            (unbalanced_el, ".el x\n", 1, 0),
            (missing_closing_delimiter, ".if 'a'b\nx\n", 1, 0),
            (missing_condition_name, ".if d\n", 0, 1),
        ),
    ];

    #[test]
    fn condition_values() {
        let mut vm = VM::<State>::new(built_ins());
        vm.push_source("test", "!1 2<1 'x'x' r.C\n").unwrap();
        vm.next_token().unwrap();
        assert_eq!(evaluate_condition(&mut vm).unwrap(), Some(false));
        assert_eq!(evaluate_condition(&mut vm).unwrap(), Some(false));
        assert_eq!(evaluate_condition(&mut vm).unwrap(), Some(true));
        assert_eq!(evaluate_condition(&mut vm).unwrap(), Some(true));
    }
}
