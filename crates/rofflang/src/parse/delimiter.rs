//! Delimited escape arguments.
//!
//! Escapes like `\h'1m'`, `\w'text'` and `\C'name'` take an argument between two copies of a
//!     delimiter token.
//! Which tokens may be used as the delimiter depends on the kind of argument,
//!     and whether the closing delimiter must come from the same input level as the
//!     opening one depends on compatibility mode.
//! Both are captured in the [Rules] table.

use super::number;
use super::number::Scale;
use crate::error::Warning;
use crate::input::Raw;
use crate::prelude as rl;
use crate::token::{Name, Token};
use crate::vm::{RoffState, VM};

/// The kind of argument a delimited escape takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscapeCategory {
    /// `\h`, `\v`, `\N`, `\R` and other escapes whose argument is a number expression.
    NumericExpression,
    /// `\w`, `\o`, `\X` and other escapes whose argument is formatted text.
    Text,
    /// `\C` and other escapes whose argument is a name.
    Identifier,
}

/// Delimiter rules for one kind of escape argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rules {
    /// Characters that cannot be delimiters because they could be part of the argument.
    pub forbidden: &'static [u8],
    /// Whether the closing delimiter must be read at the input level of the opening one.
    pub level_sensitive: bool,
}

const NUMERIC_FORBIDDEN: &[u8] = b"0123456789+-/*%<>=&:().|";

/// Rules indexed by category, in normal mode.
pub const NORMAL: [Rules; 3] = [
    Rules {
        forbidden: NUMERIC_FORBIDDEN,
        level_sensitive: true,
    },
    Rules {
        forbidden: b"",
        level_sensitive: true,
    },
    Rules {
        forbidden: b"",
        level_sensitive: true,
    },
];

/// Rules indexed by category, in compatibility mode.
pub const COMPATIBLE: [Rules; 3] = [
    Rules {
        forbidden: NUMERIC_FORBIDDEN,
        level_sensitive: false,
    },
    Rules {
        forbidden: b"",
        level_sensitive: false,
    },
    Rules {
        forbidden: b"",
        level_sensitive: false,
    },
];

impl Rules {
    pub fn get(category: EscapeCategory, compatible: bool) -> &'static Rules {
        let table = if compatible { &COMPATIBLE } else { &NORMAL };
        &table[category as usize]
    }

    /// Whether the token may open a delimited argument.
    pub fn accepts(&self, token: &Token) -> bool {
        match token {
            Token::Char(c) => !self.forbidden.contains(c),
            Token::Node(_)
            | Token::Space
            | Token::StretchableSpace
            | Token::UnstretchableSpace
            | Token::Tab
            | Token::Newline
            | Token::Eof => false,
            _ => true,
        }
    }
}

/// An opening delimiter that has been read and accepted.
struct Opening {
    token: Token,
    level: usize,
    level_sensitive: bool,
}

impl Opening {
    fn closes<S: RoffState>(&self, vm: &VM<S>, closing: &Token) -> bool {
        self.matches(closing) && (!self.level_sensitive || vm.input_stack().level() == self.level)
    }

    fn matches(&self, closing: &Token) -> bool {
        closing == &self.token
    }
}

/// Read and check the opening delimiter.
///
/// On failure a diagnostic has been reported and [None] is returned.
fn read_opening<S: RoffState>(
    vm: &mut VM<S>,
    category: EscapeCategory,
) -> rl::Result<Option<Opening>> {
    vm.next_token()?;
    let rules = Rules::get(category, vm.interp().compatible);
    let token = vm.token().clone();
    if !rules.accepts(&token) {
        let description = token.description(vm.names());
        vm.error(format!("cannot use {description} as a starting delimiter"));
        restore_line_end(vm, &token)?;
        return Ok(None);
    }
    Ok(Some(Opening {
        token,
        level: vm.input_stack().level(),
        level_sensitive: rules.level_sensitive,
    }))
}

/// When an escape argument runs into the end of the line, put the newline back so that the
///     line still ends where it did.
fn restore_line_end<S: RoffState>(vm: &mut VM<S>, token: &Token) -> rl::Result<()> {
    if token.is_newline() {
        vm.push_text("\n")?;
    }
    Ok(())
}

fn missing_closing_delimiter<S: RoffState>(vm: &mut VM<S>) -> rl::Result<()> {
    vm.error("missing closing delimiter");
    let token = vm.token().clone();
    restore_line_end(vm, &token)
}

/// After the argument, skip forward to the closing delimiter.
///
/// Returns false if the line ended first.
fn find_closing<S: RoffState>(vm: &mut VM<S>, opening: &Opening) -> rl::Result<bool> {
    if opening.closes(vm, vm.token()) {
        return Ok(true);
    }
    if vm.token().is_line_end() {
        missing_closing_delimiter(vm)?;
        return Ok(false);
    }
    vm.warning(Warning::Delim, "closing delimiter does not match");
    loop {
        vm.next_token()?;
        if opening.closes(vm, vm.token()) {
            return Ok(true);
        }
        if vm.token().is_line_end() {
            missing_closing_delimiter(vm)?;
            return Ok(false);
        }
    }
}

/// Read a delimited number expression, as in `\h'1m'`.
pub fn read_delimited_number<S: RoffState>(
    vm: &mut VM<S>,
    scale: Scale,
) -> rl::Result<Option<i32>> {
    let Some(opening) = read_opening(vm, EscapeCategory::NumericExpression)? else {
        return Ok(None);
    };
    vm.next_token()?;
    let value = number::get_number(vm, scale)?;
    if !find_closing(vm, &opening)? {
        return Ok(None);
    }
    Ok(value)
}

/// Read a delimited number expression that may be relative to a previous value.
pub fn read_delimited_number_relative<S: RoffState>(
    vm: &mut VM<S>,
    scale: Scale,
    prev: i32,
) -> rl::Result<Option<i32>> {
    let Some(opening) = read_opening(vm, EscapeCategory::NumericExpression)? else {
        return Ok(None);
    };
    vm.next_token()?;
    let value = number::get_number_relative(vm, scale, prev)?;
    if !find_closing(vm, &opening)? {
        return Ok(None);
    }
    Ok(value)
}

/// Check whether a delimited argument is a valid number expression, for `\B'expr'`.
///
/// Nothing is reported about the expression itself.
pub fn read_delimited_validity<S: RoffState>(vm: &mut VM<S>) -> rl::Result<bool> {
    let Some(opening) = read_opening(vm, EscapeCategory::NumericExpression)? else {
        return Ok(false);
    };
    vm.next_token()?;
    vm.suppress_diagnostics();
    let result = check_rigid_number(vm, &opening);
    vm.unsuppress_diagnostics();
    result
}

fn check_rigid_number<S: RoffState>(vm: &mut VM<S>, opening: &Opening) -> rl::Result<bool> {
    let value = number::get_number_rigidly(vm, Scale::BASIC)?;
    if opening.closes(vm, vm.token()) {
        return Ok(value.is_some());
    }
    find_closing(vm, opening)?;
    Ok(false)
}

/// Read the argument of `\R'name expr'`.
///
/// The expression may be relative to the register's current value.
pub fn read_register_assignment<S: RoffState>(
    vm: &mut VM<S>,
) -> rl::Result<Option<(Name, i32)>> {
    let Some(opening) = read_opening(vm, EscapeCategory::Identifier)? else {
        return Ok(None);
    };
    vm.next_token()?;
    let Some(name) = super::get_long_name(vm, true)? else {
        find_closing(vm, &opening)?;
        return Ok(None);
    };
    super::skip_spaces(vm)?;
    let prev = vm.registers.value(name).unwrap_or(0);
    let value = number::get_number_relative(vm, Scale::BASIC, prev)?;
    if !find_closing(vm, &opening)? {
        return Ok(None);
    }
    Ok(value.map(|value| (name, value)))
}

/// Read the argument of `\l'len c'` and `\L'len c'`: an optional length followed by an
///     optional glyph to draw the rule with.
pub fn read_rule<S: RoffState>(
    vm: &mut VM<S>,
    scale: Scale,
) -> rl::Result<Option<(i32, Option<Token>)>> {
    let Some(opening) = read_opening(vm, EscapeCategory::NumericExpression)? else {
        return Ok(None);
    };
    vm.next_token()?;
    let starts_number = matches!(
        vm.token().ch(),
        Some(b'0'..=b'9' | b'+' | b'-' | b'|' | b'(' | b'.')
    );
    let length = if starts_number {
        number::get_number(vm, scale)?.unwrap_or(0)
    } else {
        0
    };
    let mut glyph = None;
    if !opening.closes(vm, vm.token()) && !vm.token().is_line_end() {
        glyph = Some(vm.token().clone());
        vm.next_token()?;
    }
    if !find_closing(vm, &opening)? {
        return Ok(None);
    }
    Ok(Some((length, glyph)))
}

/// Read the tokens of a delimited text argument, as in `\w'text'`.
///
/// If the line ends before the closing delimiter, the tokens read so far are returned.
pub fn read_delimited_tokens<S: RoffState>(vm: &mut VM<S>) -> rl::Result<Option<Vec<Token>>> {
    let Some(opening) = read_opening(vm, EscapeCategory::Text)? else {
        return Ok(None);
    };
    let mut tokens = vec![];
    loop {
        vm.next_token()?;
        if opening.closes(vm, vm.token()) {
            return Ok(Some(tokens));
        }
        if vm.token().is_line_end() {
            missing_closing_delimiter(vm)?;
            return Ok(Some(tokens));
        }
        tokens.push(vm.token().clone());
    }
}

/// Read a delimited name, as in `\C'em'`.
pub fn read_delimited_name<S: RoffState>(vm: &mut VM<S>) -> rl::Result<Option<String>> {
    let Some(opening) = read_opening(vm, EscapeCategory::Identifier)? else {
        return Ok(None);
    };
    let mut name = vec![];
    loop {
        vm.next_token()?;
        if opening.closes(vm, vm.token()) {
            break;
        }
        match vm.token().ch() {
            Some(c) => name.push(c),
            None => {
                if vm.token().is_line_end() {
                    missing_closing_delimiter(vm)?;
                } else {
                    let description = vm.token().description(vm.names());
                    vm.error(format!("{description} is not allowed in a name"));
                }
                return Ok(None);
            }
        }
    }
    if name.is_empty() {
        vm.error("empty name");
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(&name).into_owned()))
}

/// Read the argument of `\s`.
///
/// The forms are `\sN`, `\s±N`, `\s(NN`, `\s±(NN`, `\s[N]`, `\s±[N]` and `\s'N'`,
///     where the bracket and quote forms take a full expression.
/// In compatibility mode `\s39` is size 39 and not size 3 followed by `9`.
/// Returns the new size in scaled points, computed relative to `current` for the
///     signed forms; zero means the previous size.
pub fn read_size<S: RoffState>(vm: &mut VM<S>, current: i32) -> rl::Result<Option<i32>> {
    vm.next_token()?;
    let mut sign = read_sign(vm)?;
    let size_scale = vm.state.units().size_scale;
    let value = match vm.token().ch() {
        Some(b'(') => {
            vm.next_token()?;
            if sign == 0 {
                sign = read_sign(vm)?;
            }
            let mut n = 0;
            for i in 0..2 {
                if i > 0 {
                    vm.next_token()?;
                }
                match vm.token().ch() {
                    Some(d) if d.is_ascii_digit() => n = n * 10 + (d - b'0') as i32,
                    _ => {
                        vm.error("bad digit in point size");
                        let token = vm.token().clone();
                        restore_line_end(vm, &token)?;
                        return Ok(None);
                    }
                }
            }
            Some(n * size_scale)
        }
        Some(c) if c.is_ascii_digit() => {
            let mut n = (c - b'0') as i32;
            if vm.interp().compatible && sign == 0 && (1..4).contains(&n) {
                if let Some(Raw::Byte(d)) = vm.peek_raw() {
                    if d.is_ascii_digit() {
                        vm.next_token()?;
                        n = n * 10 + (d - b'0') as i32;
                    }
                }
            }
            Some(n * size_scale)
        }
        _ => {
            let token = vm.token().clone();
            let rules = Rules::get(EscapeCategory::NumericExpression, vm.interp().compatible);
            if !rules.accepts(&token) {
                vm.error("bad point size");
                restore_line_end(vm, &token)?;
                return Ok(None);
            }
            let bracket = token.ch() == Some(b'[') && !vm.interp().compatible;
            let opening = Opening {
                token,
                level: vm.input_stack().level(),
                level_sensitive: rules.level_sensitive,
            };
            vm.next_token()?;
            if sign == 0 {
                sign = read_sign(vm)?;
            }
            let value = number::get_number(vm, Scale::SCALED_POINT)?;
            if bracket {
                if vm.token().ch() != Some(b']') {
                    missing_closing_delimiter(vm)?;
                    return Ok(None);
                }
            } else if !find_closing(vm, &opening)? {
                return Ok(None);
            }
            value
        }
    };
    let Some(value) = value else {
        return Ok(None);
    };
    let size = match sign {
        1 => current.saturating_add(value),
        -1 => current.saturating_sub(value),
        _ => value,
    };
    Ok(Some(size.max(0)))
}

fn read_sign<S: RoffState>(vm: &mut VM<S>) -> rl::Result<i32> {
    let sign = match vm.token().ch() {
        Some(b'+') => 1,
        Some(b'-') => -1,
        _ => return Ok(0),
    };
    vm.next_token()?;
    Ok(sign)
}
