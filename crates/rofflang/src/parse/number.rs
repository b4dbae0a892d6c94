//! Number expressions.
//!
//! Expressions are evaluated strictly left to right with no operator precedence,
//!     so `1+2*3` is 9.
//! Parentheses group, and `(c;expr)` evaluates `expr` with `c` as the default scale indicator.
//!
//! Every number is converted to basic units as it is read.
//! A number written with a scale indicator like `2i` or `3m` is converted using that indicator;
//!     a bare number uses the default indicator of the context it appears in.
//! The conversion happens per number, so operators work on basic units:
//!     `7/2i` is seven ems divided by two inches, not three and a half inches.

use crate::error::Warning;
use crate::prelude as rl;
use crate::token::Token;
use crate::vm::{RoffState, Units, VM};

/// The scale indicator assumed for numbers written without one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scale(u8);

impl Scale {
    /// Plain integers: scale indicators are not allowed.
    pub const NONE: Scale = Scale(0);
    /// Basic units.
    pub const BASIC: Scale = Scale(b'u');
    pub const EM: Scale = Scale(b'm');
    pub const POINT: Scale = Scale(b'p');
    /// Vertical spacing.
    pub const VERTICAL: Scale = Scale(b'v');
    /// Scaled points; only `z` and `u` may be written explicitly.
    pub const SCALED_POINT: Scale = Scale(b'z');

    pub fn indicator(self) -> Option<u8> {
        match self.0 {
            0 => None,
            c => Some(c),
        }
    }

    fn from_indicator(c: u8) -> Option<Scale> {
        if is_scale_indicator(c) {
            Some(Scale(c))
        } else {
            None
        }
    }
}

pub fn is_scale_indicator(c: u8) -> bool {
    b"icfPmnpuvMsz".contains(&c)
}

/// `n * num / den`, rounded to the nearest integer.
fn scale(n: i64, num: i64, den: i64) -> Option<i32> {
    let product = n * num;
    let half = den / 2;
    let result = if product >= 0 {
        (product + half) / den
    } else {
        (product - half) / den
    };
    i32::try_from(result).ok()
}

fn convert(n: i64, divisor: i64, scale_indicator: u8, units: &Units) -> Option<i32> {
    let inch = units.resolution as i64;
    let em = match units.em() {
        0 => 1,
        em => em as i64,
    };
    match scale_indicator {
        b'i' => scale(n, inch, divisor),
        b'c' => scale(n, inch * 100, divisor * 254),
        b'f' => scale(n, 65536, divisor),
        b'p' => scale(n, inch, divisor * 72),
        b'P' => scale(n, inch, divisor * 6),
        b'm' => scale(n, em, divisor),
        b'M' => scale(n, em, divisor * 100),
        b'n' => scale(n, (em / 2).max(1), divisor),
        b'v' => scale(n, units.line_spacing as i64, divisor),
        b's' => scale(n, inch, divisor * units.size_scale as i64 * 72),
        b'z' => scale(n, units.size_scale as i64, divisor),
        _ => i32::try_from(n / divisor).ok(),
    }
}

fn skip_spaces<S: RoffState>(vm: &mut VM<S>) -> rl::Result<()> {
    while vm.token().is_space() {
        vm.next_token()?;
    }
    Ok(())
}

/// Skip spaces and check that a number can start here.
fn start_number<S: RoffState>(vm: &mut VM<S>) -> rl::Result<bool> {
    skip_spaces(vm)?;
    match vm.token() {
        Token::Newline | Token::Eof => {
            vm.warning(Warning::Missing, "missing number");
            Ok(false)
        }
        Token::Tab => {
            vm.warning(Warning::Tab, "tab character where number expected");
            Ok(false)
        }
        Token::RightBrace => {
            vm.warning(Warning::RightBrace, "'\\}' where number expected");
            Ok(false)
        }
        _ => Ok(true),
    }
}

/// Read a number expression starting at the current token.
pub fn get_number<S: RoffState>(vm: &mut VM<S>, scale: Scale) -> rl::Result<Option<i32>> {
    if !start_number(vm)? {
        return Ok(None);
    }
    parse_expr(vm, scale, false, false)
}

/// Read a number expression that may be relative to a previous value.
///
/// A leading `+` adds the expression to `prev`; a leading `-` subtracts it.
pub fn get_number_relative<S: RoffState>(
    vm: &mut VM<S>,
    scale: Scale,
    prev: i32,
) -> rl::Result<Option<i32>> {
    if !start_number(vm)? {
        return Ok(None);
    }
    let sign = match vm.token().ch() {
        Some(b'+') => 1,
        Some(b'-') => -1,
        _ => 0,
    };
    if sign != 0 {
        vm.next_token()?;
    }
    let Some(v) = parse_expr(vm, scale, false, false)? else {
        return Ok(None);
    };
    let result = match sign {
        1 => prev.checked_add(v),
        -1 => prev.checked_sub(v),
        _ => Some(v),
    };
    if result.is_none() {
        vm.error("numeric overflow");
    }
    Ok(result)
}

/// Read an expression in which scale indicators are not allowed.
pub fn get_integer<S: RoffState>(vm: &mut VM<S>) -> rl::Result<Option<i32>> {
    get_number(vm, Scale::NONE)
}

/// Read a number expression, failing instead of recovering from syntax problems.
///
/// Used by `\B`, which tests whether its argument is a valid expression.
pub fn get_number_rigidly<S: RoffState>(vm: &mut VM<S>, scale: Scale) -> rl::Result<Option<i32>> {
    if !start_number(vm)? {
        return Ok(None);
    }
    parse_expr(vm, scale, false, true)
}

#[derive(Clone, Copy)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    Min,
    Max,
}

fn read_operator<S: RoffState>(vm: &mut VM<S>) -> rl::Result<Option<Op>> {
    let op = match vm.token().ch() {
        Some(b'+') => Op::Add,
        Some(b'-') => Op::Sub,
        Some(b'*') => Op::Mul,
        Some(b'/') => Op::Div,
        Some(b'%') => Op::Rem,
        Some(b'&') => Op::And,
        Some(b':') => Op::Or,
        Some(b'<') => {
            vm.next_token()?;
            return Ok(Some(match vm.token().ch() {
                Some(b'=') => {
                    vm.next_token()?;
                    Op::Le
                }
                Some(b'>') => {
                    vm.next_token()?;
                    Op::Ne
                }
                Some(b'?') => {
                    vm.next_token()?;
                    Op::Min
                }
                _ => Op::Lt,
            }));
        }
        Some(b'>') => {
            vm.next_token()?;
            return Ok(Some(match vm.token().ch() {
                Some(b'=') => {
                    vm.next_token()?;
                    Op::Ge
                }
                Some(b'?') => {
                    vm.next_token()?;
                    Op::Max
                }
                _ => Op::Gt,
            }));
        }
        Some(b'=') => {
            vm.next_token()?;
            if vm.token().ch() == Some(b'=') {
                vm.next_token()?;
            }
            return Ok(Some(Op::Eq));
        }
        _ => return Ok(None),
    };
    vm.next_token()?;
    Ok(Some(op))
}

/// Parse an expression starting at the current token.
///
/// Inside parentheses spaces between terms are skipped;
///     outside, a space ends the expression.
pub fn parse_expr<S: RoffState>(
    vm: &mut VM<S>,
    scale: Scale,
    parenthesised: bool,
    rigid: bool,
) -> rl::Result<Option<i32>> {
    let Some(mut v) = parse_term(vm, scale, parenthesised, rigid)? else {
        return Ok(None);
    };
    loop {
        if parenthesised {
            skip_spaces(vm)?;
        }
        let Some(op) = read_operator(vm)? else {
            return Ok(Some(v));
        };
        let Some(v2) = parse_term(vm, scale, parenthesised, rigid)? else {
            return Ok(None);
        };
        let b = |x: bool| x as i32;
        let result = match op {
            Op::Lt => Some(b(v < v2)),
            Op::Gt => Some(b(v > v2)),
            Op::Le => Some(b(v <= v2)),
            Op::Ge => Some(b(v >= v2)),
            Op::Eq => Some(b(v == v2)),
            Op::Ne => Some(b(v != v2)),
            Op::Min => Some(v.min(v2)),
            Op::Max => Some(v.max(v2)),
            Op::And => Some(b(v > 0 && v2 > 0)),
            Op::Or => Some(b(v > 0 || v2 > 0)),
            Op::Add => v.checked_add(v2),
            Op::Sub => v.checked_sub(v2),
            Op::Mul => v.checked_mul(v2),
            Op::Div => {
                if v2 == 0 {
                    vm.error("division by zero");
                    return Ok(None);
                }
                v.checked_div(v2)
            }
            Op::Rem => {
                if v2 == 0 {
                    vm.error("modulus by zero");
                    return Ok(None);
                }
                v.checked_rem(v2)
            }
        };
        match result {
            Some(result) => v = result,
            None => {
                vm.error("numeric overflow");
                return Ok(None);
            }
        }
    }
}

fn parse_term<S: RoffState>(
    vm: &mut VM<S>,
    mut scale: Scale,
    parenthesised: bool,
    rigid: bool,
) -> rl::Result<Option<i32>> {
    let mut negative = false;
    loop {
        if parenthesised && vm.token().is_space() {
            vm.next_token()?;
        } else if vm.token().ch() == Some(b'+') {
            vm.next_token()?;
        } else if vm.token().ch() == Some(b'-') {
            vm.next_token()?;
            negative = !negative;
        } else {
            break;
        }
    }
    let negate = |vm: &mut VM<S>, v: i32| -> Option<i32> {
        if !negative {
            return Some(v);
        }
        let result = v.checked_neg();
        if result.is_none() {
            vm.error("numeric overflow");
        }
        result
    };
    let mut v: i64 = 0;
    match vm.token().ch() {
        Some(b'|') => {
            vm.next_token()?;
            let Some(inner) = parse_term(vm, scale, parenthesised, rigid)? else {
                return Ok(None);
            };
            let position = if scale == Scale::VERTICAL {
                0
            } else {
                vm.state.horizontal_position()
            };
            let Some(v) = inner.checked_sub(position) else {
                vm.error("numeric overflow");
                return Ok(None);
            };
            return Ok(negate(vm, v));
        }
        Some(b'(') => {
            vm.next_token()?;
            match vm.token().ch() {
                Some(b')') => {
                    if rigid {
                        return Ok(None);
                    }
                    vm.warning(Warning::Syntax, "empty parentheses");
                    vm.next_token()?;
                    return Ok(Some(0));
                }
                Some(b';') => {
                    scale = Scale::NONE;
                    vm.next_token()?;
                }
                Some(c) => {
                    if let Some(inner_scale) = Scale::from_indicator(c) {
                        vm.next_token()?;
                        if vm.token().ch() == Some(b';') {
                            vm.next_token()?;
                            scale = inner_scale;
                        } else {
                            let description = vm.token().description(vm.names());
                            vm.error(format!(
                                "expected ';' after scale indicator (got {description})"
                            ));
                            return Ok(None);
                        }
                    }
                }
                None => {}
            }
            let Some(inner) = parse_expr(vm, scale, true, rigid)? else {
                return Ok(None);
            };
            skip_spaces(vm)?;
            if vm.token().ch() == Some(b')') {
                vm.next_token()?;
            } else {
                if rigid {
                    return Ok(None);
                }
                let description = vm.token().description(vm.names());
                vm.warning(Warning::Syntax, format!("missing ')' (got {description})"));
            }
            return Ok(negate(vm, inner));
        }
        Some(b'.') => {}
        Some(c) if c.is_ascii_digit() => {
            while let Some(c) = vm.token().ch().filter(u8::is_ascii_digit) {
                v = v * 10 + (c - b'0') as i64;
                if v > i32::MAX as i64 {
                    vm.error("numeric overflow");
                    return Ok(None);
                }
                vm.next_token()?;
            }
        }
        Some(b'/' | b'*' | b'%' | b':' | b'&' | b'>' | b'<' | b'=') => {
            vm.warning(Warning::Syntax, "empty left operand");
            return Ok(if rigid { None } else { Some(0) });
        }
        _ => {
            let description = vm.token().description(vm.names());
            vm.warning(
                Warning::Number,
                format!("numeric expression expected (got {description})"),
            );
            return Ok(None);
        }
    }
    let mut divisor: i64 = 1;
    if vm.token().ch() == Some(b'.') {
        vm.next_token()?;
        while let Some(c) = vm.token().ch().filter(u8::is_ascii_digit) {
            if divisor <= i32::MAX as i64 / 2540 && v <= (i32::MAX as i64 - 9) / 10 {
                v = v * 10 + (c - b'0') as i64;
                divisor *= 10;
            }
            vm.next_token()?;
        }
    }
    let mut si = scale.0;
    let mut consume_indicator = false;
    if let Some(c) = vm.token().ch().filter(|c| is_scale_indicator(*c)) {
        consume_indicator = true;
        match scale.0 {
            b'z' => {
                if c == b'u' || c == b'z' {
                    si = c;
                } else {
                    vm.warning(
                        Warning::Scale,
                        "only 'z' and 'u' scale indicators valid in this context",
                    );
                }
            }
            0 => vm.warning(Warning::Scale, "scale indicator invalid in this context"),
            b'u' => si = c,
            _ => {
                if c == b'z' {
                    vm.warning(Warning::Scale, "'z' scale indicator invalid in this context");
                } else {
                    si = c;
                }
            }
        }
    }
    let units = vm.state.units();
    let Some(result) = convert(v, divisor, si, &units) else {
        vm.error("numeric overflow");
        return Ok(None);
    };
    if consume_indicator {
        vm.next_token()?;
    }
    Ok(negate(vm, result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn eval(input: &str, scale: Scale) -> Option<i32> {
        let mut vm = VM::<()>::new(HashMap::new());
        vm.terminal_out = std::rc::Rc::new(std::cell::RefCell::new(std::io::sink()));
        vm.push_source("test", input).unwrap();
        vm.next_token().unwrap();
        get_number(&mut vm, scale).unwrap()
    }

    macro_rules! number_tests {
        ($( ($name: ident, $input: expr, $scale: expr, $want: expr), )+) => {
            $(
                #[test]
                fn $name() {
                    assert_eq!(eval($input, $scale), $want);
                }
            )+
        };
    }

    number_tests!(
        (integer, "42", Scale::NONE, Some(42)),
        (left_to_right, "1+2*3", Scale::NONE, Some(9)),
        (parentheses, "1+(2*3)", Scale::NONE, Some(7)),
        (unary_minus, "-5+2", Scale::NONE, Some(-3)),
        (double_minus, "--5", Scale::NONE, Some(5)),
        (division_truncates, "7/2", Scale::NONE, Some(3)),
        (remainder, "7%3", Scale::NONE, Some(1)),
        (comparison_true, "3>2", Scale::NONE, Some(1)),
        (comparison_false, "3<2", Scale::NONE, Some(0)),
        (less_equal, "2<=2", Scale::NONE, Some(1)),
        (greater_equal, "1>=2", Scale::NONE, Some(0)),
        (equal, "2=2", Scale::NONE, Some(1)),
        (double_equal, "2==3", Scale::NONE, Some(0)),
        (not_equal, "2<>3", Scale::NONE, Some(1)),
        (and, "1&0", Scale::NONE, Some(0)),
        (or, "1:0", Scale::NONE, Some(1)),
        (minimum, "5<?3", Scale::NONE, Some(3)),
        (maximum, "5>?3", Scale::NONE, Some(5)),
        (space_ends_expression, "1 +2", Scale::NONE, Some(1)),
        (spaces_inside_parentheses, "( 1 + 2 )", Scale::NONE, Some(3)),
        (inch, "1i", Scale::BASIC, Some(72000)),
        (points, "2p", Scale::BASIC, Some(2000)),
        (picas, "1P", Scale::BASIC, Some(12000)),
        (centimetres, "2.54c", Scale::BASIC, Some(72000)),
        (em_default, "1", Scale::EM, Some(10000)),
        (decimal_em, "1.5", Scale::EM, Some(15000)),
        (en, "2n", Scale::BASIC, Some(10000)),
        (vertical_default, "1", Scale::VERTICAL, Some(12000)),
        (scaled_points_default, "12", Scale::SCALED_POINT, Some(12000)),
        (scaled_points_explicit_u, "5u", Scale::SCALED_POINT, Some(5)),
        (scale_prefix, "(i;1)", Scale::BASIC, Some(72000)),
        (leading_dot, ".5i", Scale::BASIC, Some(36000)),
        (division_by_zero, "1/0", Scale::NONE, None),
        (modulus_by_zero, "1%0", Scale::NONE, None),
        (not_a_number, "x", Scale::NONE, None),
        (missing_number, "\n", Scale::NONE, None),
        (empty_parentheses, "()", Scale::NONE, Some(0)),
        (overflow, "99999999999", Scale::NONE, None),
    );

    #[test]
    fn relative() {
        let mut vm = VM::<()>::new(HashMap::new());
        vm.push_source("test", "+3 -2 4").unwrap();
        vm.next_token().unwrap();
        assert_eq!(get_number_relative(&mut vm, Scale::NONE, 10).unwrap(), Some(13));
        assert_eq!(get_number_relative(&mut vm, Scale::NONE, 10).unwrap(), Some(8));
        assert_eq!(get_number_relative(&mut vm, Scale::NONE, 10).unwrap(), Some(4));
    }

    #[test]
    fn number_stops_before_next_token() {
        let mut vm = VM::<()>::new(HashMap::new());
        vm.push_source("test", "12x").unwrap();
        vm.next_token().unwrap();
        assert_eq!(get_integer(&mut vm).unwrap(), Some(12));
        assert_eq!(vm.token(), &Token::Char(b'x'));
    }

    #[test]
    fn rigid_rejects_empty_parentheses() {
        let mut vm = VM::<()>::new(HashMap::new());
        vm.push_source("test", "()").unwrap();
        vm.next_token().unwrap();
        assert_eq!(get_number_rigidly(&mut vm, Scale::BASIC).unwrap(), None);
    }

    #[test]
    fn scale_indicator_invalid_for_integers_warns() {
        let mut vm = VM::<()>::new(HashMap::new());
        vm.terminal_out = std::rc::Rc::new(std::cell::RefCell::new(std::io::sink()));
        vm.interp_mut().warning_mask = crate::error::WarningMask::EVERY;
        vm.push_source("test", "3i").unwrap();
        vm.next_token().unwrap();
        assert_eq!(get_integer(&mut vm).unwrap(), Some(3));
        assert_eq!(vm.diagnostic_counts(), (1, 0));
    }
}
