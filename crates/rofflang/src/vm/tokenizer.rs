//! The tokenizer.
//!
//! [next] reads raw elements from the input stack and returns the next [Token].
//! Most bytes are ordinary characters.
//! The escape character starts an escape sequence, which is either turned into a token
//!     or, for interpolations like `\*` and `\n`, pushes new input and is read through.
//! Control codes stored by the copy-mode reader are mapped back to the tokens of the
//!     escapes they stand for.

use super::copymode::{self, CopyChar, ReadMode};
use super::interpolate;
use super::{RoffState, VM};
use crate::command::Command;
use crate::error::Warning;
use crate::input::{Raw, Source};
use crate::node::{FixedSpace, FontSelection, Kind, Node, SizeChange};
use crate::parse::delimiter;
use crate::parse::Scale;
use crate::prelude as rl;
use crate::roffmacro::Macro;
use crate::token::{code, write_tokens, Glyph, Token};

/// Read the next token from the input stack.
pub fn next<S: RoffState>(vm: &mut VM<S>) -> rl::Result<Token> {
    loop {
        let c = match vm.get_raw() {
            None => return Ok(Token::Eof),
            Some(Raw::Node(node)) => {
                return Ok(match node.kind() {
                    Kind::Token(token) => token.clone(),
                    _ => Token::Node(node),
                })
            }
            Some(Raw::Byte(c)) | Some(Raw::Invalid(c)) => c,
        };
        if Some(c) == vm.interp().escape_char() {
            match escape(vm)? {
                Some(token) => return Ok(token),
                None => continue,
            }
        }
        let token = match c {
            b' ' => Token::Space,
            b'\n' => Token::Newline,
            b'\t' => Token::Tab,
            0x01 => Token::Leader,
            0x08 => Token::Backspace,
            code::PUSH_GROFF_MODE => {
                vm.interp_mut().push_compatible(false);
                continue;
            }
            code::PUSH_COMPAT_MODE => {
                vm.interp_mut().push_compatible(true);
                continue;
            }
            code::POP_MODE => {
                vm.interp_mut().pop_compatible();
                continue;
            }
            code::ESCAPE_NEWLINE => continue,
            code::BEGIN_TRAP => Token::BeginTrap,
            code::END_TRAP => Token::EndTrap,
            code::PAGE_EJECTOR => Token::PageEjector,
            code::ESCAPE_AMPERSAND => Token::Dummy,
            code::ESCAPE_RIGHT_PARENTHESIS => Token::TransparentDummy,
            code::ESCAPE_UNDERSCORE => special(vm, "ul"),
            code::ESCAPE_LEFT_QUOTE => special(vm, "ga"),
            code::ESCAPE_RIGHT_QUOTE => special(vm, "aa"),
            code::ESCAPE_HYPHEN => special(vm, "-"),
            code::ESCAPE_BAR => fixed_space(FixedSpace::Sixth),
            code::ESCAPE_CIRCUMFLEX => fixed_space(FixedSpace::Twelfth),
            code::ESCAPE_LEFT_BRACE => Token::LeftBrace,
            code::ESCAPE_RIGHT_BRACE => Token::RightBrace,
            code::ESCAPE_BANG => Token::Transparent,
            code::ESCAPE_INTERRUPT => Token::Interrupt,
            code::ESCAPE_PRINTABLE => Token::Escape,
            code::ESCAPE_PERCENT => Token::HyphenIndicator,
            code::ESCAPE_SPACE => Token::UnstretchableSpace,
            code::ESCAPE_TILDE => Token::StretchableSpace,
            code::ESCAPE_COLON => Token::ZeroWidthBreak,
            code::ESCAPE_QUESTION => non_interpreted(vm)?,
            code::ESCAPE_UNINTERPRETED => match escape(vm)? {
                Some(token) => token,
                None => continue,
            },
            c => Token::Char(c),
        };
        return Ok(token);
    }
}

fn special<S: RoffState>(vm: &mut VM<S>, name: &str) -> Token {
    Token::Special(Glyph::new(vm.intern(name)))
}

fn fixed_space(space: FixedSpace) -> Token {
    node(Kind::FixedSpace(space))
}

fn node(kind: Kind) -> Token {
    Token::Node(Node::new(kind))
}

/// Handle the escape sequence after an escape character.
///
/// Returns [None] if the sequence produced no token and reading should continue.
fn escape<S: RoffState>(vm: &mut VM<S>) -> rl::Result<Option<Token>> {
    let escape_char = vm.interp().escape_char().unwrap_or(b'\\');
    // `\E` is the escape character again, so a run of them is read iteratively.
    let c = loop {
        match vm.get_raw() {
            None => {
                vm.error("end of input after escape character");
                return Ok(Some(Token::Eof));
            }
            Some(Raw::Node(node)) => {
                let mut m = Macro::new();
                m.append_node(node);
                vm.push_input(Source::Temporary(m.cursor()))?;
                return Ok(Some(Token::Char(escape_char)));
            }
            Some(Raw::Byte(b'E')) => continue,
            Some(Raw::Byte(c)) | Some(Raw::Invalid(c)) => break c,
        }
    };
    let token = match c {
        b'\'' => special(vm, "aa"),
        b'`' => special(vm, "ga"),
        b'-' => special(vm, "-"),
        b'_' => special(vm, "ul"),
        b'.' => Token::Char(b'.'),
        b'&' => Token::Dummy,
        b')' => Token::TransparentDummy,
        b'^' => fixed_space(FixedSpace::Twelfth),
        b'|' => fixed_space(FixedSpace::Sixth),
        b'0' => fixed_space(FixedSpace::Digit),
        b' ' => Token::UnstretchableSpace,
        b'~' => Token::StretchableSpace,
        b':' => Token::ZeroWidthBreak,
        b'%' => Token::HyphenIndicator,
        b'/' => Token::ItalicCorrection,
        b',' => node(Kind::LeftItalicCorrection),
        b'{' => Token::LeftBrace,
        b'}' => Token::RightBrace,
        b'e' => Token::Escape,
        b'a' => Token::Leader,
        b't' => Token::Tab,
        b'c' => Token::Interrupt,
        b'p' => Token::Spread,
        b'!' => Token::Transparent,
        b'?' => non_interpreted(vm)?,
        b'"' => loop {
            match vm.get_raw() {
                None => break Token::Eof,
                Some(Raw::Byte(b'\n')) => break Token::Newline,
                Some(_) => {}
            }
        },
        b'#' => {
            while let Some(raw) = vm.get_raw() {
                if raw == Raw::Byte(b'\n') {
                    break;
                }
            }
            return Ok(None);
        }
        b'\n' => return Ok(None),

        b'(' => match copymode::read_two_char_escape_name(vm)? {
            Some(name) => Token::Special(Glyph::new(name)),
            None => return Ok(None),
        },
        b'[' if !vm.interp().compatible => return bracket_glyph(vm),
        b'C' => match delimiter::read_delimited_name(vm)? {
            Some(name) => special(vm, &name),
            None => return Ok(None),
        },
        b'N' => match delimiter::read_delimited_number(vm, Scale::NONE)? {
            Some(n) => Token::Indexed(n),
            None => return Ok(None),
        },

        b'*' => {
            interpolate::read_and_interpolate_string(vm)?;
            return Ok(None);
        }
        b'$' => {
            if let Some(name) = copymode::read_escape_name(vm, ReadMode::NoArgs)? {
                let name = vm.name_str(name).as_bytes().to_vec();
                interpolate::argument(vm, &name)?;
            }
            return Ok(None);
        }
        b'n' => {
            if let Some((name, increment)) = copymode::read_increment_and_escape_name(vm)? {
                interpolate::register(vm, name, increment)?;
            }
            return Ok(None);
        }
        b'g' => {
            if let Some(name) = copymode::read_escape_name(vm, ReadMode::NoArgs)? {
                interpolate::register_format(vm, name)?;
            }
            return Ok(None);
        }
        b'V' => {
            if let Some(name) = copymode::read_escape_name(vm, ReadMode::NoArgs)? {
                interpolate::environment_variable(vm, name)?;
            }
            return Ok(None);
        }
        b'A' => {
            let valid = match delimiter::read_delimited_tokens(vm)? {
                Some(tokens) => {
                    !tokens.is_empty() && tokens.iter().all(|token| token.ch().is_some())
                }
                None => false,
            };
            vm.push_text(if valid { "1" } else { "0" })?;
            return Ok(None);
        }
        b'B' => {
            let valid = delimiter::read_delimited_validity(vm)?;
            vm.push_text(if valid { "1" } else { "0" })?;
            return Ok(None);
        }
        b'w' => {
            if let Some(tokens) = delimiter::read_delimited_tokens(vm)? {
                let width = S::width_hook(&tokens, vm);
                vm.push_text(&width.to_string())?;
            }
            return Ok(None);
        }

        b'k' => match copymode::read_escape_name(vm, ReadMode::NoArgs)? {
            Some(name) => Token::MarkInput(name),
            None => return Ok(None),
        },
        b'R' => {
            if let Some((name, value)) = delimiter::read_register_assignment(vm)? {
                vm.registers.set_value(name, value);
            }
            return Ok(None);
        }
        b'h' => match delimiter::read_delimited_number(vm, Scale::EM)? {
            Some(n) => node(Kind::HorizontalMotion(n)),
            None => return Ok(None),
        },
        b'v' => match delimiter::read_delimited_number(vm, Scale::VERTICAL)? {
            Some(n) => node(Kind::VerticalMotion(n)),
            None => return Ok(None),
        },
        b'u' => node(Kind::VerticalMotion(-vm.state.units().em() / 2)),
        b'd' => node(Kind::VerticalMotion(vm.state.units().em() / 2)),
        b'r' => node(Kind::VerticalMotion(-vm.state.units().em())),

        b's' => {
            let current = vm.state.units().point_size;
            match delimiter::read_size(vm, current)? {
                Some(0) => node(Kind::SizeChange(SizeChange::Previous)),
                Some(size) => node(Kind::SizeChange(SizeChange::Absolute(size))),
                None => return Ok(None),
            }
        }
        b'f' | b'F' => {
            let Some(name) = copymode::read_escape_name(vm, ReadMode::AllowEmpty)? else {
                return Ok(None);
            };
            let s = vm.name_str(name);
            let selection = if s.is_empty() || s == "P" {
                FontSelection::Previous
            } else if s.bytes().all(|b| b.is_ascii_digit()) {
                FontSelection::Position(s.parse().unwrap_or(i32::MAX))
            } else {
                FontSelection::Name(name)
            };
            if c == b'f' {
                node(Kind::FontChange(selection))
            } else {
                node(Kind::FamilyChange(selection))
            }
        }
        b'm' | b'M' => {
            let Some(name) = copymode::read_escape_name(vm, ReadMode::AllowEmpty)? else {
                return Ok(None);
            };
            let name = if vm.name_str(name).is_empty() {
                None
            } else {
                Some(name)
            };
            node(Kind::Color {
                fill: c == b'M',
                name,
            })
        }
        b'H' => {
            let current = vm.state.units().point_size;
            match delimiter::read_delimited_number_relative(vm, Scale::SCALED_POINT, current)? {
                Some(n) => node(Kind::CharacterHeight(n)),
                None => return Ok(None),
            }
        }
        b'S' => match delimiter::read_delimited_number_relative(vm, Scale::NONE, 0)? {
            Some(n) => node(Kind::Slant(n)),
            None => return Ok(None),
        },
        b'x' => match delimiter::read_delimited_number(vm, Scale::VERTICAL)? {
            Some(n) => node(Kind::ExtraLineSpace(n)),
            None => return Ok(None),
        },

        b'l' | b'L' => {
            let vertical = c == b'L';
            let scale = if vertical { Scale::VERTICAL } else { Scale::EM };
            match delimiter::read_rule(vm, scale)? {
                Some((length, glyph)) => node(Kind::Rule {
                    vertical,
                    length,
                    glyph,
                }),
                None => return Ok(None),
            }
        }
        b'D' => {
            let Some(tokens) = delimiter::read_delimited_tokens(vm)? else {
                return Ok(None);
            };
            let Some(command) = tokens.first().and_then(Token::ch) else {
                vm.error("missing drawing command");
                return Ok(None);
            };
            let arguments = write_tokens(&tokens[1..], vm.names());
            node(Kind::Draw { command, arguments })
        }
        b'o' => match delimiter::read_delimited_tokens(vm)? {
            Some(tokens) => node(Kind::Overstrike(tokens)),
            None => return Ok(None),
        },
        b'b' => match delimiter::read_delimited_tokens(vm)? {
            Some(tokens) => node(Kind::Bracket(tokens)),
            None => return Ok(None),
        },
        b'Z' => match delimiter::read_delimited_tokens(vm)? {
            Some(tokens) => node(Kind::ZeroWidth(tokens)),
            None => return Ok(None),
        },
        b'z' => {
            let token = next(vm)?;
            if token.is_newline() {
                vm.push_text("\n")?;
            }
            if token.is_line_end() {
                return Ok(None);
            }
            node(Kind::ZeroWidth(vec![token]))
        }
        b'X' => match delimiter::read_delimited_tokens(vm)? {
            Some(tokens) => {
                let payload = write_tokens(&tokens, vm.names()).into_bytes();
                node(Kind::DeviceControl(payload))
            }
            None => return Ok(None),
        },
        b'Y' => {
            let Some(name) = copymode::read_escape_name(vm, ReadMode::NoArgs)? else {
                return Ok(None);
            };
            match vm.commands.get(name) {
                Some(Command::Macro(m)) => {
                    let payload: Vec<u8> =
                        m.borrow().bytes().iter().copied().filter(|b| *b != 0).collect();
                    node(Kind::DeviceControl(payload))
                }
                _ => {
                    let s = vm.name_str(name).to_string();
                    vm.warning(Warning::Mac, format!("macro '{s}' not defined"));
                    return Ok(None);
                }
            }
        }
        b'O' => match copymode::read_escape_name(vm, ReadMode::NoArgs)? {
            Some(name) => node(Kind::Suppression(vm.name_str(name).to_string())),
            None => return Ok(None),
        },

        c if c == escape_char => Token::Char(c),
        c => {
            let description = copymode::char_description(c);
            vm.warning(
                Warning::Escape,
                format!("ignoring escape character before {description}"),
            );
            Token::Char(c)
        }
    };
    Ok(Some(token))
}

/// `\[name]` and `\[name param ...]`.
fn bracket_glyph<S: RoffState>(vm: &mut VM<S>) -> rl::Result<Option<Token>> {
    let Some((name, has_args)) = copymode::read_long_escape_name(vm, ReadMode::WithArgs)? else {
        return Ok(None);
    };
    let mut parameters = vec![];
    if has_args {
        for arg in copymode::decode_string_args(vm)?.iter() {
            let text = arg.value.text();
            parameters.push(vm.intern(&text));
        }
    }
    Ok(Some(Token::Special(Glyph {
        name,
        parameters: parameters.into(),
    })))
}

/// `\?text\?`: the text is passed through uninterpreted.
fn non_interpreted<S: RoffState>(vm: &mut VM<S>) -> rl::Result<Token> {
    let mut bytes = vec![];
    loop {
        match copymode::get_copy(vm, false, false)? {
            CopyChar::Byte(code::ESCAPE_QUESTION) => break,
            CopyChar::Byte(b'\n') => {
                vm.error("missing \\?");
                vm.push_text("\n")?;
                break;
            }
            CopyChar::Eof => {
                vm.error("missing \\?");
                break;
            }
            CopyChar::Byte(b) => bytes.push(b),
            CopyChar::Node(_) => {}
        }
    }
    Ok(node(Kind::NonInterpreted(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WarningMask;
    use std::collections::HashMap;

    fn new_vm(input: &str) -> Box<VM<()>> {
        let mut vm = VM::<()>::new(HashMap::new());
        vm.terminal_out = std::rc::Rc::new(std::cell::RefCell::new(std::io::sink()));
        vm.interp_mut().warning_mask = WarningMask::EVERY;
        vm.push_source("test", input).unwrap();
        vm
    }

    fn tokenize(vm: &mut VM<()>) -> Vec<Token> {
        let mut tokens = vec![];
        loop {
            let token = next(vm).unwrap();
            if token.is_eof() {
                return tokens;
            }
            tokens.push(token);
        }
    }

    fn special_name(vm: &VM<()>, token: &Token) -> String {
        match token {
            Token::Special(glyph) => vm.name_str(glyph.name).to_string(),
            other => panic!("not a special character: {other:?}"),
        }
    }

    #[test]
    fn plain_text() {
        let mut vm = new_vm("a b\n");
        assert_eq!(
            tokenize(&mut vm),
            vec![
                Token::Char(b'a'),
                Token::Space,
                Token::Char(b'b'),
                Token::Newline
            ]
        );
    }

    #[test]
    fn two_character_special() {
        let mut vm = new_vm("\\(em");
        let tokens = tokenize(&mut vm);
        assert_eq!(tokens.len(), 1);
        assert_eq!(special_name(&vm, &tokens[0]), "em");
    }

    #[test]
    fn end_of_input_inside_special() {
        let mut vm = new_vm("\\(e");
        let tokens = tokenize(&mut vm);
        assert_eq!(tokens, vec![]);
        assert_eq!(vm.diagnostic_counts(), (0, 1));
    }

    #[test]
    fn end_of_input_after_escape() {
        let mut vm = new_vm("a\\");
        assert_eq!(next(&mut vm).unwrap(), Token::Char(b'a'));
        assert_eq!(next(&mut vm).unwrap(), Token::Eof);
        assert_eq!(vm.diagnostic_counts(), (0, 1));
    }

    #[test]
    fn bracket_special_round_trip() {
        let mut vm = new_vm("\\[u0041 u0300]\\[bu]");
        let tokens = tokenize(&mut vm);
        assert_eq!(tokens.len(), 2);
        let source: String = tokens
            .iter()
            .map(|token| token.to_source(Some(b'\\'), vm.names()).unwrap())
            .collect();
        assert_eq!(source, "\\[u0041 u0300]\\[bu]");
        vm.push_source("again", source).unwrap();
        assert_eq!(tokenize(&mut vm), tokens);
    }

    #[test]
    fn bracket_in_compatibility_mode() {
        let mut vm = new_vm("\\[x]");
        vm.interp_mut().compatible = true;
        assert_eq!(next(&mut vm).unwrap(), Token::Char(b'['));
    }

    #[test]
    fn unknown_escape_is_warned() {
        let mut vm = new_vm("\\q");
        assert_eq!(tokenize(&mut vm), vec![Token::Char(b'q')]);
        assert_eq!(vm.diagnostic_counts(), (1, 0));
    }

    #[test]
    fn escape_escape() {
        let mut vm = new_vm("\\\\");
        assert_eq!(tokenize(&mut vm), vec![Token::Char(b'\\')]);
    }

    #[test]
    fn long_run_of_escape_e() {
        let input = format!("\\{}&x", "E".repeat(100_000));
        let mut vm = new_vm(&input);
        assert_eq!(tokenize(&mut vm), vec![Token::Dummy, Token::Char(b'x')]);
        assert_eq!(vm.diagnostic_counts(), (0, 0));
    }

    #[test]
    fn changed_escape_character() {
        let mut vm = new_vm("@&\\");
        vm.interp_mut().set_escape_char(Some(b'@')).unwrap();
        assert_eq!(tokenize(&mut vm), vec![Token::Dummy, Token::Char(b'\\')]);
    }

    #[test]
    fn comments() {
        let mut vm = new_vm("a\\\" comment\nb\\# comment\nc");
        assert_eq!(
            tokenize(&mut vm),
            vec![
                Token::Char(b'a'),
                Token::Newline,
                Token::Char(b'b'),
                Token::Char(b'c')
            ]
        );
    }

    #[test]
    fn escaped_newline_joins_lines() {
        let mut vm = new_vm("a\\\nb");
        assert_eq!(tokenize(&mut vm), vec![Token::Char(b'a'), Token::Char(b'b')]);
    }

    #[test]
    fn horizontal_motion() {
        let mut vm = new_vm("\\h'1i'");
        assert_eq!(
            tokenize(&mut vm),
            vec![node(Kind::HorizontalMotion(72000))]
        );
    }

    #[test]
    fn mismatched_delimiter_is_not_fatal() {
        let mut vm = new_vm("\\h'1i|'x");
        assert_eq!(
            tokenize(&mut vm),
            vec![node(Kind::HorizontalMotion(72000)), Token::Char(b'x')]
        );
        assert_eq!(vm.diagnostic_counts(), (1, 0));
    }

    #[test]
    fn size_with_missing_bracket() {
        let mut vm = new_vm("\\s[1\nx");
        assert_eq!(tokenize(&mut vm), vec![Token::Newline, Token::Char(b'x')]);
        assert_eq!(vm.diagnostic_counts(), (0, 1));
    }

    #[test]
    fn size_forms() {
        let mut vm = new_vm("\\s12\\s+2\\s(14\\s[15]\\s0");
        let size = |n| node(Kind::SizeChange(SizeChange::Absolute(n)));
        assert_eq!(
            tokenize(&mut vm),
            vec![
                size(1000),
                Token::Char(b'2'),
                size(12000),
                size(14000),
                size(15000),
                node(Kind::SizeChange(SizeChange::Previous)),
            ]
        );
    }

    #[test]
    fn compatible_two_digit_size() {
        let mut vm = new_vm("\\s12");
        vm.interp_mut().compatible = true;
        assert_eq!(
            tokenize(&mut vm),
            vec![node(Kind::SizeChange(SizeChange::Absolute(12000)))]
        );
    }

    #[test]
    fn fonts() {
        let mut vm = new_vm("\\fB\\f[]\\f2\\fP");
        let b = vm.intern("B");
        assert_eq!(
            tokenize(&mut vm),
            vec![
                node(Kind::FontChange(FontSelection::Name(b))),
                node(Kind::FontChange(FontSelection::Previous)),
                node(Kind::FontChange(FontSelection::Position(2))),
                node(Kind::FontChange(FontSelection::Previous)),
            ]
        );
    }

    #[test]
    fn string_interpolation() {
        let mut vm = new_vm("<\\*[s]>");
        let s = vm.intern("s");
        vm.commands.insert(s, Command::new_macro(Macro::from_text("ab")));
        assert_eq!(
            tokenize(&mut vm),
            vec![
                Token::Char(b'<'),
                Token::Char(b'a'),
                Token::Char(b'b'),
                Token::Char(b'>')
            ]
        );
    }

    #[test]
    fn undefined_register_is_zero() {
        let mut vm = new_vm("\\n[x]");
        assert_eq!(tokenize(&mut vm), vec![Token::Char(b'0')]);
        assert_eq!(vm.diagnostic_counts(), (1, 0));
        let x = vm.intern("x");
        assert_eq!(vm.registers.value(x), Some(0));
    }

    #[test]
    fn register_assignment() {
        let mut vm = new_vm("\\R'x 5'\\R'x +2'\\nx");
        assert_eq!(tokenize(&mut vm), vec![Token::Char(b'7')]);
    }

    #[test]
    fn valid_identifier_test() {
        let mut vm = new_vm("\\A'abc'\\A'a\\ b'");
        assert_eq!(tokenize(&mut vm), vec![Token::Char(b'1'), Token::Char(b'0')]);
    }

    #[test]
    fn valid_number_test() {
        let mut vm = new_vm("\\B'1+2'\\B'1+'\\B'x'");
        assert_eq!(
            tokenize(&mut vm),
            vec![Token::Char(b'1'), Token::Char(b'0'), Token::Char(b'0')]
        );
        assert_eq!(vm.diagnostic_counts(), (0, 0));
    }

    #[test]
    fn width() {
        let mut vm = new_vm("\\w'ab'");
        // Each character is half of a 10 point em.
        assert_eq!(
            tokenize(&mut vm),
            vec![Token::Char(b'1'), Token::Char(b'0'), Token::Char(b'0'), Token::Char(b'0'), Token::Char(b'0')]
        );
    }

    #[test]
    fn non_interpreted_text() {
        let mut vm = new_vm("\\?a\\fB\\?b");
        assert_eq!(
            tokenize(&mut vm),
            vec![
                node(Kind::NonInterpreted(b"a\\fB".to_vec())),
                Token::Char(b'b')
            ]
        );
    }

    #[test]
    fn environment_variable_cannot_inject_control_codes() {
        let mut vm = new_vm("\\V[x]");
        vm.env_var = |name| (name == "x").then(|| "\u{0102}\u{0101}".to_string());
        assert_eq!(
            tokenize(&mut vm),
            vec![Token::Char(0xC4), Token::Char(0xC4)]
        );
        assert_eq!(vm.diagnostic_counts(), (2, 0));
    }

    #[test]
    fn unassigned_control_range_bytes_are_characters() {
        let mut vm = new_vm("");
        vm.push_input(Source::temporary_bytes(&[0o210, 0o213])).unwrap();
        assert_eq!(tokenize(&mut vm), vec![Token::Char(0o210), Token::Char(0o213)]);
    }

    #[test]
    fn control_codes_from_copy_mode() {
        let mut vm = new_vm("");
        vm.push_input(Source::temporary_bytes(&[
            code::ESCAPE_AMPERSAND,
            code::ESCAPE_SPACE,
            code::ESCAPE_LEFT_BRACE,
            code::BEGIN_TRAP,
        ]))
        .unwrap();
        assert_eq!(
            tokenize(&mut vm),
            vec![
                Token::Dummy,
                Token::UnstretchableSpace,
                Token::LeftBrace,
                Token::BeginTrap
            ]
        );
    }

    #[test]
    fn preserved_token_nodes() {
        let mut vm = new_vm("");
        vm.push_token(Token::Indexed(3)).unwrap();
        assert_eq!(tokenize(&mut vm), vec![Token::Indexed(3)]);
    }

    #[test]
    fn draw_command() {
        let mut vm = new_vm("\\D'l 1i 0'");
        assert_eq!(
            tokenize(&mut vm),
            vec![node(Kind::Draw {
                command: b'l',
                arguments: " 1i 0".into()
            })]
        );
    }

    #[test]
    fn rule_with_glyph() {
        let mut vm = new_vm("\\l'1i\\(ru'");
        let ru = vm.intern("ru");
        assert_eq!(
            tokenize(&mut vm),
            vec![node(Kind::Rule {
                vertical: false,
                length: 72000,
                glyph: Some(Token::Special(Glyph::new(ru))),
            })]
        );
    }

    #[test]
    fn bad_starting_delimiter() {
        let mut vm = new_vm("\\h1\nx");
        let tokens = tokenize(&mut vm);
        assert_eq!(vm.diagnostic_counts(), (0, 1));
        assert_eq!(tokens.last(), Some(&Token::Char(b'x')));
    }
}
