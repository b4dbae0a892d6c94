//! Roff tokens.
//!
//! The tokenizer in [crate::vm::tokenizer] turns the raw bytes and nodes of the input stack
//!     into the [Token] values defined here.
//! Every token carries its payload inside the variant, so a token can only ever
//!     have the payload that matches its kind.
//! Equality is structural.

pub mod code;

use crate::node::Node;
use roffcraft_stdext::collections::interner;
use std::num;
use std::rc::Rc;

/// Interned identifier of a macro, string, register, special character or other named object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Name(num::NonZeroU32);

/// String interner for names.
pub type NameInterner = interner::Interner<Name>;

impl interner::Key for Name {
    fn from_position(position: usize) -> Option<Self> {
        <num::NonZeroU32 as interner::Key>::from_position(position).map(Name)
    }

    fn position(self) -> usize {
        interner::Key::position(self.0)
    }
}

/// A special character reference, like `\(em` or `\[u0041 u0300]`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Glyph {
    pub name: Name,
    /// Parameters given after the name inside brackets, for composite glyphs.
    pub parameters: Rc<[Name]>,
}

impl Glyph {
    pub fn new(name: Name) -> Glyph {
        Glyph {
            name,
            parameters: Rc::new([]),
        }
    }
}

/// A roff token.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Token {
    /// A literal character.
    Char(u8),
    /// A special character, `\(xx`, `\[name]` or `\C'name'`.
    Special(Glyph),
    /// An indexed glyph, `\N'n'`.
    Indexed(i32),
    /// An opaque node produced by an escape sequence.
    Node(Node),

    Space,
    /// `\~`
    StretchableSpace,
    /// `\ `
    UnstretchableSpace,
    Tab,
    /// Leader character, `\a` or a raw 0x01 byte.
    Leader,
    Newline,
    Backspace,

    /// `\&`
    Dummy,
    /// `\)`
    TransparentDummy,
    /// `\k`: store the current horizontal position in the named register.
    MarkInput(Name),
    /// `\/`
    ItalicCorrection,
    /// `\%`
    HyphenIndicator,
    /// `\:`
    ZeroWidthBreak,

    /// Start of a sprung trap macro.
    BeginTrap,
    /// End of a sprung trap macro.
    EndTrap,
    PageEjector,
    Eof,
    /// The token before any input has been read.
    #[default]
    Empty,

    /// `\{`
    LeftBrace,
    /// `\}`
    RightBrace,
    /// `\c`
    Interrupt,
    /// `\p`
    Spread,
    /// `\e`: the current escape character as a printable glyph.
    Escape,
    /// `\!`
    Transparent,
}

impl Token {
    /// The character of an ordinary character token.
    ///
    /// Every other token has no character.
    /// This is the test used when reading names and numbers:
    ///     only ordinary characters can be part of them.
    #[inline]
    pub fn ch(&self) -> Option<u8> {
        match self {
            Token::Char(c) => Some(*c),
            _ => None,
        }
    }

    #[inline]
    pub fn is_space(&self) -> bool {
        matches!(self, Token::Space)
    }

    /// Whether the token is a space or a tab.
    #[inline]
    pub fn is_white_space(&self) -> bool {
        matches!(self, Token::Space | Token::Tab)
    }

    #[inline]
    pub fn is_newline(&self) -> bool {
        matches!(self, Token::Newline)
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, Token::Eof)
    }

    /// Whether the token ends the current input line.
    #[inline]
    pub fn is_line_end(&self) -> bool {
        matches!(self, Token::Newline | Token::Eof)
    }

    /// A human readable description of the token, used in diagnostics.
    pub fn description(&self, names: &NameInterner) -> String {
        match self {
            Token::Char(c) => match *c {
                0x20..=0x7e => format!("character '{}'", *c as char),
                c => format!("character code {c}"),
            },
            Token::Special(glyph) => format!(
                "special character '{}'",
                names.resolve(glyph.name).unwrap_or_default()
            ),
            Token::Indexed(n) => format!("indexed character {n}"),
            Token::Node(_) => "a node".into(),
            Token::Space => "a space".into(),
            Token::StretchableSpace => "an adjustable space escape sequence".into(),
            Token::UnstretchableSpace => "an unadjustable space escape sequence".into(),
            Token::Tab => "a tab character".into(),
            Token::Leader => "a leader character".into(),
            Token::Newline => "a newline".into(),
            Token::Backspace => "a backspace character".into(),
            Token::Dummy => "a dummy character".into(),
            Token::TransparentDummy => "a transparent dummy character".into(),
            Token::MarkInput(_) => "a horizontal position mark".into(),
            Token::ItalicCorrection => "an italic correction".into(),
            Token::HyphenIndicator => "a hyphenation indicator".into(),
            Token::ZeroWidthBreak => "a zero-width break point".into(),
            Token::BeginTrap => "a begin trap marker".into(),
            Token::EndTrap => "an end trap marker".into(),
            Token::PageEjector => "a page ejector".into(),
            Token::Eof => "end of input".into(),
            Token::Empty => "an empty token".into(),
            Token::LeftBrace => "a left brace escape sequence".into(),
            Token::RightBrace => "a right brace escape sequence".into(),
            Token::Interrupt => "an interrupt escape sequence".into(),
            Token::Spread => "a spread escape sequence".into(),
            Token::Escape => "a printable escape character".into(),
            Token::Transparent => "a transparent line escape sequence".into(),
        }
    }

    /// Encode the token back into source text that tokenizes to an equal token.
    ///
    /// Returns [None] for tokens with no source representation:
    ///     nodes, the structural markers, and every escape sequence when
    ///     escapes are disabled (`escape` is [None]).
    pub fn to_source(&self, escape: Option<u8>, names: &NameInterner) -> Option<String> {
        let plain = |s: &str| Some(s.to_string());
        match self {
            Token::Char(c) => {
                if Some(*c) == escape {
                    let e = *c as char;
                    return Some(format!("{e}{e}"));
                }
                if !c.is_ascii() || code::is_invalid_input(*c) || matches!(*c, b'\n' | b' ' | b'\t' | 0x01 | 0x08)
                {
                    return None;
                }
                Some(String::from_utf8_lossy(&[*c]).into_owned())
            }
            Token::Space => plain(" "),
            Token::Tab => plain("\t"),
            Token::Newline => plain("\n"),
            Token::Backspace => plain("\u{8}"),
            _ => {
                let e = escape? as char;
                let escaped = |s: &str| Some(format!("{e}{s}"));
                match self {
                    Token::Special(glyph) => {
                        let mut words = vec![names.resolve(glyph.name)?];
                        for parameter in glyph.parameters.iter() {
                            words.push(names.resolve(*parameter)?);
                        }
                        if words
                            .iter()
                            .any(|w| w.is_empty() || w.contains([']', ' ', '\n']))
                        {
                            return None;
                        }
                        Some(format!("{e}[{}]", words.join(" ")))
                    }
                    Token::Indexed(n) => Some(format!("{e}N'{n}'")),
                    Token::MarkInput(name) => {
                        let name = names.resolve(*name)?;
                        if name.is_empty() || name.contains([']', ' ', '\n']) {
                            return None;
                        }
                        Some(format!("{e}k[{name}]"))
                    }
                    Token::StretchableSpace => escaped("~"),
                    Token::UnstretchableSpace => escaped(" "),
                    Token::Leader => escaped("a"),
                    Token::Dummy => escaped("&"),
                    Token::TransparentDummy => escaped(")"),
                    Token::ItalicCorrection => escaped("/"),
                    Token::HyphenIndicator => escaped("%"),
                    Token::ZeroWidthBreak => escaped(":"),
                    Token::LeftBrace => escaped("{"),
                    Token::RightBrace => escaped("}"),
                    Token::Interrupt => escaped("c"),
                    Token::Spread => escaped("p"),
                    Token::Escape => escaped("e"),
                    Token::Transparent => escaped("!"),
                    _ => None,
                }
            }
        }
    }
}

/// Render tokens as plain text.
///
/// Characters and whitespace are written as themselves,
///     special characters as their escape form, and every other token is dropped.
/// This is the rendering used by the text output of the standard library.
pub fn write_tokens<'a, T>(tokens: T, names: &NameInterner) -> String
where
    T: IntoIterator<Item = &'a Token>,
{
    let mut bytes = Vec::new();
    for token in tokens {
        match token {
            Token::Char(c) => bytes.push(*c),
            Token::Space | Token::StretchableSpace | Token::UnstretchableSpace => bytes.push(b' '),
            Token::Tab => bytes.push(b'\t'),
            Token::Newline => bytes.push(b'\n'),
            Token::Escape => bytes.push(b'\\'),
            Token::Special(_) | Token::Indexed(_) => {
                if let Some(source) = token.to_source(Some(b'\\'), names) {
                    bytes.extend_from_slice(source.as_bytes());
                }
            }
            _ => {}
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn special_to_source() {
        let mut names: NameInterner = Default::default();
        let em = names.get_or_intern("em");
        let token = Token::Special(Glyph::new(em));
        assert_eq!(token.to_source(Some(b'\\'), &names), Some("\\[em]".to_string()));
        assert_eq!(token.to_source(Some(b'@'), &names), Some("@[em]".to_string()));
        assert_eq!(token.to_source(None, &names), None);
    }

    #[test]
    fn special_with_parameters_to_source() {
        let mut names: NameInterner = Default::default();
        let token = Token::Special(Glyph {
            name: names.get_or_intern("u0041"),
            parameters: vec![names.get_or_intern("u0300")].into(),
        });
        assert_eq!(
            token.to_source(Some(b'\\'), &names),
            Some("\\[u0041 u0300]".to_string())
        );
    }

    #[test]
    fn escape_character_is_doubled() {
        let names: NameInterner = Default::default();
        assert_eq!(
            Token::Char(b'\\').to_source(Some(b'\\'), &names),
            Some("\\\\".to_string())
        );
        assert_eq!(
            Token::Char(b'\\').to_source(Some(b'@'), &names),
            Some("\\".to_string())
        );
    }

    #[test]
    fn structural_tokens_have_no_source() {
        let names: NameInterner = Default::default();
        for token in [Token::Eof, Token::BeginTrap, Token::EndTrap, Token::Empty] {
            assert_eq!(token.to_source(Some(b'\\'), &names), None);
        }
    }

    #[test]
    fn payload_is_part_of_equality() {
        assert_eq!(Token::Char(b'a'), Token::Char(b'a'));
        assert_ne!(Token::Char(b'a'), Token::Char(b'b'));
        assert_ne!(Token::Indexed(1), Token::Char(1));
    }

    #[test]
    fn write_tokens_renders_text() {
        let names: NameInterner = Default::default();
        let tokens = vec![
            Token::Char(b'h'),
            Token::Char(b'i'),
            Token::Space,
            Token::Dummy,
            Token::Char(b'!'),
            Token::Newline,
        ];
        assert_eq!(write_tokens(&tokens, &names), "hi !\n");
    }
}
