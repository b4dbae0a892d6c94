//! Nodes
//!
//! A node is the output primitive produced by an escape sequence that has no
//!     character representation: a motion, a size change, a drawing command and so on.
//! The interpreter never acts on nodes itself.
//! It stores them in macro bodies and diversions and hands them to the environment
//!     when they reach the run loop.
//!
//! Nodes are reference counted so that replaying a macro body is cheap,
//!     and they compare structurally.

use crate::token::{Name, Token};
use std::rc::Rc;

/// A reference counted node.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Node(Rc<Kind>);

impl Node {
    pub fn new(kind: Kind) -> Node {
        Node(Rc::new(kind))
    }

    /// A node that replays as the provided token.
    ///
    /// The tokenizer unwraps these nodes, so storing a token this way in a macro body
    ///     preserves it exactly.
    pub fn from_token(token: Token) -> Node {
        Node::new(Kind::Token(token))
    }

    pub fn kind(&self) -> &Kind {
        &self.0
    }
}

/// Fixed-width spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FixedSpace {
    /// `\|`, one sixth of an em.
    Sixth,
    /// `\^`, one twelfth of an em.
    Twelfth,
    /// `\0`, the width of a digit.
    Digit,
}

/// Argument of `\s`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SizeChange {
    Previous,
    /// New point size in scaled points.
    Absolute(i32),
}

/// Argument of `\f` and `\F`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FontSelection {
    Previous,
    Name(Name),
    Position(i32),
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Kind {
    /// `\h`, in basic units.
    HorizontalMotion(i32),
    /// `\v`, `\u`, `\d` and `\r`, in basic units.
    VerticalMotion(i32),
    FixedSpace(FixedSpace),
    /// `\,`
    LeftItalicCorrection,
    SizeChange(SizeChange),
    FontChange(FontSelection),
    FamilyChange(FontSelection),
    /// `\m` and `\M`; [None] reverts to the previous colour.
    Color { fill: bool, name: Option<Name> },
    /// `\H`, in scaled points; zero resets the height to the point size.
    CharacterHeight(i32),
    /// `\S`, in degrees.
    Slant(i32),
    /// `\x`, in basic units.
    ExtraLineSpace(i32),
    /// `\l` and `\L`.
    Rule {
        vertical: bool,
        length: i32,
        glyph: Option<Token>,
    },
    /// `\D`: the sub-command letter and its unparsed arguments.
    Draw { command: u8, arguments: String },
    /// `\o`
    Overstrike(Vec<Token>),
    /// `\b`
    Bracket(Vec<Token>),
    /// `\z` and `\Z`.
    ZeroWidth(Vec<Token>),
    /// `\X` and `\Y`.
    DeviceControl(Vec<u8>),
    /// `\O`
    Suppression(String),
    /// `\?`: text passed through uninterpreted.
    NonInterpreted(Vec<u8>),
    /// A preserved token.
    Token(Token),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_equality() {
        let a = Node::new(Kind::HorizontalMotion(10));
        let b = Node::new(Kind::HorizontalMotion(10));
        let c = Node::new(Kind::VerticalMotion(10));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn token_nodes() {
        let node = Node::from_token(Token::Space);
        assert_eq!(node.kind(), &Kind::Token(Token::Space));
    }
}
