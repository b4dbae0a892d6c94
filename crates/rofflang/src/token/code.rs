//! Control codes.
//!
//! Copy mode stores some escape sequences in macro bodies as single bytes from ranges that can
//!     never appear in input files, so that the body can be re-tokenized later even if the
//!     escape character has changed in the meantime.
//! The same ranges carry the compatibility-mode markers.

/// `\?`
pub const ESCAPE_QUESTION: u8 = 0o15;
pub const BEGIN_TRAP: u8 = 0o16;
pub const END_TRAP: u8 = 0o17;
pub const PAGE_EJECTOR: u8 = 0o20;
/// Escaped newline inside a macro definition.
pub const ESCAPE_NEWLINE: u8 = 0o21;
pub const ESCAPE_AMPERSAND: u8 = 0o22;
pub const ESCAPE_UNDERSCORE: u8 = 0o23;
pub const ESCAPE_BAR: u8 = 0o24;
pub const ESCAPE_CIRCUMFLEX: u8 = 0o25;
pub const ESCAPE_LEFT_BRACE: u8 = 0o26;
pub const ESCAPE_RIGHT_BRACE: u8 = 0o27;
pub const ESCAPE_LEFT_QUOTE: u8 = 0o30;
pub const ESCAPE_RIGHT_QUOTE: u8 = 0o31;
pub const ESCAPE_HYPHEN: u8 = 0o32;
pub const ESCAPE_BANG: u8 = 0o33;
/// `\c`
pub const ESCAPE_INTERRUPT: u8 = 0o34;
/// `\e`
pub const ESCAPE_PRINTABLE: u8 = 0o35;
pub const ESCAPE_PERCENT: u8 = 0o36;
pub const ESCAPE_SPACE: u8 = 0o37;

pub const ESCAPE_TILDE: u8 = 0o200;
pub const ESCAPE_COLON: u8 = 0o201;
/// Save the compatibility flag and turn compatibility mode off.
pub const PUSH_GROFF_MODE: u8 = 0o202;
/// Save the compatibility flag and turn compatibility mode on.
pub const PUSH_COMPAT_MODE: u8 = 0o203;
/// Restore the most recently saved compatibility flag.
pub const POP_MODE: u8 = 0o204;
pub const ESCAPE_RIGHT_PARENTHESIS: u8 = 0o205;
/// `\E`, an escape character that is not interpreted in copy mode.
pub const ESCAPE_UNINTERPRETED: u8 = 0o206;

/// Whether the byte is rejected when it appears in an input file.
///
/// These are the bytes that would otherwise be confused with control codes.
pub fn is_invalid_input(c: u8) -> bool {
    matches!(c, 0 | 0o13 | 0o15..=0o37 | 0o200..=0o237)
}

/// A printable form of a byte read in copy mode, used when writing to the terminal.
///
/// Control codes are written as the escape sequence they stand for.
pub fn asciify(c: u8) -> Option<&'static str> {
    Some(match c {
        ESCAPE_QUESTION => "\\?",
        ESCAPE_AMPERSAND => "\\&",
        ESCAPE_RIGHT_PARENTHESIS => "\\)",
        ESCAPE_UNDERSCORE => "\\_",
        ESCAPE_BAR => "\\|",
        ESCAPE_CIRCUMFLEX => "\\^",
        ESCAPE_LEFT_BRACE => "\\{",
        ESCAPE_RIGHT_BRACE => "\\}",
        ESCAPE_LEFT_QUOTE => "\\`",
        ESCAPE_RIGHT_QUOTE => "\\'",
        ESCAPE_HYPHEN => "\\-",
        ESCAPE_BANG => "\\!",
        ESCAPE_INTERRUPT => "\\c",
        ESCAPE_PRINTABLE => "\\e",
        ESCAPE_PERCENT => "\\%",
        ESCAPE_SPACE => "\\ ",
        ESCAPE_TILDE => "\\~",
        ESCAPE_COLON => "\\:",
        ESCAPE_UNINTERPRETED => "\\E",
        ESCAPE_NEWLINE | PUSH_GROFF_MODE | PUSH_COMPAT_MODE | POP_MODE | BEGIN_TRAP
        | END_TRAP | PAGE_EJECTOR => "",
        _ => return None,
    })
}
