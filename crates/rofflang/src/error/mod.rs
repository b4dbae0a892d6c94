//! Error handling
//!
//! Rofflang distinguishes two kinds of problems with the input.
//!
//! Most problems are _diagnostics_: a warning in one of the maskable [Warning] categories
//!     or an error message.
//! A diagnostic is reported through the VM (see [crate::vm::VM::warning] and
//!     [crate::vm::VM::error]) and processing continues.
//!
//! A few conditions are fatal: exceeding the input stack limit, an internal invariant violation,
//!     an explicit abort from the document, or an initial input file that cannot be read.
//! These are returned as a boxed [Error] through the [crate::prelude::Result] type
//!     and end the run.

use crate::input::{Frame, Location};

pub mod display;

/// Implementations of this trait describe a fatal error.
pub trait RoffError: std::fmt::Debug + 'static {
    fn title(&self) -> String;

    fn notes(&self) -> Vec<String> {
        vec![]
    }
}

/// A fatal error together with where in the input it happened.
#[derive(Debug)]
pub struct Error {
    pub error: Box<dyn RoffError>,
    /// Location of the innermost source with a location, if any.
    pub location: Option<Location>,
    /// The input stack at the time of the error, innermost frame first.
    pub backtrace: Vec<Frame>,
}

impl Error {
    pub fn new<E: RoffError>(error: E, location: Option<Location>, backtrace: Vec<Frame>) -> Box<Error> {
        Box::new(Error {
            error: Box::new(error),
            location,
            backtrace,
        })
    }

    pub fn title(&self) -> String {
        self.error.title()
    }
}

impl<E: RoffError> From<E> for Box<Error> {
    fn from(error: E) -> Self {
        Error::new(error, None, vec![])
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        display::format_error(f, self)
    }
}

/// The input stack grew beyond its configured limit.
///
/// This is almost always caused by unbounded macro recursion.
#[derive(Debug)]
pub struct StackLimitError {
    pub limit: usize,
}

impl RoffError for StackLimitError {
    fn title(&self) -> String {
        format!("input stack limit of {} levels exceeded", self.limit)
    }

    fn notes(&self) -> Vec<String> {
        vec![
            "this is probably caused by infinite macro recursion".into(),
            "the limit can be changed with the `slimit` request".into(),
        ]
    }
}

/// An internal invariant of the interpreter does not hold.
#[derive(Debug)]
pub struct InvariantError {
    pub description: String,
}

impl InvariantError {
    pub fn new<T: Into<String>>(description: T) -> InvariantError {
        InvariantError {
            description: description.into(),
        }
    }
}

impl RoffError for InvariantError {
    fn title(&self) -> String {
        format!("internal invariant violated: {}", self.description)
    }
}

/// The document asked for processing to stop, with the `ab` request.
#[derive(Debug)]
pub struct AbortError {
    pub message: String,
}

impl RoffError for AbortError {
    fn title(&self) -> String {
        self.message.clone()
    }
}

/// A file that must be read could not be.
#[derive(Debug)]
pub struct FileError {
    pub path: std::path::PathBuf,
    pub source: std::io::Error,
}

impl RoffError for FileError {
    fn title(&self) -> String {
        format!("cannot open '{}': {}", self.path.display(), self.source)
    }
}

macro_rules! warnings {
    ( $( ($variant: ident, $name: expr, $bit: expr), )+ ) => {
        /// Category of a warning.
        ///
        /// Each category can be enabled or disabled independently with the `warn` request.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub enum Warning {
            $( $variant, )+
        }

        impl Warning {
            pub const ALL: &'static [Warning] = &[ $( Warning::$variant, )+ ];

            /// Bit of the category in the warning mask.
            pub fn bit(self) -> u32 {
                match self {
                    $( Warning::$variant => $bit, )+
                }
            }

            /// Name of the category, as used in diagnostics and on the command line.
            pub fn name(self) -> &'static str {
                match self {
                    $( Warning::$variant => $name, )+
                }
            }

            pub fn from_name(name: &str) -> Option<Warning> {
                match name {
                    $( $name => Some(Warning::$variant), )+
                    _ => None,
                }
            }
        }
    };
}

warnings!(
    (Char, "char", 1),
    (Number, "number", 2),
    (Break, "break", 4),
    (Delim, "delim", 8),
    (El, "el", 16),
    (Scale, "scale", 32),
    (Range, "range", 64),
    (Syntax, "syntax", 128),
    (Di, "di", 256),
    (Mac, "mac", 512),
    (Reg, "reg", 1024),
    (Tab, "tab", 2048),
    (RightBrace, "right-brace", 4096),
    (Missing, "missing", 8192),
    (Input, "input", 16384),
    (Escape, "escape", 32768),
    (Space, "space", 65536),
    (Font, "font", 131072),
    (Ig, "ig", 262144),
    (Color, "color", 524288),
    (File, "file", 1048576),
);

/// The set of enabled warning categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WarningMask(pub u32);

impl Default for WarningMask {
    fn default() -> Self {
        WarningMask::DEFAULT
    }
}

impl WarningMask {
    pub const DEFAULT: WarningMask = WarningMask(1 | 2 | 4 | 65536 | 131072 | 1048576);
    pub const NONE: WarningMask = WarningMask(0);
    pub const EVERY: WarningMask = WarningMask((1 << 21) - 1);

    pub fn is_enabled(self, warning: Warning) -> bool {
        self.0 & warning.bit() != 0
    }

    pub fn enable(&mut self, warning: Warning) {
        self.0 |= warning.bit();
    }

    pub fn disable(&mut self, warning: Warning) {
        self.0 &= !warning.bit();
    }

    /// The mask for a name given on the command line.
    ///
    /// Besides the category names this understands `w`, every category,
    ///     and `all`, every category except `di`, `mac` and `reg`.
    pub fn for_name(name: &str) -> Option<WarningMask> {
        match name {
            "w" => Some(WarningMask::EVERY),
            "all" => Some(WarningMask(
                WarningMask::EVERY.0 & !(Warning::Di.bit() | Warning::Mac.bit() | Warning::Reg.bit()),
            )),
            _ => Warning::from_name(name).map(|w| WarningMask(w.bit())),
        }
    }
}

/// Severity of a recoverable diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Severity {
    Warning(Warning),
    Error,
}

/// A recoverable problem with the input.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub location: Option<Location>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mask() {
        let mask = WarningMask::default();
        assert!(mask.is_enabled(Warning::Char));
        assert!(mask.is_enabled(Warning::File));
        assert!(!mask.is_enabled(Warning::Mac));
        assert!(!mask.is_enabled(Warning::Delim));
    }

    #[test]
    fn names_round_trip() {
        for warning in Warning::ALL {
            assert_eq!(Warning::from_name(warning.name()), Some(*warning));
        }
    }

    #[test]
    fn all_excludes_noisy_categories() {
        let all = WarningMask::for_name("all").unwrap();
        assert!(all.is_enabled(Warning::Escape));
        assert!(!all.is_enabled(Warning::Mac));
        assert!(WarningMask::for_name("w").unwrap().is_enabled(Warning::Mac));
        assert_eq!(WarningMask::for_name("bogus"), None);
    }

    #[test]
    fn enable_and_disable() {
        let mut mask = WarningMask::NONE;
        mask.enable(Warning::Mac);
        assert!(mask.is_enabled(Warning::Mac));
        mask.disable(Warning::Mac);
        assert_eq!(mask, WarningMask::NONE);
    }
}
