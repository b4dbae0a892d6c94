//! Formatting of diagnostics and fatal errors for the terminal.

use super::{Diagnostic, Error, Severity};
use roffcraft_stdext::color::Colorize;
use std::fmt::Write;

/// Format a diagnostic on one line, followed by one line per note.
///
/// The format is `program:file:line: warning [category]: message`,
///     with the location omitted when the diagnostic has none.
pub fn format_diagnostic(program: &str, diagnostic: &Diagnostic) -> String {
    let mut s = String::new();
    _ = write!(s, "{program}:");
    if let Some(location) = &diagnostic.location {
        _ = write!(s, "{location}:");
    }
    match diagnostic.severity {
        Severity::Warning(warning) => {
            _ = write!(
                s,
                " {} [{}]: ",
                "warning".bold().yellow(),
                warning.name()
            );
        }
        Severity::Error => {
            _ = write!(s, " {}: ", "error".bold().red());
        }
    }
    s.push_str(&diagnostic.message);
    for note in &diagnostic.notes {
        _ = write!(s, "\n  {} {note}", "note:".bold());
    }
    s
}

pub(crate) fn format_error(f: &mut std::fmt::Formatter<'_>, error: &Error) -> std::fmt::Result {
    write!(f, "{}: {}", "fatal error".bold().red(), error.error.title())?;
    if let Some(location) = &error.location {
        write!(f, "\n  {} {location}", "-->".bright_blue())?;
    }
    for note in error.error.notes() {
        write!(f, "\n  {} {note}", "= note:".bold())?;
    }
    if !error.backtrace.is_empty() {
        write!(f, "\n{}", "backtrace:".dimmed())?;
        for frame in &error.backtrace {
            write!(f, "\n  {frame}")?;
        }
    }
    Ok(())
}

#[cfg(all(test, not(feature = "color")))]
mod tests {
    use super::*;
    use crate::error::Warning;
    use crate::input::Location;

    #[test]
    fn warning_with_location() {
        let diagnostic = Diagnostic {
            severity: Severity::Warning(Warning::Mac),
            message: "macro 'xx' not defined".into(),
            location: Some(Location::new("doc.roff", 3)),
            notes: vec![],
        };
        assert_eq!(
            format_diagnostic("roffcraft", &diagnostic),
            "roffcraft:doc.roff:3: warning [mac]: macro 'xx' not defined"
        );
    }

    #[test]
    fn error_without_location() {
        let diagnostic = Diagnostic {
            severity: Severity::Error,
            message: "bad".into(),
            location: None,
            notes: vec!["did you mean 'de'?".into()],
        };
        assert_eq!(
            format_diagnostic("roffcraft", &diagnostic),
            "roffcraft: error: bad\n  note: did you mean 'de'?"
        );
    }
}
