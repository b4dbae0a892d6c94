//! Byte sources backed by files.

use super::{Location, Raw};
use crate::token::code;
use std::rc::Rc;

/// Reads the contents of a file, or a named in-memory buffer, byte by byte.
///
/// The iterator tracks the current line.
/// A line number advances when the first byte after a newline is read,
///     so diagnostics raised while handling the newline still refer to the line it ends.
#[derive(Debug, Clone)]
pub struct FileIterator {
    name: Rc<str>,
    contents: Rc<[u8]>,
    pos: usize,
    line: usize,
    pending_newline: bool,
}

impl FileIterator {
    pub fn new<T: Into<Vec<u8>>>(name: &str, contents: T) -> FileIterator {
        FileIterator {
            name: name.into(),
            contents: contents.into().into(),
            pos: 0,
            line: 1,
            pending_newline: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn classify(c: u8) -> Raw {
        if code::is_invalid_input(c) {
            Raw::Invalid(c)
        } else {
            Raw::Byte(c)
        }
    }

    pub fn get(&mut self) -> Option<Raw> {
        if self.pending_newline {
            self.pending_newline = false;
            self.line += 1;
        }
        let c = *self.contents.get(self.pos)?;
        self.pos += 1;
        if c == b'\n' {
            self.pending_newline = true;
        }
        Some(FileIterator::classify(c))
    }

    pub fn peek(&self) -> Option<Raw> {
        self.contents
            .get(self.pos)
            .copied()
            .map(FileIterator::classify)
    }

    pub fn location(&self) -> Location {
        Location {
            file: self.name.clone(),
            line: self.line,
        }
    }

    /// Change the name and line number reported for the current line.
    pub fn set_location(&mut self, name: Option<&str>, line: usize) {
        if let Some(name) = name {
            self.name = name.into();
        }
        self.line = line;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_advance_after_newline() {
        let mut file = FileIterator::new("doc", "a\nb");
        assert_eq!(file.get(), Some(Raw::Byte(b'a')));
        assert_eq!(file.location().line, 1);
        assert_eq!(file.get(), Some(Raw::Byte(b'\n')));
        assert_eq!(file.location().line, 1);
        assert_eq!(file.get(), Some(Raw::Byte(b'b')));
        assert_eq!(file.location().line, 2);
        assert_eq!(file.get(), None);
    }

    #[test]
    fn invalid_bytes_are_flagged() {
        let mut file = FileIterator::new("doc", vec![b'a', 0o16, 0o240]);
        assert_eq!(file.get(), Some(Raw::Byte(b'a')));
        assert_eq!(file.peek(), Some(Raw::Invalid(0o16)));
        assert_eq!(file.get(), Some(Raw::Invalid(0o16)));
        assert_eq!(file.get(), Some(Raw::Byte(0o240)));
    }

    #[test]
    fn set_location() {
        let mut file = FileIterator::new("doc", "a\nb\n");
        file.get();
        file.get();
        file.set_location(Some("other"), 9);
        file.get();
        assert_eq!(file.location(), Location::new("other", 10));
    }
}
