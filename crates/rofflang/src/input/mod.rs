//! The input stack.
//!
//! All input reaches the tokenizer through a stack of byte sources.
//! Reading a macro pushes an iterator over its body; when the iterator is exhausted
//!     it is popped and reading continues with whatever was below it.
//! An empty stack is the base of the stack and always reads as end of input.
//!
//! Besides files and macro iterators the stack holds _boundaries_.
//! A boundary reads as end of input and is never popped by reading.
//! The `while` request uses a loop boundary to run a nested process loop over its body,
//!     and requests that unwind the stack past a boundary (`return`, `ex`)
//!     replace it with a return boundary so the loop knows to stop.

pub mod file;

use crate::error::{InvariantError, StackLimitError};
use crate::roffmacro::{Cursor, Macro, MacroIterator};
use crate::token::{Name, NameInterner};
pub use file::FileIterator;
use std::rc::Rc;

/// One element read from the input stack.
#[derive(Debug, Clone, PartialEq)]
pub enum Raw {
    Byte(u8),
    Node(crate::node::Node),
    /// A byte from a file that is not allowed in input.
    Invalid(u8),
}

/// A file name and line number.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Location {
    pub file: Rc<str>,
    pub line: usize,
}

impl Location {
    pub fn new(file: &str, line: usize) -> Location {
        Location {
            file: file.into(),
            line,
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// One line of a backtrace.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Frame {
    pub description: String,
    pub location: Option<Location>,
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            None => write!(f, "{}", self.description),
            Some(location) => write!(f, "{} at {}", self.description, location),
        }
    }
}

/// The part of the formatting environment that is saved while a diversion is reread.
///
/// The snapshot is produced by [crate::vm::RoffState::environment_snapshot].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentSnapshot {
    pub font: Option<Name>,
    /// Point size in scaled points.
    pub point_size: i32,
    pub color: Option<Name>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryKind {
    Loop,
    Return,
}

/// A source on the input stack.
#[derive(Debug, Clone)]
pub enum Source {
    File(FileIterator),
    Macro(MacroIterator),
    /// Synthetic input, like the digits of an interpolated register.
    Temporary(Cursor),
    Boundary(BoundaryKind),
}

impl Source {
    /// A temporary source that reads the provided text.
    pub fn temporary(text: &str) -> Source {
        Source::Temporary(Macro::from_text(text).cursor())
    }

    /// A temporary source that reads the provided bytes, which may include control codes.
    pub fn temporary_bytes(bytes: &[u8]) -> Source {
        Source::Temporary(Macro::from_bytes(bytes).cursor())
    }

    fn get(&mut self) -> Option<Raw> {
        match self {
            Source::File(file) => file.get(),
            Source::Macro(iter) => iter.get(),
            Source::Temporary(cursor) => cursor.get(),
            Source::Boundary(_) => None,
        }
    }

    fn peek(&self) -> Option<Raw> {
        match self {
            Source::File(file) => file.peek(),
            Source::Macro(iter) => iter.peek(),
            Source::Temporary(cursor) => cursor.peek(),
            Source::Boundary(_) => None,
        }
    }

    pub fn boundary_kind(&self) -> Option<BoundaryKind> {
        match self {
            Source::Boundary(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Source::File(_))
    }

    pub fn is_diversion(&self) -> bool {
        match self {
            Source::Macro(iter) => iter.is_diversion(),
            _ => false,
        }
    }

    /// Whether the source is a macro invocation frame, the unit `return` unwinds.
    pub fn is_macro(&self) -> bool {
        self.has_args()
    }

    pub fn has_args(&self) -> bool {
        match self {
            Source::Macro(iter) => iter.args().is_some(),
            _ => false,
        }
    }

    pub fn location(&self) -> Option<Location> {
        match self {
            Source::File(file) => Some(file.location()),
            Source::Macro(iter) => iter.location().cloned(),
            Source::Temporary(_) | Source::Boundary(_) => None,
        }
    }

    fn frame(&self, names: &NameInterner) -> Option<Frame> {
        match self {
            Source::File(file) => Some(Frame {
                description: format!("file '{}'", file.name()),
                location: Some(file.location()),
            }),
            Source::Macro(iter) => {
                let name = iter.name().and_then(|name| names.resolve(name));
                Some(iter.frame(name))
            }
            Source::Temporary(_) | Source::Boundary(_) => None,
        }
    }
}

/// The stack of input sources.
#[derive(Debug)]
pub struct Stack {
    sources: Vec<Source>,
    limit: usize,
    diversion_level: usize,
    environment: Option<EnvironmentSnapshot>,
}

impl Default for Stack {
    fn default() -> Self {
        Stack::new(Stack::DEFAULT_LIMIT)
    }
}

impl Stack {
    pub const DEFAULT_LIMIT: usize = 1000;

    /// Create an empty stack whose depth may not exceed `limit`.
    ///
    /// A limit of zero means no limit.
    pub fn new(limit: usize) -> Stack {
        Stack {
            sources: vec![],
            limit,
            diversion_level: 0,
            environment: None,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit;
    }

    /// Number of sources on the stack.
    pub fn level(&self) -> usize {
        self.sources.len()
    }

    /// Number of diversions currently being reread.
    pub fn diversion_level(&self) -> usize {
        self.diversion_level
    }

    /// The environment snapshot taken when the innermost diversion was pushed.
    pub fn environment(&self) -> Option<&EnvironmentSnapshot> {
        self.environment.as_ref()
    }

    /// Push a source.
    ///
    /// When the source rereads a diversion, `environment` is called to take the snapshot
    ///     that is current while the diversion is read.
    pub fn push<F>(&mut self, mut source: Source, environment: F) -> Result<(), StackLimitError>
    where
        F: FnOnce() -> EnvironmentSnapshot,
    {
        if self.limit > 0 && self.sources.len() + 1 > self.limit {
            return Err(StackLimitError { limit: self.limit });
        }
        if let Source::Macro(iter) = &mut source {
            if iter.is_diversion() {
                self.diversion_level += 1;
                let previous = std::mem::replace(&mut self.environment, Some(environment()));
                iter.swap_environment(previous);
            }
        }
        tracing::debug!(level = self.sources.len() + 1, "push input source");
        self.sources.push(source);
        Ok(())
    }

    fn pop(&mut self) -> Option<Source> {
        let mut source = self.sources.pop()?;
        if let Source::Macro(iter) = &mut source {
            if iter.is_diversion() {
                self.diversion_level -= 1;
                self.environment = iter.swap_environment(None);
            }
        }
        tracing::debug!(level = self.sources.len(), "pop input source");
        Some(source)
    }

    /// Read the next element.
    ///
    /// Exhausted sources are popped.
    /// Returns [None] at a boundary or when the stack is empty.
    pub fn get(&mut self) -> Option<Raw> {
        loop {
            let top = self.sources.last_mut()?;
            if top.boundary_kind().is_some() {
                return None;
            }
            if let Some(raw) = top.get() {
                return Some(raw);
            }
            self.pop();
        }
    }

    /// Return the next element without consuming it.
    ///
    /// Like [Stack::get], exhausted sources are popped.
    pub fn peek(&mut self) -> Option<Raw> {
        loop {
            let top = self.sources.last()?;
            if top.boundary_kind().is_some() {
                return None;
            }
            if let Some(raw) = top.peek() {
                return Some(raw);
            }
            self.pop();
        }
    }

    fn push_boundary(&mut self, kind: BoundaryKind) -> Result<(), StackLimitError> {
        tracing::trace!(?kind, "add boundary");
        self.push(Source::Boundary(kind), EnvironmentSnapshot::default)
    }

    pub fn add_boundary(&mut self) -> Result<(), StackLimitError> {
        self.push_boundary(BoundaryKind::Loop)
    }

    pub fn add_return_boundary(&mut self) -> Result<(), StackLimitError> {
        self.push_boundary(BoundaryKind::Return)
    }

    /// Remove the top-most boundary.
    pub fn remove_boundary(&mut self) -> Result<(), InvariantError> {
        let Some(i) = self
            .sources
            .iter()
            .rposition(|source| source.boundary_kind().is_some())
        else {
            return Err(InvariantError::new(
                "attempted to remove an input boundary but there is none",
            ));
        };
        tracing::trace!(level = i + 1, "remove boundary");
        self.sources.remove(i);
        Ok(())
    }

    /// Whether the top of the stack is a return boundary.
    pub fn is_return_boundary(&self) -> bool {
        matches!(
            self.sources.last(),
            Some(Source::Boundary(BoundaryKind::Return))
        )
    }

    fn re_add_return_boundaries(&mut self, n: usize) {
        for _ in 0..n {
            // Unwinding only ever lowers the depth, so these pushes cannot exceed the limit.
            self.sources.push(Source::Boundary(BoundaryKind::Return));
        }
    }

    /// Unwind up to and including the nearest macro frame.
    ///
    /// The bottom-most source is never popped.
    /// Every boundary crossed is replaced by a return boundary on top of the stack.
    pub fn pop_macro(&mut self) {
        let mut boundaries = 0;
        while self.sources.len() > 1 {
            let Some(source) = self.pop() else {
                break;
            };
            if source.boundary_kind().is_some() {
                boundaries += 1;
            }
            if source.is_macro() {
                break;
            }
        }
        self.re_add_return_boundaries(boundaries);
    }

    /// Unwind everything, leaving one return boundary for each boundary removed.
    pub fn clear(&mut self) {
        let mut boundaries = 0;
        while let Some(source) = self.pop() {
            if source.boundary_kind().is_some() {
                boundaries += 1;
            }
        }
        self.re_add_return_boundaries(boundaries);
    }

    /// Remove the nearest file source, wherever it is in the stack.
    pub fn end_file(&mut self) {
        if let Some(i) = self.sources.iter().rposition(Source::is_file) {
            self.sources.remove(i);
        }
    }

    /// Replace the nearest file source with a new file.
    ///
    /// If there is no file source the new file is pushed.
    pub fn next_file(&mut self, file: FileIterator) -> Result<(), StackLimitError> {
        match self.sources.iter().rposition(Source::is_file) {
            Some(i) => {
                self.sources[i] = Source::File(file);
                Ok(())
            }
            None => self.push(Source::File(file), EnvironmentSnapshot::default),
        }
    }

    fn nearest_macro(&self) -> Option<&MacroIterator> {
        self.sources.iter().rev().find_map(|source| match source {
            Source::Macro(iter) if iter.args().is_some() => Some(iter),
            _ => None,
        })
    }

    fn nearest_macro_mut(&mut self) -> Option<&mut MacroIterator> {
        self.sources.iter_mut().rev().find_map(|source| match source {
            Source::Macro(iter) if iter.args().is_some() => Some(iter),
            _ => None,
        })
    }

    /// Name of the nearest macro frame.
    pub fn macro_name(&self) -> Option<Name> {
        self.nearest_macro().and_then(MacroIterator::name)
    }

    /// Argument `n` of the nearest macro frame, counting from one.
    pub fn get_arg(&self, n: usize) -> Option<Macro> {
        let arg = self.nearest_macro()?.args()?.get(n)?;
        Some(arg.value.clone())
    }

    /// Arguments of the nearest macro frame.
    pub fn args(&self) -> Option<&crate::roffmacro::ArgList> {
        self.nearest_macro()?.args()
    }

    /// Number of arguments of the nearest macro frame, or zero outside a macro.
    pub fn nargs(&self) -> usize {
        self.args().map(|args| args.len()).unwrap_or(0)
    }

    /// Shift the arguments of the nearest macro frame by `n`.
    pub fn shift(&mut self, n: usize) {
        if let Some(args) = self.nearest_macro_mut().and_then(MacroIterator::args_mut) {
            args.shift(n);
        }
    }

    /// Whether the nearest macro frame was invoked with the control character.
    pub fn break_flag(&self) -> bool {
        self.nearest_macro()
            .map(MacroIterator::break_flag)
            .unwrap_or(false)
    }

    /// Location of the nearest source that has one.
    pub fn location(&self) -> Option<Location> {
        self.sources.iter().rev().find_map(Source::location)
    }

    /// Change the location reported by the nearest file.
    ///
    /// Returns false if there is no file on the stack.
    pub fn set_location(&mut self, name: Option<&str>, line: usize) -> bool {
        for source in self.sources.iter_mut().rev() {
            if let Source::File(file) = source {
                file.set_location(name, line);
                return true;
            }
        }
        false
    }

    /// One frame per file or macro on the stack, innermost first.
    pub fn backtrace(&self, names: &NameInterner) -> Vec<Frame> {
        self.sources
            .iter()
            .rev()
            .filter_map(|source| source.frame(names))
            .collect()
    }
}
