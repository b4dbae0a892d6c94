//! Macro buffers, argument lists and macro iterators.
//!
//! A [Macro] is the storage behind every macro, string and diversion.
//! It is a sequence of elements, each either a byte or a [Node].
//! Nodes are kept in a separate list; each node occupies a zero byte in the byte list,
//!     and the two lists are replayed in lockstep.
//!
//! The contents live in a reference counted snapshot, and a macro value is the snapshot plus
//!     a logical length.
//! Copying a macro is therefore cheap, and a running [MacroIterator] keeps its own
//!     copy of the macro it is replaying.
//! Appending to a macro whose snapshot is shared, or whose snapshot extends past its
//!     logical length, first makes a private copy truncated to the logical length.
//! This is what makes
//! ```roff
//! .de xx
//! .am xx
//! ..
//! ..
//! ```
//! and similar self-modifying definitions safe: the running iterator never sees the append.

use crate::input::{EnvironmentSnapshot, Frame, Location, Raw};
use crate::node::Node;
use crate::token::Name;
use std::collections::VecDeque;
use std::rc::Rc;

#[derive(Debug, Clone, Default)]
struct Body {
    bytes: Vec<u8>,
    nodes: Vec<Node>,
}

/// Copy-on-write buffer of bytes and nodes.
#[derive(Debug, Clone, Default)]
pub struct Macro {
    body: Rc<Body>,
    len: usize,
    node_len: usize,
    location: Option<Location>,
    is_diversion: bool,
    contains_newline: bool,
}

impl Macro {
    pub fn new() -> Macro {
        Default::default()
    }

    /// Create an empty macro that records where it was defined.
    pub fn with_location(location: Option<Location>) -> Macro {
        Macro {
            location,
            ..Default::default()
        }
    }

    pub fn from_text(text: &str) -> Macro {
        Macro::from_bytes(text.as_bytes())
    }

    pub fn from_bytes(bytes: &[u8]) -> Macro {
        let mut m = Macro::new();
        for b in bytes {
            m.append_byte(*b);
        }
        m
    }

    /// Number of elements, counting each node as one.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether no newline has been appended to the macro.
    ///
    /// Strings defined with `ds` are single lines; macro bodies end with a newline.
    pub fn is_string(&self) -> bool {
        !self.contains_newline
    }

    pub fn is_diversion(&self) -> bool {
        self.is_diversion
    }

    pub fn set_diversion(&mut self, is_diversion: bool) {
        self.is_diversion = is_diversion;
    }

    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    /// The bytes of the macro, with a zero byte in the place of each node.
    pub fn bytes(&self) -> &[u8] {
        &self.body.bytes[..self.len]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.body.nodes[..self.node_len]
    }

    /// Whether two macro values share the same snapshot.
    pub fn shares_body_with(&self, other: &Macro) -> bool {
        Rc::ptr_eq(&self.body, &other.body)
    }

    fn body_mut(&mut self) -> &mut Body {
        let private_and_exact =
            Rc::strong_count(&self.body) == 1 && self.body.bytes.len() == self.len;
        if !private_and_exact {
            self.body = Rc::new(Body {
                bytes: self.bytes().to_vec(),
                nodes: self.nodes().to_vec(),
            });
        }
        Rc::make_mut(&mut self.body)
    }

    /// Append a byte.
    ///
    /// The zero byte is reserved as the node placeholder and is ignored.
    pub fn append_byte(&mut self, b: u8) {
        if b == 0 {
            return;
        }
        self.body_mut().bytes.push(b);
        self.len += 1;
        if b == b'\n' {
            self.contains_newline = true;
        }
    }

    pub fn append_node(&mut self, node: Node) {
        let body = self.body_mut();
        body.bytes.push(0);
        body.nodes.push(node);
        self.len += 1;
        self.node_len += 1;
    }

    pub fn append(&mut self, raw: Raw) {
        match raw {
            Raw::Byte(b) | Raw::Invalid(b) => self.append_byte(b),
            Raw::Node(node) => self.append_node(node),
        }
    }

    pub fn append_str(&mut self, s: &str) {
        for b in s.bytes() {
            self.append_byte(b);
        }
    }

    /// Append all of the elements of another macro.
    pub fn append_macro(&mut self, other: &Macro) {
        let mut cursor = other.cursor();
        while let Some(raw) = cursor.get() {
            self.append(raw);
        }
    }

    /// Remove the last element.
    pub fn chop(&mut self) {
        let Some(last) = self.bytes().last().copied() else {
            return;
        };
        self.len -= 1;
        if last == 0 {
            self.node_len -= 1;
        }
        self.contains_newline = self.bytes().contains(&b'\n');
    }

    /// The elements in the half-open range `[start, end)` as a new macro.
    pub fn substring(&self, start: usize, end: usize) -> Macro {
        let mut result = Macro::new();
        let mut cursor = self.cursor();
        let mut i = 0_usize;
        while let Some(raw) = cursor.get() {
            if i >= end {
                break;
            }
            if i >= start {
                result.append(raw);
            }
            i += 1;
        }
        result
    }

    /// The bytes of the macro as text, with nodes dropped.
    pub fn text(&self) -> String {
        let bytes: Vec<u8> = self.bytes().iter().copied().filter(|b| *b != 0).collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// A cursor that replays the macro from the start.
    pub fn cursor(&self) -> Cursor {
        Cursor {
            body: self.body.clone(),
            len: self.len,
            pos: 0,
            node_pos: 0,
        }
    }
}

/// Read position in a macro snapshot.
#[derive(Debug, Clone)]
pub struct Cursor {
    body: Rc<Body>,
    len: usize,
    pos: usize,
    node_pos: usize,
}

impl Cursor {
    fn element(&self) -> Option<Raw> {
        if self.pos >= self.len {
            return None;
        }
        match self.body.bytes[self.pos] {
            0 => self.body.nodes.get(self.node_pos).cloned().map(Raw::Node),
            b => Some(Raw::Byte(b)),
        }
    }

    pub fn get(&mut self) -> Option<Raw> {
        let raw = self.element()?;
        if let Raw::Node(_) = raw {
            self.node_pos += 1;
        }
        self.pos += 1;
        Some(raw)
    }

    pub fn peek(&self) -> Option<Raw> {
        self.element()
    }
}

/// One macro argument.
#[derive(Debug, Clone, Default)]
pub struct Arg {
    pub value: Macro,
    /// Whether the argument was followed by a space on the request line.
    pub space_follows: bool,
    /// Whether the argument was written in double quotes.
    pub quoted: bool,
}

/// The arguments of a macro invocation.
#[derive(Debug, Clone, Default)]
pub struct ArgList(VecDeque<Arg>);

impl ArgList {
    pub fn push(&mut self, arg: Arg) {
        self.0.push_back(arg);
    }

    /// Argument `n`, counting from one.
    pub fn get(&self, n: usize) -> Option<&Arg> {
        self.0.get(n.checked_sub(1)?)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Drop the first `n` arguments, or all of them if there are fewer.
    pub fn shift(&mut self, n: usize) {
        let n = n.min(self.0.len());
        self.0.drain(..n);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arg> {
        self.0.iter()
    }
}

/// How a macro iterator came to be on the input stack.
///
/// This determines whether it answers argument queries and how it appears in backtraces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invocation {
    /// A macro called from a request line or with `\*[name args]`.
    Macro,
    /// A macro sprung as a trap.
    Trap,
    /// A string interpolated with `\*`.
    String,
    /// A diversion being reread.
    Diversion,
    /// One iteration of a `while` body.
    WhileBody,
    /// A macro argument interpolated with `\$`.
    Argument,
}

/// Replays a macro on the input stack.
#[derive(Debug, Clone)]
pub struct MacroIterator {
    name: Option<Name>,
    invocation: Invocation,
    cursor: Cursor,
    location: Option<Location>,
    pending_newline: bool,
    args: Option<ArgList>,
    break_flag: bool,
    is_diversion: bool,
    saved_environment: Option<EnvironmentSnapshot>,
}

impl MacroIterator {
    /// Iterator for a macro invocation, which has arguments.
    pub fn new_macro(
        name: Name,
        m: &Macro,
        args: ArgList,
        break_flag: bool,
        invocation: Invocation,
    ) -> MacroIterator {
        let mut iter = MacroIterator::new_string(Some(name), m, invocation);
        iter.args = Some(args);
        iter.break_flag = break_flag;
        iter
    }

    /// Iterator with no arguments, used for strings, loop bodies and similar.
    pub fn new_string(name: Option<Name>, m: &Macro, invocation: Invocation) -> MacroIterator {
        let location = m.location().map(|location| {
            let mut location = location.clone();
            if !m.is_string() {
                location.line += 1;
            }
            location
        });
        MacroIterator {
            name,
            invocation,
            cursor: m.cursor(),
            location,
            pending_newline: false,
            args: None,
            break_flag: false,
            is_diversion: m.is_diversion(),
            saved_environment: None,
        }
    }

    pub fn get(&mut self) -> Option<Raw> {
        if self.pending_newline {
            self.pending_newline = false;
            if let Some(location) = &mut self.location {
                location.line += 1;
            }
        }
        let raw = self.cursor.get()?;
        if let Raw::Byte(b'\n') = raw {
            self.pending_newline = true;
        }
        Some(raw)
    }

    pub fn peek(&self) -> Option<Raw> {
        self.cursor.peek()
    }

    pub fn name(&self) -> Option<Name> {
        self.name
    }

    pub fn invocation(&self) -> Invocation {
        self.invocation
    }

    /// The arguments, if this iterator is a macro invocation.
    pub fn args(&self) -> Option<&ArgList> {
        self.args.as_ref()
    }

    pub fn args_mut(&mut self) -> Option<&mut ArgList> {
        self.args.as_mut()
    }

    /// Whether the macro was called with the control character rather than the
    ///     no-break control character.
    pub fn break_flag(&self) -> bool {
        self.break_flag
    }

    pub fn is_diversion(&self) -> bool {
        self.is_diversion
    }

    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    pub fn set_location(&mut self, location: Location) {
        self.location = Some(location);
    }

    pub(crate) fn swap_environment(&mut self, snapshot: Option<EnvironmentSnapshot>) -> Option<EnvironmentSnapshot> {
        std::mem::replace(&mut self.saved_environment, snapshot)
    }

    pub(crate) fn frame(&self, name: Option<&str>) -> Frame {
        let kind = match self.invocation {
            Invocation::Macro => "macro",
            Invocation::Trap => "trap-invoked macro",
            Invocation::String => "string",
            Invocation::Diversion => "diversion",
            Invocation::WhileBody => "while loop",
            Invocation::Argument => "macro argument",
        };
        let description = match name {
            Some(name) => format!("{kind} '{name}'"),
            None => kind.to_string(),
        };
        Frame {
            description,
            location: self.location.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Kind;

    fn collect(m: &Macro) -> Vec<Raw> {
        let mut cursor = m.cursor();
        let mut result = vec![];
        while let Some(raw) = cursor.get() {
            result.push(raw);
        }
        result
    }

    #[test]
    fn append_after_copy_does_not_affect_copy() {
        let mut a = Macro::from_text("hello");
        let b = a.clone();
        assert!(a.shares_body_with(&b));
        a.append_str(" world");
        assert_eq!(a.text(), "hello world");
        assert_eq!(b.text(), "hello");
        assert!(!a.shares_body_with(&b));
    }

    #[test]
    fn running_cursor_does_not_see_appends() {
        let mut m = Macro::from_text("ab");
        let mut cursor = m.cursor();
        m.append_str("cd");
        let mut seen = vec![];
        while let Some(raw) = cursor.get() {
            seen.push(raw);
        }
        assert_eq!(seen, vec![Raw::Byte(b'a'), Raw::Byte(b'b')]);
        assert_eq!(m.text(), "abcd");
    }

    #[test]
    fn append_to_truncated_snapshot() {
        let mut a = Macro::from_text("abc");
        a.chop();
        let b = a.clone();
        a.append_str("x");
        assert_eq!(a.text(), "abx");
        assert_eq!(b.text(), "ab");
    }

    #[test]
    fn nodes_replay_in_lockstep() {
        let mut m = Macro::new();
        let n1 = Node::new(Kind::HorizontalMotion(1));
        let n2 = Node::new(Kind::VerticalMotion(2));
        m.append_byte(b'a');
        m.append_node(n1.clone());
        m.append_byte(b'b');
        m.append_node(n2.clone());
        assert_eq!(m.len(), 4);
        assert_eq!(
            collect(&m),
            vec![
                Raw::Byte(b'a'),
                Raw::Node(n1),
                Raw::Byte(b'b'),
                Raw::Node(n2)
            ]
        );
    }

    #[test]
    fn chop_removes_node() {
        let mut m = Macro::from_text("a");
        m.append_node(Node::new(Kind::HorizontalMotion(1)));
        m.chop();
        assert_eq!(collect(&m), vec![Raw::Byte(b'a')]);
        assert!(m.nodes().is_empty());
    }

    #[test]
    fn substring_counts_nodes() {
        let mut m = Macro::from_text("ab");
        let n = Node::new(Kind::HorizontalMotion(1));
        m.append_node(n.clone());
        m.append_str("cd");
        let sub = m.substring(1, 4);
        assert_eq!(
            collect(&sub),
            vec![Raw::Byte(b'b'), Raw::Node(n), Raw::Byte(b'c')]
        );
    }

    #[test]
    fn is_string() {
        let mut m = Macro::from_text("text");
        assert!(m.is_string());
        m.append_byte(b'\n');
        assert!(!m.is_string());
        m.chop();
        assert!(m.is_string());
    }

    #[test]
    fn zero_bytes_are_ignored() {
        let mut m = Macro::new();
        m.append_byte(0);
        assert!(m.is_empty());
    }

    #[test]
    fn arg_list_shift() {
        let mut args = ArgList::default();
        for s in ["a", "b", "c"] {
            args.push(Arg {
                value: Macro::from_text(s),
                ..Default::default()
            });
        }
        assert_eq!(args.get(2).unwrap().value.text(), "b");
        args.shift(1);
        assert_eq!(args.len(), 2);
        assert_eq!(args.get(1).unwrap().value.text(), "b");
        args.shift(10);
        assert!(args.is_empty());
        assert!(args.get(0).is_none());
    }

    #[test]
    fn iterator_tracks_lines() {
        let mut m = Macro::with_location(Some(Location::new("doc", 10)));
        m.append_str("a\nb\n");
        let mut iter = MacroIterator::new_string(None, &m, Invocation::Macro);
        assert_eq!(iter.location().unwrap().line, 11);
        iter.get();
        iter.get();
        assert_eq!(iter.location().unwrap().line, 11);
        iter.get();
        assert_eq!(iter.location().unwrap().line, 12);
    }
}
