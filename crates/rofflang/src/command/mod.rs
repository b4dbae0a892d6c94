//! Rofflang commands API
//!
//! Every name that can follow the control character on a request line refers to a
//!     _command_, and there are two kinds of them.
//!
//! |                                      | Request | Macro
//! |--------------------------------------|---------|------
//! | Implemented in                       | Rust    | the document, with `de`, `ds`, `di` and friends
//! | Reads its arguments                  | itself, from the VM | the run loop decodes them into an argument list
//! | Runs                                 | immediately | by pushing an iterator over its body onto the input stack
//!
//! Macros, strings and diversions share one namespace and one representation,
//!     the [Macro](crate::roffmacro::Macro) buffer.

use crate::prelude as rl;
use crate::roffmacro::Macro;
use crate::token::Name;
use crate::vm;
use std::cell::RefCell;
use std::rc::Rc;

pub(crate) mod map;

pub use map::Map;

/// The Rust type of request functions.
///
/// The function is called with the current token just after the request name.
/// It reads its own arguments and is expected to leave the input at the start of the next
///     line, usually by finishing with [crate::parse::skip_line].
pub type RequestFn<S> = fn(name: Name, vm: &mut vm::VM<S>) -> rl::Result<()>;

/// A roff command.
pub enum Command<S> {
    /// A request implemented in Rust.
    ///
    /// Examples: `.de`, `.if`.
    Request(RequestFn<S>),

    /// A macro, string or diversion.
    ///
    /// The cell is shared between all names that alias the same object (see `als`),
    ///     so appending through one name is visible through all of them.
    Macro(Rc<RefCell<Macro>>),
}

impl<S> std::fmt::Display for Command<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Request(_) => write![f, "a request"],
            Command::Macro(m) => {
                let m = m.borrow();
                if m.is_diversion() {
                    write![f, "a diversion"]
                } else if m.is_string() {
                    write![f, "a string"]
                } else {
                    write![f, "a macro"]
                }
            }
        }
    }
}

impl<S> Command<S> {
    pub fn new_macro(m: Macro) -> Command<S> {
        Command::Macro(Rc::new(RefCell::new(m)))
    }

    /// A snapshot of the contents if this is a macro.
    pub fn macro_value(&self) -> Option<Macro> {
        match self {
            Command::Request(_) => None,
            Command::Macro(m) => Some(m.borrow().clone()),
        }
    }
}

// We need to implement Clone manually as the derived implementation requires S to be Clone.
impl<S> Clone for Command<S> {
    fn clone(&self) -> Self {
        match self {
            Command::Request(f) => Command::Request(*f),
            Command::Macro(m) => Command::Macro(m.clone()),
        }
    }
}

/// A built-in command. This is a command provided at VM initialization.
///
/// This struct is simply a combination of a [Command] and a documentation string for the command.
pub struct BuiltIn<S> {
    cmd: Command<S>,
    doc: Option<&'static str>,
}

impl<S> BuiltIn<S> {
    /// Create a new request built-in command.
    pub fn new_request(f: RequestFn<S>) -> BuiltIn<S> {
        f.into()
    }

    /// Create a built-in macro, for example one of the macros of a preloaded package.
    pub fn new_macro(m: Macro) -> BuiltIn<S> {
        Command::new_macro(m).into()
    }

    // Set the doc for this built-in command.
    pub fn with_doc(mut self, doc: &'static str) -> BuiltIn<S> {
        self.doc = Some(doc);
        self
    }

    pub fn cmd(&self) -> &Command<S> {
        &self.cmd
    }

    pub fn doc(&self) -> Option<&'static str> {
        self.doc
    }
}

impl<S> Clone for BuiltIn<S> {
    fn clone(&self) -> Self {
        Self {
            cmd: self.cmd.clone(),
            doc: self.doc,
        }
    }
}

impl<S> From<RequestFn<S>> for BuiltIn<S> {
    fn from(f: RequestFn<S>) -> Self {
        Command::Request(f).into()
    }
}

impl<S> From<Command<S>> for BuiltIn<S> {
    fn from(cmd: Command<S>) -> Self {
        BuiltIn { cmd, doc: None }
    }
}
