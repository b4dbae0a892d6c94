//! Roff as a macro processor
//!
//! This module collects the tokens that reach the formatter environment instead of
//!     typesetting them, so that documents can be run as scripts and their output
//!     compared or printed.
//! The output can be converted to a string using [rofflang::token::write_tokens].
//!
//! Output is routed into the innermost open diversion when there is one.
//! Diversions are opened and closed by the requests in the [diversion](crate::diversion) module.

use rofflang::prelude as rl;
use rofflang::roffmacro::Macro;
use rofflang::node::Node;
use rofflang::token::{Name, Token};
use rofflang::traits::*;
use rofflang::vm::VM;

/// A diversion that is being collected.
#[derive(Debug)]
pub struct Diversion {
    pub name: Name,
    pub contents: Macro,
}

#[derive(Default)]
pub struct Component {
    tokens: Vec<Token>,
    diversions: Vec<Diversion>,
}

impl Component {
    /// The innermost open diversion.
    pub fn current_diversion(&self) -> Option<&Diversion> {
        self.diversions.last()
    }

    pub fn push_diversion(&mut self, diversion: Diversion) {
        self.diversions.push(diversion);
    }

    pub fn pop_diversion(&mut self) -> Option<Diversion> {
        self.diversions.pop()
    }

    /// Remove and return the output collected so far.
    pub fn take_tokens(&mut self) -> Vec<Token> {
        std::mem::take(&mut self.tokens)
    }
}

/// Append a token to the innermost diversion.
///
/// Returns the token back if no diversion is open.
/// Newlines are stored as bytes so that a reread diversion has the same lines.
pub fn divert<S: HasComponent<Component>>(token: Token, vm: &mut VM<S>) -> Option<Token> {
    let diversion = vm.state.component_mut().diversions.last_mut()?;
    match token {
        Token::Newline => diversion.contents.append_byte(b'\n'),
        token => diversion.contents.append_node(Node::from_token(token)),
    }
    None
}

/// Append a transparent line to the innermost diversion.
///
/// The line is stored as input, so it is interpreted when the diversion is reread.
/// Returns the line back if no diversion is open.
pub fn divert_transparent<S: HasComponent<Component>>(line: Macro, vm: &mut VM<S>) -> Option<Macro> {
    match vm.state.component_mut().diversions.last_mut() {
        None => Some(line),
        Some(diversion) => {
            diversion.contents.append_macro(&line);
            None
        }
    }
}

pub fn output_handler<S: HasComponent<Component>>(token: Token, vm: &mut VM<S>) -> rl::Result<()> {
    if let Some(token) = divert(token, vm) {
        vm.state.component_mut().tokens.push(token);
    }
    Ok(())
}

pub fn newline_handler<S: HasComponent<Component>>(vm: &mut VM<S>) -> rl::Result<()> {
    output_handler(Token::Newline, vm)
}

/// A blank line is output as an empty line.
pub fn blank_line_handler<S: HasComponent<Component>>(vm: &mut VM<S>) -> rl::Result<()> {
    output_handler(Token::Newline, vm)
}

/// Outside of diversions, transparent lines are output verbatim.
pub fn transparent_handler<S: HasComponent<Component>>(line: Macro, vm: &mut VM<S>) -> rl::Result<()> {
    let Some(line) = divert_transparent(line, vm) else {
        return Ok(());
    };
    let tokens = &mut vm.state.component_mut().tokens;
    for b in line.text().bytes() {
        tokens.push(match b {
            b'\n' => Token::Newline,
            b' ' => Token::Space,
            b => Token::Char(b),
        });
    }
    Ok(())
}

/// Run the VM and return its output as a list of tokens.
pub fn run<S: HasComponent<Component>>(vm: &mut VM<S>) -> rl::Result<Vec<Token>> {
    vm.run()?;
    let component = vm.state.component_mut();
    if !component.diversions.is_empty() {
        tracing::debug!(open = component.diversions.len(), "input ended inside a diversion");
    }
    Ok(component.take_tokens())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rofflang::vm::implement_has_component;
    use std::collections::HashMap;

    #[derive(Default)]
    struct State {
        output: Component,
    }

    impl RoffState for State {
        fn output_handler(token: Token, vm: &mut VM<Self>) -> rl::Result<()> {
            output_handler(token, vm)
        }

        fn newline_handler(vm: &mut VM<Self>) -> rl::Result<()> {
            newline_handler(vm)
        }

        fn blank_line_handler(vm: &mut VM<Self>) -> rl::Result<()> {
            blank_line_handler(vm)
        }

        fn transparent_handler(line: Macro, vm: &mut VM<Self>) -> rl::Result<()> {
            transparent_handler(line, vm)
        }
    }

    implement_has_component![State, (Component, output),];

    fn run_source(source: &str) -> String {
        let mut vm = VM::<State>::new(HashMap::new());
        vm.push_source("doc.roff", source).unwrap();
        let tokens = run(&mut vm).unwrap();
        rofflang::token::write_tokens(&tokens, vm.names())
    }

    #[test]
    fn collects_text() {
        assert_eq!(run_source("hello world\nsecond\n"), "hello world\nsecond\n");
    }

    #[test]
    fn blank_and_transparent_lines() {
        assert_eq!(run_source("a\n\n\\!b c\n"), "a\n\nb c\n");
    }

    #[test]
    fn diverted_tokens_are_not_output() {
        let mut vm = VM::<State>::new(HashMap::new());
        let name = vm.intern("d");
        vm.state.output.push_diversion(Diversion {
            name,
            contents: Macro::new(),
        });
        vm.push_source("doc.roff", "ab\n").unwrap();
        let tokens = run(&mut vm).unwrap();
        assert!(tokens.is_empty());
        let diversion = vm.state.output.pop_diversion().unwrap();
        assert_eq!(diversion.name, name);
        assert_eq!(diversion.contents.len(), 3);
        assert_eq!(diversion.contents.bytes().last(), Some(&b'\n'));
    }
}
