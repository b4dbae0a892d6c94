//! # Rofflang: a roff language interpreter.
//!
//! This crate implements the input side of a troff-like formatter:
//!     the stack of byte sources, macro buffers and their iterators,
//!     the escape-sequence tokenizer, the copy-mode reader,
//!     number expressions, traps and the main run loop.
//! Requests are not defined here; the `rofflang-stdlib` crate provides them.
//!
//! The formatter environment that consumes the token stream is a collaborator reached
//!     through the hooks of the [RoffState](vm::RoffState) trait.

extern crate roffcraft_stdext;

pub mod command;
pub mod error;
pub mod input;
pub mod node;
pub mod parse;
pub mod prelude;
pub mod register;
pub mod roffmacro;
pub mod token;
pub mod vm;

/// Module that re-exports all of the crate's traits.
///
/// This is useful for getting all of the traits in scope in a Rust module:
/// ```
/// use rofflang::traits::*;
/// ```
pub mod traits {
    pub use super::error::RoffError;
    pub use super::vm::HasComponent;
    pub use super::vm::RoffState;
}
