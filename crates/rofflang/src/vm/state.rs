//! Interpreter state.

use crate::error::WarningMask;
use crate::token::Name;

/// An input-line trap, set with `it` and `itc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputTrap {
    /// Number of text lines left before the trap springs.
    pub lines: i32,
    pub macro_name: Name,
    /// Whether lines ended with `\c` are not counted (`itc`).
    pub continued: bool,
}

/// Why a control character could not be set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collision {
    Escape,
    Control,
    NoBreakControl,
}

impl Collision {
    pub fn description(self) -> &'static str {
        match self {
            Collision::Escape => "the escape character",
            Collision::Control => "the control character",
            Collision::NoBreakControl => "the no-break control character",
        }
    }
}

/// The process-wide state of the interpreter.
///
/// Everything the requests of the language configure globally lives here,
///     in one explicitly owned value.
#[derive(Debug, Clone)]
pub struct InterpreterState {
    escape_char: Option<u8>,
    saved_escape_char: u8,
    control_char: u8,
    no_break_control_char: u8,

    /// Compatibility mode (`cp`, `-C`).
    pub compatible: bool,
    /// Saved values of the compatibility flag, pushed by `de1`, `ds1`, `do` and friends.
    pub compatible_stack: Vec<bool>,

    pub warning_mask: WarningMask,

    /// Results of `ie` conditions that are waiting for their `el`.
    pub if_else_stack: Vec<bool>,
    /// Number of `while` loops currently running.
    pub loop_depth: usize,
    /// Set by `break`; checked by `while` after each iteration.
    pub loop_break: bool,

    pub end_macro: Option<Name>,
    pub blank_line_macro: Option<Name>,
    pub leading_space_macro: Option<Name>,
    pub input_trap: Option<InputTrap>,
    pub(crate) postponed_trap: Option<Name>,
    pub(crate) postpone_depth: usize,

    /// Set by `\c`; the current input line does not end at its newline.
    pub interrupted: bool,
    /// Whether the previous text line ended with `\c`.
    pub prev_line_interrupted: bool,

    /// Set while reading the body of `ig`: copy-mode errors become `ig` warnings.
    pub ignoring: bool,
    /// Set by `ex`; the run ends after the end macro.
    pub exiting: bool,
    pub(crate) end_macro_run: bool,

    /// Write a backtrace after every diagnostic (`-b`).
    pub backtrace_on_diagnostics: bool,
}

impl Default for InterpreterState {
    fn default() -> Self {
        InterpreterState {
            escape_char: Some(b'\\'),
            saved_escape_char: b'\\',
            control_char: b'.',
            no_break_control_char: b'\'',
            compatible: false,
            compatible_stack: vec![],
            warning_mask: WarningMask::DEFAULT,
            if_else_stack: vec![],
            loop_depth: 0,
            loop_break: false,
            end_macro: None,
            blank_line_macro: None,
            leading_space_macro: None,
            input_trap: None,
            postponed_trap: None,
            postpone_depth: 0,
            interrupted: false,
            prev_line_interrupted: false,
            ignoring: false,
            exiting: false,
            end_macro_run: false,
            backtrace_on_diagnostics: false,
        }
    }
}

impl InterpreterState {
    /// The escape character, or [None] if escapes are disabled with `eo`.
    #[inline]
    pub fn escape_char(&self) -> Option<u8> {
        self.escape_char
    }

    #[inline]
    pub fn control_char(&self) -> u8 {
        self.control_char
    }

    #[inline]
    pub fn no_break_control_char(&self) -> u8 {
        self.no_break_control_char
    }

    #[inline]
    pub fn is_control_char(&self, c: u8) -> bool {
        c == self.control_char || c == self.no_break_control_char
    }

    fn check(&self, c: u8, allowed: Collision) -> Result<(), Collision> {
        if allowed != Collision::Escape && Some(c) == self.escape_char {
            return Err(Collision::Escape);
        }
        if allowed != Collision::Control && c == self.control_char {
            return Err(Collision::Control);
        }
        if allowed != Collision::NoBreakControl && c == self.no_break_control_char {
            return Err(Collision::NoBreakControl);
        }
        Ok(())
    }

    /// Set or disable the escape character.
    pub fn set_escape_char(&mut self, c: Option<u8>) -> Result<(), Collision> {
        if let Some(c) = c {
            self.check(c, Collision::Escape)?;
        }
        self.escape_char = c;
        Ok(())
    }

    pub fn set_control_char(&mut self, c: u8) -> Result<(), Collision> {
        self.check(c, Collision::Control)?;
        self.control_char = c;
        Ok(())
    }

    pub fn set_no_break_control_char(&mut self, c: u8) -> Result<(), Collision> {
        self.check(c, Collision::NoBreakControl)?;
        self.no_break_control_char = c;
        Ok(())
    }

    /// Save the escape character, for `ecs`.
    pub fn save_escape_char(&mut self) {
        self.saved_escape_char = self.escape_char.unwrap_or(b'\\');
    }

    /// Restore the saved escape character, for `ecr`.
    pub fn restore_escape_char(&mut self) -> Result<(), Collision> {
        self.set_escape_char(Some(self.saved_escape_char))
    }

    /// Save the compatibility flag and set a new value.
    pub fn push_compatible(&mut self, compatible: bool) {
        self.compatible_stack.push(self.compatible);
        self.compatible = compatible;
    }

    /// Restore the most recently saved compatibility flag.
    pub fn pop_compatible(&mut self) {
        if let Some(compatible) = self.compatible_stack.pop() {
            self.compatible = compatible;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let state = InterpreterState::default();
        assert_eq!(state.escape_char(), Some(b'\\'));
        assert!(state.is_control_char(b'.'));
        assert!(state.is_control_char(b'\''));
        assert!(!state.is_control_char(b'a'));
    }

    #[test]
    fn collisions_are_rejected() {
        let mut state = InterpreterState::default();
        assert_eq!(state.set_control_char(b'\''), Err(Collision::NoBreakControl));
        assert_eq!(state.set_escape_char(Some(b'.')), Err(Collision::Control));
        assert_eq!(state.set_no_break_control_char(b'\\'), Err(Collision::Escape));
        assert_eq!(state.control_char(), b'.');
        assert_eq!(state.set_control_char(b'.'), Ok(()));
    }

    #[test]
    fn disabled_escape_does_not_collide() {
        let mut state = InterpreterState::default();
        state.set_escape_char(None).unwrap();
        assert_eq!(state.set_control_char(b'\\'), Ok(()));
    }

    #[test]
    fn save_and_restore_escape() {
        let mut state = InterpreterState::default();
        state.set_escape_char(Some(b'@')).unwrap();
        state.save_escape_char();
        state.set_escape_char(Some(b'!')).unwrap();
        state.restore_escape_char().unwrap();
        assert_eq!(state.escape_char(), Some(b'@'));
    }

    #[test]
    fn compatible_stack() {
        let mut state = InterpreterState::default();
        state.push_compatible(true);
        state.push_compatible(false);
        assert!(!state.compatible);
        state.pop_compatible();
        assert!(state.compatible);
        state.pop_compatible();
        assert!(!state.compatible);
        state.pop_compatible();
        assert!(!state.compatible);
    }
}
