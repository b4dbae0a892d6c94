//! # The Rofflang standard library
//!
//! This crate contains implementations of roff requests for Rofflang:
//!     definitions of macros and strings, number registers, conditionals and loops,
//!     file inclusion, traps, diversions and the requests that configure the interpreter.
//!
//! Requests that need state of their own keep it in a component,
//!     and [StdLibState] is a state struct that contains every component.

extern crate roffcraft_stdext;
extern crate rofflang;

use std::collections::HashMap;

use rofflang::command;
use rofflang::error::Diagnostic;
use rofflang::prelude as rl;
use rofflang::roffmacro::Macro;
use rofflang::token::Token;
use rofflang::traits::*;
use rofflang::vm;
use rofflang::vm::implement_has_component;

pub mod chars;
pub mod conditional;
pub mod def;
pub mod diversion;
pub mod invocation;
pub mod io;
pub mod loops;
pub mod output;
pub mod registers;
pub mod strings;
pub mod testing;
pub mod time;
pub mod traps;
pub mod warnings;

/// A state struct that is compatible with every request in the Rofflang standard library.
#[derive(Default)]
pub struct StdLibState {
    pub output: output::Component,
    pub time: time::Component,
    /// Diagnostics reported so far.
    ///
    /// These are only kept if `collect_diagnostics` is true.
    pub diagnostics: Vec<Diagnostic>,
    pub collect_diagnostics: bool,
    /// Whether the `n` condition is true.
    pub nroff: bool,
}

impl RoffState for StdLibState {
    #[inline]
    fn output_handler(token: Token, vm: &mut vm::VM<Self>) -> rl::Result<()> {
        output::output_handler(token, vm)
    }

    #[inline]
    fn newline_handler(vm: &mut vm::VM<Self>) -> rl::Result<()> {
        output::newline_handler(vm)
    }

    #[inline]
    fn blank_line_handler(vm: &mut vm::VM<Self>) -> rl::Result<()> {
        output::blank_line_handler(vm)
    }

    #[inline]
    fn transparent_handler(line: Macro, vm: &mut vm::VM<Self>) -> rl::Result<()> {
        output::transparent_handler(line, vm)
    }

    fn diagnostic_hook(diagnostic: &Diagnostic, vm: &mut vm::VM<Self>) {
        if vm.state.collect_diagnostics {
            vm.state.diagnostics.push(diagnostic.clone());
        }
    }

    fn nroff_mode(&self) -> bool {
        self.nroff
    }
}

implement_has_component![
    StdLibState,
    (output::Component, output),
    (time::Component, time),
];

/// Every request in the standard library.
pub fn built_ins<S: HasComponent<output::Component>>() -> HashMap<&'static str, command::BuiltIn<S>> {
    HashMap::from([
        ("ab", io::get_ab()),
        ("af", registers::get_af()),
        ("als", def::get_als()),
        ("am", def::get_am()),
        ("am1", def::get_am1()),
        ("ami", def::get_ami()),
        ("as", strings::get_as()),
        ("as1", strings::get_as1()),
        //
        ("backtrace", invocation::get_backtrace()),
        ("blm", traps::get_blm()),
        ("box", diversion::get_box()),
        ("boxa", diversion::get_boxa()),
        ("break", loops::get_break()),
        //
        ("c2", chars::get_c2()),
        ("cc", chars::get_cc()),
        ("chop", strings::get_chop()),
        ("continue", loops::get_continue()),
        ("cp", chars::get_cp()),
        //
        ("da", diversion::get_da()),
        ("de", def::get_de()),
        ("de1", def::get_de1()),
        ("dei", def::get_dei()),
        ("di", diversion::get_di()),
        ("do", invocation::get_do()),
        ("ds", strings::get_ds()),
        ("ds1", strings::get_ds1()),
        //
        ("ec", chars::get_ec()),
        ("ecr", chars::get_ecr()),
        ("ecs", chars::get_ecs()),
        ("el", conditional::get_el()),
        ("em", traps::get_em()),
        ("eo", chars::get_eo()),
        ("ex", io::get_ex()),
        //
        ("ie", conditional::get_ie()),
        ("if", conditional::get_if()),
        ("ig", def::get_ig()),
        ("it", traps::get_it()),
        ("itc", traps::get_itc()),
        //
        ("length", strings::get_length()),
        ("lf", io::get_lf()),
        ("lsm", traps::get_lsm()),
        //
        ("nop", conditional::get_nop()),
        ("nr", registers::get_nr()),
        ("nx", io::get_nx()),
        //
        ("pm", invocation::get_pm()),
        //
        ("return", invocation::get_return()),
        ("rm", def::get_rm()),
        ("rn", def::get_rn()),
        ("rnn", registers::get_rnn()),
        ("rr", registers::get_rr()),
        //
        ("shift", invocation::get_shift()),
        ("slimit", invocation::get_slimit()),
        ("so", io::get_so()),
        ("substring", strings::get_substring()),
        //
        ("tm", io::get_tm()),
        ("tm1", io::get_tm1()),
        ("tmc", io::get_tmc()),
        //
        ("warn", warnings::get_warn()),
        ("while", loops::get_while()),
    ])
}

impl StdLibState {
    pub fn all_built_ins() -> HashMap<&'static str, command::BuiltIn<StdLibState>> {
        built_ins()
    }

    /// Create a new VM that uses the standard library's state and all of its requests.
    ///
    /// The registers of the standard library, like `.z` and the time registers, are defined.
    pub fn new_vm() -> Box<vm::VM<StdLibState>> {
        let mut vm = vm::VM::<StdLibState>::new(StdLibState::all_built_ins());
        diversion::define_registers(&mut vm);
        time::set_registers(&mut vm);
        vm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rofflang_testing::*;

    #[derive(Default)]
    struct State {
        output: output::Component,
        testing: TestingComponent,
    }

    impl RoffState for State {
        fn output_handler(token: Token, vm: &mut vm::VM<Self>) -> rl::Result<()> {
            match output::divert(token, vm) {
                None => Ok(()),
                Some(token) => TestingComponent::output_handler(token, vm),
            }
        }

        fn newline_handler(vm: &mut vm::VM<Self>) -> rl::Result<()> {
            Self::output_handler(Token::Newline, vm)
        }

        fn blank_line_handler(vm: &mut vm::VM<Self>) -> rl::Result<()> {
            Self::output_handler(Token::Newline, vm)
        }

        fn transparent_handler(line: Macro, vm: &mut vm::VM<Self>) -> rl::Result<()> {
            match output::divert_transparent(line, vm) {
                None => Ok(()),
                Some(line) => TestingComponent::transparent_handler(line, vm),
            }
        }

        fn diagnostic_hook(diagnostic: &Diagnostic, vm: &mut vm::VM<Self>) {
            TestingComponent::diagnostic_hook(diagnostic, vm)
        }
    }

    implement_has_component![
        State,
        (output::Component, output),
        (TestingComponent, testing),
    ];

    fn custom_vm_initialization(vm: &mut vm::VM<State>) {
        diversion::define_registers(vm);
    }

    test_suite![
        options(
            TestOption::BuiltIns(built_ins),
            TestOption::CustomVMInitialization(custom_vm_initialization),
        ),
        output_equality_tests(
            (
                string_built_from_string,
                ".ds X hello\n.ds Y \\*[X] world\n\\*[Y]\n",
                "hello world\n"
            ),
            (
                arguments_are_scoped_per_invocation,
                ".de inner\n\\\\$1\n..\n.de outer\n.inner z\n\\\\$1\n..\n.outer x\n",
                "z\nx\n"
            ),
            (
                shift_is_argument_offset,
                ".de m\n\\\\$3\n.shift 2\n\\\\$1\n..\n.m a b c\n",
                "c\nc\n"
            ),
            (
                appending_does_not_change_running_macro,
                ".de m\nx1\n.am m END\nx2\n.END\n..\n.m\n.m\n",
                "x1\nx1\nx2\n"
            ),
            (
                while_break_and_continue,
                ".nr i 0 1\n.while \\n+[i]<10 \\{\\\n.if \\n[i]=3 .continue\n.if \\n[i]=5 .break\n\\n[i]\n.\\}\n\\n[i]\n",
                "1\n2\n4\n5\n"
            ),
            (
                conditional_macro_library,
                concat!(
                    ".de greet\n",
                    ".ie \\\\n[.$] Hello, \\\\$1!\n",
                    ".el Hello!\n",
                    "..\n",
                    ".greet\n",
                    ".greet world\n",
                ),
                "Hello!\nHello, world!\n"
            ),
            (
                diversion_of_loop_output,
                ".nr i 0 1\n.di d\n.while \\n+[i]<4 \\n[i]\n.di\nx\n.d\n",
                "x\n1\n2\n3\n"
            ),
            (
                compatibility_mode_macro_package,
                ".cp 1\n.de xx\nin xx\n..\n.do ds long groff\n.xx\n[\\*(lo]\n.cp 0\n\\*[long]\n",
                "in xx\n[]\ngroff\n"
            ),
        ),
        terminal_output_tests(
            (
                condition_on_register,
                ".nr a 1\n.if \\n[a] .tm yes\n",
                "yes\n"
            ),
            (
                condition_on_undefined_register,
                ".if \\n[a] .tm yes\n.tm done\n",
                "done\n"
            ),
        ),
        diagnostic_tests(
            (
                unterminated_size_escape,
                "\\s[1\nafter\n",
                0,
                1
            ),
        ),
        failure_tests(
            (
                recursion_exceeds_stack_limit,
                ".slimit 5\n.de r\n.r\n..\n.r\n"
            ),
        ),
    ];

    #[test]
    fn std_lib_state_collects_output_and_diagnostics() {
        let mut vm = StdLibState::new_vm();
        vm.terminal_out = std::rc::Rc::new(std::cell::RefCell::new(std::io::sink()));
        vm.state.collect_diagnostics = true;
        vm.push_source("doc.roff", ".ds x hi\n\\*x \\n[zz]\n").unwrap();
        let tokens = output::run(&mut vm).unwrap();
        assert_eq!(rofflang::token::write_tokens(&tokens, vm.names()), "hi 0\n");
        assert_eq!(vm.state.diagnostics.len(), 1);
    }

    #[test]
    fn every_built_in_has_documentation() {
        for (name, built_in) in StdLibState::all_built_ins() {
            assert!(built_in.doc().is_some(), "request '{name}' has no documentation");
        }
    }
}
