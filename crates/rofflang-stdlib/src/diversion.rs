//! Diversions
//!
//! A diversion redirects output into a macro instead of the output stream.
//! Diversions nest: `di` opens a new one on top of the current one and `di` without
//!     arguments closes the innermost diversion, storing its contents under its name.
//! The stored diversion is an ordinary macro and is reread by invoking it.
//!
//! The output itself is collected by the [output](crate::output) component,
//!     which also holds the stack of open diversions.
//! The formatter environment does not keep a partially collected output line,
//!     so `box` and `boxa` divert exactly what `di` and `da` do.

use crate::output;
use rofflang::command;
use rofflang::error::Warning;
use rofflang::parse;
use rofflang::prelude as rl;
use rofflang::roffmacro::Macro;
use rofflang::token::Name;
use rofflang::traits::*;
use rofflang::vm::VM;

pub const DI_DOC: &str = "Divert output to a macro; without an argument, end the current diversion";
pub const DA_DOC: &str = "Divert output, appending to a macro; without an argument, end the current diversion";
pub const BOX_DOC: &str = "Divert output to a macro, without the pending output line";
pub const BOXA_DOC: &str = "Divert output, appending to a macro, without the pending output line";

/// Get the `di` request.
pub fn get_di<S: HasComponent<output::Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(di_fn).with_doc(DI_DOC)
}

/// Get the `da` request.
pub fn get_da<S: HasComponent<output::Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(da_fn).with_doc(DA_DOC)
}

/// Get the `box` request.
pub fn get_box<S: HasComponent<output::Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(di_fn).with_doc(BOX_DOC)
}

/// Get the `boxa` request.
pub fn get_boxa<S: HasComponent<output::Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(da_fn).with_doc(BOXA_DOC)
}

/// Define the read-only `.z` register, which holds the name of the current diversion.
pub fn define_registers<S: HasComponent<output::Component>>(vm: &mut VM<S>) {
    vm.define_computed_register(".z", current_diversion_name::<S>);
}

fn current_diversion_name<S: HasComponent<output::Component>>(vm: &VM<S>) -> String {
    match vm.state.component().current_diversion() {
        None => String::new(),
        Some(diversion) => vm.name_str(diversion.name).to_string(),
    }
}

fn di_fn<S: HasComponent<output::Component>>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    divert(vm, false)
}

fn da_fn<S: HasComponent<output::Component>>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    divert(vm, true)
}

fn divert<S: HasComponent<output::Component>>(vm: &mut VM<S>, append: bool) -> rl::Result<()> {
    match parse::get_name(vm)? {
        None => end_diversion(vm),
        Some(name) => {
            let contents = if append {
                vm.commands.get_macro(name).unwrap_or_default()
            } else {
                let mut empty = Macro::new();
                empty.set_diversion(true);
                vm.commands.update_macro(name, empty.clone());
                empty
            };
            tracing::debug!(name = vm.name_str(name), append, "begin diversion");
            vm.state
                .component_mut()
                .push_diversion(output::Diversion { name, contents });
        }
    }
    parse::skip_line(vm)
}

fn end_diversion<S: HasComponent<output::Component>>(vm: &mut VM<S>) {
    match vm.state.component_mut().pop_diversion() {
        None => vm.warning(Warning::Di, "diversion stack underflow"),
        Some(output::Diversion { name, mut contents }) => {
            tracing::debug!(name = vm.name_str(name), len = contents.len(), "end diversion");
            contents.set_diversion(true);
            vm.commands.update_macro(name, contents);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::def;
    use crate::io;
    use rofflang::error::Diagnostic;
    use rofflang::token::Token;
    use rofflang::vm::implement_has_component;
    use rofflang_testing::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct State {
        output: output::Component,
        testing: TestingComponent,
    }

    impl RoffState for State {
        fn output_handler(token: Token, vm: &mut VM<Self>) -> rl::Result<()> {
            match output::divert(token, vm) {
                None => Ok(()),
                Some(token) => TestingComponent::output_handler(token, vm),
            }
        }

        fn newline_handler(vm: &mut VM<Self>) -> rl::Result<()> {
            Self::output_handler(Token::Newline, vm)
        }

        fn blank_line_handler(vm: &mut VM<Self>) -> rl::Result<()> {
            Self::output_handler(Token::Newline, vm)
        }

        fn transparent_handler(line: Macro, vm: &mut VM<Self>) -> rl::Result<()> {
            match output::divert_transparent(line, vm) {
                None => Ok(()),
                Some(line) => TestingComponent::transparent_handler(line, vm),
            }
        }

        fn diagnostic_hook(diagnostic: &Diagnostic, vm: &mut VM<Self>) {
            TestingComponent::diagnostic_hook(diagnostic, vm)
        }
    }

    implement_has_component![
        State,
        (output::Component, output),
        (TestingComponent, testing),
    ];

    fn built_ins() -> HashMap<&'static str, command::BuiltIn<State>> {
        HashMap::from([
            ("di", get_di()),
            ("da", get_da()),
            ("box", get_box()),
            ("boxa", get_boxa()),
            ("de", def::get_de()),
            ("tm", io::get_tm()),
        ])
    }

    fn custom_vm_initialization(vm: &mut VM<State>) {
        define_registers(vm);
    }

    test_suite![
        options(
            TestOption::BuiltIns(built_ins),
            TestOption::CustomVMInitialization(custom_vm_initialization),
        ),
        output_equality_tests(
            (
                divert_and_reread,
                ".di x\nhello\n.di\nbefore\n.x\n",
                "before\nhello\n"
            ),
            (
                divert_append,
                ".di x\na\n.di\n.da x\nb\n.di\n.x\n",
                "a\nb\n"
            ),
            (
                divert_replaces,
                ".di x\na\n.di\n.di x\nb\n.di\n.x\n",
                "b\n"
            ),
            (
                nested_diversions,
                ".di outer\no1\n.di inner\ni\n.di\no2\n.di\n.outer\n.inner\n",
                "o1\no2\ni\n"
            ),
            (
                divert_macro_output,
                ".de m\nin macro\n..\n.di x\n.m\n.di\n.x\n",
                "in macro\n"
            ),
            (
                divert_blank_line,
                ".di x\na\n\nb\n.di\n.x\n",
                "a\n\nb\n"
            ),
            (box_request, ".box b\nx\n.box\n.b\n", "x\n"),
            (
                box_append,
                ".box b\nx\n.box\n.boxa b\ny\n.box\n.b\n",
                "x\ny\n"
            ),
            (unterminated_diversion, ".di x\nlost\n", ""),
        ),
        terminal_output_tests(
            (
                diversion_name_register,
                ".di x\n.tm \\n[.z]\n.di\n.tm [\\n[.z]]\n",
                "x\n[]\n"
            ),
            (
                nested_diversion_name_register,
                ".di a\n.di b\n.tm \\n[.z]\n.di\n.tm \\n[.z]\n.di\n",
                "b\na\n"
            ),
            (
                transparent_line_is_reread,
                ".di x\n\\!.tm reread\n.di\n.tm before\n.x\n",
                "before\nreread\n"
            ),
        ),
        diagnostic_tests(
            (stack_underflow, ".di\n", 1, 0),
            (balanced_diversion, ".di x\n.di\n", 0, 0),
        ),
    ];
}
