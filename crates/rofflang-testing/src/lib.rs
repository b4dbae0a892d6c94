/*!
Rofflang unit testing library

This is a crate for writing unit tests for code that uses Rofflang.
It is used throughout the Rofflang standard library,
    so the unit tests there are good examples of what this crate can do.

## Basic setup

Each unit test built with this library works with a specific user-defined Rofflang state type.
In addition to implementing the [`RoffState`] trait, this state must also:

1. Include the [`TestingComponent`] type as a component.
    I.e., the state must implement the [`HasComponent<TestingComponent>`](rofflang::traits::HasComponent<TestingComponent>) trait.

1. Forward the output hooks of the [`RoffState`] trait
    (`output_handler`, `newline_handler`, `blank_line_handler`, `transparent_handler`
    and `diagnostic_hook`) to the functions of the same name on [`TestingComponent`].

1. Implement [`Default`].

If the unit test doesn't require anything else from the state,
    the [`State`] type defined in this library can simply be used.

## Test types

### Output equality tests

Run using [`run_output_equality_test`].

These tests verify that two different roff snippets produce the same output.
For example, an output equality test can verify that
```roff
.ds greeting Hola Mundo
\*[greeting] - \*[greeting]
```
and
```roff
Hola Mundo - Hola Mundo
```
produce the same output.
The second input is usually a constant.

### Failure tests

Run using [`run_failure_test`].

These tests verify that a snippet fails with a fatal error,
    like exceeding the input stack limit.

### Terminal output tests

Run using [`run_terminal_output_test`].

These tests verify what a snippet writes to the terminal,
    for example with the `tm` request.
Diagnostics are not written to the terminal in these tests.

### Diagnostic tests

Run using [`run_diagnostic_count_test`].

These tests verify how many warnings and errors a snippet reports.

## The test suite macro

The preferred way to write a suite of unit tests is to use the [`test_suite`] macro.
*/

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use rofflang::command::BuiltIn;
use rofflang::error::{Diagnostic, WarningMask};
use rofflang::prelude as rl;
use rofflang::roffmacro::Macro;
use rofflang::token::{self, Token};
use rofflang::traits::*;
use rofflang::vm::implement_has_component;
use rofflang::vm::VM;

/// Rofflang component that every unit testing state needs to have.
#[derive(Default)]
pub struct TestingComponent {
    tokens: Vec<Token>,
    diagnostics: Vec<Diagnostic>,
}

impl TestingComponent {
    fn take_tokens(&mut self) -> Vec<Token> {
        std::mem::take(&mut self.tokens)
    }

    /// Diagnostics reported so far.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn output_handler<S: HasComponent<Self>>(token: Token, vm: &mut VM<S>) -> rl::Result<()> {
        vm.state.component_mut().tokens.push(token);
        Ok(())
    }

    pub fn newline_handler<S: HasComponent<Self>>(vm: &mut VM<S>) -> rl::Result<()> {
        vm.state.component_mut().tokens.push(Token::Newline);
        Ok(())
    }

    /// A blank line is output as an empty line.
    pub fn blank_line_handler<S: HasComponent<Self>>(vm: &mut VM<S>) -> rl::Result<()> {
        vm.state.component_mut().tokens.push(Token::Newline);
        Ok(())
    }

    /// Transparent lines are output verbatim.
    pub fn transparent_handler<S: HasComponent<Self>>(line: Macro, vm: &mut VM<S>) -> rl::Result<()> {
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

    pub fn diagnostic_hook<S: HasComponent<Self>>(diagnostic: &Diagnostic, vm: &mut VM<S>) {
        vm.state.component_mut().diagnostics.push(diagnostic.clone());
    }
}

/// Simple state type for simple unit tests.
///
/// If the requests under test don't require custom components or
/// other pieces in the state, it is easier to use this type rather than defining a custom one.
#[derive(Default)]
pub struct State {
    testing: TestingComponent,
}

impl RoffState for State {
    fn output_handler(token: Token, vm: &mut VM<Self>) -> rl::Result<()> {
        TestingComponent::output_handler(token, vm)
    }

    fn newline_handler(vm: &mut VM<Self>) -> rl::Result<()> {
        TestingComponent::newline_handler(vm)
    }

    fn blank_line_handler(vm: &mut VM<Self>) -> rl::Result<()> {
        TestingComponent::blank_line_handler(vm)
    }

    fn transparent_handler(line: Macro, vm: &mut VM<Self>) -> rl::Result<()> {
        TestingComponent::transparent_handler(line, vm)
    }

    fn diagnostic_hook(diagnostic: &Diagnostic, vm: &mut VM<Self>) {
        TestingComponent::diagnostic_hook(diagnostic, vm)
    }
}

implement_has_component![State, (TestingComponent, testing),];

/// Option passed to a test runner.
pub enum TestOption<'a, S> {
    /// The built-in requests are the result of invoking the provided static function.
    ///
    /// Overrides previous `BuiltIns` or `BuiltInsDyn` options.
    BuiltIns(fn() -> HashMap<&'static str, BuiltIn<S>>),

    /// The built-in requests are the result of invoking the provided closure.
    ///
    /// Overrides previous `BuiltIns` or `BuiltInsDyn` options.
    BuiltInsDyn(Box<dyn Fn() -> HashMap<&'static str, BuiltIn<S>> + 'a>),

    /// The provided static function is invoked after the VM is created and before execution starts.
    ///
    /// Overrides previous `CustomVMInitialization` or `CustomVMInitializationDyn` options.
    CustomVMInitialization(fn(&mut VM<S>)),

    /// The provided closure is invoked after the VM is created and before execution starts.
    ///
    /// Overrides previous `CustomVMInitialization` or `CustomVMInitializationDyn` options.
    #[allow(clippy::type_complexity)]
    CustomVMInitializationDyn(Box<dyn Fn(&mut VM<S>) + 'a>),

    /// The enabled warning categories.
    /// Tests enable every category unless this option is given.
    WarningMask(WarningMask),

    /// Whether the VM starts in compatibility mode.
    Compatible(bool),
}

/// Run an output equality test.
///
/// The test passes if the two provided inputs produce the same output.
pub fn run_output_equality_test<S>(lhs: &str, rhs: &str, options: &[TestOption<S>])
where
    S: Default + HasComponent<TestingComponent>,
{
    let options = ResolvedOptions::new(options);

    let mut vm_1 = initialize_vm(&options);
    let output_1 = execute_source_code(&mut vm_1, lhs)
        .map_err(|err| {
            println!("{err}");
            err
        })
        .unwrap();

    let mut vm_2 = initialize_vm(&options);
    let output_2 = execute_source_code(&mut vm_2, rhs)
        .map_err(|err| {
            println!("{err}");
            err
        })
        .unwrap();

    let output_1 = token::write_tokens(&output_1, vm_1.names());
    let output_2 = token::write_tokens(&output_2, vm_2.names());
    if output_1 != output_2 {
        println!("Output is different:");
        println!("------[lhs]------");
        println!("'{output_1}'");
        println!("------[rhs]------");
        println!("'{output_2}'");
        println!("-----------------");
        print_diagnostics(vm_1.state.component().diagnostics());
        panic!("Output equality test failed");
    }
}

/// Run a failure test.
///
/// The test passes if execution of the provided input ends with a fatal error.
pub fn run_failure_test<S>(input: &str, options: &[TestOption<S>])
where
    S: Default + HasComponent<TestingComponent>,
{
    let options = ResolvedOptions::new(options);

    let mut vm = initialize_vm(&options);
    let result = execute_source_code(&mut vm, input);
    if let Ok(output) = result {
        println!("Execution succeeded:");
        println!("{}", token::write_tokens(&output, vm.names()));
        panic!("Failure test did not pass: execution successful");
    }
}

/// Run a terminal output test.
///
/// The test passes if execution succeeds and writes exactly `expected` to the terminal.
pub fn run_terminal_output_test<S>(input: &str, expected: &str, options: &[TestOption<S>])
where
    S: Default + HasComponent<TestingComponent>,
{
    let options = ResolvedOptions::new(options);

    let mut vm = initialize_vm(&options);
    let terminal = Rc::new(RefCell::new(Vec::<u8>::new()));
    vm.terminal_out = terminal.clone();
    vm.diagnostics_on_terminal = false;
    if let Err(err) = execute_source_code(&mut vm, input) {
        println!("{err}");
        panic!("Terminal output test failed: execution failed");
    }
    let got = String::from_utf8_lossy(&terminal.borrow()).into_owned();
    if got != expected {
        println!("Terminal output is different:");
        println!("------[got]------");
        println!("'{got}'");
        println!("----[expected]---");
        println!("'{expected}'");
        println!("-----------------");
        panic!("Terminal output test failed");
    }
}

/// Run a diagnostic count test.
///
/// The test passes if execution succeeds and reports the given numbers of warnings and errors.
pub fn run_diagnostic_count_test<S>(
    input: &str,
    warnings: usize,
    errors: usize,
    options: &[TestOption<S>],
) where
    S: Default + HasComponent<TestingComponent>,
{
    let options = ResolvedOptions::new(options);

    let mut vm = initialize_vm(&options);
    vm.diagnostics_on_terminal = false;
    if let Err(err) = execute_source_code(&mut vm, input) {
        println!("{err}");
        panic!("Diagnostic test failed: execution failed");
    }
    let got = vm.diagnostic_counts();
    if got != (warnings, errors) {
        print_diagnostics(vm.state.component().diagnostics());
        panic!(
            "Diagnostic test failed: expected {warnings} warning(s) and {errors} error(s), got {} and {}",
            got.0, got.1
        );
    }
}

#[cfg(feature = "serde")]
fn print_diagnostics(diagnostics: &[Diagnostic]) {
    match serde_json::to_string_pretty(diagnostics) {
        Ok(s) => println!("Diagnostics: {s}"),
        Err(err) => println!("Diagnostics could not be serialized: {err}"),
    }
}

#[cfg(not(feature = "serde"))]
fn print_diagnostics(diagnostics: &[Diagnostic]) {
    println!("Diagnostics:");
    for diagnostic in diagnostics {
        println!("  {diagnostic:?}");
    }
}

struct ResolvedOptions<'a, S> {
    built_ins: &'a dyn Fn() -> HashMap<&'static str, BuiltIn<S>>,
    custom_vm_initialization: &'a dyn Fn(&mut VM<S>),
    warning_mask: WarningMask,
    compatible: bool,
}

impl<'a, S> ResolvedOptions<'a, S> {
    pub fn new(options: &'a [TestOption<S>]) -> Self {
        let mut resolved = Self {
            built_ins: &HashMap::new,
            custom_vm_initialization: &|_| {},
            warning_mask: WarningMask::EVERY,
            compatible: false,
        };
        for option in options {
            match option {
                TestOption::BuiltIns(f) => resolved.built_ins = f,
                TestOption::BuiltInsDyn(f) => resolved.built_ins = f,
                TestOption::CustomVMInitialization(f) => resolved.custom_vm_initialization = f,
                TestOption::CustomVMInitializationDyn(f) => resolved.custom_vm_initialization = f,
                TestOption::WarningMask(mask) => resolved.warning_mask = *mask,
                TestOption::Compatible(b) => resolved.compatible = *b,
            }
        }
        resolved
    }
}

fn initialize_vm<S: Default + RoffState>(options: &ResolvedOptions<S>) -> Box<VM<S>> {
    let mut vm = VM::<S>::new((options.built_ins)());
    vm.terminal_out = Rc::new(RefCell::new(std::io::sink()));
    vm.interp_mut().warning_mask = options.warning_mask;
    vm.interp_mut().compatible = options.compatible;
    (options.custom_vm_initialization)(&mut vm);
    vm
}

/// Execute source code in a VM, returning the output tokens.
fn execute_source_code<S>(vm: &mut VM<S>, source: &str) -> rl::Result<Vec<Token>>
where
    S: Default + HasComponent<TestingComponent>,
{
    vm.push_source("testing.roff", source)?;
    vm.run()?;
    Ok(vm.state.component_mut().take_tokens())
}

/// Macro to generate a suite of unit tests
///
/// The general use of this macros looks like this:
/// ```
/// # use rofflang_testing::*;
/// # fn built_ins() -> std::collections::HashMap<&'static str, rofflang::command::BuiltIn<State>> {
/// #   Default::default()
/// # }
/// test_suite![
///     state(State),
///     options(TestOption::BuiltIns(built_ins)),
///     output_equality_tests(
///         (case_1, "lhs_1\n", "lhs_1\n"),
///     ),
///     failure_tests(
///         (case_2, ".de r\n.r\n..\n.r\n"),
///     ),
///     terminal_output_tests(
///         (case_3, "text\n", ""),
///     ),
///     diagnostic_tests(
///         (case_4, "\\n[undefined]\n", 1, 0),
///     ),
/// ];
/// ```
///
/// The arguments to the macro are:
///
/// - `state(State)`: defines which Rust type to use as the VM state in the tests.
///     This can be omitted, in which case it defaults to the type name `State` in the current scope.
///
/// - `options(option_1, option_2, ..., option_n)`: options to pass to the test runner.
///     This is a list of values of type [TestOption].
///     The options can be omitted, in which case they default to `options(TestOption::BuiltIns(built_ins))`.
///     In this case `built_ins` is a static function that returns the requests
///     to initialize the VM with.
///
/// - `output_equality_tests(cases...)`: each case is of the form (case name, left hand side, right hand side)
///     and is run with [run_output_equality_test].
///
/// - `failure_tests(cases...)`: each case is of the form (case name, input)
///     and is run with [run_failure_test].
///
/// - `terminal_output_tests(cases...)`: each case is of the form (case name, input, expected terminal output)
///     and is run with [run_terminal_output_test].
///
/// - `diagnostic_tests(cases...)`: each case is of the form (case name, input, warnings, errors)
///     and is run with [run_diagnostic_count_test].
///
/// Only one `state()` argument may be provided, and if provided it must be in the first position.
/// Only one `options()` argument may be provided, and if provided it must be in the first position
///     or after the `state()` argument.
/// Zero or more of the other arguments may be provided, and in any order.
#[macro_export]
macro_rules! test_suite {
    ( state($state: ty), options $options: tt, output_equality_tests ( $( ($name: ident, $lhs: expr, $rhs: expr $(,)? ) ),* $(,)? ) $(,)? ) => (
        $(
            #[test]
            fn $name() {
                let lhs = $lhs;
                let rhs = $rhs;
                let options = vec! $options;
                rofflang_testing::run_output_equality_test::<$state>(&lhs, &rhs, &options);
            }
        )*
    );
    ( state($state: ty), options $options: tt, output_equality_tests $test_body: tt $(,)? ) => (
        compile_error!("Invalid test cases for output_equality_tests: must be a list of tuples (name, lhs, rhs)");
    );
    ( state($state: ty), options $options: tt, failure_tests ( $( ($name: ident, $input: expr $(,)? ) ),* $(,)? ) $(,)? ) => (
        $(
            #[test]
            fn $name() {
                let input = $input;
                let options = vec! $options;
                rofflang_testing::run_failure_test::<$state>(&input, &options);
            }
        )*
    );
    ( state($state: ty), options $options: tt, terminal_output_tests ( $( ($name: ident, $input: expr, $expected: expr $(,)? ) ),* $(,)? ) $(,)? ) => (
        $(
            #[test]
            fn $name() {
                let input = $input;
                let expected = $expected;
                let options = vec! $options;
                rofflang_testing::run_terminal_output_test::<$state>(&input, &expected, &options);
            }
        )*
    );
    ( state($state: ty), options $options: tt, diagnostic_tests ( $( ($name: ident, $input: expr, $warnings: expr, $errors: expr $(,)? ) ),* $(,)? ) $(,)? ) => (
        $(
            #[test]
            fn $name() {
                let input = $input;
                let options = vec! $options;
                rofflang_testing::run_diagnostic_count_test::<$state>(&input, $warnings, $errors, &options);
            }
        )*
    );
    ( state($state: ty), options $options: tt, $test_kind: ident $test_cases: tt $(,)? ) => (
        compile_error!("Invalid keyword: test_suite! only accepts the following keywords: `state`, `options`, `output_equality_tests`, `failure_tests`, `terminal_output_tests`, `diagnostic_tests`");
    );
    ( state($state: ty), options $options: tt, $( $test_kind: ident $test_cases: tt ),+ $(,)? ) => (
        $(
            rofflang_testing::test_suite![state($state), options $options, $test_kind $test_cases,];
        )+
    );
    ( options $options: tt, $( $test_kind: ident $test_cases: tt ),+ $(,)? ) => (
        rofflang_testing::test_suite![state(State), options $options, $( $test_kind $test_cases, )+ ];
    );
    ( $( $test_kind: ident $test_cases: tt ),+ $(,)? ) => (
        rofflang_testing::test_suite![options (rofflang_testing::TestOption::BuiltIns(built_ins)), $( $test_kind $test_cases, )+ ];
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use rofflang::parse;
    use rofflang::token::Name;
    use std::io::Write;

    fn tm(_: Name, vm: &mut VM<State>) -> rl::Result<()> {
        let line = parse::read_rest_of_line(vm, false)?;
        let mut out = vm.terminal_out.borrow_mut();
        _ = writeln!(out, "{}", line.text());
        Ok(())
    }

    fn built_ins() -> HashMap<&'static str, BuiltIn<State>> {
        HashMap::from([("tm", BuiltIn::new_request(tm))])
    }

    #[test]
    fn output_equality() {
        run_output_equality_test::<State>("a\\\nb\n", "ab\n", &[TestOption::BuiltIns(built_ins)]);
    }

    #[test]
    #[should_panic]
    fn output_inequality() {
        run_output_equality_test::<State>("a\n", "b\n", &[TestOption::BuiltIns(built_ins)]);
    }

    #[test]
    fn terminal_output() {
        run_terminal_output_test::<State>(
            ".tm hello\n",
            "hello\n",
            &[TestOption::BuiltIns(built_ins)],
        );
    }

    #[test]
    fn diagnostic_counts() {
        run_diagnostic_count_test::<State>(
            ".undefined\n",
            1,
            0,
            &[TestOption::BuiltIns(built_ins)],
        );
    }

    #[test]
    fn warning_mask_option() {
        run_diagnostic_count_test::<State>(
            ".undefined\n",
            0,
            0,
            &[
                TestOption::BuiltIns(built_ins),
                TestOption::WarningMask(WarningMask::NONE),
            ],
        );
    }

    #[test]
    fn blank_and_transparent_lines() {
        run_output_equality_test::<State>("a\n\n\\!b c\n", "a\n\nb c\n", &[]);
    }
}
