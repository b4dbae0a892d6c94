//! Registers related to time
//!
//! The registers are ordinary writable registers that are set once, when the VM starts.

#[cfg(feature = "time")]
use chrono::prelude::*;
use rofflang::traits::*;
use rofflang::vm::VM;

/// Component for storing the date and time the document is processed at.
pub struct Component {
    seconds: i32,
    minutes: i32,
    hours: i32,
    day_of_week: i32,
    day: i32,
    month: i32,
    year: i32,
}

impl Component {
    /// Create a new component initialized to the current local time.
    #[cfg(feature = "time")]
    pub fn new() -> Component {
        let dt: DateTime<Local> = Local::now();
        Component {
            seconds: dt.time().second() as i32,
            minutes: dt.time().minute() as i32,
            hours: dt.time().hour() as i32,
            day_of_week: dt.weekday().number_from_sunday() as i32,
            day: dt.day() as i32,
            month: dt.month() as i32,
            year: dt.year(),
        }
    }

    #[cfg(not(feature = "time"))]
    pub fn new() -> Component {
        Component::new_with_values(0, 0, 0, 0, 0, 0, 0)
    }

    /// Create a new component initialized with the provided values.
    ///
    /// This is useful when the current time should not leak into the output,
    ///     for example in tests and reproducible builds.
    /// The day of the week counts from Sunday, which is 1.
    pub fn new_with_values(
        seconds: i32,
        minutes: i32,
        hours: i32,
        day_of_week: i32,
        day: i32,
        month: i32,
        year: i32,
    ) -> Component {
        Component {
            seconds,
            minutes,
            hours,
            day_of_week,
            day,
            month,
            year,
        }
    }
}

impl Default for Component {
    fn default() -> Self {
        Self::new()
    }
}

/// Set the `seconds`, `minutes`, `hours`, `dw`, `dy`, `mo`, `year` and `yr` registers
///     from the component.
///
/// `yr` is the year minus 1900.
pub fn set_registers<S: HasComponent<Component>>(vm: &mut VM<S>) {
    let c = vm.state.component();
    let values = [
        ("seconds", c.seconds),
        ("minutes", c.minutes),
        ("hours", c.hours),
        ("dw", c.day_of_week),
        ("dy", c.day),
        ("mo", c.month),
        ("year", c.year),
        ("yr", c.year - 1900),
    ];
    for (name, value) in values {
        let name = vm.intern(name);
        vm.registers.set_value(name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers;
    use rofflang::command;
    use rofflang::error::Diagnostic;
    use rofflang::prelude as rl;
    use rofflang::roffmacro::Macro;
    use rofflang::token::Token;
    use rofflang::vm::implement_has_component;
    use rofflang_testing::*;
    use std::collections::HashMap;

    struct State {
        time: Component,
        testing: TestingComponent,
    }

    impl Default for State {
        fn default() -> Self {
            State {
                time: Component::new_with_values(5, 4, 3, 2, 29, 2, 2028),
                testing: Default::default(),
            }
        }
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

    implement_has_component![State, (Component, time), (TestingComponent, testing),];

    fn built_ins() -> HashMap<&'static str, command::BuiltIn<State>> {
        HashMap::from([("nr", registers::get_nr())])
    }

    fn custom_vm_initialization(vm: &mut VM<State>) {
        set_registers(vm);
    }

    test_suite![
        options(
            TestOption::BuiltIns(built_ins),
            TestOption::CustomVMInitialization(custom_vm_initialization),
        ),
        output_equality_tests(
            (
                clock,
                "\\n[hours]:\\n[minutes]:\\n[seconds]\n",
                "3:4:5\n"
            ),
            (
                date,
                "\\n[year]-\\n[mo]-\\n[dy] \\n[dw]\n",
                "2028-2-29 2\n"
            ),
            (two_digit_year, "\\n[yr]\n", "128\n"),
            (registers_are_writable, ".nr year 1999\n\\n[year]\n", "1999\n"),
        ),
    ];

    #[cfg(feature = "time")]
    #[test]
    fn current_time_is_plausible() {
        let component = Component::new();
        assert!((1..=7).contains(&component.day_of_week));
        assert!((1..=12).contains(&component.month));
        assert!(component.year >= 2000);
    }
}
