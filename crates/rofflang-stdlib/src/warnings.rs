//! The `warn` request

use rofflang::command;
use rofflang::error::{Warning, WarningMask};
use rofflang::parse;
use rofflang::prelude as rl;
use rofflang::token::Name;
use rofflang::traits::*;
use rofflang::vm::VM;

pub const WARN_DOC: &str = "Set the enabled warning categories as a sum of category bits; without an argument, enable all";

/// Get the `warn` request.
pub fn get_warn<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(warn_fn).with_doc(WARN_DOC)
}

fn warn_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    let mask = if parse::has_arg(vm)? {
        match parse::get_integer(vm)? {
            None => None,
            Some(n) if n < 0 => {
                vm.warning(Warning::Range, format!("warning mask cannot be negative, got {n}"));
                None
            }
            Some(n) => Some(WarningMask(n as u32 & WarningMask::EVERY.0)),
        }
    } else {
        Some(WarningMask::EVERY)
    };
    if let Some(mask) = mask {
        tracing::debug!(mask = mask.0, "set warning mask");
        vm.interp_mut().warning_mask = mask;
    }
    parse::skip_line(vm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rofflang_testing::*;
    use std::collections::HashMap;

    fn built_ins() -> HashMap<&'static str, command::BuiltIn<State>> {
        HashMap::from([("warn", get_warn())])
    }

    test_suite![
        output_equality_tests(
            (read_mask, ".warn 1024\n\\n[.warn]\n", "1024\n"),
            (all_categories, ".warn 0\n.warn\n\\n[.warn]\n", "2097151\n"),
            (extra_bits_are_dropped, ".warn 2097153\n\\n[.warn]\n", "1\n"),
        ),
        diagnostic_tests(
            (disable_all, ".warn 0\n\\n[undefined]\n.undefined\n", 0, 0),
            (enable_reg_only, ".warn 1024\n\\n[undefined]\n.undefined\n", 1, 0),
            (negative_mask, ".warn -1\n", 1, 0),
        ),
    ];
}
