//! Requests that change the special characters of the language
//!
//! The escape character, the two control characters and the compatibility flag
//!     are global interpreter state.
//! The escape character may not equal either control character, and vice versa;
//!     a request that would make two of them equal is an error and changes nothing.

use rofflang::command;
use rofflang::parse;
use rofflang::prelude as rl;
use rofflang::token::Name;
use rofflang::traits::*;
use rofflang::vm::{Collision, VM};

pub const EC_DOC: &str = "Set the escape character; the default is the backslash";
pub const EO_DOC: &str = "Turn off escape sequences";
pub const ECS_DOC: &str = "Save the escape character";
pub const ECR_DOC: &str = "Restore the escape character saved by `ecs`";
pub const CC_DOC: &str = "Set the control character; the default is the period";
pub const C2_DOC: &str = "Set the no-break control character; the default is the apostrophe";
pub const CP_DOC: &str = "Turn compatibility mode on, or off with an argument of zero";

/// Get the `ec` request.
pub fn get_ec<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(ec_fn).with_doc(EC_DOC)
}

/// Get the `eo` request.
pub fn get_eo<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(eo_fn).with_doc(EO_DOC)
}

/// Get the `ecs` request.
pub fn get_ecs<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(ecs_fn).with_doc(ECS_DOC)
}

/// Get the `ecr` request.
pub fn get_ecr<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(ecr_fn).with_doc(ECR_DOC)
}

/// Get the `cc` request.
pub fn get_cc<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(cc_fn).with_doc(CC_DOC)
}

/// Get the `c2` request.
pub fn get_c2<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(c2_fn).with_doc(C2_DOC)
}

/// Get the `cp` request.
pub fn get_cp<S: RoffState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_request(cp_fn).with_doc(CP_DOC)
}

/// Read an optional single-character argument.
///
/// Returns `default` if the line has no argument, and [None] after reporting an error if
///     the argument is not an ordinary character.
fn get_char_arg<S: RoffState>(vm: &mut VM<S>, default: u8) -> rl::Result<Option<u8>> {
    if !parse::has_arg(vm)? {
        return Ok(Some(default));
    }
    match vm.token().ch() {
        Some(c) => {
            vm.next_token()?;
            Ok(Some(c))
        }
        None => {
            let description = vm.token().description(vm.names());
            vm.error(format!("expected an ordinary character, got {description}"));
            Ok(None)
        }
    }
}

fn report_collision<S: RoffState>(vm: &mut VM<S>, what: &str, c: u8, collision: Collision) {
    vm.error(format!(
        "cannot set {what} to '{}': it is {}",
        c as char,
        collision.description()
    ));
}

fn ec_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    if let Some(c) = get_char_arg(vm, b'\\')? {
        if let Err(collision) = vm.interp_mut().set_escape_char(Some(c)) {
            report_collision(vm, "the escape character", c, collision);
        }
    }
    parse::skip_line(vm)
}

fn eo_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    // Disabling escapes cannot collide with anything.
    _ = vm.interp_mut().set_escape_char(None);
    parse::skip_line(vm)
}

fn ecs_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    vm.interp_mut().save_escape_char();
    parse::skip_line(vm)
}

fn ecr_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    if let Err(collision) = vm.interp_mut().restore_escape_char() {
        vm.error(format!(
            "cannot restore the escape character: it is {}",
            collision.description()
        ));
    }
    parse::skip_line(vm)
}

fn cc_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    if let Some(c) = get_char_arg(vm, b'.')? {
        if let Err(collision) = vm.interp_mut().set_control_char(c) {
            report_collision(vm, "the control character", c, collision);
        }
    }
    parse::skip_line(vm)
}

fn c2_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    if let Some(c) = get_char_arg(vm, b'\'')? {
        if let Err(collision) = vm.interp_mut().set_no_break_control_char(c) {
            report_collision(vm, "the no-break control character", c, collision);
        }
    }
    parse::skip_line(vm)
}

fn cp_fn<S: RoffState>(_: Name, vm: &mut VM<S>) -> rl::Result<()> {
    let compatible = if parse::has_arg(vm)? {
        parse::get_integer(vm)?.unwrap_or(1) != 0
    } else {
        true
    };
    tracing::debug!(compatible, "set compatibility mode");
    vm.interp_mut().compatible = compatible;
    parse::skip_line(vm)
}
