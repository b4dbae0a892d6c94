//! Rofflang prelude.

/// Result type in Rofflang.
///
/// Only fatal conditions are returned as errors.
/// Recoverable problems in the document are reported as diagnostics through the VM
///     and processing continues.
pub type Result<T> = std::result::Result<T, Box<crate::error::Error>>;
