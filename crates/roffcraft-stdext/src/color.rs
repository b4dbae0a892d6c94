//! Terminal colouring
//!
//! Diagnostics are coloured using the [Colored crate](https://docs.rs/colored/latest/colored/)
//!     when the `color` Cargo feature is enabled.
//! When the feature is disabled the methods of [Colorize] return the text unchanged,
//!     so callers never need their own `cfg` attributes:
//!
//! ```
//! use roffcraft_stdext::color::Colorize;
//! println!["{}", "warning".bold().yellow()];
//! ```

#[cfg(feature = "color")]
pub type ColoredString = colored::ColoredString;

#[cfg(not(feature = "color"))]
pub type ColoredString = String;

macro_rules! colorize_impl {
    ( $( $method_name: ident, )+ ) => {
        /// Trait that provides colouring methods on strings.
        ///
        /// See the module documentation for information.
        pub trait Colorize {
            $(
                fn $method_name(self) -> ColoredString;
            )+
        }

        #[cfg(feature = "color")]
        impl Colorize for ColoredString {
            $(
                fn $method_name(self) -> ColoredString {
                    colored::Colorize::$method_name(self)
                }
            )+
        }

        #[cfg(feature = "color")]
        impl Colorize for &str {
            $(
                fn $method_name(self) -> ColoredString {
                    colored::Colorize::$method_name(self)
                }
            )+
        }

        #[cfg(not(feature = "color"))]
        impl Colorize for ColoredString {
            $(
                fn $method_name(self) -> ColoredString {
                    self
                }
            )+
        }

        #[cfg(not(feature = "color"))]
        impl Colorize for &str {
            $(
                fn $method_name(self) -> ColoredString {
                    self.to_string()
                }
            )+
        }
    };
}

colorize_impl!(bold, red, yellow, cyan, bright_blue, dimmed,);
