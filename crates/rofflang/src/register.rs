//! Number registers.
//!
//! A register holds an integer value, an auto-increment used by `\n+x` and `\n-x`,
//!     and an output format used when the register is interpolated.
//! Read-only registers like `.$` are _computed_: their value is a function of the VM.

use crate::token::Name;
use crate::vm::VM;
use std::collections::HashMap;

/// Output format of a register, set with the `af` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Decimal, zero padded to at least this many digits.
    Arabic(usize),
    LowerRoman,
    UpperRoman,
    LowerAlpha,
    UpperAlpha,
}

impl Default for Format {
    fn default() -> Self {
        Format::Arabic(1)
    }
}

impl Format {
    /// Parse a format specification like `001`, `i` or `A`.
    pub fn parse(spec: &str) -> Option<Format> {
        match spec {
            "i" => Some(Format::LowerRoman),
            "I" => Some(Format::UpperRoman),
            "a" => Some(Format::LowerAlpha),
            "A" => Some(Format::UpperAlpha),
            _ if !spec.is_empty() && spec.bytes().all(|b| b.is_ascii_digit()) => {
                Some(Format::Arabic(spec.len()))
            }
            _ => None,
        }
    }

    /// The specification of the format, as interpolated by `\g`.
    pub fn spec(&self) -> String {
        match self {
            Format::Arabic(width) => format!("{}1", "0".repeat(width.saturating_sub(1))),
            Format::LowerRoman => "i".into(),
            Format::UpperRoman => "I".into(),
            Format::LowerAlpha => "a".into(),
            Format::UpperAlpha => "A".into(),
        }
    }

    pub fn format(&self, n: i32) -> String {
        match self {
            Format::Arabic(width) => {
                let digits = format!("{:0>width$}", n.unsigned_abs(), width = *width);
                if n < 0 {
                    format!("-{digits}")
                } else {
                    digits
                }
            }
            Format::LowerRoman => to_roman(n, false),
            Format::UpperRoman => to_roman(n, true),
            Format::LowerAlpha => to_alpha(n, false),
            Format::UpperAlpha => to_alpha(n, true),
        }
    }
}

fn to_roman(n: i32, upper: bool) -> String {
    // Values that cannot be written in roman numerals fall back to decimal.
    if n <= 0 || n >= 40000 {
        return n.to_string();
    }
    const NUMERALS: [(i32, &str); 13] = [
        (1000, "m"),
        (900, "cm"),
        (500, "d"),
        (400, "cd"),
        (100, "c"),
        (90, "xc"),
        (50, "l"),
        (40, "xl"),
        (10, "x"),
        (9, "ix"),
        (5, "v"),
        (4, "iv"),
        (1, "i"),
    ];
    let mut n = n;
    let mut s = String::new();
    for (value, numeral) in NUMERALS {
        while n >= value {
            s.push_str(numeral);
            n -= value;
        }
    }
    if upper {
        s.to_ascii_uppercase()
    } else {
        s
    }
}

fn to_alpha(n: i32, upper: bool) -> String {
    if n == 0 {
        return "0".into();
    }
    let base = if upper { b'A' } else { b'a' };
    let mut m = n.unsigned_abs();
    let mut letters = vec![];
    while m > 0 {
        m -= 1;
        letters.push(base + (m % 26) as u8);
        m /= 26;
    }
    if n < 0 {
        letters.push(b'-');
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// A writable number register.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Register {
    pub value: i32,
    pub increment: i32,
    pub format: Format,
}

impl Register {
    pub fn formatted(&self) -> String {
        self.format.format(self.value)
    }
}

/// Function computing the value of a read-only register.
pub type ComputedFn<S> = fn(vm: &VM<S>) -> String;

/// All registers of a VM.
pub struct Registers<S> {
    values: HashMap<Name, Register>,
    computed: HashMap<Name, ComputedFn<S>>,
}

impl<S> Default for Registers<S> {
    fn default() -> Self {
        Registers {
            values: Default::default(),
            computed: Default::default(),
        }
    }
}

impl<S> Registers<S> {
    pub fn get(&self, name: Name) -> Option<&Register> {
        self.values.get(&name)
    }

    pub fn get_mut(&mut self, name: Name) -> Option<&mut Register> {
        self.values.get_mut(&name)
    }

    /// Get a register, creating it with value zero if it does not exist.
    pub fn get_or_create(&mut self, name: Name) -> &mut Register {
        self.values.entry(name).or_default()
    }

    pub fn value(&self, name: Name) -> Option<i32> {
        self.values.get(&name).map(|r| r.value)
    }

    pub fn set_value(&mut self, name: Name, value: i32) {
        self.get_or_create(name).value = value;
    }

    pub fn remove(&mut self, name: Name) -> bool {
        self.values.remove(&name).is_some()
    }

    /// Rename a register, replacing any register already called `new`.
    pub fn rename(&mut self, old: Name, new: Name) -> bool {
        match self.values.remove(&old) {
            None => false,
            Some(register) => {
                self.values.insert(new, register);
                true
            }
        }
    }

    pub fn define_computed(&mut self, name: Name, f: ComputedFn<S>) {
        self.computed.insert(name, f);
    }

    pub fn computed(&self, name: Name) -> Option<ComputedFn<S>> {
        self.computed.get(&name).copied()
    }

    pub fn is_defined(&self, name: Name) -> bool {
        self.values.contains_key(&name) || self.computed.contains_key(&name)
    }

    /// Names of all writable registers.
    pub fn names(&self) -> impl Iterator<Item = Name> + '_ {
        self.values.keys().copied()
    }
}
