//! Name interning
//!
//! Roff documents refer to macros, strings, registers and special characters
//!     by name, and the same few hundred names are looked up over and over again.
//! The [Interner] in this module maps each distinct name to a small integer _key_ once,
//!     after which names are compared and hashed as integers.
//! Interned names are never freed.
//!
//! ```
//! # use roffcraft_stdext::collections::interner::Interner;
//! let mut interner: Interner = Default::default();
//! let tm_1 = interner.get_or_intern("tm");
//! let ds = interner.get_or_intern("ds");
//! let tm_2 = interner.get_or_intern("tm");
//! assert_eq!(tm_1, tm_2);
//! assert_ne!(tm_1, ds);
//! assert_eq!(interner.resolve(ds), Some("ds"));
//! assert_eq!(interner.get("de"), None);
//! ```
//!
//! The interner keeps every string twice: once in the ordered list used for resolving
//!     keys and once as the key of the deduplication map.
//! Both copies share one allocation through [Rc].

use std::collections::HashMap;
use std::hash::Hash;
use std::num::NonZeroU32;
use std::rc::Rc;

/// Types implementing this trait can be used as keys in the [Interner].
pub trait Key: Copy + Eq + Hash {
    /// Build the key for the string at the provided position in the interner.
    ///
    /// Returns [None] if the key type cannot represent the position.
    fn from_position(position: usize) -> Option<Self>;

    /// Position of the string this key refers to.
    fn position(self) -> usize;
}

impl Key for NonZeroU32 {
    fn from_position(position: usize) -> Option<Self> {
        let raw: u32 = position.checked_add(1)?.try_into().ok()?;
        NonZeroU32::new(raw)
    }

    fn position(self) -> usize {
        self.get() as usize - 1
    }
}

/// String interner.
///
/// See the module documentation for information about this data structure.
#[derive(Debug, Clone)]
pub struct Interner<K = NonZeroU32> {
    strings: Vec<Rc<str>>,
    keys: HashMap<Rc<str>, K>,
}

impl<K> Default for Interner<K> {
    fn default() -> Self {
        Self {
            strings: Default::default(),
            keys: Default::default(),
        }
    }
}

impl<K: Key> Interner<K> {
    /// Intern the provided string and return its key.
    ///
    /// # Panics
    ///
    /// Panics if the key space of `K` is exhausted.
    pub fn get_or_intern(&mut self, s: &str) -> K {
        if let Some(key) = self.keys.get(s) {
            return *key;
        }
        let key = K::from_position(self.strings.len())
            .expect("the interner key space is exhausted");
        let s: Rc<str> = s.into();
        self.strings.push(s.clone());
        self.keys.insert(s, key);
        key
    }

    /// Get the key for the provided string if it has already been interned.
    pub fn get(&self, s: &str) -> Option<K> {
        self.keys.get(s).copied()
    }

    /// Return the interned string corresponding to the provided key.
    pub fn resolve(&self, key: K) -> Option<&str> {
        self.strings.get(key.position()).map(AsRef::as_ref)
    }

    /// Number of distinct strings interned.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Iterate over all interned strings with their keys, in interning order.
    pub fn iter(&self) -> impl Iterator<Item = (K, &str)> + '_ {
        self.strings.iter().enumerate().filter_map(|(i, s)| {
            let key = K::from_position(i)?;
            Some((key, s.as_ref()))
        })
    }
}

#[cfg(feature = "serde")]
impl<K> serde::Serialize for Interner<K> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeSeq;
        let mut seq = serializer.serialize_seq(Some(self.strings.len()))?;
        for s in &self.strings {
            seq.serialize_element(s.as_ref())?;
        }
        seq.end()
    }
}

#[cfg(feature = "serde")]
impl<'de, K: Key> serde::Deserialize<'de> for Interner<K> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let strings = Vec::<String>::deserialize(deserializer)?;
        let mut interner: Interner<K> = Default::default();
        for s in strings {
            interner.get_or_intern(&s);
        }
        Ok(interner)
    }
}
