//! Data structures and algorithms shared by the Roffcraft crates.

pub mod algorithms {
    pub mod spellcheck;
}
pub mod collections {
    pub mod interner;
}
pub mod color;
