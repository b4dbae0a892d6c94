//! Utilities for writing unit tests
//!
//! The test runners and the `test_suite` macro live in the `rofflang-testing` crate.
//! This module adds an in-memory file system for testing the requests that read files.

use rofflang::vm::FileSystem;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// In-memory file system for testing.
///
/// Files are added before the test runs.
/// Given a VM, the file system is installed as follows:
/// ```
/// # use rofflang::vm::VM;
/// # use rofflang_stdlib::testing::InMemoryFileSystem;
/// # use std::collections::HashMap;
/// let mut vm = VM::<()>::new(HashMap::new());
/// let mut file_system = InMemoryFileSystem::new(vm.working_directory.clone().unwrap_or_default());
/// file_system.add_string_file("macros.roff", ".de m\n..\n");
/// vm.file_system = Box::new(file_system);
/// ```
#[derive(Default)]
pub struct InMemoryFileSystem {
    working_directory: PathBuf,
    files: HashMap<PathBuf, Vec<u8>>,
}

impl InMemoryFileSystem {
    /// Create a new in-memory file system.
    ///
    /// Typically the working directory is taken from the VM.
    pub fn new<P: Into<PathBuf>>(working_directory: P) -> Self {
        Self {
            working_directory: working_directory.into(),
            files: Default::default(),
        }
    }

    /// Add a file with text content.
    ///
    /// The provided path is relative to the working directory.
    pub fn add_string_file(&mut self, relative_path: &str, content: &str) {
        self.add_bytes_file(relative_path, content.as_bytes());
    }

    /// Add a file with arbitrary content.
    ///
    /// The provided path is relative to the working directory.
    pub fn add_bytes_file(&mut self, relative_path: &str, content: &[u8]) {
        let path = self.working_directory.join(relative_path);
        self.files.insert(path, content.into());
    }
}

impl FileSystem for InMemoryFileSystem {
    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        match self.files.get(path) {
            None => Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "not found",
            )),
            Some(content) => Ok(content.clone()),
        }
    }
}
