//! Project layout, derived from the project root.

use std::path::{Path, PathBuf};

pub const SOURCE_FILE: &str = "main.cpp";
pub const EXECUTABLE_EXTENSION: &str = "e";
pub const TESTS_DIR: &str = "tests";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    base: PathBuf,
}

impl Directory {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn root(&self) -> &Path {
        &self.base
    }

    pub fn source(&self) -> PathBuf {
        self.base.join(SOURCE_FILE)
    }

    /// The source path with its extension swapped for `.e`.
    pub fn executable(&self) -> PathBuf {
        self.source().with_extension(EXECUTABLE_EXTENSION)
    }

    pub fn tests(&self) -> PathBuf {
        self.base.join(TESTS_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_derive_from_base() {
        let dir = Directory::new("/home/u/solid-idea");
        assert_eq!(dir.root(), Path::new("/home/u/solid-idea"));
        assert_eq!(dir.source(), PathBuf::from("/home/u/solid-idea/main.cpp"));
        assert_eq!(dir.executable(), PathBuf::from("/home/u/solid-idea/main.e"));
        assert_eq!(dir.tests(), PathBuf::from("/home/u/solid-idea/tests"));
    }

    #[test]
    fn dotted_base_keeps_its_name() {
        let dir = Directory::new("/tmp/round.1");
        assert_eq!(dir.executable(), PathBuf::from("/tmp/round.1/main.e"));
    }
}
