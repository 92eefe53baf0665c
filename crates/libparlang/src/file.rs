//! Source file representation and handling for the Parlang translator.
//!
//! This module provides the `SourceFile` struct which represents an input file
//! with its path and contents. The translator never touches the filesystem
//! itself; callers construct `SourceFile`s from whatever source they have and
//! receive transformed text back.

use std::{path::PathBuf, sync::Arc};

/// Represents a source file with its path and source code content
///
/// This structure is used throughout the translator to track input files
/// and provide error reporting with proper file context. Cloning is cheap:
/// both the path and the code are reference counted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceFile {
    /// The file path as a vector of path components
    pub path: Arc<Vec<String>>,
    /// The source code content of the file
    pub code: Arc<String>,
}

impl SourceFile {
    /// Creates a new source file with the given path and source code
    ///
    /// # Arguments
    /// * `path` - Vector of path components representing the file path
    /// * `code` - The source code content as a string
    pub fn new(path: Vec<String>, code: String) -> Self {
        Self {
            path: path.into(),
            code: code.into(),
        }
    }

    /// Returns a reference to the file path components
    pub fn path(&self) -> &Vec<String> {
        &self.path
    }

    /// Returns a reference to the source code content
    pub fn code(&self) -> &String {
        self.code.as_ref()
    }

    /// Returns the path components joined into a single printable path
    pub fn display_name(&self) -> String {
        let buffer = PathBuf::from_iter(self.path.iter());
        buffer.to_string_lossy().to_string()
    }
}

impl std::fmt::Display for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::SourceFile;

    #[test]
    fn display_name_joins_components() {
        let file = SourceFile::new(vec!["demos".into(), "ray.js.parlang".into()], "".to_string());
        assert_eq!(file.display_name(), "demos/ray.js.parlang");
    }
}
