use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Tag used for extensions outside the allow-list.
pub const DEFAULT_LANGUAGE: &str = "plaintext";

/// Allow-listed extensions and the Markdown language tag for each.
///
/// The table doubles as the eligibility filter: files whose extension is not
/// a key here are skipped.
static LANGUAGES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("cs", "csharp"),
        ("cpp", "cpp"),
        ("h", "cpp"),
        ("vb", "vb"),
        ("fs", "fsharp"),
        ("sql", "sql"),
        ("txt", "text"),
        ("md", "markdown"),
    ]
    .into_iter()
    .collect()
});

/// Returns the language tag for an extension (without the leading dot).
#[must_use]
pub fn language_for_extension(ext: &str) -> &'static str {
    LANGUAGES.get(ext).copied().unwrap_or(DEFAULT_LANGUAGE)
}

/// Returns true if the path's extension is on the allow-list.
///
/// Matching is case-sensitive, so `Main.CPP` is not eligible.
#[must_use]
pub fn is_eligible(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| LANGUAGES.contains_key(ext))
}

/// A file discovered under the source root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute path to the file
    pub absolute_path: PathBuf,

    /// Relative path from the root directory
    pub relative_path: String,

    /// Final path component, used as the section heading
    pub file_name: String,

    /// Markdown language tag derived from the extension
    pub language: &'static str,
}

impl SourceFile {
    /// Creates a source file entry.
    #[must_use]
    pub fn new(absolute_path: PathBuf, relative_path: String) -> Self {
        let file_name = absolute_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| relative_path.clone());
        let language = absolute_path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(DEFAULT_LANGUAGE, language_for_extension);

        Self {
            absolute_path,
            relative_path,
            file_name,
            language,
        }
    }

    /// Returns true if this file should be processed.
    #[must_use]
    pub fn is_eligible(&self) -> bool {
        is_eligible(&self.absolute_path)
    }

    /// Reads the whole file as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUtf8`] for undecodable content and
    /// [`Error::Io`] for anything else.
    pub fn read_content(&self) -> Result<String> {
        std::fs::read_to_string(&self.absolute_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::InvalidData {
                Error::invalid_utf8(&self.absolute_path)
            } else {
                Error::io(&self.absolute_path, e)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn test_language_table() {
        assert_eq!(language_for_extension("cs"), "csharp");
        assert_eq!(language_for_extension("cpp"), "cpp");
        assert_eq!(language_for_extension("h"), "cpp");
        assert_eq!(language_for_extension("vb"), "vb");
        assert_eq!(language_for_extension("fs"), "fsharp");
        assert_eq!(language_for_extension("sql"), "sql");
        assert_eq!(language_for_extension("txt"), "text");
        assert_eq!(language_for_extension("md"), "markdown");
        assert_eq!(language_for_extension("rs"), DEFAULT_LANGUAGE);
    }

    #[test]
    fn test_eligibility() {
        assert!(is_eligible(Path::new("src/main.cpp")));
        assert!(is_eligible(Path::new("README.md")));
        assert!(is_eligible(Path::new("a/b/schema.sql")));
        assert!(!is_eligible(Path::new("app.exe")));
        assert!(!is_eligible(Path::new("Makefile")));
        assert!(!is_eligible(Path::new("lib.rs")));
        assert!(!is_eligible(Path::new("MAIN.CPP")));
    }

    #[test]
    fn test_source_file_metadata() {
        let file = SourceFile::new(
            PathBuf::from("/project/src/Program.cs"),
            "src/Program.cs".to_string(),
        );

        assert_eq!(file.file_name, "Program.cs");
        assert_eq!(file.language, "csharp");
        assert!(file.is_eligible());
    }

    #[test]
    fn test_read_content() {
        let temp = assert_fs::TempDir::new().unwrap();
        let child = temp.child("notes.txt");
        child.write_str("hello\nworld\n").unwrap();

        let file = SourceFile::new(child.path().to_path_buf(), "notes.txt".to_string());
        assert_eq!(file.read_content().unwrap(), "hello\nworld\n");
    }

    #[test]
    fn test_read_invalid_utf8() {
        let temp = assert_fs::TempDir::new().unwrap();
        let child = temp.child("broken.txt");
        child.write_binary(&[0x66, 0x6f, 0xff, 0xfe, 0x6f]).unwrap();

        let file = SourceFile::new(child.path().to_path_buf(), "broken.txt".to_string());
        let err = file.read_content().unwrap_err();
        assert!(matches!(err, Error::InvalidUtf8 { .. }));
    }

    #[test]
    fn test_read_missing_file() {
        let file = SourceFile::new(
            PathBuf::from("/nonexistent/file.md"),
            "file.md".to_string(),
        );
        assert!(file.read_content().unwrap_err().is_io());
    }
}
