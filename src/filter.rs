//! Glob-based path exclusion.

use crate::error::{Error, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;

/// Excludes paths matching any of a set of glob patterns.
///
/// Patterns are matched against paths relative to the source root. A path is
/// also excluded when one of its ancestor directories matches, so `**/obj`
/// leaves out everything below any `obj` directory.
#[derive(Debug, Clone)]
pub(crate) struct PathFilter {
    excludes: GlobSet,
}

impl PathFilter {
    /// Compiles the patterns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] for the first pattern that is not a
    /// valid glob.
    pub(crate) fn new(patterns: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();

        for pattern in patterns {
            let glob =
                Glob::new(pattern).map_err(|e| Error::invalid_pattern(pattern, e.to_string()))?;
            builder.add(glob);
        }

        let excludes = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build glob set: {e}")))?;

        Ok(Self { excludes })
    }

    /// Returns true if the relative path is excluded.
    pub(crate) fn is_excluded(&self, relative: &Path) -> bool {
        if self.excludes.is_empty() {
            return false;
        }

        relative
            .ancestors()
            .filter(|p| !p.as_os_str().is_empty())
            .any(|p| self.excludes.is_match(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(patterns: &[&str]) -> PathFilter {
        let patterns: Vec<String> = patterns.iter().map(ToString::to_string).collect();
        PathFilter::new(&patterns).unwrap()
    }

    #[test]
    fn test_empty_filter_excludes_nothing() {
        let f = filter(&[]);
        assert!(!f.is_excluded(Path::new("src/main.cpp")));
    }

    #[test]
    fn test_file_pattern() {
        let f = filter(&["**/*.Designer.cs"]);
        assert!(f.is_excluded(Path::new("Forms/Main.Designer.cs")));
        assert!(!f.is_excluded(Path::new("Forms/Main.cs")));
    }

    #[test]
    fn test_directory_pattern_excludes_descendants() {
        let f = filter(&["**/obj", "bin"]);
        assert!(f.is_excluded(Path::new("App/obj/Debug/AssemblyInfo.cs")));
        assert!(f.is_excluded(Path::new("bin/notes.txt")));
        assert!(!f.is_excluded(Path::new("App/Program.cs")));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = PathFilter::new(&["a[".to_string()]).unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { .. }));
    }
}
