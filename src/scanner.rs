use crate::{
    config::Config,
    error::{Error, Result},
    file::SourceFile,
    filter::PathFilter,
};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};
use walkdir::{DirEntry, WalkDir};

/// Walks the source root and lists files in a deterministic order.
pub(crate) struct Scanner {
    root_dir: PathBuf,
    filter: PathFilter,
    skip: Option<PathBuf>,
}

impl Scanner {
    /// Creates a new scanner from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if an exclude pattern does not compile.
    pub(crate) fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            root_dir: config.root_dir.clone(),
            filter: PathFilter::new(&config.exclude_patterns)?,
            skip: None,
        })
    }

    /// Never yield `path`, typically the output document itself.
    pub(crate) fn skip_file(&mut self, path: &Path) {
        self.skip = path.canonicalize().ok();
    }

    /// Scans the root directory and returns every file under it, including
    /// links to files.
    ///
    /// Siblings are visited in file-name order, depth first, so the result is
    /// sorted by relative path component-wise. Links to directories are not
    /// followed. Excluded paths and unreadable entries are left out; the
    /// latter are logged.
    ///
    /// # Errors
    ///
    /// Returns an error if the root itself cannot be read.
    pub(crate) fn scan(&self) -> Result<Vec<SourceFile>> {
        let root = self
            .root_dir
            .canonicalize()
            .map_err(|e| Error::io(&self.root_dir, e))?;

        debug!("Scanning {}", root.display());

        let walker = WalkDir::new(&root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.is_excluded(&root, entry));

        let mut files = Vec::new();
        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(Error::io(
                        &self.root_dir,
                        e.into_io_error()
                            .unwrap_or_else(|| std::io::Error::other("unreadable root")),
                    ));
                }
                Err(e) => {
                    warn!("Walk error: {}", e);
                    continue;
                }
            };

            if entry.path_is_symlink() {
                // Directory links are not descended into. File links, and
                // broken ones, go to the driver, which reads or reports them.
                if entry.path().is_dir() {
                    debug!("Not following directory link {}", entry.path().display());
                    continue;
                }
            } else if !entry.file_type().is_file() {
                continue;
            }

            if self.is_skipped(&entry) {
                trace!("Not scanning output document {}", entry.path().display());
                continue;
            }

            let relative_path = relative_to(&root, entry.path());
            files.push(SourceFile::new(entry.into_path(), relative_path));
        }

        debug!("Found {} files", files.len());
        Ok(files)
    }

    fn is_excluded(&self, root: &Path, entry: &DirEntry) -> bool {
        if entry.depth() == 0 {
            return false;
        }
        let relative = pathdiff::diff_paths(entry.path(), root)
            .unwrap_or_else(|| entry.path().to_path_buf());
        let excluded = self.filter.is_excluded(&relative);
        if excluded {
            debug!("Excluded {}", relative.display());
        }
        excluded
    }

    fn is_skipped(&self, entry: &DirEntry) -> bool {
        let Some(skip) = self.skip.as_deref() else {
            return false;
        };
        if entry.path_is_symlink() {
            entry.path().canonicalize().is_ok_and(|target| target == skip)
        } else {
            entry.path() == skip
        }
    }
}

/// Relative path of `path` under `root`, as a display string.
fn relative_to(root: &Path, path: &Path) -> String {
    pathdiff::diff_paths(path, root)
        .unwrap_or_else(|| path.to_path_buf())
        .to_string_lossy()
        .into_owned()
}
