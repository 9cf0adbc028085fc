use crate::{
    error::{Error, Result},
    file::SourceFile,
};
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing::{debug, trace};

/// Renders one file's section of the document.
///
/// Content is embedded verbatim; nothing is escaped.
#[must_use]
pub fn render_section(file_name: &str, relative_path: &str, content: &str) -> String {
    format!("## {file_name}\n**{relative_path}**\n\n{content}\n\n")
}

/// Append-only writer for the output Markdown document.
///
/// Every section is flushed as soon as it is written, so an interrupted run
/// leaves exactly the completed sections on disk.
pub(crate) struct DocumentWriter {
    path: PathBuf,
    out: BufWriter<File>,
    sections: usize,
}

impl DocumentWriter {
    /// Creates the document, truncating any existing file.
    ///
    /// Missing parent directories are created.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or its parent directory cannot be
    /// created.
    pub(crate) fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        let file = File::create(path).map_err(|e| Error::io(path, e))?;
        debug!("Created output document {}", path.display());

        Ok(Self {
            path: path.to_path_buf(),
            out: BufWriter::new(file),
            sections: 0,
        })
    }

    /// Appends a file's section and flushes it to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if writing or flushing fails.
    pub(crate) fn append_section(&mut self, file: &SourceFile, content: &str) -> Result<()> {
        let section = render_section(&file.file_name, &file.relative_path, content);

        self.out
            .write_all(section.as_bytes())
            .and_then(|()| self.out.flush())
            .map_err(|e| Error::io(&self.path, e))?;

        self.sections += 1;
        trace!(
            "Wrote section {} ({} bytes) for {}",
            self.sections,
            section.len(),
            file.relative_path
        );
        Ok(())
    }

    /// Path of the document.
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}
