use std::{fs::{self, File}, io::Write, path::{Path, PathBuf}};

use anyhow::{bail, Context, Result};
use tempfile::NamedTempFile;

/// Create the directory if it doesn't exist; error if a non-directory exists there.
pub(crate) fn ensure_dir_exists(path: &Path) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            bail!("Path exists but is not a directory: {}", path.display());
        }
    } else {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory {}", path.display()))?;
    }
    Ok(())
}

/// Error unless the input file already exists.
pub(crate) fn require_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        bail!("Required input file does not exist: {}", path.display());
    }
    if !path.is_file() {
        bail!("Path exists but is not a file: {}", path.display());
    }
    Ok(())
}

/// Write-then-rename wrapper so a stage never leaves a half-written output behind.
pub(crate) struct PendingWrite {
    target: PathBuf,
    tmp: Option<NamedTempFile>,
}

impl PendingWrite {
    /// Open a temporary sibling of `target`. Refuses to clobber an existing file unless `force`.
    pub(crate) fn open(target: &Path, force: bool) -> Result<Self> {
        let parent = match target.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        ensure_dir_exists(parent)?;
        if !force && target.exists() {
            bail!("Refusing to overwrite existing file: {} (use --force)", target.display());
        }
        let tmp = NamedTempFile::new_in(parent)
            .with_context(|| format!("create temp file next to {}", target.display()))?;

        Ok(Self { target: target.to_path_buf(), tmp: Some(tmp) })
    }

    /// Get the underlying file handle for writers that want a `File`.
    pub(crate) fn file(&mut self) -> Result<&mut File> {
        match self.tmp.as_mut() {
            Some(tmp) => Ok(tmp.as_file_mut()),
            None => bail!("write to {} already finalized", self.target.display()),
        }
    }

    /// Flush and atomically move the temporary file into place.
    pub(crate) fn finalize(mut self) -> Result<()> {
        let Some(mut tmp) = self.tmp.take() else {
            bail!("write to {} already finalized", self.target.display());
        };
        tmp.flush()?;
        tmp.as_file().sync_all().ok(); // best-effort fsync
        tmp.persist(&self.target)
            .with_context(|| format!("rename to {}", self.target.display()))?;
        Ok(())
    }
}

impl Write for PendingWrite {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self.tmp.as_mut() {
            Some(tmp) => tmp.write(buf),
            None => Err(std::io::Error::other("write after finalize")),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self.tmp.as_mut() {
            Some(tmp) => tmp.flush(),
            None => Ok(()),
        }
    }
}
