//! Atomic replace-on-write.
//!
//! The write is staged to a temporary file in the target's directory, synced,
//! then renamed over the target. A failure at any point leaves the original
//! file untouched and unlinks the temporary.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Default mode for files that do not exist yet.
#[cfg(unix)]
const NEW_FILE_MODE: u32 = 0o644;

/// A fully written and synced temporary, ready to be renamed into place.
pub struct StagedWrite {
    temp: NamedTempFile,
    target: PathBuf,
    original_mode: Option<u32>,
}

/// Write `bytes` to a temporary sibling of `target` and fsync it.
pub fn stage(target: &Path, bytes: &[u8]) -> io::Result<StagedWrite> {
    let dir = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| io::Error::other(format!("no parent directory: {}", target.display())))?;

    let mut temp = tempfile::Builder::new()
        .prefix(".scout.")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    temp.write_all(bytes)?;
    temp.flush()?;
    temp.as_file().sync_all()?;

    #[cfg(unix)]
    let original_mode = {
        use std::os::unix::fs::MetadataExt;
        fs::metadata(target).ok().map(|m| m.mode())
    };
    #[cfg(not(unix))]
    let original_mode = None;

    Ok(StagedWrite {
        temp,
        target: target.to_path_buf(),
        original_mode,
    })
}

impl StagedWrite {
    /// Rename the staged file over the target, preserving the original mode.
    ///
    /// With `backup`, the pre-existing file is first renamed to `<name>.bak`;
    /// the backup is best-effort and not atomic with the rename. On error
    /// the temporary is unlinked and the target is left as it was.
    pub fn commit(self, backup: bool) -> io::Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = self.original_mode.unwrap_or(NEW_FILE_MODE);
            self.temp
                .as_file()
                .set_permissions(fs::Permissions::from_mode(mode))?;
        }

        if backup && self.target.exists() {
            let bak = backup_path(&self.target);
            if let Err(err) = fs::rename(&self.target, &bak) {
                tracing::warn!(target = %self.target.display(), %err, "backup failed");
            }
        }

        let dir = self.target.parent().map(Path::to_path_buf);
        // Drop of the inner NamedTempFile unlinks it if persist fails.
        self.temp.persist(&self.target).map_err(|e| e.error)?;

        #[cfg(unix)]
        if let Some(dir) = dir
            && let Ok(handle) = fs::File::open(&dir)
            && let Err(err) = handle.sync_all()
        {
            tracing::warn!(dir = %dir.display(), %err, "directory fsync failed");
        }
        #[cfg(not(unix))]
        let _ = dir;

        Ok(())
    }
}

/// `<name>.bak` next to the original.
#[must_use]
pub fn backup_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().map_or_else(
        || std::ffi::OsString::from("file"),
        std::ffi::OsStr::to_os_string,
    );
    name.push(".bak");
    target.with_file_name(name)
}

/// Stage and commit in one step.
pub fn write_atomic(target: &Path, bytes: &[u8], backup: bool) -> io::Result<()> {
    stage(target, bytes)?.commit(backup)
}
