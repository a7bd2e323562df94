//! Write-then-rename file replacement
//!
//! Readers of markers, snapshots, and staged assets must never observe a
//! partially written file.

use std::ffi::OsString;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// Sibling path used while a file is being written
pub(crate) fn temp_sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("file"));
    name.push(format!(".{}.{}", std::process::id(), suffix));
    path.with_file_name(name)
}

/// Atomically replace `path` with `bytes`
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let temp_path = temp_sibling(path, "tmp");
    let result = (|| -> io::Result<()> {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&temp_path, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

/// Atomically replace `path` with everything read from `reader`.
///
/// Returns the number of bytes written.
pub(crate) fn copy_atomic(reader: &mut dyn Read, path: &Path) -> io::Result<u64> {
    let temp_path = temp_sibling(path, "partial");
    let result = (|| -> io::Result<u64> {
        let mut file = fs::File::create(&temp_path)?;
        let written = io::copy(reader, &mut file)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&temp_path, path)?;
        Ok(written)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

/// Remove a file, treating "already gone" as success.
///
/// Refuses to follow a symlink at `path`.
pub(crate) fn remove_if_exists(path: &Path) -> io::Result<bool> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_symlink() => {
            log::warn!("{} is a symlink, refusing to remove", path.display());
            Ok(false)
        }
        Ok(_) => match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        },
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
