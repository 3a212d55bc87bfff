//! Atomic file replacement
//!
//! Content is written to a sibling temporary file, flushed and synced, then
//! renamed over the target. A failure at any step removes the temporary and
//! leaves the previous file untouched.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{GenError, Result};

/// Atomically replace `path` with `content`
pub fn write_atomic(path: impl AsRef<Path>, content: &[u8]) -> Result<()> {
    write_atomic_with(path, |w| w.write_all(content))
}

/// Atomically replace `path` with whatever `fill` writes.
///
/// The parent directory must already exist.
pub fn write_atomic_with<F>(path: impl AsRef<Path>, fill: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> io::Result<()>,
{
    let path = path.as_ref();
    let tmp_path = tmp_write_path(path);

    let write_result = (|| -> io::Result<()> {
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        fill(&mut writer)?;
        writer.flush()?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()
    })();

    if let Err(source) = write_result {
        let _ = fs::remove_file(&tmp_path);
        return Err(GenError::write(path, source));
    }

    fs::rename(&tmp_path, path).map_err(|source| {
        let _ = fs::remove_file(&tmp_path);
        GenError::write(path, source)
    })?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            // Directory fsync is best-effort; not every platform allows it
            if let Ok(dir) = File::open(parent) {
                let _ = dir.sync_all();
            }
        }
    }

    Ok(())
}

fn tmp_write_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(format!(".tmp.{}", std::process::id()));
    path.with_file_name(name)
}
