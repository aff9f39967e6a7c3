//! Single-file atomic writes.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::InvocationError;

/// Write `contents` to `path` through a temp file in the same directory,
/// then rename it into place. Readers never observe a half-written file.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), InvocationError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let io_err = |source| InvocationError::io(path, source);

    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(contents).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}
