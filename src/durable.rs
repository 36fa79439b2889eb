//! Append-only file helpers shared by the record log and the vector store.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{Result, StoreError};

/// Append `bytes` at the end of `file` and return the offset they start at.
///
/// On failure the file is truncated back to that offset so a half-written
/// line cannot glue itself onto the next append.
pub(crate) fn append_line(file: &mut File, path: &Path, bytes: &[u8], sync: bool) -> Result<u64> {
    let offset = file
        .metadata()
        .map_err(|e| StoreError::io(path, e))?
        .len();

    let written = file.write_all(bytes).and_then(|()| {
        file.flush()?;
        if sync {
            file.sync_data()?;
        }
        Ok(())
    });

    if let Err(e) = written {
        if let Err(truncate_err) = file.set_len(offset) {
            tracing::error!(
                path = %path.display(),
                offset,
                error = %truncate_err,
                "failed to roll back partial append"
            );
        }
        return Err(StoreError::io(path, e));
    }
    Ok(offset)
}

/// If the file ends mid-line (a crash during append), terminate that line so
/// the next append starts cleanly. Returns `true` when a newline was added.
pub(crate) fn seal_torn_tail(file: &mut File, path: &Path) -> Result<bool> {
    let len = file
        .metadata()
        .map_err(|e| StoreError::io(path, e))?
        .len();
    if len == 0 {
        return Ok(false);
    }

    let mut probe = File::open(path).map_err(|e| StoreError::io(path, e))?;
    let mut last = [0u8; 1];
    probe
        .seek(SeekFrom::End(-1))
        .and_then(|_| probe.read_exact(&mut last))
        .map_err(|e| StoreError::io(path, e))?;
    if last[0] == b'\n' {
        return Ok(false);
    }

    tracing::warn!(path = %path.display(), "file ends mid-line, sealing torn tail");
    append_line(file, path, b"\n", true)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;

    fn open_append(path: &Path) -> File {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap()
    }

    #[test]
    fn append_returns_start_offsets() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("data.log");
        let mut file = open_append(&path);

        assert_eq!(append_line(&mut file, &path, b"first\n", false).unwrap(), 0);
        assert_eq!(append_line(&mut file, &path, b"second\n", true).unwrap(), 6);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn seal_only_touches_torn_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("data.log");

        let mut file = open_append(&path);
        assert!(!seal_torn_tail(&mut file, &path).unwrap());

        append_line(&mut file, &path, b"whole\n", false).unwrap();
        assert!(!seal_torn_tail(&mut file, &path).unwrap());

        append_line(&mut file, &path, b"torn", false).unwrap();
        assert!(seal_torn_tail(&mut file, &path).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "whole\ntorn\n");
    }
}
